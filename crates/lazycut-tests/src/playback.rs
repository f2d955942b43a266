//! Integration tests for the playback controller.
//!
//! Exercises lazycut-playback against the in-memory backend: natural
//! termination, pause/seek/resize while playing and stream recovery.

use lazycut_core::{FrameRate, QualityPreset, RationalTime};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crate::support::{open, wait_until, FakeBackend};

const WAIT: Duration = Duration::from_secs(5);

fn secs(s: i64) -> RationalTime {
    RationalTime::new(s, 1)
}

// ── Natural termination ────────────────────────────────────────

#[test]
fn playback_ends_exactly_at_duration() {
    let backend = FakeBackend::new(RationalTime::new(2, 5), FrameRate::FPS_25);
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();

    assert!(wait_until(WAIT, || !ctl.is_playing()));
    assert_eq!(ctl.position(), ctl.duration());
    // Every frame from 0 to 9/25 was written back before advancing.
    assert_eq!(ctl.cache_len(), 10);
    assert_eq!(ctl.current_frame().as_str(), "frame 0.360s HIGH");
}

#[test]
fn playback_clamps_when_duration_is_not_frame_aligned() {
    let backend = FakeBackend::new(RationalTime::new(41, 100), FrameRate::FPS_25);
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();

    assert!(wait_until(WAIT, || !ctl.is_playing()));
    assert_eq!(ctl.position(), RationalTime::new(41, 100));
}

#[test]
fn play_at_end_stops_immediately() {
    let backend = FakeBackend::new(secs(2), FrameRate::FPS_25);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.seek(secs(2));
    ctl.play().unwrap();

    assert!(wait_until(WAIT, || !ctl.is_playing()));
    assert_eq!(ctl.position(), secs(2));
    assert!(recorder.opened().is_empty());
}

#[test]
fn streams_without_frames_end_playback() {
    let mut backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    backend.frames_per_stream = 0;
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();

    assert!(wait_until(WAIT, || !ctl.is_playing()));
    assert_eq!(ctl.position(), secs(10));
    assert_eq!(recorder.opened().len(), 5);
    assert_eq!(recorder.live.load(Ordering::SeqCst), 0);
}

// ── Pause / toggle / close ─────────────────────────────────────

#[test]
fn pause_stops_loop_and_shows_still() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    assert_eq!(recorder.stills.load(Ordering::SeqCst), 1);

    ctl.play().unwrap();
    assert!(wait_until(WAIT, || ctl.position() > RationalTime::new(1, 10)));
    ctl.pause();

    assert!(!ctl.is_playing());
    assert_eq!(recorder.live.load(Ordering::SeqCst), 0);
    assert!(ctl.current_frame().as_str().starts_with("still "));
    assert_eq!(recorder.stills.load(Ordering::SeqCst), 2);

    let paused_at = ctl.position();
    thread::sleep(Duration::from_millis(60));
    assert_eq!(ctl.position(), paused_at);
}

#[test]
fn toggle_flips_between_states() {
    let ctl = open(FakeBackend::new(secs(10), FrameRate::FPS_25));
    ctl.set_size(80, 24);
    ctl.toggle().unwrap();
    assert!(ctl.is_playing());
    ctl.toggle().unwrap();
    assert!(!ctl.is_playing());
    // A second pause is a no-op.
    ctl.pause();
    assert!(!ctl.is_playing());
}

#[test]
fn close_tears_down_running_stream() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();
    assert!(wait_until(WAIT, || recorder.live.load(Ordering::SeqCst) == 1));

    ctl.close();
    assert!(!ctl.is_playing());
    assert_eq!(recorder.live.load(Ordering::SeqCst), 0);
    ctl.close();
}

#[test]
fn dropping_controller_stops_playback() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();
    assert!(wait_until(WAIT, || recorder.live.load(Ordering::SeqCst) == 1));

    drop(ctl);
    assert_eq!(recorder.live.load(Ordering::SeqCst), 0);
}

// ── Seek ───────────────────────────────────────────────────────

#[test]
fn seek_clamps_to_media_bounds() {
    let ctl = open(FakeBackend::new(secs(10), FrameRate::FPS_25));
    ctl.seek(secs(-5));
    assert_eq!(ctl.position(), RationalTime::ZERO);
    ctl.seek(secs(110));
    assert_eq!(ctl.position(), secs(10));
}

#[test]
fn step_by_huge_counts_stops_at_media_bounds() {
    let ctl = open(FakeBackend::new(secs(10), FrameRate::FPS_29_97));
    ctl.step(1);
    assert_eq!(ctl.position(), RationalTime::new(1001, 30000));
    ctl.step(i64::MAX / 2);
    assert_eq!(ctl.position(), secs(10));
    ctl.step(i64::MIN / 2);
    assert_eq!(ctl.position(), RationalTime::ZERO);
}

#[test]
fn seek_while_playing_restarts_stream_at_target() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();
    assert!(wait_until(WAIT, || ctl.position() > RationalTime::ZERO));

    ctl.seek(secs(5));
    assert!(ctl.is_playing());
    assert!(wait_until(WAIT, || ctl.position() > secs(5)));
    assert!(ctl.position() < secs(6));
    assert!(recorder.opened().iter().any(|spec| spec.start == secs(5)));
    assert!(recorder.max_live.load(Ordering::SeqCst) <= 1);

    // Nothing decoded before the seek may land after it.
    assert!(wait_until(WAIT, || ctl.current_frame().as_str().starts_with("frame 5.")));
    ctl.pause();
}

#[test]
fn seek_while_stopped_renders_still() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.seek(secs(3));
    assert_eq!(ctl.current_frame().as_str(), "still 3.000s HIGH");

    // Same frame again comes from the cache.
    ctl.seek(RationalTime::new(301, 100));
    assert_eq!(recorder.stills.load(Ordering::SeqCst), 2);
    assert_eq!(ctl.current_frame().as_str(), "still 3.000s HIGH");
}

// ── Size and quality ───────────────────────────────────────────

#[test]
fn playback_waits_for_a_size() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.play().unwrap();

    thread::sleep(Duration::from_millis(60));
    assert!(recorder.opened().is_empty());
    assert_eq!(ctl.position(), RationalTime::ZERO);

    ctl.set_size(80, 24);
    assert!(wait_until(WAIT, || !recorder.opened().is_empty()));
    ctl.pause();
}

#[test]
fn resize_while_playing_restarts_stream() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();
    assert!(wait_until(WAIT, || ctl.position() > RationalTime::ZERO));

    ctl.set_size(120, 40);
    assert!(wait_until(WAIT, || {
        recorder.opened().iter().any(|spec| spec.width == 120 && spec.height == 40)
    }));
    assert!(recorder.max_live.load(Ordering::SeqCst) <= 1);
    ctl.pause();
    assert_eq!(ctl.size(), (120, 40));
}

#[test]
fn quality_change_while_playing_applies_to_next_frames() {
    let ctl = open(FakeBackend::new(secs(10), FrameRate::FPS_25));
    ctl.set_size(80, 24);
    ctl.play().unwrap();
    assert!(wait_until(WAIT, || ctl.position() > RationalTime::ZERO));

    assert_eq!(ctl.cycle_quality(), QualityPreset::Low);
    assert!(wait_until(WAIT, || ctl.current_frame().as_str().ends_with("LOW")));
    ctl.pause();
}

#[test]
fn preview_rate_is_capped() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_60);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    assert_eq!(ctl.fps(), FrameRate::FPS_30);

    ctl.set_size(80, 24);
    ctl.play().unwrap();
    assert!(wait_until(WAIT, || !recorder.opened().is_empty()));
    ctl.pause();
    assert_eq!(recorder.opened()[0].fps, FrameRate::FPS_30);
}

// ── Recovery ───────────────────────────────────────────────────

#[test]
fn failed_stream_starts_are_retried() {
    let backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    backend.recorder.open_failures.store(3, Ordering::SeqCst);
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();

    assert!(wait_until(WAIT, || ctl.position() > RationalTime::ZERO));
    assert!(ctl.is_playing());
    assert_eq!(recorder.open_failures.load(Ordering::SeqCst), 0);
    ctl.pause();
}

#[test]
fn exhausted_stream_is_reopened_at_current_position() {
    let mut backend = FakeBackend::new(secs(10), FrameRate::FPS_25);
    backend.frames_per_stream = 3;
    let recorder = backend.recorder.clone();
    let ctl = open(backend);
    ctl.set_size(80, 24);
    ctl.play().unwrap();

    assert!(wait_until(WAIT, || recorder.opened().len() >= 3));
    ctl.pause();
    let starts: Vec<_> = recorder.opened().iter().map(|spec| spec.start).collect();
    assert_eq!(starts[0], RationalTime::ZERO);
    assert_eq!(starts[1], RationalTime::new(3, 25));
    assert_eq!(starts[2], RationalTime::new(6, 25));
}
