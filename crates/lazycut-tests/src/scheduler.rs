//! Integration tests for render scheduling and the frame cache.

use crossbeam_channel::unbounded;
use lazycut_core::{FrameRate, LazycutError, QualityPreset, RationalTime, TextFrame};
use lazycut_playback::{FrameCache, RenderRequest, RenderScheduler};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn request(scheduler: &RenderScheduler, seconds: i64) -> RenderRequest {
    RenderRequest {
        position: RationalTime::new(seconds, 1),
        width: 80,
        height: 24,
        quality: QualityPreset::Medium,
        sequence: scheduler.next_sequence(),
    }
}

#[test]
fn slow_older_render_never_overwrites_newer() {
    let scheduler = RenderScheduler::new(2, Duration::from_secs(2));
    let cache = Arc::new(FrameCache::new(10, FrameRate::FPS_24));
    let (done_tx, done_rx) = unbounded();

    let first = request(&scheduler, 1);
    let slot = Arc::clone(&cache);
    let tx = done_tx.clone();
    scheduler.submit(
        first,
        |_| {
            thread::sleep(Duration::from_millis(200));
            Ok(TextFrame::from("seq 1"))
        },
        move |result| {
            if let Ok(frame) = result {
                slot.put(RationalTime::ZERO, 80, 24, QualityPreset::Medium, frame);
            }
            let _ = tx.send(first.sequence);
        },
    );

    thread::sleep(Duration::from_millis(20));
    let second = request(&scheduler, 2);
    let slot = Arc::clone(&cache);
    scheduler.submit(
        second,
        |_| Ok(TextFrame::from("seq 2")),
        move |result| {
            if let Ok(frame) = result {
                slot.put(RationalTime::ZERO, 80, 24, QualityPreset::Medium, frame);
            }
            let _ = done_tx.send(second.sequence);
        },
    );

    assert_eq!(done_rx.recv_timeout(Duration::from_secs(1)), Ok(second.sequence));
    // Give the slow render time to finish and be discarded.
    thread::sleep(Duration::from_millis(300));
    assert!(done_rx.try_recv().is_err());
    assert_eq!(
        cache.get(RationalTime::ZERO, 80, 24, QualityPreset::Medium),
        Some(TextFrame::from("seq 2"))
    );
}

#[test]
fn superseded_sync_render_reports_it() {
    let scheduler = Arc::new(RenderScheduler::new(2, Duration::from_secs(2)));

    let waiting = {
        let scheduler = Arc::clone(&scheduler);
        thread::spawn(move || {
            let req = request(&scheduler, 1);
            scheduler.submit_sync(req, |_| {
                thread::sleep(Duration::from_millis(150));
                Ok(TextFrame::from("old"))
            })
        })
    };

    thread::sleep(Duration::from_millis(40));
    let newer = request(&scheduler, 2);
    let frame = scheduler
        .submit_sync(newer, |_| Ok(TextFrame::from("new")))
        .unwrap();
    assert_eq!(frame.as_str(), "new");

    let old = waiting.join().unwrap();
    assert!(matches!(old, Err(LazycutError::Superseded)));
}

#[test]
fn slots_are_released_after_renders() {
    let scheduler = RenderScheduler::new(1, Duration::from_secs(2));
    for second in 0..3 {
        let req = request(&scheduler, second);
        scheduler
            .submit_sync(req, |_| Ok(TextFrame::from("x")))
            .unwrap();
    }
    assert!(crate::support::wait_until(Duration::from_secs(1), || {
        scheduler.active_count() == 0
    }));
}
