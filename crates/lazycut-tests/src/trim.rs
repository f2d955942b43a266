//! Integration tests for trimming and export planning.
//!
//! Exercises lazycut-timeline marks through the controller and the
//! resulting lazycut-media export job.

use lazycut_core::{FrameRate, RationalTime};
use lazycut_media::ExportJob;
use lazycut_timeline::TrimState;
use std::path::PathBuf;

use crate::support::{open, FakeBackend};

fn secs(s: i64) -> RationalTime {
    RationalTime::new(s, 1)
}

#[test]
fn marks_follow_the_playhead() {
    let ctl = open(FakeBackend::new(secs(60), FrameRate::FPS_24));
    ctl.seek(secs(12));
    ctl.mark_in();
    ctl.seek(RationalTime::new(45, 2));
    let trim = ctl.mark_out();

    assert_eq!(trim.in_point(), Some(secs(12)));
    assert_eq!(trim.out_point(), Some(RationalTime::new(45, 2)));
    assert_eq!(trim.duration(), RationalTime::new(21, 2));
}

#[test]
fn marking_in_after_out_drops_out_point() {
    let ctl = open(FakeBackend::new(secs(60), FrameRate::FPS_24));
    ctl.seek(secs(10));
    ctl.mark_out();
    ctl.seek(secs(20));
    let trim = ctl.mark_in();
    assert_eq!(trim.in_point(), Some(secs(20)));
    assert_eq!(trim.out_point(), None);
    assert!(ctl.export_job(None).is_err());

    assert!(ctl.undo_trim());
    assert_eq!(ctl.trim().out_point(), Some(secs(10)));
    assert!(ctl.undo_trim());
    assert_eq!(ctl.trim(), TrimState::new());
    assert!(!ctl.undo_trim());
}

#[test]
fn export_job_uses_marked_range() {
    let ctl = open(FakeBackend::new(secs(60), FrameRate::FPS_24));
    ctl.seek(RationalTime::new(3, 2));
    ctl.mark_in();
    ctl.seek(secs(4));
    ctl.mark_out();

    let job: ExportJob = ctl.export_job(Some(PathBuf::from("short"))).unwrap();
    let output = job.resolve_output();
    assert_eq!(output, PathBuf::from("/media/short.mp4"));

    let args = job.ffmpeg_args(&output);
    assert_eq!(&args[1..3], ["-ss", "1.500"]);
    assert_eq!(&args[5..7], ["-t", "2.500"]);
    assert_eq!(args.last().map(String::as_str), Some("/media/short.mp4"));
    assert_eq!(
        job.command_line(),
        "ffmpeg -y -ss 1.500 -i clip.mp4 -t 2.500 -c copy short.mp4"
    );
}

#[test]
fn cleared_trim_blocks_export() {
    let ctl = open(FakeBackend::new(secs(60), FrameRate::FPS_24));
    ctl.mark_in();
    ctl.seek(secs(5));
    ctl.mark_out();
    assert!(ctl.export_job(None).is_ok());

    ctl.clear_trim();
    assert!(!ctl.trim().is_complete());
    assert!(ctl.export_job(None).is_err());
}
