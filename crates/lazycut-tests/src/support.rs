//! In-memory preview backend.

use lazycut_core::{CancelToken, FrameRate, LazycutError, QualityPreset, RationalTime, Result, TextFrame};
use lazycut_media::{MediaProbe, StillRequest, StreamSpec, ToolPaths};
use lazycut_playback::{FrameSource, Interrupter, PlaybackConfig, PlaybackController, PreviewBackend};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Observations shared between a [`FakeBackend`] and the test.
#[derive(Default)]
pub struct Recorder {
    pub opened: Mutex<Vec<StreamSpec>>,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub stills: AtomicUsize,
    /// Remaining `open_stream` calls that fail.
    pub open_failures: AtomicUsize,
}

impl Recorder {
    pub fn opened(&self) -> Vec<StreamSpec> {
        self.opened.lock().clone()
    }
}

/// Streams synthetic frames named after their position.
pub struct FakeBackend {
    pub media: MediaProbe,
    /// Frames each opened stream yields before ending.
    pub frames_per_stream: usize,
    /// Simulated decode time per frame.
    pub frame_delay: Duration,
    pub recorder: Arc<Recorder>,
}

impl FakeBackend {
    pub fn new(duration: RationalTime, fps: FrameRate) -> Self {
        Self {
            media: MediaProbe {
                path: PathBuf::from("/media/clip.mp4"),
                width: 1280,
                height: 720,
                codec: "h264".into(),
                frame_rate: fps,
                bit_rate: 8_000_000,
                file_size: 0,
                duration,
            },
            frames_per_stream: usize::MAX,
            frame_delay: Duration::from_millis(1),
            recorder: Arc::new(Recorder::default()),
        }
    }
}

pub struct FakeSource {
    spec: StreamSpec,
    produced: usize,
    limit: usize,
    delay: Duration,
    closed: Arc<AtomicBool>,
    released: bool,
    recorder: Arc<Recorder>,
}

impl FrameSource for FakeSource {
    fn next_frame(&mut self) -> Result<Vec<u8>> {
        let ready_at = Instant::now() + self.delay;
        while Instant::now() < ready_at {
            if self.closed.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        if self.closed.load(Ordering::SeqCst) || self.produced >= self.limit {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        let frame_time = self.spec.start + self.spec.fps.frame_duration() * self.produced as i64;
        self.produced += 1;
        Ok(frame_time.to_string().into_bytes())
    }

    fn needs_restart(&self, width: u32, height: u32, fps: FrameRate) -> bool {
        self.spec.width != width || self.spec.height != height || self.spec.fps != fps
    }

    fn interrupter(&self) -> Interrupter {
        let closed = Arc::clone(&self.closed);
        Interrupter::new(move || closed.store(true, Ordering::SeqCst))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if !self.released {
            self.released = true;
            self.recorder.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl PreviewBackend for FakeBackend {
    type Source = FakeSource;

    fn probe(&self, path: &Path) -> Result<MediaProbe> {
        if path == self.media.path {
            Ok(self.media.clone())
        } else {
            Err(LazycutError::Probe(format!("no such media: {}", path.display())))
        }
    }

    fn open_stream(&self, spec: &StreamSpec) -> Result<FakeSource> {
        spec.validate()?;
        let failed = self
            .recorder
            .open_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(LazycutError::Process("decoder failed to start".into()));
        }

        self.recorder.opened.lock().push(spec.clone());
        let live = self.recorder.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(FakeSource {
            spec: spec.clone(),
            produced: 0,
            limit: self.frames_per_stream,
            delay: self.frame_delay,
            closed: Arc::new(AtomicBool::new(false)),
            released: false,
            recorder: Arc::clone(&self.recorder),
        })
    }

    fn render_still(&self, request: &StillRequest, _cancel: &CancelToken) -> Result<TextFrame> {
        self.recorder.stills.fetch_add(1, Ordering::SeqCst);
        Ok(TextFrame::from(format!("still {} {}", request.position, request.quality)))
    }

    fn convert_frame(
        &self,
        image: &[u8],
        _width: u32,
        _height: u32,
        quality: QualityPreset,
    ) -> Result<TextFrame> {
        Ok(TextFrame::from(format!(
            "frame {} {}",
            String::from_utf8_lossy(image),
            quality
        )))
    }
}

/// Config that never finds an audio player.
pub fn quiet_config() -> PlaybackConfig {
    PlaybackConfig {
        tools: ToolPaths {
            ffplay: PathBuf::from("/nonexistent/ffplay"),
            ..ToolPaths::default()
        },
        ..PlaybackConfig::default()
    }
}

pub fn open(backend: FakeBackend) -> PlaybackController<FakeBackend> {
    let path = backend.media.path.clone();
    PlaybackController::open(backend, path, quiet_config()).expect("fake media opens")
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
