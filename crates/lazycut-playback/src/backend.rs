//! The seam between the playback state machine and the external tools.
//!
//! The controller only talks to a [`PreviewBackend`]; production code uses
//! [`FfmpegBackend`], tests substitute an in-process fake.

use lazycut_core::{CancelToken, FrameRate, QualityPreset, Result, TextFrame};
use lazycut_media::{chafa, render, FrameStream, HwAccel, MediaProbe, StillRequest, StreamSpec, ToolPaths};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Unblocks a [`FrameSource`] read from another thread.
#[derive(Clone)]
pub struct Interrupter(Arc<dyn Fn() + Send + Sync>);

impl Interrupter {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn interrupt(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interrupter")
    }
}

/// A running decode producing encoded frames one at a time.
pub trait FrameSource: Send {
    /// Block for the next frame. Any error ends the source.
    fn next_frame(&mut self) -> Result<Vec<u8>>;

    /// True if the source was opened for a different size or rate.
    fn needs_restart(&self, width: u32, height: u32, fps: FrameRate) -> bool;

    /// Handle that makes a blocked `next_frame` return.
    fn interrupter(&self) -> Interrupter;

    /// Release the source. Idempotent.
    fn close(&mut self);
}

/// Decode, conversion and probing for one preview session.
pub trait PreviewBackend: Send + Sync + 'static {
    type Source: FrameSource;

    fn probe(&self, path: &Path) -> Result<MediaProbe>;

    fn open_stream(&self, spec: &StreamSpec) -> Result<Self::Source>;

    /// Decode and convert the single frame at `request.position`.
    fn render_still(&self, request: &StillRequest, cancel: &CancelToken) -> Result<TextFrame>;

    /// Convert one encoded frame from a [`FrameSource`] to text.
    fn convert_frame(
        &self,
        image: &[u8],
        width: u32,
        height: u32,
        quality: QualityPreset,
    ) -> Result<TextFrame>;
}

impl FrameSource for FrameStream {
    fn next_frame(&mut self) -> Result<Vec<u8>> {
        FrameStream::next_frame(self)
    }

    fn needs_restart(&self, width: u32, height: u32, fps: FrameRate) -> bool {
        FrameStream::needs_restart(self, width, height, fps)
    }

    fn interrupter(&self) -> Interrupter {
        let closer = self.closer();
        Interrupter::new(move || closer.close())
    }

    fn close(&mut self) {
        FrameStream::close(self)
    }
}

/// Backend running ffprobe, ffmpeg and chafa as child processes.
///
/// `ffmpeg -hwaccels` lists what the binary was built with, not devices
/// that exist. The first still render that fails with hardware decoding
/// and succeeds without it turns hardware decoding off for every clone.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    tools: ToolPaths,
    hwaccel: HwAccel,
    hwaccel_failed: Arc<AtomicBool>,
}

impl FfmpegBackend {
    pub fn new(tools: ToolPaths, hwaccel: HwAccel) -> Self {
        Self {
            tools,
            hwaccel,
            hwaccel_failed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// The acceleration method still renders currently use.
    pub fn hwaccel(&self) -> HwAccel {
        if self.hwaccel_failed.load(Ordering::Acquire) {
            HwAccel::None
        } else {
            self.hwaccel
        }
    }

    /// Run `render` with the active acceleration method, retrying once in
    /// software when a hardware decode fails.
    fn with_hwaccel_fallback(
        &self,
        cancel: &CancelToken,
        mut render: impl FnMut(HwAccel) -> Result<TextFrame>,
    ) -> Result<TextFrame> {
        let hwaccel = self.hwaccel();
        let err = match render(hwaccel) {
            Err(e) if hwaccel.is_available() && !cancel.is_cancelled() => e,
            other => return other,
        };

        let frame = render(HwAccel::None)?;
        if !self.hwaccel_failed.swap(true, Ordering::AcqRel) {
            warn!(?hwaccel, "Hardware decoding failed, using software decoding: {err}");
        }
        Ok(frame)
    }
}

impl PreviewBackend for FfmpegBackend {
    type Source = FrameStream;

    fn probe(&self, path: &Path) -> Result<MediaProbe> {
        MediaProbe::probe(&self.tools.ffprobe, path)
    }

    fn open_stream(&self, spec: &StreamSpec) -> Result<FrameStream> {
        FrameStream::open(&self.tools.ffmpeg, spec)
    }

    fn render_still(&self, request: &StillRequest, cancel: &CancelToken) -> Result<TextFrame> {
        self.with_hwaccel_fallback(cancel, |hwaccel| {
            render::render_still(&self.tools, hwaccel, request, cancel)
        })
    }

    fn convert_frame(
        &self,
        image: &[u8],
        width: u32,
        height: u32,
        quality: QualityPreset,
    ) -> Result<TextFrame> {
        chafa::convert(&self.tools.chafa, image, width, height, quality)
    }
}
