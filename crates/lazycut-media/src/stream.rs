//! Persistent frame stream over an ffmpeg pipe.
//!
//! One long-lived ffmpeg process decodes from a start offset and writes a
//! continuous sequence of BMP images to stdout at a fixed rate. Frames are
//! delimited by the BMP file header: `B` `M`, then the total frame size as a
//! little-endian u32 at offset 2.

use lazycut_core::{FrameRate, LazycutError, RationalTime, Result};
use parking_lot::Mutex;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info};

use crate::process::terminate;

/// Length of the BMP file header that prefixes every frame.
pub const BMP_HEADER_LEN: usize = 14;

/// Sources wider than this are downscaled before the rate filter.
pub const PREVIEW_MAX_WIDTH: u32 = 1920;

/// Upper bound on a declared frame size; anything larger is treated as corrupt.
const MAX_FRAME_BYTES: usize = 256 * 1024 * 1024;

/// Read one complete BMP frame (header included) from `reader`.
///
/// A short read surfaces as an `UnexpectedEof` I/O error, never as a partial
/// frame.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; BMP_HEADER_LEN];
    reader.read_exact(&mut header)?;

    if header[0] != b'B' || header[1] != b'M' {
        return Err(LazycutError::Framing(format!(
            "invalid frame header: {:02x} {:02x}",
            header[0], header[1]
        )));
    }

    let frame_size = u32::from_le_bytes([header[2], header[3], header[4], header[5]]) as usize;
    if frame_size < BMP_HEADER_LEN {
        return Err(LazycutError::Framing(format!(
            "invalid frame size: {frame_size}"
        )));
    }
    if frame_size > MAX_FRAME_BYTES {
        return Err(LazycutError::Framing(format!(
            "frame size {frame_size} exceeds limit"
        )));
    }

    let mut frame = vec![0u8; frame_size];
    frame[..BMP_HEADER_LEN].copy_from_slice(&header);
    reader.read_exact(&mut frame[BMP_HEADER_LEN..])?;
    Ok(frame)
}

/// Configuration a stream is started with.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSpec {
    pub path: PathBuf,
    pub start: RationalTime,
    /// Target width in character cells.
    pub width: u32,
    /// Target height in character cells.
    pub height: u32,
    pub fps: FrameRate,
    /// Pixel width of the source video, used to decide on a pre-scale.
    pub source_width: u32,
}

impl StreamSpec {
    /// Reject non-positive width, height or fps.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || !self.fps.is_known() {
            return Err(LazycutError::InvalidConfig(format!(
                "invalid stream configuration: {}x{} at {}",
                self.width, self.height, self.fps
            )));
        }
        Ok(())
    }

    /// Filter chain: optional fast downscale, then the rate filter.
    pub fn filter_chain(&self) -> String {
        let mut filters = Vec::with_capacity(2);
        if self.source_width > PREVIEW_MAX_WIDTH {
            filters.push(format!("scale={PREVIEW_MAX_WIDTH}:-1:flags=fast_bilinear"));
        }
        filters.push(format!("fps={}", self.fps.filter_arg()));
        filters.join(",")
    }

    /// Build the ffmpeg command arguments.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-ss".into(),
            self.start.ffmpeg_seconds(),
            "-i".into(),
            self.path.to_string_lossy().into_owned(),
            "-vf".into(),
            self.filter_chain(),
            "-f".into(),
            "image2pipe".into(),
            "-vcodec".into(),
            "bmp".into(),
            "-loglevel".into(),
            "error".into(),
            "-".into(),
        ]
    }
}

/// Tears down a stream's process from any thread.
///
/// Killing the process makes a read blocked on its pipe return, so this is
/// how a seek or pause interrupts a playback loop mid-frame.
#[derive(Debug, Clone)]
pub struct StreamCloser(Arc<Mutex<Option<Child>>>);

impl StreamCloser {
    /// Kill and reap the process. Idempotent.
    pub fn close(&self) {
        if let Some(mut child) = self.0.lock().take() {
            terminate(&mut child);
            debug!(pid = child.id(), "Frame stream process terminated");
        }
    }

    /// True while the process has not been torn down.
    pub fn is_open(&self) -> bool {
        self.0.lock().is_some()
    }
}

/// A live ffmpeg decode process plus its output pipe.
pub struct FrameStream {
    closer: StreamCloser,
    stdout: Option<BufReader<ChildStdout>>,
    width: u32,
    height: u32,
    fps: FrameRate,
}

impl FrameStream {
    /// Spawn ffmpeg for `spec`.
    pub fn open(ffmpeg: &Path, spec: &StreamSpec) -> Result<Self> {
        spec.validate()?;

        let mut child = Command::new(ffmpeg)
            .args(spec.ffmpeg_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                LazycutError::Process(format!("Failed to spawn {}: {e}", ffmpeg.display()))
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                terminate(&mut child);
                return Err(LazycutError::Process("Failed to open ffmpeg stdout".into()));
            }
        };

        info!(
            path = %spec.path.display(),
            start = %spec.start,
            fps = %spec.fps,
            "Frame stream opened"
        );

        Ok(Self {
            closer: StreamCloser(Arc::new(Mutex::new(Some(child)))),
            stdout: Some(BufReader::new(stdout)),
            width: spec.width,
            height: spec.height,
            fps: spec.fps,
        })
    }

    /// Read the next BMP frame.
    ///
    /// Any error means the stream is exhausted and must be restarted.
    pub fn next_frame(&mut self) -> Result<Vec<u8>> {
        match self.stdout.as_mut() {
            Some(stdout) => read_frame(stdout),
            None => Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into()),
        }
    }

    /// True if the stream was started with a different configuration.
    pub fn needs_restart(&self, width: u32, height: u32, fps: FrameRate) -> bool {
        self.width != width || self.height != height || self.fps != fps
    }

    /// A handle that can tear this stream down from another thread.
    pub fn closer(&self) -> StreamCloser {
        self.closer.clone()
    }

    /// Kill the process, wait for it, release the pipe. Idempotent.
    pub fn close(&mut self) {
        self.closer.close();
        self.stdout = None;
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.close();
    }
}
