//! One-shot still render: decode a single frame and convert it to text.
//!
//! `ffmpeg -ss <t> -i <file> -vframes 1 ... | chafa ...`

use lazycut_core::{CancelToken, FrameRate, LazycutError, QualityPreset, RationalTime, Result, TextFrame};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::chafa::ChafaConfig;
use crate::hwaccel::HwAccel;
use crate::process::{check_status, terminate, wait_cancellable};
use crate::tools::ToolPaths;

/// Parameters of one still render.
#[derive(Debug, Clone, PartialEq)]
pub struct StillRequest {
    pub path: PathBuf,
    pub position: RationalTime,
    pub fps: FrameRate,
    pub width: u32,
    pub height: u32,
    pub quality: QualityPreset,
}

impl StillRequest {
    /// Decode-stage arguments. Hardware acceleration must precede `-i`.
    pub fn ffmpeg_args(&self, hwaccel: HwAccel) -> Vec<String> {
        let mut args = hwaccel.input_args();
        args.extend([
            "-ss".into(),
            self.position.ffmpeg_seconds(),
            "-i".into(),
            self.path.to_string_lossy().into_owned(),
            "-vf".into(),
            format!("fps={}", self.fps.or_default().filter_arg()),
            "-vframes".into(),
            "1".into(),
            "-f".into(),
            "image2pipe".into(),
            "-vcodec".into(),
            "bmp".into(),
            "-loglevel".into(),
            "error".into(),
            "-".into(),
        ]);
        args
    }
}

/// Run the two-stage pipeline, killing both processes if `cancel` fires.
pub fn render_still(
    tools: &ToolPaths,
    hwaccel: HwAccel,
    request: &StillRequest,
    cancel: &CancelToken,
) -> Result<TextFrame> {
    if request.width == 0 || request.height == 0 {
        return Err(LazycutError::InvalidConfig(format!(
            "invalid render size {}x{}",
            request.width, request.height
        )));
    }

    let mut decoder = Command::new(&tools.ffmpeg)
        .args(request.ffmpeg_args(hwaccel))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| spawn_error(&tools.ffmpeg, e))?;

    let Some(decoded) = decoder.stdout.take() else {
        terminate(&mut decoder);
        return Err(LazycutError::Process("Failed to open ffmpeg stdout".into()));
    };

    let chafa_args = ChafaConfig::for_quality(request.quality).build_args(request.width, request.height);
    let mut converter = match Command::new(&tools.chafa)
        .args(&chafa_args)
        .stdin(Stdio::from(decoded))
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            terminate(&mut decoder);
            return Err(spawn_error(&tools.chafa, e));
        }
    };

    let Some(mut text_out) = converter.stdout.take() else {
        terminate(&mut decoder);
        terminate(&mut converter);
        return Err(LazycutError::Process("Failed to open chafa stdout".into()));
    };

    let reader = std::thread::spawn(move || {
        let mut text = Vec::new();
        text_out.read_to_end(&mut text).map(|_| text)
    });

    let decode_status = wait_cancellable(&mut decoder, cancel);
    let convert_status = if decode_status.is_ok() {
        wait_cancellable(&mut converter, cancel)
    } else {
        terminate(&mut converter);
        Err(LazycutError::Process("decode interrupted".into()))
    };
    let text = reader
        .join()
        .map_err(|_| LazycutError::Process("chafa reader panicked".into()))?;

    check_status("ffmpeg", decode_status?)?;
    check_status("chafa", convert_status?)?;
    let text = text?;

    debug!(
        position = %request.position,
        quality = %request.quality,
        bytes = text.len(),
        "Still frame rendered"
    );
    Ok(TextFrame::from(String::from_utf8_lossy(&text).into_owned()))
}

fn spawn_error(tool: &Path, e: std::io::Error) -> LazycutError {
    LazycutError::Process(format!("Failed to spawn {}: {e}", tool.display()))
}
