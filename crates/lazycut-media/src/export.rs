//! Trim export: re-mux the selected range to a new file.
//!
//! Runs ffmpeg with `-progress pipe:2` and turns its `out_time_us=` lines
//! into completion fractions. Supports cancellation.

use crossbeam_channel::Sender;
use lazycut_core::{CancelToken, LazycutError, RationalTime, Result};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};

use crate::process::terminate;

const PROGRESS_PREFIX: &str = "out_time_us=";

/// An export of `[in_point, out_point)` from `input`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub input: PathBuf,
    /// Requested output; `None` picks a free name next to the input.
    pub output: Option<PathBuf>,
    pub in_point: RationalTime,
    pub out_point: RationalTime,
}

impl ExportJob {
    pub fn new(input: impl Into<PathBuf>, in_point: RationalTime, out_point: RationalTime) -> Self {
        Self {
            input: input.into(),
            output: None,
            in_point,
            out_point,
        }
    }

    /// Set the output file name.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Length of the selection.
    pub fn duration(&self) -> RationalTime {
        self.out_point - self.in_point
    }

    /// Reject empty or inverted selections.
    pub fn validate(&self) -> Result<()> {
        if self.duration() <= RationalTime::ZERO {
            return Err(LazycutError::Export(format!(
                "empty selection: {} to {}",
                self.in_point, self.out_point
            )));
        }
        Ok(())
    }

    /// Final output path.
    ///
    /// A requested name without an extension inherits the input's; a
    /// relative one is placed in the input's directory.
    pub fn resolve_output(&self) -> PathBuf {
        let Some(requested) = &self.output else {
            return default_output_name(&self.input);
        };
        let mut output = requested.clone();
        if output.extension().is_none() {
            if let Some(ext) = self.input.extension() {
                output.set_extension(ext);
            }
        }
        if output.is_relative() {
            let dir = self.input.parent().unwrap_or_else(|| Path::new(""));
            output = dir.join(output);
        }
        output
    }

    /// Build the FFmpeg command arguments.
    pub fn ffmpeg_args(&self, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-ss".into(),
            format!("{:.3}", self.in_point.to_seconds_f64()),
            "-i".into(),
            self.input.to_string_lossy().into_owned(),
            "-t".into(),
            format!("{:.3}", self.duration().to_seconds_f64()),
            "-progress".into(),
            "pipe:2".into(),
            "-c".into(),
            "copy".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// The equivalent shell command, with file names shortened for display.
    pub fn command_line(&self) -> String {
        let output = self.resolve_output();
        let name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        format!(
            "ffmpeg -y -ss {:.3} -i {} -t {:.3} -c copy {}",
            self.in_point.to_seconds_f64(),
            name(&self.input),
            self.duration().to_seconds_f64(),
            name(&output)
        )
    }

    /// Run the export, sending completion fractions on `progress`.
    ///
    /// Returns the output path. `1.0` is sent once ffmpeg exits successfully.
    pub fn run(&self, ffmpeg: &Path, progress: &Sender<f64>, cancel: &CancelToken) -> Result<PathBuf> {
        self.validate()?;
        let output = self.resolve_output();
        let total_micros = self.duration().to_micros();

        info!(
            input = %self.input.display(),
            output = %output.display(),
            start = %self.in_point,
            length = %self.duration(),
            "Starting export"
        );

        let mut child = Command::new(ffmpeg)
            .args(self.ffmpeg_args(&output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LazycutError::Export(format!("Failed to spawn ffmpeg: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| LazycutError::Export("Failed to get stderr pipe".into()))?;

        for line in BufReader::new(stderr).lines() {
            if cancel.is_cancelled() {
                terminate(&mut child);
                return Err(LazycutError::Export("Export cancelled".into()));
            }
            let Ok(line) = line else { break };
            if let Some(fraction) = parse_progress_line(&line, total_micros) {
                // Progress is advisory; a full channel just drops the update.
                let _ = progress.try_send(fraction);
            }
        }

        let status = child
            .wait()
            .map_err(|e| LazycutError::Export(format!("Failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            warn!(%status, "Export failed");
            return Err(LazycutError::Export(format!("ffmpeg failed: {status}")));
        }

        let _ = progress.send(1.0);
        info!(output = %output.display(), "Export finished");
        Ok(output)
    }
}

/// Parse one `-progress` line into a completion fraction clamped to 1.0.
pub fn parse_progress_line(line: &str, total_micros: i64) -> Option<f64> {
    let value = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let micros: f64 = value.parse().ok()?;
    if total_micros <= 0 {
        return None;
    }
    Some((micros / total_micros as f64).clamp(0.0, 1.0))
}

/// `<stem>_trimmed<ext>`, then `<stem>_001<ext>`..`<stem>_999<ext>`, then
/// `<stem>_trimmed_new<ext>`, beside `input`.
pub fn default_output_name(input: &Path) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let trimmed = dir.join(format!("{stem}_trimmed{ext}"));
    if !trimmed.exists() {
        return trimmed;
    }
    (1..=999)
        .map(|i| dir.join(format!("{stem}_{i:03}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join(format!("{stem}_trimmed_new{ext}")))
}
