//! Media file probing via ffprobe.

use lazycut_core::{FrameRate, LazycutError, RationalTime, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

use crate::stream::PREVIEW_MAX_WIDTH;

/// Information about a media file. Fields ffprobe omits stay zero/empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub frame_rate: FrameRate,
    /// Bits per second.
    pub bit_rate: u64,
    /// Container size in bytes.
    pub file_size: u64,
    pub duration: RationalTime,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    codec_name: String,
    #[serde(default)]
    r_frame_rate: String,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

impl MediaProbe {
    /// Probe a media file.
    pub fn probe(ffprobe: &Path, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LazycutError::NotFound(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let output = Command::new(ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration,size,bit_rate",
                "-show_entries",
                "stream=width,height,codec_name,r_frame_rate",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                LazycutError::Process(format!("Failed to run {}: {e}", ffprobe.display()))
            })?;

        if !output.status.success() {
            return Err(LazycutError::Probe(format!(
                "ffprobe failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut probe = Self::from_json(path, &output.stdout)?;
        if probe.file_size == 0 {
            probe.file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        }

        info!(
            path = %path.display(),
            resolution = %probe.resolution(),
            fps = %probe.frame_rate,
            duration = %probe.duration,
            "Probed media"
        );
        Ok(probe)
    }

    /// Build from ffprobe's JSON output. The first stream with a picture
    /// size supplies the video fields.
    pub fn from_json(path: &Path, json: &[u8]) -> Result<Self> {
        let parsed: FfprobeOutput = serde_json::from_slice(json)
            .map_err(|e| LazycutError::Probe(format!("failed to parse ffprobe output: {e}")))?;

        let video = parsed
            .streams
            .into_iter()
            .find(|s| s.width > 0 && s.height > 0)
            .unwrap_or_default();

        let seconds = parse_or_zero::<f64>(parsed.format.duration.as_deref());

        Ok(Self {
            path: path.to_path_buf(),
            width: video.width,
            height: video.height,
            codec: video.codec_name,
            frame_rate: FrameRate::parse_ratio(&video.r_frame_rate),
            bit_rate: parse_or_zero(parsed.format.bit_rate.as_deref()),
            file_size: parse_or_zero(parsed.format.size.as_deref()),
            duration: RationalTime::from_seconds_f64(seconds.max(0.0)),
        })
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn formatted_fps(&self) -> String {
        format!("{:.2} fps", self.frame_rate.to_fps_f64())
    }

    pub fn formatted_bitrate(&self) -> String {
        if self.bit_rate == 0 {
            return "N/A".into();
        }
        format!("{:.1} Mbps", self.bit_rate as f64 / 1_000_000.0)
    }

    pub fn formatted_file_size(&self) -> String {
        if self.file_size == 0 {
            return "N/A".into();
        }
        let mb = self.file_size as f64 / (1024.0 * 1024.0);
        if mb >= 1024.0 {
            format!("{:.1} GB", mb / 1024.0)
        } else {
            format!("{:.1} MB", mb)
        }
    }

    /// Duration as `MM:SS`.
    pub fn formatted_duration(&self) -> String {
        let total = self.duration.to_seconds_f64() as u64;
        format!("{:02}:{:02}", total / 60, total % 60)
    }

    /// Rough output size for a stream-copied selection, proportional to length.
    pub fn estimate_output_size(&self, selection: RationalTime) -> String {
        if self.bit_rate == 0 || self.duration.is_zero() {
            return "N/A".into();
        }
        let ratio = selection.to_seconds_f64() / self.duration.to_seconds_f64();
        let mb = self.file_size as f64 * ratio / (1024.0 * 1024.0);
        format!("~{:.1} MB", mb)
    }

    /// Native rate capped at 30 whole frames per second.
    pub fn preview_fps(&self) -> u32 {
        (self.frame_rate.to_fps_f64() as u32).min(30)
    }

    /// True if the preview stream downscales before converting.
    pub fn needs_scaling(&self) -> bool {
        self.width > PREVIEW_MAX_WIDTH
    }
}

fn parse_or_zero<T: std::str::FromStr + Default>(value: Option<&str>) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or_default()
}
