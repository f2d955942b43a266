//! Hardware-accelerated decode selection.
//!
//! Detection runs `ffmpeg -hwaccels` once at startup; the resulting value is
//! passed to whoever builds decode commands.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HwAccel {
    /// Software decoding.
    #[default]
    None,
    VideoToolbox,
    Vaapi,
    Cuda,
    Dxva2,
}

impl HwAccel {
    /// Query ffmpeg and pick the preferred method for this OS.
    pub fn detect(ffmpeg: &Path) -> Self {
        let output = Command::new(ffmpeg)
            .arg("-hide_banner")
            .arg("-hwaccels")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        let available = match output {
            Ok(out) if out.status.success() => parse_hwaccels(&String::from_utf8_lossy(&out.stdout)),
            Ok(_) | Err(_) => Vec::new(),
        };
        debug!(?available, "ffmpeg hardware acceleration methods");

        let chosen = Self::select(std::env::consts::OS, &available);
        info!(hwaccel = chosen.status(), "Hardware acceleration detected");
        chosen
    }

    /// Preference order per OS among the methods ffmpeg reports.
    pub fn select(os: &str, available: &[String]) -> Self {
        let has = |name: &str| available.iter().any(|a| a == name);
        let preference: &[Self] = match os {
            "macos" => &[Self::VideoToolbox],
            "linux" => &[Self::Cuda, Self::Vaapi],
            "windows" => &[Self::Dxva2, Self::Cuda],
            _ => &[],
        };
        preference
            .iter()
            .copied()
            .find(|accel| accel.ffmpeg_name().is_some_and(has))
            .unwrap_or(Self::None)
    }

    /// Name passed to `-hwaccel`.
    pub fn ffmpeg_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::VideoToolbox => Some("videotoolbox"),
            Self::Vaapi => Some("vaapi"),
            Self::Cuda => Some("cuda"),
            Self::Dxva2 => Some("dxva2"),
        }
    }

    pub fn is_available(self) -> bool {
        self != Self::None
    }

    /// Input options to place before `-i`.
    pub fn input_args(self) -> Vec<String> {
        match self.ffmpeg_name() {
            Some(name) => vec!["-hwaccel".into(), name.into()],
            None => Vec::new(),
        }
    }

    /// Human-readable status.
    pub fn status(self) -> &'static str {
        match self {
            Self::None => "Software decoding",
            Self::VideoToolbox => "VideoToolbox (macOS)",
            Self::Vaapi => "VAAPI (Linux)",
            Self::Cuda => "CUDA (NVIDIA)",
            Self::Dxva2 => "DXVA2 (Windows)",
        }
    }
}

fn parse_hwaccels(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .map(String::from)
        .collect()
}
