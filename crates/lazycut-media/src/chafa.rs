//! Image-to-text conversion via chafa.

use lazycut_core::{LazycutError, QualityPreset, Result, TextFrame};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::process::check_status;

/// The five conversion parameters a quality preset fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChafaConfig {
    pub colors: &'static str,
    pub optimize: u8,
    pub work: u8,
    pub color_space: &'static str,
    pub dither: &'static str,
    pub color_extractor: &'static str,
}

impl ChafaConfig {
    /// Fast and cheap: 256 colors, no dithering.
    pub const LOW: Self = Self {
        colors: "256",
        optimize: 9,
        work: 1,
        color_space: "rgb",
        dither: "none",
        color_extractor: "average",
    };

    pub const MEDIUM: Self = Self {
        colors: "full",
        optimize: 5,
        work: 5,
        color_space: "rgb",
        dither: "ordered",
        color_extractor: "average",
    };

    /// Best fidelity: perceptual color space with error diffusion.
    pub const HIGH: Self = Self {
        colors: "full",
        optimize: 1,
        work: 9,
        color_space: "din99d",
        dither: "diffusion",
        color_extractor: "median",
    };

    pub fn for_quality(quality: QualityPreset) -> Self {
        match quality {
            QualityPreset::Low => Self::LOW,
            QualityPreset::Medium => Self::MEDIUM,
            QualityPreset::High => Self::HIGH,
        }
    }

    /// Arguments for converting one image from stdin to `width`x`height` cells.
    pub fn build_args(&self, width: u32, height: u32) -> Vec<String> {
        vec![
            "--format=symbols".into(),
            "--size".into(),
            format!("{width}x{height}"),
            "--colors".into(),
            self.colors.into(),
            "-O".into(),
            self.optimize.to_string(),
            "--work".into(),
            self.work.to_string(),
            "--color-space".into(),
            self.color_space.into(),
            "--dither".into(),
            self.dither.into(),
            "--color-extractor".into(),
            self.color_extractor.into(),
            "-".into(),
        ]
    }
}

/// Convert raw image bytes to a text frame in a single chafa run.
pub fn convert(
    chafa: &Path,
    image: &[u8],
    width: u32,
    height: u32,
    quality: QualityPreset,
) -> Result<TextFrame> {
    let args = ChafaConfig::for_quality(quality).build_args(width, height);
    let mut child = Command::new(chafa)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| LazycutError::Process(format!("Failed to spawn {}: {e}", chafa.display())))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| LazycutError::Process("Failed to open chafa stdin".into()))?;

    // Feed stdin on a scoped thread so a large output cannot deadlock the pipe.
    let output = std::thread::scope(|scope| {
        scope.spawn(move || {
            let _ = stdin.write_all(image);
        });
        child.wait_with_output()
    })?;

    check_status("chafa", output.status)?;
    Ok(TextFrame::from(String::from_utf8_lossy(&output.stdout).into_owned()))
}
