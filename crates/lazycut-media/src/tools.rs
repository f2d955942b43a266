//! Locations of the external tools and the startup availability check.

use lazycut_core::{LazycutError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Executables invoked by lazycut. Names are resolved on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub ffplay: PathBuf,
    pub chafa: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            ffplay: PathBuf::from("ffplay"),
            chafa: PathBuf::from("chafa"),
        }
    }
}

/// Verify every tool resolves, naming the first missing one.
pub fn check_dependencies(tools: &ToolPaths) -> Result<()> {
    let required: [(&Path, &str); 4] = [
        (&tools.ffmpeg, "brew install ffmpeg"),
        (&tools.ffprobe, "brew install ffmpeg"),
        (&tools.ffplay, "brew install ffmpeg"),
        (&tools.chafa, "brew install chafa"),
    ];
    for (tool, hint) in required {
        match which::which(tool) {
            Ok(found) => debug!(tool = %tool.display(), path = %found.display(), "Found tool"),
            Err(_) => {
                return Err(LazycutError::NotFound(format!(
                    "{} not found. Install: {hint}",
                    tool.display()
                )))
            }
        }
    }
    Ok(())
}
