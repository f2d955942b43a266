//! Rendered preview frames and the presets used to produce them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A rendered text frame: printable output of the image-to-text converter.
///
/// Cloning is cheap; the cache, the controller and the UI share one buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TextFrame(Arc<str>);

impl TextFrame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Size of the rendered text in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<String> for TextFrame {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for TextFrame {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for TextFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversion quality preset. Part of every cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityPreset {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityPreset {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// The next preset, wrapping from High back to Low.
    pub fn next(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        f.write_str(label)
    }
}
