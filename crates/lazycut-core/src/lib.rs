//! Lazycut Core - Foundation types for the terminal trimmer
//!
//! This crate provides the fundamental types shared by every other crate:
//! - Time representation (RationalTime, FrameRate) and position quantization
//! - Rendered text frames and conversion quality presets
//! - The error taxonomy
//! - Cooperative cancellation tokens

pub mod cancel;
pub mod error;
pub mod frame;
pub mod time;

pub use cancel::CancelToken;
pub use error::{LazycutError, Result};
pub use frame::{QualityPreset, TextFrame};
pub use time::{FrameRate, RationalTime};
