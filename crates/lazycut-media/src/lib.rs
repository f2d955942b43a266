//! Lazycut Media - external tool integration
//!
//! Every decode, conversion and encode runs in an external process. This
//! crate handles:
//! - Media file probing (ffprobe)
//! - The persistent frame stream and its bitmap framing protocol
//! - Image-to-text conversion presets and the one-shot still pipeline
//! - Trim export with progress reporting
//! - Hardware acceleration detection and tool availability checks

pub mod chafa;
pub mod export;
pub mod hwaccel;
pub mod probe;
mod process;
pub mod render;
pub mod stream;
pub mod tools;

pub use chafa::ChafaConfig;
pub use export::ExportJob;
pub use hwaccel::HwAccel;
pub use probe::MediaProbe;
pub use render::StillRequest;
pub use stream::{FrameStream, StreamCloser, StreamSpec};
pub use tools::{check_dependencies, ToolPaths};
