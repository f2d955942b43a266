//! Lazycut Playback - the preview rendering pipeline
//!
//! Architecture:
//! - `FrameCache`: LRU of rendered frames keyed by quantized position, size and quality
//! - `RenderScheduler`: bounded-concurrency renders with latest-wins sequence fencing
//! - `PlaybackController`: play/pause/seek state machine driving the frame stream,
//!   the cache, the scheduler and the audio sidecar
//! - `PreviewBackend`: the seam to the external decode/convert tools

pub mod backend;
pub mod cache;
pub mod config;
pub mod controller;
pub mod scheduler;

pub use backend::{FfmpegBackend, FrameSource, Interrupter, PreviewBackend};
pub use cache::{CacheKey, FrameCache};
pub use config::PlaybackConfig;
pub use controller::PlaybackController;
pub use scheduler::{RenderRequest, RenderScheduler};
