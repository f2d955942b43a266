//! Lazycut Audio - best-effort audio playback
//!
//! Audio is played by an independent ffplay process, restarted on every
//! seek and loosely following the playback controller. It is never
//! frame-synchronised with the text preview.

pub mod sidecar;

pub use sidecar::AudioSidecar;
