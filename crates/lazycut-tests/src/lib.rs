//! Integration test crate for lazycut.
//!
//! This crate exists solely to hold cross-crate integration tests. The
//! playback tests drive the real controller through an in-memory backend so
//! they run without ffmpeg or chafa installed.

#[cfg(test)]
mod support;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod scheduler;

#[cfg(test)]
mod protocol;

#[cfg(test)]
mod trim;
