//! Lazycut Timeline - the in/out selection
//!
//! `TrimState` keeps the in and out points ordered by construction;
//! `TrimHistory` snapshots it so marks can be undone.

pub mod trim;

pub use trim::{TrimHistory, TrimState};
