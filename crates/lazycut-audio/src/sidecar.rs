//! ffplay audio sidecar.

use lazycut_core::RationalTime;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SidecarState {
    child: Option<Child>,
    muted: bool,
}

/// Owns at most one audio playback process. All operations serialize on an
/// internal lock.
#[derive(Debug)]
pub struct AudioSidecar {
    player: PathBuf,
    media: PathBuf,
    state: Mutex<SidecarState>,
}

impl AudioSidecar {
    /// Create a sidecar playing `media` through `player` (ffplay).
    pub fn new(player: impl Into<PathBuf>, media: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
            media: media.into(),
            state: Mutex::new(SidecarState::default()),
        }
    }

    /// Player arguments for audio-only playback from `position`.
    pub fn player_args(&self, position: RationalTime) -> Vec<String> {
        vec![
            "-nodisp".into(),
            "-autoexit".into(),
            "-vn".into(),
            "-ss".into(),
            position.ffmpeg_seconds(),
            "-loglevel".into(),
            "quiet".into(),
            self.media.to_string_lossy().into_owned(),
        ]
    }

    /// (Re)start playback at `position`. No-op while muted; spawn failures
    /// are logged and otherwise ignored.
    pub fn start(&self, position: RationalTime) {
        let mut state = self.state.lock();
        if state.muted {
            return;
        }
        stop_locked(&mut state);

        match Command::new(&self.player)
            .args(self.player_args(position))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                debug!(pid = child.id(), %position, "Audio sidecar started");
                state.child = Some(child);
            }
            Err(e) => warn!(player = %self.player.display(), "Audio sidecar failed to start: {e}"),
        }
    }

    /// Kill and reap the player if one is running. Idempotent.
    pub fn stop(&self) {
        stop_locked(&mut self.state.lock());
    }

    /// Flip the mute state, stopping playback when muting. Returns the new state.
    pub fn toggle_mute(&self) -> bool {
        let mut state = self.state.lock();
        state.muted = !state.muted;
        if state.muted {
            stop_locked(&mut state);
        }
        state.muted
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    /// True while a spawned player has not exited.
    pub fn is_running(&self) -> bool {
        let mut state = self.state.lock();
        match state.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub fn media(&self) -> &Path {
        &self.media
    }
}

impl Drop for AudioSidecar {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stop_locked(state: &mut SidecarState) {
    if let Some(mut child) = state.child.take() {
        let _ = child.kill();
        let _ = child.wait();
        debug!(pid = child.id(), "Audio sidecar stopped");
    }
}
