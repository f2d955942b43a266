//! Child-process helpers shared by the pipelines.

use lazycut_core::{CancelToken, LazycutError, Result};
use std::process::{Child, ExitStatus};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Kill and reap a child, ignoring failures (it may already have exited).
pub(crate) fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Wait for a child to exit, killing it if `cancel` fires first.
pub(crate) fn wait_cancellable(child: &mut Child, cancel: &CancelToken) -> Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if cancel.is_cancelled() {
            terminate(child);
            return Err(LazycutError::Process("cancelled".into()));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Map a non-zero exit into a process error carrying the tool name.
pub(crate) fn check_status(tool: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(LazycutError::Process(format!("{tool} exited with status: {status}")))
    }
}
