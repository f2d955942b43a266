//! Line commands read from stdin.

use lazycut_core::RationalTime;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Toggle,
    Seek(RationalTime),
    Step(i64),
    Size(u32, u32),
    Quality,
    MarkIn,
    MarkOut,
    Clear,
    Undo,
    Mute,
    Export(Option<PathBuf>),
    Frame,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause | toggle      control playback
  seek <secs>                jump to a position
  step <n>                   move n frames (negative goes back)
  size <w> <h>               set the preview size in cells
  quality                    cycle LOW / MEDIUM / HIGH
  in | out | clear | undo    edit the trim range
  mute                       toggle audio
  export [name]              write the trimmed clip
  frame                      print the current frame
  status                     print position and trim
  quit";

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let mut words = line.split_whitespace();
        let name = words.next()?;
        let args: Vec<&str> = words.collect();
        Some(Self::from_parts(name, &args))
    }

    fn from_parts(name: &str, args: &[&str]) -> Result<Self, String> {
        let command = match (name, args) {
            ("play", []) => Self::Play,
            ("pause", []) => Self::Pause,
            ("toggle" | "space", []) => Self::Toggle,
            ("seek", [secs]) => {
                let secs: f64 = secs.parse().map_err(|_| format!("bad position: {secs}"))?;
                if !secs.is_finite() {
                    return Err(format!("bad position: {secs}"));
                }
                Self::Seek(RationalTime::from_seconds_f64(secs))
            }
            ("step", [n]) => Self::Step(n.parse().map_err(|_| format!("bad frame count: {n}"))?),
            ("size", [w, h]) => {
                let w = w.parse().map_err(|_| format!("bad width: {w}"))?;
                let h = h.parse().map_err(|_| format!("bad height: {h}"))?;
                Self::Size(w, h)
            }
            ("quality", []) => Self::Quality,
            ("in", []) => Self::MarkIn,
            ("out", []) => Self::MarkOut,
            ("clear", []) => Self::Clear,
            ("undo", []) => Self::Undo,
            ("mute", []) => Self::Mute,
            ("export", []) => Self::Export(None),
            ("export", [name]) => Self::Export(Some(PathBuf::from(name))),
            ("frame", []) => Self::Frame,
            ("status", []) => Self::Status,
            ("help" | "?", []) => Self::Help,
            ("quit" | "q" | "exit", []) => Self::Quit,
            _ => return Err(format!("unknown command: {name} (try 'help')")),
        };
        Ok(command)
    }
}
