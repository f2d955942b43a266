//! lazycut - terminal video trimmer
//!
//! Entry point: checks the environment, opens the preview pipeline and
//! drives it from line commands on stdin.

mod commands;

use anyhow::{bail, Context, Result};
use commands::{Command, HELP};
use lazycut_core::{CancelToken, RationalTime};
use lazycut_media::{check_dependencies, HwAccel};
use lazycut_playback::{FfmpegBackend, PlaybackConfig, PlaybackController};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "LAZYCUT_CONFIG";
const DEBUG_ENV: &str = "LAZYCUT_DEBUG";

fn main() -> Result<()> {
    init_logging();

    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => bail!("usage: lazycut <video>"),
    };
    if !path.is_file() {
        bail!("file not found: {}", path.display());
    }

    let config = load_config();
    check_dependencies(&config.tools)?;
    let hwaccel = HwAccel::detect(&config.tools.ffmpeg);
    info!(hwaccel = hwaccel.status(), "Hardware acceleration");

    let backend = FfmpegBackend::new(config.tools.clone(), hwaccel);
    let controller = PlaybackController::open(backend, &path, config)
        .with_context(|| format!("failed to open {}", path.display()))?;

    print_properties(&controller);
    run(&controller)?;
    controller.close();
    Ok(())
}

/// `RUST_LOG` wins; otherwise `LAZYCUT_DEBUG=1` enables debug output.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let debug = std::env::var(DEBUG_ENV).is_ok_and(|v| v == "1");
        EnvFilter::new(if debug { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config() -> PlaybackConfig {
    let Some(path) = std::env::var_os(CONFIG_ENV) else {
        return PlaybackConfig::default();
    };
    match PlaybackConfig::load(Path::new(&path)) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = ?path, "Ignoring config file: {e}");
            PlaybackConfig::default()
        }
    }
}

fn print_properties(controller: &PlaybackController) {
    let media = controller.properties();
    println!("{}", media.path.display());
    println!(
        "  {}  {}  {}  {}  {}  {}",
        media.resolution(),
        media.codec,
        media.formatted_fps(),
        media.formatted_bitrate(),
        media.formatted_file_size(),
        media.formatted_duration(),
    );
    println!("type 'help' for commands");
}

fn run(controller: &PlaybackController) -> Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let command = match Command::parse(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(message)) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };

        match command {
            Command::Play => controller.play()?,
            Command::Pause => controller.pause(),
            Command::Toggle => controller.toggle()?,
            Command::Seek(position) => controller.seek(position),
            Command::Step(frames) => controller.step(frames),
            Command::Size(width, height) => controller.set_size(width, height),
            Command::Quality => writeln!(out, "quality: {}", controller.cycle_quality())?,
            Command::MarkIn => {
                controller.mark_in();
                print_status(&mut out, controller)?;
            }
            Command::MarkOut => {
                controller.mark_out();
                print_status(&mut out, controller)?;
            }
            Command::Clear => {
                controller.clear_trim();
                print_status(&mut out, controller)?;
            }
            Command::Undo => {
                if !controller.undo_trim() {
                    writeln!(out, "nothing to undo")?;
                }
                print_status(&mut out, controller)?;
            }
            Command::Mute => {
                let muted = controller.toggle_mute();
                writeln!(out, "audio {}", if muted { "muted" } else { "on" })?;
            }
            Command::Export(output) => export(&mut out, controller, output)?,
            Command::Frame => writeln!(out, "{}", controller.current_frame())?,
            Command::Status => print_status(&mut out, controller)?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => break,
        }
        out.flush()?;
    }
    Ok(())
}

fn print_status(out: &mut impl Write, controller: &PlaybackController) -> io::Result<()> {
    let trim = controller.trim();
    let point = |p: Option<RationalTime>| p.map_or_else(|| "--".to_string(), |t| t.to_string());
    let (width, height) = controller.size();
    writeln!(
        out,
        "{} {} / {}  in {}  out {}  sel {}  est {}  {}x{} {}{}",
        if controller.is_playing() { "playing" } else { "paused" },
        controller.position(),
        controller.duration(),
        point(trim.in_point()),
        point(trim.out_point()),
        trim.duration(),
        controller.properties().estimate_output_size(trim.duration()),
        width,
        height,
        controller.quality(),
        if controller.is_muted() { " muted" } else { "" },
    )
}

fn export(
    out: &mut impl Write,
    controller: &PlaybackController,
    output: Option<PathBuf>,
) -> Result<()> {
    let job = match controller.export_job(output) {
        Ok(job) => job,
        Err(e) => {
            writeln!(out, "{e}")?;
            return Ok(());
        }
    };
    writeln!(out, "{}", job.command_line())?;

    let ffmpeg = controller.config().tools.ffmpeg.clone();
    let (tx, rx) = crossbeam_channel::unbounded();
    let cancel = CancelToken::new();
    let worker = thread::spawn(move || job.run(&ffmpeg, &tx, &cancel));

    for fraction in rx.iter() {
        write!(out, "\rexporting {:>3.0}%", fraction * 100.0)?;
        out.flush()?;
    }
    writeln!(out)?;

    match worker.join() {
        Ok(Ok(written)) => writeln!(out, "exported {}", written.display())?,
        Ok(Err(e)) => writeln!(out, "export failed: {e}")?,
        Err(_) => bail!("export thread panicked"),
    }
    Ok(())
}
