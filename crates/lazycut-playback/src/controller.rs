//! Playback state machine.
//!
//! One [`Session`] per opened file lives behind a single lock shared by the
//! caller's thread and the playback thread. Blocking work (process spawns,
//! pipe reads, conversions) always happens outside that lock on snapshots
//! taken under it.
//!
//! User-facing operations additionally serialize on a control lock that owns
//! the playback thread's handle, so `pause` can signal the loop and wait for
//! it to exit before returning.

use lazycut_audio::AudioSidecar;
use lazycut_core::{
    CancelToken, FrameRate, LazycutError, QualityPreset, RationalTime, Result, TextFrame,
};
use lazycut_media::{ExportJob, MediaProbe, StillRequest, StreamSpec};
use lazycut_timeline::{TrimHistory, TrimState};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::backend::{FfmpegBackend, FrameSource, Interrupter, PreviewBackend};
use crate::cache::FrameCache;
use crate::config::PlaybackConfig;
use crate::scheduler::{RenderRequest, RenderScheduler};

/// Longest single sleep while pacing, so a stop signal is noticed quickly.
const PACE_SLICE: Duration = Duration::from_millis(10);

/// Mutable state of one opened file.
struct Session {
    position: RationalTime,
    playing: bool,
    width: u32,
    height: u32,
    quality: QualityPreset,
    current_frame: TextFrame,
    /// Stop signal of the running playback loop.
    stop: Option<CancelToken>,
    /// Interrupts the loop's blocked read.
    stream: Option<Interrupter>,
    /// Bumped by every seek; frames read under an older epoch are dropped.
    seek_epoch: u64,
    trim: TrimState,
    history: TrimHistory,
}

/// What the playback loop works from for one iteration.
#[derive(Clone, Copy)]
struct Snapshot {
    position: RationalTime,
    width: u32,
    height: u32,
    quality: QualityPreset,
    epoch: u64,
}

struct Shared<B: PreviewBackend> {
    backend: B,
    media: MediaProbe,
    /// Rate the stream is decoded and played at.
    fps: FrameRate,
    config: PlaybackConfig,
    cache: FrameCache,
    scheduler: RenderScheduler,
    audio: AudioSidecar,
    session: Mutex<Session>,
}

/// Drives preview playback of one media file.
pub struct PlaybackController<B: PreviewBackend = FfmpegBackend> {
    shared: Arc<Shared<B>>,
    /// Handle of the playback thread, if one was started.
    control: Mutex<Option<JoinHandle<()>>>,
}

impl<B: PreviewBackend> PlaybackController<B> {
    /// Probe `path` through the backend and open a stopped session at zero.
    pub fn open(backend: B, path: impl AsRef<Path>, config: PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let media = backend.probe(path.as_ref())?;
        info!(
            path = %media.path.display(),
            resolution = %media.resolution(),
            fps = %media.frame_rate,
            duration = %media.duration,
            "Opened media"
        );
        Ok(Self::with_media(backend, media, config))
    }

    /// Open a session for already-probed media.
    pub fn with_media(backend: B, media: MediaProbe, config: PlaybackConfig) -> Self {
        let fps = media.frame_rate.or_default().capped(config.preview_fps_cap);
        let cache = FrameCache::new(config.cache_capacity, media.frame_rate);
        let scheduler =
            RenderScheduler::new(config.max_concurrent_renders, config.render_timeout());
        let audio = AudioSidecar::new(&config.tools.ffplay, &media.path);
        let session = Session {
            position: RationalTime::ZERO,
            playing: false,
            width: 0,
            height: 0,
            quality: config.initial_quality,
            current_frame: TextFrame::default(),
            stop: None,
            stream: None,
            seek_epoch: 0,
            trim: TrimState::new(),
            history: TrimHistory::new(config.undo_depth),
        };

        Self {
            shared: Arc::new(Shared {
                backend,
                media,
                fps,
                config,
                cache,
                scheduler,
                audio,
                session: Mutex::new(session),
            }),
            control: Mutex::new(None),
        }
    }

    /// Set the render target size. While stopped, a changed size re-renders
    /// the current position.
    pub fn set_size(&self, width: u32, height: u32) {
        let _control = self.control.lock();
        let render_at = {
            let mut s = self.shared.session.lock();
            if s.width == width && s.height == height {
                return;
            }
            s.width = width;
            s.height = height;
            (!s.playing).then_some((s.position, s.quality))
        };
        if let Some((position, quality)) = render_at {
            self.shared.render_cached(position, width, height, quality);
        }
    }

    /// Start playback from the current position. Returns once the playback
    /// thread is running.
    pub fn play(&self) -> Result<()> {
        let mut control = self.control.lock();
        let (stop, position) = {
            let mut s = self.shared.session.lock();
            if s.playing {
                return Ok(());
            }
            let stop = CancelToken::new();
            s.playing = true;
            s.stop = Some(stop.clone());
            (stop, s.position)
        };

        // A loop that ended on its own may still be stopping the audio.
        if let Some(finished) = control.take() {
            let _ = finished.join();
        }

        self.shared.audio.start(position);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("lazycut-playback".into())
            .spawn(move || shared.playback_loop(stop));

        match spawned {
            Ok(handle) => {
                info!(%position, fps = %self.shared.fps, "Playback started");
                *control = Some(handle);
                Ok(())
            }
            Err(e) => {
                {
                    let mut s = self.shared.session.lock();
                    s.playing = false;
                    s.stop = None;
                }
                self.shared.audio.stop();
                Err(LazycutError::Process(format!("Failed to spawn playback thread: {e}")))
            }
        }
    }

    /// Stop playback and show a fresh still of the current position.
    pub fn pause(&self) {
        let mut control = self.control.lock();
        if !self.shared.halt(&mut control) {
            return;
        }
        let (position, width, height, quality) = {
            let s = self.shared.session.lock();
            (s.position, s.width, s.height, s.quality)
        };
        info!(%position, "Playback paused");
        self.shared.render_cached(position, width, height, quality);
    }

    pub fn toggle(&self) -> Result<()> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Move to `position`, clamped to the media. While playing the stream is
    /// torn down and restarted there; while stopped a still is rendered.
    pub fn seek(&self, position: RationalTime) {
        let _control = self.control.lock();
        let target = position.max(RationalTime::ZERO).min(self.shared.media.duration);
        let (playing, stream, width, height, quality) = {
            let mut s = self.shared.session.lock();
            s.position = target;
            s.seek_epoch += 1;
            let stream = if s.playing { s.stream.take() } else { None };
            (s.playing, stream, s.width, s.height, s.quality)
        };
        debug!(%target, playing, "Seek");

        self.shared.audio.stop();
        if playing {
            if let Some(stream) = stream {
                stream.interrupt();
            }
            self.shared.audio.start(target);
        } else {
            self.shared.render_cached(target, width, height, quality);
        }
    }

    /// Seek by whole frames of the native rate. Negative steps go back.
    pub fn step(&self, frames: i64) {
        let rate = self.shared.media.frame_rate.or_default();
        // Anything past the media length lands on the same bound after the
        // seek clamp, so bound the count before it reaches the multiply.
        let limit = self.duration().to_frames(rate).saturating_add(1);
        let frames = frames.clamp(-limit, limit);
        self.seek(self.position() + rate.frame_duration() * frames);
    }

    /// Advance to the next quality preset. While stopped the current
    /// position is re-rendered at the new preset.
    pub fn cycle_quality(&self) -> QualityPreset {
        let _control = self.control.lock();
        let (quality, render_at) = {
            let mut s = self.shared.session.lock();
            s.quality = s.quality.next();
            (s.quality, (!s.playing).then_some((s.position, s.width, s.height)))
        };
        debug!(%quality, "Quality changed");
        if let Some((position, width, height)) = render_at {
            self.shared.render_cached(position, width, height, quality);
        }
        quality
    }

    /// Stop everything this controller started. Safe to call repeatedly.
    pub fn close(&self) {
        let mut control = self.control.lock();
        self.shared.halt(&mut control);
        if let Some(finished) = control.take() {
            let _ = finished.join();
        }
        self.shared.audio.stop();
        self.shared.scheduler.cancel_all();
    }

    pub fn position(&self) -> RationalTime {
        self.shared.session.lock().position
    }

    pub fn duration(&self) -> RationalTime {
        self.shared.media.duration
    }

    pub fn is_playing(&self) -> bool {
        self.shared.session.lock().playing
    }

    /// The frame the UI should display.
    pub fn current_frame(&self) -> TextFrame {
        self.shared.session.lock().current_frame.clone()
    }

    pub fn quality(&self) -> QualityPreset {
        self.shared.session.lock().quality
    }

    /// Playback frame rate.
    pub fn fps(&self) -> FrameRate {
        self.shared.fps
    }

    pub fn path(&self) -> &Path {
        &self.shared.media.path
    }

    pub fn properties(&self) -> &MediaProbe {
        &self.shared.media
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.shared.config
    }

    pub fn size(&self) -> (u32, u32) {
        let s = self.shared.session.lock();
        (s.width, s.height)
    }

    pub fn cache_len(&self) -> usize {
        self.shared.cache.len()
    }

    pub fn trim(&self) -> TrimState {
        self.shared.session.lock().trim
    }

    /// Mark the in point at the current position.
    pub fn mark_in(&self) -> TrimState {
        self.edit_trim(|trim, position| trim.set_in(position))
    }

    /// Mark the out point at the current position.
    pub fn mark_out(&self) -> TrimState {
        self.edit_trim(|trim, position| trim.set_out(position))
    }

    pub fn clear_trim(&self) -> TrimState {
        self.edit_trim(|trim, _| trim.clear())
    }

    /// Restore the trim from before the last edit. False if nothing to undo.
    pub fn undo_trim(&self) -> bool {
        let mut s = self.shared.session.lock();
        let Session { trim, history, .. } = &mut *s;
        history.undo(trim)
    }

    fn edit_trim(&self, edit: impl FnOnce(&mut TrimState, RationalTime)) -> TrimState {
        let mut s = self.shared.session.lock();
        let position = s.position;
        let Session { trim, history, .. } = &mut *s;
        history.record(trim);
        edit(trim, position);
        *trim
    }

    /// An export of the marked range, optionally to `output`.
    pub fn export_job(&self, output: Option<PathBuf>) -> Result<ExportJob> {
        let (in_point, out_point) = self.trim().range().ok_or_else(|| {
            LazycutError::Export("set both in and out points before exporting".into())
        })?;
        let mut job = ExportJob::new(self.path(), in_point, out_point);
        if let Some(output) = output {
            job = job.with_output(output);
        }
        job.validate()?;
        Ok(job)
    }

    /// Flip audio mute. Unmuting during playback resumes audio at the
    /// current position. Returns the new state.
    pub fn toggle_mute(&self) -> bool {
        let muted = self.shared.audio.toggle_mute();
        let (playing, position) = {
            let s = self.shared.session.lock();
            (s.playing, s.position)
        };
        if !muted && playing {
            self.shared.audio.start(position);
        }
        muted
    }

    pub fn is_muted(&self) -> bool {
        self.shared.audio.is_muted()
    }
}

impl<B: PreviewBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<B: PreviewBackend> Shared<B> {
    /// Stop a running playback loop and wait for it to exit. False if
    /// nothing was playing.
    fn halt(&self, control: &mut Option<JoinHandle<()>>) -> bool {
        let (stop, stream) = {
            let mut s = self.session.lock();
            if !s.playing {
                return false;
            }
            s.playing = false;
            (s.stop.take(), s.stream.take())
        };

        if let Some(stop) = stop {
            stop.cancel();
        }
        if let Some(stream) = stream {
            stream.interrupt();
        }
        if let Some(handle) = control.take() {
            if handle.join().is_err() {
                warn!("Playback thread panicked");
            }
        }
        self.audio.stop();
        true
    }

    /// Show the frame at `position`, from cache or via a still render.
    /// Failures leave the current frame in place.
    fn render_cached(
        self: &Arc<Self>,
        position: RationalTime,
        width: u32,
        height: u32,
        quality: QualityPreset,
    ) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(frame) = self.cache.get(position, width, height, quality) {
            self.session.lock().current_frame = frame;
            return;
        }

        let request = RenderRequest {
            position,
            width,
            height,
            quality,
            sequence: self.scheduler.next_sequence(),
        };
        let still = StillRequest {
            path: self.media.path.clone(),
            position,
            fps: self.media.frame_rate,
            width,
            height,
            quality,
        };
        let shared = Arc::clone(self);
        let rendered = self
            .scheduler
            .submit_sync(request, move |cancel| shared.backend.render_still(&still, cancel));

        match rendered {
            Ok(frame) => {
                self.cache.put(position, width, height, quality, frame.clone());
                self.session.lock().current_frame = frame;
            }
            Err(e) => debug!(%position, "Still render failed: {e}"),
        }
    }

    /// Current loop inputs, or `None` once playback has stopped.
    fn snapshot(&self, stop: &CancelToken) -> Option<Snapshot> {
        let s = self.session.lock();
        if !s.playing || stop.is_cancelled() {
            return None;
        }
        Some(Snapshot {
            position: s.position,
            width: s.width,
            height: s.height,
            quality: s.quality,
            epoch: s.seek_epoch,
        })
    }

    /// Publish a freshly opened source's interrupter. False if a pause or
    /// seek happened while it was opening.
    fn register_stream(&self, source: &B::Source, epoch: u64, stop: &CancelToken) -> bool {
        let mut s = self.session.lock();
        if !s.playing || stop.is_cancelled() || s.seek_epoch != epoch {
            return false;
        }
        s.stream = Some(source.interrupter());
        true
    }

    fn seek_epoch(&self) -> u64 {
        self.session.lock().seek_epoch
    }

    /// Clamp to the end and stop. Caller stops audio after releasing the lock.
    fn end_locked(&self, s: &mut Session) {
        s.position = self.media.duration;
        s.playing = false;
        s.stop = None;
        s.stream = None;
    }

    /// End playback at the end of the media unless it was already stopped.
    fn finish(&self, stop: &CancelToken) {
        {
            let mut s = self.session.lock();
            if !s.playing || stop.is_cancelled() {
                return;
            }
            self.end_locked(&mut s);
        }
        self.audio.stop();
        info!(duration = %self.media.duration, "Playback reached end of media");
    }

    fn playback_loop(self: Arc<Self>, stop: CancelToken) {
        let interval = self.fps.frame_duration();
        let period = Duration::from_micros(interval.to_micros().max(1) as u64);
        let duration = self.media.duration;

        let mut source: Option<B::Source> = None;
        // The source has not produced a frame yet.
        let mut fresh = false;
        let mut empty_streams = 0u32;
        let mut next_due = Instant::now();

        debug!(fps = %self.fps, "Playback loop running");
        while let Some(snap) = self.snapshot(&stop) {
            if snap.position >= duration {
                self.finish(&stop);
                break;
            }
            if snap.width == 0 || snap.height == 0 {
                thread::sleep(self.config.idle_interval());
                continue;
            }

            let restart = source
                .as_ref()
                .map_or(true, |s| s.needs_restart(snap.width, snap.height, self.fps));
            if restart {
                if let Some(mut old) = source.take() {
                    old.close();
                }
                let spec = StreamSpec {
                    path: self.media.path.clone(),
                    start: snap.position,
                    width: snap.width,
                    height: snap.height,
                    fps: self.fps,
                    source_width: self.media.width,
                };
                match self.backend.open_stream(&spec) {
                    Ok(mut opened) => {
                        if !self.register_stream(&opened, snap.epoch, &stop) {
                            opened.close();
                            continue;
                        }
                        source = Some(opened);
                        fresh = true;
                        next_due = Instant::now();
                    }
                    Err(e) => {
                        warn!(position = %snap.position, "Failed to start frame stream: {e}");
                        thread::sleep(self.config.stream_retry());
                        continue;
                    }
                }
            }
            let Some(active) = source.as_mut() else {
                continue;
            };

            let bytes = match active.next_frame() {
                Ok(bytes) => bytes,
                Err(e) => {
                    if e.is_end_of_stream() {
                        debug!(position = %snap.position, "Frame stream ended");
                    } else {
                        warn!(position = %snap.position, "Frame stream failed: {e}");
                    }
                    active.close();
                    source = None;

                    let interrupted = stop.is_cancelled() || self.seek_epoch() != snap.epoch;
                    if fresh && !interrupted {
                        empty_streams += 1;
                        if empty_streams >= self.config.max_empty_streams {
                            debug!(position = %snap.position, "No frames left to decode");
                            self.finish(&stop);
                            break;
                        }
                        thread::sleep(self.config.stream_retry());
                    }
                    continue;
                }
            };
            fresh = false;
            empty_streams = 0;

            if stop.is_cancelled() {
                break;
            }
            let converted =
                self.backend
                    .convert_frame(&bytes, snap.width, snap.height, snap.quality);
            pace(next_due, &stop);
            next_due += period;

            let mut s = self.session.lock();
            if stop.is_cancelled() || !s.playing {
                break;
            }
            if s.seek_epoch != snap.epoch {
                drop(s);
                if let Some(mut stale) = source.take() {
                    stale.close();
                }
                continue;
            }

            match converted {
                Ok(frame) => {
                    self.cache
                        .put(snap.position, snap.width, snap.height, snap.quality, frame.clone());
                    s.current_frame = frame;
                }
                // The stream already consumed this frame, so the position
                // still advances and the previous image stays on screen.
                Err(e) => debug!(position = %snap.position, "Frame conversion failed: {e}"),
            }

            let next = snap.position + interval;
            if next >= duration {
                self.end_locked(&mut s);
                drop(s);
                self.audio.stop();
                info!(duration = %duration, "Playback reached end of media");
                break;
            }
            s.position = next;
        }

        if let Some(mut active) = source {
            active.close();
        }
        debug!("Playback loop exited");
    }
}

/// Sleep until `deadline`, waking early if `stop` fires.
fn pace(deadline: Instant, stop: &CancelToken) {
    loop {
        let now = Instant::now();
        if now >= deadline || stop.is_cancelled() {
            return;
        }
        thread::sleep((deadline - now).min(PACE_SLICE));
    }
}
