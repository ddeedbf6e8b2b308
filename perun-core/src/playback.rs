//! Keeps a media element, a position slider and the highlighted transcript
//! segment in agreement.
//!
//! The media element is driven through [`MediaTransport`] and reports back
//! through [`MediaEvent`]s. Every state change is published on a
//! [`tokio::sync::watch`] channel; a call that leaves the state untouched
//! publishes nothing.

use crate::error::Result;
use crate::timestamp;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Commands understood by a media element
pub trait MediaTransport {
    /// Point the element at a new source; `None` unloads it
    fn set_source(&mut self, source: Option<&str>);
    fn set_current_time(&mut self, seconds: f64);
    /// Start playback; the element may refuse (autoplay policy, bad source)
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PlaybackPhase {
    #[default]
    Empty,
    Loading,
    ReadyPaused,
    ReadyPlaying,
    Ended,
}

impl PlaybackPhase {
    /// Whether the media has metadata and accepts seeks
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            PlaybackPhase::ReadyPaused | PlaybackPhase::ReadyPlaying | PlaybackPhase::Ended
        )
    }
}

/// Snapshot published to views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    /// Seconds
    pub position: f64,
    /// Seconds; 0 until metadata is known
    pub duration: f64,
    /// In `[0, 1]`
    pub volume: f64,
    pub muted: bool,
    /// User-visible message after a playback failure
    pub status: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Empty,
            position: 0.0,
            duration: 0.0,
            volume: 1.0,
            muted: false,
            status: None,
        }
    }
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::ReadyPlaying
    }

    /// Position as a fraction of the duration
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// `m:ss / m:ss`
    pub fn clock_label(&self) -> String {
        format!(
            "{} / {}",
            timestamp::format_clock(self.position),
            timestamp::format_clock(self.duration)
        )
    }
}

/// Events reported by the media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    DurationChange { duration: f64 },
    TimeUpdate { position: f64 },
    Play,
    Pause,
    Ended,
    Error { message: String },
}

/// State machine between a media element and the views observing it
pub struct PlaybackBridge<T: MediaTransport> {
    transport: T,
    state: watch::Sender<PlaybackState>,
}

impl<T: MediaTransport> PlaybackBridge<T> {
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(PlaybackState::default());
        Self { transport, state }
    }

    /// Current snapshot
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Load a new source, or unload with `None`
    pub fn set_source(&mut self, source: Option<&str>) {
        self.transport.set_source(source);
        let phase = match source {
            Some(_) => PlaybackPhase::Loading,
            None => PlaybackPhase::Empty,
        };
        debug!("Media source changed, now {}", phase);
        self.update(|state| {
            state.phase = phase;
            state.position = 0.0;
            state.duration = 0.0;
            state.status = None;
        });
    }

    /// Feed an event from the media element
    pub fn handle_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::LoadedMetadata { duration } => self.update(|state| {
                state.duration = sanitize(duration);
                if state.phase == PlaybackPhase::Loading {
                    state.phase = PlaybackPhase::ReadyPaused;
                }
            }),
            MediaEvent::DurationChange { duration } => self.update(|state| {
                state.duration = sanitize(duration);
                state.position = state.position.min(state.duration);
            }),
            MediaEvent::TimeUpdate { position } => self.update(|state| {
                if state.phase.is_ready() {
                    state.position = clamp_to(position, state.duration);
                }
            }),
            MediaEvent::Play => self.update(|state| {
                if matches!(state.phase, PlaybackPhase::ReadyPaused | PlaybackPhase::Ended) {
                    state.phase = PlaybackPhase::ReadyPlaying;
                    state.status = None;
                }
            }),
            MediaEvent::Pause => self.update(|state| {
                if state.phase == PlaybackPhase::ReadyPlaying {
                    state.phase = PlaybackPhase::ReadyPaused;
                }
            }),
            MediaEvent::Ended => self.update(|state| {
                if state.phase == PlaybackPhase::ReadyPlaying {
                    state.phase = PlaybackPhase::Ended;
                    state.position = state.duration;
                }
            }),
            MediaEvent::Error { message } => {
                warn!("Media element error: {}", message);
                self.update(|state| {
                    if state.phase.is_ready() {
                        state.phase = PlaybackPhase::ReadyPaused;
                    }
                    state.status = Some(format!("Playback error: {}", message));
                });
            }
        }
    }

    /// Start playback; restarts from the beginning after the end
    pub fn play(&mut self) {
        let phase = self.state.borrow().phase;
        if !matches!(phase, PlaybackPhase::ReadyPaused | PlaybackPhase::Ended) {
            return;
        }

        let restart = phase == PlaybackPhase::Ended;
        if restart {
            self.transport.set_current_time(0.0);
        }

        match self.transport.play() {
            Ok(()) => self.update(|state| {
                if restart {
                    state.position = 0.0;
                }
                state.phase = PlaybackPhase::ReadyPlaying;
                state.status = None;
            }),
            Err(e) => {
                warn!("Playback refused: {}", e);
                self.update(|state| {
                    if restart {
                        state.position = 0.0;
                    }
                    state.phase = PlaybackPhase::ReadyPaused;
                    state.status = Some(format!("Playback failed: {}", e));
                });
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state.borrow().phase != PlaybackPhase::ReadyPlaying {
            return;
        }
        self.transport.pause();
        self.update(|state| state.phase = PlaybackPhase::ReadyPaused);
    }

    pub fn toggle_play(&mut self) {
        if self.state.borrow().is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `seconds`, clamped to the media duration.
    ///
    /// The position is updated before the element confirms it. Ignored until
    /// metadata is known.
    pub fn seek_to(&mut self, seconds: f64) {
        let (ready, duration) = {
            let state = self.state.borrow();
            (state.phase.is_ready(), state.duration)
        };
        if !ready {
            debug!("Ignoring seek before media is ready");
            return;
        }

        let target = clamp_to(seconds, duration);
        self.transport.set_current_time(target);
        self.update(|state| {
            state.position = target;
            if state.phase == PlaybackPhase::Ended && target < state.duration {
                state.phase = PlaybackPhase::ReadyPaused;
            }
        });
    }

    pub fn skip_forward(&mut self, seconds: f64) {
        let position = self.state.borrow().position;
        self.seek_to(position + seconds.abs());
    }

    pub fn skip_backward(&mut self, seconds: f64) {
        let position = self.state.borrow().position;
        self.seek_to(position - seconds.abs());
    }

    /// Set the volume in `[0, 1]`; any audible volume unmutes
    pub fn set_volume(&mut self, volume: f64) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        let unmute = volume > 0.0 && self.state.borrow().muted;
        self.transport.set_volume(volume);
        if unmute {
            self.transport.set_muted(false);
        }
        self.update(|state| {
            state.volume = volume;
            if unmute {
                state.muted = false;
            }
        });
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.state.borrow().muted;
        self.transport.set_muted(muted);
        self.update(|state| state.muted = muted);
    }

    /// Publish only when `apply` actually changed the state
    fn update(&self, apply: impl FnOnce(&mut PlaybackState)) {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            apply(state);
            *state != before
        });
    }
}

fn sanitize(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

fn clamp_to(seconds: f64, duration: f64) -> f64 {
    if seconds.is_nan() {
        0.0
    } else {
        seconds.clamp(0.0, duration.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PerunError;

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Source(Option<String>),
        Seek(f64),
        Play,
        Pause,
        Volume(f64),
        Muted(bool),
    }

    #[derive(Debug, Default)]
    struct RecordingTransport {
        commands: Vec<Command>,
        refuse_play: bool,
    }

    impl MediaTransport for RecordingTransport {
        fn set_source(&mut self, source: Option<&str>) {
            self.commands.push(Command::Source(source.map(str::to_string)));
        }

        fn set_current_time(&mut self, seconds: f64) {
            self.commands.push(Command::Seek(seconds));
        }

        fn play(&mut self) -> Result<()> {
            if self.refuse_play {
                return Err(PerunError::Media("NotAllowedError".into()));
            }
            self.commands.push(Command::Play);
            Ok(())
        }

        fn pause(&mut self) {
            self.commands.push(Command::Pause);
        }

        fn set_volume(&mut self, volume: f64) {
            self.commands.push(Command::Volume(volume));
        }

        fn set_muted(&mut self, muted: bool) {
            self.commands.push(Command::Muted(muted));
        }
    }

    fn ready_bridge(duration: f64) -> PlaybackBridge<RecordingTransport> {
        let mut bridge = PlaybackBridge::new(RecordingTransport::default());
        bridge.set_source(Some("blob:media"));
        bridge.handle_event(MediaEvent::LoadedMetadata { duration });
        bridge
    }

    #[test]
    fn test_load_lifecycle() {
        let mut bridge = PlaybackBridge::new(RecordingTransport::default());
        assert_eq!(bridge.state().phase, PlaybackPhase::Empty);

        bridge.set_source(Some("blob:media"));
        assert_eq!(bridge.state().phase, PlaybackPhase::Loading);

        bridge.play();
        assert_eq!(bridge.state().phase, PlaybackPhase::Loading);

        bridge.handle_event(MediaEvent::LoadedMetadata { duration: 30.0 });
        let state = bridge.state();
        assert_eq!(state.phase, PlaybackPhase::ReadyPaused);
        assert_eq!(state.duration, 30.0);

        bridge.set_source(None);
        assert_eq!(bridge.state().phase, PlaybackPhase::Empty);
    }

    #[test]
    fn test_seek_is_clamped() {
        let mut bridge = ready_bridge(10.0);
        bridge.seek_to(15.0);
        assert_eq!(bridge.state().position, 10.0);
        bridge.seek_to(-3.0);
        assert_eq!(bridge.state().position, 0.0);
        bridge.seek_to(f64::NAN);
        assert_eq!(bridge.state().position, 0.0);
        assert_eq!(bridge.state().phase, PlaybackPhase::ReadyPaused);
        assert_eq!(
            bridge.transport().commands.last(),
            Some(&Command::Seek(0.0))
        );
    }

    #[test]
    fn test_seek_does_not_change_play_state() {
        let mut bridge = ready_bridge(60.0);
        bridge.play();
        bridge.seek_to(20.0);
        assert!(bridge.state().is_playing());
        bridge.skip_forward(10.0);
        assert_eq!(bridge.state().position, 30.0);
        bridge.skip_backward(45.0);
        assert_eq!(bridge.state().position, 0.0);
        assert!(bridge.state().is_playing());
    }

    #[test]
    fn test_play_is_idempotent() {
        let mut bridge = ready_bridge(10.0);
        let mut rx = bridge.subscribe();
        rx.borrow_and_update();

        bridge.play();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        bridge.play();
        assert!(!rx.has_changed().unwrap());
        let plays = bridge
            .transport()
            .commands
            .iter()
            .filter(|c| **c == Command::Play)
            .count();
        assert_eq!(plays, 1);

        bridge.pause();
        rx.borrow_and_update();
        bridge.pause();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_ended_restarts_from_zero() {
        let mut bridge = ready_bridge(10.0);
        bridge.play();
        bridge.handle_event(MediaEvent::TimeUpdate { position: 9.5 });
        bridge.handle_event(MediaEvent::Ended);
        let state = bridge.state();
        assert_eq!(state.phase, PlaybackPhase::Ended);
        assert_eq!(state.position, 10.0);

        bridge.play();
        let state = bridge.state();
        assert_eq!(state.phase, PlaybackPhase::ReadyPlaying);
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn test_refused_play_degrades_to_paused() {
        let mut bridge = ready_bridge(10.0);
        bridge.transport_mut().refuse_play = true;
        bridge.play();
        let state = bridge.state();
        assert_eq!(state.phase, PlaybackPhase::ReadyPaused);
        assert!(state.status.unwrap().contains("NotAllowedError"));
    }

    #[test]
    fn test_media_error_pauses() {
        let mut bridge = ready_bridge(10.0);
        bridge.play();
        bridge.handle_event(MediaEvent::Error {
            message: "decode failed".into(),
        });
        let state = bridge.state();
        assert_eq!(state.phase, PlaybackPhase::ReadyPaused);
        assert_eq!(state.status.as_deref(), Some("Playback error: decode failed"));
    }

    #[test]
    fn test_volume_unmutes() {
        let mut bridge = ready_bridge(10.0);
        bridge.toggle_mute();
        assert!(bridge.state().muted);
        bridge.set_volume(0.0);
        assert!(bridge.state().muted);
        bridge.set_volume(1.7);
        let state = bridge.state();
        assert!(!state.muted);
        assert_eq!(state.volume, 1.0);
    }

    #[test]
    fn test_clock_label() {
        let mut bridge = ready_bridge(125.0);
        bridge.seek_to(61.0);
        assert_eq!(bridge.state().clock_label(), "1:01 / 2:05");
    }
}
