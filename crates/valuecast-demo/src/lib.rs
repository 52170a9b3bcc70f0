#![forbid(unsafe_code)]

//! Scene playback built on `valuecast` dispatchers.
//!
//! A [`VideoClip`] owns its playback state and playhead as private
//! [`ValueDispatcher`]s and hands out only their subscribe-only views. A
//! [`Scene`] drives the clip forward in fixed steps, and an [`Overlay`]
//! observes it from the outside the way a renderer or HUD would.

pub mod cli;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};
use valuecast::{
    DispatchError, DispatcherConfig, EventDispatcher, SubscribableEvent, SubscribableValueEvent,
    SubscriptionGuard, ValueDispatcher,
};

/// Where a clip is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
    Finished,
}

impl PlaybackState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A playable clip with observable state and playhead.
pub struct VideoClip {
    name: String,
    length: f64,
    state: ValueDispatcher<PlaybackState>,
    playhead: ValueDispatcher<f64>,
    finished: EventDispatcher<String>,
}

impl VideoClip {
    /// Create a stopped clip of `length` seconds.
    ///
    /// Negative or non-finite lengths are treated as zero.
    pub fn new(name: impl Into<String>, length: f64, config: &DispatcherConfig) -> Self {
        let name = name.into();
        let length = if length.is_finite() { length.max(0.0) } else { 0.0 };
        let labelled = |suffix: &str| config.clone().with_label(format!("{name}.{suffix}"));
        Self {
            state: ValueDispatcher::with_config(PlaybackState::Stopped, labelled("state")),
            playhead: ValueDispatcher::with_config(0.0, labelled("playhead")),
            finished: EventDispatcher::with_config(labelled("finished")),
            name,
            length,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state.current()
    }

    #[must_use]
    pub fn position(&self) -> f64 {
        self.playhead.current()
    }

    pub fn on_state_changed(&self) -> &SubscribableValueEvent<PlaybackState> {
        self.state.subscribable()
    }

    pub fn on_time_changed(&self) -> &SubscribableValueEvent<f64> {
        self.playhead.subscribable()
    }

    /// Registrations across the state, playhead and finish events.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state.subscriber_count()
            + self.playhead.subscriber_count()
            + self.finished.subscriber_count()
    }

    /// Fires once with the clip name when the playhead reaches the end.
    pub fn on_finished(&self) -> &SubscribableEvent<String> {
        self.finished.subscribable()
    }

    /// Start or resume playback. Playing a finished clip rewinds it first.
    pub fn play(&self) -> Result<(), DispatchError> {
        match self.state.current() {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Finished => {
                self.playhead.set(0.0)?;
                self.state.set(PlaybackState::Playing)
            }
            PlaybackState::Stopped | PlaybackState::Paused => {
                self.state.set(PlaybackState::Playing)
            }
        }
    }

    pub fn pause(&self) -> Result<(), DispatchError> {
        if self.state.current() == PlaybackState::Playing {
            self.state.set(PlaybackState::Paused)?;
        }
        Ok(())
    }

    /// Stop playback and rewind to the start.
    pub fn stop(&self) -> Result<(), DispatchError> {
        self.state.set(PlaybackState::Stopped)?;
        self.playhead.set(0.0)
    }

    /// Move the playhead forward by `seconds` if the clip is playing.
    ///
    /// Non-positive and NaN steps are ignored.
    ///
    /// The playhead is clamped to the clip length; reaching it switches the
    /// state to [`PlaybackState::Finished`] and fires [`Self::on_finished`].
    pub fn advance(&self, seconds: f64) -> Result<(), DispatchError> {
        if self.state.current() != PlaybackState::Playing || seconds.is_nan() || seconds <= 0.0 {
            return Ok(());
        }
        let next = (self.playhead.current() + seconds).min(self.length);
        self.playhead.set(next)?;
        if next >= self.length {
            self.state.set(PlaybackState::Finished)?;
            self.finished.dispatch(&self.name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for VideoClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoClip")
            .field("name", &self.name)
            .field("length", &self.length)
            .field("state", &self.state.current())
            .field("position", &self.playhead.current())
            .finish()
    }
}

/// How a [`Scene`] spends wall-clock time between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Sleep for each step, so the scene takes as long as it says.
    #[default]
    Realtime,
    /// Advance immediately.
    Instant,
}

/// Summary of one [`Scene::play_for`] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneReport {
    pub steps: u32,
    pub position: f64,
    pub state: PlaybackState,
}

/// Plays a clip for a fixed duration.
#[derive(Debug)]
pub struct Scene {
    clip: VideoClip,
    step: Duration,
    pacing: Pacing,
}

impl Scene {
    pub fn new(clip: VideoClip, step: Duration) -> Self {
        Self {
            clip,
            step,
            pacing: Pacing::default(),
        }
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn clip(&self) -> &VideoClip {
        &self.clip
    }

    /// Play the clip and advance it step by step until `duration` has elapsed
    /// or the clip finishes.
    ///
    /// A zero step advances the whole duration at once.
    pub fn play_for(&self, duration: Duration) -> Result<SceneReport, DispatchError> {
        info!(
            clip = self.clip.name(),
            duration_secs = duration.as_secs_f64(),
            "scene started"
        );
        self.clip.play()?;

        let step = if self.step.is_zero() { duration } else { self.step };
        let mut elapsed = Duration::ZERO;
        let mut steps = 0u32;
        while elapsed < duration && self.clip.state() == PlaybackState::Playing {
            let tick = step.min(duration - elapsed);
            if self.pacing == Pacing::Realtime {
                thread::sleep(tick);
            }
            self.clip.advance(tick.as_secs_f64())?;
            elapsed += tick;
            steps += 1;
            debug!(clip = self.clip.name(), step = steps, "scene tick");
        }

        let report = SceneReport {
            steps,
            position: self.clip.position(),
            state: self.clip.state(),
        };
        info!(
            clip = self.clip.name(),
            steps = report.steps,
            position = report.position,
            state = %report.state,
            "scene ended"
        );
        Ok(report)
    }
}

/// A consumer that mirrors a clip into text lines.
///
/// Holds its subscriptions as guards, so dropping the overlay detaches it.
pub struct Overlay {
    lines: Rc<RefCell<Vec<String>>>,
    subscriptions: Vec<SubscriptionGuard>,
}

impl Overlay {
    /// Attach to `clip`. The current state is shown immediately; the
    /// playhead is only shown once it moves.
    pub fn attach(clip: &VideoClip) -> Self {
        let lines: Rc<RefCell<Vec<String>>> = Rc::default();

        let state_lines = Rc::clone(&lines);
        let state = clip
            .on_state_changed()
            .subscribe(move |state| state_lines.borrow_mut().push(format!("[{state}]")))
            .into_guard();

        let time_lines = Rc::clone(&lines);
        let time = clip
            .on_time_changed()
            .subscribe_with(
                move |secs| time_lines.borrow_mut().push(format!("{secs:.2}s")),
                false,
            )
            .into_guard();

        let finished_lines = Rc::clone(&lines);
        let finished = clip
            .on_finished()
            .subscribe(move |name| finished_lines.borrow_mut().push(format!("{name} done")))
            .into_guard();

        Self {
            lines,
            subscriptions: vec![state, time, finished],
        }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscriptions.iter().all(SubscriptionGuard::is_subscribed)
    }
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("lines", &self.lines.borrow().len())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
