//! Defines the playback [`Scheduler`]: the engine driving every loaded snippet over time.
//!
//! Each playing snippet is walked by its own runner task, keyframe boundary by keyframe boundary.
//! At every boundary, the runner resolves the channels of its snippet against the other playing
//! snippets, sends one transition per channel to the [`RenderTarget`] and waits for all of them
//! before moving on.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

pub use crate::scheduler::event::SnippetEvent;
pub use crate::scheduler::runner::RunnerState;
pub use crate::scheduler::timing::{loop_position, next_boundary, step_ms};
pub use crate::scheduler::tracker::{reseed_on_load, reseed_on_loop, ValueTracker};

use crate::animations::{Snippet, TIME_EPSILON};
use crate::config::SchedulerConfig;
use crate::diagnostics::Diagnostics;
use crate::render::{RenderTarget, TransitionHandle};
use crate::resolve::{compose, resolve, Apply, Channel, ResolveOptions, Sample, Target};
use crate::scheduler::runner::{Commit, Finish, Step};
use crate::state::{AnimationState, Command, PlayMode, ScheduleEntry, Store};
use crate::utils::events::{EventHandler, EventManager};
use crate::utils::task::{self, TaskHandler};

mod event;
mod runner;
mod timing;
mod tracker;

/// Start options of [`Scheduler::schedule`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScheduleOptions {
    /// Start delay (in seconds).
    start_in_sec: Option<f64>,
    /// Start time on the scheduler clock (in seconds): ignored when a start delay is given.
    start_at_sec: Option<f64>,
    /// Local time to start from (in seconds): wraps for looping snippets, clamped otherwise.
    offset_sec: Option<f64>,
    /// Overrides the snippet priority.
    priority: Option<i32>,
}

impl ScheduleOptions {
    pub fn set_start_in(mut self, seconds: f64) -> Self {
        self.start_in_sec = Some(seconds);
        self
    }
    pub fn set_start_at(mut self, seconds: f64) -> Self {
        self.start_at_sec = Some(seconds);
        self
    }
    pub fn set_offset(mut self, seconds: f64) -> Self {
        self.offset_sec = Some(seconds);
        self
    }
    pub fn set_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn get_start_in(&self) -> Option<f64> {
        self.start_in_sec
    }
    pub fn get_start_at(&self) -> Option<f64> {
        self.start_at_sec
    }
    pub fn get_offset(&self) -> Option<f64> {
        self.offset_sec
    }
    pub fn get_priority(&self) -> Option<i32> {
        self.priority
    }
}

#[derive(Debug)]
struct RunnerEntry {
    id: u64,
    state: RunnerState,
    /// Holds the runner at its next boundary while true.
    halted: watch::Sender<bool>,
    /// Transitions of the boundary in progress.
    handles: Vec<TransitionHandle>,
    task: Option<TaskHandler>,
}

#[derive(Debug)]
struct Inner {
    store: Store,
    tracker: ValueTracker,
    runners: HashMap<String, RunnerEntry>,
    next_runner_id: u64,
    /// Events to emit once the lock is released.
    outbox: Vec<SnippetEvent>,
    /// Snippets to report to `on_snippet_end` once the lock is released.
    ended: Vec<String>,
}

fn current<'a>(
    runners: &'a mut HashMap<String, RunnerEntry>,
    name: &str,
    id: u64,
) -> Option<&'a mut RunnerEntry> {
    runners
        .get_mut(name)
        .filter(|entry| entry.id == id && entry.state != RunnerState::Cancelled)
}

/// Plays snippets onto a [`RenderTarget`].
///
/// The scheduler owns the animation state: snippets are loaded, tuned, seeked and removed through
/// its methods, the resulting channel values reach the render target as timed transitions (or
/// immediate values for seeks and manual overrides). Clones share the same scheduler.
///
/// Every playing snippet runs on its own task: a scheduler must be used from within a
/// `#[visage::runtime]` for snippets to move. Outside a runtime, snippets can still be loaded, seeked
/// and composed.
///
/// # Example
/// ```
/// use visage::animations::{Keyframe, Snippet};
/// use visage::render::RenderTarget;
/// use visage::scheduler::Scheduler;
///
/// #[derive(Debug)]
/// struct Engine;
/// impl RenderTarget for Engine {}
///
/// #[visage::runtime]
/// async fn main() {
///     let scheduler = Scheduler::new(Engine);
///     scheduler.on("completed", |event| println!("{:?}", event));
///
///     scheduler.load(
///         Snippet::new("nod").with_curve("53", vec![Keyframe::new(0.0, 0.0), Keyframe::new(0.3, 0.4)]),
///     );
///     visage::pause!(500);
///     assert!(scheduler.state().get_snippet("nod").unwrap().is_ended());
/// }
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Mutex<Inner>>,
    target: Arc<dyn RenderTarget>,
    config: Arc<SchedulerConfig>,
    options: ResolveOptions,
    /// Resolved once: whether the target takes continuum transitions.
    supports_continuum: bool,
    clock: Instant,
    events: EventManager<SnippetEvent>,
    diagnostics: Diagnostics,
}

impl Scheduler {
    /// Creates a scheduler with the default [`SchedulerConfig`].
    pub fn new<T: RenderTarget + 'static>(target: T) -> Self {
        Self::with_config(target, SchedulerConfig::default())
    }

    pub fn with_config<T: RenderTarget + 'static>(target: T, config: SchedulerConfig) -> Self {
        let supports_continuum = target.supports_continuum();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store: Store::new(),
                tracker: ValueTracker::new(config.get_viseme_count()),
                runners: HashMap::new(),
                next_runner_id: 0,
                outbox: vec![],
                ended: vec![],
            })),
            options: ResolveOptions::from(&config),
            target: Arc::new(target),
            config: Arc::new(config),
            supports_continuum,
            clock: Instant::now(),
            events: EventManager::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Reports into the given diagnostics: to be called before the scheduler is cloned or used.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    // ########################################
    // Snippet lifecycle.

    /// Loads a snippet (replacing any snippet of the same name) and plays it right away.
    ///
    /// Returns the snippet name.
    pub fn load<S: Into<Snippet>>(&self, snippet: S) -> String {
        self.schedule(snippet, ScheduleOptions::default())
    }

    /// Loads a snippet from its JSON source form. An invalid source loads an empty snippet.
    pub fn load_from_json(&self, json: &str) -> String {
        match Snippet::from_json(json) {
            Ok(snippet) => self.load(snippet),
            Err(error) => {
                log::warn!("Invalid snippet source, loading an empty snippet: {}", error);
                self.load(Snippet::default())
            }
        }
    }

    /// Loads a snippet with start options (delay, offset, priority).
    ///
    /// Returns the snippet name.
    pub fn schedule<S: Into<Snippet>>(&self, snippet: S, options: ScheduleOptions) -> String {
        let mut snippet = snippet.into();
        snippet.reset_playback();
        if let Some(priority) = options.priority {
            snippet.priority = priority;
        }
        let name = snippet.name.clone();
        let looping = snippet.is_loop();
        let duration = snippet.get_duration();
        let delay_ms = self.delay_ms(&options);

        self.update(|inner| {
            self.teardown(inner, &name);
            inner.runners.remove(&name);
            if self.config.is_continuity() {
                let reseeded = reseed_on_load(&mut snippet, &inner.tracker);
                log::trace!("Snippet '{}': {} keyframe(s) reseeded", name, reseeded);
            }
            self.dispatch(inner, Command::Load(snippet));
            if inner.store.get_state().get_snippet(&name).is_none() {
                return;
            }

            if let Some(offset) = options.offset_sec {
                let time = match looping {
                    true => loop_position(offset, duration).0,
                    false => offset,
                };
                self.dispatch(
                    inner,
                    Command::Seek {
                        name: name.clone(),
                        time,
                    },
                );
            }
            inner.outbox.push(SnippetEvent::Added { name: name.clone() });
            self.start(inner, &name, delay_ms);
        });
        name
    }

    pub fn remove(&self, name: &str) {
        self.update(|inner| {
            if inner.store.get_state().get_snippet(name).is_none() {
                return;
            }
            self.teardown(inner, name);
            inner.runners.remove(name);
            self.dispatch(inner, Command::Remove(name.to_string()));
            inner.outbox.push(SnippetEvent::Removed {
                name: name.to_string(),
            });
        })
    }

    /// Moves a snippet to the given local time (clamped within its duration) and applies its values
    /// there immediately, even when paused.
    pub fn seek(&self, name: &str, seconds: f64) {
        let applies = self.update(|inner| {
            if inner.store.get_state().get_snippet(name).is_none() {
                return vec![];
            }
            if let Some(entry) = inner.runners.get_mut(name) {
                self.cancel_handles(entry);
            }
            self.dispatch(
                inner,
                Command::Seek {
                    name: name.to_string(),
                    time: seconds,
                },
            );
            self.scrub(inner, name)
        });
        for apply in &applies {
            apply.apply(self.target.as_ref());
        }
    }

    // ########################################
    // Global controls.

    /// Resumes every playing snippet.
    pub fn play(&self) {
        self.update(|inner| {
            if inner.store.get_state().get_play_mode() == PlayMode::Playing {
                return;
            }
            self.set_play_mode(inner, PlayMode::Playing);

            let playing: Vec<String> = inner
                .store
                .get_state()
                .get_snippets()
                .values()
                .filter(|snippet| snippet.is_playing())
                .map(|snippet| snippet.name.clone())
                .collect();
            for name in playing {
                match self.has_active_runner(inner, &name) {
                    true => self.refresh_halt(inner, &name),
                    false => self.spawn_runner(inner, &name, 0),
                }
            }
        })
    }

    /// Holds every runner: in-flight transitions are paused, runners stop at their next boundary.
    pub fn pause(&self) {
        self.update(|inner| {
            if inner.store.get_state().get_play_mode() == PlayMode::Paused {
                return;
            }
            self.set_play_mode(inner, PlayMode::Paused);
            let names: Vec<String> = inner.runners.keys().cloned().collect();
            for name in names {
                self.refresh_halt(inner, &name);
            }
        })
    }

    /// Cancels every runner and clears every snippet.
    pub fn stop(&self) {
        self.update(|inner| {
            self.teardown_all(inner);
            let names: Vec<String> = inner.store.get_state().get_snippets().keys().cloned().collect();
            self.dispatch(inner, Command::Clear);
            for name in names {
                inner.outbox.push(SnippetEvent::Removed { name });
            }
            if inner.store.get_state().get_play_mode() != PlayMode::Stopped {
                self.set_play_mode(inner, PlayMode::Stopped);
            }
        })
    }

    // ########################################
    // Per-snippet controls.

    pub fn pause_snippet(&self, name: &str) {
        self.update(|inner| {
            let playing = inner
                .store
                .get_state()
                .get_snippet(name)
                .map(Snippet::is_playing)
                .unwrap_or(false);
            if !playing {
                return;
            }
            self.dispatch(
                inner,
                Command::SetPlaying {
                    name: name.to_string(),
                    playing: false,
                    started_at: None,
                },
            );
            self.refresh_halt(inner, name);
            inner.outbox.push(SnippetEvent::SnippetPlayStateChanged {
                name: name.to_string(),
                playing: false,
            });
        })
    }

    /// Resumes a paused snippet. A snippet that reached its end stays still: seek it first to replay.
    pub fn resume_snippet(&self, name: &str) {
        self.update(|inner| {
            match inner.store.get_state().get_snippet(name) {
                Some(snippet) if !snippet.is_playing() && !snippet.is_ended() => {}
                _ => return,
            }
            self.mark_playing(inner, name);
            match self.has_active_runner(inner, name) {
                true => self.refresh_halt(inner, name),
                false => {
                    if inner.store.get_state().get_play_mode() == PlayMode::Playing {
                        self.spawn_runner(inner, name, 0);
                    }
                }
            }
        })
    }

    /// Cancels the runner of a snippet and rewinds it: the snippet stays loaded.
    pub fn stop_snippet(&self, name: &str) {
        self.update(|inner| {
            let playing = match inner.store.get_state().get_snippet(name) {
                Some(snippet) => snippet.is_playing(),
                None => return,
            };
            self.teardown(inner, name);
            self.dispatch(inner, Command::Rewind(name.to_string()));
            if playing {
                inner.outbox.push(SnippetEvent::SnippetPlayStateChanged {
                    name: name.to_string(),
                    playing: false,
                });
            }
        })
    }

    pub fn set_snippet_playing(&self, name: &str, playing: bool) {
        match playing {
            true => self.resume_snippet(name),
            false => self.pause_snippet(name),
        }
    }

    /// Seeks a snippet: for a looping snippet, the time wraps around its duration.
    pub fn set_snippet_time(&self, name: &str, seconds: f64) {
        let position = self
            .inner
            .lock()
            .store
            .get_state()
            .get_snippet(name)
            .map(|snippet| (snippet.is_loop(), snippet.get_duration()));
        if let Some((looping, duration)) = position {
            let time = match looping {
                true => loop_position(seconds, duration).0,
                false => seconds,
            };
            self.seek(name, time);
        }
    }

    /// Takes effect from the next keyframe boundary.
    pub fn set_snippet_playback_rate(&self, name: &str, rate: f64) {
        self.update(|inner| {
            self.dispatch(
                inner,
                Command::SetPlaybackRate {
                    name: name.to_string(),
                    rate,
                },
            )
        })
    }

    pub fn set_snippet_intensity_scale(&self, name: &str, scale: f64) {
        self.update(|inner| {
            self.dispatch(
                inner,
                Command::SetIntensityScale {
                    name: name.to_string(),
                    scale,
                },
            )
        })
    }

    pub fn set_snippet_priority(&self, name: &str, priority: i32) {
        self.update(|inner| {
            self.dispatch(
                inner,
                Command::SetPriority {
                    name: name.to_string(),
                    priority,
                },
            )
        })
    }

    pub fn set_snippet_loop(&self, name: &str, looping: bool) {
        self.update(|inner| {
            self.dispatch(
                inner,
                Command::SetLoop {
                    name: name.to_string(),
                    looping,
                },
            )
        })
    }

    // ########################################
    // Manual overrides.

    /// Forces a channel to a value (clamped within [0, 1]): applied immediately, and skipped by every
    /// snippet until cleared.
    pub fn set_manual(&self, id: &str, value: f64) {
        if !value.is_finite() {
            log::warn!("Manual value of channel '{}' ignored: {}", id, value);
            return;
        }
        let apply = Apply::single(id, value.clamp(0.0, 1.0), None, 0);
        self.update(|inner| {
            self.dispatch(
                inner,
                Command::SetManual {
                    id: id.to_string(),
                    value,
                },
            );
            for (channel, value) in apply.issued_values() {
                inner.tracker.record(channel, value);
            }
        });
        apply.apply(self.target.as_ref());
    }

    /// Gives a channel back to the snippets (from their next boundary).
    pub fn clear_manual(&self, id: &str) {
        self.update(|inner| self.dispatch(inner, Command::ClearManual(id.to_string())))
    }

    // ########################################
    // Events.

    /// Registers a callback for an event name (see [`SnippetEvent`]).
    ///
    /// Callbacks run on the task that emits the event, once the scheduler state is unlocked: they
    /// may issue scheduler commands (load the next snippet on `completed` for instance).
    pub fn on<S, F>(&self, event: S, callback: F) -> EventHandler
    where
        S: Into<String>,
        F: FnMut(SnippetEvent) + Send + 'static,
    {
        self.events.on(event, callback)
    }

    pub fn unregister(&self, handler: EventHandler) {
        self.events.unregister(handler)
    }

    // ########################################
    // Read accessors.

    /// A snapshot of the animation state.
    pub fn state(&self) -> AnimationState {
        self.inner.lock().store.get_state().clone()
    }

    pub fn get_schedule_snapshot(&self) -> Vec<ScheduleEntry> {
        self.inner.lock().store.get_state().get_schedule()
    }

    pub fn get_play_mode(&self) -> PlayMode {
        self.inner.lock().store.get_state().get_play_mode()
    }

    /// The last value issued to a channel (0 if none yet).
    pub fn get_current_value(&self, id: &str) -> f64 {
        self.inner.lock().tracker.get_current_value(id)
    }

    /// Every channel resolved from the playing snippets at their current time, manual overrides
    /// included.
    pub fn composed_at_current_time(&self) -> BTreeMap<Channel, Target> {
        self.inner.lock().store.get_state().composed(&self.options)
    }

    pub fn runner_state(&self, name: &str) -> Option<RunnerState> {
        self.inner.lock().runners.get(name).map(|entry| entry.state)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.clone()
    }

    pub fn get_config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Seconds elapsed on the scheduler clock (since the scheduler creation).
    pub fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }

    /// Cancels every runner and shuts the state container down for good.
    pub fn dispose(&self) {
        self.update(|inner| {
            self.teardown_all(inner);
            inner.store.dispose();
        });
        log::debug!("Scheduler disposed");
    }

    // ########################################
    // Runner side.

    /// Starts a snippet once its start delay elapsed.
    pub(crate) fn begin(&self, name: &str, id: u64) -> bool {
        self.update(|inner| {
            if current(&mut inner.runners, name, id).is_none()
                || inner.store.get_state().get_snippet(name).is_none()
            {
                return false;
            }
            self.mark_playing(inner, name);
            true
        })
    }

    /// Prepares the next boundary of a snippet: the values of its channels there, resolved against
    /// every other playing snippet at its own current time.
    pub(crate) fn plan(&self, name: &str, id: u64, time_applied: bool) -> Step {
        self.update(|inner| {
            let entry = match current(&mut inner.runners, name, id) {
                Some(entry) => entry,
                None => return Step::Gone,
            };
            entry.state = RunnerState::Running;

            let state = inner.store.get_state();
            let snippet = match state.get_snippet(name) {
                Some(snippet) => snippet,
                None => return Step::Gone,
            };
            let time = snippet.get_current_time();
            let next = match next_boundary(&snippet.keyframe_times(), time, time_applied) {
                Some(next) => next,
                None => return Step::End,
            };

            let mut samples = vec![Sample::new(snippet, next)];
            samples.extend(
                state
                    .playing_samples()
                    .into_iter()
                    .filter(|sample| sample.snippet.get_name() != name),
            );
            let targets = self.owned_targets(state, snippet, resolve(&samples, &self.options));
            let duration_ms = step_ms(
                time,
                next,
                snippet.get_playback_rate(),
                self.config.get_min_step_ms(),
            );
            let applies: Vec<Apply> = compose(
                targets.clone(),
                self.config.get_continuum_pairs(),
                self.supports_continuum,
            )
            .into_iter()
            .map(|apply| apply.set_duration_ms(duration_ms))
            .collect();

            self.diagnostics.record_boundary(&targets, applies.len());
            Step::Boundary {
                time,
                next,
                epoch: snippet.seek_epoch,
                applies,
            }
        })
    }

    /// Sends the transitions of a boundary. Returns `None` when the runner is not current anymore.
    pub(crate) fn issue(
        &self,
        name: &str,
        id: u64,
        applies: &[Apply],
    ) -> Option<Vec<TransitionHandle>> {
        let handles: Vec<TransitionHandle> = applies
            .iter()
            .map(|apply| apply.transition(self.target.as_ref()))
            .collect();

        self.update(|inner| {
            let entry = match current(&mut inner.runners, name, id) {
                Some(entry) => entry,
                None => {
                    handles.iter().for_each(TransitionHandle::cancel);
                    return None;
                }
            };
            if *entry.halted.borrow() {
                handles.iter().for_each(TransitionHandle::pause);
            }
            entry.handles = handles.clone();
            entry.state = RunnerState::Awaiting;

            inner
                .tracker
                .record_applies(applies, self.config.get_continuum_pairs());
            Some(handles)
        })
    }

    /// Moves a snippet to the boundary its transitions just reached.
    pub(crate) fn commit(&self, name: &str, id: u64, next: f64, epoch: u64) -> Commit {
        self.update(|inner| {
            let entry = match current(&mut inner.runners, name, id) {
                Some(entry) => entry,
                None => return Commit::Gone,
            };
            entry.handles.clear();
            entry.state = RunnerState::Running;

            match inner.store.get_state().get_snippet(name).map(|s| s.seek_epoch) {
                None => Commit::Gone,
                Some(current_epoch) if current_epoch != epoch => Commit::Outdated,
                Some(_) => {
                    self.dispatch(
                        inner,
                        Command::Advance {
                            name: name.to_string(),
                            time: next,
                        },
                    );
                    inner.outbox.push(SnippetEvent::KeyframeReached {
                        name: name.to_string(),
                        time: next,
                    });
                    Commit::Advanced
                }
            }
        })
    }

    /// Loops or completes a snippet whose curves are over.
    pub(crate) fn finish(&self, name: &str, id: u64) -> Finish {
        self.update(|inner| {
            if current(&mut inner.runners, name, id).is_none() {
                return Finish::Gone;
            }
            let looping = match inner.store.get_state().get_snippet(name) {
                Some(snippet) => snippet.is_loop() && snippet.get_duration() > TIME_EPSILON,
                None => return Finish::Gone,
            };

            match looping {
                true => {
                    let values = inner.tracker.clone();
                    self.dispatch(
                        inner,
                        Command::Wrap {
                            name: name.to_string(),
                            values,
                        },
                    );
                    let iteration = inner
                        .store
                        .get_state()
                        .get_snippet(name)
                        .map(Snippet::get_loop_iteration)
                        .unwrap_or_default();
                    if let Some(entry) = inner.runners.get_mut(name) {
                        entry.state = RunnerState::Looping;
                    }
                    self.diagnostics.record_loop();
                    log::debug!("Snippet '{}' loops (iteration {})", name, iteration);
                    inner.outbox.push(SnippetEvent::Looped {
                        name: name.to_string(),
                        iteration,
                    });
                    Finish::Looped
                }
                false => {
                    self.dispatch(inner, Command::Complete(name.to_string()));
                    if let Some(entry) = inner.runners.get_mut(name) {
                        entry.state = RunnerState::Completed;
                    }
                    self.diagnostics.record_completion();
                    log::debug!("Snippet '{}' completed", name);
                    inner.outbox.push(SnippetEvent::Completed {
                        name: name.to_string(),
                    });
                    inner.ended.push(name.to_string());
                    Finish::Completed
                }
            }
        })
    }

    // ########################################
    // Internals.

    /// Runs a change under the lock, then emits what it queued: events, then snippet ends.
    fn update<R, F>(&self, change: F) -> R
    where
        F: FnOnce(&mut Inner) -> R,
    {
        let (result, events, ended) = {
            let mut inner = self.inner.lock();
            let result = change(&mut inner);
            (
                result,
                std::mem::take(&mut inner.outbox),
                std::mem::take(&mut inner.ended),
            )
        };
        for event in events {
            self.events.emit(event);
        }
        for name in ended {
            self.target.on_snippet_end(&name);
        }
        result
    }

    /// Dispatches a command: a stopped store gets one forced restart and retry before the command
    /// is dropped.
    fn dispatch(&self, inner: &mut Inner, command: Command) {
        if let Err(error) = inner.store.dispatch(command.clone()) {
            log::debug!("{}: restarting the store", error);
            self.diagnostics.record_retry();
            let retried = inner
                .store
                .restart()
                .and_then(|_| inner.store.dispatch(command));
            if let Err(error) = retried {
                log::warn!("Command dropped: {}", error);
                self.diagnostics.record_drop();
            }
        }
    }

    fn set_play_mode(&self, inner: &mut Inner, mode: PlayMode) {
        self.dispatch(inner, Command::SetPlayMode(mode));
        inner.outbox.push(SnippetEvent::PlayStateChanged { mode });
    }

    fn mark_playing(&self, inner: &mut Inner, name: &str) {
        self.dispatch(
            inner,
            Command::SetPlaying {
                name: name.to_string(),
                playing: true,
                started_at: Some(self.now()),
            },
        );
        inner.outbox.push(SnippetEvent::SnippetPlayStateChanged {
            name: name.to_string(),
            playing: true,
        });
    }

    /// Plays a freshly loaded snippet: delayed starts only apply while the scheduler plays.
    fn start(&self, inner: &mut Inner, name: &str, delay_ms: u64) {
        let playing = inner.store.get_state().get_play_mode() == PlayMode::Playing;
        if delay_ms == 0 || !playing {
            self.mark_playing(inner, name);
        }
        if playing {
            self.spawn_runner(inner, name, delay_ms);
        }
    }

    fn spawn_runner(&self, inner: &mut Inner, name: &str, delay_ms: u64) {
        self.teardown(inner, name);
        inner.next_runner_id += 1;
        let id = inner.next_runner_id;
        let (halted, receiver) = watch::channel(false);

        match task::run(runner::run(
            self.clone(),
            name.to_string(),
            id,
            receiver,
            delay_ms,
        )) {
            Ok(handler) => {
                log::debug!("Runner #{} started for snippet '{}'", id, name);
                inner.runners.insert(
                    name.to_string(),
                    RunnerEntry {
                        id,
                        state: RunnerState::Idle,
                        halted,
                        handles: vec![],
                        task: Some(handler),
                    },
                );
            }
            Err(error) => log::warn!("Snippet '{}' can not play: {}", name, error),
        }
    }

    fn has_active_runner(&self, inner: &Inner, name: &str) -> bool {
        inner
            .runners
            .get(name)
            .map(|entry| entry.state.is_active())
            .unwrap_or(false)
    }

    /// Halts (or releases) the runner of a snippet according to the play mode and the snippet flag.
    fn refresh_halt(&self, inner: &mut Inner, name: &str) {
        let state = inner.store.get_state();
        let halted = state.get_play_mode() != PlayMode::Playing
            || !state
                .get_snippet(name)
                .map(Snippet::is_playing)
                .unwrap_or(false);
        if let Some(entry) = inner.runners.get_mut(name) {
            entry.halted.send_replace(halted);
            for handle in &entry.handles {
                match halted {
                    true => handle.pause(),
                    false => handle.resume(),
                }
            }
        }
    }

    fn cancel_handles(&self, entry: &mut RunnerEntry) {
        let cancelled = std::mem::take(&mut entry.handles)
            .iter()
            .filter(|handle| !handle.is_done())
            .inspect(|handle| handle.cancel())
            .count();
        if cancelled > 0 {
            self.diagnostics.record_cancelled(cancelled);
        }
    }

    /// Cancels the runner of a snippet (if any) along with its in-flight transitions.
    fn teardown(&self, inner: &mut Inner, name: &str) {
        if let Some(entry) = inner.runners.get_mut(name) {
            if let Some(handler) = entry.task.take() {
                handler.abort();
            }
            self.cancel_handles(entry);
            if entry.state.is_active() {
                log::debug!("Runner #{} of snippet '{}' cancelled", entry.id, name);
                entry.state = RunnerState::Cancelled;
            }
        }
    }

    fn teardown_all(&self, inner: &mut Inner) {
        let names: Vec<String> = inner.runners.keys().cloned().collect();
        for name in names {
            self.teardown(inner, &name);
        }
        inner.runners.clear();
    }

    /// Resolves a snippet at its current time (paused or not) for an immediate apply.
    fn scrub(&self, inner: &mut Inner, name: &str) -> Vec<Apply> {
        let state = inner.store.get_state();
        let snippet = match state.get_snippet(name) {
            Some(snippet) => snippet,
            None => return vec![],
        };
        let mut samples = vec![Sample::current(snippet)];
        samples.extend(
            state
                .playing_samples()
                .into_iter()
                .filter(|sample| sample.snippet.get_name() != name),
        );
        let targets = self.owned_targets(state, snippet, resolve(&samples, &self.options));
        let applies = compose(targets.clone(), self.config.get_continuum_pairs(), false);

        self.diagnostics.record_targets(&targets);
        inner
            .tracker
            .record_applies(&applies, self.config.get_continuum_pairs());
        applies
    }

    /// Keeps the channels a snippet drives (plus their continuum partners), except manual ones.
    fn owned_targets(
        &self,
        state: &AnimationState,
        snippet: &Snippet,
        mut targets: BTreeMap<Channel, Target>,
    ) -> BTreeMap<Channel, Target> {
        let mut owned: BTreeSet<Channel> = snippet
            .get_curves()
            .keys()
            .map(|id| Channel::classify(id, snippet.get_category(), self.options.viseme_count))
            .collect();
        for pair in self.config.get_continuum_pairs() {
            let neg = Channel::Named(pair.neg.clone());
            let pos = Channel::Named(pair.pos.clone());
            if owned.contains(&neg) || owned.contains(&pos) {
                owned.insert(neg);
                owned.insert(pos);
            }
        }
        targets.retain(|channel, _| {
            owned.contains(channel)
                && !matches!(channel, Channel::Named(id) if state.is_manual(id))
        });
        targets
    }

    fn delay_ms(&self, options: &ScheduleOptions) -> u64 {
        let delay = match (options.start_in_sec, options.start_at_sec) {
            (Some(start_in), _) => start_in,
            (None, Some(start_at)) => start_at - self.now(),
            (None, None) => 0.0,
        };
        match delay.is_finite() && delay > 0.0 {
            true => (delay * 1000.0).round() as u64,
            false => 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn stop_store(&self) {
        self.inner.lock().store.stop();
    }
}

impl Debug for Scheduler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("target", &self.target)
            .field("config", &self.config)
            .field("supports_continuum", &self.supports_continuum)
            .finish_non_exhaustive()
    }
}

impl Display for Scheduler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        let state = inner.store.get_state();
        write!(
            f,
            "Scheduler [mode={:?}, snippets={}, runners={}]",
            state.get_play_mode(),
            state.len(),
            inner
                .runners
                .values()
                .filter(|entry| entry.state.is_active())
                .count()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::animations::Keyframe;
    use crate::mocks::render_target::{HandleMode, MockRenderTarget, RenderCall};
    use crate::pause;
    use crate::utils::events::{Event, ANY_EVENT};

    fn recorded(scheduler: &Scheduler) -> Arc<Mutex<Vec<SnippetEvent>>> {
        let events = Arc::new(Mutex::new(vec![]));
        let captured = events.clone();
        scheduler.on(ANY_EVENT, move |event| captured.lock().push(event));
        events
    }

    fn without_continuity() -> SchedulerConfig {
        SchedulerConfig::default().set_continuity(false)
    }

    fn ramp(name: &str) -> Snippet {
        Snippet::new(name).with_curve(
            "1",
            vec![
                Keyframe::new(0.0, 0.0),
                Keyframe::new(0.1, 0.5),
                Keyframe::new(0.2, 0.0),
            ],
        )
    }

    fn transition_au(id: u32, value: f64, duration_ms: u64) -> RenderCall {
        RenderCall::TransitionAu {
            id,
            value,
            duration_ms,
            balance: None,
        }
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_plays_to_completion() {
        let target = MockRenderTarget::default();
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());
        let completed = Arc::new(AtomicUsize::new(0));
        let captured = completed.clone();
        scheduler.on("completed", move |_| {
            captured.fetch_add(1, Ordering::SeqCst);
        });

        let name = scheduler.load(ramp("ramp"));
        assert_eq!(name, "ramp");
        assert_eq!(scheduler.runner_state("ramp"), Some(RunnerState::Idle));

        pause!(600);
        assert_eq!(
            target.transitions(),
            vec![
                transition_au(1, 0.0, 30),
                transition_au(1, 0.5, 100),
                transition_au(1, 0.0, 100),
            ]
        );

        let state = scheduler.state();
        let snippet = state.get_snippet("ramp").unwrap();
        assert!(snippet.is_ended());
        assert!(!snippet.is_playing());
        assert_eq!(snippet.get_current_time(), 0.2);

        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(target.ended(), vec![String::from("ramp")]);
        assert_eq!(scheduler.runner_state("ramp"), Some(RunnerState::Completed));

        let report = scheduler.diagnostics().report();
        assert_eq!(report.boundaries, 3);
        assert_eq!(report.transitions_issued, 3);
        assert_eq!(report.completions, 1);

        // An ended snippet does not resume.
        scheduler.resume_snippet("ramp");
        assert!(!scheduler.state().get_snippet("ramp").unwrap().is_playing());
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_loop_reseeds_once_per_wrap() {
        let target = MockRenderTarget::new(HandleMode::Manual);
        let scheduler = Scheduler::new(target.clone());
        let events = recorded(&scheduler);

        scheduler.load(Snippet::new("idle").set_loop(true).with_curve(
            "1",
            vec![
                Keyframe::new(0.0, 0.0).set_inherit(true),
                Keyframe::new(0.1, 0.6),
            ],
        ));

        pause!(20);
        assert_eq!(target.pending().len(), 1);
        target.complete_all();
        pause!(20);
        assert_eq!(target.transitions().last(), Some(&transition_au(1, 0.6, 100)));

        target.complete_all();
        pause!(20);
        assert_eq!(scheduler.diagnostics().report().loops, 1);
        let state = scheduler.state();
        let snippet = state.get_snippet("idle").unwrap();
        assert_eq!(snippet.get_loop_iteration(), 1);
        assert_eq!(snippet.get_curve("1").unwrap()[0].get_intensity(), 0.6);
        assert_eq!(
            target.transitions().last(),
            Some(&transition_au(1, 0.6, 30)),
            "The next iteration starts from the tracked value"
        );
        assert_eq!(scheduler.runner_state("idle"), Some(RunnerState::Awaiting));

        target.complete_all();
        pause!(20);
        target.complete_all();
        pause!(20);
        assert_eq!(scheduler.diagnostics().report().loops, 2);

        let iterations: Vec<u64> = events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SnippetEvent::Looped { iteration, .. } => Some(*iteration),
                _ => None,
            })
            .collect();
        assert_eq!(iterations, vec![1, 2]);
        assert!(target.ended().is_empty(), "Looping snippets never complete");

        scheduler.dispose();
        assert!(target.pending().is_empty());
        assert!(scheduler.diagnostics().report().transitions_cancelled >= 1);
    }

    #[test]
    fn test_seek_while_paused_applies_immediately() {
        let target = MockRenderTarget::new(HandleMode::Instant);
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());
        scheduler.pause();
        scheduler.load(
            Snippet::new("brow")
                .with_curve("1", vec![Keyframe::new(0.0, 0.2), Keyframe::new(1.0, 0.7)]),
        );
        assert!(target.calls().is_empty());

        scheduler.seek("brow", -1.0);
        scheduler.seek("brow", 5.0);
        scheduler.seek("unknown", 1.0);
        assert_eq!(
            target.calls(),
            vec![
                RenderCall::ApplyAu {
                    id: 1,
                    value: 0.2,
                    balance: None
                },
                RenderCall::ApplyAu {
                    id: 1,
                    value: 0.7,
                    balance: None
                },
            ]
        );
        assert_eq!(
            scheduler.state().get_snippet("brow").unwrap().get_current_time(),
            1.0
        );
        assert_eq!(scheduler.get_current_value("1"), 0.7);
        assert_eq!(
            scheduler.diagnostics().get_last_targets()[&Channel::Named("1".into())].value,
            0.7
        );
    }

    #[test]
    fn test_continuity_on_load() {
        let target = MockRenderTarget::new(HandleMode::Instant);
        let scheduler = Scheduler::new(target.clone());
        scheduler.pause();

        scheduler.set_manual("1", 0.5);
        scheduler.clear_manual("1");
        assert_eq!(
            target.calls(),
            vec![RenderCall::ApplyAu {
                id: 1,
                value: 0.5,
                balance: None
            }]
        );

        scheduler.load(
            Snippet::new("brow")
                .with_curve("1", vec![Keyframe::new(0.0, 0.1), Keyframe::new(1.0, 0.2)]),
        );
        let state = scheduler.state();
        let curve = state.get_snippet("brow").unwrap().get_curve("1").unwrap();
        assert_eq!(curve[0].get_intensity(), 0.5);
        assert_eq!(curve[1].get_intensity(), 0.2);
        assert_eq!(scheduler.get_current_value("1"), 0.5);
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_priority_wins_at_boundaries() {
        let target = MockRenderTarget::new(HandleMode::Instant);
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());
        scheduler.load(
            Snippet::new("low")
                .set_priority(1)
                .with_curve("1", vec![Keyframe::new(0.0, 0.8), Keyframe::new(0.2, 0.8)]),
        );
        scheduler.load(
            Snippet::new("high")
                .set_priority(10)
                .with_curve("1", vec![Keyframe::new(0.0, 0.3), Keyframe::new(0.2, 0.3)]),
        );

        pause!(50);
        let transitions = target.transitions();
        assert!(transitions.len() >= 2);
        for call in transitions {
            match call {
                RenderCall::TransitionAu { id, value, .. } => {
                    assert_eq!(id, 1);
                    assert_eq!(value, 0.3);
                }
                other => panic!("Unexpected call: {:?}", other),
            }
        }
        assert_eq!(target.ended().len(), 2);
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_manual_channels_are_skipped() {
        let target = MockRenderTarget::new(HandleMode::Instant);
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());
        scheduler.set_manual("1", 0.9);
        scheduler.load(
            Snippet::new("face")
                .with_curve("1", vec![Keyframe::new(0.0, 0.4)])
                .with_curve("2", vec![Keyframe::new(0.0, 0.4)]),
        );

        pause!(50);
        assert_eq!(target.transitions(), vec![transition_au(2, 0.4, 30)]);
        let composed = scheduler.composed_at_current_time();
        assert_eq!(composed[&Channel::Named("1".into())].value, 0.9);
        assert_eq!(scheduler.get_current_value("1"), 0.9);
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_pause_resume_and_stop_snippet() {
        let target = MockRenderTarget::new(HandleMode::Manual);
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());
        scheduler.load(
            Snippet::new("smile")
                .with_curve("12", vec![Keyframe::new(0.0, 0.1), Keyframe::new(1.0, 0.9)]),
        );
        pause!(20);
        let handle = target.pending().remove(0);
        assert_eq!(scheduler.runner_state("smile"), Some(RunnerState::Awaiting));

        scheduler.pause_snippet("smile");
        assert!(handle.is_paused());
        assert!(!scheduler.state().get_snippet("smile").unwrap().is_playing());

        scheduler.resume_snippet("smile");
        assert!(!handle.is_paused());
        assert!(scheduler.state().get_snippet("smile").unwrap().is_playing());

        scheduler.stop_snippet("smile");
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.runner_state("smile"), Some(RunnerState::Cancelled));
        let state = scheduler.state();
        let snippet = state.get_snippet("smile").unwrap();
        assert!(!snippet.is_playing());
        assert!(!snippet.is_ended());
        assert_eq!(snippet.get_current_time(), 0.0);

        pause!(20);
        assert!(target.ended().is_empty(), "A cancelled snippet never completes");
        assert_eq!(scheduler.diagnostics().report().completions, 0);
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_global_controls() {
        let target = MockRenderTarget::new(HandleMode::Manual);
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());
        let events = recorded(&scheduler);
        scheduler.load(ramp("ramp"));
        pause!(20);
        let handle = target.pending().remove(0);

        scheduler.pause();
        assert_eq!(scheduler.get_play_mode(), PlayMode::Paused);
        assert!(handle.is_paused());

        scheduler.play();
        assert_eq!(scheduler.get_play_mode(), PlayMode::Playing);
        assert!(!handle.is_paused());

        scheduler.stop();
        assert_eq!(scheduler.get_play_mode(), PlayMode::Stopped);
        assert!(handle.is_cancelled());
        assert!(scheduler.state().is_empty());
        assert_eq!(scheduler.runner_state("ramp"), None);

        let names: Vec<&str> = events.lock().iter().map(|event| event.name()).collect();
        assert_eq!(
            names,
            vec![
                "added",
                "snippet_play_state_changed",
                "play_state_changed",
                "play_state_changed",
                "removed",
                "play_state_changed"
            ]
        );

        // Stopped: loaded snippets wait for play.
        scheduler.load(ramp("again"));
        assert_eq!(scheduler.runner_state("again"), None);
        assert!(scheduler.state().get_snippet("again").unwrap().is_playing());
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_remove() {
        let target = MockRenderTarget::new(HandleMode::Instant);
        let scheduler = Scheduler::new(target.clone());
        let events = recorded(&scheduler);
        scheduler.load(ramp("ramp"));

        scheduler.remove("unknown");
        assert_eq!(scheduler.state().len(), 1);
        scheduler.remove("ramp");
        assert!(scheduler.state().is_empty());
        assert_eq!(scheduler.runner_state("ramp"), None);

        pause!(20);
        assert!(target.transitions().is_empty());
        assert!(target.ended().is_empty());
        let names: Vec<&str> = events.lock().iter().map(|event| event.name()).collect();
        assert_eq!(names, vec!["added", "snippet_play_state_changed", "removed"]);
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_continuum_capable_target() {
        let target = MockRenderTarget::new(HandleMode::Instant).set_continuum(true);
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());
        scheduler.load(Snippet::new("gaze").with_curve("61", vec![Keyframe::new(0.0, 0.2)]));

        pause!(50);
        assert_eq!(
            target.transitions(),
            vec![RenderCall::TransitionContinuum {
                neg: 61,
                pos: 62,
                value: -0.2,
                duration_ms: 30
            }]
        );
        assert_eq!(scheduler.get_current_value("61"), 0.2);
        assert_eq!(scheduler.get_current_value("62"), 0.0);
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_single_side_command_settles_continuum_partner() {
        let target = MockRenderTarget::new(HandleMode::Instant);
        let scheduler = Scheduler::new(target.clone());
        let hold = |name: &str, id: &str, value: f64| {
            Snippet::new(name)
                .with_curve(id, vec![Keyframe::new(0.0, value), Keyframe::new(0.1, value)])
        };

        scheduler.load(hold("right", "62", 0.5));
        pause!(50);
        assert_eq!(scheduler.get_current_value("62"), 0.5);
        assert_eq!(scheduler.get_current_value("61"), 0.0);
        scheduler.remove("right");

        scheduler.load(hold("left", "61", 0.3));
        pause!(50);
        assert_eq!(target.transitions().last(), Some(&transition_au(61, 0.3, 100)));
        assert_eq!(scheduler.get_current_value("61"), 0.3);
        assert_eq!(
            scheduler.get_current_value("62"),
            0.0,
            "Only the left side was issued: the right side is back to rest"
        );
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_delayed_schedule() {
        let target = MockRenderTarget::new(HandleMode::Manual);
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());
        let name = scheduler.schedule(
            Snippet::new("late")
                .with_curve("1", vec![Keyframe::new(0.0, 0.1), Keyframe::new(1.0, 0.9)]),
            ScheduleOptions::default()
                .set_start_in(0.1)
                .set_offset(0.5)
                .set_priority(4),
        );

        let state = scheduler.state();
        let snippet = state.get_snippet(&name).unwrap();
        assert!(!snippet.is_playing());
        assert_eq!(snippet.get_priority(), 4);
        assert_eq!(snippet.get_current_time(), 0.5);

        pause!(200);
        let state = scheduler.state();
        let snippet = state.get_snippet(&name).unwrap();
        assert!(snippet.is_playing());
        assert!(snippet.get_started_at().is_some());
        assert_eq!(target.transitions(), vec![transition_au(1, 0.9, 500)]);

        scheduler.dispose();
    }

    #[test]
    fn test_callbacks_can_issue_commands() {
        let scheduler = Scheduler::new(MockRenderTarget::default());
        scheduler.pause();
        let events = recorded(&scheduler);

        let chained = scheduler.clone();
        scheduler.on("added", move |event| {
            if event == (SnippetEvent::Added { name: "first".into() }) {
                chained.load(Snippet::new("second"));
                chained.pause_snippet("first");
            }
        });

        scheduler.load(Snippet::new("first"));
        let state = scheduler.state();
        assert!(state.get_snippet("second").unwrap().is_playing());
        assert!(!state.get_snippet("first").unwrap().is_playing());
        assert_eq!(
            events.lock().iter().filter(|e| e.name() == "added").count(),
            2
        );
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_completed_callback_loads_next_snippet() {
        let target = MockRenderTarget::new(HandleMode::Instant);
        let scheduler = Scheduler::with_config(target.clone(), without_continuity());

        let chained = scheduler.clone();
        scheduler.on("completed", move |event| {
            if event == (SnippetEvent::Completed { name: "first".into() }) {
                chained.load(ramp("second"));
            }
        });

        scheduler.load(ramp("first"));
        pause!(100);
        assert_eq!(
            target.ended(),
            vec![String::from("first"), String::from("second")]
        );
        assert!(scheduler.state().get_snippet("second").unwrap().is_ended());
    }

    #[test]
    fn test_dispatch_retry_and_drop() {
        let scheduler = Scheduler::new(MockRenderTarget::default());
        scheduler.pause();

        scheduler.stop_store();
        scheduler.load(Snippet::new("a"));
        assert_eq!(scheduler.state().len(), 1);
        let report = scheduler.diagnostics().report();
        assert_eq!(report.commands_retried, 1);
        assert_eq!(report.commands_dropped, 0);

        scheduler.dispose();
        scheduler.load(Snippet::new("b"));
        assert!(scheduler.state().get_snippet("b").is_none());
        assert_eq!(scheduler.diagnostics().report().commands_dropped, 1);
    }

    #[test]
    fn test_load_from_json() {
        let scheduler = Scheduler::new(MockRenderTarget::default());
        scheduler.pause();

        let name = scheduler.load_from_json("this is not json");
        assert!(name.starts_with("snippet_"));
        assert!(scheduler.state().get_snippet(&name).unwrap().is_empty());

        let name = scheduler.load_from_json(
            r#"{"name": "blink", "curves": {"45": [{"time": 0, "intensity": 0}, {"time": 0.2, "intensity": 1}]}}"#,
        );
        assert_eq!(name, "blink");
        assert_eq!(scheduler.state().get_snippet("blink").unwrap().get_duration(), 0.2);
    }

    #[test]
    fn test_tuning_and_snapshot() {
        let target = MockRenderTarget::new(HandleMode::Instant);
        let scheduler = Scheduler::with_config(target, without_continuity());
        scheduler.pause();
        scheduler.load(
            Snippet::new("idle")
                .set_loop(true)
                .with_curve("1", vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 0.4)]),
        );

        scheduler.set_snippet_playback_rate("idle", 2.0);
        scheduler.set_snippet_intensity_scale("idle", 0.5);
        scheduler.set_snippet_priority("idle", 3);
        scheduler.set_snippet_time("idle", 2.25);
        scheduler.set_snippet_playing("idle", false);

        let snapshot = scheduler.get_schedule_snapshot();
        assert_eq!(
            snapshot,
            vec![ScheduleEntry {
                name: "idle".into(),
                local_time: 0.25,
                duration: 1.0,
                looping: true,
                priority: 3,
                playback_rate: 2.0,
                intensity_scale: 0.5,
                is_playing: false,
                ended: false,
            }]
        );

        scheduler.set_snippet_loop("idle", false);
        scheduler.set_snippet_time("idle", 2.25);
        assert_eq!(scheduler.get_schedule_snapshot()[0].local_time, 1.0);
    }

    #[test]
    fn test_schedule_offset_wraps_for_loops() {
        let scheduler = Scheduler::new(MockRenderTarget::default());
        scheduler.pause();
        scheduler.schedule(
            Snippet::new("idle")
                .set_loop(true)
                .with_curve("1", vec![Keyframe::new(1.0, 0.4)]),
            ScheduleOptions::default().set_offset(2.5),
        );
        scheduler.schedule(
            Snippet::new("once").with_curve("1", vec![Keyframe::new(1.0, 0.4)]),
            ScheduleOptions::default().set_offset(2.5),
        );
        let state = scheduler.state();
        assert_eq!(state.get_snippet("idle").unwrap().get_current_time(), 0.5);
        assert_eq!(state.get_snippet("once").unwrap().get_current_time(), 1.0);
    }

    #[test]
    fn test_without_runtime() {
        let scheduler = Scheduler::new(MockRenderTarget::default());
        scheduler.load(ramp("ramp"));
        assert_eq!(scheduler.runner_state("ramp"), None);
        assert!(scheduler.state().get_snippet("ramp").unwrap().is_playing());
        assert_eq!(
            scheduler.composed_at_current_time()[&Channel::Named("1".into())].value,
            0.0
        );
    }

    #[test]
    fn test_display() {
        let scheduler = Scheduler::new(MockRenderTarget::default());
        scheduler.pause();
        scheduler.load(ramp("ramp"));
        assert_eq!(
            scheduler.to_string(),
            "Scheduler [mode=Paused, snippets=1, runners=0]"
        );
        assert!(format!("{:?}", scheduler).starts_with("Scheduler { target: "));
    }
}
