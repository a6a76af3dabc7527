use serde::Serialize;

use crate::state::PlayMode;
use crate::utils::events::Event;

/// Discrete occurrences announced by a [`Scheduler`](crate::scheduler::Scheduler).
///
/// Register a callback through [`Scheduler::on`](crate::scheduler::Scheduler::on) with the event
/// name (see [`SnippetEvent::name`]) or [`ANY_EVENT`](crate::utils::events::ANY_EVENT).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SnippetEvent {
    /// `added`: a snippet was loaded.
    Added { name: String },
    /// `removed`: a snippet was removed (or cleared by a global stop).
    Removed { name: String },
    /// `keyframe_reached`: a runner reached a keyframe boundary.
    KeyframeReached { name: String, time: f64 },
    /// `looped`: a looping snippet wrapped.
    Looped { name: String, iteration: u64 },
    /// `completed`: a snippet reached its natural end.
    Completed { name: String },
    /// `play_state_changed`: the global play mode changed.
    PlayStateChanged { mode: PlayMode },
    /// `snippet_play_state_changed`: a snippet was paused or resumed.
    SnippetPlayStateChanged { name: String, playing: bool },
}

impl Event for SnippetEvent {
    fn name(&self) -> &'static str {
        match self {
            SnippetEvent::Added { .. } => "added",
            SnippetEvent::Removed { .. } => "removed",
            SnippetEvent::KeyframeReached { .. } => "keyframe_reached",
            SnippetEvent::Looped { .. } => "looped",
            SnippetEvent::Completed { .. } => "completed",
            SnippetEvent::PlayStateChanged { .. } => "play_state_changed",
            SnippetEvent::SnippetPlayStateChanged { .. } => "snippet_play_state_changed",
        }
    }
}
