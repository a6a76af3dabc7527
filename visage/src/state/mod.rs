//! Defines the animation state container: the loaded snippets, manual overrides and global play
//! mode, changed through [`Command`]s only.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use crate::state::command::{reduce, Command};
pub use crate::state::store::{Store, StoreStatus};

use crate::animations::Snippet;
use crate::resolve::{resolve, Channel, ResolveOptions, Sample, Target};

mod command;
mod store;

/// Global play mode of a scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayMode {
    #[default]
    Playing,
    Paused,
    Stopped,
}

/// One line of [`AnimationState::get_schedule`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub name: String,
    pub local_time: f64,
    pub duration: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub priority: i32,
    pub playback_rate: f64,
    pub intensity_scale: f64,
    pub is_playing: bool,
    pub ended: bool,
}

impl From<&Snippet> for ScheduleEntry {
    fn from(snippet: &Snippet) -> Self {
        Self {
            name: snippet.get_name().to_string(),
            local_time: snippet.get_current_time(),
            duration: snippet.get_duration(),
            looping: snippet.is_loop(),
            priority: snippet.get_priority(),
            playback_rate: snippet.get_playback_rate(),
            intensity_scale: snippet.get_intensity_scale(),
            is_playing: snippet.is_playing(),
            ended: snippet.is_ended(),
        }
    }
}

/// A read-only snapshot of the animation state.
///
/// Composed channel values are never stored: [`composed`](Self::composed) derives them from the
/// snippets each time it is called.
#[derive(Clone, Debug, Default)]
pub struct AnimationState {
    snippets: BTreeMap<String, Snippet>,
    /// Channel id to value: always wins over snippets.
    manual: BTreeMap<String, f64>,
    play_mode: PlayMode,
}

impl AnimationState {
    pub fn get_snippets(&self) -> &BTreeMap<String, Snippet> {
        &self.snippets
    }
    pub fn get_snippet(&self, name: &str) -> Option<&Snippet> {
        self.snippets.get(name)
    }
    pub fn get_manual(&self) -> &BTreeMap<String, f64> {
        &self.manual
    }
    pub fn is_manual(&self, id: &str) -> bool {
        self.manual.contains_key(id)
    }
    pub fn get_play_mode(&self) -> PlayMode {
        self.play_mode
    }
    pub fn len(&self) -> usize {
        self.snippets.len()
    }
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// The playing snippets, each at its own current time.
    pub fn playing_samples(&self) -> Vec<Sample> {
        self.snippets
            .values()
            .filter(|snippet| snippet.is_playing())
            .map(Sample::current)
            .collect()
    }

    /// The value of every channel right now: playing snippets resolved at their current time,
    /// manual overrides on top.
    pub fn composed(&self, options: &ResolveOptions) -> BTreeMap<Channel, Target> {
        let mut targets = resolve(&self.playing_samples(), options);
        for (id, value) in &self.manual {
            targets.insert(
                Channel::Named(id.clone()),
                Target::new(*value, "manual")
                    .set_priority(i32::MAX)
                    .set_duration_ms(options.min_transition_ms),
            );
        }
        targets
    }

    pub fn get_schedule(&self) -> Vec<ScheduleEntry> {
        self.snippets.values().map(ScheduleEntry::from).collect()
    }
}

impl Display for AnimationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "AnimationState [mode={:?}, snippets={}, manual={}]:",
            self.play_mode,
            self.snippets.len(),
            self.manual.len()
        )?;
        for snippet in self.snippets.values() {
            writeln!(f, "  {}", snippet)?;
        }
        Ok(())
    }
}
