use crate::animations::{sanitize_rate, sanitize_scale, Snippet};
use crate::scheduler::{reseed_on_loop, ValueTracker};
use crate::state::{AnimationState, PlayMode};

/// Every change the [`AnimationState`] can go through. Commands on unknown snippet names are
/// no-ops.
#[derive(Clone, Debug)]
pub enum Command {
    /// Adds a snippet, replacing any snippet of the same name.
    Load(Snippet),
    Remove(String),
    /// Removes every snippet.
    Clear,
    /// Moves the local time (clamped within the snippet duration) and clears the ended flag.
    Seek { name: String, time: f64 },
    SetPlaying {
        name: String,
        playing: bool,
        /// Scheduler clock time the snippet starts at.
        started_at: Option<f64>,
    },
    SetPlaybackRate { name: String, rate: f64 },
    SetIntensityScale { name: String, scale: f64 },
    SetPriority { name: String, priority: i32 },
    SetLoop { name: String, looping: bool },
    SetPlayMode(PlayMode),
    SetManual { id: String, value: f64 },
    ClearManual(String),
    /// A runner reached a keyframe boundary.
    Advance { name: String, time: f64 },
    /// A looping snippet wraps: its inherited keyframes take the given tracked values.
    Wrap { name: String, values: ValueTracker },
    /// A snippet reached its natural end.
    Complete(String),
    /// Back to the start, not playing.
    Rewind(String),
}

/// Applies a command: the state goes in, the new state comes out.
pub fn reduce(state: AnimationState, command: Command) -> AnimationState {
    match command {
        Command::Load(snippet) => load(state, snippet),
        Command::Remove(name) => remove(state, &name),
        Command::Clear => clear(state),
        Command::Seek { name, time } => seek(state, &name, time),
        Command::SetPlaying {
            name,
            playing,
            started_at,
        } => set_playing(state, &name, playing, started_at),
        Command::SetPlaybackRate { name, rate } => with_snippet(state, &name, |snippet| {
            snippet.playback_rate = sanitize_rate(rate);
        }),
        Command::SetIntensityScale { name, scale } => with_snippet(state, &name, |snippet| {
            snippet.intensity_scale = sanitize_scale(scale);
        }),
        Command::SetPriority { name, priority } => with_snippet(state, &name, |snippet| {
            snippet.priority = priority;
        }),
        Command::SetLoop { name, looping } => with_snippet(state, &name, |snippet| {
            snippet.looping = looping;
        }),
        Command::SetPlayMode(mode) => set_play_mode(state, mode),
        Command::SetManual { id, value } => set_manual(state, id, value),
        Command::ClearManual(id) => clear_manual(state, &id),
        Command::Advance { name, time } => advance(state, &name, time),
        Command::Wrap { name, values } => wrap(state, &name, &values),
        Command::Complete(name) => complete(state, &name),
        Command::Rewind(name) => rewind(state, &name),
    }
}

fn with_snippet<F>(mut state: AnimationState, name: &str, change: F) -> AnimationState
where
    F: FnOnce(&mut Snippet),
{
    if let Some(snippet) = state.snippets.get_mut(name) {
        change(snippet);
    }
    state
}

fn load(mut state: AnimationState, mut snippet: Snippet) -> AnimationState {
    snippet.refresh_duration();
    snippet.refresh_cursor();
    state.snippets.insert(snippet.name.clone(), snippet);
    state
}

fn remove(mut state: AnimationState, name: &str) -> AnimationState {
    state.snippets.remove(name);
    state
}

fn clear(mut state: AnimationState) -> AnimationState {
    state.snippets.clear();
    state
}

fn seek(state: AnimationState, name: &str, time: f64) -> AnimationState {
    with_snippet(state, name, |snippet| {
        let time = match time.is_nan() {
            true => 0.0,
            false => time.clamp(0.0, snippet.duration),
        };
        snippet.current_time = time;
        snippet.ended = false;
        snippet.seek_epoch += 1;
        snippet.refresh_cursor();
    })
}

fn set_playing(
    state: AnimationState,
    name: &str,
    playing: bool,
    started_at: Option<f64>,
) -> AnimationState {
    with_snippet(state, name, |snippet| {
        snippet.is_playing = playing;
        if playing && started_at.is_some() {
            snippet.started_at = started_at;
        }
    })
}

fn set_play_mode(mut state: AnimationState, mode: PlayMode) -> AnimationState {
    state.play_mode = mode;
    state
}

fn set_manual(mut state: AnimationState, id: String, value: f64) -> AnimationState {
    if value.is_finite() {
        state.manual.insert(id, value.clamp(0.0, 1.0));
    }
    state
}

fn clear_manual(mut state: AnimationState, id: &str) -> AnimationState {
    state.manual.remove(id);
    state
}

fn advance(state: AnimationState, name: &str, time: f64) -> AnimationState {
    with_snippet(state, name, |snippet| {
        snippet.current_time = time.clamp(0.0, snippet.duration);
        snippet.refresh_cursor();
    })
}

fn wrap(state: AnimationState, name: &str, values: &ValueTracker) -> AnimationState {
    with_snippet(state, name, |snippet| {
        reseed_on_loop(snippet, values);
        snippet.loop_iteration += 1;
        snippet.current_time = 0.0;
        snippet.ended = false;
        snippet.refresh_cursor();
    })
}

fn complete(state: AnimationState, name: &str) -> AnimationState {
    with_snippet(state, name, |snippet| {
        snippet.is_playing = false;
        snippet.ended = true;
        snippet.current_time = snippet.duration;
        snippet.refresh_cursor();
    })
}

fn rewind(state: AnimationState, name: &str) -> AnimationState {
    with_snippet(state, name, |snippet| {
        snippet.is_playing = false;
        snippet.ended = false;
        snippet.current_time = 0.0;
        snippet.seek_epoch += 1;
        snippet.refresh_cursor();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animations::Keyframe;
    use crate::resolve::Channel;

    fn loaded() -> AnimationState {
        let snippet = Snippet::new("blink").with_curve(
            "45",
            vec![
                Keyframe::new(0.0, 0.0).set_inherit(true),
                Keyframe::new(0.5, 1.0),
                Keyframe::new(1.0, 0.0),
            ],
        );
        reduce(AnimationState::default(), Command::Load(snippet))
    }

    fn blink(state: &AnimationState) -> &Snippet {
        state.get_snippet("blink").unwrap()
    }

    #[test]
    fn test_load_and_remove() {
        let state = loaded();
        assert_eq!(state.len(), 1);
        assert_eq!(blink(&state).get_duration(), 1.0);
        assert_eq!(blink(&state).get_cursor().get("45"), Some(&1));

        let state = reduce(state, Command::Remove("unknown".into()));
        assert_eq!(state.len(), 1, "Unknown names are no-ops");
        let state = reduce(state, Command::Remove("blink".into()));
        assert!(state.is_empty());
    }

    #[test]
    fn test_seek_clamping() {
        let state = reduce(
            loaded(),
            Command::Seek {
                name: "blink".into(),
                time: -2.0,
            },
        );
        assert_eq!(blink(&state).get_current_time(), 0.0);

        let state = reduce(state, Command::Complete("blink".into()));
        assert!(blink(&state).is_ended());

        let state = reduce(
            state,
            Command::Seek {
                name: "blink".into(),
                time: 12.0,
            },
        );
        let snippet = blink(&state);
        assert_eq!(snippet.get_current_time(), 1.0);
        assert!(!snippet.is_ended(), "Seek clears the ended flag");
        assert_eq!(snippet.seek_epoch, 2);
        assert_eq!(snippet.get_cursor().get("45"), Some(&3));
    }

    #[test]
    fn test_tuning_is_sanitized() {
        let name = String::from("blink");
        let state = reduce(
            loaded(),
            Command::SetPlaybackRate {
                name: name.clone(),
                rate: -1.0,
            },
        );
        let state = reduce(
            state,
            Command::SetIntensityScale {
                name: name.clone(),
                scale: -1.0,
            },
        );
        let state = reduce(
            state,
            Command::SetPriority {
                name: name.clone(),
                priority: 7,
            },
        );
        let state = reduce(state, Command::SetLoop { name, looping: true });
        let snippet = blink(&state);
        assert_eq!(snippet.get_playback_rate(), 1.0);
        assert_eq!(snippet.get_intensity_scale(), 0.0);
        assert_eq!(snippet.get_priority(), 7);
        assert!(snippet.is_loop());
    }

    #[test]
    fn test_playing_lifecycle() {
        let state = reduce(
            loaded(),
            Command::SetPlaying {
                name: "blink".into(),
                playing: true,
                started_at: Some(1.5),
            },
        );
        assert!(blink(&state).is_playing());
        assert_eq!(blink(&state).get_started_at(), Some(1.5));

        let state = reduce(
            state,
            Command::Advance {
                name: "blink".into(),
                time: 0.5,
            },
        );
        assert_eq!(blink(&state).get_current_time(), 0.5);
        assert_eq!(blink(&state).get_cursor().get("45"), Some(&2));

        let state = reduce(state, Command::Complete("blink".into()));
        let snippet = blink(&state);
        assert!(!snippet.is_playing());
        assert!(snippet.is_ended());
        assert_eq!(snippet.get_current_time(), 1.0);
        assert_eq!(state.len(), 1, "Completed snippets stay loaded");

        let state = reduce(state, Command::Rewind("blink".into()));
        assert_eq!(blink(&state).get_current_time(), 0.0);
        assert!(!blink(&state).is_ended());
    }

    #[test]
    fn test_wrap_reseeds_inherited_keyframes() {
        let mut values = ValueTracker::default();
        values.record(Channel::Named("45".into()), 0.4);

        let state = reduce(
            loaded(),
            Command::Advance {
                name: "blink".into(),
                time: 1.0,
            },
        );
        let state = reduce(
            state,
            Command::Wrap {
                name: "blink".into(),
                values,
            },
        );
        let snippet = blink(&state);
        assert_eq!(snippet.get_loop_iteration(), 1);
        assert_eq!(snippet.get_current_time(), 0.0);
        assert_eq!(snippet.get_curve("45").unwrap()[0].get_intensity(), 0.4);
    }

    #[test]
    fn test_manual_and_play_mode() {
        let state = reduce(
            AnimationState::default(),
            Command::SetManual {
                id: "12".into(),
                value: 3.0,
            },
        );
        assert_eq!(state.get_manual().get("12"), Some(&1.0));
        let state = reduce(
            state,
            Command::SetManual {
                id: "13".into(),
                value: f64::NAN,
            },
        );
        assert!(!state.is_manual("13"));

        let state = reduce(state, Command::SetPlayMode(PlayMode::Paused));
        assert_eq!(state.get_play_mode(), PlayMode::Paused);
        let state = reduce(state, Command::Clear);
        assert!(state.is_empty());
        assert!(state.is_manual("12"), "Clear only removes snippets");
    }
}
