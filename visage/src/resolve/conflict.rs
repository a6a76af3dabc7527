use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::animations::{next_time_after, sample_at, BlendMode, Keyframe, Snippet, SnippetCategory};
use crate::config::SchedulerConfig;
use crate::resolve::viseme::viseme_index;

/// A control channel, once classified.
///
/// Channel ids of viseme snippets that designate a viseme are set apart from every other id: they
/// are routed to the viseme path and can not collide with an Action Unit of the same number.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Channel {
    Viseme(usize),
    /// An Action Unit (numeric id) or a morph target.
    Named(String),
}

impl Channel {
    /// Classifies a channel id of a snippet of the given category.
    pub fn classify(id: &str, category: SnippetCategory, viseme_count: usize) -> Self {
        match category.drives_visemes() {
            true => match viseme_index(id, viseme_count) {
                Some(index) => Channel::Viseme(index),
                None => Channel::Named(id.to_string()),
            },
            false => Channel::Named(id.to_string()),
        }
    }

    /// The Action Unit number, if this is a numeric named channel.
    pub fn as_au(&self) -> Option<u32> {
        match self {
            Channel::Named(id) => id.parse().ok(),
            Channel::Viseme(_) => None,
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Viseme(index) => write!(f, "viseme#{}", index),
            Channel::Named(id) => write!(f, "{}", id),
        }
    }
}

/// The resolved value of one channel, with the metadata of the snippet it comes from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Target {
    /// Within [0, 1].
    pub value: f64,
    /// Recommended transition duration.
    pub duration_ms: u64,
    pub priority: i32,
    /// Name of the winning snippet.
    pub source: String,
    pub category: SnippetCategory,
    pub balance: Option<f64>,
    pub jaw_scale: f64,
}

impl Target {
    pub fn new<S: Into<String>>(value: f64, source: S) -> Self {
        Self {
            value,
            duration_ms: 50,
            priority: 0,
            source: source.into(),
            category: SnippetCategory::Default,
            balance: None,
            jaw_scale: 1.0,
        }
    }

    pub fn set_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
    pub fn set_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
    pub fn set_balance(mut self, balance: Option<f64>) -> Self {
        self.balance = balance;
        self
    }
    pub fn set_jaw_scale(mut self, jaw_scale: f64) -> Self {
        self.jaw_scale = jaw_scale;
        self
    }

    /// A replace-mode candidate takes the channel over iff its priority is strictly greater, or
    /// equal with a strictly greater value.
    fn beats(&self, current: &Target) -> bool {
        self.priority > current.priority
            || (self.priority == current.priority && self.value > current.value)
    }
}

/// A snippet sampled at a given local time.
#[derive(Clone, Copy, Debug)]
pub struct Sample<'a> {
    pub snippet: &'a Snippet,
    pub time: f64,
}

impl<'a> Sample<'a> {
    pub fn new(snippet: &'a Snippet, time: f64) -> Self {
        Self { snippet, time }
    }

    /// The snippet at its own current time.
    pub fn current(snippet: &'a Snippet) -> Self {
        Self::new(snippet, snippet.get_current_time())
    }
}

/// Bounds the resolver works with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveOptions {
    pub min_transition_ms: u64,
    pub max_transition_ms: u64,
    pub viseme_count: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for ResolveOptions {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            min_transition_ms: config.get_min_transition_ms(),
            max_transition_ms: config.get_max_transition_ms(),
            viseme_count: config.get_viseme_count(),
        }
    }
}

/// Quadratic intensity law, clamped to [0, 1]: a scale of 0.5 gives a quarter of the raw value.
pub fn scale_intensity(raw: f64, scale: f64) -> f64 {
    let scaled = raw * scale * scale;
    match scaled.is_nan() {
        true => 0.0,
        false => scaled.clamp(0.0, 1.0),
    }
}

/// Time to the next keyframe of a curve, at the snippet playback rate, within the option bounds.
/// The lower bound is used past the last keyframe.
pub fn transition_ms(curve: &[Keyframe], time: f64, rate: f64, options: &ResolveOptions) -> u64 {
    match next_time_after(curve, time) {
        None => options.min_transition_ms,
        Some(next) => {
            let ms = ((next - time) / rate * 1000.0).round();
            (ms.max(0.0) as u64).clamp(options.min_transition_ms, options.max_transition_ms)
        }
    }
}

/// Resolves the value of every channel touched by the given samples.
///
/// Replace-mode snippets compete per channel (priority, then value); additive snippets add up on
/// top of the winner (or stand alone when no replace-mode snippet drives the channel). The result
/// does not depend on the order of `samples`.
pub fn resolve(samples: &[Sample], options: &ResolveOptions) -> BTreeMap<Channel, Target> {
    let mut ordered: Vec<&Sample> = samples.iter().collect();
    ordered.sort_by(|a, b| a.snippet.get_name().cmp(b.snippet.get_name()));

    let mut winners: BTreeMap<Channel, Target> = BTreeMap::new();
    let mut additive: BTreeMap<Channel, (f64, Target)> = BTreeMap::new();

    for sample in ordered {
        let snippet = sample.snippet;
        for (id, curve) in snippet.get_curves() {
            let value = scale_intensity(
                sample_at(curve, sample.time),
                snippet.get_intensity_scale(),
            );
            let channel = Channel::classify(id, snippet.get_category(), options.viseme_count);
            let candidate = Target {
                value,
                duration_ms: transition_ms(curve, sample.time, snippet.get_playback_rate(), options),
                priority: snippet.get_priority(),
                source: snippet.get_name().to_string(),
                category: snippet.get_category(),
                balance: snippet.get_balance(id),
                jaw_scale: snippet.get_jaw_scale(),
            };

            match snippet.get_blend_mode() {
                BlendMode::Additive => {
                    let (sum, meta) = additive
                        .entry(channel)
                        .or_insert_with(|| (0.0, candidate.clone()));
                    *sum += value;
                    if candidate.priority > meta.priority {
                        *meta = candidate;
                    }
                }
                BlendMode::Replace => {
                    let takes_over = winners
                        .get(&channel)
                        .map_or(true, |current| candidate.beats(current));
                    if takes_over {
                        winners.insert(channel, candidate);
                    }
                }
            }
        }
    }

    for (channel, (sum, mut meta)) in additive {
        match winners.get_mut(&channel) {
            Some(winner) => winner.value = (winner.value + sum).clamp(0.0, 1.0),
            None => {
                meta.value = sum.clamp(0.0, 1.0);
                winners.insert(channel, meta);
            }
        }
    }
    winners
}
