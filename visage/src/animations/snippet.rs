use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::animations::keyframe::{canonical_curve, TIME_EPSILON};
use crate::animations::Keyframe;

static NEXT_SNIPPET_ID: AtomicUsize = AtomicUsize::new(1);

/// Generates a process-unique snippet name.
pub(crate) fn unique_name() -> String {
    format!("snippet_{}", NEXT_SNIPPET_ID.fetch_add(1, Ordering::Relaxed))
}

/// Negative, null or NaN playback rates fall back to 1.
pub(crate) fn sanitize_rate(rate: f64) -> f64 {
    match rate.is_finite() && rate > 0.0 {
        true => rate,
        false => 1.0,
    }
}

/// Intensity scales are never negative; NaN falls back to 1.
pub(crate) fn sanitize_scale(scale: f64) -> f64 {
    match scale.is_nan() {
        true => 1.0,
        false => scale.max(0.0),
    }
}

/// What kind of channels a snippet drives: decides how ambiguous channel ids are routed.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnippetCategory {
    #[default]
    Default,
    AuSnippet,
    VisemeSnippet,
    Combined,
}

impl SnippetCategory {
    /// Indicates if viseme-looking channel ids of this snippet go to the viseme path.
    pub fn drives_visemes(&self) -> bool {
        matches!(self, SnippetCategory::VisemeSnippet | SnippetCategory::Combined)
    }
}

/// How a snippet contributes to a channel shared with other snippets.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Competes with other snippets: the highest priority wins the channel.
    #[default]
    Replace,
    /// Adds up on top of the winning value.
    Additive,
}

/// Represents a (normalized) snippet: a named bundle of per-channel keyframe curves plus its
/// playback metadata and playback state.
///
/// A snippet is either built from code, or normalized from its JSON source form
/// ([`SnippetSource`](crate::animations::SnippetSource)).
///
/// # Example
/// ```
/// use visage::animations::{BlendMode, Keyframe, Snippet};
///
/// let smile = Snippet::new("smile")
///     // AU12: lip corner puller.
///     .with_curve("12", vec![Keyframe::new(0.0, 0.0), Keyframe::new(0.4, 0.7)])
///     .set_priority(5)
///     .set_blend_mode(BlendMode::Replace);
/// assert_eq!(smile.get_duration(), 0.4);
/// ```
#[derive(Clone, Debug)]
pub struct Snippet {
    pub(crate) name: String,
    /// Restarts from the beginning once the last keyframe is reached (default: false).
    pub(crate) looping: bool,
    pub(crate) category: SnippetCategory,
    /// Arbitrates shared channels: higher wins, ties broken by the higher value (default: 0).
    pub(crate) priority: i32,
    /// Local time speed factor (default: 1).
    pub(crate) playback_rate: f64,
    /// Intensity multiplier, applied with a quadratic law (default: 1).
    pub(crate) intensity_scale: f64,
    pub(crate) blend_mode: BlendMode,
    /// Jaw opening factor for visemes (default: 1).
    pub(crate) jaw_scale: f64,
    /// Left/right balance applied to bilateral Action Units.
    pub(crate) balance: Option<f64>,
    /// Per-channel balance, overrides `balance`.
    pub(crate) balance_map: BTreeMap<String, f64>,
    /// Channel id to time-sorted keyframes. Every curve holds at least one keyframe.
    pub(crate) curves: BTreeMap<String, Vec<Keyframe>>,

    // ########################################
    // # Volatile playback data.
    pub(crate) is_playing: bool,
    /// Local time (in seconds) within the curves.
    pub(crate) current_time: f64,
    /// Scheduler clock time (in seconds) the snippet was last started at.
    pub(crate) started_at: Option<f64>,
    /// Max keyframe time across curves.
    pub(crate) duration: f64,
    /// Channel id to the number of its keyframes already reached.
    pub(crate) cursor: BTreeMap<String, usize>,
    /// Set on natural completion, cleared by seek.
    pub(crate) ended: bool,
    pub(crate) loop_iteration: u64,
    /// Bumped on every seek: lets a runner know its boundary got outdated.
    pub(crate) seek_epoch: u64,
}

impl Default for Snippet {
    fn default() -> Self {
        Self::new(unique_name())
    }
}

impl Snippet {
    /// Creates an empty snippet with the given name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            looping: false,
            category: SnippetCategory::default(),
            priority: 0,
            playback_rate: 1.0,
            intensity_scale: 1.0,
            blend_mode: BlendMode::default(),
            jaw_scale: 1.0,
            balance: None,
            balance_map: BTreeMap::new(),
            curves: BTreeMap::new(),
            is_playing: false,
            current_time: 0.0,
            started_at: None,
            duration: 0.0,
            cursor: BTreeMap::new(),
            ended: false,
            loop_iteration: 0,
            seek_epoch: 0,
        }
    }

    // ########################################
    // Builders.

    /// Adds (or replaces) the curve of a channel.
    ///
    /// Keyframes are sorted by time, intensities above 1 are read as percentages and non-finite
    /// keyframes are dropped. A curve left empty is ignored.
    pub fn with_curve<S: Into<String>>(mut self, channel: S, keyframes: Vec<Keyframe>) -> Self {
        let channel = channel.into();
        let curve = canonical_curve(keyframes);
        match curve.is_empty() {
            true => {
                self.curves.remove(&channel);
            }
            false => {
                self.curves.insert(channel, curve);
            }
        }
        self.refresh_duration();
        self
    }

    pub fn set_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }
    pub fn set_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
    pub fn set_category(mut self, category: SnippetCategory) -> Self {
        self.category = category;
        self
    }
    pub fn set_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
    /// Sets the playback rate: invalid rates (<= 0, NaN) fall back to 1.
    pub fn set_playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = sanitize_rate(rate);
        self
    }
    /// Sets the intensity scale: never below 0.
    pub fn set_intensity_scale(mut self, scale: f64) -> Self {
        self.intensity_scale = sanitize_scale(scale);
        self
    }
    pub fn set_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }
    pub fn set_jaw_scale(mut self, jaw_scale: f64) -> Self {
        self.jaw_scale = jaw_scale;
        self
    }
    pub fn set_balance(mut self, balance: f64) -> Self {
        self.balance = Some(balance.clamp(-1.0, 1.0));
        self
    }
    pub fn with_balance<S: Into<String>>(mut self, channel: S, balance: f64) -> Self {
        self.balance_map
            .insert(channel.into(), balance.clamp(-1.0, 1.0));
        self
    }

    // ########################################
    // Getters.

    pub fn get_name(&self) -> &str {
        &self.name
    }
    pub fn is_loop(&self) -> bool {
        self.looping
    }
    pub fn get_category(&self) -> SnippetCategory {
        self.category
    }
    pub fn get_priority(&self) -> i32 {
        self.priority
    }
    pub fn get_playback_rate(&self) -> f64 {
        self.playback_rate
    }
    pub fn get_intensity_scale(&self) -> f64 {
        self.intensity_scale
    }
    pub fn get_blend_mode(&self) -> BlendMode {
        self.blend_mode
    }
    pub fn get_jaw_scale(&self) -> f64 {
        self.jaw_scale
    }
    /// Returns the balance of a channel: the per-channel one if any, the snippet one otherwise.
    pub fn get_balance(&self, channel: &str) -> Option<f64> {
        self.balance_map.get(channel).copied().or(self.balance)
    }
    pub fn get_curves(&self) -> &BTreeMap<String, Vec<Keyframe>> {
        &self.curves
    }
    pub fn get_curve(&self, channel: &str) -> Option<&[Keyframe]> {
        self.curves.get(channel).map(Vec::as_slice)
    }
    /// Returns the duration (in seconds): the time of the latest keyframe across all curves.
    pub fn get_duration(&self) -> f64 {
        self.duration
    }
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }
    pub fn get_started_at(&self) -> Option<f64> {
        self.started_at
    }
    pub fn get_cursor(&self) -> &BTreeMap<String, usize> {
        &self.cursor
    }
    /// Indicates if the snippet reached its end naturally (and was not seeked since).
    pub fn is_ended(&self) -> bool {
        self.ended
    }
    pub fn get_loop_iteration(&self) -> u64 {
        self.loop_iteration
    }
    /// Indicates if the snippet has nothing to animate.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Returns the union of the keyframe times of all curves: the boundaries a runner walks.
    pub fn keyframe_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .curves
            .values()
            .flat_map(|curve| curve.iter().map(Keyframe::get_time))
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup_by(|a, b| (*a - *b).abs() <= TIME_EPSILON);
        times
    }

    // ########################################
    // Crate internals.

    pub(crate) fn refresh_duration(&mut self) {
        self.duration = self
            .curves
            .values()
            .filter_map(|curve| curve.last())
            .map(Keyframe::get_time)
            .fold(0.0, f64::max);
    }

    /// Back to a fresh, not yet played, snippet.
    pub(crate) fn reset_playback(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
        self.started_at = None;
        self.ended = false;
        self.loop_iteration = 0;
        self.refresh_duration();
        self.refresh_cursor();
    }

    /// Recomputes the cursor map from the current time.
    pub(crate) fn refresh_cursor(&mut self) {
        let time = self.current_time;
        self.cursor = self
            .curves
            .iter()
            .map(|(channel, curve)| {
                let reached = curve
                    .iter()
                    .filter(|kf| kf.get_time() <= time + TIME_EPSILON)
                    .count();
                (channel.clone(), reached)
            })
            .collect();
    }
}

impl Display for Snippet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Snippet '{}' [duration={}s, channels={}, priority={}, loop={}, playing={}]",
            self.name,
            self.duration,
            self.curves.len(),
            self.priority,
            self.looping,
            self.is_playing
        )
    }
}
