//! Defines the [`SchedulerConfig`] tuning entity.

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Two opposite-signed channels that are algebraically one rotation axis (eye yaw for instance):
/// the physical value is `pos - neg`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuumPair {
    pub neg: String,
    pub pos: String,
    pub axis: String,
}

impl ContinuumPair {
    pub fn new<N: Into<String>, P: Into<String>, A: Into<String>>(neg: N, pos: P, axis: A) -> Self {
        Self {
            neg: neg.into(),
            pos: pos.into(),
            axis: axis.into(),
        }
    }

    /// The opposite side of the given channel id, if it belongs to the pair.
    pub fn partner_of(&self, id: &str) -> Option<&str> {
        match id {
            id if id == self.neg => Some(&self.pos),
            id if id == self.pos => Some(&self.neg),
            _ => None,
        }
    }
}

/// FACS head and eye movement pairs.
fn default_continuum_pairs() -> Vec<ContinuumPair> {
    vec![
        ContinuumPair::new("61", "62", "eye_yaw"),
        ContinuumPair::new("64", "63", "eye_pitch"),
        ContinuumPair::new("51", "52", "head_yaw"),
        ContinuumPair::new("54", "53", "head_pitch"),
        ContinuumPair::new("55", "56", "head_roll"),
    ]
}

/// Tuning of a [`Scheduler`](crate::scheduler::Scheduler) and its resolution pipeline.
///
/// # Example
/// ```
/// use visage::config::SchedulerConfig;
///
/// let config = SchedulerConfig::default()
///     .set_transition_bounds(40, 800)
///     .set_continuity(false);
/// assert_eq!(config.get_min_transition_ms(), 40);
///
/// let config = SchedulerConfig::from_json(r#"{"visemeCount": 22}"#).unwrap();
/// assert_eq!(config.get_viseme_count(), 22);
/// assert_eq!(config.get_max_transition_ms(), 1000);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Lower bound of resolved transition durations (default: 50ms).
    min_transition_ms: u64,
    /// Upper bound of resolved transition durations (default: 1000ms).
    max_transition_ms: u64,
    /// Minimal duration of a runner boundary step (default: 30ms).
    min_step_ms: u64,
    /// Number of visemes known by the render target (default: 15).
    viseme_count: usize,
    /// Rewrites the first keyframes of loaded snippets to the current channel values (default: true).
    continuity: bool,
    continuum_pairs: Vec<ContinuumPair>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_transition_ms: 50,
            max_transition_ms: 1000,
            min_step_ms: 30,
            viseme_count: 15,
            continuity: true,
            continuum_pairs: default_continuum_pairs(),
        }
    }
}

impl SchedulerConfig {
    /// Parses a configuration from JSON: missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    // ########################################
    // Setters and Getters.

    /// Sets the bounds of resolved transitions: swapped if given in the wrong order.
    pub fn set_transition_bounds(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_transition_ms = min_ms.min(max_ms);
        self.max_transition_ms = max_ms.max(min_ms);
        self
    }
    pub fn set_min_step_ms(mut self, min_step_ms: u64) -> Self {
        self.min_step_ms = min_step_ms;
        self
    }
    pub fn set_viseme_count(mut self, viseme_count: usize) -> Self {
        self.viseme_count = viseme_count;
        self
    }
    pub fn set_continuity(mut self, continuity: bool) -> Self {
        self.continuity = continuity;
        self
    }
    pub fn set_continuum_pairs(mut self, pairs: Vec<ContinuumPair>) -> Self {
        self.continuum_pairs = pairs;
        self
    }

    pub fn get_min_transition_ms(&self) -> u64 {
        self.min_transition_ms
    }
    pub fn get_max_transition_ms(&self) -> u64 {
        self.max_transition_ms
    }
    pub fn get_min_step_ms(&self) -> u64 {
        self.min_step_ms
    }
    pub fn get_viseme_count(&self) -> usize {
        self.viseme_count
    }
    pub fn is_continuity(&self) -> bool {
        self.continuity
    }
    pub fn get_continuum_pairs(&self) -> &[ContinuumPair] {
        &self.continuum_pairs
    }
}
