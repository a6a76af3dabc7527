//! Defines how the snippets sharing channels are turned into render commands.
//!
//! Resolution runs in three stages:
//! - [`resolve`]: per channel arbitration between snippets (priority, blend mode, intensity scale),
//! - [`route_visemes`]: viseme channels go to their dedicated path,
//! - [`resolve_continuum`]: opposite channel pairs collapse into one signed rotation.
//!
//! [`compose`] chains the last two stages.

use std::collections::BTreeMap;

pub use crate::resolve::conflict::{
    resolve, scale_intensity, transition_ms, Channel, ResolveOptions, Sample, Target,
};
pub use crate::resolve::continuum::resolve_continuum;
pub use crate::resolve::viseme::{route_visemes, viseme_index, VISEME_NAMES};

use crate::config::ContinuumPair;
use crate::render::{RenderTarget, TransitionHandle};

mod conflict;
mod continuum;
mod viseme;

/// One command for the render target.
#[derive(Clone, Debug, PartialEq)]
pub enum Apply {
    Au {
        id: u32,
        value: f64,
        balance: Option<f64>,
        duration_ms: u64,
    },
    Morph {
        name: String,
        value: f64,
        duration_ms: u64,
    },
    Viseme {
        index: usize,
        value: f64,
        jaw_scale: f64,
        duration_ms: u64,
    },
    /// `value` within [-1, 1]: negative towards `neg`.
    Continuum {
        neg: u32,
        pos: u32,
        value: f64,
        duration_ms: u64,
    },
}

impl Apply {
    /// An Action Unit command for numeric ids, a morph command otherwise.
    pub fn single(id: &str, value: f64, balance: Option<f64>, duration_ms: u64) -> Self {
        match id.parse::<u32>() {
            Ok(id) => Apply::Au {
                id,
                value,
                balance,
                duration_ms,
            },
            Err(_) => Apply::Morph {
                name: id.to_string(),
                value,
                duration_ms,
            },
        }
    }

    pub fn get_duration_ms(&self) -> u64 {
        match self {
            Apply::Au { duration_ms, .. }
            | Apply::Morph { duration_ms, .. }
            | Apply::Viseme { duration_ms, .. }
            | Apply::Continuum { duration_ms, .. } => *duration_ms,
        }
    }

    pub fn set_duration_ms(mut self, duration: u64) -> Self {
        match &mut self {
            Apply::Au { duration_ms, .. }
            | Apply::Morph { duration_ms, .. }
            | Apply::Viseme { duration_ms, .. }
            | Apply::Continuum { duration_ms, .. } => *duration_ms = duration,
        }
        self
    }

    /// The value each written channel ends up with.
    pub fn issued_values(&self) -> Vec<(Channel, f64)> {
        match self {
            Apply::Au { id, value, .. } => vec![(Channel::Named(id.to_string()), *value)],
            Apply::Morph { name, value, .. } => vec![(Channel::Named(name.clone()), *value)],
            Apply::Viseme { index, value, .. } => vec![(Channel::Viseme(*index), *value)],
            Apply::Continuum { neg, pos, value, .. } => vec![
                (Channel::Named(neg.to_string()), (-value).max(0.0)),
                (Channel::Named(pos.to_string()), value.max(0.0)),
            ],
        }
    }

    /// Sends the command as an animated transition.
    pub fn transition(&self, target: &dyn RenderTarget) -> TransitionHandle {
        match self {
            Apply::Au {
                id,
                value,
                balance,
                duration_ms,
            } => target.transition_au(*id, *value, *duration_ms, *balance),
            Apply::Morph {
                name,
                value,
                duration_ms,
            } => target.transition_morph(name, *value, *duration_ms),
            Apply::Viseme {
                index,
                value,
                jaw_scale,
                duration_ms,
            } => target.transition_viseme(*index, *value, *duration_ms, *jaw_scale),
            Apply::Continuum {
                neg,
                pos,
                value,
                duration_ms,
            } => target.transition_continuum(*neg, *pos, *value, *duration_ms),
        }
    }

    /// Sends the command immediately (no transition).
    ///
    /// There is no immediate continuum call: the signed value goes to one side as an Action Unit.
    pub fn apply(&self, target: &dyn RenderTarget) {
        match self {
            Apply::Au {
                id, value, balance, ..
            } => target.apply_au(*id, *value, *balance),
            Apply::Morph { name, value, .. } => target.set_morph(name, *value),
            Apply::Viseme {
                index,
                value,
                jaw_scale,
                ..
            } => target.set_viseme(*index, *value, *jaw_scale),
            Apply::Continuum {
                neg, pos, value, ..
            } => match *value < 0.0 {
                true => target.apply_au(*neg, value.abs(), None),
                false => target.apply_au(*pos, *value, None),
            },
        }
    }
}

/// Turns resolved targets into render commands: visemes first, then continuum pairs and the
/// remaining Action Units / morphs.
pub fn compose(
    targets: BTreeMap<Channel, Target>,
    pairs: &[ContinuumPair],
    supports_continuum: bool,
) -> Vec<Apply> {
    let (mut applies, generic) = route_visemes(targets);
    applies.extend(resolve_continuum(generic, pairs, supports_continuum));
    applies
}
