//! Defines the contract between the animation core and the rendering engine.

use std::fmt::Debug;

pub use crate::render::handle::{TransitionHandle, TransitionStatus};
pub use crate::render::tween::Tween;

mod handle;
mod tween;

/// The rendering engine as seen by the core: sets blend-shape weights and rotates bones for the
/// channel values the core computes.
///
/// Immediate methods (`apply_au`, `set_morph`, `set_viseme`) are used when seeking. Animated ones
/// return a [`TransitionHandle`] the core awaits before moving to the next keyframe: the default
/// implementations apply the value immediately and hold the handle for the given duration, so an
/// engine without its own transition system only needs to implement the immediate methods.
///
/// Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait RenderTarget: Debug + Send + Sync {
    /// Sets an Action Unit. `balance` (-1 left, +1 right) applies to bilateral units.
    fn apply_au(&self, id: u32, value: f64, balance: Option<f64>) {}

    /// Sets a morph target by name.
    fn set_morph(&self, name: &str, value: f64) {}

    fn transition_au(
        &self,
        id: u32,
        value: f64,
        duration_ms: u64,
        balance: Option<f64>,
    ) -> TransitionHandle {
        self.apply_au(id, value, balance);
        Tween::delay(duration_ms)
    }

    fn transition_morph(&self, name: &str, value: f64, duration_ms: u64) -> TransitionHandle {
        self.set_morph(name, value);
        Tween::delay(duration_ms)
    }

    /// Sets a viseme, coordinated with a jaw opening scaled by `jaw_scale`.
    fn set_viseme(&self, index: usize, value: f64, jaw_scale: f64) {}

    fn transition_viseme(
        &self,
        index: usize,
        value: f64,
        duration_ms: u64,
        jaw_scale: f64,
    ) -> TransitionHandle {
        self.set_viseme(index, value, jaw_scale);
        Tween::delay(duration_ms)
    }

    /// Indicates if [`transition_continuum`](Self::transition_continuum) is implemented. Queried
    /// once, when the scheduler is built.
    fn supports_continuum(&self) -> bool {
        false
    }

    /// Moves the single physical rotation shared by two opposite channels: `value` in [-1, 1],
    /// negative towards `neg`.
    fn transition_continuum(
        &self,
        neg: u32,
        pos: u32,
        value: f64,
        duration_ms: u64,
    ) -> TransitionHandle {
        TransitionHandle::completed()
    }

    /// Called once when a snippet reaches its natural end (never on cancellation).
    fn on_snippet_end(&self, name: &str) {}
}
