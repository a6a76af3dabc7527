use serde::{Deserialize, Serialize};
use simple_easing::*;

/// Easing curves a [`Tween`](crate::render::Tween) can follow when moving a channel from one value
/// to the next.
///
/// Snippet curves themselves are always sampled linearly: the easing only shapes the motion of a
/// transition between two sampled values.
///
/// See <https://easings.net> for a representation of easing methods.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    /// Applies no transformation.
    Linear,
    /// Starts slow, accelerates.
    QuadIn,
    /// Starts fast, settles.
    QuadOut,
    QuadInOut,
    /// Sharper than `QuadInOut` in the middle.
    CubicInOut,
    SineIn,
    SineOut,
    /// Default: the closest to a muscle ramping up and down.
    #[default]
    SineInOut,
    /// Snaps, then creeps to the target (saccade-like).
    ExpoOut,
    /// Overshoots slightly before settling.
    BackOut,
}

impl Easing {
    /// Applies the easing to a progress ratio (0.0 at start, 1.0 at the end of the transition).
    /// The progress is clamped within [0, 1] first.
    pub fn apply(&self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0) as f32;
        let eased = match self {
            Easing::Linear => t,
            Easing::QuadIn => quad_in(t),
            Easing::QuadOut => quad_out(t),
            Easing::QuadInOut => quad_in_out(t),
            Easing::CubicInOut => cubic_in_out(t),
            Easing::SineIn => sine_in(t),
            Easing::SineOut => sine_out(t),
            Easing::SineInOut => sine_in_out(t),
            Easing::ExpoOut => expo_out(t),
            Easing::BackOut => back_out(t),
        };
        eased as f64
    }

    /// Interpolates between `from` and `to` at the given progress.
    pub fn interpolate(&self, from: f64, to: f64, progress: f64) -> f64 {
        from + (to - from) * self.apply(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_easing_approx_equal(easing: Easing, input: f64, expected: f64) {
        let result = easing.apply(input);
        assert!(
            (result - expected).abs() < 1e-6,
            "Expected {}, got {}",
            expected,
            result
        );
    }

    #[test]
    fn test_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::QuadIn,
            Easing::QuadOut,
            Easing::QuadInOut,
            Easing::CubicInOut,
            Easing::SineIn,
            Easing::SineOut,
            Easing::SineInOut,
            Easing::ExpoOut,
            Easing::BackOut,
        ] {
            assert_easing_approx_equal(easing, 0.0, 0.0);
            assert_easing_approx_equal(easing, 1.0, 1.0);
        }
    }

    #[test]
    fn test_midpoints() {
        assert_easing_approx_equal(Easing::Linear, 0.3, 0.3);
        assert_easing_approx_equal(Easing::QuadOut, 0.5, 0.75);
        assert_easing_approx_equal(Easing::QuadIn, 0.5, 0.25);
        assert_easing_approx_equal(Easing::SineInOut, 0.5, 0.5);
        assert_easing_approx_equal(Easing::SineInOut, 0.2, 0.0954915);
        assert_easing_approx_equal(Easing::BackOut, 0.5, 1.0876975);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_easing_approx_equal(Easing::Linear, -2.0, 0.0);
        assert_easing_approx_equal(Easing::Linear, 3.0, 1.0);
    }

    #[test]
    fn test_interpolate() {
        assert!((Easing::Linear.interpolate(0.2, 0.6, 0.5) - 0.4).abs() < 1e-6);
        assert!((Easing::QuadOut.interpolate(1.0, 0.0, 0.5) - 0.25).abs() < 1e-6);
        assert_eq!(Easing::default(), Easing::SineInOut);
    }
}
