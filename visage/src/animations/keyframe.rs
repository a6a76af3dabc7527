use serde::{Deserialize, Serialize};

/// Smallest time gap considered between two keyframes: guards the interpolation against
/// duplicate timestamps.
pub(crate) const TIME_EPSILON: f64 = 1e-6;

/// Represents a keyframe of a channel curve: the intensity the channel should reach at a given
/// (snippet local) time.
///
/// The `inherit` flag marks a keyframe whose intensity is not authoritative: when the snippet is
/// loaded (or loops), the intensity is rewritten with the value the channel currently has, so the
/// curve starts from wherever the avatar actually is.
///
/// # Example
/// ```
/// use visage::animations::Keyframe;
/// let keyframe = Keyframe::new(0.5, 0.8);
/// let start = Keyframe::new(0.0, 0.0).set_inherit(true);
/// assert!(start.is_inherit());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time of the keyframe in seconds, relative to the snippet start.
    time: f64,
    /// The targeted intensity (usually within [0, 1]).
    intensity: f64,
    /// Whether the intensity is inherited from the current channel value.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    inherit: bool,
}

impl Keyframe {
    /// Creates a new `Keyframe` at `time` (seconds) with the given `intensity`.
    pub fn new(time: f64, intensity: f64) -> Self {
        Self {
            time,
            intensity,
            inherit: false,
        }
    }

    /// Returns the time (in seconds) of the keyframe.
    pub fn get_time(&self) -> f64 {
        self.time
    }

    /// Returns the intensity of the keyframe.
    pub fn get_intensity(&self) -> f64 {
        self.intensity
    }

    /// Indicates if the keyframe intensity is inherited from the channel current value.
    pub fn is_inherit(&self) -> bool {
        self.inherit
    }

    /// Sets the inherit flag.
    pub fn set_inherit(mut self, inherit: bool) -> Self {
        self.inherit = inherit;
        self
    }

    pub(crate) fn set_intensity(&mut self, intensity: f64) {
        self.intensity = intensity;
    }

    /// Intensities above 1 are authored as percentages.
    pub(crate) fn coerce(mut self) -> Self {
        if self.intensity > 1.0 {
            self.intensity /= 100.0;
        }
        self
    }
}

/// Sorts (stable) and coerces a list of keyframes into a canonical curve.
/// Keyframes with non-finite time or intensity are dropped.
pub(crate) fn canonical_curve(points: Vec<Keyframe>) -> Vec<Keyframe> {
    let mut points: Vec<Keyframe> = points
        .into_iter()
        .filter(|kf| kf.time.is_finite() && kf.intensity.is_finite())
        .map(Keyframe::coerce)
        .collect();
    points.sort_by(|a, b| a.time.total_cmp(&b.time));
    points
}

/// Samples a curve at time `t`.
///
/// - before the first keyframe: holds the first intensity,
/// - after the last keyframe: holds the last intensity,
/// - in between: linear interpolation between the surrounding keyframes.
///
/// An empty curve samples to 0. Easing is not the concern of the sampler: transitions between
/// sampled values are eased by the render target.
pub fn sample_at(points: &[Keyframe], t: f64) -> f64 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };
    if t <= first.time {
        return first.intensity;
    }
    if t >= last.time {
        return last.intensity;
    }

    // First keyframe strictly after t: exists since t < last.time.
    let index = points.partition_point(|kf| kf.time <= t).max(1);
    let a = &points[index - 1];
    let b = &points[index];
    let span = (b.time - a.time).max(TIME_EPSILON);
    a.intensity + (b.intensity - a.intensity) * (t - a.time) / span
}

/// Returns the time of the first keyframe strictly after `t`, if any.
pub fn next_time_after(points: &[Keyframe], t: f64) -> Option<f64> {
    points
        .iter()
        .map(|kf| kf.time)
        .find(|time| *time > t + TIME_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> Vec<Keyframe> {
        vec![
            Keyframe::new(0.5, 0.2),
            Keyframe::new(1.0, 0.6),
            Keyframe::new(2.0, 0.1),
        ]
    }

    #[test]
    fn test_keyframe_new() {
        let keyframe = Keyframe::new(0.25, 0.5);
        assert_eq!(keyframe.get_time(), 0.25);
        assert_eq!(keyframe.get_intensity(), 0.5);
        assert!(!keyframe.is_inherit());
        assert!(keyframe.set_inherit(true).is_inherit());
    }

    #[test]
    fn test_sample_holds_boundaries() {
        let curve = curve();
        assert_eq!(sample_at(&curve, 0.0), 0.2, "Before first: hold first");
        assert_eq!(sample_at(&curve, -3.0), 0.2);
        assert_eq!(sample_at(&curve, 2.0), 0.1, "On last: last");
        assert_eq!(sample_at(&curve, 10.0), 0.1, "After last: hold last");
    }

    #[test]
    fn test_sample_interpolates() {
        let curve = curve();
        assert!((sample_at(&curve, 0.75) - 0.4).abs() < 1e-9);
        assert!((sample_at(&curve, 1.5) - 0.35).abs() < 1e-9);
        assert_eq!(sample_at(&curve, 1.0), 0.6);
    }

    #[test]
    fn test_sample_degenerate_curves() {
        assert_eq!(sample_at(&[], 1.0), 0.0, "Empty curve samples to 0");
        assert_eq!(sample_at(&[Keyframe::new(1.0, 0.3)], 0.0), 0.3);
        assert_eq!(sample_at(&[Keyframe::new(1.0, 0.3)], 5.0), 0.3);

        // Duplicate timestamps never divide by zero.
        let curve = vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(1.0, 0.2),
            Keyframe::new(1.0, 0.9),
            Keyframe::new(2.0, 0.9),
        ];
        let value = sample_at(&curve, 1.0);
        assert!(value.is_finite());
        assert!(sample_at(&curve, 1.5).is_finite());
    }

    #[test]
    fn test_next_time_after() {
        let curve = curve();
        assert_eq!(next_time_after(&curve, 0.0), Some(0.5));
        assert_eq!(next_time_after(&curve, 0.5), Some(1.0));
        assert_eq!(next_time_after(&curve, 1.2), Some(2.0));
        assert_eq!(next_time_after(&curve, 2.0), None);
    }

    #[test]
    fn test_canonical_curve() {
        let curve = canonical_curve(vec![
            Keyframe::new(1.0, 80.0),
            Keyframe::new(f64::NAN, 0.5),
            Keyframe::new(0.0, 0.5).set_inherit(true),
        ]);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0], Keyframe::new(0.0, 0.5).set_inherit(true));
        assert_eq!(curve[1].get_time(), 1.0);
        assert!((curve[1].get_intensity() - 0.8).abs() < 1e-9, "Percentages are coerced");
    }
}
