use crate::animations::TIME_EPSILON;

/// Maps a total played time onto a looping curve of the given duration.
///
/// Returns the local time, within `[0, duration)`, and the number of wraps that occurred. A null
/// duration never wraps.
pub fn loop_position(played: f64, duration: f64) -> (f64, u64) {
    if duration <= TIME_EPSILON || played <= 0.0 || !played.is_finite() {
        return (played.max(0.0), 0);
    }
    let iteration = (played / duration).floor();
    let local = (played - iteration * duration).clamp(0.0, duration);
    match local >= duration - TIME_EPSILON {
        true => (0.0, iteration as u64 + 1),
        false => (local, iteration as u64),
    }
}

/// The boundary a runner moves to from `time`: the first keyframe time strictly after `time`, or
/// the one at `time` itself when its values were not issued yet.
pub fn next_boundary(times: &[f64], time: f64, time_applied: bool) -> Option<f64> {
    times.iter().copied().find(|candidate| match time_applied {
        true => *candidate > time + TIME_EPSILON,
        false => *candidate >= time - TIME_EPSILON,
    })
}

/// Duration of the step between two boundaries, at the given playback rate, never below
/// `min_step_ms`.
pub fn step_ms(time: f64, next: f64, rate: f64, min_step_ms: u64) -> u64 {
    let ms = ((next - time) / rate * 1000.0).round();
    (ms.max(0.0) as u64).max(min_step_ms)
}
