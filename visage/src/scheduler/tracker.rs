use std::collections::BTreeMap;

use crate::animations::{Snippet, TIME_EPSILON};
use crate::config::ContinuumPair;
use crate::resolve::{viseme_index, Apply, Channel};

/// Remembers the last value actually issued to each channel (0 until then).
///
/// Used to hand a channel over smoothly: a snippet starting on a channel starts from where the
/// channel is, not from where its author assumed it would be.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueTracker {
    values: BTreeMap<Channel, f64>,
    viseme_count: usize,
}

impl Default for ValueTracker {
    fn default() -> Self {
        Self::new(15)
    }
}

impl ValueTracker {
    pub fn new(viseme_count: usize) -> Self {
        Self {
            values: BTreeMap::new(),
            viseme_count,
        }
    }

    pub fn get(&self, channel: &Channel) -> f64 {
        self.values.get(channel).copied().unwrap_or_default()
    }

    /// Returns the value of a channel id as given by a client: Action Unit or morph first, then
    /// viseme.
    pub fn get_current_value(&self, id: &str) -> f64 {
        let named = Channel::Named(id.to_string());
        if let Some(value) = self.values.get(&named) {
            return *value;
        }
        viseme_index(id, self.viseme_count)
            .and_then(|index| self.values.get(&Channel::Viseme(index)))
            .copied()
            .unwrap_or_default()
    }

    /// Returns the value of a channel of the given snippet.
    pub fn value_of(&self, snippet: &Snippet, id: &str) -> f64 {
        self.get(&Channel::classify(
            id,
            snippet.get_category(),
            self.viseme_count,
        ))
    }

    pub fn record(&mut self, channel: Channel, value: f64) {
        self.values.insert(channel, value);
    }

    /// Records what render commands write. Both sides of a continuum pair drive one degree of
    /// freedom: a command writing one side only leaves the other one at 0.
    pub fn record_applies(&mut self, applies: &[Apply], pairs: &[ContinuumPair]) {
        for apply in applies {
            let issued = apply.issued_values();
            for (channel, _) in &issued {
                let partner = match channel {
                    Channel::Named(id) => pairs.iter().find_map(|pair| pair.partner_of(id)),
                    Channel::Viseme(_) => None,
                };
                if let Some(partner) = partner {
                    let partner = Channel::Named(partner.to_string());
                    if !issued.iter().any(|(channel, _)| *channel == partner) {
                        self.record(partner, 0.0);
                    }
                }
            }
            for (channel, value) in issued {
                self.record(channel, value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Continuity on load: the first keyframe of every channel, when at time 0 or flagged `inherit`,
/// takes the current value of the channel. Returns the number of rewritten keyframes.
pub fn reseed_on_load(snippet: &mut Snippet, tracker: &ValueTracker) -> usize {
    reseed(snippet, tracker, |time, inherit| {
        inherit || time.abs() <= TIME_EPSILON
    })
}

/// Continuity on loop: the `inherit` first keyframes take the current value of their channel.
/// Returns the number of rewritten keyframes.
pub fn reseed_on_loop(snippet: &mut Snippet, tracker: &ValueTracker) -> usize {
    reseed(snippet, tracker, |_, inherit| inherit)
}

fn reseed<F>(snippet: &mut Snippet, tracker: &ValueTracker, eligible: F) -> usize
where
    F: Fn(f64, bool) -> bool,
{
    let values: Vec<(String, f64)> = snippet
        .curves
        .keys()
        .map(|id| (id.clone(), tracker.value_of(snippet, id)))
        .collect();

    let mut rewritten = 0;
    for (id, value) in values {
        let first = snippet
            .curves
            .get_mut(&id)
            .and_then(|curve| curve.first_mut());
        if let Some(first) = first {
            if eligible(first.get_time(), first.is_inherit()) {
                first.set_intensity(value);
                rewritten += 1;
            }
        }
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animations::{Keyframe, SnippetCategory};

    fn snippet() -> Snippet {
        Snippet::new("blink")
            .with_curve("1", vec![Keyframe::new(0.0, 0.2), Keyframe::new(1.0, 0.8)])
            .with_curve(
                "2",
                vec![
                    Keyframe::new(0.5, 0.1).set_inherit(true),
                    Keyframe::new(1.0, 0.3),
                ],
            )
            .with_curve("4", vec![Keyframe::new(0.5, 0.4), Keyframe::new(1.0, 0.0)])
    }

    #[test]
    fn test_tracker_values() {
        let mut tracker = ValueTracker::default();
        assert_eq!(tracker.get_current_value("1"), 0.0, "Defaults to 0");

        tracker.record(Channel::Named("1".into()), 0.5);
        tracker.record(Channel::Viseme(10), 0.7);
        assert_eq!(tracker.get_current_value("1"), 0.5);
        assert_eq!(tracker.get_current_value("aa"), 0.7);
        assert_eq!(tracker.get_current_value("10"), 0.0, "AU10 is not viseme 10");
        assert_eq!(tracker.len(), 2);

        let speech = Snippet::new("speech").set_category(SnippetCategory::VisemeSnippet);
        assert_eq!(tracker.value_of(&speech, "10"), 0.7);
    }

    #[test]
    fn test_record_applies_settles_continuum_partners() {
        let pairs = vec![ContinuumPair::new("61", "62", "eye_yaw")];
        let mut tracker = ValueTracker::default();

        tracker.record_applies(&[Apply::single("62", 0.5, None, 50)], &pairs);
        assert_eq!(tracker.get_current_value("62"), 0.5);
        assert_eq!(tracker.get_current_value("61"), 0.0);

        tracker.record_applies(
            &[
                Apply::single("61", 0.3, None, 50),
                Apply::single("12", 0.4, None, 50),
            ],
            &pairs,
        );
        assert_eq!(tracker.get_current_value("61"), 0.3);
        assert_eq!(tracker.get_current_value("62"), 0.0);
        assert_eq!(tracker.get_current_value("12"), 0.4);

        tracker.record_applies(
            &[Apply::Continuum {
                neg: 61,
                pos: 62,
                value: 0.2,
                duration_ms: 50,
            }],
            &pairs,
        );
        assert_eq!(tracker.get_current_value("61"), 0.0);
        assert_eq!(tracker.get_current_value("62"), 0.2);
    }

    #[test]
    fn test_reseed_on_load() {
        let mut tracker = ValueTracker::default();
        tracker.record(Channel::Named("1".into()), 0.5);
        tracker.record(Channel::Named("4".into()), 0.9);

        let mut snippet = snippet();
        assert_eq!(reseed_on_load(&mut snippet, &tracker), 2);
        assert_eq!(snippet.get_curve("1").unwrap()[0].get_intensity(), 0.5);
        assert_eq!(
            snippet.get_curve("2").unwrap()[0].get_intensity(),
            0.0,
            "Inherit: untracked channel defaults to 0"
        );
        assert_eq!(
            snippet.get_curve("4").unwrap()[0].get_intensity(),
            0.4,
            "Neither at 0 nor inherit: untouched"
        );
        assert_eq!(snippet.get_curve("1").unwrap()[1].get_intensity(), 0.8);
    }

    #[test]
    fn test_reseed_on_loop() {
        let mut tracker = ValueTracker::default();
        tracker.record(Channel::Named("1".into()), 0.5);
        tracker.record(Channel::Named("2".into()), 0.6);

        let mut snippet = snippet();
        assert_eq!(reseed_on_loop(&mut snippet, &tracker), 1);
        assert_eq!(snippet.get_curve("1").unwrap()[0].get_intensity(), 0.2);
        assert_eq!(snippet.get_curve("2").unwrap()[0].get_intensity(), 0.6);
    }
}
