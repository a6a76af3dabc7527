use std::collections::BTreeMap;

use crate::resolve::{Apply, Channel, Target};

/// Known viseme names, in render-target index order.
pub const VISEME_NAMES: [&str; 15] = [
    "sil", "PP", "FF", "TH", "DD", "kk", "CH", "SS", "nn", "RR", "aa", "E", "I", "O", "U",
];

/// Returns the viseme index a channel id stands for, if any: an integer below `viseme_count`, or
/// a known viseme name (case-insensitive).
pub fn viseme_index(id: &str, viseme_count: usize) -> Option<usize> {
    let index = match id.parse::<usize>() {
        Ok(index) => index,
        Err(_) => VISEME_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(id))?,
    };
    (index < viseme_count).then_some(index)
}

/// Splits resolved targets into viseme applies and the generic (Action Unit / morph) map.
///
/// Viseme channels never reach the generic map: a viseme `1` can not be mistaken for AU1.
pub fn route_visemes(targets: BTreeMap<Channel, Target>) -> (Vec<Apply>, BTreeMap<String, Target>) {
    let mut visemes = vec![];
    let mut generic = BTreeMap::new();
    for (channel, target) in targets {
        match channel {
            Channel::Viseme(index) => visemes.push(Apply::Viseme {
                index,
                value: target.value,
                jaw_scale: target.jaw_scale,
                duration_ms: target.duration_ms,
            }),
            Channel::Named(id) => {
                generic.insert(id, target);
            }
        }
    }
    (visemes, generic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viseme_index() {
        assert_eq!(viseme_index("0", 15), Some(0));
        assert_eq!(viseme_index("14", 15), Some(14));
        assert_eq!(viseme_index("15", 15), None);
        assert_eq!(viseme_index("aa", 15), Some(10));
        assert_eq!(viseme_index("AA", 15), Some(10));
        assert_eq!(viseme_index("pp", 15), Some(1));
        assert_eq!(viseme_index("U", 12), None, "Out of the configured range");
        assert_eq!(viseme_index("jawOpen", 15), None);
        assert_eq!(viseme_index("-1", 15), None);
    }

    #[test]
    fn test_route_visemes() {
        let mut targets = BTreeMap::new();
        targets.insert(
            Channel::Viseme(1),
            Target::new(0.6, "speech").set_jaw_scale(0.5),
        );
        targets.insert(Channel::Named("1".into()), Target::new(0.3, "brow"));

        let (visemes, generic) = route_visemes(targets);
        assert_eq!(
            visemes,
            vec![Apply::Viseme {
                index: 1,
                value: 0.6,
                jaw_scale: 0.5,
                duration_ms: 50
            }]
        );
        assert_eq!(generic.len(), 1);
        assert_eq!(generic["1"].value, 0.3);
    }
}
