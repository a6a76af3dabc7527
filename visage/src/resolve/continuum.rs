use std::collections::BTreeMap;

use crate::config::ContinuumPair;
use crate::resolve::{Apply, Target};

/// Collapses continuum pairs and converts the generic targets into apply commands.
///
/// For every pair with at least one side present, `continuum = clamp(pos - neg, -1, 1)` (a missing
/// side counts as 0) and exactly one command is produced:
/// - `Apply::Continuum` when the render target supports it and both ids are Action Units,
/// - otherwise a command to `neg` with `|continuum|` when negative, to `pos` with `continuum`
///   otherwise.
///
/// Remaining channels apply individually: numeric ids as Action Units, named ids as morphs.
pub fn resolve_continuum(
    mut targets: BTreeMap<String, Target>,
    pairs: &[ContinuumPair],
    supports_continuum: bool,
) -> Vec<Apply> {
    let mut applies = vec![];

    for pair in pairs {
        let neg = targets.remove(&pair.neg);
        let pos = targets.remove(&pair.pos);
        if neg.is_none() && pos.is_none() {
            continue;
        }

        let value_of = |target: &Option<Target>| target.as_ref().map_or(0.0, |t| t.value);
        let continuum = (value_of(&pos) - value_of(&neg)).clamp(-1.0, 1.0);
        let duration_ms = neg
            .iter()
            .chain(pos.iter())
            .map(|target| target.duration_ms)
            .max()
            .unwrap_or_default();

        let numeric = (pair.neg.parse::<u32>(), pair.pos.parse::<u32>());
        let apply = match (supports_continuum, numeric) {
            (true, (Ok(neg), Ok(pos))) => Apply::Continuum {
                neg,
                pos,
                value: continuum,
                duration_ms,
            },
            _ => {
                let (id, side) = match continuum < 0.0 {
                    true => (&pair.neg, neg.as_ref().or(pos.as_ref())),
                    false => (&pair.pos, pos.as_ref().or(neg.as_ref())),
                };
                Apply::single(id, continuum.abs(), side.and_then(|t| t.balance), duration_ms)
            }
        };
        applies.push(apply);
    }

    for (id, target) in targets {
        applies.push(Apply::single(
            &id,
            target.value,
            target.balance,
            target.duration_ms,
        ));
    }
    applies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;

    fn targets(values: &[(&str, f64)]) -> BTreeMap<String, Target> {
        values
            .iter()
            .map(|(id, value)| (id.to_string(), Target::new(*value, "test")))
            .collect()
    }

    fn pairs() -> Vec<ContinuumPair> {
        SchedulerConfig::default().get_continuum_pairs().to_vec()
    }

    #[test]
    fn test_continuum_exclusivity() {
        let applies = resolve_continuum(targets(&[("61", 0.2), ("62", 0.0)]), &pairs(), false);
        assert_eq!(
            applies,
            vec![Apply::Au {
                id: 61,
                value: 0.2,
                balance: None,
                duration_ms: 50
            }],
            "Exactly one call, to the negative side"
        );

        let applies = resolve_continuum(targets(&[("61", 0.1), ("62", 0.7)]), &pairs(), false);
        assert_eq!(applies.len(), 1);
        match &applies[0] {
            Apply::Au { id, value, .. } => {
                assert_eq!(*id, 62);
                assert!((value - 0.6).abs() < 1e-9);
            }
            other => panic!("Unexpected apply: {:?}", other),
        }
    }

    #[test]
    fn test_missing_side_counts_as_zero() {
        let applies = resolve_continuum(targets(&[("64", 0.4)]), &pairs(), false);
        assert_eq!(
            applies,
            vec![Apply::Au {
                id: 64,
                value: 0.4,
                balance: None,
                duration_ms: 50
            }]
        );

        let applies = resolve_continuum(targets(&[("52", 0.3)]), &pairs(), false);
        assert_eq!(
            applies,
            vec![Apply::Au {
                id: 52,
                value: 0.3,
                balance: None,
                duration_ms: 50
            }]
        );
    }

    #[test]
    fn test_continuum_capable_target() {
        let applies = resolve_continuum(targets(&[("61", 0.2), ("12", 0.5)]), &pairs(), true);
        assert_eq!(
            applies,
            vec![
                Apply::Continuum {
                    neg: 61,
                    pos: 62,
                    value: -0.2,
                    duration_ms: 50
                },
                Apply::Au {
                    id: 12,
                    value: 0.5,
                    balance: None,
                    duration_ms: 50
                },
            ]
        );
    }

    #[test]
    fn test_named_pairs_and_remaining_channels() {
        let pairs = vec![ContinuumPair::new("jawLeft", "jawRight", "jaw_slide")];
        let applies = resolve_continuum(
            targets(&[("jawLeft", 0.8), ("jawRight", 0.3), ("mouthSmile", 0.5)]),
            &pairs,
            true,
        );
        assert_eq!(applies.len(), 2);
        match &applies[0] {
            Apply::Morph { name, value, .. } => {
                assert_eq!(name, "jawLeft");
                assert!((value - 0.5).abs() < 1e-9);
            }
            other => panic!("Unexpected apply: {:?}", other),
        }
        assert_eq!(
            applies[1],
            Apply::Morph {
                name: "mouthSmile".into(),
                value: 0.5,
                duration_ms: 50
            }
        );
    }
}
