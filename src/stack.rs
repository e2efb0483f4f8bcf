//! Per-call sampling of one defense configuration.
use crate::error::AceError;
use crate::shift::Shift;
use crate::AceFloat;
use itertools::izip;
use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

/// One stage of the autoencoder chain: which autoencoder, probed under
/// which spatial shift, blended with which weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stage {
    pub autoencoder: usize,
    pub shift: Shift,
    pub weight: AceFloat,
}

/// One realized draw. Ephemeral: constructed per forward call, discarded
/// after use. The depth is `stages.len()` by construction.
#[derive(Clone, Debug, PartialEq)]
pub struct DefenseConfiguration {
    pub classifier: usize,
    pub stages: Vec<Stage>,
}

impl DefenseConfiguration {
    pub fn depth(&self) -> usize {
        self.stages.len()
    }
}

/// Index-level view over the pools, enough to sample from without touching
/// the model handles themselves. `shift_sets` is indexed by autoencoder.
#[derive(Clone, Copy, Debug)]
pub struct SamplePools<'a> {
    pub num_classifiers: usize,
    pub num_autoencoders: usize,
    pub stack_depths: &'a [usize],
    pub blend_weights: &'a [AceFloat],
    pub shift_sets: &'a [Vec<Shift>],
}

/// Draws one [`DefenseConfiguration`]: a classifier, a stack depth `k`, then
/// `k` autoencoders, `k` blend weights, and one shift per chosen autoencoder
/// from that autoencoder's own shift set. Every draw is independent and
/// uniform, with replacement.
///
/// # Errors
/// `EmptyPool` if any pool a draw requires is empty. With `k == 0` the
/// autoencoder, weight, and shift pools are never consulted.
pub fn sample<R: Rng + ?Sized>(
    pools: &SamplePools,
    rng: &mut R,
) -> Result<DefenseConfiguration, AceError> {
    if pools.num_classifiers == 0 {
        return Err(AceError::EmptyPool {
            pool: "classifiers".to_owned(),
        });
    }
    let classifier = rng.gen_range(0..pools.num_classifiers);
    let depth = *pools
        .stack_depths
        .choose(rng)
        .ok_or_else(|| AceError::EmptyPool {
            pool: "stack depths".to_owned(),
        })?;
    if depth == 0 {
        trace!("sampled empty stack (classifier {})", classifier);
        return Ok(DefenseConfiguration {
            classifier,
            stages: vec![],
        });
    }
    if pools.num_autoencoders == 0 {
        return Err(AceError::EmptyPool {
            pool: "autoencoders".to_owned(),
        });
    }

    let autoencoders: Vec<usize> = (0..depth)
        .map(|_| rng.gen_range(0..pools.num_autoencoders))
        .collect();
    let weights: Vec<AceFloat> = (0..depth)
        .map(|_| {
            pools
                .blend_weights
                .choose(rng)
                .copied()
                .ok_or_else(|| AceError::EmptyPool {
                    pool: "blend weights".to_owned(),
                })
        })
        .collect::<Result<_, _>>()?;
    let stages: Vec<Stage> = izip!(autoencoders, weights)
        .map(|(autoencoder, weight)| {
            let shift = pools.shift_sets[autoencoder]
                .choose(rng)
                .copied()
                .ok_or_else(|| AceError::EmptyPool {
                    pool: format!("shift set for autoencoder {}", autoencoder),
                })?;
            Ok(Stage {
                autoencoder,
                shift,
                weight,
            })
        })
        .collect::<Result<_, _>>()?;

    trace!(
        "sampled configuration: classifier {}, depth {}",
        classifier,
        depth
    );
    Ok(DefenseConfiguration { classifier, stages })
}

#[cfg(test)]
mod test {
    use super::*;
    use more_asserts::assert_gt;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use std::collections::HashSet;

    fn shift_sets() -> Vec<Vec<Shift>> {
        vec![
            vec![Shift::new(0, 1), Shift::new(1, 0)],
            vec![Shift::new(-1, 0)],
            vec![Shift::new(0, -1), Shift::ZERO],
        ]
    }

    #[test]
    fn test_coverage_of_pools_under_seeded_rng() {
        let sets = shift_sets();
        let pools = SamplePools {
            num_classifiers: 3,
            num_autoencoders: 3,
            stack_depths: &[2, 5],
            blend_weights: &[0., 0.5, 1.],
            shift_sets: &sets,
        };
        let mut rng = Pcg64::seed_from_u64(42);
        let mut classifiers = HashSet::new();
        let mut autoencoders = HashSet::new();
        let mut total_stages = 0usize;
        for _ in 0..10_000 {
            let config = sample(&pools, &mut rng).unwrap();
            classifiers.insert(config.classifier);
            for stage in &config.stages {
                autoencoders.insert(stage.autoencoder);
                assert!(sets[stage.autoencoder].contains(&stage.shift));
            }
            total_stages += config.depth();
        }
        assert_eq!(classifiers.len(), 3);
        assert_eq!(autoencoders.len(), 3);
        assert_gt!(total_stages, 10_000);
    }

    #[test]
    fn test_depth_zero_samples_no_stages() {
        let pools = SamplePools {
            num_classifiers: 1,
            num_autoencoders: 0,
            stack_depths: &[0],
            blend_weights: &[],
            shift_sets: &[],
        };
        let mut rng = Pcg64::seed_from_u64(0);
        let config = sample(&pools, &mut rng).unwrap();
        assert_eq!(config.depth(), 0);
    }

    #[test]
    fn test_empty_pools_fail() {
        let mut rng = Pcg64::seed_from_u64(0);
        let no_classifiers = SamplePools {
            num_classifiers: 0,
            num_autoencoders: 1,
            stack_depths: &[1],
            blend_weights: &[1.],
            shift_sets: &[vec![Shift::ZERO]],
        };
        assert!(matches!(
            sample(&no_classifiers, &mut rng),
            Err(AceError::EmptyPool { .. })
        ));

        let no_depths = SamplePools {
            num_classifiers: 1,
            num_autoencoders: 1,
            stack_depths: &[],
            blend_weights: &[1.],
            shift_sets: &[vec![Shift::ZERO]],
        };
        assert!(matches!(
            sample(&no_depths, &mut rng),
            Err(AceError::EmptyPool { .. })
        ));

        let no_autoencoders = SamplePools {
            num_classifiers: 1,
            num_autoencoders: 0,
            stack_depths: &[2],
            blend_weights: &[1.],
            shift_sets: &[],
        };
        assert!(matches!(
            sample(&no_autoencoders, &mut rng),
            Err(AceError::EmptyPool { .. })
        ));
    }

    #[test]
    fn test_shifts_come_from_the_chosen_autoencoders_set() {
        let sets = shift_sets();
        let pools = SamplePools {
            num_classifiers: 1,
            num_autoencoders: 3,
            stack_depths: &[4],
            blend_weights: &[0.5],
            shift_sets: &sets,
        };
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..500 {
            let config = sample(&pools, &mut rng).unwrap();
            for stage in &config.stages {
                assert!(sets[stage.autoencoder].contains(&stage.shift));
            }
        }
    }
}
