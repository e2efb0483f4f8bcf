use ace_rs::{AceFloat, DatasetTag, ExperimentArgs, PoolConfiguration, Shift};
use ndarray::Array4;
use ordered_float::NotNan;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use std::collections::BTreeMap;

pub fn seeded_rng(seed: u64) -> Pcg64 {
    Pcg64::seed_from_u64(seed)
}

pub fn cifar_args() -> ExperimentArgs {
    ExperimentArgs::new(DatasetTag::Cifar10)
}

pub fn test_image(n: usize) -> Array4<AceFloat> {
    Array4::from_shape_fn((n, 3, 8, 8), |(b, c, h, w)| {
        (b + 1) as AceFloat * 0.2 + (c * 64 + h * 8 + w) as AceFloat / 256.
    })
}

/// classifiers=["resnet18"], autoencoders=["unet"], depths={1}, weights={1},
/// shifts={"unet": [(0, 0)]} -- every pool a singleton.
pub fn singleton_config() -> PoolConfiguration {
    PoolConfiguration {
        classifiers: vec!["resnet18".to_owned()],
        autoencoders: vec!["unet".to_owned()],
        stack_depths: vec![1],
        blend_weights: vec![NotNan::new(1.0).unwrap()],
        shift_sets: BTreeMap::from([("unet".to_owned(), vec![Shift::ZERO])]),
    }
}
