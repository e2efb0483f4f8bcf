//! Named pool-configuration presets, one per experiment variant. Presets
//! are pure: each returns a fresh [`PoolConfiguration`] value and touches
//! no shared state. `*_random` variants keep the full shift sets; the
//! others pin every shift to zero for the no-spatial-randomization
//! ablation.
use crate::args::ExperimentArgs;
use crate::error::AceError;
use crate::pools::PoolConfiguration;
use crate::shift::Shift;
use crate::AceFloat;
use ordered_float::NotNan;
use std::collections::BTreeMap;

pub type PresetFn = fn(&ExperimentArgs) -> Result<PoolConfiguration, AceError>;

const IMAGENET_CLASSIFIERS: &[&str] = &["densenet121", "resnet50", "vgg19", "vgg19_bn", "alexnet"];
const AUTOENCODERS: &[&str] = &["unet", "unet_v1", "unet_v2"];
const STACK_DEPTHS: &[usize] = &[5];

/// Looks up a preset by key.
///
/// # Errors
/// `UnknownPreset` on miss.
pub fn preset(key: &str) -> Result<PresetFn, AceError> {
    Ok(match key {
        "ace" => ace,
        "ace_resnet50" => ace_resnet50,
        "ace_resnet101" => ace_resnet101,
        "ace_densenet121" => ace_densenet121,
        "ace_vgg19" => ace_vgg19,
        "ace_vgg19_bn" => ace_vgg19_bn,
        "ace_resnet101_random" => ace_resnet101_random,
        "ace_densenet121_random" => ace_densenet121_random,
        "ace_vgg19_random" => ace_vgg19_random,
        "ace_cifar" => ace_cifar,
        "ace_cifar_random" => ace_cifar_random,
        _ => {
            return Err(AceError::UnknownPreset {
                key: key.to_owned(),
            })
        }
    })
}

/// The full ImageNet defense: five classifiers, all three autoencoders,
/// random shifts, blend weights {0, 0.5, 1}.
pub fn ace(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace", args)?;
    Ok(PoolConfiguration {
        classifiers: names(IMAGENET_CLASSIFIERS),
        autoencoders: names(AUTOENCODERS),
        stack_depths: STACK_DEPTHS.to_vec(),
        blend_weights: weights(&[0., 0.5, 1.]),
        shift_sets: random_shift_sets(),
    })
}

pub fn ace_resnet50(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace_resnet50", args)?;
    Ok(single_classifier("resnet50", zero_shift_sets()))
}

pub fn ace_resnet101(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace_resnet101", args)?;
    Ok(single_classifier("resnet101", zero_shift_sets()))
}

pub fn ace_densenet121(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace_densenet121", args)?;
    Ok(single_classifier("densenet121", zero_shift_sets()))
}

pub fn ace_vgg19(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace_vgg19", args)?;
    Ok(single_classifier("vgg19", zero_shift_sets()))
}

pub fn ace_vgg19_bn(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace_vgg19_bn", args)?;
    Ok(single_classifier("vgg19_bn", zero_shift_sets()))
}

pub fn ace_resnet101_random(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace_resnet101_random", args)?;
    Ok(single_classifier("resnet101", random_shift_sets()))
}

pub fn ace_densenet121_random(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace_densenet121_random", args)?;
    Ok(single_classifier("densenet121", random_shift_sets()))
}

pub fn ace_vgg19_random(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_imagenet("ace_vgg19_random", args)?;
    Ok(single_classifier("vgg19", random_shift_sets()))
}

pub fn ace_cifar(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_cifar("ace_cifar", args)?;
    Ok(single_classifier("resnet18", zero_shift_sets()))
}

pub fn ace_cifar_random(args: &ExperimentArgs) -> Result<PoolConfiguration, AceError> {
    require_cifar("ace_cifar_random", args)?;
    Ok(single_classifier("resnet18", random_shift_sets()))
}

fn single_classifier(
    classifier: &str,
    shift_sets: BTreeMap<String, Vec<Shift>>,
) -> PoolConfiguration {
    PoolConfiguration {
        classifiers: vec![classifier.to_owned()],
        autoencoders: names(AUTOENCODERS),
        stack_depths: STACK_DEPTHS.to_vec(),
        blend_weights: weights(&[1.]),
        shift_sets,
    }
}

fn random_shift_sets() -> BTreeMap<String, Vec<Shift>> {
    BTreeMap::from([
        (
            "unet".to_owned(),
            vec![
                Shift::new(0, 1),
                Shift::new(1, 0),
                Shift::new(0, -1),
                Shift::new(-1, 0),
                Shift::new(1, 1),
                Shift::new(-1, -1),
                Shift::new(1, -1),
                Shift::new(-1, 1),
            ],
        ),
        (
            "unet_v1".to_owned(),
            vec![Shift::new(1, 0), Shift::new(-1, 0)],
        ),
        (
            "unet_v2".to_owned(),
            vec![Shift::new(0, 1), Shift::new(0, -1)],
        ),
    ])
}

fn zero_shift_sets() -> BTreeMap<String, Vec<Shift>> {
    AUTOENCODERS
        .iter()
        .map(|name| ((*name).to_owned(), vec![Shift::ZERO]))
        .collect()
}

fn names(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| (*x).to_owned()).collect()
}

/// # Panics
/// If a literal weight is NaN.
fn weights(ws: &[AceFloat]) -> Vec<NotNan<AceFloat>> {
    ws.iter().map(|&w| NotNan::new(w).unwrap()).collect()
}

fn require_imagenet(preset: &'static str, args: &ExperimentArgs) -> Result<(), AceError> {
    if args.dataset.is_cifar() {
        return Err(AceError::DatasetMismatch {
            preset,
            expected: "ImageNet",
            actual: args.dataset,
        });
    }
    Ok(())
}

fn require_cifar(preset: &'static str, args: &ExperimentArgs) -> Result<(), AceError> {
    if !args.dataset.is_cifar() {
        return Err(AceError::DatasetMismatch {
            preset,
            expected: "CIFAR",
            actual: args.dataset,
        });
    }
    Ok(())
}
