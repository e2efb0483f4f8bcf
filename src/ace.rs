//! The ensemble composer: owns the classifier and autoencoder pools and
//! evaluates the randomized shift/reconstruct/blend chain in front of a
//! randomly chosen classifier.
use crate::args::ExperimentArgs;
use crate::error::AceError;
use crate::models::{Model, ModelRole};
use crate::pools::PoolConfiguration;
use crate::registry::ModelRegistry;
use crate::shift::Shift;
use crate::stack::{self, DefenseConfiguration, SamplePools};
use crate::tensorshape::TensorShape;
use crate::AceFloat;
use log::{debug, info, trace};
use ndarray::{Array2, Array4, Ix2, Ix4};
use rand::Rng;

/// Result of a forward evaluation: the post-chain image when only the
/// autoencoder stack is wanted, classifier logits otherwise.
#[derive(Clone, Debug)]
pub enum AceOutput {
    Image(Array4<AceFloat>),
    Logits(Array2<AceFloat>),
}

impl AceOutput {
    pub fn into_image(self) -> Option<Array4<AceFloat>> {
        match self {
            Self::Image(x) => Some(x),
            Self::Logits(_) => None,
        }
    }

    pub fn into_logits(self) -> Option<Array2<AceFloat>> {
        match self {
            Self::Logits(x) => Some(x),
            Self::Image(_) => None,
        }
    }
}

/// Ensemble of stochastically composed autoencoders in front of a pool of
/// frozen classifiers. Pools are assembled once at construction (all
/// checkpoint I/O happens there) and are immutable afterwards; every
/// forward call samples a fresh [`DefenseConfiguration`].
#[derive(Clone, Debug)]
pub struct Ace {
    classifiers: Vec<(String, Box<dyn Model>)>,
    autoencoders: Vec<(String, Box<dyn Model>)>,
    shift_sets: Vec<Vec<Shift>>,
    stack_depths: Vec<usize>,
    blend_weights: Vec<AceFloat>,
    fine_tune: bool,
}

impl Ace {
    /// Validates the configuration, checks every name's registered role, and
    /// instantiates all models. Fails fast: any configuration or checkpoint
    /// problem surfaces here, before a forward call is attempted.
    ///
    /// # Errors
    /// `EmptyPool`, `InvalidConfiguration`, `UnknownModel`,
    /// `CheckpointLoad`, `UnrecognizedLayer`.
    pub fn build<R: Rng + ?Sized>(
        config: &PoolConfiguration,
        registry: &ModelRegistry,
        args: &ExperimentArgs,
        rng: &mut R,
    ) -> Result<Self, AceError> {
        config.validate()?;

        let mut classifiers = Vec::with_capacity(config.classifiers.len());
        for name in &config.classifiers {
            check_role(registry, name, ModelRole::Classifier)?;
            classifiers.push((name.clone(), registry.instantiate(name, args, rng)?));
        }

        let mut autoencoders = Vec::with_capacity(config.autoencoders.len());
        let mut shift_sets = Vec::with_capacity(config.autoencoders.len());
        for name in &config.autoencoders {
            check_role(registry, name, ModelRole::Autoencoder)?;
            autoencoders.push((name.clone(), registry.instantiate(name, args, rng)?));
            // validate() guarantees a non-empty set per autoencoder
            shift_sets.push(config.shift_sets[name].clone());
        }

        info!(
            "built ACE: {} classifiers, {} autoencoders, depths {:?}, weights {:?}",
            classifiers.len(),
            autoencoders.len(),
            config.stack_depths,
            config.blend_weights,
        );
        Ok(Self {
            classifiers,
            autoencoders,
            shift_sets,
            stack_depths: config.stack_depths.clone(),
            blend_weights: config
                .blend_weights
                .iter()
                .map(|w| w.into_inner())
                .collect(),
            fine_tune: args.fine_tune,
        })
    }

    /// Samples one defense configuration and evaluates it. Each stage shifts
    /// the running image, reconstructs the shifted view, and blends the
    /// reconstruction back into that same shifted view; the blended result,
    /// not the unshifted input, feeds the next stage.
    ///
    /// # Errors
    /// `ShapeMismatch` if an autoencoder changes its input shape or the
    /// classifier does not produce `[N, num_classes]` logits, `EmptyPool`
    /// from sampling. A failed call leaves the pools untouched.
    pub fn forward_with<R: Rng + ?Sized>(
        &self,
        x: &Array4<AceFloat>,
        ae_only: bool,
        rng: &mut R,
    ) -> Result<AceOutput, AceError> {
        let config = stack::sample(&self.sample_pools(), rng)?;
        debug!(
            "forward: classifier `{}`, depth {}",
            self.classifiers[config.classifier].0,
            config.depth()
        );

        let current = self.run_chain(x, &config)?;
        if ae_only {
            return Ok(AceOutput::Image(current));
        }

        let (name, classifier) = &self.classifiers[config.classifier];
        check_input(classifier.as_ref(), &current)?;
        let out = classifier.infer(&current);
        let actual = TensorShape::from(out.shape().to_vec());
        let logits = out
            .into_dimensionality::<Ix2>()
            .map_err(|_| AceError::ShapeMismatch {
                expected: TensorShape::new(vec![None, None]),
                actual,
            })?;
        trace!("classifier `{}` produced {:?} logits", name, logits.dim());
        Ok(AceOutput::Logits(logits))
    }

    /// Classifier logits for one randomized evaluation.
    ///
    /// # Errors
    /// See [`Ace::forward_with`].
    pub fn forward<R: Rng + ?Sized>(
        &self,
        x: &Array4<AceFloat>,
        rng: &mut R,
    ) -> Result<Array2<AceFloat>, AceError> {
        match self.forward_with(x, false, rng)? {
            AceOutput::Logits(logits) => Ok(logits),
            AceOutput::Image(_) => unreachable!(),
        }
    }

    /// The post-chain image, skipping the classifier. Used for
    /// autoencoder-quality evaluation.
    ///
    /// # Errors
    /// See [`Ace::forward_with`].
    pub fn reconstruct<R: Rng + ?Sized>(
        &self,
        x: &Array4<AceFloat>,
        rng: &mut R,
    ) -> Result<Array4<AceFloat>, AceError> {
        match self.forward_with(x, true, rng)? {
            AceOutput::Image(image) => Ok(image),
            AceOutput::Logits(_) => unreachable!(),
        }
    }

    fn run_chain(
        &self,
        x: &Array4<AceFloat>,
        config: &DefenseConfiguration,
    ) -> Result<Array4<AceFloat>, AceError> {
        let mut current = x.clone();
        for stage in &config.stages {
            let shifted = stage.shift.apply(&current);
            let (name, autoencoder) = &self.autoencoders[stage.autoencoder];
            trace!(
                "stage: autoencoder `{}`, shift {}, weight {}",
                name,
                stage.shift,
                stage.weight
            );

            check_input(autoencoder.as_ref(), &shifted)?;
            let out = autoencoder.infer(&shifted);
            let actual = TensorShape::from(out.shape().to_vec());
            let reconstructed =
                out.into_dimensionality::<Ix4>()
                    .map_err(|_| AceError::ShapeMismatch {
                        expected: TensorShape::of_image(&shifted),
                        actual: actual.clone(),
                    })?;
            if reconstructed.dim() != shifted.dim() {
                return Err(AceError::ShapeMismatch {
                    expected: TensorShape::of_image(&shifted),
                    actual,
                });
            }

            // weight 0 bypasses the autoencoder, weight 1 fully trusts it
            current = if stage.weight == 0. {
                shifted
            } else if stage.weight == 1. {
                reconstructed
            } else {
                reconstructed * stage.weight + shifted * (1. - stage.weight)
            };
        }
        Ok(current)
    }

    fn sample_pools(&self) -> SamplePools {
        SamplePools {
            num_classifiers: self.classifiers.len(),
            num_autoencoders: self.autoencoders.len(),
            stack_depths: &self.stack_depths,
            blend_weights: &self.blend_weights,
            shift_sets: &self.shift_sets,
        }
    }

    pub fn num_classifiers(&self) -> usize {
        self.classifiers.len()
    }

    pub fn num_autoencoders(&self) -> usize {
        self.autoencoders.len()
    }

    pub fn classifier(&self, idx: usize) -> &dyn Model {
        self.classifiers[idx].1.as_ref()
    }

    pub fn autoencoder(&self, idx: usize) -> &dyn Model {
        self.autoencoders[idx].1.as_ref()
    }

    pub fn classifier_names(&self) -> Vec<&str> {
        self.classifiers.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn autoencoder_names(&self) -> Vec<&str> {
        self.autoencoders.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Classifiers are frozen unless the experiment fine-tunes them;
    /// autoencoders are always trainable.
    pub fn classifiers_frozen(&self) -> bool {
        !self.fine_tune
    }
}

fn check_input(model: &dyn Model, x: &Array4<AceFloat>) -> Result<(), AceError> {
    let actual = TensorShape::of_image(x);
    if !model.input_shape().is_compatible_with(&actual) {
        return Err(AceError::ShapeMismatch {
            expected: model.input_shape(),
            actual,
        });
    }
    Ok(())
}

fn check_role(registry: &ModelRegistry, name: &str, expected: ModelRole) -> Result<(), AceError> {
    let role = registry.role_of(name)?;
    if role != expected {
        return Err(AceError::InvalidConfiguration {
            reason: format!(
                "model `{}` is registered as a {}, not a {}",
                name, role, expected
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::args::{DatasetTag, ExperimentArgs};
    use crate::pools::PoolConfiguration;
    use ordered_float::NotNan;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use std::collections::BTreeMap;

    fn config(depths: Vec<usize>, weights: Vec<AceFloat>, shifts: Vec<Shift>) -> PoolConfiguration {
        PoolConfiguration {
            classifiers: vec!["resnet18".to_owned()],
            autoencoders: vec!["unet".to_owned()],
            stack_depths: depths,
            blend_weights: weights
                .into_iter()
                .map(|w| NotNan::new(w).unwrap())
                .collect(),
            shift_sets: BTreeMap::from([("unet".to_owned(), shifts)]),
        }
    }

    fn build(config: &PoolConfiguration) -> Ace {
        let registry = ModelRegistry::with_defaults();
        let args = ExperimentArgs::new(DatasetTag::Cifar10);
        let mut rng = Pcg64::seed_from_u64(99);
        Ace::build(config, &registry, &args, &mut rng).unwrap()
    }

    fn image() -> Array4<AceFloat> {
        Array4::from_shape_fn((2, 3, 6, 6), |(n, c, h, w)| {
            (n + 1) as AceFloat * 0.1 + (c + h + w) as AceFloat * 0.01
        })
    }

    #[test]
    fn test_depth_zero_returns_input() {
        let ace = build(&config(vec![0], vec![1.0], vec![Shift::ZERO]));
        let x = image();
        let mut rng = Pcg64::seed_from_u64(0);
        assert_eq!(ace.reconstruct(&x, &mut rng).unwrap(), x);
    }

    #[test]
    fn test_weight_zero_bypasses_autoencoder() {
        // zero shift and zero weight: every stage passes the image through
        let ace = build(&config(vec![3], vec![0.0], vec![Shift::ZERO]));
        let x = image();
        let mut rng = Pcg64::seed_from_u64(1);
        assert_eq!(ace.reconstruct(&x, &mut rng).unwrap(), x);
    }

    #[test]
    fn test_weight_one_fully_trusts_reconstruction() {
        let ace = build(&config(vec![1], vec![1.0], vec![Shift::ZERO]));
        let x = image();
        let expected = ace
            .autoencoder(0)
            .infer(&x)
            .into_dimensionality::<Ix4>()
            .unwrap();
        let mut rng = Pcg64::seed_from_u64(2);
        assert_eq!(ace.reconstruct(&x, &mut rng).unwrap(), expected);
    }

    #[test]
    fn test_forward_produces_logits() {
        let ace = build(&config(vec![1, 2], vec![0.0, 0.5, 1.0], vec![Shift::ZERO]));
        let x = image();
        let mut rng = Pcg64::seed_from_u64(3);
        let logits = ace.forward(&x, &mut rng).unwrap();
        assert_eq!(logits.dim(), (2, DatasetTag::Cifar10.num_classes()));
    }

    #[test]
    fn test_build_fails_on_empty_classifier_pool() {
        let mut config = config(vec![1], vec![1.0], vec![Shift::ZERO]);
        config.classifiers.clear();
        let registry = ModelRegistry::with_defaults();
        let args = ExperimentArgs::new(DatasetTag::Cifar10);
        let mut rng = Pcg64::seed_from_u64(0);
        let err = Ace::build(&config, &registry, &args, &mut rng).unwrap_err();
        assert!(matches!(err, AceError::EmptyPool { .. }));
    }

    #[test]
    fn test_build_rejects_role_mismatch() {
        let mut config = config(vec![1], vec![1.0], vec![Shift::ZERO]);
        config.classifiers = vec!["unet_v1".to_owned()];
        let registry = ModelRegistry::with_defaults();
        let args = ExperimentArgs::new(DatasetTag::Cifar10);
        let mut rng = Pcg64::seed_from_u64(0);
        let err = Ace::build(&config, &registry, &args, &mut rng).unwrap_err();
        assert!(matches!(err, AceError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_pools_survive_repeated_calls() {
        let ace = build(&config(vec![1, 3], vec![0.0, 1.0], vec![Shift::new(1, 0)]));
        let x = image();
        let mut rng = Pcg64::seed_from_u64(5);
        for _ in 0..50 {
            let logits = ace.forward(&x, &mut rng).unwrap();
            assert_eq!(logits.nrows(), 2);
        }
    }

    #[test]
    fn test_channel_mismatch_aborts_the_call() {
        let ace = build(&config(vec![1], vec![1.0], vec![Shift::ZERO]));
        let grayscale = Array4::zeros((1, 1, 6, 6));
        let mut rng = Pcg64::seed_from_u64(0);
        assert!(matches!(
            ace.reconstruct(&grayscale, &mut rng),
            Err(AceError::ShapeMismatch { .. })
        ));
        // a failed call leaves the pools usable
        assert_eq!(ace.forward(&image(), &mut rng).unwrap().nrows(), 2);
    }

    #[test]
    fn test_classifiers_frozen_by_default() {
        let ace = build(&config(vec![1], vec![1.0], vec![Shift::ZERO]));
        assert!(ace.classifiers_frozen());
    }
}
