//! Explicit name-to-constructor registry, populated at startup and queried
//! by exact-match lookup. Replaces dynamic attribute lookup on a module.
use crate::args::ExperimentArgs;
use crate::checkpoint;
use crate::error::AceError;
use crate::models::{
    init_params, GapClassifier, Model, ModelRole, PointwiseAutoencoder, IMAGE_CHANNELS,
};
use log::info;
use rand::Rng;
use std::collections::HashMap;
use std::path::PathBuf;

pub type Constructor = fn(&ExperimentArgs) -> Result<Box<dyn Model>, AceError>;

#[derive(Clone, Default)]
pub struct ModelRegistry {
    entries: HashMap<String, (ModelRole, Constructor)>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock pools: classifiers under the usual torchvision names, the
    /// three unet-family autoencoders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in [
            "densenet121",
            "resnet50",
            "resnet101",
            "vgg19",
            "vgg19_bn",
            "alexnet",
            "resnet18",
        ] {
            registry.register(name, ModelRole::Classifier, gap_classifier);
        }
        for name in ["unet", "unet_v1", "unet_v2"] {
            registry.register(name, ModelRole::Autoencoder, pointwise_autoencoder);
        }
        registry
    }

    pub fn register(&mut self, name: &str, role: ModelRole, constructor: Constructor) {
        self.entries.insert(name.to_owned(), (role, constructor));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// # Errors
    /// `UnknownModel` if no entry exists under `name`.
    pub fn role_of(&self, name: &str) -> Result<ModelRole, AceError> {
        self.entries
            .get(name)
            .map(|(role, _)| *role)
            .ok_or_else(|| AceError::UnknownModel {
                name: name.to_owned(),
            })
    }

    /// Constructs the named model, then either loads `<ckpt_dir>/<name>.json`
    /// (when `args.pretrained`) or runs the typed initialization visitor.
    ///
    /// # Errors
    /// `UnknownModel` on lookup miss, `CheckpointLoad` on any checkpoint
    /// problem, `UnrecognizedLayer` from initialization.
    pub fn instantiate<R: Rng + ?Sized>(
        &self,
        name: &str,
        args: &ExperimentArgs,
        rng: &mut R,
    ) -> Result<Box<dyn Model>, AceError> {
        let (_, constructor) = self.entries.get(name).ok_or_else(|| AceError::UnknownModel {
            name: name.to_owned(),
        })?;
        let mut model = constructor(args)?;
        if args.pretrained {
            let dir = args
                .ckpt_dir
                .as_ref()
                .ok_or_else(|| AceError::CheckpointLoad {
                    path: PathBuf::from(name),
                    reason: "pretrained requested but no checkpoint directory configured"
                        .to_owned(),
                })?;
            let path = dir.join(format!("{}.json", name));
            let state = checkpoint::load(&path, args.half)?;
            model.load_state(state)?;
            info!("loaded `{}` from {}", name, path.display());
        } else {
            init_params(model.as_mut(), rng)?;
        }
        Ok(model)
    }
}

fn gap_classifier(args: &ExperimentArgs) -> Result<Box<dyn Model>, AceError> {
    Ok(Box::new(GapClassifier::new(
        IMAGE_CHANNELS,
        args.dataset.num_classes(),
    )))
}

fn pointwise_autoencoder(_args: &ExperimentArgs) -> Result<Box<dyn Model>, AceError> {
    Ok(Box::new(PointwiseAutoencoder::new(IMAGE_CHANNELS)))
}
