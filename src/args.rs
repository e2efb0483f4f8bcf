use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dataset family a pool configuration is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetTag {
    ImageNet,
    Cifar10,
    Cifar100,
}

impl DatasetTag {
    pub const fn num_classes(self) -> usize {
        match self {
            Self::ImageNet => 1000,
            Self::Cifar10 => 10,
            Self::Cifar100 => 100,
        }
    }

    pub const fn is_cifar(self) -> bool {
        matches!(self, Self::Cifar10 | Self::Cifar100)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::ImageNet => "ImageNet",
            Self::Cifar10 => "CIFAR-10",
            Self::Cifar100 => "CIFAR-100",
        }
    }
}

/// Per-experiment directives consumed at construction time.
///
/// `half` is a precision directive: checkpoint values are truncated through
/// `f32` on load. `fine_tune` unfreezes the classifier pool; autoencoders
/// are always trainable.
#[derive(Clone, Debug)]
pub struct ExperimentArgs {
    pub dataset: DatasetTag,
    pub pretrained: bool,
    pub fine_tune: bool,
    pub half: bool,
    pub ckpt_dir: Option<PathBuf>,
}

impl ExperimentArgs {
    pub fn new(dataset: DatasetTag) -> Self {
        Self {
            dataset,
            pretrained: false,
            fine_tune: false,
            half: false,
            ckpt_dir: None,
        }
    }

    pub fn with_checkpoints(dataset: DatasetTag, ckpt_dir: PathBuf) -> Self {
        Self {
            dataset,
            pretrained: true,
            fine_tune: false,
            half: false,
            ckpt_dir: Some(ckpt_dir),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dataset_classes() {
        assert_eq!(DatasetTag::ImageNet.num_classes(), 1000);
        assert_eq!(DatasetTag::Cifar10.num_classes(), 10);
        assert_eq!(DatasetTag::Cifar100.num_classes(), 100);
        assert!(DatasetTag::Cifar100.is_cifar());
        assert!(!DatasetTag::ImageNet.is_cifar());
    }
}
