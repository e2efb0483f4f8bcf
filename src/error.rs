use crate::args::DatasetTag;
use crate::tensorshape::TensorShape;
use std::fmt;
use std::path::PathBuf;

/// Everything that can go wrong while building or evaluating the ensemble.
/// All variants are configuration or programming errors; none are retried
/// internally.
#[derive(Debug)]
pub enum AceError {
    UnknownModel {
        name: String,
    },
    CheckpointLoad {
        path: PathBuf,
        reason: String,
    },
    DatasetMismatch {
        preset: &'static str,
        expected: &'static str,
        actual: DatasetTag,
    },
    UnknownPreset {
        key: String,
    },
    EmptyPool {
        pool: String,
    },
    ShapeMismatch {
        expected: TensorShape,
        actual: TensorShape,
    },
    UnrecognizedLayer {
        kind: &'static str,
    },
    InvalidConfiguration {
        reason: String,
    },
}

impl fmt::Display for AceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownModel { name } => {
                write!(f, "no model registered under the name `{}`", name)
            }
            Self::CheckpointLoad { path, reason } => {
                write!(f, "cannot load checkpoint `{}`: {}", path.display(), reason)
            }
            Self::DatasetMismatch {
                preset,
                expected,
                actual,
            } => write!(
                f,
                "preset `{}` expects a {} dataset, got {}",
                preset,
                expected,
                actual.name()
            ),
            Self::UnknownPreset { key } => write!(f, "no preset registered under `{}`", key),
            Self::EmptyPool { pool } => write!(f, "cannot draw from empty pool: {}", pool),
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {}, got {}", expected, actual)
            }
            Self::UnrecognizedLayer { kind } => {
                write!(f, "no initialization rule for layer kind `{}`", kind)
            }
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid pool configuration: {}", reason)
            }
        }
    }
}

impl std::error::Error for AceError {}
