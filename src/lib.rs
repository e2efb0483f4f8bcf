#![allow(clippy::must_use_candidate)]
//! Stochastic autoencoder-chain ensemble defense.
//!
//! A pool of image-to-image autoencoders is stochastically stacked in front
//! of a pool of frozen classifiers: every forward pass samples a fresh
//! stack depth, autoencoder sequence, per-stage blend weight, and
//! per-stage spatial shift, so the effective function differs on every
//! evaluation and gradient-based adversarial attacks lose their signal.
extern crate ndarray;
extern crate rand;

pub mod ace;
pub mod args;
pub mod checkpoint;
mod error;
pub mod models;
pub mod pools;
pub mod presets;
pub mod registry;
pub mod shift;
pub mod stack;
pub mod tensorshape;
mod test_util;

pub use crate::ace::{Ace, AceOutput};
pub use crate::args::{DatasetTag, ExperimentArgs};
pub use crate::error::AceError;
pub use crate::pools::PoolConfiguration;
pub use crate::registry::ModelRegistry;
pub use crate::shift::Shift;
pub use crate::stack::{DefenseConfiguration, Stage};

/// Scalar type used throughout the crate.
pub type AceFloat = f64;
