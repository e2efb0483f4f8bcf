pub mod dense;
pub mod init;
pub mod pointwise;

pub use dense::GapClassifier;
pub use init::{init_params, LayerParamsMut};
pub use pointwise::PointwiseAutoencoder;

use crate::checkpoint::StateDict;
use crate::error::AceError;
use crate::tensorshape::TensorShape;
use crate::AceFloat;
use dyn_clone::DynClone;
use ndarray::{Array4, ArrayD, Ix2};
use ndarray_stats::QuantileExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;

pub const IMAGE_CHANNELS: usize = 3;

/// Role a model plays in the ensemble, decided at registration time rather
/// than inferred from naming conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelRole {
    Classifier,
    Autoencoder,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Classifier => write!(f, "classifier"),
            Self::Autoencoder => write!(f, "autoencoder"),
        }
    }
}

/// A model handle. Classifiers map `[N, C, H, W]` to `[N, num_classes]`
/// logits; autoencoders map an image batch to one of identical shape.
pub trait Model: DynClone + Debug {
    fn role(&self) -> ModelRole;

    fn input_shape(&self) -> TensorShape;

    fn infer(&self, x: &Array4<AceFloat>) -> ArrayD<AceFloat>;

    /// Typed view over the model's parameter layers, in order. Consumed by
    /// the initialization visitor.
    fn layers_mut(&mut self) -> Vec<LayerParamsMut>;

    /// Parameter names and shapes, matching the checkpoint format.
    fn state_shapes(&self) -> Vec<(String, Vec<usize>)>;

    fn load_state(&mut self, state: StateDict) -> Result<(), AceError>;
}

dyn_clone::clone_trait_object!(Model);

/// Argmax class indices for a batch, one per row.
///
/// # Errors
/// `ShapeMismatch` if the model does not produce `[N, num_classes]` logits.
///
/// # Panics
/// If the model produces zero classes.
pub fn predict(model: &dyn Model, x: &Array4<AceFloat>) -> Result<Vec<usize>, AceError> {
    let out = model.infer(x);
    let actual = TensorShape::from(out.shape().to_vec());
    let logits = out
        .into_dimensionality::<Ix2>()
        .map_err(|_| AceError::ShapeMismatch {
            expected: TensorShape::new(vec![None, None]),
            actual,
        })?;
    Ok(logits
        .rows()
        .into_iter()
        .map(|row| row.argmax().unwrap())
        .collect())
}
