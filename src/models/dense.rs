use crate::checkpoint::StateDict;
use crate::error::AceError;
use crate::models::{LayerParamsMut, Model, ModelRole};
use crate::tensorshape::TensorShape;
use crate::AceFloat;
use ndarray::{Array1, Array2, Array4, ArrayD, Axis, Ix1, Ix2};

/// Global-average-pool classifier: spatial mean over `H, W` followed by a
/// dense layer. Stands in for the heavyweight torchvision-style classifiers;
/// the ensemble only relies on the `image -> logits` contract.
#[derive(Clone, Debug)]
pub struct GapClassifier {
    weight: Array2<AceFloat>, // (num_classes, C)
    bias: Array1<AceFloat>,   // (num_classes)
}

impl GapClassifier {
    pub fn new(in_channels: usize, num_classes: usize) -> Self {
        Self {
            weight: Array2::zeros((num_classes, in_channels)),
            bias: Array1::zeros(num_classes),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.weight.nrows()
    }

    pub fn in_channels(&self) -> usize {
        self.weight.ncols()
    }
}

impl Model for GapClassifier {
    fn role(&self) -> ModelRole {
        ModelRole::Classifier
    }

    fn input_shape(&self) -> TensorShape {
        TensorShape::new(vec![None, Some(self.in_channels()), None, None])
    }

    /// # Panics
    /// If the spatial dimensions are empty.
    fn infer(&self, x: &Array4<AceFloat>) -> ArrayD<AceFloat> {
        let pooled = x.mean_axis(Axis(3)).unwrap().mean_axis(Axis(2)).unwrap();
        let logits = pooled.dot(&self.weight.t()) + &self.bias;
        logits.into_dyn()
    }

    fn layers_mut(&mut self) -> Vec<LayerParamsMut> {
        vec![LayerParamsMut::Linear {
            weight: &mut self.weight,
            bias: &mut self.bias,
        }]
    }

    fn state_shapes(&self) -> Vec<(String, Vec<usize>)> {
        vec![
            ("fc.weight".to_owned(), self.weight.shape().to_vec()),
            ("fc.bias".to_owned(), self.bias.shape().to_vec()),
        ]
    }

    fn load_state(&mut self, mut state: StateDict) -> Result<(), AceError> {
        let weight = state.take("fc.weight", self.weight.shape())?;
        let bias = state.take("fc.bias", self.bias.shape())?;
        state.finish()?;
        // shapes were checked exactly by take
        self.weight = weight.into_dimensionality::<Ix2>().unwrap();
        self.bias = bias.into_dimensionality::<Ix1>().unwrap();
        Ok(())
    }
}
