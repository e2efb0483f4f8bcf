use crate::checkpoint::StateDict;
use crate::error::AceError;
use crate::models::{LayerParamsMut, Model, ModelRole};
use crate::tensorshape::TensorShape;
use crate::AceFloat;
use ndarray::{s, Array1, Array4, ArrayD, Axis, Ix1, Ix4};

/// Shape-preserving 1x1 channel-mixing convolution. The smallest model that
/// honors the autoencoder contract (`image -> image` of identical shape)
/// while still carrying real convolutional parameters.
#[derive(Clone, Debug)]
pub struct PointwiseAutoencoder {
    weight: Array4<AceFloat>, // (C_out, C_in, 1, 1), torch convention
    bias: Array1<AceFloat>,   // (C_out)
}

impl PointwiseAutoencoder {
    pub fn new(channels: usize) -> Self {
        Self {
            weight: Array4::zeros((channels, channels, 1, 1)),
            bias: Array1::zeros(channels),
        }
    }

    pub fn channels(&self) -> usize {
        self.bias.len()
    }
}

impl Model for PointwiseAutoencoder {
    fn role(&self) -> ModelRole {
        ModelRole::Autoencoder
    }

    fn input_shape(&self) -> TensorShape {
        TensorShape::new(vec![None, Some(self.channels()), None, None])
    }

    /// # Panics
    /// If the batch's channel count does not match the kernel.
    fn infer(&self, x: &Array4<AceFloat>) -> ArrayD<AceFloat> {
        let (n, c, h, w) = x.dim();
        assert_eq!(c, self.channels());
        let kernel: ndarray::ArrayView2<AceFloat> = self.weight.slice(s![.., .., 0, 0]); // (C_out, C_in)

        let standard = x.as_standard_layout();
        let flat = standard.view().into_shape((n, c, h * w)).unwrap();
        let mut out = Array4::zeros((n, self.channels(), h, w));
        for b in 0..n {
            let mixed = kernel.dot(&flat.index_axis(Axis(0), b)); // (C_out, H*W)
            out.index_axis_mut(Axis(0), b)
                .assign(&mixed.into_shape((self.channels(), h, w)).unwrap());
        }
        out += &self
            .bias
            .view()
            .into_shape((1, self.channels(), 1, 1))
            .unwrap();
        out.into_dyn()
    }

    fn layers_mut(&mut self) -> Vec<LayerParamsMut> {
        vec![LayerParamsMut::Conv {
            weight: &mut self.weight,
            bias: &mut self.bias,
        }]
    }

    fn state_shapes(&self) -> Vec<(String, Vec<usize>)> {
        vec![
            ("mix.weight".to_owned(), self.weight.shape().to_vec()),
            ("mix.bias".to_owned(), self.bias.shape().to_vec()),
        ]
    }

    fn load_state(&mut self, mut state: StateDict) -> Result<(), AceError> {
        let weight = state.take("mix.weight", self.weight.shape())?;
        let bias = state.take("mix.bias", self.bias.shape())?;
        state.finish()?;
        self.weight = weight.into_dimensionality::<Ix4>().unwrap();
        self.bias = bias.into_dimensionality::<Ix1>().unwrap();
        Ok(())
    }
}
