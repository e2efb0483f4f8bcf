//! Typed parameter initialization.
//!
//! Conv2d      : Xavier-Normal
//! BatchNorm2d : Weight=1, Bias=0
//! Linear      : Xavier-Normal
//!
//! Every layer a model exposes must match a rule here; an unrecognized kind
//! fails with `UnrecognizedLayer` instead of being skipped.
use crate::error::AceError;
use crate::models::Model;
use crate::AceFloat;
use ndarray::{Array, Array1, Array2, Array4, Dimension};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::Rng;

/// Mutable view over one parameterized layer.
pub enum LayerParamsMut<'a> {
    Linear {
        weight: &'a mut Array2<AceFloat>,
        bias: &'a mut Array1<AceFloat>,
    },
    /// Kernel in `(C_out, C_in, K_h, K_w)` layout.
    Conv {
        weight: &'a mut Array4<AceFloat>,
        bias: &'a mut Array1<AceFloat>,
    },
    BatchNorm {
        weight: &'a mut Array1<AceFloat>,
        bias: &'a mut Array1<AceFloat>,
    },
    /// A layer kind no initialization rule exists for.
    Other(&'static str),
}

/// Applies the per-kind initialization rule to every layer of `model`.
///
/// # Panics
/// If a layer has zero fan (empty weight tensor).
pub fn init_params<R: Rng + ?Sized>(model: &mut dyn Model, rng: &mut R) -> Result<(), AceError> {
    for layer in model.layers_mut() {
        match layer {
            LayerParamsMut::Linear { weight, bias } => {
                let (fan_out, fan_in) = weight.dim();
                xavier_normal(weight, fan_in, fan_out, rng);
                bias.fill(0.);
            }
            LayerParamsMut::Conv { weight, bias } => {
                let (c_out, c_in, k_h, k_w) = weight.dim();
                xavier_normal(weight, c_in * k_h * k_w, c_out * k_h * k_w, rng);
                bias.fill(0.);
            }
            LayerParamsMut::BatchNorm { weight, bias } => {
                weight.fill(1.);
                bias.fill(0.);
            }
            LayerParamsMut::Other(kind) => {
                return Err(AceError::UnrecognizedLayer { kind });
            }
        }
    }
    Ok(())
}

fn xavier_normal<D: Dimension, R: Rng + ?Sized>(
    weight: &mut Array<AceFloat, D>,
    fan_in: usize,
    fan_out: usize,
    rng: &mut R,
) {
    let std = (2. / (fan_in + fan_out) as AceFloat).sqrt();
    *weight = Array::random_using(weight.raw_dim(), Normal::new(0., std).unwrap(), rng);
}
