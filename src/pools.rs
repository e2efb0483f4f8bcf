//! Immutable pool configuration. Presets return one of these by value;
//! nothing in the crate mutates shared configuration state.
use crate::error::AceError;
use crate::shift::Shift;
use crate::AceFloat;
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything `Ace::build` needs to assemble its pools: model names, the
/// allowed stack depths, the allowed blend weights, and each autoencoder's
/// shift set. Blend weights are `NotNan` so a NaN coefficient is rejected
/// when the configuration is made, not deep inside a forward pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolConfiguration {
    pub classifiers: Vec<String>,
    pub autoencoders: Vec<String>,
    pub stack_depths: Vec<usize>,
    pub blend_weights: Vec<NotNan<AceFloat>>,
    pub shift_sets: BTreeMap<String, Vec<Shift>>,
}

impl PoolConfiguration {
    /// # Errors
    /// `EmptyPool` if any pool is empty (including a missing or empty shift
    /// set), `InvalidConfiguration` if a blend weight falls outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), AceError> {
        if self.classifiers.is_empty() {
            return Err(AceError::EmptyPool {
                pool: "classifiers".to_owned(),
            });
        }
        if self.autoencoders.is_empty() {
            return Err(AceError::EmptyPool {
                pool: "autoencoders".to_owned(),
            });
        }
        if self.stack_depths.is_empty() {
            return Err(AceError::EmptyPool {
                pool: "stack depths".to_owned(),
            });
        }
        if self.blend_weights.is_empty() {
            return Err(AceError::EmptyPool {
                pool: "blend weights".to_owned(),
            });
        }
        for weight in &self.blend_weights {
            let w = weight.into_inner();
            if !(0. ..=1.).contains(&w) {
                return Err(AceError::InvalidConfiguration {
                    reason: format!("blend weight {} outside [0, 1]", w),
                });
            }
        }
        for name in &self.autoencoders {
            match self.shift_sets.get(name) {
                Some(set) if !set.is_empty() => {}
                _ => {
                    return Err(AceError::EmptyPool {
                        pool: format!("shift set for `{}`", name),
                    });
                }
            }
        }
        Ok(())
    }
}
