//! Checkpoint files are JSON maps from parameter name to tensor. Keys may
//! carry the `module.` prefix a distributed-training wrapper leaves behind;
//! the prefix is stripped before matching against a single-device model's
//! own parameter names.
use crate::error::AceError;
use crate::AceFloat;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const DISTRIBUTED_PREFIX: &str = "module.";

#[derive(Debug, Serialize, Deserialize)]
struct RawTensor {
    shape: Vec<usize>,
    data: Vec<AceFloat>,
}

/// Parameter tensors keyed by name, already prefix-stripped. Models consume
/// it with [`StateDict::take`] and close it out with [`StateDict::finish`]
/// so that unknown leftover parameters fail loudly.
#[derive(Debug, Default)]
pub struct StateDict {
    params: BTreeMap<String, ArrayD<AceFloat>>,
    path: PathBuf,
}

impl StateDict {
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Removes the named parameter, checking its shape exactly.
    pub fn take(&mut self, name: &str, expected: &[usize]) -> Result<ArrayD<AceFloat>, AceError> {
        let tensor = self
            .params
            .remove(name)
            .ok_or_else(|| AceError::CheckpointLoad {
                path: self.path.clone(),
                reason: format!("missing parameter `{}`", name),
            })?;
        if tensor.shape() != expected {
            return Err(AceError::CheckpointLoad {
                path: self.path.clone(),
                reason: format!(
                    "parameter `{}` has shape {:?}, model expects {:?}",
                    name,
                    tensor.shape(),
                    expected
                ),
            });
        }
        Ok(tensor)
    }

    /// Fails if any parameter was left unconsumed.
    pub fn finish(self) -> Result<(), AceError> {
        match self.params.into_keys().next() {
            None => Ok(()),
            Some(name) => Err(AceError::CheckpointLoad {
                path: self.path,
                reason: format!("unexpected parameter `{}`", name),
            }),
        }
    }
}

/// Reads a checkpoint file, stripping the distributed-training prefix and
/// (when `half` is set) truncating every value through single precision.
pub fn load(path: &Path, half: bool) -> Result<StateDict, AceError> {
    let file = File::open(path).map_err(|e| AceError::CheckpointLoad {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;
    let raw: BTreeMap<String, RawTensor> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| AceError::CheckpointLoad {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;

    let mut params = BTreeMap::new();
    for (key, tensor) in raw {
        let name = key.strip_prefix(DISTRIBUTED_PREFIX).unwrap_or(&key);
        let data: Vec<AceFloat> = if half {
            tensor.data.iter().map(|&v| v as f32 as AceFloat).collect()
        } else {
            tensor.data
        };
        let array = ArrayD::from_shape_vec(IxDyn(&tensor.shape), data).map_err(|e| {
            AceError::CheckpointLoad {
                path: path.to_owned(),
                reason: format!("parameter `{}`: {}", name, e),
            }
        })?;
        if params.insert(name.to_owned(), array).is_some() {
            return Err(AceError::CheckpointLoad {
                path: path.to_owned(),
                reason: format!("duplicate parameter `{}` after prefix strip", name),
            });
        }
    }
    Ok(StateDict {
        params,
        path: path.to_owned(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_checkpoint(name: &str, body: &serde_json::Value) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ace-rs-{}-{}.json", std::process::id(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(body.to_string().as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_prefix_is_stripped() {
        let path = write_checkpoint(
            "prefix",
            &json!({
                "module.fc.weight": { "shape": [2, 2], "data": [1.0, 2.0, 3.0, 4.0] },
                "fc.bias": { "shape": [2], "data": [0.5, -0.5] },
            }),
        );
        let mut state = load(&path, false).unwrap();
        let weight = state.take("fc.weight", &[2, 2]).unwrap();
        assert_eq!(weight[[0, 1]], 2.0);
        state.take("fc.bias", &[2]).unwrap();
        state.finish().unwrap();
    }

    #[test]
    fn test_shape_mismatch_fails() {
        let path = write_checkpoint(
            "badshape",
            &json!({ "fc.bias": { "shape": [3], "data": [1.0, 2.0, 3.0] } }),
        );
        let mut state = load(&path, false).unwrap();
        let err = state.take("fc.bias", &[2]).unwrap_err();
        assert!(matches!(err, AceError::CheckpointLoad { .. }));
    }

    #[test]
    fn test_missing_and_leftover_parameters_fail() {
        let path = write_checkpoint(
            "leftover",
            &json!({ "fc.bias": { "shape": [1], "data": [1.0] } }),
        );
        let mut state = load(&path, false).unwrap();
        assert!(state.take("fc.weight", &[1, 1]).is_err());
        assert!(load(&path, false).unwrap().finish().is_err());
    }

    #[test]
    fn test_data_length_must_match_shape() {
        let path = write_checkpoint(
            "badlen",
            &json!({ "fc.bias": { "shape": [4], "data": [1.0, 2.0] } }),
        );
        assert!(load(&path, false).is_err());
    }

    #[test]
    fn test_half_truncates_through_f32() {
        let value: f64 = 0.1234567890123456789;
        let path = write_checkpoint(
            "half",
            &json!({ "fc.bias": { "shape": [1], "data": [value] } }),
        );
        let mut state = load(&path, true).unwrap();
        let bias = state.take("fc.bias", &[1]).unwrap();
        assert_eq!(bias[[0]], value as f32 as f64);
        assert_ne!(bias[[0]], value);
    }

    #[test]
    fn test_missing_file_fails() {
        let err = load(Path::new("/nonexistent/ckpt.json"), false).unwrap_err();
        assert!(matches!(err, AceError::CheckpointLoad { .. }));
    }
}
