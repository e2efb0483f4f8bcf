use crate::AceFloat;
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// A possibly partially-known tensor shape. `None` dims match anything,
/// which lets model input shapes leave the batch (and for fully
/// convolutional models, the spatial) dimensions unconstrained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorShape {
    dims: Vec<Option<usize>>,
}

impl TensorShape {
    pub fn new(dims: Vec<Option<usize>>) -> Self {
        Self { dims }
    }

    /// The `(N, C, H, W)` shape of an image batch with the batch dim left
    /// unconstrained.
    pub fn of_image(x: &Array4<AceFloat>) -> Self {
        let (_, c, h, w) = x.dim();
        Self::new(vec![None, Some(c), Some(h), Some(w)])
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_fully_defined(&self) -> bool {
        self.dims.iter().all(Option::is_some)
    }

    pub fn is_compatible_with(&self, other: &Self) -> bool {
        if self.dims.len() != other.dims.len() {
            return false;
        }
        self.dims
            .iter()
            .zip(other.dims.iter())
            .all(|(x, y)| match (x, y) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            })
    }
}

impl Index<usize> for TensorShape {
    type Output = Option<usize>;

    fn index(&self, idx: usize) -> &Option<usize> {
        &self.dims[idx]
    }
}

impl From<Vec<usize>> for TensorShape {
    fn from(v: Vec<usize>) -> Self {
        Self {
            dims: v.into_iter().map(Some).collect(),
        }
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dims: Vec<String> = self
            .dims
            .iter()
            .map(|d| d.map_or_else(|| "?".to_owned(), |x| x.to_string()))
            .collect();
        write!(f, "({})", dims.join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_compatibility_ignores_none_dims() {
        let partial = TensorShape::new(vec![None, Some(3), None, None]);
        let full = TensorShape::from(vec![2, 3, 32, 32]);
        assert!(partial.is_compatible_with(&full));
        assert!(full.is_compatible_with(&partial));
        assert!(!partial.is_fully_defined());
        assert!(full.is_fully_defined());
    }

    #[test]
    fn test_compatibility_rejects_rank_and_dim_mismatch() {
        let a = TensorShape::from(vec![2, 3, 32, 32]);
        let b = TensorShape::from(vec![2, 3, 32]);
        let c = TensorShape::from(vec![2, 1, 32, 32]);
        assert!(!a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
    }

    #[test]
    fn test_of_image_leaves_batch_unconstrained() {
        let x = Array4::<AceFloat>::zeros((7, 3, 8, 8));
        let shape = TensorShape::of_image(&x);
        assert_eq!(shape[0], None);
        assert_eq!(shape[1], Some(3));
        assert_eq!(format!("{}", shape), "(?, 3, 8, 8)");
    }
}
