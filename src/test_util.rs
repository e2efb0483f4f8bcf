#![cfg(test)]
use crate::shift::Shift;
use crate::AceFloat;
use ndarray::Array4;
use proptest::arbitrary::functor::ArbitraryF1;
use proptest::prelude::*;
use proptest::sample::SizeRange;

prop_compose! {
    pub fn image(n: usize, c: usize, h: usize, w: usize)
        (v in Vec::lift1_with(0. ..1., SizeRange::new(n * c * h * w..=n * c * h * w)))
        -> Array4<AceFloat>
    {
        Array4::from_shape_vec((n, c, h, w), v).unwrap()
    }
}

prop_compose! {
    pub fn shift_within(bound: isize)(dx in -bound..=bound, dy in -bound..=bound) -> Shift {
        Shift::new(dx, dy)
    }
}
