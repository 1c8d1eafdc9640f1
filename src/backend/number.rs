// src/backend/number.rs

use ndarray::{LinalgScalar, ScalarOperand};
use std::cmp::{PartialEq, PartialOrd};
use std::default::Default;
use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, Neg, SubAssign};

/// Floating-point element type accepted by blobs and layers.
///
/// Bundles the arithmetic the kernels need with the `ndarray` bounds required
/// for `dot` and `scaled_add`. Implemented for `f32` and `f64`, the two
/// precisions trained models are stored in.
pub trait Real:
    // Arithmetic (Add/Sub/Mul/Div come with LinalgScalar)
    LinalgScalar + ScalarOperand +
    Neg<Output = Self> +
    AddAssign + SubAssign + MulAssign + DivAssign +
    Sum<Self> + for<'a> Sum<&'a Self> +
    // Comparisons
    PartialOrd + PartialEq +
    // Essential traits
    Debug + Display + Default +
    Send + Sync + 'static
{
    /// Lossy conversion from f64 (rounds to the nearest representable value)
    fn from_f64(value: f64) -> Self;

    /// Lossy conversion from an element count
    fn from_usize(value: usize) -> Self;

    /// Converts to f64 for log output
    fn to_f64(self) -> f64;

    /// Square root
    fn sqrt(self) -> Self;

    /// `max(0, self)`, the hinge used by the ranking loss
    fn positive_part(self) -> Self {
        let zero = Self::from_f64(0.0);
        if self > zero { self } else { zero }
    }
}

macro_rules! impl_real {
    ($t:ty) => {
        impl Real for $t {
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn from_usize(value: usize) -> Self {
                value as $t
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }
        }
    };
}

impl_real!(f32);
impl_real!(f64);

#[cfg(test)]
mod tests {
    use super::Real;

    #[test]
    fn test_positive_part_clamps_negatives() {
        assert_eq!((-0.5f64).positive_part(), 0.0);
        assert_eq!(0.0f64.positive_part(), 0.0);
        assert_eq!(0.25f32.positive_part(), 0.25);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(<f32 as Real>::from_f64(1e-6), 1e-6f32);
        assert_eq!(<f64 as Real>::from_usize(16), 16.0);
        assert_eq!(Real::to_f64(2.5f32), 2.5);
        assert_eq!(Real::sqrt(9.0f64), 3.0);
    }
}
