pub mod number;
pub mod rng;

pub use number::Real;
pub use rng::{RandomSource, StdRandom, shuffle};
