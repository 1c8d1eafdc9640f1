pub mod blob;

mod tests;

pub use blob::{Blob, MAX_LEGACY_AXES};
