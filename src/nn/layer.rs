use crate::backend::Real;

/// Framework-facing description of a layer.
///
/// Layers in this crate run their kernels through concrete `forward` /
/// `backward` methods whose signatures already fix how many blobs they take;
/// this trait exposes that wiring (and the registered type name) to whatever
/// assembles layers into a network.
pub trait Layer<T>
where
    T: Real,
{
    /// Registered type name, as used in model definitions
    fn layer_type(&self) -> &'static str;

    /// Number of input blobs
    fn exact_num_bottom_blobs(&self) -> usize;

    /// Number of output blobs
    fn exact_num_top_blobs(&self) -> usize;

    /// Whether the output is a scalar objective
    fn is_loss(&self) -> bool {
        false
    }

    /// Whether gradients can flow into the bottom blob at `index`
    fn allow_force_backward(&self, _index: usize) -> bool {
        true
    }
}
