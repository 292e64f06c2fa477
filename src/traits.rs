use crate::errors::Result;
use crate::normalizer::NormalizedTensor;
use crate::variant::ModelVariant;

/// Runs a model variant on prepared input.
///
/// Implementations must acquire the model right before running it and
/// release it before returning, on the error path as well. The returned
/// vector holds one raw score per class of `variant`.
pub trait InferenceBackend: Send + Sync {
    /// Scores an encoded image tensor.
    fn infer(&self, variant: &ModelVariant, tensor: &NormalizedTensor) -> Result<Vec<f32>>;

    /// Scores a single value fed as a `[1, 1]` tensor.
    fn infer_scalar(&self, variant: &ModelVariant, value: f32) -> Result<Vec<f32>>;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for &B {
    fn infer(&self, variant: &ModelVariant, tensor: &NormalizedTensor) -> Result<Vec<f32>> {
        (**self).infer(variant, tensor)
    }

    fn infer_scalar(&self, variant: &ModelVariant, value: f32) -> Result<Vec<f32>> {
        (**self).infer_scalar(variant, value)
    }
}
