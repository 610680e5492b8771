use burn::prelude::*;
use burn::tensor::Distribution;

/// How many times out-of-range values are re-drawn before the remaining
/// ones are clamped onto the bounds.
const MAX_REDRAWS: usize = 16;

/// Samples a tensor from a normal distribution with mean zero and the given
/// standard deviation, re-drawing every value that lands further than two
/// standard deviations from the mean.
///
/// # Shapes
///   - Output `shape`
pub fn truncated_normal<B: Backend, const D: usize>(
    shape: [usize; D],
    std: f64,
    device: &B::Device,
) -> Tensor<B, D> {
    let bound = 2.0 * std;
    let mut tensor = Tensor::<B, D>::random(shape, Distribution::Normal(0.0, std), device);
    for _ in 0..MAX_REDRAWS {
        let outside = tensor.clone().abs().greater_elem(bound);
        let n_outside: i64 = outside.clone().int().sum().into_scalar().elem();
        if n_outside == 0 {
            break;
        }
        let redraw = Tensor::random(shape, Distribution::Normal(0.0, std), device);
        tensor = tensor.mask_where(outside, redraw);
    }

    tensor.clamp(-bound, bound)
}
