use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Running mean and population variance over every element seen so far.
///
/// Batches are merged with the parallel update from Chan et al., so the
/// statistics of a large tensor can be gathered one batch at a time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivationStats {
    count: u64,
    mean: f64,
    /// Sum of squared deviations from the mean.
    m2: f64,
}

impl ActivationStats {
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance (divides by the element count).
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Merges a batch summarized by its element count, mean and population variance.
    pub fn merge(&mut self, count: u64, mean: f64, variance: f64) {
        if count == 0 {
            return;
        }
        let n_a = self.count as f64;
        let n_b = count as f64;
        let n = n_a + n_b;
        let delta = mean - self.mean;

        self.mean += delta * n_b / n;
        self.m2 += variance * n_b + delta * delta * n_a * n_b / n;
        self.count += count;
    }

    /// Merges every element of `x`.
    pub fn update<B: Backend, const D: usize>(&mut self, x: Tensor<B, D>) {
        let count = x.shape().num_elements() as u64;
        if count == 0 {
            return;
        }
        let mean: f64 = x.clone().mean().into_scalar().elem();
        let variance: f64 = x.sub_scalar(mean).powf_scalar(2.0).mean().into_scalar().elem();
        self.merge(count, mean, variance);
    }
}
