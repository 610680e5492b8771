use crate::error::{Error, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Draws the indices of one minibatch per training step.
///
/// Within a minibatch the indices are distinct; across steps they are drawn
/// independently, so an item can show up again in the very next step.
#[derive(Debug, Clone)]
pub struct MinibatchSampler {
    len: usize,
    batch_size: usize,
    rng: StdRng,
}

impl MinibatchSampler {
    pub fn new(len: usize, batch_size: usize, seed: u64) -> Result<Self> {
        if batch_size == 0 || batch_size > len {
            return Err(Error::BatchSize { batch_size, len });
        }
        Ok(Self {
            len,
            batch_size,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The first `batch_size` entries of a fresh random permutation of the dataset.
    pub fn next_indices(&mut self) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, self.len, self.batch_size).into_vec()
    }
}

impl Iterator for MinibatchSampler {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_indices())
    }
}
