//! Minibatching over pool indices.
//!
//! Loaders never touch sample data; they only decide which dataset indices
//! go into which minibatch. The dataset turns an index batch into tensors,
//! which keeps every per-sample loss attributable to a pool index.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Splits index sequences into minibatches of at most `batch_size`.
#[derive(Debug, Clone, Copy)]
pub struct IndexLoader {
    batch_size: usize,
}

impl IndexLoader {
    /// Creates a loader. A zero batch size is treated as one.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Training order for one epoch: `indices` shuffled with `rng`, then
    /// chunked. The last batch may be short.
    pub fn epoch_batches(&self, indices: &[usize], rng: &mut StdRng) -> Vec<Vec<usize>> {
        let mut order = indices.to_vec();
        order.shuffle(rng);
        self.chunk(&order)
    }

    /// Evaluation order: `indices` chunked as given.
    #[must_use]
    pub fn sequential(&self, indices: &[usize]) -> Vec<Vec<usize>> {
        self.chunk(indices)
    }

    /// Number of batches `len` indices produce.
    #[must_use]
    pub fn num_batches(&self, len: usize) -> usize {
        len.div_ceil(self.batch_size)
    }

    fn chunk(&self, indices: &[usize]) -> Vec<Vec<usize>> {
        indices
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect()
    }
}
