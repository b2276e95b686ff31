//! Batching of sparse feature rows into Burn tensors.

use burn::prelude::*;
use feature_extractor::SparseVector;

/// A batch of training data.
#[derive(Debug, Clone)]
pub struct CommentBatch<B: Backend> {
    /// Feature tensor of shape `[batch_size, dim]`.
    pub features: Tensor<B, 2>,
    /// Label tensor of shape `[batch_size, 1]`, 1.0 for gambling.
    pub targets: Tensor<B, 2>,
}

/// Densifies sparse TF-IDF rows batch by batch. Rows stay sparse outside
/// the batch so a large corpus never materializes as one dense matrix.
#[derive(Debug, Clone)]
pub struct CommentBatcher<B: Backend> {
    device: B::Device,
    dim: usize,
}

impl<B: Backend> CommentBatcher<B> {
    #[must_use]
    pub const fn new(device: B::Device, dim: usize) -> Self {
        Self { device, dim }
    }

    /// Builds the dense feature tensor for a set of rows.
    pub fn features(&self, rows: &[&SparseVector]) -> Tensor<B, 2> {
        let batch_size = rows.len();
        let mut data = vec![0.0f32; batch_size * self.dim];

        for (row_index, row) in rows.iter().enumerate() {
            for &(column, weight) in row.iter() {
                data[row_index * self.dim + column] = weight;
            }
        }

        Tensor::<B, 1>::from_floats(data.as_slice(), &self.device)
            .reshape([batch_size, self.dim])
    }

    /// Builds a full batch with labels.
    pub fn batch(&self, rows: &[&SparseVector], labels: &[bool]) -> CommentBatch<B> {
        let targets_data: Vec<f32> = labels
            .iter()
            .map(|&label| if label { 1.0 } else { 0.0 })
            .collect();

        let targets = Tensor::<B, 1>::from_floats(targets_data.as_slice(), &self.device)
            .reshape([labels.len(), 1]);

        CommentBatch {
            features: self.features(rows),
            targets,
        }
    }
}
