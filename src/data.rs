pub mod batcher;
pub mod dataset;
pub mod sampler;

pub use batcher::{ImageBatch, ImageBatcher};
pub use dataset::{DatasetConfig, ImageDataset, ImageItem, Split};
pub use sampler::MinibatchSampler;
