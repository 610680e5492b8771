use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read image {path:?}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {path:?} is {width}x{height}, expected {expected}x{expected}")]
    ImageSize {
        path: PathBuf,
        width: u32,
        height: u32,
        expected: usize,
    },

    #[error("{channels} image channels are not supported, expected 1 (luma) or 3 (rgb)")]
    Channels { channels: usize },

    #[error("dataset {field} is {dataset} but the model expects {model}")]
    ShapeMismatch {
        field: &'static str,
        dataset: usize,
        model: usize,
    },

    #[error("the {split} split has no images")]
    EmptySplit { split: &'static str },

    #[error("dataset item {index} is out of range")]
    MissingItem { index: usize },

    #[error("batch size {batch_size} must be within 1..={len}")]
    BatchSize { batch_size: usize, len: usize },

    #[error("unknown optimizer {0:?}, expected one of: momentum, adagrad, adam")]
    UnknownOptimizer(String),

    #[error("failed to read tensor data: {0}")]
    TensorData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
