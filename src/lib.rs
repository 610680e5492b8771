pub mod data;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod optim;
pub mod plot;
pub mod training;
pub mod utils;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::data::{DatasetConfig, ImageBatch, ImageBatcher, ImageDataset, ImageItem, Split};
    pub use crate::evaluation::{Evaluation, evaluate};
    pub use crate::model::{ConvNet, ConvNetConfig};
    pub use crate::optim::OptimizerConfig;
    pub use crate::training::{TrainingConfig, TrainingHistory, train_with_config};
}
