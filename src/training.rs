use crate::data::{DatasetConfig, ImageBatch, ImageBatcher, ImageDataset, MinibatchSampler};
use crate::error::{Error, Result};
use crate::model::{ConvNet, ConvNetConfig};
use crate::optim::{OptimConfigExt, OptimizerConfig};
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Config)]
pub struct TrainingConfig {
    pub model: ConvNetConfig,
    pub dataset: DatasetConfig,
    pub optimizer: OptimizerConfig,

    /// Number of minibatch updates.
    #[config(default = 3500)]
    pub num_iterations: usize,

    #[config(default = 50)]
    pub batch_size: usize,

    /// Batch size used when evaluating on the test split.
    #[config(default = 100)]
    pub eval_batch_size: usize,

    /// Log the loss and accuracy every this many iterations.
    #[config(default = 100)]
    pub log_interval: usize,

    /// Learning rate.
    ///
    /// By default, set to [`OptimizerConfig::default_lr`].
    #[config(default = "None")]
    pub lr: Option<f64>,

    #[config(default = 0)]
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(
            ConvNetConfig::new(),
            DatasetConfig::new(),
            OptimizerConfig::default(),
        )
    }
}

impl TrainingConfig {
    pub fn lr(&self) -> f64 {
        self.lr.unwrap_or_else(|| self.optimizer.default_lr())
    }

    /// Errors if the dataset shapes don't match the model's input and output layers.
    pub fn check(&self) -> Result<()> {
        self.model.check_dataset(&self.dataset)
    }
}

/// Per-iteration loss and accuracy of the training minibatches.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    pub losses: Vec<f32>,
    pub accuracies: Vec<f32>,
}

impl TrainingHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            losses: Vec::with_capacity(capacity),
            accuracies: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, loss: f32, accuracy: f32) {
        self.losses.push(loss);
        self.accuracies.push(accuracy);
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Trains with the optimizer selected by `config.optimizer`.
pub fn train_with_config<AutoB: AutodiffBackend>(
    config: &TrainingConfig,
    model: ConvNet<AutoB>,
    dataset: &ImageDataset,
    device: &AutoB::Device,
) -> Result<(ConvNet<AutoB>, TrainingHistory)> {
    config.check()?;
    model.check_dataset(&config.dataset)?;
    tracing::info!(
        optimizer = config.optimizer.name(),
        lr = config.lr(),
        iterations = config.num_iterations,
        batch_size = config.batch_size,
        "starting training"
    );
    match &config.optimizer {
        OptimizerConfig::Momentum(optim) => {
            let optim = OptimConfigExt::<AutoB, ConvNet<AutoB>>::init(optim);
            train(config, model, optim, dataset, device)
        }
        OptimizerConfig::AdaGrad(optim) => {
            let optim = OptimConfigExt::<AutoB, ConvNet<AutoB>>::init(optim);
            train(config, model, optim, dataset, device)
        }
        OptimizerConfig::Adam(optim) => {
            let optim = OptimConfigExt::<AutoB, ConvNet<AutoB>>::init(optim);
            train(config, model, optim, dataset, device)
        }
    }
}

/// Runs `config.num_iterations` minibatch updates.
///
/// The loss and accuracy of each minibatch are recorded before its update
/// is applied, with dropout active.
pub fn train<AutoB, O>(
    config: &TrainingConfig,
    mut model: ConvNet<AutoB>,
    mut optim: O,
    dataset: &ImageDataset,
    device: &AutoB::Device,
) -> Result<(ConvNet<AutoB>, TrainingHistory)>
where
    AutoB: AutodiffBackend,
    O: Optimizer<ConvNet<AutoB>, AutoB>,
{
    let lr = config.lr();
    let log_interval = config.log_interval.max(1);
    let batcher = ImageBatcher::new(&config.dataset);
    let mut sampler = MinibatchSampler::new(dataset.len(), config.batch_size, config.seed)?;
    let mut history = TrainingHistory::with_capacity(config.num_iterations);

    for step in 0..config.num_iterations {
        let items = sampler
            .next_indices()
            .into_iter()
            .map(|index| dataset.get(index).ok_or(Error::MissingItem { index }))
            .collect::<Result<Vec<_>>>()?;
        let batch: ImageBatch<AutoB> = batcher.batch(items, device);

        let output = model.forward_classification(batch.images, batch.targets);
        let loss: f32 = output.loss.clone().into_scalar().elem();
        let accuracy = output.accuracy();
        history.push(loss, accuracy);

        if step % log_interval == 0 {
            tracing::info!(step, loss, training_accuracy = accuracy, "training");
        }
        if !loss.is_finite() {
            tracing::warn!(step, loss, "non-finite training loss");
        }

        let grads = output.loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(lr, model, grads);
    }

    tracing::info!(iterations = history.len(), "training finished");
    Ok((model, history))
}
