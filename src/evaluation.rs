use crate::data::{DatasetConfig, ImageBatch, ImageBatcher, ImageDataset};
use crate::error::{Error, Result};
use crate::model::{ConvNet, count_correct};
use crate::utils::stats::ActivationStats;
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Test-split results of a trained model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
    /// Statistics of the first convolution's activations on the test images.
    pub conv1: ActivationStats,
    /// Statistics of the second convolution's activations on the test images.
    pub conv2: ActivationStats,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Runs `model` over every item of `dataset`, `batch_size` items at a time.
///
/// Use an inference model (e.g. from `AutodiffModule::valid`) so dropout stays disabled.
pub fn evaluate<B: Backend>(
    model: &ConvNet<B>,
    dataset: &ImageDataset,
    dataset_config: &DatasetConfig,
    batch_size: usize,
    device: &B::Device,
) -> Result<Evaluation> {
    model.check_dataset(dataset_config)?;
    let len = dataset.len();
    if batch_size == 0 {
        return Err(Error::BatchSize { batch_size, len });
    }
    let batcher = ImageBatcher::new(dataset_config);

    let mut evaluation = Evaluation {
        correct: 0,
        total: 0,
        conv1: ActivationStats::default(),
        conv2: ActivationStats::default(),
    };
    for start in (0..len).step_by(batch_size) {
        let end = (start + batch_size).min(len);
        let items = (start..end)
            .map(|index| dataset.get(index).ok_or(Error::MissingItem { index }))
            .collect::<Result<Vec<_>>>()?;
        let batch: ImageBatch<B> = batcher.batch(items, device);

        let activations = model.forward_activations(batch.images);
        evaluation.correct += count_correct(activations.logits, batch.targets);
        evaluation.total += end - start;
        evaluation.conv1.update(activations.conv1);
        evaluation.conv2.update(activations.conv2);
    }

    tracing::debug!(
        correct = evaluation.correct,
        total = evaluation.total,
        "evaluation finished"
    );
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::write_dataset;
    use crate::model::ConvNetConfig;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn batching_does_not_change_results() {
        let dir = temp_dir::TempDir::new().unwrap();
        let device = Default::default();
        let dataset_config = DatasetConfig::new()
            .with_num_classes(3)
            .with_train_per_class(1)
            .with_test_per_class(3)
            .with_image_size(8);
        write_dataset(dir.path(), &dataset_config);
        let test = ImageDataset::test(dir.path(), &dataset_config).unwrap();

        let model = ConvNetConfig::new()
            .with_image_size(8)
            .with_num_classes(3)
            .with_conv1_channels(2)
            .with_conv2_channels(3)
            .with_hidden_size(4)
            .init::<B>(&device);

        let whole = evaluate(&model, &test, &dataset_config, 9, &device).unwrap();
        let split = evaluate(&model, &test, &dataset_config, 2, &device).unwrap();

        assert_eq!(9, whole.total);
        assert_eq!(whole.correct, split.correct);
        assert_eq!(whole.conv1.count(), split.conv1.count());
        assert_eq!(9 * 2 * 8 * 8, whole.conv1.count());
        assert_eq!(9 * 3 * 4 * 4, whole.conv2.count());
        assert!((whole.conv1.mean() - split.conv1.mean()).abs() < 1e-5);
        assert!((whole.conv2.variance() - split.conv2.variance()).abs() < 1e-5);
        assert!((0.0..=1.0).contains(&whole.accuracy()));
    }

    #[test]
    fn mismatched_dataset_fails() {
        let device = Default::default();
        let model = ConvNetConfig::new().init::<B>(&device);
        let dataset_config = DatasetConfig::new().with_image_size(8);
        let empty = ImageDataset::from_items(Vec::new());
        assert!(matches!(
            evaluate(&model, &empty, &dataset_config, 10, &device),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn zero_batch_size_fails() {
        let device = Default::default();
        let dataset_config = DatasetConfig::new();
        let model = ConvNetConfig::new().init::<B>(&device);
        let empty = ImageDataset::from_items(Vec::new());
        assert!(matches!(
            evaluate(&model, &empty, &dataset_config, 0, &device),
            Err(Error::BatchSize { .. })
        ));
    }
}
