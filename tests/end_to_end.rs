use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::record::CompactRecorder;
use burn_convnet::data::Split;
use burn_convnet::data::dataset::image_path;
use burn_convnet::plot;
use burn_convnet::prelude::*;
use image::{GrayImage, Luma};
use std::path::Path;

type B = NdArray<f32>;
type AutoB = Autodiff<B>;

fn write_images(root: &Path, config: &DatasetConfig) {
    for split in [Split::Train, Split::Test] {
        for class in 0..config.num_classes {
            for sample in 0..split.per_class(config) {
                let path = image_path(root, split, class, sample);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                let size = config.image_size as u32;
                // classes differ by brightness, with a little per-sample texture
                let image = GrayImage::from_fn(size, size, |x, y| {
                    let base = (class * 60) as u32;
                    Luma([(base + (x + y + sample as u32) % 8) as u8])
                });
                image.save(&path).unwrap();
            }
        }
    }
}

fn small_config() -> TrainingConfig {
    let dataset = DatasetConfig::new()
        .with_num_classes(3)
        .with_train_per_class(6)
        .with_test_per_class(2)
        .with_image_size(8);
    let model = ConvNetConfig::new()
        .with_image_size(8)
        .with_num_classes(3)
        .with_conv1_channels(4)
        .with_conv2_channels(4)
        .with_hidden_size(8);
    TrainingConfig::new(model, dataset, OptimizerConfig::adam())
        .with_num_iterations(5)
        .with_batch_size(4)
        .with_eval_batch_size(4)
        .with_log_interval(2)
}

#[test]
fn train_evaluate_and_render() {
    let data = temp_dir::TempDir::new().unwrap();
    let artifacts = temp_dir::TempDir::new().unwrap();
    let config = small_config();
    write_images(data.path(), &config.dataset);

    let train_set = ImageDataset::train(data.path(), &config.dataset).unwrap();
    let test_set = ImageDataset::test(data.path(), &config.dataset).unwrap();

    let device = Default::default();
    AutoB::seed(config.seed);
    let model = config.model.init::<AutoB>(&device);
    let (model, history) = train_with_config(&config, model, &train_set, &device).unwrap();

    assert_eq!(config.num_iterations, history.len());
    assert!(history.losses.iter().all(|l| l.is_finite()));
    assert!(history.accuracies.iter().all(|a| (0.0..=1.0).contains(a)));

    let history_path = artifacts.path().join("history.json");
    history.save(&history_path).unwrap();
    assert_eq!(history, TrainingHistory::load(&history_path).unwrap());

    let model = model.valid();
    let evaluation = evaluate(&model, &test_set, &config.dataset, 4, &device).unwrap();
    assert_eq!(6, evaluation.total);
    assert!(evaluation.correct <= evaluation.total);
    assert_eq!(6 * 4 * 8 * 8, evaluation.conv1.count());
    assert!(evaluation.conv1.mean() >= 0.0);
    assert!(evaluation.conv2.variance() >= 0.0);

    let filters = artifacts.path().join("conv1_filters.png");
    plot::save_filter_grid(model.conv1.weight.val(), 2, 4, &filters).unwrap();
    let image = image::open(&filters).unwrap();
    // two columns of 20px tiles, one gap
    assert_eq!((2 * 20 + 1, 2 * 20 + 1), (image.width(), image.height()));

    let curve = artifacts.path().join("loss.png");
    plot::save_curve(&history.losses, plot::RED, &curve).unwrap();
    assert!(curve.exists());
}

#[test]
fn model_survives_a_save_load_cycle() {
    let artifacts = temp_dir::TempDir::new().unwrap();
    let config = small_config();
    let device = Default::default();

    let model = config.model.init::<B>(&device);
    let path = artifacts.path().join("model");
    model
        .clone()
        .save_file(path.clone(), &CompactRecorder::new())
        .unwrap();

    let loaded = config
        .model
        .init::<B>(&device)
        .load_file(path, &CompactRecorder::new(), &device)
        .unwrap();

    let before = model.fc2.weight.val().into_data().to_vec::<f32>().unwrap();
    let after = loaded.fc2.weight.val().into_data().to_vec::<f32>().unwrap();
    assert_eq!(before.len(), after.len());
    // the compact recorder stores half precision
    for (b, a) in before.iter().zip(&after) {
        assert!((b - a).abs() < 1e-3);
    }
}
