use anyhow::Context;
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use burn_convnet::data::ImageDataset;
use burn_convnet::evaluation::evaluate;
use burn_convnet::plot;
use burn_convnet::training::train_with_config;
use tracing_subscriber::EnvFilter;

pub mod backend;
pub mod cli;

use backend::{MainAutoBackend, MainDevice};
use cli::AppArgs;

/// Filters of the first convolution are laid out with this many per row.
const FILTER_GRID_COLUMNS: usize = 8;
/// Each kernel weight becomes a square of this many pixels.
const FILTER_GRID_SCALE: usize = 8;

pub fn launch<AutoB: AutodiffBackend + MainDevice>(app_args: &AppArgs) -> anyhow::Result<()> {
    app_args.create_artifact_dir()?;
    let config = app_args.training_config()?;
    config
        .check()
        .context("the dataset config does not fit the model config")?;

    let train_set = ImageDataset::train(&app_args.data_dir, &config.dataset)
        .context("failed to load the training images")?;
    let test_set = ImageDataset::test(&app_args.data_dir, &config.dataset)
        .context("failed to load the test images")?;

    // training
    let device = AutoB::main_device();
    AutoB::seed(config.seed);
    let model = config.model.init::<AutoB>(&device);
    let (model, history) = train_with_config(&config, model, &train_set, &device)?;

    app_args.save_model(&model)?;
    history.save(&app_args.artifact("history.json"))?;
    plot::save_curve(&history.accuracies, plot::CYAN, &app_args.artifact("accuracy.png"))?;
    plot::save_curve(&history.losses, plot::RED, &app_args.artifact("loss.png"))?;

    // test
    let model = model.valid();
    let evaluation = evaluate(
        &model,
        &test_set,
        &config.dataset,
        config.eval_batch_size,
        &device,
    )?;
    tracing::info!(
        correct = evaluation.correct,
        total = evaluation.total,
        "test accuracy {:.4}",
        evaluation.accuracy()
    );
    tracing::info!(
        "conv1 activations: mean {:.6}, variance {:.6}",
        evaluation.conv1.mean(),
        evaluation.conv1.variance()
    );
    tracing::info!(
        "conv2 activations: mean {:.6}, variance {:.6}",
        evaluation.conv2.mean(),
        evaluation.conv2.variance()
    );

    plot::save_filter_grid(
        model.conv1.weight.val(),
        FILTER_GRID_COLUMNS,
        FILTER_GRID_SCALE,
        &app_args.artifact("conv1_filters.png"),
    )?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app_args = AppArgs::parse()?;
    launch::<MainAutoBackend>(&app_args)
}
