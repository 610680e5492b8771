use crate::backend::RecorderTy;
use anyhow::Context;
use burn::prelude::*;
use burn::record::FileRecorder;
use burn_convnet::model::ConvNet;
use burn_convnet::optim::OptimizerConfig;
use burn_convnet::training::TrainingConfig;
use std::path::{Path, PathBuf};

pub const HELP: &str = "\
burn-convnet

Trains a two-layer convolutional network on a folder of labeled grayscale
images, then evaluates it on the test split and renders the learned filters.

USAGE:
    burn-convnet [OPTIONS]

DATASET LAYOUT
    <DATA_DIR>/Train/<class>/Image<NNNNN>.png
    <DATA_DIR>/Test/<class>/Image<NNNNN>.png

BEHAVIOR OVERVIEW
- The training config is loaded from --training-config if given, otherwise the
  defaults are used. Command line overrides are applied on top and the result is
  saved to the artifacts directory.
- Every run trains a freshly initialized model. Files left in the artifacts
  directory by an earlier run are overwritten.
- The artifacts directory receives the config, the model, the training history,
  the accuracy and loss curves and the first layer's filters.

FLAGS:
    -h, --help                  Show this help message and exit

OPTIONS:
    -d, --data-dir <PATH>       Dataset root [default: ./CIFAR10]
    -a, --artifacts-path <PATH>
                                Directory where configurations, the model and the plots are saved.
                                If the directory does not exist, it will be created.
                                Defaults to a newly created temporary directory (path will be printed).
    -c, --training-config <PATH>
                                Load the training configuration from this file
    -o, --optimizer <NAME>      One of: momentum (alias: sgd), adagrad, adam
    -n, --iterations <N>        Number of minibatch updates
    -b, --batch-size <N>        Minibatch size
        --lr <F>                Learning rate (defaults to the optimizer's)
        --seed <N>              Seed for the weights, dropout and minibatch sampling
";

pub struct AppArgs {
    pub data_dir: PathBuf,
    pub artifacts_path: PathBuf,
    pub training_config: Option<PathBuf>,
    pub optimizer: Option<OptimizerConfig>,
    pub iterations: Option<usize>,
    pub batch_size: Option<usize>,
    pub lr: Option<f64>,
    pub seed: Option<u64>,
}

impl AppArgs {
    pub fn parse() -> anyhow::Result<Self> {
        let mut pargs = pico_args::Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            print!("{HELP}");
            std::process::exit(0);
        }

        let artifacts_path = match pargs.opt_value_from_os_str(["-a", "--artifacts-path"], parse_path)? {
            Some(path) => path,
            None => {
                // e.g. /tmp/burn-convnet-abcd-0
                let name = format!("{}-", std::env!("CARGO_PKG_NAME"));
                let tmp = temp_dir::TempDir::with_prefix(name)
                    .context("failed to create the temporary directory")?
                    .dont_delete_on_drop();
                let path = tmp.path().to_owned();
                println!("new artifacts directory: {path:?}");
                path
            }
        };

        let args = AppArgs {
            data_dir: pargs
                .opt_value_from_os_str(["-d", "--data-dir"], parse_path)?
                .unwrap_or_else(|| PathBuf::from("CIFAR10")),
            artifacts_path,
            training_config: pargs
                .opt_value_from_os_str(["-c", "--training-config"], parse_path)?,
            optimizer: pargs.opt_value_from_str(["-o", "--optimizer"])?,
            iterations: pargs.opt_value_from_str(["-n", "--iterations"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            lr: pargs.opt_value_from_str("--lr")?,
            seed: pargs.opt_value_from_str("--seed")?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            anyhow::bail!("unused arguments: {remaining:?}");
        }

        Ok(args)
    }

    pub fn create_artifact_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.artifacts_path)
            .with_context(|| format!("failed to create {:?}", self.artifacts_path))
    }

    pub fn artifact(&self, name: &str) -> PathBuf {
        self.artifacts_path.join(name)
    }

    /// Loads the training config and applies the command line overrides.
    pub fn training_config(&self) -> anyhow::Result<TrainingConfig> {
        let stored = self.artifact(TRAINING_CONFIG_NAME);
        let mut config = match &self.training_config {
            Some(path) => load_training_config(path)?,
            None => TrainingConfig::default(),
        };

        if let Some(optimizer) = &self.optimizer {
            config.optimizer = optimizer.clone();
        }
        if let Some(iterations) = self.iterations {
            config.num_iterations = iterations;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.lr.is_some() {
            config.lr = self.lr;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        tracing::info!(path = ?stored, "saving training config");
        config
            .save(&stored)
            .with_context(|| format!("failed to save the training config to {stored:?}"))?;
        Ok(config)
    }

    pub fn save_model<B: Backend>(&self, model: &ConvNet<B>) -> anyhow::Result<()> {
        save_model(&self.artifacts_path, model)
    }
}

fn parse_path(s: &std::ffi::OsStr) -> Result<PathBuf, &'static str> {
    Ok(s.into())
}

pub const TRAINING_CONFIG_NAME: &str = "training_config.json";
pub fn load_training_config(path: &Path) -> anyhow::Result<TrainingConfig> {
    tracing::info!(path = ?path, "loading training config");
    TrainingConfig::load(path)
        .map_err(|e| anyhow::anyhow!("{e:?}"))
        .with_context(|| format!("failed to load the training config from {path:?}"))
}

pub const MODEL_NAME: &str = "model";
pub fn model_path<B: Backend>(artifact_dir: &Path) -> PathBuf {
    let file_ext = <RecorderTy as FileRecorder<B>>::file_extension();
    artifact_dir.join(MODEL_NAME).with_extension(file_ext)
}

pub fn save_model<B: Backend>(artifact_dir: &Path, model: &ConvNet<B>) -> anyhow::Result<()> {
    let path = artifact_dir.join(MODEL_NAME);
    tracing::info!(path = ?model_path::<B>(artifact_dir), "saving model");
    model
        .clone()
        .save_file(path, &RecorderTy::new()) // ext added automatically
        .map_err(|e| anyhow::anyhow!("{e:?}"))
        .context("failed to save the model")
}
