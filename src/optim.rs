use crate::error::Error;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{AdaGrad, AdaGradConfig, Adam, AdamConfig, Optimizer, Sgd, SgdConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use std::str::FromStr;

/// Builds the burn optimizer described by a config.
pub trait OptimConfigExt<AutoB, AutoM>
where
    Self: Config,
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Adaptor: Optimizer<AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor;
}

impl<AutoB, AutoM> OptimConfigExt<AutoB, AutoM> for SgdConfig
where
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Adaptor = OptimizerAdaptor<Sgd<AutoB::InnerBackend>, AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor {
        SgdConfig::init::<AutoB, AutoM>(self)
    }
}

impl<AutoB, AutoM> OptimConfigExt<AutoB, AutoM> for AdaGradConfig
where
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Adaptor = OptimizerAdaptor<AdaGrad, AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor {
        AdaGradConfig::init::<AutoB, AutoM>(self)
    }
}

impl<AutoB, AutoM> OptimConfigExt<AutoB, AutoM> for AdamConfig
where
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Adaptor = OptimizerAdaptor<Adam, AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor {
        AdamConfig::init::<AutoB, AutoM>(self)
    }
}

/// The gradient-based optimizer used for training.
#[derive(Config)]
pub enum OptimizerConfig {
    /// Stochastic gradient descent with (undampened) momentum.
    Momentum(SgdConfig),
    AdaGrad(AdaGradConfig),
    Adam(AdamConfig),
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam()
    }
}

impl OptimizerConfig {
    pub fn momentum() -> Self {
        Self::Momentum(
            SgdConfig::new().with_momentum(Some(
                MomentumConfig::new()
                    .with_momentum(0.5)
                    .with_dampening(0.0),
            )),
        )
    }

    pub fn adagrad() -> Self {
        Self::AdaGrad(AdaGradConfig::new())
    }

    pub fn adam() -> Self {
        Self::Adam(AdamConfig::new().with_epsilon(1e-8))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Momentum(_) => "momentum",
            Self::AdaGrad(_) => "adagrad",
            Self::Adam(_) => "adam",
        }
    }

    /// Learning rate used when the training config doesn't set one.
    pub fn default_lr(&self) -> f64 {
        match self {
            Self::Momentum(_) => 1e-2,
            Self::AdaGrad(_) | Self::Adam(_) => 1e-3,
        }
    }
}

impl FromStr for OptimizerConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "momentum" | "sgd" => Ok(Self::momentum()),
            "adagrad" => Ok(Self::adagrad()),
            "adam" => Ok(Self::adam()),
            _ => Err(Error::UnknownOptimizer(s.to_owned())),
        }
    }
}
