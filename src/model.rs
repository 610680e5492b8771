//! Two convolutional layers followed by two fully connected layers.
//!
//! ```text
//! [batch, 1, 28, 28]
//!   -> conv 5x5 (32) -> relu -> maxpool 2x2   [batch, 32, 14, 14]
//!   -> conv 5x5 (64) -> relu -> maxpool 2x2   [batch, 64, 7, 7]
//!   -> flatten -> linear (1024) -> relu -> dropout
//!   -> linear (10)                            [batch, 10]
//! ```

use crate::data::DatasetConfig;
use crate::error::{Error, Result};
use crate::utils::truncated_normal::truncated_normal;
use burn::module::Param;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, PaddingConfig2d, Relu};
use burn::prelude::*;

#[derive(Config, Debug)]
pub struct ConvNetConfig {
    /// Number of input channels.
    #[config(default = 1)]
    pub channels: usize,

    /// Input images are square, with this many pixels on each side.
    #[config(default = 28)]
    pub image_size: usize,

    #[config(default = 10)]
    pub num_classes: usize,

    /// Kernel size of both convolutions.
    #[config(default = 5)]
    pub kernel_size: usize,

    /// Number of filters of the first convolution.
    #[config(default = 32)]
    pub conv1_channels: usize,

    /// Number of filters of the second convolution.
    #[config(default = 64)]
    pub conv2_channels: usize,

    /// Output size of the first fully connected layer.
    #[config(default = 1024)]
    pub hidden_size: usize,

    /// Probability of zeroing a hidden unit during training.
    #[config(default = 0.5)]
    pub dropout: f64,

    /// Standard deviation of the truncated normal weight initialization.
    #[config(default = 0.1)]
    pub init_std: f64,
}

impl ConvNetConfig {
    /// Side of the feature maps after both pooling layers.
    pub fn pooled_size(&self) -> usize {
        self.image_size / 2 / 2
    }

    /// Input size of the first fully connected layer.
    pub fn flattened_size(&self) -> usize {
        self.conv2_channels * self.pooled_size() * self.pooled_size()
    }

    /// Errors if the images or labels described by `dataset` don't fit the model.
    pub fn check_dataset(&self, dataset: &DatasetConfig) -> Result<()> {
        expect_size("channels", dataset.channels, self.channels)?;
        expect_size("image_size", dataset.image_size, self.image_size)?;
        expect_size("num_classes", dataset.num_classes, self.num_classes)
    }

    /// Returns the initialized model.
    ///
    /// Weights are drawn from a truncated normal distribution and biases start at zero.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvNet<B> {
        debug_assert!(self.kernel_size % 2 == 1, "same padding needs an odd kernel");
        debug_assert!(self.pooled_size() > 0);

        let conv = |channels_in: usize, channels_out: usize| {
            let mut conv: Conv2d<B> = Conv2dConfig::new(
                [channels_in, channels_out],
                [self.kernel_size, self.kernel_size],
            )
            .with_padding(PaddingConfig2d::Same)
            .init(device);
            conv.weight = Param::from_tensor(truncated_normal(
                conv.weight.dims(),
                self.init_std,
                device,
            ));
            conv.bias = Some(Param::from_tensor(Tensor::zeros([channels_out], device)));
            conv
        };

        let linear = |d_input: usize, d_output: usize| Linear {
            weight: Param::from_tensor(truncated_normal(
                [d_input, d_output],
                self.init_std,
                device,
            )),
            bias: Some(Param::from_tensor(Tensor::zeros([d_output], device))),
        };

        ConvNet {
            conv1: conv(self.channels, self.conv1_channels),
            conv2: conv(self.conv1_channels, self.conv2_channels),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: linear(self.flattened_size(), self.hidden_size),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc2: linear(self.hidden_size, self.num_classes),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    /// Input channel: channels.
    /// Output channel: conv1_channels.
    pub conv1: Conv2d<B>,

    /// Input channel: conv1_channels.
    /// Output channel: conv2_channels.
    pub conv2: Conv2d<B>,

    /// 2x2 max pooling with stride 2, shared by both convolutions.
    pub pool: MaxPool2d,

    /// Input: conv2_channels * pooled_size * pooled_size.
    /// Output: hidden_size.
    pub fc1: Linear<B>,

    pub dropout: Dropout,

    /// Input: hidden_size.
    /// Output: num_classes.
    pub fc2: Linear<B>,

    pub activation: Relu,
}

/// Intermediate values of a forward pass.
#[derive(Debug, Clone)]
pub struct ConvActivations<B: Backend> {
    /// Output of the first convolution after the relu, before pooling.
    ///
    /// # Shape
    /// [batch, conv1_channels, image_size, image_size]
    pub conv1: Tensor<B, 4>,

    /// Output of the second convolution after the relu, before pooling.
    ///
    /// # Shape
    /// [batch, conv2_channels, image_size / 2, image_size / 2]
    pub conv2: Tensor<B, 4>,

    /// # Shape
    /// [batch, num_classes]
    pub logits: Tensor<B, 2>,
}

/// Loss and logits of a labeled batch.
#[derive(Debug, Clone)]
pub struct ClassificationOutput<B: Backend> {
    /// Softmax cross-entropy averaged over the batch.
    ///
    /// # Shape
    /// [1]
    pub loss: Tensor<B, 1>,

    /// # Shape
    /// [batch, num_classes]
    pub output: Tensor<B, 2>,

    /// # Shape
    /// [batch]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ClassificationOutput<B> {
    /// Fraction of the batch classified correctly.
    pub fn accuracy(&self) -> f32 {
        accuracy(self.output.clone(), self.targets.clone())
    }
}

impl<B: Backend> ConvNet<B> {
    /// Errors if the images or labels described by `dataset` don't fit the layer shapes.
    pub fn check_dataset(&self, dataset: &DatasetConfig) -> Result<()> {
        let [_, channels, _, _] = self.conv1.weight.dims();
        let [conv2_channels, _, _, _] = self.conv2.weight.dims();
        let [flattened, _] = self.fc1.weight.dims();
        let [_, num_classes] = self.fc2.weight.dims();
        let pooled = dataset.image_size / 2 / 2;

        expect_size("channels", dataset.channels, channels)?;
        expect_size("flattened size", conv2_channels * pooled * pooled, flattened)?;
        expect_size("num_classes", dataset.num_classes, num_classes)
    }

    /// # Shapes
    ///   - Input [batch, channels, image_size, image_size]
    ///   - Output [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward_activations(images).logits
    }

    /// Same as [`Self::forward`], also returning both convolution activations.
    pub fn forward_activations(&self, images: Tensor<B, 4>) -> ConvActivations<B> {
        let conv1 = self.activation.forward(self.conv1.forward(images));
        let x = self.pool.forward(conv1.clone());

        let conv2 = self.activation.forward(self.conv2.forward(x));
        let x = self.pool.forward(conv2.clone());

        let [batch, channels, height, width] = x.dims();
        let x = x.reshape([batch, channels * height * width]);

        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.dropout.forward(x);
        let logits = self.fc2.forward(x);

        ConvActivations {
            conv1,
            conv2,
            logits,
        }
    }

    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let [batch_size, ..] = images.dims();
        assert_eq!([batch_size], targets.dims());

        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }
}

fn expect_size(field: &'static str, dataset: usize, model: usize) -> Result<()> {
    if dataset != model {
        return Err(Error::ShapeMismatch {
            field,
            dataset,
            model,
        });
    }
    Ok(())
}

/// Number of rows whose largest logit is at the target class.
pub fn count_correct<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predictions = output.argmax(1).squeeze::<1>(1);
    let correct: i64 = predictions.equal(targets).int().sum().into_scalar().elem();
    correct as usize
}

/// Fraction of rows whose largest logit is at the target class.
pub fn accuracy<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f32 {
    let [batch_size] = targets.dims();
    if batch_size == 0 {
        return 0.0;
    }
    count_correct(output, targets) as f32 / batch_size as f32
}
