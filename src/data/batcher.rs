use crate::data::dataset::{DatasetConfig, ImageItem};
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

#[derive(Clone, Debug)]
pub struct ImageBatcher {
    channels: usize,
    image_size: usize,
}

impl ImageBatcher {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            channels: config.channels,
            image_size: config.image_size,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// Brightness values in `[0, 1]`.
    ///
    /// # Shape
    /// [batch_size, channels, image_size, image_size]
    pub images: Tensor<B, 4>,
    /// Class indices.
    ///
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let item_len = self.channels * self.image_size * self.image_size;

        let mut pixels = Vec::with_capacity(batch_size * item_len);
        let mut labels = Vec::with_capacity(batch_size);
        for item in items {
            debug_assert_eq!(item_len, item.pixels.len());
            pixels.extend(item.pixels);
            labels.push(item.label as i64);
        }

        let images = TensorData::new(
            pixels,
            [batch_size, self.channels, self.image_size, self.image_size],
        )
        .convert::<B::FloatElem>();
        let targets = TensorData::new(labels, [batch_size]).convert::<B::IntElem>();

        ImageBatch {
            images: Tensor::from_data(images, device),
            targets: Tensor::from_data(targets, device),
        }
    }
}
