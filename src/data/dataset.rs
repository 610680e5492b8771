use crate::error::{Error, Result};
use burn::data::dataset::{Dataset, InMemDataset};
use burn::prelude::*;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Layout and size of the image folder dataset.
///
/// Images are read from `<root>/<split>/<class>/Image<NNNNN>.png`.
#[derive(Config, Debug)]
pub struct DatasetConfig {
    #[config(default = 10)]
    pub num_classes: usize,

    /// Number of training images read from each class directory.
    #[config(default = 1000)]
    pub train_per_class: usize,

    /// Number of test images read from each class directory.
    #[config(default = 100)]
    pub test_per_class: usize,

    /// Images are square, with this many pixels on each side.
    #[config(default = 28)]
    pub image_size: usize,

    #[config(default = 1)]
    pub channels: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "Train",
            Split::Test => "Test",
        }
    }

    pub fn per_class(&self, config: &DatasetConfig) -> usize {
        match self {
            Split::Train => config.train_per_class,
            Split::Test => config.test_per_class,
        }
    }
}

/// Path of a single sample within the dataset root.
pub fn image_path(root: &Path, split: Split, class: usize, sample: usize) -> PathBuf {
    root.join(split.dir_name())
        .join(class.to_string())
        .join(format!("Image{sample:05}.png"))
}

/// A labeled image.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ImageItem {
    /// Brightness values scaled into `[0, 1]`, row-major.
    ///
    /// # Shape
    /// [channels * image_size * image_size]
    pub pixels: Vec<f32>,

    /// Class index, in between 0 and `num_classes - 1`.
    pub label: usize,
}

/// All images of one split, held in memory.
pub struct ImageDataset {
    dataset: InMemDataset<ImageItem>,
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl ImageDataset {
    pub fn train(root: &Path, config: &DatasetConfig) -> Result<Self> {
        Self::load(root, Split::Train, config)
    }

    pub fn test(root: &Path, config: &DatasetConfig) -> Result<Self> {
        Self::load(root, Split::Test, config)
    }

    /// Reads every image of the split, class by class.
    pub fn load(root: &Path, split: Split, config: &DatasetConfig) -> Result<Self> {
        if !matches!(config.channels, 1 | 3) {
            return Err(Error::Channels {
                channels: config.channels,
            });
        }
        let per_class = split.per_class(config);
        if per_class == 0 || config.num_classes == 0 {
            return Err(Error::EmptySplit {
                split: split.dir_name(),
            });
        }
        tracing::info!(
            root = ?root,
            split = split.dir_name(),
            images = per_class * config.num_classes,
            "loading images"
        );

        let mut items = Vec::with_capacity(per_class * config.num_classes);
        for class in 0..config.num_classes {
            for sample in 0..per_class {
                let path = image_path(root, split, class, sample);
                let pixels = read_pixels(&path, config)?;
                items.push(ImageItem {
                    pixels,
                    label: class,
                });
            }
        }

        Ok(Self::from_items(items))
    }

    pub fn from_items(items: Vec<ImageItem>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }
}

fn read_pixels(path: &Path, config: &DatasetConfig) -> Result<Vec<f32>> {
    let image = image::open(path).map_err(|source| Error::Image {
        path: path.to_owned(),
        source,
    })?;

    let (width, height) = (image.width(), image.height());
    if width as usize != config.image_size || height as usize != config.image_size {
        return Err(Error::ImageSize {
            path: path.to_owned(),
            width,
            height,
            expected: config.image_size,
        });
    }

    let raw: Vec<u8> = if config.channels == 1 {
        image.into_luma8().into_raw()
    } else {
        // channel-major, as the convolutions expect
        let rgb = image.into_rgb8();
        (0..3)
            .flat_map(|c| rgb.pixels().map(move |p| p.0[c]))
            .collect()
    };

    Ok(raw
        .into_iter()
        .map(|brightness| {
            let value: f32 = brightness.as_();
            value / 255.0
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// Writes a dataset where each image of class `c` has every pixel set to `c * 20`.
    pub(crate) fn write_dataset(root: &Path, config: &DatasetConfig) {
        for split in [Split::Train, Split::Test] {
            for class in 0..config.num_classes {
                for sample in 0..split.per_class(config) {
                    let path = image_path(root, split, class, sample);
                    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                    let size = config.image_size as u32;
                    let image = GrayImage::from_pixel(size, size, Luma([(class * 20) as u8]));
                    image.save(&path).unwrap();
                }
            }
        }
    }

    fn small_config() -> DatasetConfig {
        DatasetConfig::new()
            .with_num_classes(3)
            .with_train_per_class(4)
            .with_test_per_class(2)
            .with_image_size(8)
    }

    #[test]
    fn path_layout() {
        let path = image_path(Path::new("CIFAR10"), Split::Test, 7, 42);
        assert_eq!(Path::new("CIFAR10/Test/7/Image00042.png"), path);
    }

    #[test]
    fn loads_class_major() {
        let dir = temp_dir::TempDir::new().unwrap();
        let config = small_config();
        write_dataset(dir.path(), &config);

        let train = ImageDataset::train(dir.path(), &config).unwrap();
        let test = ImageDataset::test(dir.path(), &config).unwrap();
        assert_eq!(12, train.len());
        assert_eq!(6, test.len());

        let labels: Vec<usize> = train.iter().map(|item| item.label).collect();
        assert_eq!(vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2], labels);

        let item = train.get(5).unwrap();
        assert_eq!(64, item.pixels.len());
        assert!(item.pixels.iter().all(|p| (p - 20.0 / 255.0).abs() < 1e-6));
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = temp_dir::TempDir::new().unwrap();
        let config = small_config();
        write_dataset(dir.path(), &config);
        let missing = image_path(dir.path(), Split::Train, 2, 3);
        std::fs::remove_file(&missing).unwrap();

        match ImageDataset::train(dir.path(), &config) {
            Err(Error::Image { path, .. }) => assert_eq!(missing, path),
            other => panic!("unexpected result: {:?}", other.map(|d| d.len())),
        }
    }

    #[test]
    fn rejects_wrong_size() {
        let dir = temp_dir::TempDir::new().unwrap();
        let config = small_config();
        write_dataset(dir.path(), &config);

        let result = ImageDataset::train(dir.path(), &config.clone().with_image_size(10));
        assert!(matches!(
            result,
            Err(Error::ImageSize {
                width: 8,
                height: 8,
                expected: 10,
                ..
            })
        ));
    }

    #[test]
    fn empty_split_is_an_error() {
        let dir = temp_dir::TempDir::new().unwrap();
        let config = small_config().with_test_per_class(0);
        assert!(matches!(
            ImageDataset::test(dir.path(), &config),
            Err(Error::EmptySplit { split: "Test" })
        ));
    }

    #[test]
    fn only_luma_or_rgb_channels() {
        let dir = temp_dir::TempDir::new().unwrap();
        let config = small_config().with_image_size(4);
        write_dataset(dir.path(), &config);

        for channels in [0, 2, 4] {
            assert!(matches!(
                ImageDataset::train(dir.path(), &config.clone().with_channels(channels)),
                Err(Error::Channels { channels: c }) if c == channels
            ));
        }

        let rgb = ImageDataset::train(dir.path(), &config.with_channels(3)).unwrap();
        let item = rgb.get(4).unwrap();
        assert_eq!(3 * 4 * 4, item.pixels.len());
        assert!(item.pixels.iter().all(|p| (p - 20.0 / 255.0).abs() < 1e-6));
    }
}
