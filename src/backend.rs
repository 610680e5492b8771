use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

#[cfg(not(any(feature = "wgpu", feature = "tch-cpu", feature = "tch-gpu")))]
pub type MainBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
pub type MainBackend = burn::backend::Wgpu;
#[cfg(all(any(feature = "tch-cpu", feature = "tch-gpu"), not(feature = "wgpu")))]
pub type MainBackend = burn::backend::LibTorch;

pub type MainAutoBackend = burn::backend::Autodiff<MainBackend>;

pub type RecorderTy = burn::record::CompactRecorder;

pub trait MainDevice: Backend {
    fn main_device() -> <Self as Backend>::Device {
        Default::default()
    }
}

#[cfg(not(feature = "tch-gpu"))]
impl MainDevice for MainBackend {}
#[cfg(all(feature = "tch-gpu", not(feature = "wgpu"), not(target_os = "macos")))]
impl MainDevice for MainBackend {
    fn main_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Cuda(0)
    }
}
#[cfg(all(feature = "tch-gpu", not(feature = "wgpu"), target_os = "macos"))]
impl MainDevice for MainBackend {
    fn main_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Mps
    }
}
#[cfg(all(feature = "tch-gpu", feature = "wgpu"))]
impl MainDevice for MainBackend {}

impl MainDevice for MainAutoBackend {
    fn main_device() -> <Self as Backend>::Device {
        <<Self as AutodiffBackend>::InnerBackend as MainDevice>::main_device()
    }
}
