use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::config::ResizeMethod;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;

/// `(batch = 1, height, width, rgb)` with channel values in `[0, 1]`.
pub type ImageTensor = Array4<f32>;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unexpected tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl From<ResizeMethod> for FilterType {
    fn from(method: ResizeMethod) -> Self {
        match method {
            ResizeMethod::Nearest => FilterType::Nearest,
            ResizeMethod::Triangle => FilterType::Triangle,
            ResizeMethod::CatmullRom => FilterType::CatmullRom,
            ResizeMethod::Gaussian => FilterType::Gaussian,
            ResizeMethod::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Turns uploaded bytes into the tensor layout the classifier was trained on.
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    filter: FilterType,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(ResizeMethod::default())
    }
}

impl ImageNormalizer {
    pub fn new(method: ResizeMethod) -> Self {
        Self {
            filter: method.into(),
        }
    }

    /// Decodes, forces RGB, stretches to `INPUT_SIZE`², scales by 1/255 and
    /// adds the batch axis. Aspect ratio is not preserved.
    pub fn normalize(&self, bytes: &[u8]) -> Result<ImageTensor, NormalizeError> {
        let decoded = image::load_from_memory(bytes)?;
        // Drop alpha before resampling so transparent pixels keep their colour.
        let rgb = decoded.to_rgb8();
        let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, self.filter);

        let side = INPUT_SIZE as usize;
        let data: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|channel| f32::from(channel) / 255.0)
            .collect();
        Ok(Array4::from_shape_vec((1, side, side, CHANNELS), data)?)
    }
}
