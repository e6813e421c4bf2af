use crate::error::{Result, VisionError};
use crate::utils::graph::{Point, Rect};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use log::debug;
use ndarray::{Array4, Axis};
use rayon::prelude::*;
use std::borrow::Cow;

/// How a resized pixel is turned into a tensor value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PixelNormalization {
    /// `value / 255`
    Unit,
    /// `(value / 255 - mean[c]) / std[c]`
    MeanStd { mean: [f32; 3], std: [f32; 3] },
}

impl PixelNormalization {
    pub fn normalize(&self, channel: usize, value: u8) -> f32 {
        let value = value as f32 / 255.0;
        match self {
            PixelNormalization::Unit => value,
            PixelNormalization::MeanStd { mean, std } => (value - mean[channel]) / std[channel],
        }
    }
}

/// Geometry of one letterbox operation. The resized image sits in the top-left
/// corner of a `target_size` square, so mapping back is a pure division.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ImageTransform {
    pub scale: f32,
    pub source_width: u32,
    pub source_height: u32,
    pub target_size: u32,
}

impl ImageTransform {
    pub fn new(source_width: u32, source_height: u32, target_size: u32) -> Result<Self> {
        if source_width == 0 || source_height == 0 {
            return Err(VisionError::EmptyImage {
                width: source_width,
                height: source_height,
            });
        }
        if target_size == 0 {
            return Err(VisionError::InvalidConfig(
                "input size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            scale: target_size as f32 / source_width.max(source_height) as f32,
            source_width,
            source_height,
            target_size,
        })
    }

    pub fn resized_width(&self) -> u32 {
        self.resize(self.source_width)
    }

    pub fn resized_height(&self) -> u32 {
        self.resize(self.source_height)
    }

    fn resize(&self, length: u32) -> u32 {
        ((length as f32 * self.scale).round() as u32).clamp(1, self.target_size)
    }

    pub fn to_model(&self, x: f32, y: f32) -> Point<f32> {
        Point::new(x * self.scale, y * self.scale)
    }

    /// Maps a model-space `[x1, y1, x2, y2]` box to image pixels, truncating and
    /// clamping every edge to `[0, width] x [0, height]`.
    pub fn to_image_rect(&self, model_box: &[f32; 4]) -> Rect {
        let [x1, y1, x2, y2] = *model_box;
        let width = self.source_width as i32;
        let height = self.source_height as i32;

        Rect::new(
            ((x1 / self.scale) as i32).clamp(0, width),
            ((y1 / self.scale) as i32).clamp(0, height),
            ((x2 / self.scale) as i32).clamp(0, width),
            ((y2 / self.scale) as i32).clamp(0, height),
        )
    }

    /// Maps a model-space point to an image pixel, truncating and clamping to
    /// `[0, width - 1] x [0, height - 1]`.
    pub fn to_image_point(&self, x: f32, y: f32) -> Point<i32> {
        Point::new(
            ((x / self.scale) as i32).clamp(0, self.source_width as i32 - 1),
            ((y / self.scale) as i32).clamp(0, self.source_height as i32 - 1),
        )
    }

    /// Same as [`Self::to_image_point`] but rounds to the nearest pixel.
    pub fn to_image_point_rounded(&self, x: f32, y: f32) -> Point<i32> {
        Point::new(
            ((x / self.scale).round() as i32).clamp(0, self.source_width as i32 - 1),
            ((y / self.scale).round() as i32).clamp(0, self.source_height as i32 - 1),
        )
    }
}

pub struct Letterboxed {
    /// `[1, 3, S, S]`, RGB planes, zero outside the resized region.
    pub tensor: Array4<f32>,
    pub transform: ImageTransform,
}

pub fn letterbox(
    image: &DynamicImage,
    target_size: u32,
    normalization: &PixelNormalization,
) -> Result<Letterboxed> {
    let rgb: Cow<RgbImage> = match image.as_rgb8() {
        Some(rgb) => Cow::Borrowed(rgb),
        None => Cow::Owned(image.to_rgb8()),
    };

    let transform = ImageTransform::new(rgb.width(), rgb.height(), target_size)?;
    let resized = imageops::resize(
        rgb.as_ref(),
        transform.resized_width(),
        transform.resized_height(),
        FilterType::Triangle,
    );

    let size = target_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    tensor
        .axis_iter_mut(Axis(1))
        .into_par_iter()
        .enumerate()
        .for_each(|(channel, mut plane)| {
            for (x, y, pixel) in resized.enumerate_pixels() {
                plane[[0, y as usize, x as usize]] = normalization.normalize(channel, pixel[channel]);
            }
        });

    debug!(
        "Letterboxed {}x{} into {}x{} (scale {:.4})",
        transform.source_width,
        transform.source_height,
        transform.resized_width(),
        transform.resized_height(),
        transform.scale
    );

    Ok(Letterboxed { tensor, transform })
}
