use crate::utils::masks::Mask;
use ndarray::ArrayView2;

pub mod image_inference;

/// Best mask of one decode call, at the resolution of the encoded image.
#[derive(Clone, Debug, PartialEq)]
pub struct SamMask {
    pub mask: Mask,
    pub score: f32,
}

impl SamMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            mask: Mask::new(width, height),
            score: 0.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }
}

/// Nearest-neighbour upscale of the top-left `valid_width x valid_height` logits
/// to `width x height`. A logit above `threshold` is foreground.
pub fn upscale_mask_logits(
    logits: ArrayView2<f32>,
    valid_width: usize,
    valid_height: usize,
    width: u32,
    height: u32,
    threshold: f32,
) -> Mask {
    let mut mask = Mask::new(width, height);
    let valid_width = valid_width.clamp(1, logits.ncols().max(1));
    let valid_height = valid_height.clamp(1, logits.nrows().max(1));
    if logits.is_empty() {
        return mask;
    }

    let x_ratio = valid_width as f32 / width as f32;
    let y_ratio = valid_height as f32 / height as f32;

    for y in 0..height {
        let source_y = ((y as f32 * y_ratio) as usize).min(valid_height - 1);
        for x in 0..width {
            let source_x = ((x as f32 * x_ratio) as usize).min(valid_width - 1);
            if logits[[source_y, source_x]] > threshold {
                mask.set(x, y, true);
            }
        }
    }

    mask
}
