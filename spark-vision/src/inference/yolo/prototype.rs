use crate::error::{Result, VisionError};
use crate::inference::sigmoid;
use crate::utils::graph::Rect;
use crate::utils::letterbox::ImageTransform;
use crate::utils::masks::Mask;
use ndarray::{s, Array2, ArrayD, ArrayView3, Axis, Ix3};

/// Prototype masks `[K, Hp, Wp]` shared by every instance of one image.
pub struct Prototypes<'a> {
    protos: ArrayView3<'a, f32>,
}

impl<'a> Prototypes<'a> {
    pub fn from_output(name: &str, output: &'a ArrayD<f32>, channels: usize) -> Result<Self> {
        let view = match output.shape() {
            [1, _, _, _] => output.index_axis(Axis(0), 0),
            [_, _, _] => output.view(),
            shape => return Err(VisionError::shape_mismatch(name, "[1, K, H, W] or [K, H, W]", shape)),
        };
        let protos = view.into_dimensionality::<Ix3>()?;

        if protos.len_of(Axis(0)) != channels {
            return Err(VisionError::ChannelMismatch {
                name: name.to_string(),
                expected: channels,
                actual: protos.len_of(Axis(0)),
            });
        }
        if protos.len_of(Axis(1)) == 0 || protos.len_of(Axis(2)) == 0 {
            return Err(VisionError::shape_mismatch(name, "non-empty prototype planes", protos.shape()));
        }

        Ok(Self { protos })
    }

    pub fn channels(&self) -> usize {
        self.protos.len_of(Axis(0))
    }

    pub fn height(&self) -> usize {
        self.protos.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.protos.len_of(Axis(2))
    }

    /// Builds the full-image mask of one instance. Only pixels inside `image_box`
    /// are evaluated; a pixel is foreground when `sigmoid(logit) > threshold`.
    pub fn decode(
        &self,
        coefficients: &[f32],
        image_box: &Rect,
        transform: &ImageTransform,
        threshold: f32,
    ) -> Result<Mask> {
        if coefficients.len() != self.channels() {
            return Err(VisionError::ChannelMismatch {
                name: "mask coefficients".to_string(),
                expected: self.channels(),
                actual: coefficients.len(),
            });
        }

        let mut mask = Mask::new(transform.source_width, transform.source_height);
        if image_box.is_empty() {
            return Ok(mask);
        }

        // Strides are per axis so non-square prototype planes still span the whole input.
        let stride_x = transform.target_size as f32 / self.width() as f32;
        let stride_y = transform.target_size as f32 / self.height() as f32;
        let cell = |pixel: i32, stride: f32, limit: usize| {
            let index = (pixel as f32 * transform.scale / stride) as usize;
            (index < limit).then_some(index)
        };

        let columns: Vec<Option<usize>> = (image_box.x1..image_box.x2)
            .map(|x| cell(x, stride_x, self.width()))
            .collect();
        let rows: Vec<Option<usize>> = (image_box.y1..image_box.y2)
            .map(|y| cell(y, stride_y, self.height()))
            .collect();

        let (Some(grid_x), Some(grid_y)) = (span(&columns), span(&rows)) else {
            return Ok(mask);
        };

        // Every covered prototype cell is evaluated once, then sampled per pixel.
        let cells = self.protos.slice(s![.., grid_y.0..=grid_y.1, grid_x.0..=grid_x.1]);
        let mut logits = Array2::<f32>::zeros((cells.len_of(Axis(1)), cells.len_of(Axis(2))));
        for (plane, coefficient) in cells.axis_iter(Axis(0)).zip(coefficients) {
            logits.scaled_add(*coefficient, &plane);
        }
        let foreground = logits.mapv(|logit| sigmoid(logit) > threshold);

        for (y, row) in (image_box.y1..image_box.y2).zip(&rows) {
            let Some(my) = row else { continue };
            for (x, column) in (image_box.x1..image_box.x2).zip(&columns) {
                let Some(mx) = column else { continue };
                if foreground[[my - grid_y.0, mx - grid_x.0]] {
                    mask.set(x as u32, y as u32, true);
                }
            }
        }

        Ok(mask)
    }
}

fn span(cells: &[Option<usize>]) -> Option<(usize, usize)> {
    cells.iter().flatten().fold(None, |span, &cell| match span {
        None => Some((cell, cell)),
        Some((low, high)) => Some((low.min(cell), high.max(cell))),
    })
}
