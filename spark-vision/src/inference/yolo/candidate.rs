use crate::config::OutputLayout;
use crate::error::{Result, VisionError};
use crate::inference::argmax;
use crate::inference::yolo::rotated::RotatedBox;
use crate::utils::graph::Rect;
use crate::utils::letterbox::ImageTransform;
use ndarray::{s, ArrayD, ArrayView1, ArrayView2, Axis, Ix2};
use rayon::prelude::*;
use std::ops::Range;

/// Task-specific channels that follow the box and class scores of each anchor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExtraChannels {
    None,
    MaskCoefficients(usize),
    Keypoints(usize),
    Angle,
}

impl ExtraChannels {
    pub fn len(&self) -> usize {
        match self {
            ExtraChannels::None => 0,
            ExtraChannels::MaskCoefficients(count) => *count,
            ExtraChannels::Keypoints(count) => count * 3,
            ExtraChannels::Angle => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AttributeLayout {
    pub num_classes: usize,
    pub extra: ExtraChannels,
}

impl AttributeLayout {
    pub const BOX_CHANNELS: usize = 4;
    /// Box, score and class id of a pre-filtered row.
    pub const ROW_HEADER: usize = 6;

    pub fn new(num_classes: usize, extra: ExtraChannels) -> Self {
        Self { num_classes, extra }
    }

    pub fn dense_channels(&self) -> usize {
        Self::BOX_CHANNELS + self.num_classes + self.extra.len()
    }

    pub fn row_attributes(&self) -> usize {
        Self::ROW_HEADER + self.extra.len()
    }

    fn class_range(&self) -> Range<usize> {
        Self::BOX_CHANNELS..Self::BOX_CHANNELS + self.num_classes
    }

    fn dense_extra_range(&self) -> Range<usize> {
        let start = Self::BOX_CHANNELS + self.num_classes;
        start..start + self.extra.len()
    }

    fn row_extra_range(&self) -> Range<usize> {
        Self::ROW_HEADER..Self::ROW_HEADER + self.extra.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CandidateExtra {
    None,
    MaskCoefficients(Vec<f32>),
    Keypoints(Vec<f32>),
    Rotated(RotatedBox),
}

/// One detection before suppression.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// `[x1, y1, x2, y2]` in model pixels. For rotated boxes, the axis-aligned hull.
    pub model_box: [f32; 4],
    pub image_box: Rect,
    pub score: f32,
    pub class_id: usize,
    pub extra: CandidateExtra,
}

pub struct CandidateExtractor<'a> {
    layout: AttributeLayout,
    conf_threshold: f32,
    transform: &'a ImageTransform,
}

impl<'a> CandidateExtractor<'a> {
    pub fn new(layout: AttributeLayout, conf_threshold: f32, transform: &'a ImageTransform) -> Self {
        Self {
            layout,
            conf_threshold,
            transform,
        }
    }

    pub fn extract(&self, name: &str, output: &ArrayD<f32>, format: OutputLayout) -> Result<Vec<Candidate>> {
        let matrix = squeeze_batch(name, output)?;
        match format {
            OutputLayout::DenseGrid => self.extract_dense(name, matrix),
            OutputLayout::PreFiltered => self.extract_rows(name, matrix),
        }
    }

    /// `[channels, anchors]`, every anchor scored over all classes.
    fn extract_dense(&self, name: &str, output: ArrayView2<f32>) -> Result<Vec<Candidate>> {
        let expected = self.layout.dense_channels();
        if output.nrows() != expected {
            return Err(VisionError::ChannelMismatch {
                name: name.to_string(),
                expected,
                actual: output.nrows(),
            });
        }

        let class_range = self.layout.class_range();
        let extra_range = self.layout.dense_extra_range();

        Ok(output
            .axis_iter(Axis(1))
            .into_par_iter()
            .filter_map(|anchor| {
                let (class_id, score) =
                    argmax(anchor.slice(s![class_range.clone()]).iter().copied())?;
                if !self.passes(score) {
                    return None;
                }

                let geometry = [anchor[0], anchor[1], anchor[2], anchor[3]];
                let extra = anchor.slice(s![extra_range.clone()]);
                Some(self.candidate(geometry, true, score, class_id, extra))
            })
            .collect())
    }

    /// `[rows, attributes]` as `[x1, y1, x2, y2, score, class, extra..]`; rotated rows carry
    /// `[cx, cy, w, h, score, class, angle]`.
    fn extract_rows(&self, name: &str, output: ArrayView2<f32>) -> Result<Vec<Candidate>> {
        let expected = self.layout.row_attributes();
        if output.ncols() != expected {
            return Err(VisionError::ChannelMismatch {
                name: name.to_string(),
                expected,
                actual: output.ncols(),
            });
        }

        let extra_range = self.layout.row_extra_range();

        Ok(output
            .axis_iter(Axis(0))
            .into_par_iter()
            .filter_map(|row| {
                let score = row[4];
                if !self.passes(score) {
                    return None;
                }

                let class_id = row[5].max(0.0) as usize;
                let geometry = [row[0], row[1], row[2], row[3]];
                let extra = row.slice(s![extra_range.clone()]);
                Some(self.candidate(geometry, false, score, class_id, extra))
            })
            .collect())
    }

    /// NaN never passes.
    fn passes(&self, score: f32) -> bool {
        score >= self.conf_threshold
    }

    /// `geometry` is `[cx, cy, w, h]` when `centered` or for rotated boxes, corners otherwise.
    fn candidate(
        &self,
        geometry: [f32; 4],
        centered: bool,
        score: f32,
        class_id: usize,
        extra: ArrayView1<f32>,
    ) -> Candidate {
        let (model_box, extra) = match self.layout.extra {
            ExtraChannels::Angle => {
                let [cx, cy, width, height] = geometry;
                let rotated = RotatedBox {
                    cx,
                    cy,
                    width,
                    height,
                    angle: extra[0],
                };
                (rotated.bounding_box(), CandidateExtra::Rotated(rotated))
            }
            channels => {
                let model_box = if centered {
                    let [cx, cy, w, h] = geometry;
                    [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
                } else {
                    geometry
                };
                let extra = match channels {
                    ExtraChannels::MaskCoefficients(_) => CandidateExtra::MaskCoefficients(extra.to_vec()),
                    ExtraChannels::Keypoints(_) => CandidateExtra::Keypoints(extra.to_vec()),
                    _ => CandidateExtra::None,
                };
                (model_box, extra)
            }
        };

        Candidate {
            image_box: self.transform.to_image_rect(&model_box),
            model_box,
            score,
            class_id,
            extra,
        }
    }
}

/// Views `[1, a, b]` or `[a, b]` as a matrix.
pub(crate) fn squeeze_batch<'a>(name: &str, output: &'a ArrayD<f32>) -> Result<ArrayView2<'a, f32>> {
    let view = match output.shape() {
        [1, _, _] => output.index_axis(Axis(0), 0),
        [_, _] => output.view(),
        shape => return Err(VisionError::shape_mismatch(name, "[1, a, b] or [a, b]", shape)),
    };
    Ok(view.into_dimensionality::<Ix2>()?)
}
