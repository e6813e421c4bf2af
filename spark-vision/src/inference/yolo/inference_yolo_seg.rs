use crate::config::YoloConfig;
use crate::engine::inference_engine::OnnxSession;
use crate::engine::runtime::Runtime;
use crate::engine::InferenceBackend;
use crate::error::{Result, VisionError};
use crate::inference::yolo::candidate::CandidateExtra;
use crate::inference::yolo::prototype::Prototypes;
use crate::inference::yolo::{TaskKind, YoloInference, YoloSession};
use crate::utils::graph::Rect;
use crate::utils::masks::Mask;
use image::DynamicImage;
use log::debug;
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct YoloSegmentResult {
    pub class_id: usize,
    pub score: f32,
    pub bbox: Rect,
    /// Full-image mask, foreground only inside `bbox`.
    pub mask: Mask,
}

pub struct YoloSegmentSession<B = OnnxSession>(YoloSession<B>);

impl YoloSegmentSession<OnnxSession> {
    pub fn new(runtime: &Arc<Runtime>, config: YoloConfig) -> anyhow::Result<Self> {
        let backend = runtime.session(&config.model_path)?;
        Ok(Self::with_backend(backend, config)?)
    }
}

impl<B: InferenceBackend> YoloSegmentSession<B> {
    pub fn with_backend(backend: B, config: YoloConfig) -> Result<Self> {
        Ok(Self(YoloSession::new(backend, config, TaskKind::Segment)?))
    }

    pub fn config(&self) -> &YoloConfig {
        self.0.config()
    }
}

impl<B: InferenceBackend> YoloInference for YoloSegmentSession<B> {
    type Output = YoloSegmentResult;

    fn predict(&self, image: &DynamicImage) -> Result<Vec<YoloSegmentResult>> {
        let config = self.0.config();
        let (outputs, transform) = self.0.forward(image)?;

        let candidates = self.0.candidates(&outputs, &transform)?;
        let proto_name = config.proto_output_name.as_str();
        let prototypes = Prototypes::from_output(proto_name, outputs.get(proto_name)?, config.num_mask_coeffs)?;
        debug!(
            "Decoding {} masks from {}x{} prototypes",
            candidates.len(),
            prototypes.width(),
            prototypes.height()
        );

        candidates
            .into_par_iter()
            .map(|candidate| {
                let CandidateExtra::MaskCoefficients(coefficients) = &candidate.extra else {
                    return Err(VisionError::InvalidConfig(
                        "segmentation candidate carries no mask coefficients".to_string(),
                    ));
                };
                let mask = prototypes.decode(
                    coefficients,
                    &candidate.image_box,
                    &transform,
                    config.mask_threshold,
                )?;

                Ok(YoloSegmentResult {
                    class_id: candidate.class_id,
                    score: candidate.score,
                    bbox: candidate.image_box,
                    mask,
                })
            })
            .collect()
    }
}
