use crate::config::YoloConfig;
use crate::engine::inference_engine::OnnxSession;
use crate::engine::runtime::Runtime;
use crate::engine::InferenceBackend;
use crate::error::{Result, VisionError};
use crate::inference::yolo::candidate::CandidateExtra;
use crate::inference::yolo::{TaskKind, YoloInference, YoloSession};
use crate::utils::graph::Point;
use image::DynamicImage;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct YoloObbResult {
    pub class_id: usize,
    pub score: f32,
    /// Top-left, top-right, bottom-right, bottom-left of the unrotated box, in image pixels.
    pub corners: [Point<i32>; 4],
    pub center: Point<i32>,
    /// Radians.
    pub angle: f32,
}

pub struct YoloObbSession<B = OnnxSession>(YoloSession<B>);

impl YoloObbSession<OnnxSession> {
    pub fn new(runtime: &Arc<Runtime>, config: YoloConfig) -> anyhow::Result<Self> {
        let backend = runtime.session(&config.model_path)?;
        Ok(Self::with_backend(backend, config)?)
    }
}

impl<B: InferenceBackend> YoloObbSession<B> {
    pub fn with_backend(backend: B, config: YoloConfig) -> Result<Self> {
        Ok(Self(YoloSession::new(backend, config, TaskKind::Obb)?))
    }

    pub fn config(&self) -> &YoloConfig {
        self.0.config()
    }
}

impl<B: InferenceBackend> YoloInference for YoloObbSession<B> {
    type Output = YoloObbResult;

    fn predict(&self, image: &DynamicImage) -> Result<Vec<YoloObbResult>> {
        let (outputs, transform) = self.0.forward(image)?;

        self.0
            .candidates(&outputs, &transform)?
            .into_iter()
            .map(|candidate| {
                let CandidateExtra::Rotated(rotated) = candidate.extra else {
                    return Err(VisionError::InvalidConfig(
                        "oriented candidate carries no angle".to_string(),
                    ));
                };

                let corners = rotated.image_corners(&transform);
                let center = Point::new(
                    (corners[0].x + corners[2].x) / 2,
                    (corners[0].y + corners[2].y) / 2,
                );

                Ok(YoloObbResult {
                    class_id: candidate.class_id,
                    score: candidate.score,
                    corners,
                    center,
                    angle: rotated.angle,
                })
            })
            .collect()
    }
}
