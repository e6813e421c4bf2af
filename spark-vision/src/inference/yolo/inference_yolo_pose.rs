use crate::config::YoloConfig;
use crate::engine::inference_engine::OnnxSession;
use crate::engine::runtime::Runtime;
use crate::engine::InferenceBackend;
use crate::error::{Result, VisionError};
use crate::inference::yolo::candidate::CandidateExtra;
use crate::inference::yolo::keypoint::{decode_keypoints, KeyPoint};
use crate::inference::yolo::{TaskKind, YoloInference, YoloSession};
use crate::utils::graph::Rect;
use image::DynamicImage;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct YoloPoseResult {
    pub class_id: usize,
    pub score: f32,
    pub bbox: Rect,
    pub keypoints: Vec<KeyPoint>,
}

pub struct YoloPoseSession<B = OnnxSession>(YoloSession<B>);

impl YoloPoseSession<OnnxSession> {
    pub fn new(runtime: &Arc<Runtime>, config: YoloConfig) -> anyhow::Result<Self> {
        let backend = runtime.session(&config.model_path)?;
        Ok(Self::with_backend(backend, config)?)
    }
}

impl<B: InferenceBackend> YoloPoseSession<B> {
    pub fn with_backend(backend: B, config: YoloConfig) -> Result<Self> {
        Ok(Self(YoloSession::new(backend, config, TaskKind::Pose)?))
    }

    pub fn config(&self) -> &YoloConfig {
        self.0.config()
    }
}

impl<B: InferenceBackend> YoloInference for YoloPoseSession<B> {
    type Output = YoloPoseResult;

    fn predict(&self, image: &DynamicImage) -> Result<Vec<YoloPoseResult>> {
        let (outputs, transform) = self.0.forward(image)?;
        let count = self.0.config().num_keypoints;

        self.0
            .candidates(&outputs, &transform)?
            .into_iter()
            .map(|candidate| {
                let CandidateExtra::Keypoints(raw) = &candidate.extra else {
                    return Err(VisionError::InvalidConfig(
                        "pose candidate carries no keypoints".to_string(),
                    ));
                };

                Ok(YoloPoseResult {
                    class_id: candidate.class_id,
                    score: candidate.score,
                    bbox: candidate.image_box,
                    keypoints: decode_keypoints(raw, count, &transform)?,
                })
            })
            .collect()
    }
}
