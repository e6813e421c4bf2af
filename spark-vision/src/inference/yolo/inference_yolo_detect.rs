use crate::config::YoloConfig;
use crate::engine::inference_engine::OnnxSession;
use crate::engine::runtime::Runtime;
use crate::engine::InferenceBackend;
use crate::error::Result;
use crate::inference::yolo::{TaskKind, YoloInference, YoloSession};
use crate::utils::graph::Rect;
use image::DynamicImage;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct YoloDetectResult {
    pub class_id: usize,
    pub score: f32,
    pub bbox: Rect,
}

pub struct YoloDetectSession<B = OnnxSession>(YoloSession<B>);

impl YoloDetectSession<OnnxSession> {
    pub fn new(runtime: &Arc<Runtime>, config: YoloConfig) -> anyhow::Result<Self> {
        let backend = runtime.session(&config.model_path)?;
        Ok(Self::with_backend(backend, config)?)
    }
}

impl<B: InferenceBackend> YoloDetectSession<B> {
    pub fn with_backend(backend: B, config: YoloConfig) -> Result<Self> {
        Ok(Self(YoloSession::new(backend, config, TaskKind::Detect)?))
    }

    pub fn config(&self) -> &YoloConfig {
        self.0.config()
    }
}

impl<B: InferenceBackend> YoloInference for YoloDetectSession<B> {
    type Output = YoloDetectResult;

    fn predict(&self, image: &DynamicImage) -> Result<Vec<YoloDetectResult>> {
        let (outputs, transform) = self.0.forward(image)?;

        Ok(self
            .0
            .candidates(&outputs, &transform)?
            .into_iter()
            .map(|candidate| YoloDetectResult {
                class_id: candidate.class_id,
                score: candidate.score,
                bbox: candidate.image_box,
            })
            .collect())
    }
}
