use crate::config::YoloConfig;
use crate::engine::inference_engine::OnnxSession;
use crate::engine::runtime::Runtime;
use crate::engine::InferenceBackend;
use crate::error::{Result, VisionError};
use crate::inference::yolo::{TaskKind, YoloInference, YoloSession};
use image::DynamicImage;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct YoloClassifyResult {
    pub class_id: usize,
    pub score: f32,
}

pub struct YoloClassifySession<B = OnnxSession>(YoloSession<B>);

impl YoloClassifySession<OnnxSession> {
    pub fn new(runtime: &Arc<Runtime>, config: YoloConfig) -> anyhow::Result<Self> {
        let backend = runtime.session(&config.model_path)?;
        Ok(Self::with_backend(backend, config)?)
    }
}

impl<B: InferenceBackend> YoloClassifySession<B> {
    pub fn with_backend(backend: B, config: YoloConfig) -> Result<Self> {
        Ok(Self(YoloSession::new(backend, config, TaskKind::Classify)?))
    }

    pub fn config(&self) -> &YoloConfig {
        self.0.config()
    }

    /// The `top_k` best classes, highest score first; equal scores keep class order.
    pub fn predict_top_k(&self, image: &DynamicImage, top_k: usize) -> Result<Vec<YoloClassifyResult>> {
        let config = self.0.config();
        let (outputs, _) = self.0.forward(image)?;

        let name = config.output_name.as_str();
        let scores = outputs.get(name)?;
        if scores.len() != config.num_classes {
            return Err(VisionError::ChannelMismatch {
                name: name.to_string(),
                expected: config.num_classes,
                actual: scores.len(),
            });
        }

        let mut results = scores
            .iter()
            .enumerate()
            .map(|(class_id, &score)| YoloClassifyResult { class_id, score })
            .collect::<Vec<_>>();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        Ok(results)
    }
}

impl<B: InferenceBackend> YoloInference for YoloClassifySession<B> {
    type Output = YoloClassifyResult;

    fn predict(&self, image: &DynamicImage) -> Result<Vec<YoloClassifyResult>> {
        self.predict_top_k(image, self.0.config().top_k)
    }
}
