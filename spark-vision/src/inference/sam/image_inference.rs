use crate::config::SamConfig;
use crate::engine::inference_engine::OnnxSession;
use crate::engine::runtime::Runtime;
use crate::engine::{InferenceBackend, TensorInput};
use crate::error::{Result, VisionError};
use crate::inference::argmax;
use crate::inference::sam::{upscale_mask_logits, SamMask};
use crate::utils::graph::{PromptPoint, SamPrompt};
use crate::utils::letterbox::{letterbox, ImageTransform, Letterboxed, PixelNormalization};
use image::DynamicImage;
use log::{debug, warn};
use ndarray::{Array3, Array4, ArrayD, Axis};
use std::sync::Arc;

/// Two-stage promptable segmentation: one encoder pass per image, any number
/// of decoder passes per prompt.
pub struct SAMImageInferenceSession<B = OnnxSession> {
    image_encoder: B,
    image_decoder: B,
    config: SamConfig,
}

impl SAMImageInferenceSession<OnnxSession> {
    pub fn new(runtime: &Arc<Runtime>, config: SamConfig) -> anyhow::Result<Self> {
        let image_encoder = runtime.session(&config.encoder_model_path)?;
        let image_decoder = runtime.session(&config.decoder_model_path)?;
        Ok(Self::with_backends(image_encoder, image_decoder, config)?)
    }
}

impl<B: InferenceBackend> SAMImageInferenceSession<B> {
    pub fn with_backends(image_encoder: B, image_decoder: B, config: SamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            image_encoder,
            image_decoder,
            config,
        })
    }

    pub fn config(&self) -> &SamConfig {
        &self.config
    }

    pub fn encode_image(&self, image: &DynamicImage) -> Result<ImageEmbeddingContext<'_, B>> {
        let normalization = PixelNormalization::MeanStd {
            mean: self.config.mean,
            std: self.config.std,
        };
        let Letterboxed { tensor, transform } = letterbox(image, self.config.input_size, &normalization)?;

        let mut outputs = self.image_encoder.run(&[(
            self.config.pixel_values_name.as_str(),
            TensorInput::Float(tensor.view().into_dyn()),
        )])?;
        debug!("Finish running image encoder");

        let embeddings = self
            .config
            .embedding_names
            .iter()
            .map(|name| outputs.remove(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(ImageEmbeddingContext {
            session: self,
            transform,
            state: ContextState::Encoded(embeddings),
        })
    }

    /// Encodes `image`, hands the context to `f` and releases it afterwards,
    /// whether `f` succeeds or not.
    pub fn with_image<R>(
        &self,
        image: &DynamicImage,
        f: impl FnOnce(&ImageEmbeddingContext<'_, B>) -> Result<R>,
    ) -> Result<R> {
        let mut context = self.encode_image(image)?;
        let result = f(&context);
        context.release();
        result
    }
}

enum ContextState {
    Encoded(Vec<ArrayD<f32>>),
    Released,
}

/// Cached embeddings of one encoded image.
///
/// Call [`ImageEmbeddingContext::release`] once done; dropping an unreleased
/// context frees the embeddings too but logs a warning.
pub struct ImageEmbeddingContext<'s, B> {
    session: &'s SAMImageInferenceSession<B>,
    transform: ImageTransform,
    state: ContextState,
}

impl<B: InferenceBackend> ImageEmbeddingContext<'_, B> {
    pub fn transform(&self) -> &ImageTransform {
        &self.transform
    }

    pub fn is_released(&self) -> bool {
        matches!(self.state, ContextState::Released)
    }

    pub fn decode_prompt(&self, prompt: &SamPrompt) -> Result<SamMask> {
        self.decode(&prompt.to_points())
    }

    /// Decodes the best-scoring mask for `points`, given in source-image pixels.
    pub fn decode(&self, points: &[PromptPoint]) -> Result<SamMask> {
        let ContextState::Encoded(embeddings) = &self.state else {
            return Err(VisionError::ContextReleased);
        };
        let config = &self.session.config;
        let (width, height) = (self.transform.source_width, self.transform.source_height);

        let points = points
            .iter()
            .filter(|point| {
                let position = point.position;
                let inside = (0.0..=width as f32).contains(&position.x)
                    && (0.0..=height as f32).contains(&position.y);
                if !inside {
                    warn!("Dropping prompt point ({}, {}) outside {}x{} image", position.x, position.y, width, height);
                }
                inside
            })
            .collect::<Vec<_>>();
        if points.is_empty() {
            return Ok(SamMask::empty(width, height));
        }

        let coordinates = points
            .iter()
            .flat_map(|point| {
                let scaled = self.transform.to_model(point.position.x, point.position.y);
                [scaled.x, scaled.y]
            })
            .collect::<Vec<_>>();
        let labels = points.iter().map(|point| point.label as i64).collect::<Vec<_>>();

        let coordinates = Array4::from_shape_vec((1, 1, points.len(), 2), coordinates)?;
        let labels = Array3::from_shape_vec((1, 1, points.len()), labels)?;
        let boxes = Array3::<f32>::zeros((1, 0, 4));

        let mut inputs = vec![
            (config.points_name.as_str(), TensorInput::Float(coordinates.view().into_dyn())),
            (config.labels_name.as_str(), TensorInput::Int64(labels.view().into_dyn())),
            (config.boxes_name.as_str(), TensorInput::Float(boxes.view().into_dyn())),
        ];
        inputs.extend(
            config
                .embedding_names
                .iter()
                .zip(embeddings)
                .map(|(name, embedding)| (name.as_str(), TensorInput::Float(embedding.view()))),
        );

        let outputs = self.session.image_decoder.run(&inputs)?;
        debug!("Finish running mask decoder");

        let scores = outputs.get(&config.scores_name)?;
        let Some((best, score)) = argmax(scores.iter().copied()) else {
            return Ok(SamMask::empty(width, height));
        };

        let masks = outputs.get(&config.masks_name)?;
        let side = config.mask_size;
        if masks.len() != scores.len() * side * side {
            return Err(VisionError::shape_mismatch(
                &config.masks_name,
                format!("{} masks of {side}x{side}", scores.len()),
                masks.shape(),
            ));
        }
        let masks = masks
            .view()
            .into_shape_with_order((scores.len(), side, side))?;

        let valid_width = self.transform.resized_width() as usize * side / config.input_size as usize;
        let valid_height = self.transform.resized_height() as usize * side / config.input_size as usize;
        let mask = upscale_mask_logits(
            masks.index_axis(Axis(0), best),
            valid_width,
            valid_height,
            width,
            height,
            config.mask_threshold,
        );

        Ok(SamMask { mask, score })
    }

    /// Frees the cached embeddings. Calling it again does nothing.
    pub fn release(&mut self) {
        if let ContextState::Encoded(_) = self.state {
            self.state = ContextState::Released;
            debug!("Released image embeddings");
        }
    }
}

impl<B> Drop for ImageEmbeddingContext<'_, B> {
    fn drop(&mut self) {
        if let ContextState::Encoded(_) = self.state {
            warn!("Image embedding context dropped without release");
            self.state = ContextState::Released;
        }
    }
}
