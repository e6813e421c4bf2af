use crate::config::{OutputLayout, YoloConfig};
use crate::engine::{InferenceBackend, TensorInput, TensorOutputs};
use crate::error::Result;
use crate::inference::yolo::candidate::{AttributeLayout, Candidate, CandidateExtractor, ExtraChannels};
use crate::inference::yolo::nms::NMSImplement;
use crate::utils::letterbox::{letterbox, ImageTransform, Letterboxed, PixelNormalization};
use image::DynamicImage;
use log::debug;

pub mod candidate;
pub mod inference_yolo_cls;
pub mod inference_yolo_detect;
pub mod inference_yolo_obb;
pub mod inference_yolo_pose;
pub mod inference_yolo_seg;
pub mod keypoint;
pub mod nms;
pub mod prototype;
pub mod rotated;

use inference_yolo_cls::{YoloClassifyResult, YoloClassifySession};
use inference_yolo_detect::{YoloDetectResult, YoloDetectSession};
use inference_yolo_obb::{YoloObbResult, YoloObbSession};
use inference_yolo_pose::{YoloPoseResult, YoloPoseSession};
use inference_yolo_seg::{YoloSegmentResult, YoloSegmentSession};

pub trait YoloInference {
    type Output;

    fn predict(&self, image: &DynamicImage) -> Result<Vec<Self::Output>>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Detect,
    Segment,
    Pose,
    Obb,
    Classify,
}

impl TaskKind {
    pub fn extra_channels(&self, config: &YoloConfig) -> ExtraChannels {
        match self {
            TaskKind::Detect | TaskKind::Classify => ExtraChannels::None,
            TaskKind::Segment => ExtraChannels::MaskCoefficients(config.num_mask_coeffs),
            TaskKind::Pose => ExtraChannels::Keypoints(config.num_keypoints),
            TaskKind::Obb => ExtraChannels::Angle,
        }
    }
}

/// Letterbox, run and extract steps shared by every YOLO task.
pub(crate) struct YoloSession<B> {
    backend: B,
    config: YoloConfig,
    task: TaskKind,
}

impl<B: InferenceBackend> YoloSession<B> {
    pub(crate) fn new(backend: B, config: YoloConfig, task: TaskKind) -> Result<Self> {
        config.validate()?;
        Ok(Self { backend, config, task })
    }

    pub(crate) fn config(&self) -> &YoloConfig {
        &self.config
    }

    pub(crate) fn forward(&self, image: &DynamicImage) -> Result<(TensorOutputs, ImageTransform)> {
        let Letterboxed { tensor, transform } =
            letterbox(image, self.config.input_size, &PixelNormalization::Unit)?;

        let outputs = self.backend.run(&[(
            self.config.input_name.as_str(),
            TensorInput::Float(tensor.view().into_dyn()),
        )])?;
        debug!("Finish running {:?} model", self.task);

        for name in outputs.names() {
            if let Ok(output) = outputs.get(name) {
                debug!("Output `{}` has shape {:?}", name, output.shape());
            }
        }

        Ok((outputs, transform))
    }

    /// Extracted candidates, suppressed unless the model already did so.
    pub(crate) fn candidates(&self, outputs: &TensorOutputs, transform: &ImageTransform) -> Result<Vec<Candidate>> {
        let name = self.config.output_name.as_str();
        let layout = AttributeLayout::new(self.config.num_classes, self.task.extra_channels(&self.config));

        let candidates = CandidateExtractor::new(layout, self.config.conf_threshold, transform)
            .extract(name, outputs.get(name)?, self.config.layout)?;

        Ok(match self.config.layout {
            OutputLayout::DenseGrid => {
                let count = candidates.len();
                let kept = candidates
                    .non_maximum_suppression(self.config.iou_threshold, self.config.class_aware_nms);
                debug!("Suppression kept {} of {} candidates", kept.len(), count);
                kept
            }
            OutputLayout::PreFiltered => {
                debug!("Model emitted {} candidates", candidates.len());
                candidates
            }
        })
    }
}

/// Any task's session behind one type, for callers that pick the task at runtime.
pub enum YoloEngine<B> {
    Detect(YoloDetectSession<B>),
    Segment(YoloSegmentSession<B>),
    Pose(YoloPoseSession<B>),
    Obb(YoloObbSession<B>),
    Classify(YoloClassifySession<B>),
}

#[derive(Clone, Debug)]
pub enum YoloPrediction {
    Detect(Vec<YoloDetectResult>),
    Segment(Vec<YoloSegmentResult>),
    Pose(Vec<YoloPoseResult>),
    Obb(Vec<YoloObbResult>),
    Classify(Vec<YoloClassifyResult>),
}

impl YoloPrediction {
    pub fn len(&self) -> usize {
        match self {
            YoloPrediction::Detect(results) => results.len(),
            YoloPrediction::Segment(results) => results.len(),
            YoloPrediction::Pose(results) => results.len(),
            YoloPrediction::Obb(results) => results.len(),
            YoloPrediction::Classify(results) => results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<B: InferenceBackend> YoloEngine<B> {
    pub fn with_backend(task: TaskKind, backend: B, config: YoloConfig) -> Result<Self> {
        Ok(match task {
            TaskKind::Detect => YoloEngine::Detect(YoloDetectSession::with_backend(backend, config)?),
            TaskKind::Segment => YoloEngine::Segment(YoloSegmentSession::with_backend(backend, config)?),
            TaskKind::Pose => YoloEngine::Pose(YoloPoseSession::with_backend(backend, config)?),
            TaskKind::Obb => YoloEngine::Obb(YoloObbSession::with_backend(backend, config)?),
            TaskKind::Classify => YoloEngine::Classify(YoloClassifySession::with_backend(backend, config)?),
        })
    }

    pub fn task(&self) -> TaskKind {
        match self {
            YoloEngine::Detect(_) => TaskKind::Detect,
            YoloEngine::Segment(_) => TaskKind::Segment,
            YoloEngine::Pose(_) => TaskKind::Pose,
            YoloEngine::Obb(_) => TaskKind::Obb,
            YoloEngine::Classify(_) => TaskKind::Classify,
        }
    }

    pub fn predict(&self, image: &DynamicImage) -> Result<YoloPrediction> {
        Ok(match self {
            YoloEngine::Detect(session) => YoloPrediction::Detect(session.predict(image)?),
            YoloEngine::Segment(session) => YoloPrediction::Segment(session.predict(image)?),
            YoloEngine::Pose(session) => YoloPrediction::Pose(session.predict(image)?),
            YoloEngine::Obb(session) => YoloPrediction::Obb(session.predict(image)?),
            YoloEngine::Classify(session) => YoloPrediction::Classify(session.predict(image)?),
        })
    }
}
