use crate::engine::inference_engine::ExecutionProvider;
use crate::error::{Result, VisionError};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads any of the configuration structs from a JSON file.
pub fn load_from_path<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Arrangement of the main YOLO output tensor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `[1, attributes, anchors]`, channel-major, NMS still required.
    #[default]
    DenseGrid,
    /// `[1, N, attributes]` rows, already suppressed by the model.
    PreFiltered,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoloConfig {
    pub model_path: PathBuf,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub mask_threshold: f32,
    pub input_size: u32,
    pub num_classes: usize,
    pub num_mask_coeffs: usize,
    pub num_keypoints: usize,
    pub top_k: usize,
    pub layout: OutputLayout,
    /// Suppress only boxes of the same class instead of all overlapping boxes.
    pub class_aware_nms: bool,
    pub input_name: String,
    pub output_name: String,
    pub proto_output_name: String,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("yolo11n.onnx"),
            conf_threshold: 0.45,
            iou_threshold: 0.5,
            mask_threshold: 0.5,
            input_size: 640,
            num_classes: 80,
            num_mask_coeffs: 32,
            num_keypoints: 17,
            top_k: 5,
            layout: OutputLayout::DenseGrid,
            class_aware_nms: false,
            input_name: "images".to_string(),
            output_name: "output0".to_string(),
            proto_output_name: "output1".to_string(),
        }
    }
}

impl YoloConfig {
    pub fn detect() -> Self {
        Self::default()
    }

    pub fn segment() -> Self {
        Self {
            model_path: PathBuf::from("yolo11n-seg.onnx"),
            ..Self::default()
        }
    }

    pub fn classify() -> Self {
        Self {
            model_path: PathBuf::from("yolo11n-cls.onnx"),
            input_size: 224,
            num_classes: 1000,
            ..Self::default()
        }
    }

    pub fn pose() -> Self {
        Self {
            model_path: PathBuf::from("yolo11n-pose.onnx"),
            num_classes: 1,
            ..Self::default()
        }
    }

    pub fn obb() -> Self {
        Self {
            model_path: PathBuf::from("yolo11n-obb.onnx"),
            input_size: 1024,
            num_classes: 15,
            ..Self::default()
        }
    }

    /// Switches to models that emit already-suppressed rows.
    pub fn prefiltered(self) -> Self {
        self.with_layout(OutputLayout::PreFiltered)
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    pub fn with_mask_threshold(mut self, threshold: f32) -> Self {
        self.mask_threshold = threshold;
        self
    }

    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    pub fn with_num_classes(mut self, classes: usize) -> Self {
        self.num_classes = classes;
        self
    }

    pub fn with_num_mask_coeffs(mut self, coefficients: usize) -> Self {
        self.num_mask_coeffs = coefficients;
        self
    }

    pub fn with_num_keypoints(mut self, keypoints: usize) -> Self {
        self.num_keypoints = keypoints;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_class_aware_nms(mut self, enabled: bool) -> Self {
        self.class_aware_nms = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("conf_threshold", self.conf_threshold),
            ("iou_threshold", self.iou_threshold),
            ("mask_threshold", self.mask_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VisionError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.input_size == 0 {
            return Err(VisionError::InvalidConfig(
                "input_size must be greater than zero".to_string(),
            ));
        }
        if self.num_classes == 0 {
            return Err(VisionError::InvalidConfig(
                "num_classes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamConfig {
    pub encoder_model_path: PathBuf,
    pub decoder_model_path: PathBuf,
    pub input_size: u32,
    /// Side length of the low-resolution logits the decoder emits.
    pub mask_size: usize,
    pub mask_threshold: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub pixel_values_name: String,
    pub embedding_names: Vec<String>,
    pub points_name: String,
    pub labels_name: String,
    pub boxes_name: String,
    pub scores_name: String,
    pub masks_name: String,
}

impl Default for SamConfig {
    fn default() -> Self {
        Self {
            encoder_model_path: PathBuf::from("sam2_vision_encoder.onnx"),
            decoder_model_path: PathBuf::from("sam2_prompt_encoder_mask_decoder.onnx"),
            input_size: 1024,
            mask_size: 256,
            mask_threshold: 0.0,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            pixel_values_name: "pixel_values".to_string(),
            embedding_names: vec![
                "image_embeddings.0".to_string(),
                "image_embeddings.1".to_string(),
                "image_embeddings.2".to_string(),
            ],
            points_name: "input_points".to_string(),
            labels_name: "input_labels".to_string(),
            boxes_name: "input_boxes".to_string(),
            scores_name: "iou_scores".to_string(),
            masks_name: "pred_masks".to_string(),
        }
    }
}

impl SamConfig {
    pub fn with_models(encoder: impl Into<PathBuf>, decoder: impl Into<PathBuf>) -> Self {
        Self {
            encoder_model_path: encoder.into(),
            decoder_model_path: decoder.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 || self.mask_size == 0 {
            return Err(VisionError::InvalidConfig(
                "input_size and mask_size must be greater than zero".to_string(),
            ));
        }
        if self.mask_size > self.input_size as usize {
            return Err(VisionError::InvalidConfig(format!(
                "mask_size {} exceeds input_size {}",
                self.mask_size, self.input_size
            )));
        }
        if self.std.iter().any(|std| *std == 0.0) {
            return Err(VisionError::InvalidConfig(
                "std must not contain zero".to_string(),
            ));
        }
        if self.embedding_names.is_empty() {
            return Err(VisionError::InvalidConfig(
                "at least one image embedding output is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Explicit path of the onnxruntime shared library; the loader's default when unset.
    pub library_path: Option<PathBuf>,
    pub provider: ExecutionProvider,
    pub intra_threads: Option<usize>,
    pub cpu_mem_arena: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            provider: ExecutionProvider::CPU,
            intra_threads: None,
            cpu_mem_arena: false,
        }
    }
}
