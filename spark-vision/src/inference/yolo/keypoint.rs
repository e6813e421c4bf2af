use crate::error::{Result, VisionError};
use crate::utils::graph::Point;
use crate::utils::letterbox::ImageTransform;

/// Limb connections between the 17 COCO keypoints, for drawing skeletons.
pub const COCO_SKELETON: [(usize, usize); 17] = [
    (15, 13), (13, 11), (16, 14), (14, 12),
    (11, 12), (5, 11), (6, 12),
    (5, 6), (5, 7), (6, 8), (7, 9), (8, 10),
    (1, 2), (0, 1), (0, 2), (1, 3), (2, 4),
];

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KeyPoint {
    pub position: Point<i32>,
    pub confidence: f32,
}

/// Decodes `[x, y, confidence]` triples from model space into image pixels.
pub fn decode_keypoints(raw: &[f32], count: usize, transform: &ImageTransform) -> Result<Vec<KeyPoint>> {
    if raw.len() != count * 3 {
        return Err(VisionError::ChannelMismatch {
            name: "keypoints".to_string(),
            expected: count * 3,
            actual: raw.len(),
        });
    }

    Ok(raw
        .chunks_exact(3)
        .map(|triple| KeyPoint {
            position: transform.to_image_point(triple[0], triple[1]),
            confidence: triple[2],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypoints_are_scaled_and_clamped() {
        let transform = ImageTransform::new(200, 100, 100).unwrap();
        let keypoints = decode_keypoints(&[10.0, 20.0, 0.9, 150.0, -5.0, 0.1], 2, &transform).unwrap();

        assert_eq!(keypoints[0].position, Point::new(20, 40));
        assert_eq!(keypoints[0].confidence, 0.9);
        assert_eq!(keypoints[1].position, Point::new(199, 0));
    }
}
