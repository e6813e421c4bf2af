use crate::inference::yolo::inference_yolo_pose::YoloPoseResult;
use crate::inference::yolo::keypoint::{KeyPoint, COCO_SKELETON};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

/// Keypoints at or below this confidence are left out of the drawing.
pub const KEYPOINT_CONFIDENCE: f32 = 0.5;

const LIMB_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const JOINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LIMB_RADIUS: i32 = 2;
const JOINT_RADIUS: i32 = 10;

/// Draws skeleton limbs, then joints, for every pose onto `image`.
///
/// A limb is drawn only when both of its keypoints are confident. Skeleton pairs
/// referencing keypoints the model did not emit are skipped.
pub fn draw_pose(image: &mut RgbImage, results: &[YoloPoseResult]) {
    for result in results {
        let confident = |index: usize| {
            result
                .keypoints
                .get(index)
                .filter(|keypoint| keypoint.confidence > KEYPOINT_CONFIDENCE)
        };

        for &(a, b) in &COCO_SKELETON {
            if let (Some(from), Some(to)) = (confident(a), confident(b)) {
                draw_limb(image, from, to);
            }
        }

        for keypoint in result.keypoints.iter().filter(|keypoint| keypoint.confidence > KEYPOINT_CONFIDENCE) {
            draw_filled_circle_mut(image, (keypoint.position.x, keypoint.position.y), JOINT_RADIUS, JOINT_COLOR);
        }
    }
}

/// Thick segment, stamped as small discs one pixel apart.
fn draw_limb(image: &mut RgbImage, from: &KeyPoint, to: &KeyPoint) {
    let (x0, y0) = (from.position.x as f32, from.position.y as f32);
    let (dx, dy) = (to.position.x as f32 - x0, to.position.y as f32 - y0);
    let steps = dx.abs().max(dy.abs()).ceil() as i32;

    for step in 0..=steps {
        let t = if steps == 0 { 0.0 } else { step as f32 / steps as f32 };
        let center = ((x0 + dx * t).round() as i32, (y0 + dy * t).round() as i32);
        draw_filled_circle_mut(image, center, LIMB_RADIUS, LIMB_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::{Point, Rect};

    fn keypoint(x: i32, y: i32, confidence: f32) -> KeyPoint {
        KeyPoint {
            position: Point::new(x, y),
            confidence,
        }
    }

    fn pose() -> YoloPoseResult {
        let mut keypoints = vec![keypoint(180, 180, 0.0); 17];
        keypoints[0] = keypoint(20, 20, 0.9);
        keypoints[1] = keypoint(100, 20, 0.9);
        keypoints[2] = keypoint(100, 150, 0.5);

        YoloPoseResult {
            class_id: 0,
            score: 0.9,
            bbox: Rect::new(0, 0, 200, 200),
            keypoints,
        }
    }

    #[test]
    fn only_confident_pairs_are_connected() {
        let mut image = RgbImage::new(200, 200);
        draw_pose(&mut image, &[pose()]);

        assert_eq!(*image.get_pixel(60, 20), LIMB_COLOR);
        assert_eq!(*image.get_pixel(60, 20 + LIMB_RADIUS as u32), LIMB_COLOR);
        // (0, 2) and (1, 2): keypoint 2 sits exactly at the cut-off.
        assert_eq!(*image.get_pixel(60, 85), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(100, 85), Rgb([0, 0, 0]));
    }

    #[test]
    fn only_confident_joints_are_drawn() {
        let mut image = RgbImage::new(200, 200);
        draw_pose(&mut image, &[pose()]);

        assert_eq!(*image.get_pixel(20, 20), JOINT_COLOR);
        assert_eq!(*image.get_pixel(100, 20), JOINT_COLOR);
        assert_eq!(*image.get_pixel(100, 150), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(180, 180), Rgb([0, 0, 0]));
    }

    #[test]
    fn short_keypoint_lists_are_tolerated() {
        let mut image = RgbImage::new(50, 50);
        let mut result = pose();
        result.keypoints.truncate(1);

        draw_pose(&mut image, &[result]);
        assert_eq!(*image.get_pixel(20, 20), JOINT_COLOR);
    }
}
