use crate::utils::graph::Point;
use crate::utils::letterbox::ImageTransform;

/// Oriented box in model space. `angle` is in radians.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RotatedBox {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl RotatedBox {
    /// Corners in the order top-left, top-right, bottom-right, bottom-left of the unrotated box.
    pub fn corners(&self) -> [Point<f32>; 4] {
        let (sin, cos) = self.angle.sin_cos();
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);

        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(dx, dy)| {
            Point::new(
                self.cx + dx * cos - dy * sin,
                self.cy + dx * sin + dy * cos,
            )
        })
    }

    /// Axis-aligned `[x1, y1, x2, y2]` hull of the corners.
    pub fn bounding_box(&self) -> [f32; 4] {
        self.corners().iter().fold(
            [f32::MAX, f32::MAX, f32::MIN, f32::MIN],
            |[x1, y1, x2, y2], corner| {
                [x1.min(corner.x), y1.min(corner.y), x2.max(corner.x), y2.max(corner.y)]
            },
        )
    }

    pub fn image_corners(&self, transform: &ImageTransform) -> [Point<i32>; 4] {
        self.corners()
            .map(|corner| transform.to_image_point_rounded(corner.x, corner.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn unrotated_corners_match_box_edges() {
        let rotated = RotatedBox { cx: 50.0, cy: 40.0, width: 20.0, height: 10.0, angle: 0.0 };
        let corners = rotated.corners();

        assert_eq!(corners[0], Point::new(40.0, 35.0));
        assert_eq!(corners[2], Point::new(60.0, 45.0));
        assert_eq!(rotated.bounding_box(), [40.0, 35.0, 60.0, 45.0]);
    }

    #[test]
    fn quarter_turn_swaps_extent() {
        let rotated = RotatedBox { cx: 0.0, cy: 0.0, width: 20.0, height: 10.0, angle: FRAC_PI_2 };
        let [x1, y1, x2, y2] = rotated.bounding_box();

        assert!((x2 - x1 - 10.0).abs() < 1e-4);
        assert!((y2 - y1 - 20.0).abs() < 1e-4);
    }
}
