use num::Num;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point<T: Num> {
    pub x: T,
    pub y: T,
}

impl<T: Num> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box described by its origin and extent.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Region<T: Num> {
    pub x: T,
    pub y: T,
    pub width: T,
    pub height: T,
}

impl<T: Num + Copy> Region<T> {
    pub fn new(x: T, y: T, width: T, height: T) -> Self {
        Self { x, y, width, height }
    }

    pub fn top_left(&self) -> Point<T> {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point<T> {
        Point::new(self.x + self.width, self.y + self.height)
    }
}

/// Integer rectangle in original-image pixels, `[x1, x2) x [y1, y2)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    /// Builds a rectangle, swapping coordinates so that `x1 <= x2` and `y1 <= y2`.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width() as i64 * self.height() as i64
        }
    }

    /// Largest rectangle contained by both; the zero rectangle when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let rect = Rect {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };

        if rect.is_empty() {
            Rect::default()
        } else {
            rect
        }
    }

    pub fn iou(&self, other: &Rect) -> f32 {
        let intersection = self.intersect(other).area();
        if intersection == 0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        intersection as f32 / union as f32
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

/// Meaning of a prompt point, encoded as the integer the decoder expects.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum PromptLabel {
    Background = 0,
    Foreground = 1,
    BoxTopLeft = 2,
    BoxBottomRight = 3,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PromptPoint {
    pub position: Point<f32>,
    pub label: PromptLabel,
}

impl PromptPoint {
    pub fn new(x: f32, y: f32, label: PromptLabel) -> Self {
        Self {
            position: Point::new(x, y),
            label,
        }
    }

    pub fn foreground(x: f32, y: f32) -> Self {
        Self::new(x, y, PromptLabel::Foreground)
    }

    pub fn background(x: f32, y: f32) -> Self {
        Self::new(x, y, PromptLabel::Background)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SamPrompt {
    Point(Point<f32>),
    Box(Region<f32>),
    Both(Point<f32>, Region<f32>),
    Points(Vec<PromptPoint>),
}

impl SamPrompt {
    /// Flattens the prompt into labelled points. A box becomes its two corners.
    pub fn to_points(&self) -> Vec<PromptPoint> {
        fn corners(region: &Region<f32>) -> [PromptPoint; 2] {
            let top_left = region.top_left();
            let bottom_right = region.bottom_right();
            [
                PromptPoint::new(top_left.x, top_left.y, PromptLabel::BoxTopLeft),
                PromptPoint::new(bottom_right.x, bottom_right.y, PromptLabel::BoxBottomRight),
            ]
        }

        match self {
            SamPrompt::Point(point) => vec![PromptPoint::foreground(point.x, point.y)],
            SamPrompt::Box(region) => corners(region).to_vec(),
            SamPrompt::Both(point, region) => {
                let mut points = vec![PromptPoint::foreground(point.x, point.y)];
                points.extend(corners(region));
                points
            }
            SamPrompt::Points(points) => points.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_half_overlapping_boxes() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 15, 15);
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-6);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&Rect::new(20, 20, 30, 30)), 0.0);
    }

    #[test]
    fn degenerate_boxes_never_overlap() {
        let line = Rect::new(5, 0, 5, 10);
        assert!(line.is_empty());
        assert_eq!(line.area(), 0);
        assert_eq!(line.iou(&Rect::new(0, 0, 10, 10)), 0.0);
    }

    #[test]
    fn box_prompt_expands_to_corners() {
        let prompt = SamPrompt::Box(Region::new(10.0, 20.0, 30.0, 40.0));
        let points = prompt.to_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].label, PromptLabel::BoxTopLeft);
        assert_eq!(points[1].position, Point::new(40.0, 60.0));
        assert_eq!(points[1].label as i64, 3);
    }
}
