use crate::inference::yolo::candidate::Candidate;

pub trait NMSImplement {
    /// Greedy suppression: keeps the best-scoring candidate and drops every later
    /// one whose image-space IoU with it exceeds `iou_threshold`.
    ///
    /// With `class_aware` set, only candidates of the same class suppress each other.
    /// Candidates scored NaN are dropped.
    fn non_maximum_suppression(self, iou_threshold: f32, class_aware: bool) -> Self;
}

impl NMSImplement for Vec<Candidate> {
    fn non_maximum_suppression(mut self, iou_threshold: f32, class_aware: bool) -> Self {
        self.retain(|candidate| !candidate.score.is_nan());
        // Stable, so equal scores keep extraction order.
        self.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut suppressed = vec![false; self.len()];
        for i in 0..self.len() {
            if suppressed[i] {
                continue;
            }
            for j in i + 1..self.len() {
                if suppressed[j] || (class_aware && self[i].class_id != self[j].class_id) {
                    continue;
                }
                if self[i].image_box.iou(&self[j].image_box) > iou_threshold {
                    suppressed[j] = true;
                }
            }
        }

        let mut suppressed = suppressed.into_iter();
        self.retain(|_| !suppressed.next().unwrap_or(true));
        self
    }
}
