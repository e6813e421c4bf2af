use spark_vision::inference::yolo::candidate::{Candidate, CandidateExtra};
use spark_vision::inference::yolo::nms::NMSImplement;
use spark_vision::utils::graph::Rect;

fn candidate(x1: i32, y1: i32, x2: i32, y2: i32, score: f32, class_id: usize) -> Candidate {
    Candidate {
        model_box: [x1 as f32, y1 as f32, x2 as f32, y2 as f32],
        image_box: Rect::new(x1, y1, x2, y2),
        score,
        class_id,
        extra: CandidateExtra::None,
    }
}

fn cluster() -> Vec<Candidate> {
    vec![
        candidate(0, 0, 100, 100, 0.6, 0),
        candidate(10, 10, 110, 110, 0.9, 0),
        candidate(50, 50, 150, 150, 0.7, 1),
        candidate(300, 300, 350, 350, 0.5, 2),
        candidate(5, 0, 105, 100, 0.8, 1),
        candidate(200, 0, 260, 40, 0.65, 0),
    ]
}

#[test]
fn suppression_is_idempotent() {
    let once = cluster().non_maximum_suppression(0.5, false);
    let twice = once.clone().non_maximum_suppression(0.5, false);
    assert_eq!(once, twice);
}

#[test]
fn kept_candidates_are_sorted_and_pairwise_separated() {
    let kept = cluster().non_maximum_suppression(0.5, false);

    assert!(kept.windows(2).all(|pair| pair[0].score >= pair[1].score));
    for (i, a) in kept.iter().enumerate() {
        for b in &kept[i + 1..] {
            assert!(a.image_box.iou(&b.image_box) <= 0.5);
        }
    }
    assert_eq!(kept.len(), 4);
    assert_eq!(kept[0].score, 0.9);
}

#[test]
fn higher_threshold_never_keeps_fewer() {
    let thresholds = [0.0, 0.1, 0.3, 0.5, 0.7, 0.9, 1.0];
    let counts: Vec<usize> = thresholds
        .iter()
        .map(|threshold| cluster().non_maximum_suppression(*threshold, false).len())
        .collect();

    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(*counts.last().unwrap(), cluster().len());
}

#[test]
fn equal_scores_keep_input_order() {
    let candidates = vec![
        candidate(0, 0, 10, 10, 0.5, 0),
        candidate(100, 100, 110, 110, 0.5, 1),
        candidate(0, 0, 10, 10, 0.5, 2),
    ];

    let kept = candidates.non_maximum_suppression(0.5, false);

    assert_eq!(kept.iter().map(|c| c.class_id).collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn class_aware_mode_only_suppresses_within_a_class() {
    let kept = cluster().non_maximum_suppression(0.5, true);
    let agnostic = cluster().non_maximum_suppression(0.5, false);

    assert!(kept.len() > agnostic.len());
    for (i, a) in kept.iter().enumerate() {
        for b in kept[i + 1..].iter().filter(|b| b.class_id == a.class_id) {
            assert!(a.image_box.iou(&b.image_box) <= 0.5);
        }
    }
}

#[test]
fn empty_input_stays_empty() {
    assert!(Vec::<Candidate>::new().non_maximum_suppression(0.5, false).is_empty());
}

#[test]
fn nan_scores_are_dropped_before_suppression() {
    let candidates = vec![
        candidate(0, 0, 100, 100, f32::NAN, 0),
        candidate(0, 0, 100, 100, 0.9, 0),
        candidate(300, 300, 350, 350, 0.5, 0),
    ];

    let kept = candidates.non_maximum_suppression(0.5, false);

    let scores: Vec<f32> = kept.iter().map(|candidate| candidate.score).collect();
    assert_eq!(scores, vec![0.9, 0.5]);
}
