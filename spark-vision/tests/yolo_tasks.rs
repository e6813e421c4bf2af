mod common;

use common::{dense_output, init_logging, row_output, tensor, ScriptedBackend};
use image::DynamicImage;
use spark_vision::config::YoloConfig;
use spark_vision::inference::yolo::inference_yolo_cls::YoloClassifySession;
use spark_vision::inference::yolo::inference_yolo_obb::YoloObbSession;
use spark_vision::inference::yolo::inference_yolo_pose::YoloPoseSession;
use spark_vision::inference::yolo::inference_yolo_seg::YoloSegmentSession;
use spark_vision::inference::yolo::YoloInference;
use spark_vision::utils::graph::{Point, Rect};
use spark_vision::VisionError;

#[test]
fn segmentation_mask_covers_only_its_box() -> anyhow::Result<()> {
    init_logging();

    let config = YoloConfig::segment()
        .with_input_size(64)
        .with_num_classes(1)
        .with_num_mask_coeffs(2);

    let detections = dense_output(&[vec![32.0, 32.0, 32.0, 32.0, 0.9, 1.0, 0.0]]);
    let mut planes = vec![5.0; 16 * 16];
    planes.extend(vec![-5.0; 16 * 16]);
    let prototypes = tensor(&[1, 2, 16, 16], planes);

    let session = YoloSegmentSession::with_backend(
        ScriptedBackend::new([("output0", detections), ("output1", prototypes)]),
        config,
    )?;
    let results = session.predict(&DynamicImage::new_rgb8(64, 64))?;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.bbox, Rect::new(16, 16, 48, 48));
    assert_eq!((result.mask.width(), result.mask.height()), (64, 64));
    assert_eq!(result.mask.foreground_count(), 32 * 32);
    assert!(result.mask.get(16, 16));
    assert!(!result.mask.get(15, 16));
    assert!(!result.mask.get(48, 47));
    Ok(())
}

#[test]
fn prefiltered_segmentation_rows_carry_coefficients_last() -> anyhow::Result<()> {
    let config = YoloConfig::segment()
        .with_input_size(64)
        .with_num_classes(1)
        .with_num_mask_coeffs(2)
        .prefiltered();

    let rows = row_output(&[
        vec![16.0, 16.0, 48.0, 48.0, 0.9, 0.0, 1.0, 0.0],
        vec![0.0, 0.0, 8.0, 8.0, 0.2, 0.0, 1.0, 0.0],
    ]);
    let mut planes = vec![5.0; 16 * 16];
    planes.extend(vec![-5.0; 16 * 16]);
    let prototypes = tensor(&[1, 2, 16, 16], planes);

    let session = YoloSegmentSession::with_backend(
        ScriptedBackend::new([("output0", rows), ("output1", prototypes)]),
        config,
    )?;
    let results = session.predict(&DynamicImage::new_rgb8(64, 64))?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].bbox, Rect::new(16, 16, 48, 48));
    assert_eq!(results[0].mask.foreground_count(), 32 * 32);
    assert!(results[0].mask.get(47, 47));
    assert!(!results[0].mask.get(48, 48));
    Ok(())
}

#[test]
fn segmentation_rejects_wrong_prototype_count() -> anyhow::Result<()> {
    let config = YoloConfig::segment()
        .with_input_size(64)
        .with_num_classes(1)
        .with_num_mask_coeffs(2);

    let detections = dense_output(&[vec![32.0, 32.0, 32.0, 32.0, 0.9, 1.0, 0.0]]);
    let prototypes = tensor(&[1, 3, 4, 4], vec![0.0; 48]);
    let session = YoloSegmentSession::with_backend(
        ScriptedBackend::new([("output0", detections), ("output1", prototypes)]),
        config,
    )?;

    let result = session.predict(&DynamicImage::new_rgb8(64, 64));
    assert!(matches!(result, Err(VisionError::ChannelMismatch { expected: 2, actual: 3, .. })));
    Ok(())
}

#[test]
fn pose_keypoints_are_remapped_and_clamped() -> anyhow::Result<()> {
    let config = YoloConfig::pose().with_num_keypoints(2);

    let output = dense_output(&[vec![
        150.0, 150.0, 100.0, 100.0, 0.9, 10.0, 20.0, 0.95, 700.0, -5.0, 0.4,
    ]]);
    let session = YoloPoseSession::with_backend(ScriptedBackend::new([("output0", output)]), config)?;

    let results = session.predict(&DynamicImage::new_rgb8(1280, 1280))?;

    assert_eq!(results.len(), 1);
    let keypoints = &results[0].keypoints;
    assert_eq!(keypoints.len(), 2);
    assert_eq!(keypoints[0].position, Point::new(20, 40));
    assert!((keypoints[0].confidence - 0.95).abs() < 1e-6);
    assert_eq!(keypoints[1].position, Point::new(1279, 0));
    Ok(())
}

#[test]
fn prefiltered_pose_rows_carry_keypoints_last() -> anyhow::Result<()> {
    let config = YoloConfig::pose().with_num_keypoints(1).prefiltered();
    let output = row_output(&[vec![100.0, 100.0, 200.0, 200.0, 0.9, 0.0, 50.0, 60.0, 0.7]]);
    let session = YoloPoseSession::with_backend(ScriptedBackend::new([("output0", output)]), config)?;

    let results = session.predict(&DynamicImage::new_rgb8(1280, 1280))?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].bbox, Rect::new(200, 200, 400, 400));
    assert_eq!(results[0].keypoints.len(), 1);
    assert_eq!(results[0].keypoints[0].position, Point::new(100, 120));
    assert!((results[0].keypoints[0].confidence - 0.7).abs() < 1e-6);
    Ok(())
}

#[test]
fn oriented_box_without_rotation() -> anyhow::Result<()> {
    let config = YoloConfig::obb().with_input_size(640).with_num_classes(2);
    let output = dense_output(&[vec![100.0, 100.0, 40.0, 20.0, 0.1, 0.8, 0.0]]);
    let session = YoloObbSession::with_backend(ScriptedBackend::new([("output0", output)]), config)?;

    let results = session.predict(&DynamicImage::new_rgb8(640, 640))?;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.class_id, 1);
    assert_eq!(
        result.corners,
        [Point::new(80, 90), Point::new(120, 90), Point::new(120, 110), Point::new(80, 110)]
    );
    assert_eq!(result.center, Point::new(100, 100));
    assert_eq!(result.angle, 0.0);
    Ok(())
}

#[test]
fn prefiltered_oriented_rows_carry_the_angle_last() -> anyhow::Result<()> {
    let config = YoloConfig::obb().with_num_classes(2).prefiltered();
    let output = row_output(&[vec![200.0, 200.0, 40.0, 20.0, 0.9, 1.0, std::f32::consts::FRAC_PI_2]]);
    let session = YoloObbSession::with_backend(ScriptedBackend::new([("output0", output)]), config)?;

    let results = session.predict(&DynamicImage::new_rgb8(1024, 1024))?;

    assert_eq!(results.len(), 1);
    let xs = results[0].corners.map(|corner| corner.x);
    let ys = results[0].corners.map(|corner| corner.y);
    assert_eq!(xs.iter().max().unwrap() - xs.iter().min().unwrap(), 20);
    assert_eq!(ys.iter().max().unwrap() - ys.iter().min().unwrap(), 40);
    Ok(())
}

#[test]
fn classification_returns_stable_top_k() -> anyhow::Result<()> {
    let config = YoloConfig::classify().with_num_classes(5);
    let output = tensor(&[1, 5], vec![0.1, 0.7, 0.05, 0.7, 0.15]);
    let session = YoloClassifySession::with_backend(ScriptedBackend::new([("output0", output)]), config)?;

    let image = DynamicImage::new_rgb8(100, 50);
    let results = session.predict_top_k(&image, 3)?;

    let ids: Vec<usize> = results.iter().map(|result| result.class_id).collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert_eq!(session.predict(&image)?.len(), 5);
    assert_eq!(session.predict_top_k(&image, 10)?.len(), 5);
    Ok(())
}

#[test]
fn classification_rejects_wrong_class_count() -> anyhow::Result<()> {
    let config = YoloConfig::classify().with_num_classes(4);
    let output = tensor(&[1, 5], vec![0.0; 5]);
    let session = YoloClassifySession::with_backend(ScriptedBackend::new([("output0", output)]), config)?;

    let result = session.predict(&DynamicImage::new_rgb8(10, 10));
    assert!(matches!(result, Err(VisionError::ChannelMismatch { expected: 4, actual: 5, .. })));
    Ok(())
}
