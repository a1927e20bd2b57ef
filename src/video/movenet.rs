use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;

use super::pose::{Joint, Landmark, PoseEstimator, PoseLandmarks};
use super::sampler::VideoFrame;
use crate::error::AnalysisError;

/// Single-pose MoveNet (Lightning or Thunder) exported to ONNX.
///
/// Input is an int32 NHWC tensor `[1, size, size, 3]`; output is
/// `[1, 1, 17, 3]` holding `(y, x, score)` per COCO keypoint.
pub struct MoveNetEstimator {
    session: Session,
    input_name: String,
    input_size: usize,
}

impl MoveNetEstimator {
    pub fn new(model_path: &Path, input_size: usize) -> Result<Self> {
        log::info!("Loading pose model: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)
            .context("Failed to load pose model")?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("Pose model has no inputs")?;

        log::info!("Pose model ready ({}x{} input)", input_size, input_size);
        Ok(Self {
            session,
            input_name,
            input_size,
        })
    }

    fn infer(&mut self, frame: &VideoFrame) -> Result<Vec<f32>> {
        let size = self.input_size;
        let resized = resize_bilinear(
            &frame.pixels,
            frame.width as usize,
            frame.height as usize,
            size,
            size,
        );
        let data: Vec<i32> = resized.iter().map(|&p| i32::from(p)).collect();

        let shape = [1, size, size, 3];
        let input = ort::value::Value::from_array((shape.as_slice(), data.into_boxed_slice()))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])?;

        let (_, keypoints) = outputs[0].try_extract_tensor::<f32>()?;
        Ok(keypoints.to_vec())
    }
}

impl PoseEstimator for MoveNetEstimator {
    fn estimate(&mut self, frame: &VideoFrame) -> Result<Option<PoseLandmarks>, AnalysisError> {
        let keypoints = self
            .infer(frame)
            .map_err(|e| AnalysisError::PoseUnavailable(format!("Pose inference failed: {:#}", e)))?;
        Ok(parse_keypoints(&keypoints))
    }
}

/// Turn MoveNet's flat `(y, x, score)` triples into landmarks. A body is
/// reported only when at least one keypoint has a positive score.
pub fn parse_keypoints(raw: &[f32]) -> Option<PoseLandmarks> {
    if raw.len() < Joint::COCO.len() * 3 {
        log::warn!("Unexpected pose output length: {}", raw.len());
        return None;
    }
    let mut pose = PoseLandmarks::default();
    for (joint, triple) in Joint::COCO.iter().zip(raw.chunks_exact(3)) {
        pose.insert(
            *joint,
            Landmark {
                x: triple[1],
                y: triple[0],
                score: Some(triple[2]),
            },
        );
    }
    let any_visible = Joint::COCO
        .iter()
        .any(|&j| pose.get(j).and_then(|lm| lm.score).unwrap_or(0.0) > 0.0);
    any_visible.then_some(pose)
}

/// Bilinear RGB24 resize.
fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_w * dst_h * 3];
    if src_w == 0 || src_h == 0 {
        return dst;
    }
    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for y in 0..dst_h {
        let sy = ((y as f32 + 0.5) * y_ratio - 0.5).max(0.0);
        let y0 = (sy as usize).min(src_h - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;
        for x in 0..dst_w {
            let sx = ((x as f32 + 0.5) * x_ratio - 0.5).max(0.0);
            let x0 = (sx as usize).min(src_w - 1);
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;
            for c in 0..3 {
                let p = |xx: usize, yy: usize| src[(yy * src_w + xx) * 3 + c] as f32;
                let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
                let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
                dst[(y * dst_w + x) * 3 + c] = (top * (1.0 - fy) + bottom * fy).round() as u8;
            }
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypoints_are_y_x_score() {
        let mut raw = vec![0.0f32; 51];
        raw[8 * 3] = 0.4; // right elbow y
        raw[8 * 3 + 1] = 0.6;
        raw[8 * 3 + 2] = 0.9;
        let pose = parse_keypoints(&raw).unwrap();
        let elbow = pose.get(Joint::RightElbow).unwrap();
        assert_eq!((elbow.x, elbow.y, elbow.score), (0.6, 0.4, Some(0.9)));
    }

    #[test]
    fn all_zero_scores_mean_no_body() {
        assert!(parse_keypoints(&[0.0; 51]).is_none());
        assert!(parse_keypoints(&[0.5; 10]).is_none());
    }

    #[test]
    fn resize_keeps_flat_colour() {
        let src: Vec<u8> = [10u8, 20, 30].repeat(8 * 6);
        let dst = resize_bilinear(&src, 8, 6, 4, 4);
        assert_eq!(dst.len(), 4 * 4 * 3);
        assert!(dst.chunks(3).all(|px| px == [10, 20, 30]));
    }
}
