use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::sampler::VideoFrame;
use crate::config::VideoConfig;
use crate::error::AnalysisError;

/// COCO body keypoints, in the order single-pose models emit them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Joint {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    #[cfg_attr(not(feature = "pose"), allow(dead_code))]
    pub const COCO: [Joint; 17] = [
        Joint::Nose,
        Joint::LeftEye,
        Joint::RightEye,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];
}

/// Normalized image position; `y` grows downwards.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub score: Option<f32>,
}

/// Joints found on the one body detected in a frame.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PoseLandmarks {
    joints: BTreeMap<Joint, Landmark>,
}

impl PoseLandmarks {
    #[cfg_attr(not(feature = "pose"), allow(dead_code))]
    pub fn insert(&mut self, joint: Joint, landmark: Landmark) {
        self.joints.insert(joint, landmark);
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.joints.get(&joint)
    }

    /// The landmark for `joint` unless its score is below `min_score`.
    /// Landmarks without a score are trusted.
    pub fn confident(&self, joint: Joint, min_score: f32) -> Option<&Landmark> {
        self.get(joint)
            .filter(|lm| lm.score.map_or(true, |score| score >= min_score))
    }
}

/// Anything that can find a body in a frame.
pub trait PoseEstimator {
    /// `Ok(None)` means no body was detected, which is not an error.
    fn estimate(&mut self, frame: &VideoFrame) -> Result<Option<PoseLandmarks>, AnalysisError>;
}

#[derive(Debug, Deserialize)]
struct TrackEntry {
    frame: u64,
    #[serde(default)]
    landmarks: Option<PoseLandmarks>,
}

/// Landmarks precomputed by an external pose model, keyed by frame index.
///
/// The file is a JSON array of `{"frame": n, "landmarks": {JOINT: {x, y,
/// score?}} | null}`. Frames absent from the file have no body.
#[derive(Debug, Default)]
pub struct LandmarkTrack {
    frames: HashMap<u64, PoseLandmarks>,
}

impl LandmarkTrack {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read landmarks: {}", path.display()))?;
        let track = Self::from_json(&content)
            .with_context(|| format!("Failed to parse landmarks: {}", path.display()))?;
        log::info!("Loaded landmarks for {} frames from {}", track.len(), path.display());
        Ok(track)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<TrackEntry> = serde_json::from_str(json)?;
        Ok(entries
            .into_iter()
            .filter_map(|e| e.landmarks.map(|lm| (e.frame, lm)))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl FromIterator<(u64, PoseLandmarks)> for LandmarkTrack {
    fn from_iter<I: IntoIterator<Item = (u64, PoseLandmarks)>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl PoseEstimator for LandmarkTrack {
    fn estimate(&mut self, frame: &VideoFrame) -> Result<Option<PoseLandmarks>, AnalysisError> {
        Ok(self.frames.get(&frame.index).cloned())
    }
}

/// Pick the pose source: a landmark file wins over a model, and the CLI
/// model path wins over the configured one.
pub fn open_estimator(
    landmarks: Option<&Path>,
    pose_model: Option<&Path>,
    cfg: &VideoConfig,
) -> Result<Box<dyn PoseEstimator>, AnalysisError> {
    if let Some(path) = landmarks {
        let track = LandmarkTrack::load(path)
            .map_err(|e| AnalysisError::PoseUnavailable(format!("{:#}", e)))?;
        return Ok(Box::new(track));
    }

    let model: Option<PathBuf> = pose_model
        .map(Path::to_path_buf)
        .or_else(|| cfg.pose_model.clone());
    let Some(model) = model else {
        return Err(AnalysisError::PoseUnavailable(
            "No pose source: pass --landmarks <file.json> or --pose-model <model.onnx>".into(),
        ));
    };

    #[cfg(feature = "pose")]
    {
        let estimator = super::movenet::MoveNetEstimator::new(&model, cfg.pose_input_size)
            .map_err(|e| AnalysisError::PoseUnavailable(format!("{:#}", e)))?;
        Ok(Box::new(estimator))
    }

    #[cfg(not(feature = "pose"))]
    {
        Err(AnalysisError::PoseUnavailable(format!(
            "Pose model {} requires the 'pose' feature. \
             Rebuild with: cargo build --features pose",
            model.display()
        )))
    }
}
