use serde::Serialize;

use super::pose::{Joint, PoseLandmarks};
use crate::config::VideoConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotLabel {
    CoverDrive,
    PullShot,
    StraightDrive,
}

#[derive(Clone, Copy, Debug)]
pub struct ShotRules {
    /// How far (normalized y) the wrist must drop below the elbow for a pull.
    pub pull_offset: f32,
    pub min_keypoint_score: f32,
}

impl Default for ShotRules {
    fn default() -> Self {
        Self {
            pull_offset: 0.1,
            min_keypoint_score: 0.5,
        }
    }
}

impl From<&VideoConfig> for ShotRules {
    fn from(cfg: &VideoConfig) -> Self {
        Self {
            pull_offset: cfg.pull_offset,
            min_keypoint_score: cfg.min_keypoint_score,
        }
    }
}

/// Label a pose from the right arm alone. Image y grows downwards, so a
/// raised wrist has the smaller y. Without a confident right elbow and
/// wrist there is no label.
pub fn classify_shot(pose: &PoseLandmarks, rules: &ShotRules) -> Option<ShotLabel> {
    let elbow = pose.confident(Joint::RightElbow, rules.min_keypoint_score)?;
    let wrist = pose.confident(Joint::RightWrist, rules.min_keypoint_score)?;

    let label = if wrist.y < elbow.y {
        ShotLabel::CoverDrive
    } else if wrist.y > elbow.y + rules.pull_offset {
        ShotLabel::PullShot
    } else {
        ShotLabel::StraightDrive
    };
    Some(label)
}
