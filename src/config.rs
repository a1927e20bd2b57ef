use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

/// Audio lane tunables. The defaults are hand-picked magic numbers, not
/// learned values; change them only against labelled recordings.
#[derive(Clone, Debug, Deserialize)]
pub struct AudioConfig {
    /// Spike-detection window length in seconds.
    #[serde(default = "default_frame_seconds")]
    pub frame_seconds: f32,
    /// Hop length as a fraction of the window length.
    #[serde(default = "default_hop_ratio")]
    pub hop_ratio: f32,
    /// Minimum normalized energy for a spike frame.
    #[serde(default = "default_spike_threshold")]
    pub spike_threshold: f32,
    /// Minimum energy ratio between a spike frame and the frame before it.
    #[serde(default = "default_rise_ratio")]
    pub rise_ratio: f32,
    /// ZCR above which (together with the centroid) a spike is a clean hit.
    #[serde(default = "default_ball_hit_zcr")]
    pub ball_hit_zcr: f32,
    /// Spectral centroid (Hz) above which a spike is a clean hit.
    #[serde(default = "default_ball_hit_centroid")]
    pub ball_hit_centroid: f32,
    /// ZCR above which a spike is an edge or glove contact.
    #[serde(default = "default_edge_zcr")]
    pub edge_zcr: f32,
    /// Minimum stddev of the global RMS track for the music gate.
    #[serde(default = "default_music_rms_std")]
    pub music_rms_std: f32,
    /// Minimum mean of the global RMS track for the music gate.
    #[serde(default = "default_music_rms_mean")]
    pub music_rms_mean: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VideoConfig {
    /// Wrist-below-elbow offset (normalized y) that marks a pull shot.
    #[serde(default = "default_pull_offset")]
    pub pull_offset: f32,
    /// Landmarks scored below this are treated as not detected.
    #[serde(default = "default_min_keypoint_score")]
    pub min_keypoint_score: f32,
    /// MoveNet ONNX model used when `--pose-model` is not given.
    #[serde(default)]
    pub pose_model: Option<PathBuf>,
    /// Square input edge of the pose model (192 for MoveNet Lightning,
    /// 256 for Thunder).
    #[serde(default = "default_pose_input_size")]
    #[cfg_attr(not(feature = "pose"), allow(dead_code))]
    pub pose_input_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_seconds: default_frame_seconds(),
            hop_ratio: default_hop_ratio(),
            spike_threshold: default_spike_threshold(),
            rise_ratio: default_rise_ratio(),
            ball_hit_zcr: default_ball_hit_zcr(),
            ball_hit_centroid: default_ball_hit_centroid(),
            edge_zcr: default_edge_zcr(),
            music_rms_std: default_music_rms_std(),
            music_rms_mean: default_music_rms_mean(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            pull_offset: default_pull_offset(),
            min_keypoint_score: default_min_keypoint_score(),
            pose_model: None,
            pose_input_size: default_pose_input_size(),
        }
    }
}

fn default_frame_seconds() -> f32 { 0.05 }
fn default_hop_ratio() -> f32 { 0.5 }
fn default_spike_threshold() -> f32 { 0.3 }
fn default_rise_ratio() -> f32 { 1.3 }
fn default_ball_hit_zcr() -> f32 { 0.10 }
fn default_ball_hit_centroid() -> f32 { 3000.0 }
fn default_edge_zcr() -> f32 { 0.08 }
fn default_music_rms_std() -> f32 { 0.03 }
fn default_music_rms_mean() -> f32 { 0.01 }
fn default_pull_offset() -> f32 { 0.1 }
fn default_min_keypoint_score() -> f32 { 0.5 }
fn default_pose_input_size() -> usize { 192 }

/// Explicit `--config` path, or auto-detect snicko.toml / global config.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let local = PathBuf::from("snicko.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("snicko").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("snicko").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}
