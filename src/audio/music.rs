use super::decode::Waveform;
use super::energy::{frame_rms, Framing};
use crate::config::AudioConfig;

/// Mean and population standard deviation of a value track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RmsStats {
    pub mean: f32,
    pub std_dev: f32,
}

pub fn rms_stats(values: &[f32]) -> RmsStats {
    if values.is_empty() {
        return RmsStats {
            mean: 0.0,
            std_dev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    RmsStats {
        mean: mean as f32,
        std_dev: var.sqrt() as f32,
    }
}

/// Coarse background-music gate over the whole clip.
///
/// Sustained program material shows both a non-trivial mean loudness and a
/// moving envelope; a lone impulse in silence usually fails the mean test.
/// This is a heuristic, not a validated classifier.
pub fn detect_music(waveform: &Waveform, cfg: &AudioConfig) -> bool {
    let global_rms = frame_rms(&waveform.samples, Framing::LIBROSA_DEFAULT);
    let stats = rms_stats(&global_rms);
    log::debug!(
        "Global RMS over {} frames: mean={:.4}, std={:.4}",
        global_rms.len(),
        stats.mean,
        stats.std_dev
    );
    stats.std_dev > cfg.music_rms_std && stats.mean > cfg.music_rms_mean
}
