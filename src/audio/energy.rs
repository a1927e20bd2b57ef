use rayon::prelude::*;

use super::decode::Waveform;
use crate::error::AnalysisError;

/// How a waveform is sliced into analysis windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Framing {
    pub frame_length: usize,
    pub hop_length: usize,
    /// Zero-pad `frame_length / 2` samples on both ends before framing, so
    /// frame `i` is centred on sample `i * hop_length`.
    pub centered: bool,
}

impl Framing {
    /// Window and hop used by librosa's frame-based features when no
    /// explicit lengths are given.
    pub const LIBROSA_DEFAULT: Framing = Framing {
        frame_length: 2048,
        hop_length: 512,
        centered: true,
    };

    /// Short, uncentered framing for onset detection: `frame_seconds` long
    /// windows advancing by `hop_ratio` of a window. Both lengths are
    /// truncated, so 22050Hz gives 1102/551 rather than 1103/552.
    pub fn spike(sample_rate: u32, frame_seconds: f32, hop_ratio: f32) -> Self {
        let frame_length = truncate_len(f64::from(sample_rate) * f64::from(frame_seconds));
        let hop_length = truncate_len(frame_length as f64 * f64::from(hop_ratio));
        Self {
            frame_length,
            hop_length,
            centered: false,
        }
    }

    pub fn frame_count(&self, num_samples: usize) -> usize {
        let padded = if self.centered {
            num_samples + 2 * (self.frame_length / 2)
        } else {
            num_samples
        };
        if padded < self.frame_length {
            0
        } else {
            (padded - self.frame_length) / self.hop_length + 1
        }
    }
}

/// `f32` config values sit a hair above their decimal (0.05f32 is
/// 0.0500000007), so nudge before truncating to keep whole products whole.
fn truncate_len(samples: f64) -> usize {
    ((samples + 1e-6).floor() as usize).max(1)
}

/// Per-frame RMS normalized to the loudest frame.
#[derive(Clone, Debug)]
pub struct EnergyProfile {
    pub values: Vec<f32>,
    pub framing: Framing,
}

/// Root-mean-square amplitude of every frame, in frame order.
pub fn frame_rms(samples: &[f32], framing: Framing) -> Vec<f32> {
    let n = framing.frame_count(samples.len());
    if n == 0 {
        return Vec::new();
    }

    let padded;
    let source: &[f32] = if framing.centered {
        let pad = framing.frame_length / 2;
        let mut buf = vec![0.0f32; samples.len() + 2 * pad];
        buf[pad..pad + samples.len()].copy_from_slice(samples);
        padded = buf;
        &padded
    } else {
        samples
    };

    (0..n)
        .into_par_iter()
        .map(|i| {
            let start = i * framing.hop_length;
            rms(&source[start..start + framing.frame_length])
        })
        .collect()
}

pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_sq / frame.len() as f64).sqrt() as f32
}

/// Build the normalized energy profile used for spike detection.
///
/// A waveform shorter than one frame yields an empty profile. A waveform
/// whose frames are all silent fails with [`AnalysisError::DegenerateSignal`]
/// instead of dividing by zero.
pub fn extract_energy(
    waveform: &Waveform,
    frame_seconds: f32,
    hop_ratio: f32,
) -> Result<EnergyProfile, AnalysisError> {
    let framing = Framing::spike(waveform.sample_rate, frame_seconds, hop_ratio);
    let mut values = frame_rms(&waveform.samples, framing);

    if values.is_empty() {
        return Ok(EnergyProfile { values, framing });
    }

    let peak = values.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 || !peak.is_finite() {
        return Err(AnalysisError::DegenerateSignal);
    }
    for v in values.iter_mut() {
        *v /= peak;
    }

    log::debug!(
        "Energy profile: {} frames (frame={}, hop={})",
        values.len(),
        framing.frame_length,
        framing.hop_length
    );

    Ok(EnergyProfile { values, framing })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spike_framing_at_16k() {
        let f = Framing::spike(16000, 0.05, 0.5);
        assert_eq!(f.frame_length, 800);
        assert_eq!(f.hop_length, 400);
        assert!(!f.centered);
    }

    #[test]
    fn spike_framing_truncates_at_common_rates() {
        let lengths = |sr| {
            let f = Framing::spike(sr, 0.05, 0.5);
            (f.frame_length, f.hop_length)
        };
        assert_eq!(lengths(44100), (2205, 1102));
        assert_eq!(lengths(22050), (1102, 551));
        assert_eq!(lengths(48000), (2400, 1200));
        assert_eq!(lengths(8000), (400, 200));
        assert_eq!(lengths(11025), (551, 275));
    }

    #[test]
    fn profile_length_matches_uncentered_formula() {
        let wf = Waveform::new(vec![0.5; 16_000 + 123], 16000);
        let profile = extract_energy(&wf, 0.05, 0.5).unwrap();
        assert_eq!(profile.values.len(), (16_123 - 800) / 400 + 1);
    }

    #[test]
    fn profile_is_normalized() {
        let mut samples = vec![0.1f32; 4000];
        samples.extend(vec![0.8f32; 4000]);
        let wf = Waveform::new(samples, 16000);
        let profile = extract_energy(&wf, 0.05, 0.5).unwrap();
        let max = profile.values.iter().copied().fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        assert!(profile.values.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!((profile.values[0] - 0.125).abs() < 1e-5);
    }

    #[test]
    fn silence_is_degenerate() {
        let wf = Waveform::new(vec![0.0; 8000], 16000);
        assert!(matches!(
            extract_energy(&wf, 0.05, 0.5),
            Err(AnalysisError::DegenerateSignal)
        ));
    }

    #[test]
    fn shorter_than_one_frame_is_empty() {
        let wf = Waveform::new(vec![0.3; 100], 16000);
        let profile = extract_energy(&wf, 0.05, 0.5).unwrap();
        assert!(profile.values.is_empty());
    }

    #[test]
    fn centered_framing_pads_both_ends() {
        let framing = Framing::LIBROSA_DEFAULT;
        assert_eq!(framing.frame_count(0), 1);
        assert_eq!(framing.frame_count(22050), 1 + 22050 / 512);

        // A constant signal loses energy only in the padded edge frames.
        let values = frame_rms(&vec![1.0; 8192], framing);
        assert_eq!(values.len(), 17);
        assert!((values[0] - 0.5f32.sqrt()).abs() < 1e-4);
        assert!((values[8] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rms_of_alternating_unit_signal() {
        let frame: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&frame) - 1.0).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }
}
