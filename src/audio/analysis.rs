use super::contact::{self, ContactLabel, ContactThresholds};
use super::decode::Waveform;
use super::energy::{self, Framing};
use super::features::ContactFeatures;
use super::music;
use super::spike::{self, SpikeEvent};
use crate::config::AudioConfig;
use crate::error::AnalysisError;

/// Everything the audio lane learned about one clip.
#[derive(Clone, Debug)]
pub struct AudioAnalysis {
    pub spike: Option<SpikeEvent>,
    pub hit_status: ContactLabel,
    /// Present only when a spike was found.
    pub features: Option<ContactFeatures>,
    pub music_detected: bool,
}

pub fn analyze(waveform: &Waveform, cfg: &AudioConfig) -> AudioAnalysis {
    log::info!("Pass 1: Spike detection...");
    let framing = Framing::spike(waveform.sample_rate, cfg.frame_seconds, cfg.hop_ratio);
    let spike = match energy::extract_energy(waveform, cfg.frame_seconds, cfg.hop_ratio) {
        Ok(profile) => {
            spike::detect_spike(&profile, waveform.sample_rate, cfg.spike_threshold, cfg.rise_ratio)
        }
        Err(AnalysisError::DegenerateSignal) => {
            log::info!("Silent input, no spike possible");
            None
        }
        Err(e) => {
            log::warn!("Energy extraction failed: {}", e);
            None
        }
    };
    match spike {
        Some(s) => log::info!("Spike at frame {} ({:.2}s)", s.index, s.timestamp),
        None => log::info!("No spike found"),
    }

    log::info!("Pass 2: Contact classification...");
    let thresholds = ContactThresholds::from(cfg);
    let (hit_status, features) =
        contact::classify_spike(waveform, spike.as_ref(), framing, &thresholds);

    log::info!("Pass 3: Background music check...");
    let music_detected = music::detect_music(waveform, cfg);

    log::info!("Result: contact={:?}, music={}", hit_status, music_detected);

    AudioAnalysis {
        spike,
        hit_status,
        features,
        music_detected,
    }
}
