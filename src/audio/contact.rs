use serde::Serialize;

use super::decode::Waveform;
use super::energy::Framing;
use super::features::{self, ContactFeatures};
use super::spike::SpikeEvent;
use crate::config::AudioConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactLabel {
    BallHit,
    EdgeOrGlove,
    UnclearNoise,
    NoContact,
}

/// Decision boundaries for [`classify`]. Hand-tuned, not learned.
#[derive(Clone, Copy, Debug)]
pub struct ContactThresholds {
    pub ball_hit_zcr: f32,
    pub ball_hit_centroid: f32,
    pub edge_zcr: f32,
}

impl Default for ContactThresholds {
    fn default() -> Self {
        Self {
            ball_hit_zcr: 0.10,
            ball_hit_centroid: 3000.0,
            edge_zcr: 0.08,
        }
    }
}

impl From<&AudioConfig> for ContactThresholds {
    fn from(cfg: &AudioConfig) -> Self {
        Self {
            ball_hit_zcr: cfg.ball_hit_zcr,
            ball_hit_centroid: cfg.ball_hit_centroid,
            edge_zcr: cfg.edge_zcr,
        }
    }
}

/// First matching rule wins: bright and noisy is a clean hit, noisy alone
/// is an edge or glove, anything else is unclear.
pub fn classify(features: &ContactFeatures, thresholds: &ContactThresholds) -> ContactLabel {
    if features.zcr > thresholds.ball_hit_zcr
        && features.spectral_centroid > thresholds.ball_hit_centroid
    {
        ContactLabel::BallHit
    } else if features.zcr > thresholds.edge_zcr {
        ContactLabel::EdgeOrGlove
    } else {
        ContactLabel::UnclearNoise
    }
}

/// The spike window `[index * hop, index * hop + frame_length)`, clipped to
/// the end of the waveform.
pub fn spike_segment<'a>(waveform: &'a Waveform, spike: &SpikeEvent, framing: Framing) -> &'a [f32] {
    let len = waveform.samples.len();
    let start = (spike.index * framing.hop_length).min(len);
    let end = (start + framing.frame_length).min(len);
    &waveform.samples[start..end]
}

/// Label the contact at `spike`. Without a spike no features are computed.
pub fn classify_spike(
    waveform: &Waveform,
    spike: Option<&SpikeEvent>,
    framing: Framing,
    thresholds: &ContactThresholds,
) -> (ContactLabel, Option<ContactFeatures>) {
    let Some(spike) = spike else {
        return (ContactLabel::NoContact, None);
    };
    let segment = spike_segment(waveform, spike, framing);
    let features = features::extract(segment, waveform.sample_rate);
    (classify(&features, thresholds), Some(features))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(zcr: f32, spectral_centroid: f32) -> ContactFeatures {
        ContactFeatures {
            zcr,
            spectral_centroid,
            mfcc_mean: 0.0,
        }
    }

    #[test]
    fn rules_apply_in_order() {
        let t = ContactThresholds::default();
        assert_eq!(classify(&features(0.2, 4000.0), &t), ContactLabel::BallHit);
        assert_eq!(classify(&features(0.2, 2000.0), &t), ContactLabel::EdgeOrGlove);
        assert_eq!(classify(&features(0.09, 9000.0), &t), ContactLabel::EdgeOrGlove);
        assert_eq!(classify(&features(0.05, 9000.0), &t), ContactLabel::UnclearNoise);
    }

    #[test]
    fn boundaries_are_exclusive() {
        let t = ContactThresholds::default();
        assert_eq!(classify(&features(0.10, 5000.0), &t), ContactLabel::EdgeOrGlove);
        assert_eq!(classify(&features(0.2, 3000.0), &t), ContactLabel::EdgeOrGlove);
        assert_eq!(classify(&features(0.08, 5000.0), &t), ContactLabel::UnclearNoise);
    }

    #[test]
    fn classifier_is_total_over_feature_grid() {
        let t = ContactThresholds::default();
        for zi in 0..=50 {
            for ci in 0..=40 {
                let label = classify(&features(zi as f32 * 0.01, ci as f32 * 250.0), &t);
                assert_ne!(label, ContactLabel::NoContact);
            }
        }
    }

    #[test]
    fn no_spike_means_no_contact() {
        let wf = Waveform::new(vec![0.5; 1600], 16000);
        let framing = Framing::spike(16000, 0.05, 0.5);
        let (label, feats) = classify_spike(&wf, None, framing, &ContactThresholds::default());
        assert_eq!(label, ContactLabel::NoContact);
        assert!(feats.is_none());
    }

    #[test]
    fn bright_noisy_spike_is_a_ball_hit() {
        let samples: Vec<f32> = (0..4000).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
        let wf = Waveform::new(samples, 16000);
        let framing = Framing::spike(16000, 0.05, 0.5);
        let spike = SpikeEvent {
            index: 2,
            timestamp: 0.05,
        };
        let (label, feats) =
            classify_spike(&wf, Some(&spike), framing, &ContactThresholds::default());
        assert_eq!(label, ContactLabel::BallHit);
        assert!(feats.unwrap().spectral_centroid > 3000.0);
    }

    #[test]
    fn segment_is_clipped_to_waveform() {
        let wf = Waveform::new(vec![0.1; 1000], 16000);
        let framing = Framing::spike(16000, 0.05, 0.5);
        let spike = SpikeEvent {
            index: 2,
            timestamp: 0.05,
        };
        assert_eq!(spike_segment(&wf, &spike, framing).len(), 200);
    }

    #[test]
    fn labels_serialize_snake_case() {
        assert_eq!(serde_json::to_string(&ContactLabel::BallHit).unwrap(), "\"ball_hit\"");
        assert_eq!(
            serde_json::to_string(&ContactLabel::EdgeOrGlove).unwrap(),
            "\"edge_or_glove\""
        );
        assert_eq!(serde_json::to_string(&ContactLabel::NoContact).unwrap(), "\"no_contact\"");
    }
}
