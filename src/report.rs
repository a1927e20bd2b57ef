use serde::Serialize;
use std::collections::BTreeMap;

use crate::audio::analysis::AudioAnalysis;
use crate::audio::contact::ContactLabel;
use crate::video::analysis::VideoAnalysis;
use crate::video::shot::ShotLabel;
use crate::video::timeline::ShotEvent;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioReport {
    pub spike_detected: bool,
    pub timestamp: Option<f64>,
    pub hit_status: ContactLabel,
    pub music_detected: bool,
}

impl From<&AudioAnalysis> for AudioReport {
    fn from(analysis: &AudioAnalysis) -> Self {
        Self {
            spike_detected: analysis.spike.is_some(),
            timestamp: analysis.spike.map(|s| s.timestamp),
            hit_status: analysis.hit_status,
            music_detected: analysis.music_detected,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotSummary {
    pub total_frames_analyzed: u64,
    pub unique_shots: Vec<ShotLabel>,
    pub shot_frequency: BTreeMap<ShotLabel, usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoReport {
    pub summary: ShotSummary,
    pub detailed_shot_timeline: Vec<ShotEvent>,
}

impl From<VideoAnalysis> for VideoReport {
    fn from(analysis: VideoAnalysis) -> Self {
        let unique_shots = analysis.timeline.unique_shots();
        Self {
            summary: ShotSummary {
                total_frames_analyzed: analysis.total_frames,
                unique_shots,
                shot_frequency: analysis.timeline.frequency,
            },
            detailed_shot_timeline: analysis.timeline.events,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub error: String,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// The single JSON document a subcommand prints.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Audio(AudioReport),
    Video(VideoReport),
    Error(ErrorReport),
}

impl Payload {
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::spike::SpikeEvent;
    use crate::video::timeline::ShotTimelineBuilder;
    use serde_json::json;

    #[test]
    fn audio_report_fields_are_camel_case() {
        let analysis = AudioAnalysis {
            spike: Some(SpikeEvent { index: 39, timestamp: 0.98 }),
            hit_status: ContactLabel::BallHit,
            features: None,
            music_detected: false,
        };
        let value = serde_json::to_value(Payload::Audio(AudioReport::from(&analysis))).unwrap();
        assert_eq!(
            value,
            json!({
                "spikeDetected": true,
                "timestamp": 0.98,
                "hitStatus": "ball_hit",
                "musicDetected": false
            })
        );
    }

    #[test]
    fn no_spike_has_null_timestamp() {
        let analysis = AudioAnalysis {
            spike: None,
            hit_status: ContactLabel::NoContact,
            features: None,
            music_detected: true,
        };
        let json = Payload::Audio(AudioReport::from(&analysis)).to_json(false).unwrap();
        assert_eq!(
            json,
            r#"{"spikeDetected":false,"timestamp":null,"hitStatus":"no_contact","musicDetected":true}"#
        );
    }

    #[test]
    fn video_report_shape() {
        let mut builder = ShotTimelineBuilder::new(30.0);
        builder.observe(0, ShotLabel::PullShot);
        builder.observe(15, ShotLabel::CoverDrive);
        builder.observe(45, ShotLabel::PullShot);
        let analysis = VideoAnalysis {
            total_frames: 90,
            timeline: builder.finish(),
        };
        let value = serde_json::to_value(Payload::Video(VideoReport::from(analysis))).unwrap();
        assert_eq!(
            value,
            json!({
                "summary": {
                    "totalFramesAnalyzed": 90,
                    "uniqueShots": ["cover_drive", "pull_shot"],
                    "shotFrequency": {"cover_drive": 1, "pull_shot": 2}
                },
                "detailedShotTimeline": [
                    {"frame": 0, "time": 0.0, "shot": "pull_shot"},
                    {"frame": 15, "time": 0.5, "shot": "cover_drive"},
                    {"frame": 45, "time": 1.5, "shot": "pull_shot"}
                ]
            })
        );
    }

    #[test]
    fn frequency_sums_to_timeline_length() {
        let mut builder = ShotTimelineBuilder::new(25.0);
        for (i, shot) in [ShotLabel::StraightDrive, ShotLabel::PullShot, ShotLabel::StraightDrive]
            .into_iter()
            .enumerate()
        {
            builder.observe(i as u64 * 12, shot);
        }
        let report = VideoReport::from(VideoAnalysis {
            total_frames: 36,
            timeline: builder.finish(),
        });
        assert_eq!(
            report.summary.shot_frequency.values().sum::<usize>(),
            report.detailed_shot_timeline.len()
        );
    }

    #[test]
    fn error_payload_is_a_single_field() {
        let json = Payload::Error(ErrorReport::new("Missing audio file path"))
            .to_json(false)
            .unwrap();
        assert_eq!(json, r#"{"error":"Missing audio file path"}"#);
    }

    #[test]
    fn pretty_output_spans_lines() {
        let json = Payload::Error(ErrorReport::new("x")).to_json(true).unwrap();
        assert!(json.contains('\n'));
    }
}
