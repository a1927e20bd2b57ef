use serde::Serialize;
use std::collections::BTreeMap;

use super::shot::ShotLabel;
use crate::audio::spike::round_centis;

/// A change of shot, stamped at the first sampled frame showing it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShotEvent {
    pub frame: u64,
    pub time: f64,
    pub shot: ShotLabel,
}

/// Debouncing state machine: only transitions between labels are recorded.
#[derive(Debug)]
pub struct ShotTimelineBuilder {
    fps: f64,
    last_shot: Option<ShotLabel>,
    events: Vec<ShotEvent>,
}

impl ShotTimelineBuilder {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            last_shot: None,
            events: Vec::new(),
        }
    }

    /// Feed the label of one sampled frame. Returns the new event when the
    /// label differs from the previous one.
    pub fn observe(&mut self, frame: u64, shot: ShotLabel) -> Option<&ShotEvent> {
        if self.last_shot == Some(shot) {
            return None;
        }
        self.last_shot = Some(shot);
        self.events.push(ShotEvent {
            frame,
            time: round_centis(frame as f64 / self.fps),
            shot,
        });
        self.events.last()
    }

    pub fn finish(self) -> ShotTimeline {
        let mut frequency: BTreeMap<ShotLabel, usize> = BTreeMap::new();
        for event in &self.events {
            *frequency.entry(event.shot).or_default() += 1;
        }
        ShotTimeline {
            events: self.events,
            frequency,
        }
    }
}

/// Emitted events plus per-label counts. Counts are over transitions, not
/// over every classified frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShotTimeline {
    pub events: Vec<ShotEvent>,
    pub frequency: BTreeMap<ShotLabel, usize>,
}

impl ShotTimeline {
    pub fn unique_shots(&self) -> Vec<ShotLabel> {
        self.frequency.keys().copied().collect()
    }
}
