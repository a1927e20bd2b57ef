use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use super::decode::FfmpegDecoder;
use super::pose::PoseEstimator;
use super::sampler::{FrameSampler, FrameSource};
use super::shot::{self, ShotRules};
use super::timeline::{ShotTimeline, ShotTimelineBuilder};
use crate::config::VideoConfig;
use crate::error::AnalysisError;

#[derive(Clone, Debug)]
pub struct VideoAnalysis {
    /// Frames decoded from the stream, sampled or not.
    pub total_frames: u64,
    pub timeline: ShotTimeline,
}

/// Sample, estimate and classify until the stream ends. The timeline state
/// is threaded through the loop; nothing outlives the call.
pub fn run_timeline<S: FrameSource>(
    sampler: &mut FrameSampler<S>,
    estimator: &mut dyn PoseEstimator,
    rules: &ShotRules,
    progress: Option<&ProgressBar>,
) -> Result<ShotTimeline, AnalysisError> {
    let mut builder = ShotTimelineBuilder::new(sampler.fps());
    let mut sampled = 0u64;
    let mut posed = 0u64;

    while let Some(frame) = sampler.next() {
        let frame = frame?;
        sampled += 1;

        if let Some(pose) = estimator.estimate(&frame)? {
            posed += 1;
            if let Some(label) = shot::classify_shot(&pose, rules) {
                if let Some(event) = builder.observe(frame.index, label) {
                    log::debug!("Frame {} ({:.2}s): {:?}", event.frame, event.time, event.shot);
                }
            }
        }

        if let Some(pb) = progress {
            pb.set_position(sampler.frames_decoded());
        }
    }

    log::info!(
        "Sampled {} of {} frames (every {}), body found in {}",
        sampled,
        sampler.frames_decoded(),
        sampler.interval(),
        posed
    );
    Ok(builder.finish())
}

pub fn analyze_source<S: FrameSource>(
    source: S,
    estimator: &mut dyn PoseEstimator,
    cfg: &VideoConfig,
) -> Result<VideoAnalysis, AnalysisError> {
    let mut sampler = FrameSampler::new(source)?;
    let rules = ShotRules::from(cfg);

    let progress = sampler.frame_count_hint().map(|total| {
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb
    });

    let timeline = run_timeline(&mut sampler, estimator, &rules, progress.as_ref());
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let timeline = timeline?;
    Ok(VideoAnalysis {
        total_frames: sampler.frames_decoded(),
        timeline,
    })
}

pub fn analyze(
    path: &Path,
    estimator: &mut dyn PoseEstimator,
    cfg: &VideoConfig,
) -> Result<VideoAnalysis> {
    log::info!("Decoding video...");
    let decoder = FfmpegDecoder::open(path)?;
    // The decoder is dropped (and ffmpeg reaped) on every exit path.
    let analysis = analyze_source(decoder, estimator, cfg)?;
    log::info!(
        "Detected {} shot changes over {} frames",
        analysis.timeline.events.len(),
        analysis.total_frames
    );
    Ok(analysis)
}
