mod audio;
mod cli;
mod config;
mod error;
mod report;
mod video;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use cli::{AudioArgs, Cli, Command, VideoArgs};
use config::Config;
use error::AnalysisError;
use report::{AudioReport, ErrorReport, Payload, VideoReport};

fn main() -> Result<()> {
    // stderr only: stdout carries the JSON result and nothing else
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let cfg = match config::resolve_config_path(cli.config.clone()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("{:#}, using defaults", e);
                Config::default()
            }
        },
        None => Config::default(),
    };

    let (payload, pretty) = match &cli.command {
        Command::Audio(args) => (run_audio(args, &cfg), cli.pretty),
        // Video results are always pretty-printed.
        Command::Video(args) => (run_video(args, &cfg), true),
    };

    match payload {
        Ok(payload) => {
            println!("{}", payload.to_json(pretty)?);
            Ok(())
        }
        Err(missing) => {
            let payload = Payload::Error(ErrorReport::new(missing.to_string()));
            println!("{}", payload.to_json(false)?);
            std::process::exit(1);
        }
    }
}

/// Audio fault boundary. Only a missing path escapes as an error; every
/// other failure becomes an `{error}` payload.
fn run_audio(args: &AudioArgs, cfg: &Config) -> Result<Payload, AnalysisError> {
    let input = args
        .input
        .as_deref()
        .ok_or(AnalysisError::InputMissing { lane: "audio" })?;

    log::info!("snicko - audio contact detection");
    log::info!("Input: {}", input.display());

    Ok(match analyze_audio(input, cfg) {
        Ok(report) => Payload::Audio(report),
        Err(e) => {
            log::error!("Audio processing failed: {:#}", e);
            Payload::Error(ErrorReport::new(format!("Audio processing failed: {:#}", e)))
        }
    })
}

fn analyze_audio(input: &Path, cfg: &Config) -> Result<AudioReport> {
    log::info!("Decoding audio...");
    let waveform = audio::decode::decode_audio(input)?;
    let analysis = audio::analysis::analyze(&waveform, &cfg.audio);
    if let Some(features) = &analysis.features {
        log::info!(
            "Contact {:?}: zcr {:.3}, centroid {:.0}Hz",
            analysis.hit_status,
            features.zcr,
            features.spectral_centroid
        );
    }
    Ok(AudioReport::from(&analysis))
}

/// Video fault boundary, mirroring [`run_audio`].
fn run_video(args: &VideoArgs, cfg: &Config) -> Result<Payload, AnalysisError> {
    let input = args
        .input
        .as_deref()
        .ok_or(AnalysisError::InputMissing { lane: "video" })?;

    log::info!("snicko - batting shot timeline");
    log::info!("Input: {}", input.display());

    Ok(match analyze_video(input, args, cfg) {
        Ok(report) => Payload::Video(report),
        Err(e) => {
            log::error!("Video processing failed: {:#}", e);
            Payload::Error(ErrorReport::new(format!("Video processing failed: {:#}", e)))
        }
    })
}

fn analyze_video(input: &Path, args: &VideoArgs, cfg: &Config) -> Result<VideoReport> {
    let mut estimator = video::pose::open_estimator(
        args.landmarks.as_deref(),
        args.pose_model.as_deref(),
        &cfg.video,
    )?;
    let analysis = video::analysis::analyze(input, estimator.as_mut(), &cfg.video)?;
    Ok(VideoReport::from(analysis))
}
