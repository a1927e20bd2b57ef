use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snicko", about = "Bat/ball contact and batting-shot detector for cricket clips")]
pub struct Cli {
    /// Config file (defaults to ./snicko.toml or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect the contact spike in an audio clip
    Audio(AudioArgs),
    /// Build the batting-shot timeline of a video clip
    Video(VideoArgs),
}

#[derive(Args, Debug)]
pub struct AudioArgs {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VideoArgs {
    /// Input video file (anything ffmpeg can decode)
    pub input: Option<PathBuf>,

    /// Precomputed pose landmarks (JSON, keyed by frame index)
    #[arg(long)]
    pub landmarks: Option<PathBuf>,

    /// MoveNet ONNX model (requires the `pose` feature)
    #[arg(long)]
    pub pose_model: Option<PathBuf>,
}
