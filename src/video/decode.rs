use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use super::sampler::{FrameSource, VideoFrame};
use crate::error::AnalysisError;

/// Geometry and timing of the first video stream.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Parse an ffprobe rational such as `30000/1001`. `0/0` and other
/// degenerate rates yield `None`.
pub fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (rate.trim().parse::<f64>().ok()?, 1.0),
    };
    let fps = num / den;
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn parse_probe(json: &[u8]) -> Result<StreamInfo> {
    let probe: ProbeOutput = serde_json::from_slice(json).context("Failed to parse ffprobe output")?;
    let stream = probe.streams.into_iter().next().context("No video stream found")?;

    let width = stream.width.context("Video stream has no width")?;
    let height = stream.height.context("Video stream has no height")?;
    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .context("Video stream has no usable frame rate")?;
    let frame_count = stream.nb_frames.and_then(|n| n.parse().ok());

    Ok(StreamInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

pub fn probe_video(path: &Path) -> Result<StreamInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .context("Failed to run ffprobe. Is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffprobe failed for {}: {}", path.display(), stderr.trim());
    }

    parse_probe(&output.stdout)
}

/// Streams raw RGB24 frames out of an `ffmpeg` child process.
///
/// The child is reaped when the stream ends, and killed and reaped on drop
/// if the caller abandons it early.
pub struct FfmpegDecoder {
    info: StreamInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    frame_size: usize,
    scratch: Vec<u8>,
    position: u64,
}

impl FfmpegDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
        let info = probe_video(path)?;
        if info.width == 0 || info.height == 0 {
            anyhow::bail!("Video stream has zero size: {}x{}", info.width, info.height);
        }
        let frame_size = info.width as usize * info.height as usize * 3;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        let stdout = child.stdout.take().context("FFmpeg stdout not available")?;
        // Drain stderr on its own thread so a chatty decoder cannot block on a full pipe.
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        log::info!(
            "FFmpeg decoder started: {}x{} @ {:.2}fps, {} frames",
            info.width,
            info.height,
            info.fps,
            info.frame_count.map_or("unknown".to_string(), |n| n.to_string())
        );

        Ok(Self {
            info,
            child: Some(child),
            stdout: Some(stdout),
            stderr,
            frame_size,
            scratch: vec![0; frame_size],
            position: 0,
        })
    }

    /// Fill `scratch` with the next frame. Returns `false` at end of stream.
    fn read_into_scratch(&mut self) -> Result<bool, AnalysisError> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };

        let mut filled = 0;
        while filled < self.frame_size {
            match stdout.read(&mut self.scratch[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(AnalysisError::Decode(format!("Failed to read from ffmpeg: {}", e)))
                }
            }
        }

        if filled == self.frame_size {
            self.position += 1;
            return Ok(true);
        }
        if filled > 0 {
            log::warn!(
                "Discarding truncated frame {} ({} of {} bytes)",
                self.position,
                filled,
                self.frame_size
            );
        }
        self.finish()?;
        Ok(false)
    }

    /// Reap the child after end of stream and surface a failed exit.
    fn finish(&mut self) -> Result<(), AnalysisError> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| AnalysisError::Decode(format!("Failed to wait for ffmpeg: {}", e)))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(AnalysisError::Decode(format!(
                "FFmpeg exited with error: {}",
                stderr.trim()
            )));
        }
        log::info!("FFmpeg decoding complete: {} frames", self.position);
        Ok(())
    }
}

impl FrameSource for FfmpegDecoder {
    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.info.frame_count
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, AnalysisError> {
        let index = self.position;
        if !self.read_into_scratch()? {
            return Ok(None);
        }
        Ok(Some(VideoFrame {
            index,
            width: self.info.width,
            height: self.info.height,
            pixels: self.scratch.clone(),
        }))
    }

    fn skip_frame(&mut self) -> Result<bool, AnalysisError> {
        self.read_into_scratch()
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ntsc_rate() {
        let fps = parse_rate("30000/1001").unwrap();
        assert!((fps - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert_eq!(parse_rate("24"), Some(24.0));
    }

    #[test]
    fn rejects_degenerate_rates() {
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("0/1"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn probe_prefers_average_rate() {
        let json = br#"{"streams":[{"width":1280,"height":720,"avg_frame_rate":"25/1","r_frame_rate":"50/1","nb_frames":"250"}]}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(
            info,
            StreamInfo {
                width: 1280,
                height: 720,
                fps: 25.0,
                frame_count: Some(250),
            }
        );
    }

    #[test]
    fn probe_falls_back_to_real_rate() {
        let json = br#"{"streams":[{"width":640,"height":480,"avg_frame_rate":"0/0","r_frame_rate":"30/1"}]}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.frame_count, None);
    }

    #[test]
    fn probe_without_video_stream_fails() {
        assert!(parse_probe(br#"{"streams":[]}"#).is_err());
        assert!(parse_probe(br#"{}"#).is_err());
    }

    #[test]
    fn missing_file_fails_before_spawning() {
        let err = FfmpegDecoder::open(Path::new("/nonexistent/clip.mp4")).err().unwrap();
        assert!(err.to_string().contains("Input file not found"));
    }
}
