use crate::error::AnalysisError;

/// One decoded picture, packed RGB24, row-major. Only pose inference reads
/// the pixels.
#[derive(Clone, Debug)]
#[cfg_attr(not(feature = "pose"), allow(dead_code))]
pub struct VideoFrame {
    /// Position of the frame in the stream, starting at 0.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// An ordered stream of decoded frames.
pub trait FrameSource {
    fn fps(&self) -> f64;

    /// Total frame count, when the container reports one.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }

    /// Decode the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, AnalysisError>;

    /// Decode the next frame and throw its pixels away. Returns `false` at
    /// end of stream.
    fn skip_frame(&mut self) -> Result<bool, AnalysisError>;
}

/// Every `frame_interval`-th frame, so at least two samples per second of
/// video survive.
pub fn frame_interval(fps: f64) -> u64 {
    ((fps / 2.0).floor() as u64).max(1)
}

/// Lazily yields frames `0, k, 2k, …` of a [`FrameSource`]. Frames in
/// between are still decoded and counted. Not restartable: once the stream
/// ends or errors the sampler stays exhausted.
pub struct FrameSampler<S> {
    source: S,
    interval: u64,
    decoded: u64,
    done: bool,
}

impl<S: FrameSource> FrameSampler<S> {
    pub fn new(source: S) -> Result<Self, AnalysisError> {
        let fps = source.fps();
        if !fps.is_finite() || fps <= 0.0 {
            return Err(AnalysisError::Decode(format!("Invalid frame rate: {}", fps)));
        }
        Ok(Self {
            interval: frame_interval(fps),
            source,
            decoded: 0,
            done: false,
        })
    }

    pub fn fps(&self) -> f64 {
        self.source.fps()
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Frames pulled from the source so far, sampled or skipped.
    pub fn frames_decoded(&self) -> u64 {
        self.decoded
    }

    pub fn frame_count_hint(&self) -> Option<u64> {
        self.source.frame_count_hint()
    }

    fn stop<T>(&mut self, item: Option<T>) -> Option<T> {
        self.done = true;
        item
    }
}

impl<S: FrameSource> Iterator for FrameSampler<S> {
    type Item = Result<VideoFrame, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.decoded % self.interval == 0 {
                return match self.source.next_frame() {
                    Ok(Some(frame)) => {
                        self.decoded += 1;
                        Some(Ok(frame))
                    }
                    Ok(None) => self.stop(None),
                    Err(e) => self.stop(Some(Err(e))),
                };
            }
            match self.source.skip_frame() {
                Ok(true) => self.decoded += 1,
                Ok(false) => return self.stop(None),
                Err(e) => return self.stop(Some(Err(e))),
            }
        }
    }
}
