//! Interleaved PCM sample container

use crate::error::AnalysisError;

/// Interleaved float PCM buffer
///
/// Samples are nominally in [-1.0, 1.0], interleaved by channel. Analysis
/// consumes the buffer read-only; the click overlay mutates the output copy
/// once at the end of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PcmBuffer {
    /// Interleaved samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (>= 1)
    pub channels: u16,
    /// Human-readable title, when the source provides one (e.g. URL streams)
    pub title: Option<String>,
}

impl PcmBuffer {
    /// Create a buffer, validating that the sample count divides evenly
    /// into frames.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `channels` is zero or
    /// `samples.len()` is not a multiple of `channels`.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, AnalysisError> {
        if channels == 0 {
            return Err(AnalysisError::InvalidInput(
                "Channel count must be >= 1".to_string(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Sample count {} is not a multiple of channel count {}",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
            title: None,
        })
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Mix down to mono by averaging all channels per frame
    ///
    /// A buffer that is already mono is returned as a clone. Accumulation
    /// runs in f64 so the mixdown is independent of channel count.
    pub fn to_mono(&self) -> PcmBuffer {
        if self.channels <= 1 {
            return self.clone();
        }

        let channels = self.channels as usize;
        let frames = self.frames();
        let mut mono = Vec::with_capacity(frames);
        for frame in 0..frames {
            let base = frame * channels;
            let mut sum = 0.0f64;
            for ch in 0..channels {
                sum += self.samples[base + ch] as f64;
            }
            mono.push((sum / channels as f64) as f32);
        }

        PcmBuffer {
            samples: mono,
            sample_rate: self.sample_rate,
            channels: 1,
            title: self.title.clone(),
        }
    }
}
