//! Onset strength extraction
//!
//! Converts a mono signal into a per-frame onset-strength series via mel
//! spectral flux: STFT power spectra are pooled through a 40-band mel
//! filterbank, log-compressed, and differenced with half-wave
//! rectification. The series is z-score normalized so downstream
//! thresholds are scale-free.

pub mod spectral_flux;

pub use spectral_flux::compute_onset_strength;

/// STFT frame size in samples
pub const FFT_SIZE: usize = 2048;

/// Hop between consecutive frames in samples
pub const HOP_SIZE: usize = 512;

/// Number of triangular mel bands
pub const MEL_BANDS: usize = 40;

/// Per-frame onset-strength series
#[derive(Debug, Clone, Default)]
pub struct OnsetSeries {
    /// Normalized onset strength, one value per STFT frame
    pub strength: Vec<f32>,
    /// Hop size used during extraction (samples)
    pub hop_size: usize,
    /// FFT size used during extraction (samples)
    pub fft_size: usize,
}

impl OnsetSeries {
    /// Frames per second of this series
    pub fn frame_rate(&self, sample_rate: u32) -> f32 {
        if self.hop_size == 0 {
            return 0.0;
        }
        sample_rate as f32 / self.hop_size as f32
    }
}
