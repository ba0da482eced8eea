//! Chromagram extraction with per-octave normalization
//!
//! Spectral power between C2 and C7 is distributed across the 12 pitch
//! classes, accumulated per octave. Each octave is L1-normalized
//! independently before averaging, so a loud upper octave full of
//! harmonics cannot dominate the tonic content of the low register.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::AnalysisError;
use crate::io::pcm::PcmBuffer;

/// FFT size for chroma extraction
pub const CHROMA_FFT_SIZE: usize = 4096;

/// Hop size; no overlap
pub const CHROMA_HOP_SIZE: usize = 4096;

/// Lowest analyzed frequency (C2)
const MIN_FREQ_HZ: f32 = 65.4;

/// Highest analyzed frequency (C7)
const MAX_FREQ_HZ: f32 = 2093.0;

/// Reference pitch: C0 in Hz
const C0_HZ: f32 = 16.3516;

/// How one FFT bin maps onto the chroma circle
#[derive(Debug, Clone, Copy)]
struct BinMapping {
    chroma_lo: usize,
    chroma_hi: usize,
    weight_hi: f32,
    octave: usize,
}

/// Compute a 12-bin chromagram of a mono signal
///
/// # Arguments
///
/// * `mono` - Mono PCM buffer
///
/// # Returns
///
/// 12-element chroma vector (C at index 0), averaged over all octaves
/// whose energy is non-negligible. An input shorter than one FFT frame
/// yields all zeros.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the buffer is not mono or has
/// a zero sample rate.
pub fn compute_chromagram(mono: &PcmBuffer) -> Result<[f32; 12], AnalysisError> {
    if mono.channels != 1 {
        return Err(AnalysisError::InvalidInput(format!(
            "Chroma extraction expects mono audio, got {} channels",
            mono.channels
        )));
    }
    if mono.sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Chroma extraction requires a positive sample rate".to_string(),
        ));
    }

    let mut chroma = [0.0f32; 12];
    if mono.samples.len() < CHROMA_FFT_SIZE {
        return Ok(chroma);
    }

    let denom = (CHROMA_FFT_SIZE - 1) as f32;
    let window: Vec<f32> = (0..CHROMA_FFT_SIZE)
        .map(|i| 0.5 - 0.5 * (std::f32::consts::TAU * i as f32 / denom).cos())
        .collect();

    // Octave span covered by the analyzed frequency range.
    let min_pitch = 12.0 * (MIN_FREQ_HZ / C0_HZ).log2();
    let min_octave = (min_pitch / 12.0).floor() as i32;
    let max_pitch = 12.0 * (MAX_FREQ_HZ / C0_HZ).log2();
    let max_octave = (max_pitch / 12.0).floor() as i32;
    let n_octaves = (max_octave - min_octave + 1) as usize;

    // Precompute the interpolated bin-to-chroma mapping. Splitting each
    // bin's power between the two nearest pitch classes avoids systematic
    // bias at low frequencies where bin spacing exceeds a semitone.
    let num_bins = CHROMA_FFT_SIZE / 2 + 1;
    let sr = mono.sample_rate as f32;
    let mut bin_map: Vec<Option<BinMapping>> = vec![None; num_bins];
    for (k, slot) in bin_map.iter_mut().enumerate().skip(1) {
        let freq = k as f32 * sr / CHROMA_FFT_SIZE as f32;
        if !(MIN_FREQ_HZ..=MAX_FREQ_HZ).contains(&freq) {
            continue;
        }
        let pitch = 12.0 * (freq / C0_HZ).log2();
        let pitch_floor = pitch.floor();
        let frac = pitch - pitch_floor;
        let pc_lo = (pitch_floor as i32).rem_euclid(12) as usize;
        let octave = ((pitch / 12.0).floor() as i32 - min_octave).clamp(0, n_octaves as i32 - 1);
        *slot = Some(BinMapping {
            chroma_lo: pc_lo,
            chroma_hi: (pc_lo + 1) % 12,
            weight_hi: frac,
            octave: octave as usize,
        });
    }

    let mut octave_chroma = vec![[0.0f64; 12]; n_octaves];

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(CHROMA_FFT_SIZE);
    let mut frame = vec![Complex::new(0.0f64, 0.0f64); CHROMA_FFT_SIZE];

    let num_frames = 1 + (mono.samples.len() - CHROMA_FFT_SIZE) / CHROMA_HOP_SIZE;
    for frame_idx in 0..num_frames {
        let offset = frame_idx * CHROMA_HOP_SIZE;
        for i in 0..CHROMA_FFT_SIZE {
            frame[i] = Complex::new((mono.samples[offset + i] * window[i]) as f64, 0.0);
        }

        fft.process(&mut frame);

        for k in 1..CHROMA_FFT_SIZE / 2 {
            if let Some(m) = bin_map[k] {
                let power = frame[k].re * frame[k].re + frame[k].im * frame[k].im;
                let oc = &mut octave_chroma[m.octave];
                oc[m.chroma_lo] += power * (1.0 - m.weight_hi) as f64;
                oc[m.chroma_hi] += power * m.weight_hi as f64;
            }
        }
    }

    // Normalize each octave independently, then average the contributing
    // octaves. Near-silent octaves are skipped entirely.
    let mut contributing = 0usize;
    for oc in &octave_chroma {
        let total: f64 = oc.iter().sum();
        if total < 1e-12 {
            continue;
        }
        for (i, &v) in oc.iter().enumerate() {
            chroma[i] += (v / total) as f32;
        }
        contributing += 1;
    }
    if contributing > 0 {
        let scale = 1.0 / contributing as f32;
        for v in &mut chroma {
            *v *= scale;
        }
    }

    log::debug!(
        "Chromagram from {} frames, {} contributing octave(s)",
        num_frames,
        contributing
    );

    Ok(chroma)
}
