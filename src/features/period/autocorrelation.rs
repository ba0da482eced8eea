//! Autocorrelation tempo estimation with octave correction
//!
//! # Algorithm
//!
//! 1. Lag-domain autocorrelation of the onset-strength series, normalized
//!    by the overlap count so longer lags are not systematically
//!    penalized.
//! 2. Log-Gaussian tempo prior centered at 120 BPM (sigma = one octave)
//!    applied multiplicatively.
//! 3. Iterative octave correction: autocorrelation always peaks at integer
//!    multiples of the true period, so the lag is repeatedly halved while
//!    the half-lag peak is genuine (above the median noise floor and at
//!    least half the parent's weighted score).
//! 4. Hard half-tempo safety above 200 BPM.
//! 5. Parabolic interpolation on the raw autocorrelation for sub-lag BPM
//!    precision.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use super::{bpm_from_lag, TempoEstimate};
use crate::error::AnalysisError;

/// Tempo prior center in BPM
const PRIOR_CENTER_BPM: f64 = 120.0;

/// Tempo prior width in octaves
const PRIOR_SIGMA_OCTAVES: f64 = 1.0;

/// BPM above which the primary lag is doubled when possible
const HALF_TEMPO_CEILING_BPM: f32 = 200.0;

/// Maximum number of candidate periods returned for arbitration
const MAX_CANDIDATES: usize = 5;

/// Estimate the global tempo of an onset-strength series
///
/// # Arguments
///
/// * `onset_strength` - Normalized onset strengths, one per frame
/// * `sample_rate` - Audio sample rate in Hz
/// * `hop_size` - Hop between onset frames in samples
/// * `min_bpm` / `max_bpm` - Inclusive tempo search bounds
///
/// # Returns
///
/// [`TempoEstimate`] with the refined BPM, the winning integer period and
/// up to 5 candidate periods (primary first). Returns an empty estimate
/// when the series is too short or the lag range collapses.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or hop
/// size.
pub fn estimate_tempo(
    onset_strength: &[f32],
    sample_rate: u32,
    hop_size: usize,
    min_bpm: f32,
    max_bpm: f32,
) -> Result<TempoEstimate, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Tempo estimation requires a positive sample rate".to_string(),
        ));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Tempo estimation requires a positive hop size".to_string(),
        ));
    }
    if onset_strength.len() < 2 {
        log::warn!(
            "Too few onset frames for tempo estimation: {}",
            onset_strength.len()
        );
        return Ok(TempoEstimate::default());
    }

    let frame_rate = sample_rate as f32 / hop_size as f32;
    let min_bpm = min_bpm.max(1.0);
    let max_bpm = max_bpm.max(min_bpm + 1.0);

    let max_lag = ((60.0 * frame_rate / min_bpm).floor() as usize).min(onset_strength.len() - 1);
    let min_lag = ((60.0 * frame_rate / max_bpm).ceil() as usize).max(1);

    if max_lag <= min_lag {
        log::warn!(
            "Empty lag range [{}, {}] for BPM range [{:.1}, {:.1}]",
            min_lag,
            max_lag,
            min_bpm,
            max_bpm
        );
        return Ok(TempoEstimate::default());
    }

    // Overlap-normalized autocorrelation, f64 accumulation in ascending
    // index order for reproducibility.
    let n = onset_strength.len();
    let mut autocorr = vec![0.0f64; max_lag + 1];
    for lag in min_lag..=max_lag {
        let mut sum = 0.0f64;
        for i in lag..n {
            sum += onset_strength[i] as f64 * onset_strength[i - lag] as f64;
        }
        autocorr[lag] = sum / (n - lag) as f64;
    }

    // Apply the log-Gaussian prior and find the best weighted lag.
    let mut weighted = vec![0.0f64; max_lag + 1];
    let mut best_lag = min_lag;
    let mut best_score = f64::NEG_INFINITY;
    for lag in min_lag..=max_lag {
        let bpm = bpm_from_lag(lag, frame_rate);
        if bpm <= 0.0 {
            continue;
        }
        let log_ratio = (bpm as f64 / PRIOR_CENTER_BPM).log2();
        let prior =
            (-0.5 * log_ratio * log_ratio / (PRIOR_SIGMA_OCTAVES * PRIOR_SIGMA_OCTAVES)).exp();
        weighted[lag] = autocorr[lag] * prior;
        if weighted[lag] > best_score {
            best_score = weighted[lag];
            best_lag = lag;
        }
    }

    // Silence produces an identically zero weighted curve; there is no
    // tempo to report and downstream stages short-circuit on the empty
    // estimate.
    if best_score <= 0.0 {
        log::warn!("No positive autocorrelation peak in lag range");
        return Ok(TempoEstimate::default());
    }

    log_top_peaks(&weighted, min_lag, max_lag, frame_rate);

    // Median weighted score over the search range as a noise floor.
    let mut sorted: Vec<f64> = weighted[min_lag..=max_lag].to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = sorted[sorted.len() / 2];

    // Iterative octave correction: prefer the fastest tempo whose
    // half-lag peak is genuine.
    loop {
        let half_center = best_lag / 2;
        let search_lo = half_center.saturating_sub(2).max(min_lag);
        let search_hi = (half_center + 2).min(max_lag);
        if search_lo > search_hi || search_hi < min_lag {
            break;
        }

        let mut half_lag = search_lo;
        let mut half_score = f64::NEG_INFINITY;
        for lag in search_lo..=search_hi {
            if weighted[lag] > half_score {
                half_score = weighted[lag];
                half_lag = lag;
            }
        }

        if half_lag >= best_lag {
            break;
        }
        let parent_score = weighted[best_lag];
        if half_score > median && half_score > 0.5 * parent_score {
            log::debug!(
                "Octave correction: lag {} ({:.1} BPM) -> lag {} ({:.1} BPM), ratio {:.3}",
                best_lag,
                bpm_from_lag(best_lag, frame_rate),
                half_lag,
                bpm_from_lag(half_lag, frame_rate),
                if parent_score > 0.0 {
                    half_score / parent_score
                } else {
                    0.0
                }
            );
            best_lag = half_lag;
        } else {
            break;
        }
    }

    // Half-tempo safety: above 200 BPM the estimate is almost certainly a
    // doubled tempo.
    if bpm_from_lag(best_lag, frame_rate) > HALF_TEMPO_CEILING_BPM && 2 * best_lag <= max_lag {
        log::debug!(
            "Half-tempo correction: {:.1} BPM -> {:.1} BPM",
            bpm_from_lag(best_lag, frame_rate),
            bpm_from_lag(2 * best_lag, frame_rate)
        );
        best_lag *= 2;
    }

    let refined_lag = parabolic_interpolate(&autocorr, best_lag, min_lag, max_lag);
    let bpm = (60.0 * frame_rate as f64 / refined_lag) as f32;

    let candidate_periods = collect_candidates(&weighted, min_lag, max_lag, best_lag);

    log::debug!(
        "Tempo estimate: {:.2} BPM (lag {}, refined {:.3}), {} candidates",
        bpm,
        best_lag,
        refined_lag,
        candidate_periods.len()
    );

    Ok(TempoEstimate {
        bpm,
        period_frames: best_lag,
        candidate_periods,
    })
}

/// Parabolic interpolation around `peak`, on the raw autocorrelation
///
/// Returns the fractional lag of the true maximum; falls back to the
/// integer peak at range boundaries or degenerate curvature.
fn parabolic_interpolate(data: &[f64], peak: usize, lo: usize, hi: usize) -> f64 {
    if peak <= lo || peak >= hi {
        return peak as f64;
    }
    let a = data[peak - 1];
    let b = data[peak];
    let c = data[peak + 1];
    let denom = a - 2.0 * b + c;
    if denom.abs() < 1e-12 {
        return peak as f64;
    }
    let delta = 0.5 * (a - c) / denom;
    peak as f64 + delta
}

/// Collect up to 5 unique candidate periods, primary first
///
/// Non-primary candidates are the strongest local maxima of the weighted
/// curve inside the search range.
fn collect_candidates(
    weighted: &[f64],
    min_lag: usize,
    max_lag: usize,
    primary: usize,
) -> Vec<usize> {
    let mut peaks: Vec<(f64, usize)> = Vec::new();
    for lag in min_lag..=max_lag {
        let left = if lag > min_lag {
            weighted[lag - 1]
        } else {
            f64::NEG_INFINITY
        };
        let right = if lag < max_lag {
            weighted[lag + 1]
        } else {
            f64::NEG_INFINITY
        };
        if weighted[lag] > left && weighted[lag] >= right {
            peaks.push((weighted[lag], lag));
        }
    }
    peaks.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut candidates = vec![primary];
    for (_, lag) in peaks {
        if candidates.len() >= MAX_CANDIDATES {
            break;
        }
        if !candidates.contains(&lag) {
            candidates.push(lag);
        }
    }
    candidates
}

/// Trace the strongest weighted peaks for diagnostics
fn log_top_peaks(weighted: &[f64], min_lag: usize, max_lag: usize, frame_rate: f32) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let mut peaks: Vec<(f64, usize)> = (min_lag..=max_lag).map(|l| (weighted[l], l)).collect();
    peaks.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    log::debug!("Tempo candidates (top 10 weighted peaks):");
    for (score, lag) in peaks.iter().take(10) {
        log::debug!(
            "  lag={} bpm={:.2} weighted={:.6}",
            lag,
            bpm_from_lag(*lag, frame_rate),
            score
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic onset envelope with a unit impulse every `period` frames
    fn impulse_onsets(frames: usize, period: usize) -> Vec<f32> {
        let mut onsets = vec![0.0f32; frames];
        let mut i = 0;
        while i < frames {
            onsets[i] = 1.0;
            i += period;
        }
        onsets
    }

    #[test]
    fn test_estimate_120_bpm() {
        // 44100 / 512 = 86.13 fps; 120 BPM -> period ~= 43 frames.
        let onsets = impulse_onsets(2000, 43);
        let tempo = estimate_tempo(&onsets, 44100, 512, 50.0, 220.0).unwrap();
        assert!(!tempo.is_empty());
        assert!(
            (tempo.bpm - 120.0).abs() < 2.5,
            "expected ~120 BPM, got {:.2}",
            tempo.bpm
        );
        assert_eq!(tempo.period_frames, 43);
    }

    #[test]
    fn test_invalid_params() {
        let onsets = vec![0.0f32; 100];
        assert!(estimate_tempo(&onsets, 0, 512, 50.0, 220.0).is_err());
        assert!(estimate_tempo(&onsets, 44100, 0, 50.0, 220.0).is_err());
    }

    #[test]
    fn test_too_few_frames_empty_result() {
        let tempo = estimate_tempo(&[1.0], 44100, 512, 50.0, 220.0).unwrap();
        assert!(tempo.is_empty());
        assert!(tempo.candidate_periods.is_empty());
    }

    #[test]
    fn test_silent_onsets_empty_result() {
        let onsets = vec![0.0f32; 2000];
        let tempo = estimate_tempo(&onsets, 44100, 512, 50.0, 220.0).unwrap();
        assert!(tempo.is_empty());
    }

    #[test]
    fn test_short_series_collapsed_lag_range() {
        // 10 frames cannot hold a 50-220 BPM lag range at this frame rate.
        let onsets = impulse_onsets(10, 3);
        let tempo = estimate_tempo(&onsets, 44100, 512, 50.0, 60.0).unwrap();
        assert!(tempo.is_empty());
    }

    #[test]
    fn test_result_within_bpm_bounds() {
        let onsets = impulse_onsets(3000, 52);
        let tempo = estimate_tempo(&onsets, 44100, 512, 50.0, 220.0).unwrap();
        let frame_rate = 44100.0 / 512.0;
        let bpm = bpm_from_lag(tempo.period_frames, frame_rate);
        assert!(bpm >= 50.0 && bpm <= 220.0, "bpm {:.2}", bpm);
    }

    #[test]
    fn test_half_tempo_safety_above_200() {
        // Period 20 frames -> ~258 BPM; the safety must double the lag.
        let onsets = impulse_onsets(3000, 20);
        let tempo = estimate_tempo(&onsets, 44100, 512, 50.0, 300.0).unwrap();
        let frame_rate = 44100.0 / 512.0;
        let bpm = bpm_from_lag(tempo.period_frames, frame_rate);
        assert!(bpm <= 200.0, "expected half-tempo promotion, got {:.2}", bpm);
        assert_eq!(tempo.period_frames, 40);
    }

    #[test]
    fn test_octave_correction_escapes_subharmonic() {
        // Beats every 43 frames with a strong accent every second beat.
        // The accent makes the 86-frame lag win the weighted curve first
        // (R[86] carries the 4x4 products), so the halving step has to
        // pull the estimate back to 43.
        let mut onsets = vec![0.0f32; 4000];
        let mut i = 0;
        let mut beat = 0usize;
        while i < onsets.len() {
            onsets[i] = if beat % 2 == 0 { 4.0 } else { 1.0 };
            i += 43;
            beat += 1;
        }
        let tempo = estimate_tempo(&onsets, 44100, 512, 50.0, 220.0).unwrap();
        assert_eq!(tempo.period_frames, 43);
    }

    #[test]
    fn test_candidates_unique_and_include_primary() {
        let onsets = impulse_onsets(3000, 43);
        let tempo = estimate_tempo(&onsets, 44100, 512, 50.0, 220.0).unwrap();
        assert!(tempo.candidate_periods.contains(&tempo.period_frames));
        assert_eq!(tempo.candidate_periods[0], tempo.period_frames);
        assert!(tempo.candidate_periods.len() <= 5);
        let mut dedup = tempo.candidate_periods.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), tempo.candidate_periods.len());
    }

    #[test]
    fn test_parabolic_symmetric_peak_returns_integer() {
        // Symmetric neighbors: the interpolated maximum is the peak itself.
        let data = vec![0.0, 0.5, 1.0, 0.5, 0.0];
        let refined = parabolic_interpolate(&data, 2, 0, 4);
        assert!((refined - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_parabolic_degenerate_curvature() {
        // Collinear points: denominator vanishes, fall back to the peak.
        let data = vec![1.0, 1.0, 1.0];
        let refined = parabolic_interpolate(&data, 1, 0, 2);
        assert_eq!(refined, 1.0);
    }

    #[test]
    fn test_parabolic_skewed_peak_shifts_toward_larger_neighbor() {
        let data = vec![0.0, 0.4, 1.0, 0.8, 0.0];
        let refined = parabolic_interpolate(&data, 2, 0, 4);
        assert!(refined > 2.0 && refined < 2.5, "refined {}", refined);
    }
}
