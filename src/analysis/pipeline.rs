//! Pipeline orchestration
//!
//! Runs decode -> mono mixdown -> onset strength -> tempo estimation ->
//! candidate arbitration -> meter -> key -> click overlay -> WAV output.
//! The arbitration step evaluates every tempo candidate through the beat
//! tracker and keeps the one with the best per-beat DP score.

use std::path::Path;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::features::beat::{track_beats, BeatSequence, DEFAULT_ALPHA};
use crate::features::onset::OnsetSeries;
use crate::features::period::{bpm_from_lag, TempoEstimate};
use crate::io::decoder::InputSource;
use crate::io::wav;
use crate::synth::{overlay_clicks, overlay_clicks_with_downbeats};

/// Margin a non-primary candidate must clear over the primary's
/// normalized score
const PRIMARY_MARGIN: f64 = 1.05;

/// BPM ratio window around the primary inside which candidates compete
const CANDIDATE_RATIO_LO: f32 = 0.7;
const CANDIDATE_RATIO_HI: f32 = 1.3;

/// Evaluate tempo candidates through the beat tracker and pick the winner
///
/// Candidates outside the ±30% BPM window around the primary estimate are
/// rejected outright; that gate exists to keep 2/3 and 3/2 sub-harmonics
/// out of the comparison. Scores are normalized by beat count, and a
/// non-primary candidate must additionally clear the primary's normalized
/// score by 5% because wider DP search windows can inflate per-beat
/// scores slightly.
///
/// # Returns
///
/// The winning beat sequence and the final BPM recomputed from the
/// winning integer period (so the displayed BPM matches the beats that
/// were actually placed).
pub fn arbitrate_candidates(
    tempo: &TempoEstimate,
    onset: &OnsetSeries,
    sample_rate: u32,
) -> (BeatSequence, f32) {
    if tempo.is_empty() {
        return (BeatSequence::default(), 0.0);
    }

    let frame_rate = onset.frame_rate(sample_rate);
    let primary_bpm = tempo.bpm;

    let mut best_beats = BeatSequence::default();
    let mut best_period = tempo.period_frames;
    let mut best_norm = f64::NEG_INFINITY;
    let mut primary_norm = f64::NEG_INFINITY;

    for &candidate in &tempo.candidate_periods {
        let candidate_bpm = bpm_from_lag(candidate, frame_rate);

        let ratio = if primary_bpm > 0.0 {
            candidate_bpm / primary_bpm
        } else {
            1.0
        };
        if !(CANDIDATE_RATIO_LO..=CANDIDATE_RATIO_HI).contains(&ratio) {
            log::debug!(
                "Candidate period={} ({:.1} BPM) skipped (outside +/-30%)",
                candidate,
                candidate_bpm
            );
            continue;
        }

        let beats = track_beats(&onset.strength, candidate, onset.hop_size, DEFAULT_ALPHA);
        let norm = beats.normalized_score();
        log::debug!(
            "Candidate period={} ({:.1} BPM) score={:.2} beats={} norm={:.3}",
            candidate,
            candidate_bpm,
            beats.score,
            beats.beat_samples.len(),
            norm
        );

        if candidate == tempo.period_frames {
            primary_norm = norm;
        }

        let mut threshold = best_norm;
        if candidate != tempo.period_frames && primary_norm > f64::NEG_INFINITY {
            threshold = threshold.max(primary_norm * PRIMARY_MARGIN);
        }
        if norm > threshold {
            best_norm = norm;
            best_period = candidate;
            best_beats = beats;
        }
    }

    let final_bpm = if best_period > 0 {
        bpm_from_lag(best_period, frame_rate)
    } else {
        tempo.bpm
    };

    if best_period != tempo.period_frames {
        log::debug!(
            "Beat tracker re-estimated tempo: {:.2} BPM -> {:.2} BPM (period {})",
            tempo.bpm,
            final_bpm,
            best_period
        );
    }

    (best_beats, final_bpm)
}

/// Replace characters unsafe in filenames with underscores
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | '-' => '_',
            other => other,
        })
        .collect()
}

/// The file-to-file driver
pub struct Pipeline;

impl Pipeline {
    /// Run the full pipeline on one input
    ///
    /// Decodes `input`, analyzes it, prints the results, overlays the
    /// metronome and writes the output WAV. When `output` is empty the
    /// path is derived: URL streams use the sanitized title (plus a raw
    /// audio copy), otherwise `output_click.wav`.
    ///
    /// # Errors
    ///
    /// Propagates decode, analysis and I/O failures.
    pub fn run(input: &str, output: &str, config: &Config) -> Result<(), AnalysisError> {
        let source = InputSource::classify(input);
        let mut stereo = source.decode()?;
        log::info!(
            "Decoded {} frames @ {} Hz ({} channel(s), {:.1}s)",
            stereo.frames(),
            stereo.sample_rate,
            stereo.channels,
            stereo.duration_secs()
        );

        let result = crate::analyze(&stereo, config)?;

        println!("Detected BPM: {:.2}", result.bpm);
        println!("Beat count: {}", result.beat_samples.len());
        if let Some(meter) = &result.meter {
            println!("Time signature: {}", meter.time_signature);
        }
        if let Some(key) = &result.key {
            println!("Key signature: {}", key.key.label());
        }

        // Output naming: URL streams derive names from the title and also
        // keep a raw audio copy; everything else got a default from the
        // CLI already.
        let bpm_int = result.bpm.round() as i64;
        let mut actual_output = output.to_string();
        let mut raw_output = String::new();
        if actual_output.is_empty() {
            if let Some(title) = stereo.title.as_deref().filter(|t| !t.is_empty()) {
                let base = sanitize_filename(title);
                actual_output = format!("{}_{}bpm.wav", base, bpm_int);
                raw_output = format!("{}.wav", base);
            } else {
                actual_output = "output_click.wav".to_string();
            }
        }

        if !raw_output.is_empty() {
            wav::write_wav(Path::new(&raw_output), &stereo)?;
            println!("Audio: {}", raw_output);
        }

        let volume = config.click_volume.clamp(0.0, 1.0);
        let downbeats = result.downbeat_samples();
        if config.accent_downbeats && !downbeats.is_empty() {
            overlay_clicks_with_downbeats(
                &mut stereo,
                &result.beat_samples,
                downbeats,
                volume,
                config.click_freq,
                config.downbeat_freq,
            );
        } else {
            overlay_clicks(&mut stereo, &result.beat_samples, volume, config.click_freq);
        }

        wav::write_wav(Path::new(&actual_output), &stereo)?;
        println!("Output: {}", actual_output);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::onset::OnsetSeries;

    fn impulse_series(frames: usize, period: usize) -> OnsetSeries {
        let mut strength = vec![-0.2f32; frames];
        let mut i = 0;
        while i < frames {
            strength[i] = 2.0;
            i += period;
        }
        OnsetSeries {
            strength,
            hop_size: 512,
            fft_size: 2048,
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("My Song - Live / Take 2?"),
            "My_Song___Live___Take_2_"
        );
        assert_eq!(sanitize_filename("plain"), "plain");
        assert_eq!(sanitize_filename("a:b*c\"d<e>f|g\\h"), "a_b_c_d_e_f_g_h");
    }

    #[test]
    fn test_arbitrate_empty_tempo() {
        let onset = impulse_series(1000, 43);
        let (beats, bpm) = arbitrate_candidates(&TempoEstimate::default(), &onset, 44100);
        assert!(beats.beat_samples.is_empty());
        assert_eq!(bpm, 0.0);
    }

    #[test]
    fn test_arbitrate_primary_only() {
        let onset = impulse_series(2000, 43);
        let frame_rate = 44100.0f32 / 512.0;
        let tempo = TempoEstimate {
            bpm: 60.0 * frame_rate / 43.0,
            period_frames: 43,
            candidate_periods: vec![43],
        };
        let (beats, bpm) = arbitrate_candidates(&tempo, &onset, 44100);
        assert!(!beats.beat_samples.is_empty());
        assert_eq!(beats.period_frames, 43);
        assert!((bpm - tempo.bpm).abs() < 0.1);
    }

    #[test]
    fn test_arbitrate_rejects_subharmonic_outside_gate() {
        // A 2/3-tempo candidate (ratio 0.667 < 0.7) must never win, even
        // though its wider DP window can produce a plausible score.
        let onset = impulse_series(3000, 43);
        let frame_rate = 44100.0f32 / 512.0;
        let tempo = TempoEstimate {
            bpm: 60.0 * frame_rate / 43.0,
            period_frames: 43,
            candidate_periods: vec![43, 65], // 65 ~= 43 * 3/2 -> ratio ~0.66
        };
        let (beats, _) = arbitrate_candidates(&tempo, &onset, 44100);
        assert_eq!(beats.period_frames, 43);
    }

    #[test]
    fn test_arbitrate_near_primary_needs_margin() {
        // A near-primary candidate with no real support cannot displace
        // the primary: it must beat primary_norm by 5%.
        let onset = impulse_series(3000, 43);
        let frame_rate = 44100.0f32 / 512.0;
        let tempo = TempoEstimate {
            bpm: 60.0 * frame_rate / 43.0,
            period_frames: 43,
            candidate_periods: vec![43, 40],
        };
        let (beats, bpm) = arbitrate_candidates(&tempo, &onset, 44100);
        assert_eq!(beats.period_frames, 43);
        assert!((bpm - tempo.bpm).abs() < 0.1);
    }

    #[test]
    fn test_arbitrate_final_bpm_matches_winner_period() {
        let onset = impulse_series(2500, 50);
        let frame_rate = 44100.0f32 / 512.0;
        let tempo = TempoEstimate {
            bpm: 60.0 * frame_rate / 50.0 + 0.37, // refined value, off-integer
            period_frames: 50,
            candidate_periods: vec![50],
        };
        let (_, bpm) = arbitrate_candidates(&tempo, &onset, 44100);
        // Final BPM comes from the integer period, not the refined value.
        assert!((bpm - 60.0 * frame_rate / 50.0).abs() < 1e-4);
    }
}
