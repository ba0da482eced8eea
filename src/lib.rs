//! # beatmark
//!
//! Offline music analysis: global tempo (BPM), beat positions, time
//! signature and key signature, plus a synthesized metronome click mixed
//! into the original audio at the detected beats.
//!
//! ## Pipeline
//!
//! ```text
//! PCM (stereo) -> mono mixdown -> onset strength -> tempo candidates
//!     -> DP beat tracking + arbitration -> meter -> key
//!     -> click overlay on the stereo copy -> WAV out
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use beatmark::{analyze, Config};
//! use beatmark::io::pcm::PcmBuffer;
//!
//! let audio = PcmBuffer::new(vec![0.0f32; 44100 * 30], 44100, 1)?;
//! let result = analyze(&audio, &Config::default())?;
//! println!("BPM: {:.2}, {} beats", result.bpm, result.beat_samples.len());
//! # Ok::<(), beatmark::AnalysisError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod synth;

pub use analysis::pipeline::Pipeline;
pub use analysis::result::AnalysisResult;
pub use config::Config;
pub use error::AnalysisError;

use analysis::pipeline::arbitrate_candidates;
use features::key::detect_key;
use features::meter::detect_meter;
use features::onset::compute_onset_strength;
use features::period::estimate_tempo;
use io::pcm::PcmBuffer;

/// Analyze an audio buffer
///
/// Runs the full analysis chain (onset strength, tempo estimation,
/// candidate arbitration, meter and key detection) on the mono mixdown of
/// `audio`. Pure in-memory computation; file handling lives in
/// [`Pipeline`].
///
/// # Arguments
///
/// * `audio` - Input PCM of any channel count; analysis runs on the mono
///   mixdown
/// * `config` - Analysis configuration
///
/// # Returns
///
/// [`AnalysisResult`] with the final BPM, beat positions and optional
/// meter/key results. Degenerate inputs (silence, too short) yield an
/// empty beat list rather than an error.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty buffer or zero
/// sample rate.
pub fn analyze(audio: &PcmBuffer, config: &Config) -> Result<AnalysisResult, AnalysisError> {
    if audio.samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio buffer".to_string(),
        ));
    }
    if audio.sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid sample rate".to_string(),
        ));
    }

    let mono = audio.to_mono();

    let onset = compute_onset_strength(&mono)?;
    log::info!("Computed onset strength: {} frames", onset.strength.len());

    let tempo = estimate_tempo(
        &onset.strength,
        mono.sample_rate,
        onset.hop_size,
        config.min_bpm,
        config.max_bpm,
    )?;

    let (beats, bpm) = arbitrate_candidates(&tempo, &onset, mono.sample_rate);
    log::info!("Tracked {} beats at {:.2} BPM", beats.beat_samples.len(), bpm);

    let meter = if config.detect_meter {
        Some(detect_meter(
            &beats.beat_samples,
            &onset.strength,
            onset.hop_size,
        ))
    } else {
        None
    };

    let key = if config.detect_key {
        Some(detect_key(&mono)?)
    } else {
        None
    };

    Ok(AnalysisResult {
        bpm,
        beat_samples: beats.beat_samples,
        meter,
        key,
        onset_frames: onset.strength.len(),
    })
}
