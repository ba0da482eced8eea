//! Decaying sine-burst clicks mixed at beat positions
//!
//! Each click is a 20 ms sine burst with an exponential envelope, added
//! into every channel at the beat's sample offset. After all clicks are
//! mixed the whole buffer is clamped once to [-1, 1]; clipping is bounded
//! by the click amplitude and no normalization is applied.

use std::collections::HashSet;

use crate::io::pcm::PcmBuffer;

/// Click duration in seconds
const CLICK_DURATION_SECS: f32 = 0.02;

/// Exponential envelope decay rate (1/s)
const CLICK_DECAY: f32 = 200.0;

/// Synthesize one click: `volume * sin(2*pi*freq*t) * exp(-decay*t)`
fn synth_click(sample_rate: u32, volume: f32, freq: f32) -> Vec<f32> {
    if sample_rate == 0 {
        return Vec::new();
    }
    let volume = volume.clamp(0.0, 1.0);
    let length = ((CLICK_DURATION_SECS * sample_rate as f32).round() as usize).max(1);
    (0..length)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            volume * (std::f32::consts::TAU * freq * t).sin() * (-CLICK_DECAY * t).exp()
        })
        .collect()
}

/// Mix one click into every channel at each of the given frame offsets
fn mix_at(audio: &mut PcmBuffer, offsets: impl Iterator<Item = usize>, click: &[f32]) {
    let frames = audio.frames();
    let channels = audio.channels as usize;
    for beat in offsets {
        if beat >= frames {
            continue;
        }
        for (i, &c) in click.iter().enumerate() {
            let frame = beat + i;
            if frame >= frames {
                break;
            }
            let base = frame * channels;
            for ch in 0..channels {
                audio.samples[base + ch] += c;
            }
        }
    }
}

/// Overlay metronome clicks at the given beat offsets
///
/// # Arguments
///
/// * `audio` - Output buffer (any channel count), mutated in place
/// * `beat_samples` - Beat positions as frame offsets into `audio`
/// * `volume` - Click amplitude, clamped to [0, 1]
/// * `freq` - Click tone in Hz
///
/// An empty beat list leaves the buffer untouched.
pub fn overlay_clicks(audio: &mut PcmBuffer, beat_samples: &[usize], volume: f32, freq: f32) {
    if audio.sample_rate == 0 || audio.channels == 0 || audio.samples.is_empty() {
        return;
    }
    if beat_samples.is_empty() {
        return;
    }

    let click = synth_click(audio.sample_rate, volume, freq);
    if click.is_empty() {
        return;
    }

    mix_at(audio, beat_samples.iter().copied(), &click);

    for sample in &mut audio.samples {
        *sample = sample.clamp(-1.0, 1.0);
    }

    log::debug!(
        "Mixed {} clicks at {:.0} Hz, volume {:.2}",
        beat_samples.len(),
        freq,
        volume
    );
}

/// Overlay clicks with a distinct tone on downbeats
///
/// Beats present in `downbeat_samples` take the downbeat tone; all others
/// take the regular tone. Mixing and the final clamp behave exactly like
/// [`overlay_clicks`].
pub fn overlay_clicks_with_downbeats(
    audio: &mut PcmBuffer,
    beat_samples: &[usize],
    downbeat_samples: &[usize],
    volume: f32,
    freq: f32,
    downbeat_freq: f32,
) {
    if audio.sample_rate == 0 || audio.channels == 0 || audio.samples.is_empty() {
        return;
    }
    if beat_samples.is_empty() {
        return;
    }

    let beat_click = synth_click(audio.sample_rate, volume, freq);
    let downbeat_click = synth_click(audio.sample_rate, volume, downbeat_freq);
    if beat_click.is_empty() {
        return;
    }

    let downbeats: HashSet<usize> = downbeat_samples.iter().copied().collect();
    mix_at(
        audio,
        beat_samples.iter().copied().filter(|b| !downbeats.contains(b)),
        &beat_click,
    );
    mix_at(
        audio,
        beat_samples.iter().copied().filter(|b| downbeats.contains(b)),
        &downbeat_click,
    );

    for sample in &mut audio.samples {
        *sample = sample.clamp(-1.0, 1.0);
    }

    log::debug!(
        "Mixed {} clicks ({} downbeats accented at {:.0} Hz)",
        beat_samples.len(),
        downbeats.len(),
        downbeat_freq
    );
}
