//! End-to-end analysis scenarios on synthetic audio
//!
//! Each test builds a PCM signal with known rhythmic structure and runs
//! the full library pipeline (onset -> tempo -> arbitration -> meter).

use beatmark::io::pcm::PcmBuffer;
use beatmark::synth::overlay_clicks;
use beatmark::{analyze, Config};

const SR: u32 = 44100;

/// Mono buffer of `secs` seconds, all zeros
fn silence(secs: usize) -> Vec<f32> {
    vec![0.0f32; SR as usize * secs]
}

/// Add a single-sample (broadband) impulse
fn add_impulse(samples: &mut [f32], at: usize, amp: f32) {
    if at < samples.len() {
        samples[at] += amp;
    }
}

/// Add a short band-limited blip (20 ms sine burst)
fn add_blip(samples: &mut [f32], at: usize, freq: f32, amp: f32) {
    let len = (SR as f32 * 0.02) as usize;
    for i in 0..len {
        if at + i >= samples.len() {
            break;
        }
        let t = i as f32 / SR as f32;
        samples[at + i] += amp * (std::f32::consts::TAU * freq * t).sin();
    }
}

fn analysis_config() -> Config {
    Config {
        detect_key: false,
        ..Config::default()
    }
}

#[test]
fn pure_120_bpm_click_track() {
    // Sharp impulse every 22050 samples: exactly 120 BPM for 60 seconds.
    let mut samples = silence(60);
    let mut at = 0;
    while at < samples.len() {
        add_impulse(&mut samples, at, 1.0);
        at += 22050;
    }
    let audio = PcmBuffer::new(samples, SR, 1).unwrap();

    let result = analyze(&audio, &analysis_config()).unwrap();

    assert!(
        (result.bpm - 120.0).abs() < 0.5,
        "expected ~120 BPM, got {:.2}",
        result.bpm
    );
    let count = result.beat_samples.len();
    assert!(
        (118..=122).contains(&count),
        "expected 118-122 beats, got {}",
        count
    );
    let meter = result.meter.expect("meter enabled");
    assert_eq!(meter.time_signature.name(), "4/4");
}

#[test]
fn fast_impulses_150_bpm() {
    // Impulse every 17640 samples (150 BPM). The onset frame grid cannot
    // represent 150 BPM exactly, so check the beat spacing as well as the
    // reported tempo.
    let mut samples = silence(60);
    let mut at = 0;
    while at < samples.len() {
        add_impulse(&mut samples, at, 1.0);
        at += 17640;
    }
    let audio = PcmBuffer::new(samples, SR, 1).unwrap();

    let result = analyze(&audio, &analysis_config()).unwrap();

    assert!(
        result.bpm > 145.0 && result.bpm < 155.0,
        "expected ~150 BPM, got {:.2}",
        result.bpm
    );
    // No half-tempo promotion: 150 is below the 200 BPM ceiling.
    assert!(result.bpm > 100.0);

    // Mean inter-beat interval recovers 150 BPM within +/-1.
    let beats = &result.beat_samples;
    assert!(beats.len() > 100);
    let total_gap = (beats[beats.len() - 1] - beats[0]) as f64;
    let mean_gap = total_gap / (beats.len() - 1) as f64;
    let gap_bpm = 60.0 * SR as f64 / mean_gap;
    assert!(
        (gap_bpm - 150.0).abs() < 1.0,
        "beat spacing implies {:.2} BPM",
        gap_bpm
    );
}

#[test]
fn subharmonic_snare_does_not_drag_tempo() {
    // Broadband kicks at ~117 BPM (period 22528 samples = 44 onset
    // frames) mixed with band-limited snares at the 2/3 sub-harmonic
    // (~78 BPM). The arbiter's +/-30% gate must reject the 78 BPM
    // hypothesis.
    let mut samples = silence(60);
    let mut at = 0;
    while at < samples.len() {
        add_impulse(&mut samples, at, 1.0);
        at += 22528;
    }
    let mut at = 0;
    while at < samples.len() {
        add_blip(&mut samples, at, 300.0, 0.6);
        at += 33792;
    }
    let audio = PcmBuffer::new(samples, SR, 1).unwrap();

    let result = analyze(&audio, &analysis_config()).unwrap();

    assert!(
        (result.bpm - 117.4).abs() < 2.0,
        "expected ~117 BPM, got {:.2}",
        result.bpm
    );
}

#[test]
fn waltz_three_four() {
    // ~167 BPM (period 31 onset frames = 15872 samples) with beat 1 of
    // every three accented.
    let mut samples = silence(60);
    let period = 15872usize;
    let mut beat = 0usize;
    let mut at = 0;
    while at < samples.len() {
        let amp = if beat % 3 == 0 { 1.0 } else { 0.5 };
        add_impulse(&mut samples, at, amp);
        at += period;
        beat += 1;
    }
    let audio = PcmBuffer::new(samples, SR, 1).unwrap();

    let result = analyze(&audio, &analysis_config()).unwrap();
    assert!(
        (result.bpm - 166.7).abs() < 1.5,
        "expected ~167 BPM, got {:.2}",
        result.bpm
    );

    let meter = result.meter.clone().expect("meter enabled");
    assert_eq!(meter.time_signature.name(), "3/4");
    assert_eq!(meter.beats_per_measure, 3);

    // Downbeat phase is stable across runs (the pipeline is
    // deterministic).
    let again = analyze(&audio, &analysis_config()).unwrap();
    assert_eq!(
        again.meter.unwrap().downbeat_phase,
        meter.downbeat_phase
    );
}

#[test]
fn compound_six_eight_from_triplet_subdivisions() {
    // Dotted-quarter beats (period 43008 samples = 84 onset frames,
    // ~61.5 BPM) with every third beat accented and band-limited triplet
    // blips at exact thirds of each beat. The grouping resolves first,
    // then the compound-subdivision test promotes to 6/8.
    let mut samples = silence(60);
    let period = 43008usize;
    let third = period / 3;
    let mut beat = 0usize;
    let mut at = 0;
    while at < samples.len() {
        let amp = if beat % 3 == 0 { 1.0 } else { 0.8 };
        add_impulse(&mut samples, at, amp);
        add_blip(&mut samples, at + third, 200.0, 0.5);
        add_blip(&mut samples, at + 2 * third, 200.0, 0.5);
        at += period;
        beat += 1;
    }
    let audio = PcmBuffer::new(samples, SR, 1).unwrap();

    let result = analyze(&audio, &analysis_config()).unwrap();

    assert!(
        (result.bpm - 61.5).abs() < 2.5,
        "expected ~61.5 BPM, got {:.2}",
        result.bpm
    );
    let meter = result.meter.expect("meter enabled");
    assert_eq!(meter.time_signature.name(), "6/8");
}

#[test]
fn silent_input_produces_no_beats() {
    // 10 seconds of digital silence, stereo. The tempo stage returns an
    // empty estimate, the tracker places no beats, the meter defaults to
    // 4/4 and the click overlay leaves the audio untouched.
    let stereo = PcmBuffer::new(vec![0.0f32; SR as usize * 10 * 2], SR, 2).unwrap();

    let result = analyze(&stereo, &analysis_config()).unwrap();

    assert!(result.beat_samples.is_empty());
    assert_eq!(result.bpm, 0.0);
    let meter = result.meter.expect("meter enabled");
    assert_eq!(meter.time_signature.name(), "4/4");
    assert_eq!(meter.confidence, 0.0);

    let mut output = stereo.clone();
    overlay_clicks(&mut output, &result.beat_samples, 0.5, 1000.0);
    assert_eq!(output.samples, stereo.samples);
}

#[test]
fn meter_can_be_disabled() {
    let mut samples = silence(30);
    let mut at = 0;
    while at < samples.len() {
        add_impulse(&mut samples, at, 1.0);
        at += 22050;
    }
    let audio = PcmBuffer::new(samples, SR, 1).unwrap();

    let config = Config {
        detect_meter: false,
        detect_key: false,
        ..Config::default()
    };
    let result = analyze(&audio, &config).unwrap();
    assert!(result.meter.is_none());
    assert!(result.key.is_none());
    assert!(!result.beat_samples.is_empty());
}

#[test]
fn key_detection_on_tonal_material() {
    // A sustained C major chord under a 120 BPM click: key lands on C.
    let mut samples = silence(30);
    for (freq, amp) in [(130.81f32, 0.2f32), (261.63, 0.2), (329.63, 0.15), (392.0, 0.15)] {
        for (i, s) in samples.iter_mut().enumerate() {
            *s += amp * (i as f32 / SR as f32 * freq * std::f32::consts::TAU).sin();
        }
    }
    let mut at = 0;
    while at < samples.len() {
        add_impulse(&mut samples, at, 0.8);
        at += 22050;
    }
    let audio = PcmBuffer::new(samples, SR, 1).unwrap();

    let config = Config {
        detect_meter: false,
        ..Config::default()
    };
    let result = analyze(&audio, &config).unwrap();
    let key = result.key.expect("key enabled");
    assert_eq!(key.key.tonic(), 0, "detected {}", key.key);
}

#[test]
fn analyze_rejects_degenerate_input() {
    let empty = PcmBuffer {
        samples: vec![],
        sample_rate: SR,
        channels: 1,
        title: None,
    };
    assert!(analyze(&empty, &Config::default()).is_err());

    let bad_rate = PcmBuffer {
        samples: vec![0.0; 1024],
        sample_rate: 0,
        channels: 1,
        title: None,
    };
    assert!(analyze(&bad_rate, &Config::default()).is_err());
}

#[test]
fn stereo_and_mono_inputs_agree() {
    // Duplicating a mono signal into both channels must not change the
    // analysis: the mixdown averages back to the same mono signal.
    let mut mono_samples = silence(30);
    let mut at = 0;
    while at < mono_samples.len() {
        add_impulse(&mut mono_samples, at, 1.0);
        at += 22050;
    }
    let mut stereo_samples = Vec::with_capacity(mono_samples.len() * 2);
    for &s in &mono_samples {
        stereo_samples.push(s);
        stereo_samples.push(s);
    }

    let mono = PcmBuffer::new(mono_samples, SR, 1).unwrap();
    let stereo = PcmBuffer::new(stereo_samples, SR, 2).unwrap();

    let result_mono = analyze(&mono, &analysis_config()).unwrap();
    let result_stereo = analyze(&stereo, &analysis_config()).unwrap();

    assert_eq!(result_mono.bpm, result_stereo.bpm);
    assert_eq!(result_mono.beat_samples, result_stereo.beat_samples);
}
