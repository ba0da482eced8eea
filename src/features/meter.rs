//! Meter (time-signature) detection
//!
//! Infers the beat grouping from accent patterns in the onset strength
//! sampled at beat positions. Candidate groupings 2, 3 and 4 are scored at
//! every phase by a weighted mix of downbeat accent contrast and
//! beat-level autocorrelation; a compound-subdivision test separates 6/8
//! from its simple-meter lookalikes.

use serde::{Deserialize, Serialize};

/// Supported time signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSignature {
    /// 2/4 (simple duple)
    TwoFour,
    /// 3/4 (waltz time)
    ThreeFour,
    /// 4/4 (common time)
    FourFour,
    /// 6/8 (compound)
    SixEight,
}

impl TimeSignature {
    /// Canonical display form ("2/4", "3/4", "4/4", "6/8")
    pub fn name(&self) -> &'static str {
        match self {
            TimeSignature::TwoFour => "2/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::FourFour => "4/4",
            TimeSignature::SixEight => "6/8",
        }
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Detected meter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterResult {
    /// Chosen time signature
    pub time_signature: TimeSignature,
    /// Beats per measure at the tracked beat level
    pub beats_per_measure: usize,
    /// Index of the first downbeat within the beat list
    pub downbeat_phase: usize,
    /// Accent-based confidence in [0, 1]
    pub confidence: f32,
    /// Sample offsets of measure-start beats
    pub downbeat_samples: Vec<usize>,
}

impl Default for MeterResult {
    fn default() -> Self {
        Self {
            time_signature: TimeSignature::FourFour,
            beats_per_measure: 4,
            downbeat_phase: 0,
            confidence: 0.0,
            downbeat_samples: Vec::new(),
        }
    }
}

/// Weight on downbeat accent contrast in the grouping score
const ACCENT_WEIGHT: f32 = 0.7;

/// Weight on beat-level autocorrelation in the grouping score
const AUTOCORR_WEIGHT: f32 = 0.3;

/// Minimum beat count for meaningful meter detection
const MIN_BEATS: usize = 8;

/// Detect the time signature from tracked beats
///
/// # Arguments
///
/// * `beat_samples` - Beat positions as sample offsets, increasing
/// * `onset_strength` - Normalized onset-strength series
/// * `hop_size` - Samples per onset frame
///
/// # Returns
///
/// [`MeterResult`] with the chosen signature, downbeat phase and downbeat
/// offsets. Fewer than 8 beats yields the 4/4 default with confidence 0.
pub fn detect_meter(
    beat_samples: &[usize],
    onset_strength: &[f32],
    hop_size: usize,
) -> MeterResult {
    let num_beats = beat_samples.len();

    if num_beats < MIN_BEATS || hop_size == 0 {
        log::debug!(
            "Meter detection: too few beats ({}), defaulting to 4/4",
            num_beats
        );
        return MeterResult {
            downbeat_samples: extract_downbeats(beat_samples, 4, 0),
            ..MeterResult::default()
        };
    }

    // Onset strength sampled at the nearest frame to each beat.
    let onset_at_beat: Vec<f32> = beat_samples
        .iter()
        .map(|&s| {
            let frame = (s as f64 / hop_size as f64).round() as usize;
            onset_strength.get(frame).copied().unwrap_or(0.0)
        })
        .collect();

    let mut best_grouping = 4usize;
    let mut best_phase = 0usize;
    let mut best_score = f32::NEG_INFINITY;
    let mut best_accent = 0.0f32;

    for grouping in [2usize, 3, 4] {
        let autocorr = beat_autocorrelation(&onset_at_beat, grouping);
        for phase in 0..grouping {
            let accent = accent_score(&onset_at_beat, grouping, phase);
            let score = ACCENT_WEIGHT * accent + AUTOCORR_WEIGHT * autocorr;
            log::debug!(
                "Meter grouping={} phase={}: accent={:.3} autocorr={:.3} score={:.3}",
                grouping,
                phase,
                accent,
                autocorr,
                score
            );
            if score > best_score {
                best_score = score;
                best_grouping = grouping;
                best_phase = phase;
                best_accent = accent;
            }
        }
    }

    // 2/4 vs 4/4 disambiguation: the strong-weak alternation of 4/4 means
    // a 2-grouping almost always scores well. Prefer 4/4 when the 4-beat
    // grouping shows any real accent contrast (beat 1 vs beat 3), since
    // 4/4 is far more common in practice.
    if best_grouping == 2 {
        let autocorr4 = beat_autocorrelation(&onset_at_beat, 4);
        let (accent4, phase4) = best_accent_for_grouping(&onset_at_beat, 4);
        let score4 = ACCENT_WEIGHT * accent4 + AUTOCORR_WEIGHT * autocorr4;
        if accent4 > 0.1 || score4 > best_score * 0.8 {
            log::debug!(
                "Preferring 4/4 over 2/4 (4-beat accent={:.3}, score={:.3})",
                accent4,
                score4
            );
            best_grouping = 4;
            best_phase = phase4;
            best_accent = accent4;
            best_score = score4;
        }
    }

    let mut result = MeterResult {
        time_signature: match best_grouping {
            2 => TimeSignature::TwoFour,
            3 => TimeSignature::ThreeFour,
            _ => TimeSignature::FourFour,
        },
        beats_per_measure: best_grouping,
        downbeat_phase: best_phase,
        confidence: (best_accent / 2.0).clamp(0.0, 1.0),
        downbeat_samples: Vec::new(),
    };

    // Low-confidence fallback: default to 4/4 when the winning non-4/4
    // grouping doesn't clearly outperform grouping 4. Genuine waltzes win
    // by a clear margin and are kept.
    if result.confidence < 0.15 && best_grouping != 4 {
        let autocorr4 = beat_autocorrelation(&onset_at_beat, 4);
        let mut best4_score = f32::NEG_INFINITY;
        let mut best4_phase = 0usize;
        for phase in 0..4 {
            let accent = accent_score(&onset_at_beat, 4, phase);
            let score = ACCENT_WEIGHT * accent + AUTOCORR_WEIGHT * autocorr4;
            if score > best4_score {
                best4_score = score;
                best4_phase = phase;
            }
        }
        if best_score < best4_score * 1.1 {
            log::debug!(
                "Low confidence ({:.3}), falling back to 4/4 (winner {:.3} vs 4/4 {:.3})",
                result.confidence,
                best_score,
                best4_score
            );
            result.time_signature = TimeSignature::FourFour;
            result.beats_per_measure = 4;
            result.downbeat_phase = best4_phase;
        }
    }

    // 6/8 check: a compound meter at the dotted-quarter beat level looks
    // like 2/4 (or a fast 3/4) but its beats subdivide into three.
    if result.time_signature == TimeSignature::TwoFour
        && check_compound_subdivision(beat_samples, onset_strength, hop_size)
    {
        log::debug!("Compound subdivision detected: 2/4 -> 6/8");
        result.time_signature = TimeSignature::SixEight;
        // beats_per_measure stays 2: these are dotted-quarter beats.
    } else if result.time_signature == TimeSignature::ThreeFour
        && check_compound_subdivision(beat_samples, onset_strength, hop_size)
    {
        log::debug!("Compound subdivision detected: 3/4 -> 6/8");
        result.time_signature = TimeSignature::SixEight;
        // A full 6/8 measure spans two groups of three beats.
        result.beats_per_measure = 6;
    }

    result.downbeat_samples = extract_downbeats(
        beat_samples,
        result.beats_per_measure,
        result.downbeat_phase,
    );

    log::debug!(
        "Meter: {} phase={} confidence={:.3}",
        result.time_signature,
        result.downbeat_phase,
        result.confidence
    );

    result
}

/// Downbeat accent contrast for one (grouping, phase) hypothesis
///
/// Mean onset strength at the downbeat residue minus the mean over all
/// other residues, normalized by the overall standard deviation.
fn accent_score(onset_at_beat: &[f32], grouping: usize, phase: usize) -> f32 {
    let n = onset_at_beat.len();
    if n < grouping {
        return 0.0;
    }

    let mut position_sum = vec![0.0f64; grouping];
    let mut position_count = vec![0usize; grouping];
    for (i, &v) in onset_at_beat.iter().enumerate() {
        let pos = (i + grouping - phase % grouping) % grouping;
        position_sum[pos] += v as f64;
        position_count[pos] += 1;
    }

    if position_count[0] == 0 {
        return 0.0;
    }
    let downbeat_mean = position_sum[0] / position_count[0] as f64;

    let other_sum: f64 = position_sum[1..].iter().sum();
    let other_count: usize = position_count[1..].iter().sum();
    if other_count == 0 {
        return 0.0;
    }
    let other_mean = other_sum / other_count as f64;

    let mean = onset_at_beat.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let var = onset_at_beat
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    let stddev = var.sqrt();

    ((downbeat_mean - other_mean) / (stddev + 1e-6)) as f32
}

/// Autocorrelation of beat-level onset strength at the grouping lag
///
/// Scaled by n/(n-lag) to compensate for the shorter overlap, then
/// normalized by the zero-lag energy.
fn beat_autocorrelation(onset_at_beat: &[f32], lag: usize) -> f32 {
    let n = onset_at_beat.len();
    if lag == 0 || lag >= n {
        return 0.0;
    }

    let r0: f64 = onset_at_beat.iter().map(|&v| v as f64 * v as f64).sum();
    if r0 < 1e-12 {
        return 0.0;
    }

    let mut r_lag = 0.0f64;
    for i in 0..n - lag {
        r_lag += onset_at_beat[i] as f64 * onset_at_beat[i + lag] as f64;
    }

    let scale = n as f64 / (n - lag) as f64;
    ((r_lag * scale) / r0) as f32
}

/// Best accent contrast over all phases of a grouping
fn best_accent_for_grouping(onset_at_beat: &[f32], grouping: usize) -> (f32, usize) {
    let mut best = f32::NEG_INFINITY;
    let mut best_phase = 0;
    for phase in 0..grouping {
        let accent = accent_score(onset_at_beat, grouping, phase);
        if accent > best {
            best = accent;
            best_phase = phase;
        }
    }
    (best, best_phase)
}

/// Test whether consecutive beats subdivide ternary rather than binary
///
/// Samples the onset strength at 1/3 and 2/3 of each inter-beat interval
/// (ternary grid) and at 1/2 (binary grid). Strengths are z-scores, so a
/// non-positive average means no pronounced subdivision at all; a ternary
/// call additionally needs a 10% margin over a positive binary average.
fn check_compound_subdivision(
    beat_samples: &[usize],
    onset_strength: &[f32],
    hop_size: usize,
) -> bool {
    if beat_samples.len() < 4 {
        return false;
    }

    let onset_len = onset_strength.len();
    let mut ternary_total = 0.0f64;
    let mut binary_total = 0.0f64;
    let mut count = 0usize;

    for pair in beat_samples.windows(2) {
        let start = pair[0] as f64;
        let span = pair[1] as f64 - start;
        if span <= 0.0 {
            continue;
        }

        let frame_t1 = ((start + span / 3.0) / hop_size as f64).round() as usize;
        let frame_t2 = ((start + 2.0 * span / 3.0) / hop_size as f64).round() as usize;
        let frame_b = ((start + span / 2.0) / hop_size as f64).round() as usize;

        if frame_t1 >= onset_len || frame_t2 >= onset_len || frame_b >= onset_len {
            continue;
        }

        ternary_total +=
            (onset_strength[frame_t1] as f64 + onset_strength[frame_t2] as f64) / 2.0;
        binary_total += onset_strength[frame_b] as f64;
        count += 1;
    }

    if count < 4 {
        return false;
    }

    let ternary_avg = ternary_total / count as f64;
    let binary_avg = binary_total / count as f64;

    log::debug!(
        "Compound subdivision: ternary_avg={:.3} binary_avg={:.3} pairs={}",
        ternary_avg,
        binary_avg,
        count
    );

    if ternary_avg <= 0.0 {
        return false;
    }
    if binary_avg <= 0.0 {
        return true;
    }
    ternary_avg > 1.1 * binary_avg
}

/// Every `grouping`-th beat starting at `phase`
fn extract_downbeats(beat_samples: &[usize], grouping: usize, phase: usize) -> Vec<usize> {
    if grouping == 0 || phase >= beat_samples.len() {
        return Vec::new();
    }
    beat_samples[phase..].iter().step_by(grouping).copied().collect()
}
