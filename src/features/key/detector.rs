//! Key selection by template correlation

use serde::{Deserialize, Serialize};

use super::chroma::compute_chromagram;
use super::templates::Key;
use crate::error::AnalysisError;
use crate::io::pcm::PcmBuffer;

/// Detected key signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResult {
    /// Winning key
    pub key: Key,
    /// Pearson correlation of the winning profile
    pub correlation: f32,
    /// Margin over the runner-up correlation
    pub confidence: f32,
}

/// Detect the key signature of a mono signal
///
/// Correlates the chromagram against all 24 rotated Krumhansl-Kessler
/// profiles and picks the best match; confidence is the margin between the
/// winner and the runner-up.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the buffer is not mono or has
/// a zero sample rate.
pub fn detect_key(mono: &PcmBuffer) -> Result<KeyResult, AnalysisError> {
    let chroma = compute_chromagram(mono)?;

    let mut best_corr = -2.0f32;
    let mut second_best = -2.0f32;
    let mut best_key = Key::Major(0);

    for root in 0..12 {
        for key in [Key::Major(root), Key::Minor(root)] {
            let corr = pearson_correlation(&chroma, &key.rotated_profile());
            log::debug!("  {}: r={:.4}", key, corr);
            if corr > best_corr {
                second_best = best_corr;
                best_corr = corr;
                best_key = key;
            } else if corr > second_best {
                second_best = corr;
            }
        }
    }

    let result = KeyResult {
        key: best_key,
        correlation: best_corr,
        confidence: best_corr - second_best,
    };

    log::debug!(
        "Key: {} (r={:.4}, confidence={:.4})",
        result.key,
        result.correlation,
        result.confidence
    );

    Ok(result)
}

/// Pearson correlation of two 12-bin vectors; 0 for degenerate variance
fn pearson_correlation(x: &[f32; 12], y: &[f32; 12]) -> f32 {
    let mean_x: f32 = x.iter().sum::<f32>() / 12.0;
    let mean_y: f32 = y.iter().sum::<f32>() / 12.0;

    let mut num = 0.0f32;
    let mut den_x = 0.0f32;
    let mut den_y = 0.0f32;
    for i in 0..12 {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    let den = (den_x * den_y).sqrt();
    if den < 1e-12 {
        return 0.0;
    }
    num / den
}
