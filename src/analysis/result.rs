//! Analysis result types

use serde::{Deserialize, Serialize};

use crate::features::key::KeyResult;
use crate::features::meter::MeterResult;

/// Complete result of the analysis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Final BPM, recomputed from the winning integer period
    pub bpm: f32,

    /// Beat positions as sample offsets into the mono signal
    pub beat_samples: Vec<usize>,

    /// Detected meter, when meter detection is enabled
    pub meter: Option<MeterResult>,

    /// Detected key signature, when key detection is enabled
    pub key: Option<KeyResult>,

    /// Number of onset frames analyzed
    pub onset_frames: usize,
}

impl AnalysisResult {
    /// Downbeat sample offsets, empty without a meter result
    pub fn downbeat_samples(&self) -> &[usize] {
        self.meter
            .as_ref()
            .map(|m| m.downbeat_samples.as_slice())
            .unwrap_or(&[])
    }
}
