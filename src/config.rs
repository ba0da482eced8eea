//! Configuration parameters for the analysis pipeline

/// Pipeline configuration
///
/// One field per CLI flag; defaults match the command-line defaults so
/// `Config::default()` behaves like an unadorned `bpm_detect <input>` run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum BPM to consider (default: 50.0)
    pub min_bpm: f32,

    /// Maximum BPM to consider (default: 220.0)
    pub max_bpm: f32,

    /// Click amplitude in [0, 1], clamped before mixing (default: 0.5)
    pub click_volume: f32,

    /// Beat click tone in Hz (default: 1000.0)
    pub click_freq: f32,

    /// Downbeat click tone in Hz (default: 1500.0)
    pub downbeat_freq: f32,

    /// Use the downbeat tone on measure-starts (default: false)
    pub accent_downbeats: bool,

    /// Run meter (time-signature) detection (default: true)
    pub detect_meter: bool,

    /// Run key-signature detection (default: true)
    pub detect_key: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_bpm: 50.0,
            max_bpm: 220.0,
            click_volume: 0.5,
            click_freq: 1000.0,
            downbeat_freq: 1500.0,
            accent_downbeats: false,
            detect_meter: true,
            detect_key: true,
        }
    }
}
