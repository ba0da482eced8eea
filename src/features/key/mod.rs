//! Key signature detection
//!
//! A 12-bin chromagram is extracted with per-octave normalization (so
//! upper-octave harmonics cannot drown low-register tonic content) and
//! correlated against the 24 Krumhansl-Kessler key profiles.

pub mod chroma;
pub mod detector;
pub mod templates;

pub use detector::{detect_key, KeyResult};
pub use templates::Key;
