//! Feature extraction and analysis stages
//!
//! Each sub-module is one stage of the pipeline:
//! - [`onset`]: mel spectral-flux onset strength
//! - [`period`]: autocorrelation tempo estimation with octave correction
//! - [`beat`]: dynamic-programming beat placement
//! - [`meter`]: time-signature inference from beat-aligned accents
//! - [`key`]: chroma-based key signature detection

pub mod beat;
pub mod key;
pub mod meter;
pub mod onset;
pub mod period;
