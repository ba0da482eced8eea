//! Krumhansl-Kessler key profiles and key naming
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*.
//! Oxford University Press.

use serde::{Deserialize, Serialize};

/// Major profile; index 0 = tonic, 1 = minor 2nd, ..., 11 = major 7th
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Minor profile; same indexing
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Display names for the 12 pitch classes
const KEY_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Filename-safe pitch class names (no '#')
const KEY_FILE_NAMES: [&str; 12] = [
    "C", "Csharp", "D", "Eb", "E", "F", "Fsharp", "G", "Ab", "A", "Bb", "B",
];

/// A musical key: mode plus tonic pitch class (0 = C ... 11 = B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key
    Major(usize),
    /// Minor key
    Minor(usize),
}

impl Key {
    /// Tonic pitch class in [0, 12)
    pub fn tonic(&self) -> usize {
        match self {
            Key::Major(pc) | Key::Minor(pc) => pc % 12,
        }
    }

    /// Tonic name ("C", "F#", "Bb")
    pub fn tonic_name(&self) -> &'static str {
        KEY_NAMES[self.tonic()]
    }

    /// Full label ("C major", "F# minor")
    pub fn label(&self) -> String {
        match self {
            Key::Major(_) => format!("{} major", self.tonic_name()),
            Key::Minor(_) => format!("{} minor", self.tonic_name()),
        }
    }

    /// Filename-safe short label ("Cmaj", "Fsharpmin")
    pub fn short_label(&self) -> String {
        match self {
            Key::Major(pc) => format!("{}maj", KEY_FILE_NAMES[pc % 12]),
            Key::Minor(pc) => format!("{}min", KEY_FILE_NAMES[pc % 12]),
        }
    }

    /// The key profile rotated so the tonic sits at this key's pitch class
    pub fn rotated_profile(&self) -> [f32; 12] {
        let (profile, root) = match self {
            Key::Major(pc) => (&MAJOR_PROFILE, pc % 12),
            Key::Minor(pc) => (&MINOR_PROFILE, pc % 12),
        };
        let mut rotated = [0.0f32; 12];
        for (i, slot) in rotated.iter_mut().enumerate() {
            *slot = profile[(i + 12 - root) % 12];
        }
        rotated
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}
