//! Metronome click synthesis and overlay

pub mod click;

pub use click::{overlay_clicks, overlay_clicks_with_downbeats};
