//! External extraction adapters
//!
//! MP4/M4A files and URL streams are converted to 16-bit stereo WAV by
//! spawning `ffmpeg` (and `yt-dlp` for URLs). All intermediate artifacts
//! live inside a [`tempfile::TempDir`] so they are removed on success and
//! on every error path alike.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::AnalysisError;
use crate::io::pcm::PcmBuffer;
use crate::io::wav;

/// Extract the audio track of a container file (MP4/M4A) via ffmpeg
///
/// # Errors
///
/// Returns `AnalysisError::DecodeError` when ffmpeg is missing, exits
/// nonzero, or produces an unreadable WAV.
pub fn extract_file(path: &Path) -> Result<PcmBuffer, AnalysisError> {
    let dir = tempfile::tempdir()?;
    let wav_path = dir.path().join("extracted.wav");

    run_ffmpeg(path, &wav_path)?;
    let audio = wav::read_wav(&wav_path)?;

    log::debug!(
        "Extracted {} frames @ {} Hz from {}",
        audio.frames(),
        audio.sample_rate,
        path.display()
    );

    Ok(audio)
}

/// Download a URL's best audio stream and convert it to PCM
///
/// Uses `yt-dlp` for the download and `ffmpeg` for the conversion. The
/// stream title (when available) is stored on the returned buffer for
/// output naming.
///
/// # Errors
///
/// Returns `AnalysisError::DecodeError` when either tool is missing or
/// fails.
pub fn extract_url(url: &str) -> Result<PcmBuffer, AnalysisError> {
    let dir = tempfile::tempdir()?;
    let download_path = dir.path().join("download");
    let wav_path = dir.path().join("audio.wav");

    let status = Command::new("yt-dlp")
        .arg("-f")
        .arg("bestaudio")
        .arg("--no-playlist")
        .arg("-o")
        .arg(&download_path)
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| {
            AnalysisError::DecodeError(format!(
                "Failed to run yt-dlp: {}. Ensure yt-dlp is installed.",
                e
            ))
        })?;

    if !status.success() {
        return Err(AnalysisError::DecodeError(format!(
            "yt-dlp failed to download audio from: {}. Ensure the URL is valid.",
            url
        )));
    }

    run_ffmpeg(&download_path, &wav_path)?;
    let mut audio = wav::read_wav(&wav_path)?;
    audio.title = fetch_title(url);

    log::debug!(
        "Downloaded {} frames @ {} Hz from {} (title: {:?})",
        audio.frames(),
        audio.sample_rate,
        url,
        audio.title
    );

    Ok(audio)
}

/// Convert any input ffmpeg understands to 44.1 kHz stereo 16-bit WAV
fn run_ffmpeg(input: &Path, output: &Path) -> Result<(), AnalysisError> {
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-vn")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg("44100")
        .arg("-ac")
        .arg("2")
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| {
            AnalysisError::DecodeError(format!(
                "Failed to run ffmpeg: {}. Ensure ffmpeg is installed.",
                e
            ))
        })?;

    if !status.success() {
        return Err(AnalysisError::DecodeError(format!(
            "ffmpeg failed to extract audio from: {}. Ensure the file contains an audio track.",
            input.display()
        )));
    }

    Ok(())
}

/// Best-effort title lookup for a URL stream
///
/// A failure here is not fatal; output naming falls back to a generic name.
fn fetch_title(url: &str) -> Option<String> {
    let output = Command::new("yt-dlp")
        .arg("--no-playlist")
        .arg("--skip-download")
        .arg("--print")
        .arg("title")
        .arg(url)
        .stderr(Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let title = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_file_fails() {
        // ffmpeg absent or input missing; either way this must be an error
        // and must not leave artifacts behind (TempDir guarantees cleanup).
        let result = extract_file(Path::new("/nonexistent/input.mp4"));
        assert!(result.is_err());
    }
}
