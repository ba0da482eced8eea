//! Input classification and decoding dispatch
//!
//! Inputs are either local files (dispatched by extension) or URLs
//! (detected by the `://` substring). Compressed formats symphonia knows
//! are decoded in-process; MP4/M4A containers and URL streams go through
//! the external extraction adapters.

use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AnalysisError;
use crate::io::extractor;
use crate::io::pcm::PcmBuffer;
use crate::io::wav;

/// A classified input source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Local file with its lowercased extension (no dot)
    File { path: PathBuf, ext: String },
    /// Remote stream
    Url(String),
}

impl InputSource {
    /// Classify a raw CLI input string
    pub fn classify(input: &str) -> InputSource {
        if input.contains("://") {
            return InputSource::Url(input.to_string());
        }
        let path = PathBuf::from(input);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        InputSource::File { path, ext }
    }

    /// Decode this source into an interleaved PCM buffer
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::DecodeError` for unsupported formats or
    /// decoder failures.
    pub fn decode(&self) -> Result<PcmBuffer, AnalysisError> {
        match self {
            InputSource::Url(url) => extractor::extract_url(url),
            InputSource::File { path, ext } => match ext.as_str() {
                "wav" => wav::read_wav(path),
                "mp3" | "flac" | "ogg" => decode_with_symphonia(path),
                "mp4" | "m4a" => extractor::extract_file(path),
                other => Err(AnalysisError::DecodeError(format!(
                    "Unsupported file format: .{}\nSupported: .wav, .mp3, .flac, .ogg, .mp4, .m4a, URL",
                    other
                ))),
            },
        }
    }
}

/// Decode a compressed audio file in-process with symphonia
///
/// Produces interleaved f32 samples with the source channel count
/// preserved; the stereo path stays intact for the click overlay.
fn decode_with_symphonia(path: &Path) -> Result<PcmBuffer, AnalysisError> {
    let file = std::fs::File::open(path).map_err(|e| {
        AnalysisError::IoError(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            AnalysisError::DecodeError(format!("Failed to probe {}: {}", path.display(), e))
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| {
            AnalysisError::DecodeError(format!("No audio tracks found in {}", path.display()))
        })?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        AnalysisError::DecodeError(format!("Unknown sample rate in {}", path.display()))
    })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| {
            AnalysisError::DecodeError(format!(
                "Failed to create decoder for {}: {}",
                path.display(),
                e
            ))
        })?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(AnalysisError::DecodeError(format!(
                    "Failed reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Recoverable corrupt packet; skip it.
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => {
                return Err(AnalysisError::DecodeError(format!(
                    "Failed decoding {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() {
        return Err(AnalysisError::DecodeError(format!(
            "Decoded stream contained no samples: {}",
            path.display()
        )));
    }

    log::debug!(
        "Decoded {}: {} samples, {} Hz, {} channel(s)",
        path.display(),
        samples.len(),
        sample_rate,
        channels
    );

    PcmBuffer::new(samples, sample_rate, channels as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_url() {
        let src = InputSource::classify("https://example.com/watch?v=abc");
        assert_eq!(
            src,
            InputSource::Url("https://example.com/watch?v=abc".to_string())
        );
    }

    #[test]
    fn test_classify_file_extension_lowercased() {
        let src = InputSource::classify("/music/Track.MP3");
        match src {
            InputSource::File { ext, .. } => assert_eq!(ext, "mp3"),
            _ => panic!("expected file source"),
        }
    }

    #[test]
    fn test_classify_no_extension() {
        let src = InputSource::classify("trackfile");
        match src {
            InputSource::File { ext, .. } => assert!(ext.is_empty()),
            _ => panic!("expected file source"),
        }
    }

    #[test]
    fn test_decode_unsupported_format() {
        let src = InputSource::classify("notes.txt");
        let result = src.decode();
        assert!(matches!(result, Err(AnalysisError::DecodeError(_))));
    }
}
