//! WAV read/write adapter
//!
//! 16-bit PCM only, matching the payload the external extractors produce
//! (`ffmpeg ... -acodec pcm_s16le`).

use std::path::Path;

use crate::error::AnalysisError;
use crate::io::pcm::PcmBuffer;

/// Read a 16-bit PCM WAV file into a [`PcmBuffer`]
///
/// # Errors
///
/// Returns `AnalysisError::DecodeError` for malformed files or unsupported
/// sample formats, `AnalysisError::IoError` when the file cannot be opened.
pub fn read_wav(path: &Path) -> Result<PcmBuffer, AnalysisError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => AnalysisError::IoError(format!(
            "Failed to open WAV file {}: {}",
            path.display(),
            io
        )),
        other => AnalysisError::DecodeError(format!(
            "Malformed WAV file {}: {}",
            path.display(),
            other
        )),
    })?;

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AnalysisError::DecodeError(format!(
            "WAV file {} is not 16-bit PCM",
            path.display()
        )));
    }

    let samples: Result<Vec<f32>, _> = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect();
    let samples = samples.map_err(|e| {
        AnalysisError::DecodeError(format!("Failed reading WAV samples from {}: {}", path.display(), e))
    })?;

    if samples.is_empty() {
        return Err(AnalysisError::DecodeError(format!(
            "WAV file {} contains no samples",
            path.display()
        )));
    }

    log::debug!(
        "Read WAV {}: {} samples, {} Hz, {} channel(s)",
        path.display(),
        samples.len(),
        spec.sample_rate,
        spec.channels
    );

    PcmBuffer::new(samples, spec.sample_rate, spec.channels)
}

/// Write a [`PcmBuffer`] as a 16-bit PCM WAV file
///
/// Floats are clamped to [-1, 1] and scaled by 32767. On failure the
/// partial output is removed if possible.
///
/// # Errors
///
/// Returns `AnalysisError::IoError` if the file cannot be created or the
/// write fails partway through.
pub fn write_wav(path: &Path, audio: &PcmBuffer) -> Result<(), AnalysisError> {
    if audio.sample_rate == 0 || audio.channels == 0 {
        return Err(AnalysisError::InvalidInput(
            "Cannot write WAV from an empty audio buffer".to_string(),
        ));
    }

    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let result = (|| -> Result<(), hound::Error> {
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &audio.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * 32767.0) as i16)?;
        }
        writer.finalize()?;
        Ok(())
    })();

    if let Err(e) = result {
        // Best-effort removal of the truncated file.
        let _ = std::fs::remove_file(path);
        return Err(AnalysisError::IoError(format!(
            "Failed writing WAV {}: {}",
            path.display(),
            e
        )));
    }

    log::debug!(
        "Wrote WAV {}: {} frames, {} Hz, {} channel(s)",
        path.display(),
        audio.frames(),
        audio.sample_rate,
        audio.channels
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("round_trip.wav");

        // One second of a 440 Hz tone, stereo.
        let mut samples = Vec::with_capacity(44100 * 2);
        for i in 0..44100usize {
            let t = i as f32 / 44100.0;
            let v = (t * 440.0 * std::f32::consts::TAU).sin() * 0.5;
            samples.push(v);
            samples.push(v);
        }
        let original = PcmBuffer::new(samples, 44100, 2).unwrap();

        write_wav(&path, &original).unwrap();
        let read_back = read_wav(&path).unwrap();

        assert_eq!(read_back.sample_rate, 44100);
        assert_eq!(read_back.channels, 2);
        assert_eq!(read_back.samples.len(), original.samples.len());

        // 16-bit quantization error bound.
        for (a, b) in original.samples.iter().zip(read_back.samples.iter()) {
            assert!((a - b).abs() < 1.0 / 32000.0, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_write_clamps_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clamped.wav");

        let buf = PcmBuffer::new(vec![2.0, -2.0, 0.0, 1.0], 8000, 1).unwrap();
        write_wav(&path, &buf).unwrap();

        let read_back = read_wav(&path).unwrap();
        assert!(read_back.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!((read_back.samples[0] - 32767.0 / 32768.0).abs() < 1e-4);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_wav(Path::new("/nonexistent/not_here.wav"));
        assert!(matches!(result, Err(AnalysisError::IoError(_))));
    }

    #[test]
    fn test_write_rejects_empty_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        let buf = PcmBuffer {
            samples: vec![],
            sample_rate: 0,
            channels: 0,
            title: None,
        };
        assert!(write_wav(&path, &buf).is_err());
    }
}
