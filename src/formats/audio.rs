//! WAV and FLAC containers. Dispatch by extension.
//!
//! Probes read header metadata only (the RIFF fmt chunk, the FLAC
//! STREAMINFO block); decodes read and de-interleave the full payload.
//! Both are cheap enough per file that no decode caching is involved.

use std::path::Path;

use crate::error::{DatasetError, Result};
use crate::shape::{self, Ir};

/// Header metadata of an audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMeta {
    /// Number of channels.
    pub channels: usize,
    /// Number of frames (samples per channel).
    pub frames: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Read header-only metadata without decoding samples.
pub fn probe(path: &Path) -> Result<AudioMeta> {
    match extension(path).as_str() {
        "wav" => probe_wav(path),
        "flac" => probe_flac(path),
        _ => Err(DatasetError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Decode the full sample payload to a `(channels, samples)` buffer.
///
/// Mono files come back as `(1, samples)`.
pub fn decode(path: &Path) -> Result<Ir> {
    match extension(path).as_str() {
        "wav" => decode_wav(path),
        "flac" => decode_flac(path),
        _ => Err(DatasetError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

// ---------------------------------------------------------------------------
// WAV (hound)
// ---------------------------------------------------------------------------

fn wav_err(path: &Path, e: hound::Error) -> DatasetError {
    DatasetError::Audio {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn probe_wav(path: &Path) -> Result<AudioMeta> {
    let reader = hound::WavReader::open(path).map_err(|e| wav_err(path, e))?;
    let spec = reader.spec();
    Ok(AudioMeta {
        channels: spec.channels as usize,
        frames: reader.duration() as usize,
        sample_rate: spec.sample_rate,
    })
}

fn decode_wav(path: &Path) -> Result<Ir> {
    let mut reader = hound::WavReader::open(path).map_err(|e| wav_err(path, e))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| wav_err(path, e))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| wav_err(path, e))?
        }
    };

    de_interleave(path, interleaved, channels)
}

// ---------------------------------------------------------------------------
// FLAC (claxon)
// ---------------------------------------------------------------------------

fn flac_err(path: &Path, e: claxon::Error) -> DatasetError {
    DatasetError::Audio {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn probe_flac(path: &Path) -> Result<AudioMeta> {
    let reader = claxon::FlacReader::open(path).map_err(|e| flac_err(path, e))?;
    let info = reader.streaminfo();
    let frames = info.samples.ok_or_else(|| DatasetError::Malformed {
        path: path.to_path_buf(),
        reason: "STREAMINFO declares no sample count".into(),
    })?;
    Ok(AudioMeta {
        channels: info.channels as usize,
        frames: frames as usize,
        sample_rate: info.sample_rate,
    })
}

fn decode_flac(path: &Path) -> Result<Ir> {
    let mut reader = claxon::FlacReader::open(path).map_err(|e| flac_err(path, e))?;
    let info = reader.streaminfo();
    let channels = info.channels as usize;
    let scale = 1.0 / (1i64 << (info.bits_per_sample - 1)) as f32;

    let mut interleaved = Vec::new();
    for sample in reader.samples() {
        let s = sample.map_err(|e| flac_err(path, e))?;
        interleaved.push(s as f32 * scale);
    }

    de_interleave(path, interleaved, channels)
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

fn de_interleave(path: &Path, interleaved: Vec<f32>, channels: usize) -> Result<Ir> {
    if channels == 0 || interleaved.len() % channels != 0 {
        return Err(DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: format!(
                "{} samples do not fill {} channels evenly",
                interleaved.len(),
                channels
            ),
        });
    }
    let mut rows: Vec<Vec<f32>> = (0..channels)
        .map(|_| Vec::with_capacity(interleaved.len() / channels))
        .collect();
    for (i, s) in interleaved.into_iter().enumerate() {
        rows[i % channels].push(s);
    }
    shape::from_rows(rows)
}

/// Test fixture: a small 16-bit PCM WAV with recognizable per-channel
/// content (channel `c` carries an offset of `1000 * c`).
#[cfg(test)]
pub(crate) fn write_wav(path: &Path, channels: u16, frames: usize, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for frame in 0..frames {
        for ch in 0..channels {
            writer
                .write_sample(((frame as i32 % 100) + ch as i32 * 1000) as i16)
                .unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Test fixture: a FLAC stream header with a single STREAMINFO metadata
/// block and no audio frames (claxon ships no encoder, so the header is
/// assembled by hand).
#[cfg(test)]
pub(crate) fn write_flac_headers(path: &Path, channels: u16, frames: u64, sample_rate: u32) {
    let mut out = Vec::new();
    out.extend_from_slice(b"fLaC");
    // Metadata block header: last-block flag set, type 0, length 34.
    out.push(0x80);
    out.extend_from_slice(&[0, 0, 34]);
    out.extend_from_slice(&4096u16.to_be_bytes()); // min block size
    out.extend_from_slice(&4096u16.to_be_bytes()); // max block size
    out.extend_from_slice(&[0; 6]); // frame sizes unknown
    let packed: u64 = (u64::from(sample_rate) << 44)
        | ((u64::from(channels) - 1) << 41)
        | ((16 - 1) << 36)
        | (frames & 0xF_FFFF_FFFF);
    out.extend_from_slice(&packed.to_be_bytes());
    out.extend_from_slice(&[0; 16]); // MD5 unknown
    std::fs::write(path, out).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn wav_probe_reads_header_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.wav");
        write_wav(&path, 2, 480, 48000);

        let meta = probe(&path).unwrap();
        assert_eq!(
            meta,
            AudioMeta {
                channels: 2,
                frames: 480,
                sample_rate: 48000
            }
        );
    }

    #[test]
    fn wav_decode_de_interleaves() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.wav");
        write_wav(&path, 2, 100, 44100);

        let ir = decode(&path).unwrap();
        assert_eq!(ir.dim(), (2, 100));
        // Channel 1 samples carry the +1000 offset from the writer.
        assert!(ir[[1, 0]] > ir[[0, 0]]);
    }

    #[test]
    fn mono_wav_decodes_to_one_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.wav");
        write_wav(&path, 1, 64, 16000);
        assert_eq!(decode(&path).unwrap().dim(), (1, 64));
    }

    #[test]
    fn flac_probe_reads_streaminfo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.flac");
        write_flac_headers(&path, 2, 480, 44100);

        let meta = probe(&path).unwrap();
        assert_eq!(
            meta,
            AudioMeta {
                channels: 2,
                frames: 480,
                sample_rate: 44100
            }
        );
    }

    #[test]
    fn flac_decode_handles_a_frameless_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.flac");
        write_flac_headers(&path, 2, 0, 48000);

        let ir = decode(&path).unwrap();
        assert_eq!(ir.dim(), (2, 0));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            probe(Path::new("ir.ogg")).unwrap_err(),
            DatasetError::UnsupportedFormat { .. }
        ));
    }
}
