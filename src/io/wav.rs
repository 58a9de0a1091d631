use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use log::debug;

use crate::core::types::{AudioBuffer, Sample};
use crate::error::StretchError;

/// Sample encoding used when writing WAV data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavFormat {
    /// 16-bit signed PCM, samples clamped to `[-1, 1]`.
    #[default]
    Pcm16,
    /// 32-bit IEEE float.
    Float32,
}

/// Decodes WAV data (integer PCM of any depth up to 32 bits, or 32-bit
/// float) into interleaved samples in `[-1, 1]`.
pub fn read_wav<R: Read>(reader: R) -> Result<AudioBuffer, StretchError> {
    let mut reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();
    let data: Vec<Sample> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };
    debug!(
        "decoded {} samples ({} ch, {} Hz, {} bit {:?})",
        data.len(),
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format
    );
    AudioBuffer::new(data, spec.channels, spec.sample_rate)
}

/// Reads a WAV file from a byte slice.
pub fn read_wav_bytes(data: &[u8]) -> Result<AudioBuffer, StretchError> {
    read_wav(Cursor::new(data))
}

/// Reads a WAV file from disk.
pub fn read_wav_file(path: impl AsRef<Path>) -> Result<AudioBuffer, StretchError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| StretchError::Io(format!("{}: {}", path.display(), e)))?;
    read_wav(std::io::BufReader::new(file))
}

fn wav_spec(buffer: &AudioBuffer, format: WavFormat) -> hound::WavSpec {
    let (bits_per_sample, sample_format) = match format {
        WavFormat::Pcm16 => (16, hound::SampleFormat::Int),
        WavFormat::Float32 => (32, hound::SampleFormat::Float),
    };
    hound::WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample,
        sample_format,
    }
}

/// Encodes `buffer` as WAV into any seekable writer.
pub fn write_wav<W: Write + Seek>(
    writer: W,
    buffer: &AudioBuffer,
    format: WavFormat,
) -> Result<(), StretchError> {
    let mut writer = hound::WavWriter::new(writer, wav_spec(buffer, format))?;
    match format {
        WavFormat::Pcm16 => {
            for &sample in &buffer.data {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
            }
        }
        WavFormat::Float32 => {
            for &sample in &buffer.data {
                writer.write_sample(sample)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Encodes `buffer` as an in-memory WAV file.
pub fn write_wav_bytes(buffer: &AudioBuffer, format: WavFormat) -> Result<Vec<u8>, StretchError> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, buffer, format)?;
    Ok(cursor.into_inner())
}

/// Writes a WAV file to disk.
pub fn write_wav_file(
    path: impl AsRef<Path>,
    buffer: &AudioBuffer,
    format: WavFormat,
) -> Result<(), StretchError> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .map_err(|e| StretchError::Io(format!("{}: {}", path.display(), e)))?;
    write_wav(std::io::BufWriter::new(file), buffer, format)?;
    debug!("wrote {} samples to {}", buffer.data.len(), path.display());
    Ok(())
}
