//! Mono WAV export of offline-rendered audio, via `hound`.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::Path;

/// Sample encoding of the written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavFormat {
    /// 16-bit PCM; samples are clamped to [-1, 1].
    #[default]
    Int16,
    Float32,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("wav encoding failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("sample rate must be positive")]
    ZeroSampleRate,
}

fn spec(sample_rate: u32, format: WavFormat) -> WavSpec {
    let (bits_per_sample, sample_format) = match format {
        WavFormat::Int16 => (16, SampleFormat::Int),
        WavFormat::Float32 => (32, SampleFormat::Float),
    };
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample,
        sample_format,
    }
}

#[inline]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Write `samples` as a mono WAV stream.
pub fn write_wav_to<W: Write + Seek>(
    writer: W,
    samples: &[f32],
    sample_rate: u32,
    format: WavFormat,
) -> Result<(), RenderError> {
    if sample_rate == 0 {
        return Err(RenderError::ZeroSampleRate);
    }
    let mut wav = WavWriter::new(writer, spec(sample_rate, format))?;
    match format {
        WavFormat::Int16 => {
            for &sample in samples {
                wav.write_sample(to_i16(sample))?;
            }
        }
        WavFormat::Float32 => {
            for &sample in samples {
                wav.write_sample(sample)?;
            }
        }
    }
    wav.finalize()?;
    Ok(())
}

/// Write `samples` to a mono WAV file at `path`.
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    format: WavFormat,
) -> Result<(), RenderError> {
    let path = path.as_ref();
    let file = std::io::BufWriter::new(std::fs::File::create(path).map_err(hound::Error::IoError)?);
    write_wav_to(file, samples, sample_rate, format)?;
    tracing::debug!(path = %path.display(), samples = samples.len(), sample_rate, "wrote wav");
    Ok(())
}
