use thiserror::Error;

/// Byte offset of the PCM payload in a canonical 44-byte header WAV.
pub const DATA_OFFSET: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;

/// Decoded audio, normalized float samples in [-1, 1]. The decoder always
/// emits mono: multi-channel input keeps the first channel.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("buffer too short for a WAV header ({0} bytes)")]
    TooShort(usize),
    #[error("missing RIFF/WAVE magic")]
    BadMagic,
    #[error("unsupported format code {0}, expected PCM (1)")]
    NotPcm(u16),
    #[error("header declares zero channels")]
    NoChannels,
}

/// Encodes normalized float samples as a canonical 16-bit PCM WAV byte
/// stream: 44-byte header followed by little-endian samples.
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut bytes = Vec::with_capacity(DATA_OFFSET + data_len as usize);

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
    bytes.extend_from_slice(&(channels * 2).to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());

    for &sample in samples {
        let quantized = (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
        bytes.extend_from_slice(&quantized.to_le_bytes());
    }

    bytes
}

/// Decodes a canonical fixed-format WAV container. Channel count and sample
/// rate are read from their fixed header offsets; the payload is assumed to
/// start at byte 44.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer, AudioError> {
    if bytes.len() < DATA_OFFSET {
        return Err(AudioError::TooShort(bytes.len()));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(AudioError::BadMagic);
    }

    let format_code = u16::from_le_bytes([bytes[20], bytes[21]]);
    if format_code != 1 {
        return Err(AudioError::NotPcm(format_code));
    }
    let channels = u16::from_le_bytes([bytes[22], bytes[23]]);
    if channels == 0 {
        return Err(AudioError::NoChannels);
    }
    let sample_rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);

    let frame = channels as usize * 2;
    let samples = bytes[DATA_OFFSET..]
        .chunks_exact(frame)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect();

    Ok(AudioBuffer { samples, sample_rate, channels: 1 })
}

/// Decodes a headerless interleaved 16-bit little-endian PCM payload at the
/// given sample rate.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32) -> AudioBuffer {
    let samples = bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect();
    AudioBuffer { samples, sample_rate, channels: 1 }
}

pub fn looks_like_wav(bytes: &[u8]) -> bool {
    bytes.len() >= DATA_OFFSET && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}
