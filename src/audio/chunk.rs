use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{ debug, warn };
use thiserror::Error;

use super::wav::{ self, AudioBuffer, AudioError };

/// Marker carried in a head frame for the final segment of a capture session.
const TERMINAL_SIGN: &str = "end";

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("unrecognized frame: {0:?}")]
    UnknownFrame(String),
    #[error("malformed head frame: {0}")]
    BadHead(String),
    #[error("malformed part frame: {0}")]
    BadPart(String),
    #[error("part index {index} out of range for {total} parts")]
    IndexOutOfRange { index: usize, total: usize },
    #[error("part frame arrived with no preceding head")]
    MissingHead,
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("reassembled bytes are not a valid WAV container: {0}")]
    Audio(#[from] AudioError),
}

struct PendingSegment {
    parts: Vec<Option<String>>,
    received: usize,
    declared_len: usize,
    terminal: bool,
}

/// Reassembles base64 audio fragments shuttled across the host-runtime
/// bridge as pipe-delimited text frames:
///
/// ```text
/// Head|<partCount>|<totalLength>|<sign>
/// Part|<index>|<base64 payload, optionally data-URL prefixed>
/// ```
///
/// Each head opens one segment; `"end"` as the sign marks the terminal
/// segment of the capture session. Non-terminal segments are buffered until
/// the terminal one completes, at which point the concatenated bytes are
/// parsed as a WAV container and returned. A malformed or out-of-range part
/// drops the in-flight segment; already buffered segments survive so a
/// re-sent head can resume the session.
pub struct ChunkReassembler {
    pending: Option<PendingSegment>,
    segments: Vec<Vec<u8>>,
}

impl ChunkReassembler {
    pub fn new() -> Self {
        Self { pending: None, segments: Vec::new() }
    }

    /// Feeds one bridge frame. Returns the finished audio only when the
    /// terminal segment completes.
    pub fn push_frame(&mut self, frame: &str) -> Result<Option<AudioBuffer>, ChunkError> {
        let result = self.dispatch(frame);
        if result.is_err() {
            self.pending = None;
        }
        result
    }

    fn dispatch(&mut self, frame: &str) -> Result<Option<AudioBuffer>, ChunkError> {
        let mut fields = frame.splitn(2, '|');
        match fields.next() {
            Some("Head") => {
                self.on_head(fields.next().unwrap_or(""))?;
                Ok(None)
            }
            Some("Part") => self.on_part(fields.next().unwrap_or("")),
            _ => Err(ChunkError::UnknownFrame(frame.chars().take(32).collect())),
        }
    }

    fn on_head(&mut self, rest: &str) -> Result<(), ChunkError> {
        let fields: Vec<&str> = rest.split('|').collect();
        if fields.len() != 3 {
            return Err(ChunkError::BadHead(format!("expected 3 fields, got {}", fields.len())));
        }
        let part_count: usize = fields[0]
            .parse()
            .map_err(|_| ChunkError::BadHead(format!("bad part count {:?}", fields[0])))?;
        if part_count == 0 {
            return Err(ChunkError::BadHead("zero part count".to_string()));
        }
        let declared_len: usize = fields[1]
            .parse()
            .map_err(|_| ChunkError::BadHead(format!("bad total length {:?}", fields[1])))?;
        let terminal = fields[2] == TERMINAL_SIGN;

        debug!("chunk head: {} parts, {} declared chars, terminal={}", part_count, declared_len, terminal);

        // A new head discards any incomplete part state from the previous one.
        self.pending = Some(PendingSegment {
            parts: vec![None; part_count],
            received: 0,
            declared_len,
            terminal,
        });
        Ok(())
    }

    fn on_part(&mut self, rest: &str) -> Result<Option<AudioBuffer>, ChunkError> {
        let pending = self.pending.as_mut().ok_or(ChunkError::MissingHead)?;

        let (index_field, payload) = rest
            .split_once('|')
            .ok_or_else(|| ChunkError::BadPart("expected index and payload".to_string()))?;
        let index: usize = index_field
            .parse()
            .map_err(|_| ChunkError::BadPart(format!("bad index {:?}", index_field)))?;
        if index >= pending.parts.len() {
            return Err(ChunkError::IndexOutOfRange { index, total: pending.parts.len() });
        }

        // Duplicate indices overwrite without double-counting.
        if pending.parts[index].is_none() {
            pending.received += 1;
        }
        pending.parts[index] = Some(payload.to_string());

        if pending.received < pending.parts.len() {
            return Ok(None);
        }

        let segment = match self.pending.take() {
            Some(s) => s,
            None => return Ok(None),
        };
        self.complete_segment(segment)
    }

    fn complete_segment(&mut self, segment: PendingSegment) -> Result<Option<AudioBuffer>, ChunkError> {
        let mut joined = String::new();
        for part in &segment.parts {
            if let Some(payload) = part {
                joined.push_str(payload);
            }
        }
        if segment.declared_len != 0 && joined.len() != segment.declared_len {
            warn!(
                "chunk segment length mismatch: received {} chars, head declared {}",
                joined.len(),
                segment.declared_len
            );
        }

        // Strip a data-URL prefix if the bridge sent one.
        let body = match joined.rfind(',') {
            Some(i) => &joined[i + 1..],
            None => joined.as_str(),
        };
        let decoded = match STANDARD.decode(body) {
            Ok(bytes) => bytes,
            Err(e) => {
                // A failed terminal completion ends the capture session;
                // its buffered segments go with it.
                if segment.terminal {
                    self.segments.clear();
                }
                return Err(e.into());
            }
        };
        debug!("chunk segment decoded: {} bytes, terminal={}", decoded.len(), segment.terminal);

        if !segment.terminal {
            self.segments.push(decoded);
            return Ok(None);
        }

        // Terminal segment bytes come first, then the earlier segments in
        // arrival order.
        let mut audio = decoded;
        for buffered in self.segments.drain(..) {
            audio.extend_from_slice(&buffered);
        }
        let buffer = wav::decode_wav(&audio)?;
        Ok(Some(buffer))
    }
}

impl Default for ChunkReassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::encode_wav;

    fn wav_base64(samples: &[f32]) -> String {
        STANDARD.encode(encode_wav(samples, 16000, 1))
    }

    fn split3(s: &str) -> (&str, &str, &str) {
        let third = s.len() / 3;
        (&s[..third], &s[third..2 * third], &s[2 * third..])
    }

    #[test]
    fn single_terminal_segment_round_trips() {
        let samples = vec![0.0, 0.25, -0.25, 0.5];
        let b64 = wav_base64(&samples);
        let mut asm = ChunkReassembler::new();

        assert!(asm.push_frame(&format!("Head|1|{}|end", b64.len())).unwrap().is_none());
        let done = asm.push_frame(&format!("Part|0|{}", b64)).unwrap().unwrap();
        assert_eq!(done.sample_rate, 16000);
        assert_eq!(done.samples.len(), samples.len());
    }

    #[test]
    fn reassembly_is_index_ordered_not_arrival_ordered() {
        let samples: Vec<f32> = (0..64).map(|i| (i as f32) / 100.0).collect();
        let b64 = wav_base64(&samples);
        let (a, b, c) = split3(&b64);

        let mut in_order = ChunkReassembler::new();
        in_order.push_frame(&format!("Head|3|{}|end", b64.len())).unwrap();
        in_order.push_frame(&format!("Part|0|{}", a)).unwrap();
        in_order.push_frame(&format!("Part|1|{}", b)).unwrap();
        let expected = in_order.push_frame(&format!("Part|2|{}", c)).unwrap().unwrap();

        let mut shuffled = ChunkReassembler::new();
        shuffled.push_frame(&format!("Head|3|{}|end", b64.len())).unwrap();
        shuffled.push_frame(&format!("Part|0|{}", a)).unwrap();
        shuffled.push_frame(&format!("Part|2|{}", c)).unwrap();
        let got = shuffled.push_frame(&format!("Part|1|{}", b)).unwrap().unwrap();

        assert_eq!(got.samples, expected.samples);
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let samples = vec![0.1, -0.1];
        let b64 = wav_base64(&samples);
        let mut asm = ChunkReassembler::new();
        asm.push_frame("Head|1|0|end").unwrap();
        let done = asm
            .push_frame(&format!("Part|0|data:audio/wav;base64,{}", b64))
            .unwrap()
            .unwrap();
        assert_eq!(done.samples.len(), 2);
    }

    #[test]
    fn non_terminal_segments_are_buffered_behind_the_terminal_one() {
        // The terminal segment carries the WAV header; a previously sent
        // continuation segment holds extra PCM appended after it.
        let head_bytes = encode_wav(&[0.5, 0.5], 16000, 1);
        let tail_bytes: Vec<u8> = vec![0x00, 0x40, 0x00, 0x40]; // two 0.5 samples
        let head_b64 = STANDARD.encode(&head_bytes);
        let tail_b64 = STANDARD.encode(&tail_bytes);

        let mut asm = ChunkReassembler::new();
        asm.push_frame(&format!("Head|1|{}|go", tail_b64.len())).unwrap();
        assert!(asm.push_frame(&format!("Part|0|{}", tail_b64)).unwrap().is_none());

        asm.push_frame(&format!("Head|1|{}|end", head_b64.len())).unwrap();
        let done = asm.push_frame(&format!("Part|0|{}", head_b64)).unwrap().unwrap();
        assert_eq!(done.samples.len(), 4);
        for s in &done.samples {
            assert!((s - 0.5).abs() <= 1.0 / 32768.0);
        }
    }

    #[test]
    fn duplicate_part_overwrites_without_completing_early() {
        let samples = vec![0.2, -0.2, 0.4, -0.4];
        let b64 = wav_base64(&samples);
        let half = b64.len() / 2;
        let mut asm = ChunkReassembler::new();

        asm.push_frame(&format!("Head|2|{}|end", b64.len())).unwrap();
        assert!(asm.push_frame(&format!("Part|0|{}", &b64[..half])).unwrap().is_none());
        assert!(asm.push_frame(&format!("Part|0|{}", &b64[..half])).unwrap().is_none());
        let done = asm.push_frame(&format!("Part|1|{}", &b64[half..])).unwrap().unwrap();
        assert_eq!(done.samples.len(), samples.len());
    }

    #[test]
    fn failed_terminal_completion_discards_buffered_segments() {
        let mut asm = ChunkReassembler::new();

        // One good continuation segment sits in the buffer.
        let tail_b64 = STANDARD.encode([0x00u8, 0x40]);
        asm.push_frame(&format!("Head|1|{}|go", tail_b64.len())).unwrap();
        assert!(asm.push_frame(&format!("Part|0|{}", tail_b64)).unwrap().is_none());

        // The terminal segment's payload is not decodable.
        asm.push_frame("Head|1|0|end").unwrap();
        assert!(matches!(
            asm.push_frame("Part|0|@@not-base64@@"),
            Err(ChunkError::Base64(_))
        ));

        // The next capture session must not inherit the stale bytes.
        let samples = vec![0.25, -0.25];
        let b64 = wav_base64(&samples);
        asm.push_frame(&format!("Head|1|{}|end", b64.len())).unwrap();
        let done = asm.push_frame(&format!("Part|0|{}", b64)).unwrap().unwrap();
        assert_eq!(done.samples.len(), samples.len());
    }

    #[test]
    fn part_without_head_is_rejected() {
        let mut asm = ChunkReassembler::new();
        assert!(matches!(asm.push_frame("Part|0|QUJD"), Err(ChunkError::MissingHead)));
    }

    #[test]
    fn out_of_range_index_drops_the_segment() {
        let mut asm = ChunkReassembler::new();
        asm.push_frame("Head|2|0|end").unwrap();
        assert!(matches!(
            asm.push_frame("Part|5|QUJD"),
            Err(ChunkError::IndexOutOfRange { index: 5, total: 2 })
        ));
        // The in-flight segment is gone; parts need a fresh head.
        assert!(matches!(asm.push_frame("Part|0|QUJD"), Err(ChunkError::MissingHead)));
    }

    #[test]
    fn malformed_head_is_rejected() {
        let mut asm = ChunkReassembler::new();
        assert!(matches!(asm.push_frame("Head|zero|12|end"), Err(ChunkError::BadHead(_))));
        assert!(matches!(asm.push_frame("Head|0|12|end"), Err(ChunkError::BadHead(_))));
        assert!(matches!(asm.push_frame("Hello|1|2|3"), Err(ChunkError::UnknownFrame(_))));
    }
}
