//! Self-describing frame codec for the framed wire format.
//!
//! Wire format:
//! ```text
//! ┌──────┬─────┬─────┬──────────────────┬──────────────┐
//! │ SOF  │ Tag │ Len │ Payload (Len B)  │ CRC16 (LE)   │
//! │ 0x7E │ 1B  │ 1B  │ 0..=MAX_PAYLOAD  │ over Tag..   │
//! └──────┴─────┴─────┴──────────────────┴──────────────┘
//! ```
//!
//! The CRC is CRC-16/CCITT-FALSE over tag, length and payload. The decoder
//! consumes one byte at a time so the link can poll the UART without ever
//! reading past the frame it is waiting for. Bytes outside a frame are
//! skipped until the next start-of-frame marker.

use core::fmt;

/// Start-of-frame marker.
pub const SOF: u8 = 0x7E;

/// Largest payload any message carries.
pub const MAX_PAYLOAD: usize = 4;

/// SOF + tag + len + payload + CRC.
pub const MAX_FRAME_LEN: usize = 3 + MAX_PAYLOAD + 2;

/// Reasons a frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Length byte exceeds [`MAX_PAYLOAD`].
    BadLength(u8),
    /// Checksum mismatch.
    BadCrc { expected: u16, got: u16 },
    /// Tag is not a known message kind.
    UnknownTag(u8),
    /// Payload does not match what the tag requires.
    Malformed { tag: u8 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength(len) => write!(f, "bad frame length {len}"),
            Self::BadCrc { expected, got } => {
                write!(f, "CRC mismatch (expected 0x{expected:04X}, got 0x{got:04X})")
            }
            Self::UnknownTag(tag) => write!(f, "unknown tag 0x{tag:02X}"),
            Self::Malformed { tag } => write!(f, "malformed payload for tag 0x{tag:02X}"),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub tag: u8,
    len: u8,
    payload: [u8; MAX_PAYLOAD],
}

impl Frame {
    pub fn new(tag: u8, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_PAYLOAD {
            return None;
        }
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[..payload.len()].copy_from_slice(payload);
        Some(Self {
            tag,
            len: payload.len() as u8,
            payload: buf,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len as usize]
    }

    fn checksum(&self) -> u16 {
        let mut crc = crc16_update(0xFFFF, &[self.tag, self.len]);
        crc = crc16_update(crc, self.payload());
        crc
    }

    /// Encode into `out`. Returns the number of bytes written.
    pub fn encode(&self, out: &mut [u8]) -> Option<usize> {
        let total = 3 + self.len as usize + 2;
        if out.len() < total {
            return None;
        }
        out[0] = SOF;
        out[1] = self.tag;
        out[2] = self.len;
        out[3..3 + self.len as usize].copy_from_slice(self.payload());
        out[3 + self.len as usize..total].copy_from_slice(&self.checksum().to_le_bytes());
        Some(total)
    }
}

/// Decoder state machine.
#[derive(Debug, Clone, Copy)]
enum DecoderState {
    /// Skipping bytes until SOF.
    Hunting,
    Tag,
    Len { tag: u8 },
    Payload { tag: u8, len: u8, collected: u8 },
    CrcLow { tag: u8, len: u8 },
    CrcHigh { tag: u8, len: u8, low: u8 },
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    state: DecoderState,
    payload: [u8; MAX_PAYLOAD],
    skipped: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Hunting,
            payload: [0; MAX_PAYLOAD],
            skipped: 0,
        }
    }

    /// Feed one byte.
    ///
    /// Returns `Some(Ok(frame))` when a valid frame completes, `Some(Err(_))`
    /// when a frame was rejected, `None` while more bytes are needed.
    pub fn feed(&mut self, byte: u8) -> Option<Result<Frame, FrameError>> {
        match self.state {
            DecoderState::Hunting => {
                if byte == SOF {
                    self.state = DecoderState::Tag;
                } else {
                    self.skipped = self.skipped.wrapping_add(1);
                }
                None
            }
            DecoderState::Tag => {
                self.state = DecoderState::Len { tag: byte };
                None
            }
            DecoderState::Len { tag } => {
                if byte as usize > MAX_PAYLOAD {
                    self.state = DecoderState::Hunting;
                    return Some(Err(FrameError::BadLength(byte)));
                }
                self.state = if byte == 0 {
                    DecoderState::CrcLow { tag, len: 0 }
                } else {
                    DecoderState::Payload {
                        tag,
                        len: byte,
                        collected: 0,
                    }
                };
                None
            }
            DecoderState::Payload {
                tag,
                len,
                collected,
            } => {
                self.payload[collected as usize] = byte;
                let collected = collected + 1;
                self.state = if collected == len {
                    DecoderState::CrcLow { tag, len }
                } else {
                    DecoderState::Payload {
                        tag,
                        len,
                        collected,
                    }
                };
                None
            }
            DecoderState::CrcLow { tag, len } => {
                self.state = DecoderState::CrcHigh { tag, len, low: byte };
                None
            }
            DecoderState::CrcHigh { tag, len, low } => {
                self.state = DecoderState::Hunting;
                let mut payload = [0u8; MAX_PAYLOAD];
                payload[..len as usize].copy_from_slice(&self.payload[..len as usize]);
                let frame = Frame { tag, len, payload };
                let got = u16::from_le_bytes([low, byte]);
                let expected = frame.checksum();
                if got == expected {
                    Some(Ok(frame))
                } else {
                    Some(Err(FrameError::BadCrc { expected, got }))
                }
            }
        }
    }

    /// Bytes discarded while hunting for SOF since construction.
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Drop any partial frame (e.g. after a resync).
    pub fn reset(&mut self) {
        self.state = DecoderState::Hunting;
    }
}

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF).
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    crc16_update(0xFFFF, data)
}

fn crc16_update(mut crc: u16, data: &[u8]) -> u16 {
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
