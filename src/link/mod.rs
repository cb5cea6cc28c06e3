//! Inter-node serial link.
//!
//! A [`Link`] wraps a byte [`Transport`] and speaks one of two wire formats:
//!
//! - [`WireFormat::Raw`]: every message is a single byte, message boundaries
//!   are implied by the session sequence and the acknowledgment is the
//!   literal [`ACK`] byte. Compatible with nodes running the byte protocol.
//! - [`WireFormat::Framed`]: every message is a CRC-checked frame (see
//!   [`codec`]) tagged with its kind, so a dropped or duplicated byte surfaces
//!   as a [`LinkError`] instead of silently shifting every later field.
//!
//! All waits are expressed in transport polls, never wall-clock time. One poll
//! waits at most one poll interval inside the transport.

pub mod codec;
pub mod transport;

use core::fmt;

use log::{debug, warn};

pub use codec::{Frame, FrameDecoder, FrameError, MAX_FRAME_LEN};
pub use transport::{NullTransport, Transport};

use crate::config::{LinkConfig, WireFormat};

/// Acknowledgment sentinel on the raw wire.
pub const ACK: u8 = 0xAA;

// Frame tags.
const TAG_COMMAND: u8 = 0x01;
const TAG_TICK: u8 = 0x02;
const TAG_FIELD: u8 = 0x03;
const TAG_ACK: u8 = 0x04;
const TAG_REPEAT: u8 = 0x05;
const TAG_RESYNC: u8 = 0x06;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Payload fields carried inside sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Temperature,
    DistanceHigh,
    DistanceLow,
    Window1,
    Window2,
    DistCounter,
    TempCounter,
}

impl Field {
    pub const fn id(self) -> u8 {
        match self {
            Self::Temperature => 1,
            Self::DistanceHigh => 2,
            Self::DistanceLow => 3,
            Self::Window1 => 4,
            Self::Window2 => 5,
            Self::DistCounter => 6,
            Self::TempCounter => 7,
        }
    }

    pub const fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            1 => Self::Temperature,
            2 => Self::DistanceHigh,
            3 => Self::DistanceLow,
            4 => Self::Window1,
            5 => Self::Window2,
            6 => Self::DistCounter,
            7 => Self::TempCounter,
            _ => return None,
        })
    }
}

/// What a receiver is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Command,
    Tick,
    Field(Field),
    Ack,
    Repeat,
    Resync,
}

/// One protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Operator key, sent once at session entry.
    Command(u8),
    /// Session tick from the console.
    Tick(u8),
    /// One telemetry or fault-counter byte.
    Field(Field, u8),
    Ack,
    /// Repeat flag after a Monitor or RetrieveFaults pass.
    Repeat(bool),
    /// Return both nodes to idle. Framed format only.
    Resync,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Command(_) => MessageKind::Command,
            Self::Tick(_) => MessageKind::Tick,
            Self::Field(f, _) => MessageKind::Field(*f),
            Self::Ack => MessageKind::Ack,
            Self::Repeat(_) => MessageKind::Repeat,
            Self::Resync => MessageKind::Resync,
        }
    }

    /// Single-byte encoding, `None` for messages the raw wire cannot carry.
    pub fn raw_byte(&self) -> Option<u8> {
        match *self {
            Self::Command(b) | Self::Tick(b) | Self::Field(_, b) => Some(b),
            Self::Ack => Some(ACK),
            Self::Repeat(again) => Some(u8::from(again)),
            Self::Resync => None,
        }
    }

    /// Interpret a raw byte as the message the receiver expects.
    pub fn from_raw(expected: MessageKind, byte: u8) -> Option<Self> {
        match expected {
            MessageKind::Command => Some(Self::Command(byte)),
            MessageKind::Tick => Some(Self::Tick(byte)),
            MessageKind::Field(f) => Some(Self::Field(f, byte)),
            MessageKind::Ack => (byte == ACK).then_some(Self::Ack),
            MessageKind::Repeat => Some(Self::Repeat(byte != 0)),
            MessageKind::Resync => None,
        }
    }

    pub fn to_frame(&self) -> Option<Frame> {
        let (tag, buf, len): (u8, [u8; 2], usize) = match *self {
            Self::Command(c) => (TAG_COMMAND, [c, 0], 1),
            Self::Tick(t) => (TAG_TICK, [t, 0], 1),
            Self::Field(f, v) => (TAG_FIELD, [f.id(), v], 2),
            Self::Ack => (TAG_ACK, [0, 0], 0),
            Self::Repeat(again) => (TAG_REPEAT, [u8::from(again), 0], 1),
            Self::Resync => (TAG_RESYNC, [0, 0], 0),
        };
        Frame::new(tag, &buf[..len])
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let malformed = FrameError::Malformed { tag: frame.tag };
        match (frame.tag, frame.payload()) {
            (TAG_COMMAND, &[c]) => Ok(Self::Command(c)),
            (TAG_TICK, &[t]) => Ok(Self::Tick(t)),
            (TAG_FIELD, &[id, v]) => Field::from_id(id)
                .map(|f| Self::Field(f, v))
                .ok_or(malformed),
            (TAG_ACK, &[]) => Ok(Self::Ack),
            (TAG_REPEAT, &[flag]) if flag <= 1 => Ok(Self::Repeat(flag == 1)),
            (TAG_RESYNC, &[]) => Ok(Self::Resync),
            (TAG_COMMAND..=TAG_RESYNC, _) => Err(malformed),
            (tag, _) => Err(FrameError::UnknownTag(tag)),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and statistics
// ---------------------------------------------------------------------------

/// Link-level failures. Every one of them aborts the session in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The underlying transport reported an error.
    Transport,
    /// The transport accepted no bytes for a whole poll budget.
    SendStalled,
    /// No acknowledgment within the poll cap.
    AckTimeout { polls: u32 },
    /// No message within the poll cap.
    ReceiveTimeout { polls: u32 },
    /// A frame failed its checksum or could not be decoded.
    Corrupt(FrameError),
    /// A well-formed message of the wrong kind arrived.
    Unexpected { expected: MessageKind, got: MessageKind },
    /// A raw byte that cannot be the expected message.
    UnexpectedByte { expected: MessageKind, byte: u8 },
    /// The peer asked both nodes to return to idle.
    ResyncRequested,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport error"),
            Self::SendStalled => write!(f, "transmit stalled"),
            Self::AckTimeout { polls } => write!(f, "no ack after {polls} polls"),
            Self::ReceiveTimeout { polls } => write!(f, "nothing received after {polls} polls"),
            Self::Corrupt(e) => write!(f, "corrupt frame: {e}"),
            Self::Unexpected { expected, got } => {
                write!(f, "expected {expected:?}, got {got:?}")
            }
            Self::UnexpectedByte { expected, byte } => {
                write!(f, "expected {expected:?}, got byte 0x{byte:02X}")
            }
            Self::ResyncRequested => write!(f, "peer requested resync"),
        }
    }
}

impl From<FrameError> for LinkError {
    fn from(e: FrameError) -> Self {
        Self::Corrupt(e)
    }
}

/// Running link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub bytes_sent: u32,
    pub bytes_received: u32,
    pub acks_sent: u32,
    pub acks_received: u32,
    pub ack_timeouts: u32,
    pub corrupt_frames: u32,
    pub resyncs: u32,
}

/// How long a receive may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Block until something arrives (operator-paced waits).
    Forever,
    /// Give up after the configured receive poll cap.
    Bounded,
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

pub struct Link<T: Transport> {
    transport: T,
    format: WireFormat,
    ack_poll_cap: u32,
    receive_poll_cap: u32,
    decoder: FrameDecoder,
    stats: LinkStats,
}

impl<T: Transport> Link<T> {
    pub fn new(transport: T, config: &LinkConfig) -> Self {
        Self {
            transport,
            format: config.wire_format,
            ack_poll_cap: config.ack_poll_cap,
            receive_poll_cap: config.receive_poll_cap,
            decoder: FrameDecoder::new(),
            stats: LinkStats::default(),
        }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Byte level ─────────────────────────────────────────────

    pub fn send_byte(&mut self, byte: u8) -> Result<(), LinkError> {
        debug!("LINK | tx 0x{byte:02X}");
        self.write_all(&[byte])
    }

    /// One poll. `None` when nothing arrived within the poll interval.
    pub fn try_receive_byte(&mut self) -> Result<Option<u8>, LinkError> {
        let mut buf = [0u8; 1];
        let n = self.transport.read(&mut buf).map_err(|e| {
            warn!("LINK | transport read failed: {e:?}");
            LinkError::Transport
        })?;
        if n == 0 {
            return Ok(None);
        }
        self.stats.bytes_received = self.stats.bytes_received.wrapping_add(1);
        debug!("LINK | rx 0x{:02X}", buf[0]);
        Ok(Some(buf[0]))
    }

    pub fn receive_byte(&mut self, wait: Wait) -> Result<u8, LinkError> {
        let budget = self.budget(wait);
        self.poll_until(budget, |_, byte| Some(Ok(byte)))?
            .ok_or(LinkError::ReceiveTimeout {
                polls: self.receive_poll_cap,
            })
    }

    // ── Acknowledgment ─────────────────────────────────────────

    pub fn send_ack(&mut self) -> Result<(), LinkError> {
        self.send(Message::Ack)
    }

    /// Poll until an acknowledgment arrives, at most `ack_poll_cap` polls.
    ///
    /// On the raw wire any other byte is discarded. On the framed wire any
    /// other message is a desynchronization.
    pub fn wait_for_ack(&mut self) -> Result<(), LinkError> {
        let cap = Some(self.ack_poll_cap);
        let outcome = match self.format {
            WireFormat::Raw => self.poll_until(cap, |_, byte| {
                if byte == ACK {
                    Some(Ok(()))
                } else {
                    debug!("LINK | discarding 0x{byte:02X} while waiting for ack");
                    None
                }
            }),
            WireFormat::Framed => self.poll_until(cap, |link, byte| {
                link.feed(byte).map(|r| {
                    r.and_then(|msg| match msg {
                        Message::Ack => Ok(()),
                        Message::Resync => Err(LinkError::ResyncRequested),
                        other => Err(LinkError::Unexpected {
                            expected: MessageKind::Ack,
                            got: other.kind(),
                        }),
                    })
                })
            }),
        }?;

        if outcome.is_some() {
            self.stats.acks_received = self.stats.acks_received.wrapping_add(1);
            Ok(())
        } else {
            self.stats.ack_timeouts = self.stats.ack_timeouts.wrapping_add(1);
            warn!("LINK | ack timeout after {} polls", self.ack_poll_cap);
            Err(LinkError::AckTimeout {
                polls: self.ack_poll_cap,
            })
        }
    }

    // ── Message level ──────────────────────────────────────────

    pub fn send(&mut self, msg: Message) -> Result<(), LinkError> {
        match self.format {
            WireFormat::Raw => match msg.raw_byte() {
                Some(byte) => self.send_byte(byte)?,
                None => {
                    debug!("LINK | {msg:?} has no raw encoding, not sent");
                    return Ok(());
                }
            },
            WireFormat::Framed => {
                let mut buf = [0u8; MAX_FRAME_LEN];
                let n = msg
                    .to_frame()
                    .and_then(|frame| frame.encode(&mut buf))
                    .ok_or(LinkError::Corrupt(FrameError::Malformed { tag: 0 }))?;
                debug!("LINK | tx {msg:?}");
                self.write_all(&buf[..n])?;
            }
        }
        if msg == Message::Ack {
            self.stats.acks_sent = self.stats.acks_sent.wrapping_add(1);
        }
        Ok(())
    }

    /// Receive the next message, which must be of kind `expected`.
    pub fn receive(&mut self, expected: MessageKind, wait: Wait) -> Result<Message, LinkError> {
        let budget = self.budget(wait);
        let received = match self.format {
            WireFormat::Raw => self.poll_until(budget, |_, byte| {
                Some(
                    Message::from_raw(expected, byte)
                        .ok_or(LinkError::UnexpectedByte { expected, byte }),
                )
            }),
            WireFormat::Framed => self.poll_until(budget, |link, byte| {
                link.feed(byte).map(|r| {
                    r.and_then(|msg| match msg {
                        m if m.kind() == expected => Ok(m),
                        Message::Resync => Err(LinkError::ResyncRequested),
                        other => Err(LinkError::Unexpected {
                            expected,
                            got: other.kind(),
                        }),
                    })
                })
            }),
        }?;
        received.ok_or(LinkError::ReceiveTimeout {
            polls: self.receive_poll_cap,
        })
    }

    /// Idle wait for a command. Blocks until one arrives.
    ///
    /// On the framed wire, stray non-command frames and corrupt frames are
    /// dropped; an idle node has nothing to resynchronize.
    pub fn receive_command(&mut self) -> Result<u8, LinkError> {
        let received = match self.format {
            WireFormat::Raw => self.poll_until(None, |_, byte| Some(Ok(byte))),
            WireFormat::Framed => self.poll_until(None, |link, byte| match link.feed(byte)? {
                Ok(Message::Command(code)) => Some(Ok(code)),
                Ok(other) => {
                    debug!("LINK | idle, ignoring {other:?}");
                    None
                }
                Err(e) => {
                    debug!("LINK | idle, dropping {e}");
                    None
                }
            }),
        }?;
        // An unbounded poll only returns with a value.
        received.ok_or(LinkError::ReceiveTimeout { polls: u32::MAX })
    }

    /// Drain pending input, reset the decoder and, on the framed wire, tell
    /// the peer to return to idle.
    pub fn resync(&mut self) -> Result<(), LinkError> {
        self.stats.resyncs = self.stats.resyncs.wrapping_add(1);
        let dropped = self.discard_input()?;
        warn!("LINK | resync, {dropped} pending bytes dropped");
        self.send(Message::Resync)
    }

    /// Drain pending input and reset the decoder without notifying the peer.
    /// Returns the number of bytes dropped.
    pub fn discard_input(&mut self) -> Result<u32, LinkError> {
        let mut dropped = 0u32;
        for _ in 0..self.receive_poll_cap {
            match self.try_receive_byte()? {
                Some(_) => dropped += 1,
                None => break,
            }
        }
        self.decoder.reset();
        Ok(dropped)
    }

    // ── Internals ──────────────────────────────────────────────

    fn budget(&self, wait: Wait) -> Option<u32> {
        match wait {
            Wait::Forever => None,
            Wait::Bounded => Some(self.receive_poll_cap),
        }
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<(), LinkError> {
        let mut stalls = 0u32;
        while !data.is_empty() {
            let n = self.transport.write(data).map_err(|e| {
                warn!("LINK | transport write failed: {e:?}");
                LinkError::Transport
            })?;
            if n == 0 {
                stalls += 1;
                if stalls >= self.receive_poll_cap {
                    return Err(LinkError::SendStalled);
                }
                continue;
            }
            stalls = 0;
            self.stats.bytes_sent = self.stats.bytes_sent.wrapping_add(n as u32);
            data = &data[n..];
        }
        self.transport.flush().map_err(|_| LinkError::Transport)
    }

    /// Feed one byte to the frame decoder.
    fn feed(&mut self, byte: u8) -> Option<Result<Message, LinkError>> {
        let decoded = self
            .decoder
            .feed(byte)?
            .and_then(|frame| Message::from_frame(&frame));
        match decoded {
            Ok(msg) => {
                debug!("LINK | rx {msg:?}");
                Some(Ok(msg))
            }
            Err(e) => {
                self.stats.corrupt_frames = self.stats.corrupt_frames.wrapping_add(1);
                warn!("LINK | {e}");
                Some(Err(LinkError::Corrupt(e)))
            }
        }
    }

    /// Poll the transport one byte at a time until `step` yields a result or
    /// `budget` polls have been made. `Ok(None)` means the budget ran out.
    fn poll_until<R>(
        &mut self,
        budget: Option<u32>,
        mut step: impl FnMut(&mut Self, u8) -> Option<Result<R, LinkError>>,
    ) -> Result<Option<R>, LinkError> {
        let mut polls: u32 = 0;
        loop {
            if budget.is_some_and(|cap| polls >= cap) {
                return Ok(None);
            }
            polls = polls.saturating_add(1);
            if let Some(byte) = self.try_receive_byte()? {
                if let Some(done) = step(self, byte) {
                    return done.map(Some);
                }
            }
        }
    }
}
