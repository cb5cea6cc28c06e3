//! Mock adapters for integration tests.
//!
//! Every mock records what the node runner did to it so tests can assert on
//! the full history without touching real GPIO, ADC or UART registers.

#![allow(dead_code)]

use std::collections::VecDeque;

use winlink::actuator::{ActuatorState, WindowId};
use winlink::app::events::NodeEvent;
use winlink::app::ports::{
    ButtonPort, DisplayPort, EventSink, KeypadPort, MotorPort, SensorPort, TickError, TickSource,
    WindowButton,
};
use winlink::config::{LinkConfig, WireFormat};
use winlink::display::Screen;
use winlink::error::ActuatorError;
use winlink::link::{FrameDecoder, Link, MAX_FRAME_LEN, Message, MessageKind, Transport};
use winlink::sensors::SensorSnapshot;

// ── Wire helpers ──────────────────────────────────────────────

pub fn link_config(format: WireFormat) -> LinkConfig {
    LinkConfig {
        wire_format: format,
        ack_poll_cap: 40,
        receive_poll_cap: 40,
        ..LinkConfig::default()
    }
}

/// Bytes a peer would put on the wire for `msgs`.
pub fn encode(format: WireFormat, msgs: &[Message]) -> Vec<u8> {
    let mut out = Vec::new();
    for msg in msgs {
        match format {
            WireFormat::Raw => out.extend(msg.raw_byte()),
            WireFormat::Framed => {
                let mut buf = [0u8; MAX_FRAME_LEN];
                let n = msg.to_frame().unwrap().encode(&mut buf).unwrap();
                out.extend_from_slice(&buf[..n]);
            }
        }
    }
    out
}

/// Decode framed wire bytes back into messages.
pub fn decode_framed(bytes: &[u8]) -> Vec<Message> {
    let mut decoder = FrameDecoder::new();
    bytes
        .iter()
        .filter_map(|&b| decoder.feed(b))
        .map(|r| Message::from_frame(&r.unwrap()).unwrap())
        .collect()
}

// ── ScriptedTransport ─────────────────────────────────────────

/// Serves a fixed byte script and records everything written.
///
/// With [`ScriptedTransport::armed`] the script only becomes readable after
/// the first write, so a node that drains its input before sending does
/// not swallow the peer's replies.
#[derive(Default)]
pub struct ScriptedTransport {
    rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pub reads: u32,
    /// Every write fails while set.
    pub fail_writes: bool,
    armed: bool,
}

impl ScriptedTransport {
    pub fn new(script: Vec<u8>) -> Self {
        Self {
            rx: script.into(),
            armed: true,
            ..Self::default()
        }
    }

    pub fn armed(script: Vec<u8>) -> Self {
        Self {
            rx: script.into(),
            armed: false,
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for ScriptedTransport {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        self.reads += 1;
        if !self.armed || buf.is_empty() {
            return Ok(0);
        }
        match self.rx.pop_front() {
            Some(b) => {
                buf[0] = b;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        if self.fail_writes {
            return Err(());
        }
        self.armed = true;
        self.tx.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

pub fn scripted_link(format: WireFormat, script: &[Message]) -> Link<ScriptedTransport> {
    Link::new(
        ScriptedTransport::new(encode(format, script)),
        &link_config(format),
    )
}

// ── MockBoard (sensor node hardware) ──────────────────────────

/// Sensors, buttons and motors of the sensor node.
pub struct MockBoard {
    /// Returned in order; the last one repeats once the queue is empty.
    pub snapshots: VecDeque<SensorSnapshot>,
    last: SensorSnapshot,
    pub pressed: Vec<(WindowId, WindowButton)>,
    pub drives: Vec<(WindowId, ActuatorState)>,
    pub reads: u32,
    pub fail_drives: bool,
}

impl MockBoard {
    pub fn new(temperature_c: u8, distance_cm: u16) -> Self {
        Self::with_readings(&[(temperature_c, distance_cm)])
    }

    pub fn with_readings(readings: &[(u8, u16)]) -> Self {
        let snapshots: VecDeque<_> = readings
            .iter()
            .map(|&(t, d)| SensorSnapshot {
                temperature_c: t,
                distance_cm: d,
                temperature_fresh: true,
                distance_fresh: true,
            })
            .collect();
        Self {
            last: snapshots.front().copied().unwrap_or_default(),
            snapshots,
            pressed: Vec::new(),
            drives: Vec::new(),
            reads: 0,
            fail_drives: false,
        }
    }

    pub fn press(mut self, window: WindowId, button: WindowButton) -> Self {
        self.pressed.push((window, button));
        self
    }

    pub fn last_drive(&self, window: WindowId) -> Option<ActuatorState> {
        self.drives
            .iter()
            .rev()
            .find(|(w, _)| *w == window)
            .map(|(_, s)| *s)
    }
}

impl SensorPort for MockBoard {
    fn read_all(&mut self) -> SensorSnapshot {
        self.reads += 1;
        if let Some(s) = self.snapshots.pop_front() {
            self.last = s;
        }
        self.last
    }
}

impl ButtonPort for MockBoard {
    fn is_pressed(&mut self, window: WindowId, button: WindowButton) -> bool {
        self.pressed.contains(&(window, button))
    }
}

impl MotorPort for MockBoard {
    fn drive(&mut self, window: WindowId, state: ActuatorState) -> Result<(), ActuatorError> {
        if self.fail_drives {
            return Err(ActuatorError::PinWriteFailed);
        }
        self.drives.push((window, state));
        Ok(())
    }
}

// ── Console surfaces ──────────────────────────────────────────

/// Keypad fed from a key script plus a display that keeps every screen.
pub struct MockPanel {
    pub keys: VecDeque<u8>,
    pub screens: Vec<Screen>,
}

impl MockPanel {
    pub fn new(keys: &[u8]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            screens: Vec::new(),
        }
    }

    pub fn rows(&self) -> Vec<String> {
        self.screens
            .iter()
            .flat_map(|s| s.lines().into_iter().map(|r| r.as_str().to_owned()))
            .collect()
    }
}

impl KeypadPort for MockPanel {
    fn read_key(&mut self) -> u8 {
        // An exhausted script answers "no" to every prompt.
        self.keys.pop_front().unwrap_or(0)
    }
}

impl DisplayPort for MockPanel {
    fn show(&mut self, screen: &Screen) {
        self.screens.push(*screen);
    }
}

/// Tick source that advances by one on every wait.
#[derive(Default)]
pub struct StepTicks {
    now: u8,
    pub restarts: u32,
    pub stops: u32,
    /// Answered by every restart while set.
    pub fail_restart: Option<TickError>,
}

impl StepTicks {
    pub fn failing(error: TickError) -> Self {
        Self {
            fail_restart: Some(error),
            ..Self::default()
        }
    }
}

impl TickSource for StepTicks {
    fn restart(&mut self) -> Result<(), TickError> {
        self.restarts += 1;
        if let Some(e) = self.fail_restart {
            return Err(e);
        }
        self.now = 0;
        Ok(())
    }

    fn now(&self) -> u8 {
        self.now
    }

    fn wait_advance(&mut self, last: u8) -> u8 {
        self.now = last.wrapping_add(1);
        self.now
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

// ── Event recording ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<NodeEvent>,
}

impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&NodeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.events.push(event.clone());
    }
}

/// Ticks a console sends for one pass: the opening 0, then 1..=5.
pub fn pass_ticks() -> Vec<Message> {
    (0..=5).map(Message::Tick).collect()
}

pub fn kind_of(msgs: &[Message]) -> Vec<MessageKind> {
    msgs.iter().map(Message::kind).collect()
}
