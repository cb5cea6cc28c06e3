//! Sensor node sessions driven by a scripted console.
//!
//! The script is the exact message sequence a console would put on the
//! wire; the assertions look at what the sensor node sent back, what it
//! did to the hardware and what it persisted.

use winlink::actuator::{ActuatorState, WindowId};
use winlink::adapters::eeprom::EepromAdapter;
use winlink::app::commands::Command;
use winlink::app::events::NodeEvent;
use winlink::app::ports::{StoragePort, WindowButton};
use winlink::config::WireFormat;
use winlink::faults::{FaultCounterStore, FaultKind, Thresholds};
use winlink::link::{Field, FrameError, LinkError, Message};
use winlink::session::{Dispatch, DispatcherState, SensorNode, SessionOutcome};

use crate::mock_hw::{
    MockBoard, RecordingSink, ScriptedTransport, decode_framed, encode, link_config, pass_ticks,
    scripted_link,
};

type Node = SensorNode<ScriptedTransport, EepromAdapter>;

fn node(format: WireFormat, script: &[Message]) -> Node {
    node_with_store(format, script, EepromAdapter::new().unwrap())
}

fn node_with_store(format: WireFormat, script: &[Message], eeprom: EepromAdapter) -> Node {
    SensorNode::new(
        scripted_link(format, script),
        FaultCounterStore::new(eeprom, 3),
        Thresholds::default(),
    )
}

/// Console side of one Monitor pass: every tick after the opening one is
/// followed by four acks.
fn monitor_pass() -> Vec<Message> {
    let mut script = vec![Message::Tick(0)];
    for t in 1..=4 {
        script.push(Message::Tick(t));
        script.extend([Message::Ack; 4]);
    }
    script.push(Message::Tick(5));
    script
}

fn faults_pass() -> Vec<Message> {
    let mut script = vec![Message::Tick(0)];
    for t in 1..=4 {
        script.push(Message::Tick(t));
        script.push(Message::Ack);
    }
    script.push(Message::Tick(5));
    script
}

fn fields(node: &Node) -> Vec<(Field, u8)> {
    decode_framed(&node.link().transport().tx)
        .into_iter()
        .filter_map(|m| match m {
            Message::Field(f, v) => Some((f, v)),
            _ => None,
        })
        .collect()
}

fn outcome(d: Dispatch) -> SessionOutcome {
    d.report().expect("a session should have run").outcome
}

// ── Monitor ───────────────────────────────────────────────────

#[test]
fn monitor_streams_five_fields_per_tick() {
    let mut script = vec![Message::Command(2)];
    script.extend(monitor_pass());
    script.push(Message::Repeat(false));

    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::new(72, 45).press(WindowId::Two, WindowButton::Open);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });
    assert_eq!(n.state(), DispatcherState::MainMenu);

    let sent = fields(&n);
    assert_eq!(sent.len(), 20, "five fields on each of ticks 1..=4");
    assert_eq!(
        &sent[..5],
        &[
            (Field::Temperature, 72),
            (Field::DistanceHigh, 0),
            (Field::DistanceLow, 45),
            (Field::Window1, ActuatorState::Stop.code()),
            (Field::Window2, ActuatorState::Open.code()),
        ]
    );
    assert_eq!(n.link().stats().acks_received, 16);
    assert_eq!(hw.reads, 4);
    assert_eq!(hw.last_drive(WindowId::One), Some(ActuatorState::Stop));
    assert_eq!(hw.last_drive(WindowId::Two), Some(ActuatorState::Open));
    assert_eq!(sink.count(|e| matches!(e, NodeEvent::Telemetry(_))), 4);
}

#[test]
fn monitor_on_the_raw_wire_sends_plain_bytes() {
    let mut script = vec![Message::Command(2)];
    script.extend(monitor_pass());
    script.push(Message::Repeat(false));

    let mut n = node(WireFormat::Raw, &script);
    let mut hw = MockBoard::new(72, 300).press(WindowId::Two, WindowButton::Open);
    let mut sink = RecordingSink::default();

    n.serve_once(&mut hw, &mut sink).unwrap();

    // 300 cm = 0x012C: high byte 1, low byte 44.
    let one_tick = [72u8, 1, 44, 2, 0];
    let expected: Vec<u8> = one_tick.iter().copied().cycle().take(20).collect();
    assert_eq!(n.link().transport().tx, expected);
}

#[test]
fn monitor_repeat_flag_reenters_the_pass() {
    let mut script = vec![Message::Command(2)];
    script.extend(monitor_pass());
    script.push(Message::Repeat(true));
    script.extend(monitor_pass());
    script.push(Message::Repeat(false));

    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 2 });
    assert_eq!(fields(&n).len(), 40);
    assert_eq!(n.link().transport().remaining(), 0);
}

#[test]
fn both_buttons_held_closes_the_window() {
    let mut script = vec![Message::Command(2)];
    script.extend(monitor_pass());
    script.push(Message::Repeat(false));

    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::new(20, 100)
        .press(WindowId::One, WindowButton::Open)
        .press(WindowId::One, WindowButton::Close);
    let mut sink = RecordingSink::default();

    n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(hw.last_drive(WindowId::One), Some(ActuatorState::Close));
    assert!(fields(&n).contains(&(Field::Window1, ActuatorState::Close.code())));
}

#[test]
fn motor_failure_does_not_stop_the_stream() {
    let mut script = vec![Message::Command(2)];
    script.extend(monitor_pass());
    script.push(Message::Repeat(false));

    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::new(20, 100);
    hw.fail_drives = true;
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });
    assert_eq!(fields(&n).len(), 20);
}

// ── Start ─────────────────────────────────────────────────────

#[test]
fn start_heartbeats_without_payload() {
    let mut script = vec![Message::Command(1)];
    script.extend(pass_ticks());

    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::new(25, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });
    assert_eq!(hw.reads, 5, "one heartbeat per tick below the limit");
    assert!(n.link().transport().tx.is_empty());
}

#[test]
fn start_counts_each_distinct_breach_once() {
    let mut script = vec![Message::Command(1)];
    script.extend(pass_ticks());

    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::with_readings(&[(91, 50), (91, 50), (95, 50), (80, 50), (92, 50)]);
    let mut sink = RecordingSink::default();

    n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(n.store_mut().read(FaultKind::Temperature), Ok(3));
    assert_eq!(n.store_mut().read(FaultKind::Distance), Ok(0));
    assert_eq!(
        sink.count(|e| matches!(e, NodeEvent::FaultCounted { kind: FaultKind::Temperature, .. })),
        3
    );
}

#[test]
fn storage_fault_is_reported_and_the_session_continues() {
    let mut script = vec![Message::Command(1)];
    script.extend(pass_ticks());

    let mut eeprom = EepromAdapter::new().unwrap();
    eeprom.fail_next_reads(3);
    let mut n = node_with_store(WireFormat::Framed, &script, eeprom);
    let mut hw = MockBoard::with_readings(&[(95, 50), (96, 50)]);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });
    assert_eq!(sink.count(|e| matches!(e, NodeEvent::StorageFault(_))), 1);
    assert!(sink.events.contains(&NodeEvent::FaultCounted {
        kind: FaultKind::Temperature,
        value: 1
    }));
}

// ── RetrieveFaults ────────────────────────────────────────────

#[test]
fn retrieve_faults_sends_counters_read_before_the_update() {
    let mut eeprom = EepromAdapter::new().unwrap();
    eeprom.write(FaultKind::Distance.addr(), 2).unwrap();
    eeprom.write(FaultKind::Temperature.addr(), 5).unwrap();

    let mut script = vec![Message::Command(3)];
    script.extend(faults_pass());
    script.push(Message::Repeat(false));

    let mut n = node_with_store(WireFormat::Framed, &script, eeprom);
    let mut hw = MockBoard::new(95, 50);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });

    let sent = fields(&n);
    let pairs: Vec<(u8, u8)> = sent.chunks(2).map(|c| (c[0].1, c[1].1)).collect();
    assert!(sent.chunks(2).all(|c| c[0].0 == Field::DistCounter && c[1].0 == Field::TempCounter));
    assert_eq!(pairs, [(2, 5), (2, 6), (2, 6), (2, 6)]);
    assert_eq!(hw.reads, 4);
}

#[test]
fn safe_readings_leave_seeded_counters_alone() {
    let mut eeprom = EepromAdapter::new().unwrap();
    eeprom.write(FaultKind::Distance.addr(), 2).unwrap();
    eeprom.write(FaultKind::Temperature.addr(), 5).unwrap();

    let mut script = vec![Message::Command(2)];
    script.extend(monitor_pass());
    script.extend([Message::Repeat(false), Message::Command(3)]);
    script.extend(faults_pass());
    script.push(Message::Repeat(false));

    let mut n = node_with_store(WireFormat::Framed, &script, eeprom);
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    for _ in 0..2 {
        let d = n.serve_once(&mut hw, &mut sink).unwrap();
        assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });
    }
    assert_eq!(hw.reads, 8);
    assert_eq!(n.store_mut().read(FaultKind::Distance), Ok(2));
    assert_eq!(n.store_mut().read(FaultKind::Temperature), Ok(5));
    assert_eq!(sink.count(|e| matches!(e, NodeEvent::FaultCounted { .. })), 0);
    assert_eq!(n.link().transport().remaining(), 0);
}

// ── Stop ──────────────────────────────────────────────────────

#[test]
fn stop_resets_counters_and_shadow_without_link_traffic() {
    let mut eeprom = EepromAdapter::new().unwrap();
    eeprom.write(FaultKind::Temperature.addr(), 7).unwrap();
    eeprom.write(FaultKind::Distance.addr(), 9).unwrap();

    // A Start pass first so the shadow holds a reading.
    let mut script = vec![Message::Command(1)];
    script.extend(pass_ticks());
    script.push(Message::Command(4));

    let mut n = node_with_store(WireFormat::Framed, &script, eeprom);
    let mut hw = MockBoard::new(40, 60);
    let mut sink = RecordingSink::default();

    n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(n.detector().previous(), (40, 60));

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });
    assert_eq!(n.detector().previous(), (0, 0));
    assert_eq!(n.store_mut().read(FaultKind::Temperature), Ok(0));
    assert_eq!(n.store_mut().read(FaultKind::Distance), Ok(0));
    assert!(n.link().transport().tx.is_empty());
    assert!(sink.events.contains(&NodeEvent::CountersReset));
}

#[test]
fn failed_reset_is_not_reported_as_done() {
    let mut eeprom = EepromAdapter::new().unwrap();
    eeprom.write(FaultKind::Temperature.addr(), 7).unwrap();
    eeprom.fail_next_writes(3);

    let mut n = node_with_store(WireFormat::Framed, &[Message::Command(4)], eeprom);
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });
    assert!(!sink.events.contains(&NodeEvent::CountersReset));
    assert_eq!(sink.count(|e| matches!(e, NodeEvent::StorageFault(_))), 1);
    assert_eq!(n.store_mut().read(FaultKind::Temperature), Ok(7));
}

// ── Dispatcher ────────────────────────────────────────────────

#[test]
fn unknown_command_is_ignored() {
    let mut n = node(WireFormat::Raw, &[Message::Command(9)]);
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(d, Dispatch::Ignored(9));
    assert_eq!(n.state(), DispatcherState::MainMenu);
    assert_eq!(sink.events, [NodeEvent::CommandIgnored(9)]);
    assert_eq!(hw.reads, 0);
}

#[test]
fn idle_node_skips_stray_frames_before_a_command() {
    let script = [Message::Ack, Message::Tick(3), Message::Command(4)];
    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(d.report().map(|r| r.command), Some(Command::Stop));
}

// ── Link failures ─────────────────────────────────────────────

#[test]
fn missing_ack_aborts_and_resyncs() {
    let script = [Message::Command(2), Message::Tick(0), Message::Tick(1)];
    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    let reason = LinkError::AckTimeout { polls: 40 };
    assert_eq!(outcome(d), SessionOutcome::Aborted(reason));
    assert_eq!(n.state(), DispatcherState::MainMenu);
    assert_eq!(n.link().stats().resyncs, 1);

    let sent = decode_framed(&n.link().transport().tx);
    assert_eq!(sent.last(), Some(&Message::Resync));
    assert!(sink.events.contains(&NodeEvent::SessionAborted {
        command: Command::Monitor,
        reason
    }));
}

#[test]
fn silent_console_times_out_the_tick_wait() {
    let script = [Message::Command(1), Message::Tick(0)];
    let mut n = node(WireFormat::Raw, &script);
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(
        outcome(d),
        SessionOutcome::Aborted(LinkError::ReceiveTimeout { polls: 40 })
    );
    // Resync cannot be expressed on the raw wire.
    assert!(n.link().transport().tx.is_empty());
}

#[test]
fn corrupt_tick_frame_aborts_the_session() {
    let mut bytes = encode(WireFormat::Framed, &[Message::Command(1), Message::Tick(0)]);
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    let transport = ScriptedTransport::new(bytes);
    let mut n: Node = SensorNode::new(
        winlink::link::Link::new(transport, &link_config(WireFormat::Framed)),
        FaultCounterStore::new(EepromAdapter::new().unwrap(), 3),
        Thresholds::default(),
    );
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert!(matches!(
        outcome(d),
        SessionOutcome::Aborted(LinkError::Corrupt(FrameError::BadCrc { .. }))
    ));
    assert_eq!(n.link().stats().corrupt_frames, 1);
}

#[test]
fn peer_resync_returns_to_idle_without_echo() {
    let script = [
        Message::Command(2),
        Message::Tick(0),
        Message::Tick(1),
        Message::Resync,
    ];
    let mut n = node(WireFormat::Framed, &script);
    let mut hw = MockBoard::new(20, 100);
    let mut sink = RecordingSink::default();

    let d = n.serve_once(&mut hw, &mut sink).unwrap();
    assert_eq!(outcome(d), SessionOutcome::Aborted(LinkError::ResyncRequested));
    assert_eq!(n.link().stats().resyncs, 0);
    let sent = decode_framed(&n.link().transport().tx);
    assert!(!sent.contains(&Message::Resync));
}
