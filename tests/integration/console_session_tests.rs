//! Operator console sessions against a scripted sensor node.

use winlink::actuator::ActuatorState;
use winlink::app::commands::Command;
use winlink::app::events::NodeEvent;
use winlink::app::ports::TickError;
use winlink::config::WireFormat;
use winlink::display::Screen;
use winlink::faults::FaultCounters;
use winlink::link::{ACK, Field, Link, LinkError, Message};
use winlink::session::{ConsoleNode, Dispatch, DispatcherState, SessionOutcome};
use winlink::telemetry::TelemetrySample;

use crate::mock_hw::{
    MockPanel, RecordingSink, ScriptedTransport, StepTicks, decode_framed, encode, link_config,
};

/// Console whose peer replies with `replies` once the command is out.
fn console(format: WireFormat, replies: &[Message]) -> ConsoleNode<ScriptedTransport> {
    ConsoleNode::new(Link::new(
        ScriptedTransport::armed(encode(format, replies)),
        &link_config(format),
    ))
}

fn sample(temperature: u8) -> TelemetrySample {
    TelemetrySample {
        temperature,
        distance: 45,
        window1: ActuatorState::Stop,
        window2: ActuatorState::Open,
    }
}

fn sample_fields(s: &TelemetrySample) -> Vec<Message> {
    s.fields()
        .into_iter()
        .map(|(f, v)| Message::Field(f, v))
        .collect()
}

/// What a console sends over one Monitor pass after the command.
fn monitor_traffic() -> Vec<Message> {
    let mut out = vec![Message::Tick(0)];
    for t in 1..=4 {
        out.push(Message::Tick(t));
        out.extend([Message::Ack; 4]);
    }
    out.push(Message::Tick(5));
    out
}

fn sent(node: &ConsoleNode<ScriptedTransport>) -> Vec<Message> {
    decode_framed(&node.link().transport().tx)
}

fn outcome(d: Dispatch) -> SessionOutcome {
    d.report().expect("a session should have run").outcome
}

#[test]
fn start_sends_the_key_then_ticks() {
    let mut node = console(WireFormat::Framed, &[]);
    let mut ui = MockPanel::new(&[1]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });

    let mut expected = vec![Message::Command(1)];
    expected.extend((0..=5).map(Message::Tick));
    assert_eq!(sent(&node), expected);
    assert_eq!(ui.screens, [Screen::Menu, Screen::OperationStarted]);
    assert_eq!((ticks.restarts, ticks.stops), (1, 1));
    assert_eq!(node.state(), DispatcherState::MainMenu);
}

#[test]
fn monitor_shows_each_sample_one_tick_late() {
    let replies: Vec<Message> = [70, 71, 72, 73]
        .iter()
        .flat_map(|&t| sample_fields(&sample(t)))
        .collect();
    let mut node = console(WireFormat::Framed, &replies);
    let mut ui = MockPanel::new(&[2, 0]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });

    let mut expected = vec![Message::Command(2)];
    expected.extend(monitor_traffic());
    expected.push(Message::Repeat(false));
    assert_eq!(sent(&node), expected);

    assert_eq!(
        ui.screens,
        [
            Screen::Menu,
            Screen::Telemetry(None),
            Screen::Telemetry(Some(sample(70))),
            Screen::Telemetry(Some(sample(71))),
            Screen::Telemetry(Some(sample(72))),
            Screen::RepeatPrompt(Command::Monitor),
        ]
    );
    // Every sample was received even though the last one is never shown.
    assert_eq!(sink.count(|e| matches!(e, NodeEvent::Telemetry(_))), 4);
    assert!(sink.events.contains(&NodeEvent::Telemetry(sample(73))));
    assert_eq!(node.link().stats().acks_sent, 16);
}

#[test]
fn monitor_on_the_raw_wire() {
    let replies: Vec<Message> = (0..4).flat_map(|_| sample_fields(&sample(72))).collect();
    let mut node = console(WireFormat::Raw, &replies);
    let mut ui = MockPanel::new(&[2, 9]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    node.run_once(&mut ui, &mut ticks, &mut sink);

    let mut expected = vec![2u8, 0];
    for t in 1..=4u8 {
        expected.push(t);
        expected.extend([ACK; 4]);
    }
    expected.extend([5, 0]);
    assert_eq!(node.link().transport().tx, expected);
    assert!(ui.rows().iter().any(|r| r == "Temp = 72 C"));
    assert!(ui.rows().iter().any(|r| r == "Window2:Open"));
}

#[test]
fn retrieve_faults_shows_counters_as_they_arrive() {
    let replies: Vec<Message> = (0..4)
        .flat_map(|_| [Message::Field(Field::DistCounter, 3), Message::Field(Field::TempCounter, 12)])
        .collect();
    let mut node = console(WireFormat::Framed, &replies);
    let mut ui = MockPanel::new(&[3, 0]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });

    let mut expected = vec![Message::Command(3), Message::Tick(0)];
    for t in 1..=4 {
        expected.extend([Message::Tick(t), Message::Ack]);
    }
    expected.extend([Message::Tick(5), Message::Repeat(false)]);
    assert_eq!(sent(&node), expected);

    let shown = Screen::Faults(Some(FaultCounters { dist: 3, temp: 12 }));
    assert_eq!(ui.screens.iter().filter(|s| **s == shown).count(), 4);
    assert!(ui.rows().iter().any(|r| r == "P001: 3"));
    assert!(ui.rows().iter().any(|r| r == "P002: 12"));
}

#[test]
fn matching_key_repeats_the_pass() {
    let replies: Vec<Message> = (0..8)
        .flat_map(|_| [Message::Field(Field::DistCounter, 0), Message::Field(Field::TempCounter, 1)])
        .collect();
    let mut node = console(WireFormat::Framed, &replies);
    let mut ui = MockPanel::new(&[3, 3, 1]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 2 });

    let repeats: Vec<Message> = sent(&node)
        .into_iter()
        .filter(|m| matches!(m, Message::Repeat(_)))
        .collect();
    assert_eq!(repeats, [Message::Repeat(true), Message::Repeat(false)]);
    assert_eq!(ticks.restarts, 2);
    assert_eq!(
        ui.screens.iter().filter(|s| **s == Screen::RepeatPrompt(Command::RetrieveFaults)).count(),
        2
    );
}

#[test]
fn stop_counts_down_without_link_traffic() {
    let mut node = console(WireFormat::Framed, &[]);
    let mut ui = MockPanel::new(&[4]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(outcome(d), SessionOutcome::Completed { passes: 1 });
    assert_eq!(sent(&node), [Message::Command(4)]);
    assert_eq!(ui.screens, [Screen::Menu, Screen::Stopping]);
    assert_eq!((ticks.restarts, ticks.stops), (1, 1));
}

#[test]
fn unknown_key_is_sent_and_ignored() {
    let mut node = console(WireFormat::Raw, &[]);
    let mut ui = MockPanel::new(&[7]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(d, Dispatch::Ignored(7));
    assert_eq!(node.link().transport().tx, [7]);
    assert_eq!(sink.events, [NodeEvent::CommandIgnored(7)]);
    assert_eq!(ticks.restarts, 0);
}

#[test]
fn unknown_key_is_ignored_when_the_send_fails() {
    let mut transport = ScriptedTransport::new(Vec::new());
    transport.fail_writes = true;
    let mut node = ConsoleNode::new(Link::new(transport, &link_config(WireFormat::Raw)));
    let mut ui = MockPanel::new(&[7]);
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut StepTicks::default(), &mut sink);
    assert_eq!(d, Dispatch::Ignored(7));
    assert!(node.link().transport().tx.is_empty());
    assert_eq!(sink.events, [NodeEvent::CommandIgnored(7)]);
    assert_eq!(node.state(), DispatcherState::MainMenu);
}

// ── Tick source failures ──────────────────────────────────────

#[test]
fn monitor_aborts_when_the_timer_will_not_start() {
    let mut node = console(WireFormat::Framed, &[]);
    let mut ui = MockPanel::new(&[2]);
    let mut ticks = StepTicks::failing(TickError::InUse);
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(outcome(d), SessionOutcome::ClockFailed(TickError::InUse));
    assert_eq!(ui.screens.last(), Some(&Screen::ClockFault));
    // No tick went out; the sensor node is told to give up instead.
    assert_eq!(sent(&node), [Message::Command(2), Message::Resync]);
    assert_eq!((ticks.restarts, ticks.stops), (1, 1));
    assert_eq!(node.state(), DispatcherState::MainMenu);
    assert!(sink.events.contains(&NodeEvent::ClockFailed {
        command: Command::Monitor,
        error: TickError::InUse
    }));
}

#[test]
fn stop_reports_a_clock_fault_without_resync() {
    let mut node = console(WireFormat::Framed, &[]);
    let mut ui = MockPanel::new(&[4]);
    let mut ticks = StepTicks::failing(TickError::Hardware(-1));
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(outcome(d), SessionOutcome::ClockFailed(TickError::Hardware(-1)));
    assert_eq!(ui.screens, [Screen::Menu, Screen::Stopping, Screen::ClockFault]);
    assert_eq!(sent(&node), [Message::Command(4)]);
    assert_eq!(ticks.stops, 1);
}

#[test]
fn stale_input_is_dropped_before_the_command() {
    let stale = encode(WireFormat::Raw, &[Message::Field(Field::Temperature, 1), Message::Ack]);
    let mut node = ConsoleNode::new(Link::new(
        ScriptedTransport::new(stale),
        &link_config(WireFormat::Raw),
    ));
    let mut ui = MockPanel::new(&[4]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(node.link().transport().remaining(), 0);
    assert_eq!(node.link().transport().tx, [4]);
}

#[test]
fn silent_sensor_shows_link_lost_and_resyncs() {
    let mut node = console(WireFormat::Framed, &[]);
    let mut ui = MockPanel::new(&[2]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    let reason = LinkError::ReceiveTimeout { polls: 40 };
    assert_eq!(outcome(d), SessionOutcome::Aborted(reason));
    assert_eq!(ui.screens.last(), Some(&Screen::LinkLost));
    assert_eq!(sent(&node).last(), Some(&Message::Resync));
    assert_eq!(ticks.stops, 1, "the tick source is stopped on abort");
    assert!(sink.events.contains(&NodeEvent::SessionAborted {
        command: Command::Monitor,
        reason
    }));
}

#[test]
fn sensor_resync_aborts_without_echo() {
    let mut node = console(WireFormat::Framed, &[Message::Resync]);
    let mut ui = MockPanel::new(&[3]);
    let mut ticks = StepTicks::default();
    let mut sink = RecordingSink::default();

    let d = node.run_once(&mut ui, &mut ticks, &mut sink);
    assert_eq!(outcome(d), SessionOutcome::Aborted(LinkError::ResyncRequested));
    assert!(!sent(&node).contains(&Message::Resync));
    assert_eq!(node.link().stats().resyncs, 0);
    assert_eq!(ui.screens.last(), Some(&Screen::LinkLost));
}
