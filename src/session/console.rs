//! Operator console session runner.
//!
//! Renders the menu, forwards the operator's key verbatim and then drives
//! the session clock: the console owns the tick source and the sensor node
//! follows whatever tick values it receives.

use log::{debug, info, warn};

use super::{Dispatch, DispatcherState, SessionOutcome, SessionReport, ends_pass};
use crate::app::commands::Command;
use crate::app::events::NodeEvent;
use crate::app::ports::{DisplayPort, EventSink, KeypadPort, TickError, TickSource};
use crate::display::Screen;
use crate::faults::FaultCounters;
use crate::link::{Field, Link, LinkError, Message, MessageKind, Transport, Wait};
use crate::telemetry::{MONITOR_FIELDS, TelemetrySample};

/// Why a console session stopped early.
enum Abort {
    Link(LinkError),
    Clock(TickError),
}

impl From<LinkError> for Abort {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

pub struct ConsoleNode<T: Transport> {
    link: Link<T>,
    state: DispatcherState,
}

impl<T: Transport> ConsoleNode<T> {
    pub fn new(link: Link<T>) -> Self {
        Self {
            link,
            state: DispatcherState::MainMenu,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    /// Show the menu, take one key, send it and run the session it selects.
    ///
    /// Keys that select nothing are still sent, as the sensor node ignores
    /// them too, and the menu comes back.
    pub fn run_once<U, K, E>(&mut self, ui: &mut U, ticks: &mut K, sink: &mut E) -> Dispatch
    where
        U: KeypadPort + DisplayPort,
        K: TickSource,
        E: EventSink,
    {
        ui.show(&Screen::Menu);
        let key = ui.read_key();

        // Whatever is still buffered belongs to an earlier, finished exchange.
        match self.link.discard_input() {
            Ok(0) => {}
            Ok(n) => debug!("SESSION | dropped {n} stale bytes before command"),
            Err(e) => warn!("SESSION | could not drain link: {}", e),
        }
        let sent = self.link.send(Message::Command(key));

        let Ok(command) = Command::try_from(key) else {
            if let Err(e) = sent {
                warn!("SESSION | could not send key {}: {}", key, e);
            }
            debug!("SESSION | key {key} selects nothing");
            sink.emit(&NodeEvent::CommandIgnored(key));
            return Dispatch::Ignored(key);
        };

        self.state = DispatcherState::InSession(command);
        info!("SESSION | {} started", command);
        sink.emit(&NodeEvent::SessionStarted(command));

        let result = sent.map_err(Abort::from).and_then(|()| match command {
            Command::Start => self.run_start(ui, ticks),
            Command::Monitor | Command::RetrieveFaults => {
                self.run_repeating(command, ui, ticks, sink)
            }
            Command::Stop => Self::run_stop(ui, ticks).map_err(Abort::Clock),
        });
        self.state = DispatcherState::MainMenu;

        let outcome = match result {
            Ok(passes) => {
                sink.emit(&NodeEvent::SessionFinished { command, passes });
                SessionOutcome::Completed { passes }
            }
            Err(Abort::Link(reason)) => {
                warn!("SESSION | {} aborted: {}", command, reason);
                self.recover(reason);
                ui.show(&Screen::LinkLost);
                sink.emit(&NodeEvent::SessionAborted { command, reason });
                SessionOutcome::Aborted(reason)
            }
            Err(Abort::Clock(error)) => {
                warn!("SESSION | {} aborted: {}", command, error);
                // The sensor node is waiting for ticks that will not come.
                if command != Command::Stop {
                    if let Err(e) = self.link.resync() {
                        warn!("SESSION | recovery failed: {}", e);
                    }
                }
                ui.show(&Screen::ClockFault);
                sink.emit(&NodeEvent::ClockFailed { command, error });
                SessionOutcome::ClockFailed(error)
            }
        };
        Dispatch::Ran(SessionReport { command, outcome })
    }

    // ── Sessions ───────────────────────────────────────────────

    fn run_start<U, K>(&mut self, ui: &mut U, ticks: &mut K) -> Result<u8, Abort>
    where
        U: DisplayPort,
        K: TickSource,
    {
        ui.show(&Screen::OperationStarted);
        self.tick_pass(ticks, |_, _| Ok(()))?;
        Ok(1)
    }

    fn run_repeating<U, K, E>(
        &mut self,
        command: Command,
        ui: &mut U,
        ticks: &mut K,
        sink: &mut E,
    ) -> Result<u8, Abort>
    where
        U: KeypadPort + DisplayPort,
        K: TickSource,
        E: EventSink,
    {
        let mut passes = 0u8;
        loop {
            if command == Command::Monitor {
                self.monitor_pass(ui, ticks, sink)?;
            } else {
                self.faults_pass(ui, ticks)?;
            }
            passes = passes.saturating_add(1);

            ui.show(&Screen::RepeatPrompt(command));
            let again = ui.read_key() == command.code();
            self.link.send(Message::Repeat(again))?;
            if !again {
                return Ok(passes);
            }
            debug!("SESSION | {} repeating", command);
        }
    }

    /// Each tick shows the sample received on the previous tick, then
    /// receives the current one. The final sample of a pass is never shown.
    fn monitor_pass<U, K, E>(
        &mut self,
        ui: &mut U,
        ticks: &mut K,
        sink: &mut E,
    ) -> Result<(), Abort>
    where
        U: DisplayPort,
        K: TickSource,
        E: EventSink,
    {
        ui.show(&Screen::Telemetry(None));
        let mut previous: Option<TelemetrySample> = None;
        self.tick_pass(ticks, |node, _| {
            if previous.is_some() {
                ui.show(&Screen::Telemetry(previous));
            }
            let sample = node.receive_sample()?;
            sink.emit(&NodeEvent::Telemetry(sample));
            previous = Some(sample);
            Ok(())
        })
    }

    /// Counters are shown as soon as they arrive.
    fn faults_pass<U, K>(&mut self, ui: &mut U, ticks: &mut K) -> Result<(), Abort>
    where
        U: DisplayPort,
        K: TickSource,
    {
        ui.show(&Screen::Faults(None));
        self.tick_pass(ticks, |node, _| {
            let dist = node.receive_field(Field::DistCounter)?;
            node.link.send_ack()?;
            let temp = node.receive_field(Field::TempCounter)?;
            ui.show(&Screen::Faults(Some(FaultCounters { dist, temp })));
            Ok(())
        })
    }

    /// Local countdown only; nothing crosses the link.
    fn run_stop<U, K>(ui: &mut U, ticks: &mut K) -> Result<u8, TickError>
    where
        U: DisplayPort,
        K: TickSource,
    {
        ui.show(&Screen::Stopping);
        if let Err(e) = ticks.restart() {
            ticks.stop();
            return Err(e);
        }
        let mut t = ticks.now();
        while !ends_pass(t) {
            t = ticks.wait_advance(t);
        }
        ticks.stop();
        Ok(1)
    }

    // ── Tick clock ─────────────────────────────────────────────

    /// Send the opening tick, then every new tick value, running `per_tick`
    /// after each one below the limit. The pass ends with the first tick
    /// value at or above the limit, which is sent as well.
    fn tick_pass<K, F>(&mut self, ticks: &mut K, per_tick: F) -> Result<(), Abort>
    where
        K: TickSource,
        F: FnMut(&mut Self, u8) -> Result<(), LinkError>,
    {
        let result = match ticks.restart() {
            Ok(()) => self.tick_loop(ticks, per_tick).map_err(Abort::from),
            Err(e) => Err(Abort::Clock(e)),
        };
        ticks.stop();
        result
    }

    fn tick_loop<K, F>(&mut self, ticks: &mut K, mut per_tick: F) -> Result<(), LinkError>
    where
        K: TickSource,
        F: FnMut(&mut Self, u8) -> Result<(), LinkError>,
    {
        let mut t = ticks.now();
        self.link.send(Message::Tick(t))?;
        loop {
            // One read decides both what is sent and whether to continue.
            t = ticks.wait_advance(t);
            self.link.send(Message::Tick(t))?;
            if ends_pass(t) {
                return Ok(());
            }
            per_tick(self, t)?;
        }
    }

    // ── Link helpers ───────────────────────────────────────────

    fn receive_sample(&mut self) -> Result<TelemetrySample, LinkError> {
        let mut sample = TelemetrySample::default();
        let last = MONITOR_FIELDS.len() - 1;
        for (i, field) in MONITOR_FIELDS.into_iter().enumerate() {
            let value = self.receive_field(field)?;
            sample.merge(field, value);
            if i < last {
                self.link.send_ack()?;
            }
        }
        Ok(sample)
    }

    fn receive_field(&mut self, field: Field) -> Result<u8, LinkError> {
        match self.link.receive(MessageKind::Field(field), Wait::Bounded)? {
            Message::Field(_, value) => Ok(value),
            other => Err(LinkError::Unexpected {
                expected: MessageKind::Field(field),
                got: other.kind(),
            }),
        }
    }

    fn recover(&mut self, reason: LinkError) {
        let result = if reason == LinkError::ResyncRequested {
            self.link.discard_input().map(|_| ())
        } else {
            self.link.resync()
        };
        if let Err(e) = result {
            warn!("SESSION | recovery failed: {}", e);
        }
    }
}
