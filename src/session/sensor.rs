//! Sensor/actuator node session runner.
//!
//! Owns the link, the fault counter store and the breach detector. Sensors,
//! buttons and motors are passed in per call so the runner never holds a
//! hardware borrow between sessions.

use log::{debug, info, warn};

use super::{Dispatch, DispatcherState, SessionOutcome, SessionReport, ends_pass};
use crate::actuator::{WindowId, arbitrate};
use crate::app::commands::Command;
use crate::app::events::NodeEvent;
use crate::app::ports::{ButtonPort, EventSink, MotorPort, SensorPort, StoragePort, WindowButton};
use crate::faults::{BreachDetector, FaultCounterStore, FaultKind, Thresholds};
use crate::link::{Field, Link, LinkError, Message, MessageKind, Transport, Wait};
use crate::telemetry::TelemetrySample;

pub struct SensorNode<T: Transport, S: StoragePort> {
    link: Link<T>,
    store: FaultCounterStore<S>,
    detector: BreachDetector,
    state: DispatcherState,
}

impl<T: Transport, S: StoragePort> SensorNode<T, S> {
    pub fn new(link: Link<T>, store: FaultCounterStore<S>, thresholds: Thresholds) -> Self {
        Self {
            link,
            store,
            detector: BreachDetector::new(thresholds),
            state: DispatcherState::MainMenu,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    pub fn store(&self) -> &FaultCounterStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FaultCounterStore<S> {
        &mut self.store
    }

    pub fn detector(&self) -> &BreachDetector {
        &self.detector
    }

    /// Wait for one command byte and run the session it selects.
    ///
    /// Session-level link failures are handled here (resync, back to idle)
    /// and reported in the returned [`Dispatch`]. `Err` is only returned
    /// when the idle wait itself fails.
    pub fn serve_once<H, E>(&mut self, hw: &mut H, sink: &mut E) -> Result<Dispatch, LinkError>
    where
        H: SensorPort + ButtonPort + MotorPort,
        E: EventSink,
    {
        let code = self.link.receive_command()?;
        let Ok(command) = Command::try_from(code) else {
            debug!("SESSION | ignoring command byte 0x{code:02X}");
            sink.emit(&NodeEvent::CommandIgnored(code));
            return Ok(Dispatch::Ignored(code));
        };

        self.state = DispatcherState::InSession(command);
        info!("SESSION | {} started", command);
        sink.emit(&NodeEvent::SessionStarted(command));

        let result = match command {
            Command::Start => self.run_start(hw, sink),
            Command::Monitor | Command::RetrieveFaults => self.run_repeating(command, hw, sink),
            Command::Stop => Ok(self.run_stop(sink)),
        };
        self.state = DispatcherState::MainMenu;

        let outcome = match result {
            Ok(passes) => {
                sink.emit(&NodeEvent::SessionFinished { command, passes });
                SessionOutcome::Completed { passes }
            }
            Err(reason) => {
                warn!("SESSION | {} aborted: {}", command, reason);
                self.recover(reason);
                sink.emit(&NodeEvent::SessionAborted { command, reason });
                SessionOutcome::Aborted(reason)
            }
        };
        Ok(Dispatch::Ran(SessionReport { command, outcome }))
    }

    // ── Sessions ───────────────────────────────────────────────

    /// Heartbeat for every tick below the limit, no payload.
    fn run_start<H, E>(&mut self, hw: &mut H, sink: &mut E) -> Result<u8, LinkError>
    where
        H: SensorPort + ButtonPort + MotorPort,
        E: EventSink,
    {
        loop {
            let t = self.receive_tick()?;
            if ends_pass(t) {
                return Ok(1);
            }
            self.heartbeat(hw, sink);
        }
    }

    fn run_repeating<H, E>(
        &mut self,
        command: Command,
        hw: &mut H,
        sink: &mut E,
    ) -> Result<u8, LinkError>
    where
        H: SensorPort + ButtonPort + MotorPort,
        E: EventSink,
    {
        let mut passes = 0u8;
        loop {
            // Opening tick; its value carries no work.
            self.receive_tick()?;
            loop {
                let t = self.receive_tick()?;
                if ends_pass(t) {
                    break;
                }
                if command == Command::Monitor {
                    self.monitor_tick(hw, sink)?;
                } else {
                    self.faults_tick(hw, sink)?;
                }
            }
            passes = passes.saturating_add(1);

            // The operator decides, so this wait has no bound.
            let again = self.link.receive(MessageKind::Repeat, Wait::Forever)?;
            if again != Message::Repeat(true) {
                return Ok(passes);
            }
            debug!("SESSION | {} repeating", command);
        }
    }

    /// Five fields, acknowledged after each but the last.
    fn monitor_tick<H, E>(&mut self, hw: &mut H, sink: &mut E) -> Result<(), LinkError>
    where
        H: SensorPort + ButtonPort + MotorPort,
        E: EventSink,
    {
        let sample = self.produce_sample(hw, sink);
        sink.emit(&NodeEvent::Telemetry(sample));

        let fields = sample.fields();
        let last = fields.len() - 1;
        for (i, (field, value)) in fields.into_iter().enumerate() {
            self.link.send(Message::Field(field, value))?;
            if i < last {
                self.link.wait_for_ack()?;
            }
        }
        Ok(())
    }

    /// Counters as read before this tick's update: distance (acked), then
    /// temperature.
    fn faults_tick<H, E>(&mut self, hw: &mut H, sink: &mut E) -> Result<(), LinkError>
    where
        H: SensorPort + ButtonPort + MotorPort,
        E: EventSink,
    {
        let counters = match self.store.counters() {
            Ok(c) => c,
            Err(fault) => {
                sink.emit(&NodeEvent::StorageFault(fault));
                self.store.cached()
            }
        };
        // Viewing the counters still runs the update rule.
        self.heartbeat(hw, sink);

        self.link.send(Message::Field(Field::DistCounter, counters.dist))?;
        self.link.wait_for_ack()?;
        self.link.send(Message::Field(Field::TempCounter, counters.temp))
    }

    fn run_stop<E: EventSink>(&mut self, sink: &mut E) -> u8 {
        match self.store.reset_all() {
            Ok(()) => sink.emit(&NodeEvent::CountersReset),
            Err(fault) => sink.emit(&NodeEvent::StorageFault(fault)),
        }
        self.detector.clear();
        1
    }

    // ── Per-tick work ──────────────────────────────────────────

    /// Read sensors and apply the fault-update rule.
    fn heartbeat<H, E>(&mut self, hw: &mut H, sink: &mut E)
    where
        H: SensorPort,
        E: EventSink,
    {
        let snap = hw.read_all();
        self.update_faults(snap.temperature_c, snap.distance_cm, sink);
    }

    /// Read sensors, drive both windows from their buttons, apply the
    /// fault-update rule.
    fn produce_sample<H, E>(&mut self, hw: &mut H, sink: &mut E) -> TelemetrySample
    where
        H: SensorPort + ButtonPort + MotorPort,
        E: EventSink,
    {
        let snap = hw.read_all();

        let [window1, window2] = WindowId::ALL.map(|window| {
            let state = arbitrate(
                hw.is_pressed(window, WindowButton::Open),
                hw.is_pressed(window, WindowButton::Close),
            );
            if let Err(e) = hw.drive(window, state) {
                warn!("ACTUATOR | {:?}: {}", window, e);
            }
            state
        });

        self.update_faults(snap.temperature_c, snap.distance_cm, sink);

        TelemetrySample {
            temperature: snap.temperature_c,
            distance: snap.distance_cm,
            window1,
            window2,
        }
    }

    fn update_faults<E: EventSink>(&mut self, temperature: u8, distance: u16, sink: &mut E) {
        let breaches = self.detector.evaluate(temperature, distance);
        for (hit, kind) in [
            (breaches.temperature, FaultKind::Temperature),
            (breaches.distance, FaultKind::Distance),
        ] {
            if !hit {
                continue;
            }
            match self.store.increment(kind) {
                Ok(value) => sink.emit(&NodeEvent::FaultCounted { kind, value }),
                Err(fault) => sink.emit(&NodeEvent::StorageFault(fault)),
            }
        }
    }

    // ── Link helpers ───────────────────────────────────────────

    fn receive_tick(&mut self) -> Result<u8, LinkError> {
        match self.link.receive(MessageKind::Tick, Wait::Bounded)? {
            Message::Tick(t) => Ok(t),
            other => Err(LinkError::Unexpected {
                expected: MessageKind::Tick,
                got: other.kind(),
            }),
        }
    }

    /// Get back to a known idle state after an aborted session.
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
