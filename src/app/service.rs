//! Control loop: the hexagonal core.
//!
//! [`ControlLoop`] owns the sensor aggregator (and through it the health
//! tracker) and the actuation sequencer. It exposes a hardware-agnostic
//! API; all I/O flows through port traits injected at call sites, making
//! the whole loop testable with mock adapters.
//!
//! ```text
//!   SensorBus ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │         ControlLoop          │
//! ActuatorBus ◀── │ Aggregator · Policy · Sequencer│ ◀── Clock, Setpoints
//!                 └──────────────────────────────┘
//! ```
//!
//! One cycle runs to completion before the next starts. Nothing in a cycle
//! can abort the loop: every failure is logged, surfaced as an event and
//! retried on a later cycle.

use log::{debug, info, warn};

use crate::config::ControlConfig;
use crate::control::policy;
use crate::control::sequencer::{ActuationSequencer, ActuatorState, ApplyReport};
use crate::control::{Action, ActuatorCommand, ActuatorId, CommandSet};
use crate::error::{ActuatorError, Result};
use crate::health::HealthStatus;
use crate::sensors::{DeviceId, DeviceSummary, SensorAggregator, SensorSnapshot};
use crate::time::Timestamp;

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorBus, Clock, EventSink, SensorBus, SetpointsProvider};

/// What one [`ControlLoop::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub tick: u64,
    pub snapshot: SensorSnapshot,
    /// `None` if the setpoints were unavailable and no decision was taken.
    pub commands: Option<CommandSet>,
    pub applied: ApplyReport,
    pub expired: ApplyReport,
    /// Number of devices recovered, if a rediscovery pass ran.
    pub rediscovered: Option<u8>,
    pub telemetry_sent: bool,
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop {
    config: ControlConfig,
    sensors: SensorAggregator,
    sequencer: ActuationSequencer,
    last_snapshot: SensorSnapshot,
    last_rediscovery: Option<Timestamp>,
    last_telemetry: Option<Timestamp>,
    tick_count: u64,
}

impl ControlLoop {
    /// Construct the loop from configuration.
    ///
    /// Does **not** touch hardware. Call [`start`](Self::start) next.
    pub fn new(config: ControlConfig) -> Self {
        Self {
            sensors: SensorAggregator::new(&config),
            sequencer: ActuationSequencer::new(),
            last_snapshot: SensorSnapshot::default(),
            last_rediscovery: None,
            last_telemetry: None,
            tick_count: 0,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Discover devices, force every relay off and park the door at its
    /// neutral angle.
    ///
    /// Returns the number of sensor devices found.
    pub fn start(
        &mut self,
        hw: &mut (impl SensorBus + ActuatorBus),
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> u8 {
        let now = clock.now();
        let found = self.sensors.discover(hw, now);
        self.last_rediscovery = Some(now);

        if let Err(e) = self.sequencer.stop_all(hw, now) {
            warn!("Initial relay reset failed: {}", e);
        }
        let door = ActuatorCommand::new(
            ActuatorId::Door,
            Action::SetAngle(self.config.door_neutral_angle),
        );
        if let Err(e) = self.apply_manual(door, hw, now, sink) {
            warn!("Door could not be parked: {}", e);
        }

        sink.emit(&AppEvent::Started {
            devices_present: found,
        });
        info!("ControlLoop started: {}/{} sensor devices", found, DeviceId::COUNT);
        found
    }

    /// Safe shutdown: every relay off. Must be the last call on the loop.
    pub fn shutdown(
        &mut self,
        hw: &mut impl ActuatorBus,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> core::result::Result<(), ActuatorError> {
        let before = *self.sequencer.state();
        let result = self.sequencer.stop_all(hw, clock.now());
        self.emit_state_diff(&before, sink);
        match result {
            Ok(()) => info!("All actuators off, control loop stopped"),
            Err(e) => warn!("Shutdown: relay write failed: {}", e),
        }
        sink.emit(&AppEvent::Stopped);
        result
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle:
    /// poll → decide → apply → expire timed runs → rediscovery → telemetry.
    ///
    /// `hw` satisfies **both** [`SensorBus`] and [`ActuatorBus`].
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorBus + ActuatorBus),
        clock: &impl Clock,
        setpoints: &impl SetpointsProvider,
        sink: &mut impl EventSink,
    ) -> CycleReport {
        self.tick_count += 1;
        let sample = clock.sample();
        let now = sample.now;

        // 1. Sensors
        let before = self.sensors.statuses();
        let snapshot = self.sensors.poll(hw, now);
        self.last_snapshot = snapshot;
        self.emit_health_changes(&before, sink);

        // 2. Decide + apply
        let (commands, applied) = match setpoints.snapshot() {
            Ok(sp) => {
                let commands = policy::decide(&snapshot, &sp, sample, self.sequencer.state());
                let applied = self.sequencer.apply(&commands, hw, now);
                Self::emit_report(&applied, sink);
                (Some(commands), applied)
            }
            Err(e) => {
                warn!("Setpoints unavailable ({}), skipping decisions", e);
                sink.emit(&AppEvent::SetpointsUnavailable);
                (None, ApplyReport::default())
            }
        };

        // 3. Timed runs end regardless of what the policy said.
        let expired = self.sequencer.expire_timed_actions(hw, now);
        Self::emit_report(&expired, sink);

        // 4. Rediscovery
        let rediscovered = if self.rediscovery_due(now) {
            let before = self.sensors.statuses();
            let recovered = self.sensors.rediscover(hw, now);
            self.last_rediscovery = Some(now);
            self.emit_health_changes(&before, sink);
            sink.emit(&AppEvent::Rediscovery { recovered });
            Some(recovered)
        } else {
            None
        };

        // 5. Telemetry
        let telemetry_sent = self.telemetry_due(now);
        if telemetry_sent {
            self.last_telemetry = Some(now);
            sink.emit(&AppEvent::Telemetry(self.build_telemetry()));
        }

        debug!(
            "tick {}: healthy={} commands={}",
            self.tick_count,
            snapshot.system_healthy,
            commands.as_ref().map_or(0, CommandSet::len)
        );

        CycleReport {
            tick: self.tick_count,
            snapshot,
            commands,
            applied,
            expired,
            rediscovered,
            telemetry_sent,
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (web API, button, console).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut (impl SensorBus + ActuatorBus),
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let now = clock.now();
        match cmd {
            AppCommand::Manual(command) => {
                info!("Manual command: {} {:?}", command.target, command.action);
                self.apply_manual(command, hw, now, sink)?;
            }
            AppCommand::CalibrateSoil(point) => {
                self.sensors.calibrate_soil(hw, point)?;
            }
            AppCommand::StopAll => {
                let before = *self.sequencer.state();
                let result = self.sequencer.stop_all(hw, now);
                self.emit_state_diff(&before, sink);
                result?;
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the last cycle.
    pub fn build_telemetry(&self) -> TelemetryData {
        let state = self.sequencer.state();
        TelemetryData {
            tick: self.tick_count,
            sensors: self.last_snapshot,
            system_healthy: self.sensors.system_healthy(),
            pump: state.output(ActuatorId::Pump),
            fan: state.output(ActuatorId::Fan),
            heater: state.output(ActuatorId::Heater),
            light: state.output(ActuatorId::Light),
            door: state.output(ActuatorId::Door),
        }
    }

    /// Presence and health of every sensor device.
    pub fn device_summary(&self) -> [DeviceSummary; DeviceId::COUNT] {
        self.sensors.summary()
    }

    /// Snapshot produced by the most recent cycle.
    pub fn last_snapshot(&self) -> &SensorSnapshot {
        &self.last_snapshot
    }

    pub fn actuator_state(&self) -> &ActuatorState {
        self.sequencer.state()
    }

    pub fn sensors(&self) -> &SensorAggregator {
        &self.sensors
    }

    pub fn system_healthy(&self) -> bool {
        self.sensors.system_healthy()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_manual(
        &mut self,
        command: ActuatorCommand,
        hw: &mut impl ActuatorBus,
        now: Timestamp,
        sink: &mut impl EventSink,
    ) -> core::result::Result<(), ActuatorError> {
        match self.sequencer.apply_one(command, hw, now) {
            Ok(Some(output)) => {
                sink.emit(&AppEvent::ActuatorChanged {
                    actuator: command.target,
                    output,
                });
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(error) => {
                sink.emit(&AppEvent::ActuatorFault {
                    actuator: command.target,
                    error,
                });
                Err(error)
            }
        }
    }

    /// Rate-limited: only when something is unhealthy, and never more often
    /// than the rediscovery interval however fast the loop ticks.
    fn rediscovery_due(&self, now: Timestamp) -> bool {
        if !self.sensors.any_unhealthy() {
            return false;
        }
        self.last_rediscovery
            .is_none_or(|last| now.millis_since(last) >= self.config.rediscovery_interval_ms)
    }

    fn telemetry_due(&self, now: Timestamp) -> bool {
        self.last_telemetry
            .is_none_or(|last| now.millis_since(last) >= self.config.telemetry_interval_ms)
    }

    fn emit_health_changes(
        &self,
        before: &[HealthStatus; DeviceId::COUNT],
        sink: &mut impl EventSink,
    ) {
        let after = self.sensors.statuses();
        for device in DeviceId::ALL {
            let (from, to) = (before[device as usize], after[device as usize]);
            if from != to {
                sink.emit(&AppEvent::HealthChanged { device, from, to });
            }
        }
    }

    fn emit_report(report: &ApplyReport, sink: &mut impl EventSink) {
        for &(actuator, output) in &report.changed {
            sink.emit(&AppEvent::ActuatorChanged { actuator, output });
        }
        for &(actuator, error) in &report.failed {
            sink.emit(&AppEvent::ActuatorFault { actuator, error });
        }
    }

    fn emit_state_diff(&self, before: &ActuatorState, sink: &mut impl EventSink) {
        let after = self.sequencer.state();
        for actuator in ActuatorId::ALL {
            let output = after.output(actuator);
            if before.output(actuator) != output {
                sink.emit(&AppEvent::ActuatorChanged { actuator, output });
            }
        }
    }
}
