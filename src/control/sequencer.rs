//! Actuation sequencer: sole writer of physical actuator output.
//!
//! Owns the logical [`ActuatorState`]; the hardware pin is never read back.
//! A command is recorded as applied only after the bus write succeeds, so
//! a failed write is retried whenever the policy next asks for it.
//!
//! Timed runs are data: `run_until` is checked by
//! [`expire_timed_actions`](ActuationSequencer::expire_timed_actions)
//! every cycle, whatever the policy decided.

use heapless::Vec;
use log::{debug, info, warn};
use serde::Serialize;

use crate::app::ports::ActuatorBus;
use crate::error::ActuatorError;
use crate::time::Timestamp;

use super::{Action, ActuatorCommand, ActuatorId, CommandSet};

/// Servo travel limit (degrees).
pub const MAX_ANGLE: u8 = 180;

/// Logical output level of one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Output {
    #[default]
    Off,
    On,
    Angle(u8),
}

/// Per-actuator record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorStatus {
    pub output: Output,
    /// Last time a command for this actuator was accepted (including no-ops).
    pub last_command_at: Option<Timestamp>,
    /// Active timed run ends here.
    pub run_until: Option<Timestamp>,
    /// Start of the most recent timed run.
    pub last_run_started: Option<Timestamp>,
}

/// Logical state of every actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    /// Indexed by `ActuatorId as usize`.
    actuators: [ActuatorStatus; ActuatorId::COUNT],
}

impl ActuatorState {
    pub fn get(&self, id: ActuatorId) -> ActuatorStatus {
        self.actuators[id as usize]
    }

    pub fn output(&self, id: ActuatorId) -> Output {
        self.actuators[id as usize].output
    }

    pub fn is_on(&self, id: ActuatorId) -> bool {
        self.output(id) == Output::On
    }

    /// Start of the last pump run, for the watering cooldown.
    pub fn last_pump_run(&self) -> Option<Timestamp> {
        self.actuators[ActuatorId::Pump as usize].last_run_started
    }

    /// Record the start of a pump run without touching the output.
    pub fn record_pump_run(&mut self, at: Timestamp) {
        self.actuators[ActuatorId::Pump as usize].last_run_started = Some(at);
    }

    fn slot(&mut self, id: ActuatorId) -> &mut ActuatorStatus {
        &mut self.actuators[id as usize]
    }
}

/// Outcome of one [`ActuationSequencer::apply`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Actuators whose physical output changed.
    pub changed: Vec<(ActuatorId, Output), { ActuatorId::COUNT }>,
    /// Writes that failed; state for these was left untouched.
    pub failed: Vec<(ActuatorId, ActuatorError), { ActuatorId::COUNT }>,
}

impl ApplyReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ActuationSequencer {
    state: ActuatorState,
}

impl ActuationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    /// Apply every command in the set, in order.
    pub fn apply(
        &mut self,
        commands: &CommandSet,
        bus: &mut impl ActuatorBus,
        now: Timestamp,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        for cmd in commands {
            match self.apply_one(*cmd, bus, now) {
                Ok(Some(output)) => {
                    let _ = report.changed.push((cmd.target, output));
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = report.failed.push((cmd.target, e));
                }
            }
        }
        report
    }

    /// Apply one command.
    ///
    /// Returns the new output if the physical level changed, `None` for a
    /// no-op. A command that repeats the current level still updates
    /// `last_command_at` but does not restart a timed run.
    pub fn apply_one(
        &mut self,
        cmd: ActuatorCommand,
        bus: &mut impl ActuatorBus,
        now: Timestamp,
    ) -> Result<Option<Output>, ActuatorError> {
        let id = cmd.target;
        let current = self.state.get(id);

        let target = match (cmd.action, id.is_digital()) {
            (Action::On | Action::RunFor(_), true) => Output::On,
            (Action::Off, true) => Output::Off,
            (Action::SetAngle(deg), false) => Output::Angle(deg.min(MAX_ANGLE)),
            _ => {
                warn!("{} does not accept {:?}", id, cmd.action);
                return Err(ActuatorError::Unsupported);
            }
        };

        if current.output == target {
            debug!("{} already {:?}", id, target);
            self.state.slot(id).last_command_at = Some(now);
            return Ok(None);
        }

        write(bus, id, target).inspect_err(|e| warn!("{} write failed: {}", id, e))?;

        let slot = self.state.slot(id);
        slot.output = target;
        slot.last_command_at = Some(now);
        match cmd.action {
            Action::RunFor(ms) => {
                slot.run_until = Some(now + ms);
                slot.last_run_started = Some(now);
                info!("{} on for {} ms", id, ms);
            }
            _ => {
                // A manual level change cancels any pending auto-stop.
                slot.run_until = None;
                info!("{} -> {:?}", id, target);
            }
        }
        Ok(Some(target))
    }

    /// Switch off every actuator whose timed run has ended (`now >= run_until`).
    ///
    /// A failed write keeps `run_until` so the stop is retried next cycle.
    pub fn expire_timed_actions(
        &mut self,
        bus: &mut impl ActuatorBus,
        now: Timestamp,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        for id in ActuatorId::ALL {
            let Some(until) = self.state.get(id).run_until else {
                continue;
            };
            if now < until {
                continue;
            }
            match bus.set_digital(id, false) {
                Ok(()) => {
                    let slot = self.state.slot(id);
                    slot.output = Output::Off;
                    slot.run_until = None;
                    slot.last_command_at = Some(now);
                    info!("{} timed run finished", id);
                    let _ = report.changed.push((id, Output::Off));
                }
                Err(e) => {
                    warn!("{} auto-stop failed: {}", id, e);
                    let _ = report.failed.push((id, e));
                }
            }
        }
        report
    }

    /// Safe shutdown: every relay off through [`ActuatorBus::all_off`].
    ///
    /// If the bulk write fails, each relay is switched off on its own and
    /// only the ones that succeed are recorded `Off`. A relay that still
    /// refuses keeps its logical state, so the next `Off` is written again.
    pub fn stop_all(
        &mut self,
        bus: &mut impl ActuatorBus,
        now: Timestamp,
    ) -> Result<(), ActuatorError> {
        let relays = ActuatorId::ALL.into_iter().filter(|id| id.is_digital());
        if let Err(e) = bus.all_off() {
            warn!("all_off failed ({}), switching relays off one by one", e);
            let mut first_error = None;
            for id in relays {
                match bus.set_digital(id, false) {
                    Ok(()) => self.record_off(id, now),
                    Err(e) => {
                        warn!("{} could not be switched off: {}", id, e);
                        first_error.get_or_insert(e);
                    }
                }
            }
            return first_error.map_or(Ok(()), Err);
        }
        for id in relays {
            self.record_off(id, now);
        }
        Ok(())
    }

    fn record_off(&mut self, id: ActuatorId, now: Timestamp) {
        let slot = self.state.slot(id);
        slot.output = Output::Off;
        slot.run_until = None;
        slot.last_command_at = Some(now);
    }
}

fn write(bus: &mut impl ActuatorBus, id: ActuatorId, output: Output) -> Result<(), ActuatorError> {
    match output {
        Output::On => bus.set_digital(id, true),
        Output::Off => bus.set_digital(id, false),
        Output::Angle(deg) => bus.set_angle(id, deg),
    }
}
