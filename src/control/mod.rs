//! Actuation: decision policy and the command sequencer.
//!
//! [`policy::decide`] is a pure function from (snapshot, setpoints, clock,
//! actuator state) to a [`CommandSet`]. The
//! [`ActuationSequencer`](sequencer::ActuationSequencer) applies the set
//! through the actuator bus and owns all actuator state.

pub mod policy;
pub mod sequencer;

use core::fmt;

use heapless::Vec;
use serde::Serialize;

/// Every output the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ActuatorId {
    /// Irrigation pump relay.
    Pump = 0,
    /// Circulation fan relay.
    Fan = 1,
    /// Heater relay.
    Heater = 2,
    /// Grow light relay.
    Light = 3,
    /// Door / window servo.
    Door = 4,
}

impl ActuatorId {
    /// Total number of actuators, used to size per-actuator tables.
    pub const COUNT: usize = 5;

    pub const ALL: [ActuatorId; Self::COUNT] =
        [Self::Pump, Self::Fan, Self::Heater, Self::Light, Self::Door];

    /// Relay outputs take On/Off; the door servo takes an angle.
    pub const fn is_digital(self) -> bool {
        !matches!(self, Self::Door)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pump => "pump",
            Self::Fan => "fan",
            Self::Heater => "heater",
            Self::Light => "light",
            Self::Door => "door",
        }
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    On,
    Off,
    /// Servo angle in degrees; clamped to 0–180 on apply.
    SetAngle(u8),
    /// Switch on now and off automatically after the given milliseconds.
    RunFor(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActuatorCommand {
    pub target: ActuatorId,
    pub action: Action,
}

impl ActuatorCommand {
    pub const fn new(target: ActuatorId, action: Action) -> Self {
        Self { target, action }
    }
}

/// The commands produced by one policy evaluation.
///
/// Holds at most one command per actuator; [`insert`](Self::insert)
/// replaces an earlier command for the same target, so the set is
/// conflict-free by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    commands: Vec<ActuatorCommand, { ActuatorId::COUNT }>,
}

impl CommandSet {
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Add a command, replacing any earlier one for the same actuator.
    pub fn insert(&mut self, cmd: ActuatorCommand) {
        if let Some(existing) = self.commands.iter_mut().find(|c| c.target == cmd.target) {
            *existing = cmd;
            return;
        }
        // One slot per actuator, so this cannot overflow.
        let _ = self.commands.push(cmd);
    }

    pub fn get(&self, target: ActuatorId) -> Option<Action> {
        self.commands
            .iter()
            .find(|c| c.target == target)
            .map(|c| c.action)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActuatorCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<'a> IntoIterator for &'a CommandSet {
    type Item = &'a ActuatorCommand;
    type IntoIter = core::slice::Iter<'a, ActuatorCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
