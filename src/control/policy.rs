//! Decision policy: snapshot + setpoints + clock → [`CommandSet`].
//!
//! Pure and deterministic. Every timer the rules depend on (the watering
//! cooldown) is read from the [`ActuatorState`] and [`ClockSample`] the
//! caller passes in, never from a hidden clock.
//!
//! Rules vote per relay; the fan is targeted by three rules and the merge
//! is **On wins**: the fan is commanded On if any rule votes On and Off
//! only if at least one rule votes Off and none votes On. A rule whose
//! input is missing abstains.

use crate::config::Setpoints;
use crate::sensors::SensorSnapshot;
use crate::time::ClockSample;

use super::sequencer::ActuatorState;
use super::{Action, ActuatorCommand, ActuatorId, CommandSet};

/// Per-relay vote collector.
#[derive(Debug, Default)]
struct Ballot {
    /// Indexed by `ActuatorId as usize`. `Some(true)` = On.
    votes: [Option<bool>; ActuatorId::COUNT],
}

impl Ballot {
    fn on(&mut self, id: ActuatorId) {
        self.votes[id as usize] = Some(true);
    }

    fn off(&mut self, id: ActuatorId) {
        let v = &mut self.votes[id as usize];
        if v.is_none() {
            *v = Some(false);
        }
    }

    fn into_commands(self, out: &mut CommandSet) {
        for id in ActuatorId::ALL {
            if let Some(on) = self.votes[id as usize] {
                let action = if on { Action::On } else { Action::Off };
                out.insert(ActuatorCommand::new(id, action));
            }
        }
    }
}

/// Evaluate every rule for one control cycle.
///
/// Returns an empty set when automation is disabled.
pub fn decide(
    snapshot: &SensorSnapshot,
    setpoints: &Setpoints,
    clock: ClockSample,
    state: &ActuatorState,
) -> CommandSet {
    let mut commands = CommandSet::new();
    if !setpoints.automation_enabled {
        return commands;
    }

    let mut ballot = Ballot::default();
    temperature_rule(snapshot.air_temperature_c, setpoints, &mut ballot);
    humidity_rule(snapshot.air_humidity_pct, setpoints, &mut ballot);
    ventilation_rule(snapshot, setpoints, &mut ballot);
    lighting_rule(clock.hour, setpoints, &mut ballot);
    ballot.into_commands(&mut commands);

    if let Some(cmd) = watering_rule(snapshot.soil_moisture_pct, setpoints, clock, state) {
        commands.insert(cmd);
    }
    commands
}

/// Three-way hysteresis: above the band cool, below it heat, inside it
/// leave both relays alone.
fn temperature_rule(temp: Option<f32>, sp: &Setpoints, ballot: &mut Ballot) {
    let Some(t) = temp else { return };
    if t > sp.temperature_c + sp.temperature_hysteresis_c {
        ballot.on(ActuatorId::Fan);
        ballot.off(ActuatorId::Heater);
    } else if t < sp.temperature_c - sp.temperature_hysteresis_c {
        ballot.on(ActuatorId::Heater);
        ballot.off(ActuatorId::Fan);
    }
}

/// Only the high side acts. There is no dehumidifier, so humidity below
/// the band produces no vote.
fn humidity_rule(humidity: Option<f32>, sp: &Setpoints, ballot: &mut Ballot) {
    let Some(h) = humidity else { return };
    if h > sp.humidity_pct + sp.humidity_band_pct {
        ballot.on(ActuatorId::Fan);
    }
}

fn ventilation_rule(snapshot: &SensorSnapshot, sp: &Setpoints, ballot: &mut Ballot) {
    let (Some(t), Some(h)) = (snapshot.air_temperature_c, snapshot.air_humidity_pct) else {
        return;
    };
    if t > sp.vent_temperature_c && h > sp.vent_humidity_pct {
        ballot.on(ActuatorId::Fan);
    }
}

/// On for `on_hour <= hour < off_hour`.
///
/// The window does not wrap past midnight: `off_hour <= on_hour` means the
/// light is always off. No command until the wall clock is known.
fn lighting_rule(hour: Option<u8>, sp: &Setpoints, ballot: &mut Ballot) {
    let Some(hour) = hour else { return };
    if sp.light_on_hour <= hour && hour < sp.light_off_hour {
        ballot.on(ActuatorId::Light);
    } else {
        ballot.off(ActuatorId::Light);
    }
}

/// Never waters on missing data, and never twice within the cooldown.
fn watering_rule(
    moisture: Option<f32>,
    sp: &Setpoints,
    clock: ClockSample,
    state: &ActuatorState,
) -> Option<ActuatorCommand> {
    let m = moisture?;
    if m >= sp.soil_moisture_pct - sp.watering_margin_pct {
        return None;
    }
    let cooled_down = match state.last_pump_run() {
        Some(last) => clock.now.millis_since(last) > sp.watering_cooldown_ms,
        None => true,
    };
    cooled_down.then(|| {
        ActuatorCommand::new(ActuatorId::Pump, Action::RunFor(sp.watering_duration_ms))
    })
}
