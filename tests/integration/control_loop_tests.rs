//! Integration tests for the ControlLoop → policy → sequencer pipeline.
//!
//! These run on the host and drive the full cycle against the recording
//! mock, asserting on the exact actuator writes that reach the bus.

use greenhouse::app::commands::AppCommand;
use greenhouse::app::events::AppEvent;
use greenhouse::app::service::ControlLoop;
use greenhouse::config::{ControlConfig, Setpoints};
use greenhouse::control::sequencer::Output;
use greenhouse::control::{Action, ActuatorCommand, ActuatorId};
use greenhouse::error::{ActuatorError, Error, SensorError};
use greenhouse::sensors::validate::CalibrationPoint;

use crate::mock_hw::{ActuatorCall, ManualClock, MockHardware, RecordingSink, UnavailableSetpoints};

const CYCLE_MS: u64 = 2_000;

/// Started loop with the start-up writes and events cleared.
fn make_loop() -> (ControlLoop, MockHardware, ManualClock, RecordingSink) {
    let mut app = ControlLoop::new(ControlConfig::default());
    let mut hw = MockHardware::new();
    let clock = ManualClock::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &clock, &mut sink);
    hw.calls.clear();
    sink.events.clear();
    (app, hw, clock, sink)
}

fn cycle(
    app: &mut ControlLoop,
    hw: &mut MockHardware,
    clock: &ManualClock,
    setpoints: &Setpoints,
    sink: &mut RecordingSink,
) -> greenhouse::app::service::CycleReport {
    clock.advance(CYCLE_MS);
    app.tick(hw, clock, setpoints, sink)
}

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn start_forces_relays_off_and_parks_door() {
    let mut app = ControlLoop::new(ControlConfig::default());
    let mut hw = MockHardware::new();
    let clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    assert_eq!(app.start(&mut hw, &clock, &mut sink), 3);
    assert_eq!(
        hw.calls,
        [
            ActuatorCall::AllOff,
            ActuatorCall::SetAngle {
                id: ActuatorId::Door,
                degrees: 90
            },
        ]
    );
    assert!(sink.events.contains(&AppEvent::Started { devices_present: 3 }));
    assert_eq!(app.actuator_state().output(ActuatorId::Door), Output::Angle(90));
}

// ── Climate rules ─────────────────────────────────────────────

#[test]
fn hot_greenhouse_turns_fan_on() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    hw.set_temperature(30.0);

    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);

    assert_eq!(hw.relay(ActuatorId::Fan), Some(true));
    // Heater is already off: the Off command is a physical no-op.
    assert_eq!(hw.writes_to(ActuatorId::Heater), 0);
    assert!(sink.events.contains(&AppEvent::ActuatorChanged {
        actuator: ActuatorId::Fan,
        output: Output::On,
    }));
}

#[test]
fn dead_band_writes_nothing() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    for _ in 0..10 {
        cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    }
    assert!(hw.calls.is_empty(), "unexpected writes: {:?}", hw.calls);
}

#[test]
fn fan_stays_on_inside_band_then_heater_takes_over() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();

    hw.set_temperature(27.0);
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    hw.set_temperature(25.0);
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Fan), Some(true), "dead band preserves state");

    hw.set_temperature(22.0);
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Fan), Some(false));
    assert_eq!(hw.relay(ActuatorId::Heater), Some(true));
}

#[test]
fn humidity_keeps_fan_on_while_heating() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    hw.set_temperature(20.0);
    hw.set_humidity(80.0);

    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Fan), Some(true));
    assert_eq!(hw.relay(ActuatorId::Heater), Some(true));
}

#[test]
fn lighting_follows_the_hour() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();

    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.writes_to(ActuatorId::Light), 0, "no hour, no command");

    clock.set_hour(Some(9));
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Light), Some(true));

    clock.set_hour(Some(20));
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Light), Some(false));
}

#[test]
fn automation_disabled_leaves_outputs_alone() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints {
        automation_enabled: false,
        ..Setpoints::default()
    };
    hw.set_temperature(35.0);
    hw.soil_moisture = Ok(2700);
    clock.set_hour(Some(12));

    let report = cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert!(report.commands.is_some_and(|c| c.is_empty()));
    assert!(hw.calls.is_empty());
}

// ── Watering ──────────────────────────────────────────────────

#[test]
fn dry_soil_waters_once_per_cooldown() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    hw.soil_moisture = Ok(2160); // 40 %

    // t = 2 s: pump on for 5 s.
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Pump), Some(true));
    assert_eq!(
        app.actuator_state().get(ActuatorId::Pump).run_until,
        Some(greenhouse::time::Timestamp::from_millis(7_000))
    );

    // t = 4 s, 6 s: still running.
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Pump), Some(true));

    // t = 8 s: auto-stop.
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Pump), Some(false));

    // Soil still dry, but the cooldown holds until t > 302 s.
    while clock.now_ms() < 302_000 {
        cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    }
    assert_eq!(hw.writes_to(ActuatorId::Pump), 2);

    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Pump), Some(true));
    assert_eq!(hw.writes_to(ActuatorId::Pump), 3);
}

#[test]
fn missing_soil_reading_never_waters() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    hw.soil_moisture = Err(SensorError::Transport);

    for _ in 0..20 {
        cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    }
    assert_eq!(hw.writes_to(ActuatorId::Pump), 0);
}

#[test]
fn pump_stops_even_without_setpoints() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    hw.soil_moisture = Ok(2160);
    cycle(&mut app, &mut hw, &clock, &Setpoints::default(), &mut sink);
    assert_eq!(hw.relay(ActuatorId::Pump), Some(true));

    clock.advance(6_000);
    let report = app.tick(&mut hw, &clock, &UnavailableSetpoints, &mut sink);
    assert!(report.commands.is_none());
    assert!(sink.events.contains(&AppEvent::SetpointsUnavailable));
    assert_eq!(hw.relay(ActuatorId::Pump), Some(false));
}

// ── Actuator failures ─────────────────────────────────────────

#[test]
fn failed_write_is_retried_next_cycle() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    hw.set_temperature(30.0);
    hw.broken = Some(ActuatorId::Fan);

    let report = cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(report.applied.failed.len(), 1);
    assert!(sink.events.contains(&AppEvent::ActuatorFault {
        actuator: ActuatorId::Fan,
        error: ActuatorError::GpioWriteFailed,
    }));
    assert_eq!(app.actuator_state().output(ActuatorId::Fan), Output::Off);

    hw.broken = None;
    let report = cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert!(report.applied.is_ok());
    assert_eq!(hw.relay(ActuatorId::Fan), Some(true));
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn manual_door_angle_is_clamped() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let cmd = ActuatorCommand::new(ActuatorId::Door, Action::SetAngle(200));
    app.handle_command(AppCommand::Manual(cmd), &mut hw, &clock, &mut sink)
        .unwrap();
    assert_eq!(
        hw.calls,
        [ActuatorCall::SetAngle {
            id: ActuatorId::Door,
            degrees: 180
        }]
    );
}

#[test]
fn manual_command_for_wrong_output_is_rejected() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let cmd = ActuatorCommand::new(ActuatorId::Fan, Action::SetAngle(45));
    assert_eq!(
        app.handle_command(AppCommand::Manual(cmd), &mut hw, &clock, &mut sink),
        Err(Error::Actuator(ActuatorError::Unsupported))
    );
    assert!(hw.calls.is_empty());
}

#[test]
fn manual_timed_run_expires() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    let cmd = ActuatorCommand::new(ActuatorId::Pump, Action::RunFor(3_000));
    app.handle_command(AppCommand::Manual(cmd), &mut hw, &clock, &mut sink)
        .unwrap();
    assert_eq!(hw.relay(ActuatorId::Pump), Some(true));

    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Pump), Some(true));
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Pump), Some(false));
}

#[test]
fn stop_all_command_switches_relays_off() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    hw.set_temperature(30.0);
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    sink.events.clear();

    app.handle_command(AppCommand::StopAll, &mut hw, &clock, &mut sink)
        .unwrap();
    assert_eq!(hw.calls.last(), Some(&ActuatorCall::AllOff));
    assert_eq!(
        sink.events,
        [AppEvent::ActuatorChanged {
            actuator: ActuatorId::Fan,
            output: Output::Off
        }]
    );
}

#[test]
fn relay_left_on_by_failed_stop_all_is_switched_off_later() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    hw.set_temperature(30.0);
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert_eq!(hw.relay(ActuatorId::Fan), Some(true));

    hw.broken = Some(ActuatorId::Fan);
    assert_eq!(
        app.handle_command(AppCommand::StopAll, &mut hw, &clock, &mut sink),
        Err(Error::Actuator(ActuatorError::GpioWriteFailed))
    );
    assert_eq!(app.actuator_state().output(ActuatorId::Fan), Output::On);

    hw.broken = None;
    hw.calls.clear();
    hw.set_temperature(22.0);
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert!(hw.calls.contains(&ActuatorCall::SetDigital {
        id: ActuatorId::Fan,
        on: false
    }));
    assert_eq!(app.actuator_state().output(ActuatorId::Fan), Output::Off);
}

#[test]
fn soil_calibration_updates_mapping() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    hw.soil_moisture = Ok(3000);
    app.handle_command(
        AppCommand::CalibrateSoil(CalibrationPoint::Air),
        &mut hw,
        &clock,
        &mut sink,
    )
    .unwrap();
    assert_eq!(app.sensors().soil_calibration().air_raw(), 3000);

    // 3000 is now the dry end: 0 %.
    cycle(&mut app, &mut hw, &clock, &Setpoints::default(), &mut sink);
    assert_eq!(app.last_snapshot().soil_moisture_pct, Some(0.0));
}

// ── Telemetry and shutdown ────────────────────────────────────

#[test]
fn telemetry_follows_its_interval() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    // Ticks at 2 s … 120 s: telemetry at 2 s and 62 s.
    for _ in 0..60 {
        cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    }
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 2);

    let t = app.build_telemetry();
    assert_eq!(t.tick, 60);
    assert_eq!(t.sensors.air_temperature_c, Some(25.0));
    assert_eq!(t.door, Output::Angle(90));
    assert!(t.system_healthy);
}

#[test]
fn shutdown_ends_with_all_off() {
    let (mut app, mut hw, clock, mut sink) = make_loop();
    let sp = Setpoints::default();
    hw.set_temperature(30.0);
    hw.soil_moisture = Ok(2160);
    cycle(&mut app, &mut hw, &clock, &sp, &mut sink);
    assert!(app.actuator_state().is_on(ActuatorId::Pump));

    app.shutdown(&mut hw, &clock, &mut sink).unwrap();
    assert_eq!(hw.calls.last(), Some(&ActuatorCall::AllOff));
    assert_eq!(sink.events.last(), Some(&AppEvent::Stopped));
    for id in [ActuatorId::Pump, ActuatorId::Fan, ActuatorId::Heater, ActuatorId::Light] {
        assert!(!app.actuator_state().is_on(id), "{id} still on");
    }
}
