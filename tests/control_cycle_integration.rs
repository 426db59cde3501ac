//! Integration tests: full control cycles through mock ports.
//!
//! Each scenario wires `AppService` to mock hardware, clock, remote and
//! storage, then steps whole cycles and asserts on externally observable
//! behaviour (position, relay state, emitted events, remote writes).

use std::cell::{Cell, RefCell};

use hangline::app::events::{AlertLevel, AppEvent, DeviceRegistration, DeviceStatus, SensorReport};
use hangline::app::ports::{
    ActuatorPort, Clock, ConfigError, ConfigPort, EventSink, RemotePort, SensorPort,
};
use hangline::app::service::AppService;
use hangline::config::SystemConfig;
use hangline::control::context::{Position, SensorSnapshot};
use hangline::error::RemoteError;
use hangline::sync::record::{RemoteRecord, RequestedState};

// ── Mock implementations ──────────────────────────────────────

/// How the mock hanger responds to the motor.
#[derive(Clone, Copy, PartialEq)]
enum Motion {
    /// A healthy mechanism: engaging the motor carries the hanger into the
    /// opposite band (20 cm retracted / 50 cm extended, default config).
    Healthy,
    /// A jammed mechanism: the distance reading never changes.
    Stuck,
}

struct MockHw {
    distance: f32,
    motion: Motion,
    temperature_c: f32,
    humidity_pct: f32,
    rain: bool,
    presence: bool,
    motor_on: bool,
    engagements: u32,
}

impl MockHw {
    fn new(distance: f32) -> Self {
        Self {
            distance,
            motion: Motion::Healthy,
            temperature_c: 30.0,
            humidity_pct: 50.0,
            rain: false,
            presence: false,
            motor_on: false,
            engagements: 0,
        }
    }
}

impl SensorPort for MockHw {
    fn read_all(&mut self) -> SensorSnapshot {
        SensorSnapshot {
            temperature_c: self.temperature_c,
            humidity_pct: self.humidity_pct,
            rain_detected: self.rain,
            presence_detected: self.presence,
            distance_cm: self.distance,
        }
    }

    fn read_distance(&mut self) -> f32 {
        self.distance
    }
}

impl ActuatorPort for MockHw {
    fn motor_on(&mut self) {
        self.motor_on = true;
        self.engagements += 1;
        if self.motion == Motion::Healthy {
            self.distance = if self.distance < 35.0 { 50.0 } else { 20.0 };
        }
    }

    fn motor_off(&mut self) {
        self.motor_on = false;
    }

    fn is_motor_on(&self) -> bool {
        self.motor_on
    }
}

struct MockClock {
    now: u64,
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now
    }
    fn sleep_ms(&mut self, ms: u32) {
        self.now += u64::from(ms);
    }
}

struct MockRemote {
    connected: bool,
    record: RemoteRecord,
    clears: u32,
    sensor_docs: Vec<SensorReport>,
    status_docs: Vec<DeviceStatus>,
}

impl MockRemote {
    fn new() -> Self {
        Self {
            connected: true,
            record: RemoteRecord::default(),
            clears: 0,
            sensor_docs: Vec::new(),
            status_docs: Vec::new(),
        }
    }
}

impl RemotePort for MockRemote {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn fetch_record(&mut self) -> Result<RemoteRecord, RemoteError> {
        Ok(self.record.clone())
    }

    fn clear_requested_state(&mut self) -> Result<(), RemoteError> {
        self.record.requested_state = None;
        self.clears += 1;
        Ok(())
    }

    fn publish_status(&mut self, status: &DeviceStatus) -> Result<(), RemoteError> {
        self.status_docs.push(status.clone());
        Ok(())
    }

    fn publish_sensors(&mut self, report: &SensorReport) -> Result<(), RemoteError> {
        self.sensor_docs.push(*report);
        Ok(())
    }

    fn register_device(&mut self, _reg: &DeviceRegistration<'_>) -> Result<(), RemoteError> {
        Ok(())
    }
}

struct MockStore {
    saves: Cell<u32>,
    last: RefCell<Option<SystemConfig>>,
}

impl MockStore {
    fn new() -> Self {
        Self {
            saves: Cell::new(0),
            last: RefCell::new(None),
        }
    }
}

impl ConfigPort for MockStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        Ok(SystemConfig::default())
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        self.saves.set(self.saves.get() + 1);
        *self.last.borrow_mut() = Some(config.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Vec<AppEvent>,
}

impl CollectingSink {
    fn alerts(&self, level: AlertLevel) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Alert { level: l, .. } if *l == level))
            .count()
    }
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

struct Rig {
    app: AppService,
    hw: MockHw,
    clock: MockClock,
    sink: CollectingSink,
    remote: MockRemote,
    store: MockStore,
}

impl Rig {
    fn new(config: SystemConfig, distance: f32) -> Self {
        let mut rig = Self {
            app: AppService::new(config),
            hw: MockHw::new(distance),
            clock: MockClock { now: 0 },
            sink: CollectingSink::default(),
            remote: MockRemote::new(),
            store: MockStore::new(),
        };
        rig.app.start(&mut rig.hw, &rig.clock, &mut rig.sink);
        rig
    }

    /// Step one cycle, then advance the clock by the configured interval.
    fn cycle(&mut self) {
        self.app.cycle(
            &mut self.hw,
            &mut self.clock,
            &mut self.sink,
            &mut self.remote,
            &mut self.store,
        );
        assert!(
            self.app.context().modes.invariant_holds(),
            "manual-in-progress must imply auto disabled, after every cycle"
        );
        self.clock.now += u64::from(self.app.cycle_interval_ms());
    }
}

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn remote_retract_round_trip() {
    let mut rig = Rig::new(SystemConfig::default(), 50.0);
    assert_eq!(rig.app.position(), Position::Extended);

    rig.remote.record.requested_state = Some(RequestedState::Retract);

    // Cycle 1: command accepted, transit runs synchronously.
    rig.cycle();
    assert_eq!(rig.app.position(), Position::Retracted);
    assert!(rig.app.context().modes.manual_command_in_progress());
    assert!(!rig.app.context().modes.auto_enabled());
    assert!(!rig.hw.motor_on);

    // Cycle 2: completion detected, backend reset written.
    rig.cycle();
    assert!(!rig.app.context().modes.manual_command_in_progress());

    rig.cycle();
    assert_eq!(rig.remote.clears, 1);
    assert!(rig.remote.record.requested_state.is_none());

    // The cleared record must not be re-accepted.
    rig.cycle();
    assert!(!rig.app.context().modes.manual_command_in_progress());
    assert_eq!(rig.hw.engagements, 1, "exactly one transit for one command");
}

#[test]
fn completion_and_clear_survive_a_connectivity_gap() {
    let mut rig = Rig::new(SystemConfig::default(), 50.0);
    rig.remote.record.requested_state = Some(RequestedState::Retract);

    rig.cycle();
    assert!(rig.app.context().modes.manual_command_in_progress());

    // Backend goes away before completion is observed.
    rig.remote.connected = false;
    rig.cycle();
    assert!(
        !rig.app.context().modes.manual_command_in_progress(),
        "completion detection must not depend on connectivity"
    );
    assert_eq!(rig.remote.clears, 0);

    // Still offline: the pending clear is retained, not dropped.
    rig.cycle();
    assert_eq!(rig.remote.clears, 0);

    rig.remote.connected = true;
    rig.cycle();
    assert_eq!(rig.remote.clears, 1);
}

#[test]
fn occupancy_privacy_delay_fires_once() {
    let mut config = SystemConfig::default();
    config.enable_occupancy_control = true;
    config.retract_on_present = true;
    config.occupancy_action_delay_ms = 5_000;
    let mut rig = Rig::new(config, 50.0);
    assert_eq!(rig.app.position(), Position::Extended);

    // Presence appears at t = 0: the flip is armed, nothing moves yet.
    rig.hw.presence = true;
    rig.cycle(); // t = 0
    rig.cycle(); // t = 2 s
    rig.cycle(); // t = 4 s
    assert_eq!(rig.app.position(), Position::Extended);
    assert_eq!(rig.hw.engagements, 0);

    // t = 6 s: the armed fire is due, privacy retract happens exactly once.
    rig.cycle();
    assert_eq!(rig.app.position(), Position::Retracted);
    assert_eq!(rig.hw.engagements, 1);

    // While present, auto-extend must not fight the privacy policy.
    rig.cycle();
    rig.cycle();
    assert_eq!(rig.app.position(), Position::Retracted);
    assert_eq!(rig.hw.engagements, 1);
}

#[test]
fn rain_emergency_overrides_manual_extend() {
    let mut rig = Rig::new(SystemConfig::default(), 20.0);
    assert_eq!(rig.app.position(), Position::Retracted);

    // A manual extend arrives while it is already raining.
    rig.remote.record.requested_state = Some(RequestedState::Extend);
    rig.hw.rain = true;

    rig.cycle();
    // The manual transit reached Extended, then the emergency rule took it
    // straight back down in the same cycle, over the manual hold.
    assert_eq!(rig.app.position(), Position::Retracted);
    assert_eq!(rig.sink.alerts(AlertLevel::Emergency), 1);
    assert_eq!(rig.hw.engagements, 2);
    // The manual command never reached its target, so the flag stays.
    assert!(rig.app.context().modes.manual_command_in_progress());

    // Subsequent cycles: the still-pending remote command conflicts with
    // the in-flight one and is ignored; the hanger stays down.
    rig.cycle();
    rig.cycle();
    assert_eq!(rig.app.position(), Position::Retracted);
    assert_eq!(rig.hw.engagements, 2);
}

#[test]
fn timeout_enters_error_and_recovers_after_thirty_seconds() {
    let mut rig = Rig::new(SystemConfig::default(), 18.0);
    assert_eq!(rig.app.position(), Position::Retracted);
    rig.hw.motion = Motion::Stuck;

    // Good conditions trigger an auto-extend, but the hanger is jammed:
    // the transit burns its full 30 s budget and escalates.
    rig.cycle();
    assert_eq!(rig.app.position(), Position::Error);
    assert!(!rig.hw.motor_on, "motor must be off in the error state");
    assert_eq!(rig.sink.alerts(AlertLevel::Error), 1);

    // Conditions stay good, but the error window suppresses arbitration
    // and no duplicate alert is emitted.
    rig.cycle();
    rig.cycle();
    assert_eq!(rig.app.position(), Position::Error);
    assert_eq!(rig.sink.alerts(AlertLevel::Error), 1);
    assert_eq!(rig.hw.engagements, 1);

    // Make conditions unfavourable so recovery does not immediately rerun
    // the jammed transit, then run well past the 30 s window.
    rig.hw.temperature_c = 10.0;
    for _ in 0..20 {
        rig.cycle();
    }
    assert_eq!(
        rig.app.position(),
        Position::Retracted,
        "18 cm reading sits in the retracted band at recovery"
    );
    assert_eq!(rig.sink.alerts(AlertLevel::Error), 1);
    assert_eq!(rig.hw.engagements, 1);
}

#[test]
fn auto_extend_then_auto_retract_follow_conditions() {
    let mut rig = Rig::new(SystemConfig::default(), 20.0);

    // Favourable conditions: extend.
    rig.cycle();
    assert_eq!(rig.app.position(), Position::Extended);
    assert!(rig.sink.alerts(AlertLevel::Info) >= 1);

    // Humidity climbs out of the window: retract.
    rig.hw.humidity_pct = 85.0;
    rig.cycle();
    assert_eq!(rig.app.position(), Position::Retracted);
    assert_eq!(rig.sink.alerts(AlertLevel::Warning), 1);
}

#[test]
fn telemetry_published_when_connected_and_idle() {
    let mut rig = Rig::new(SystemConfig::default(), 20.0);
    rig.hw.temperature_c = 10.0; // nothing to do

    rig.cycle();
    rig.cycle();
    assert_eq!(rig.remote.sensor_docs.len(), 2);
    assert_eq!(rig.remote.status_docs.len(), 2);
    assert_eq!(rig.remote.status_docs[0].state, "Retracted");
    // Each telemetry document is stamped so readers can spot a stall.
    assert!(rig.remote.sensor_docs[1].uptime_ms > rig.remote.sensor_docs[0].uptime_ms);
    assert_eq!(rig.remote.sensor_docs[0].snapshot.temperature_c, 10.0);

    rig.remote.connected = false;
    rig.cycle();
    assert_eq!(rig.remote.sensor_docs.len(), 2, "no publication while offline");
    assert_eq!(rig.remote.status_docs.len(), 2);
}

#[test]
fn status_still_flows_while_a_manual_command_is_pending() {
    let mut rig = Rig::new(SystemConfig::default(), 20.0);

    // A manual extend during rain never reaches its target, so the
    // manual-in-progress flag stays set across cycles.
    rig.remote.record.requested_state = Some(RequestedState::Extend);
    rig.hw.rain = true;
    rig.cycle();
    assert!(rig.app.context().modes.manual_command_in_progress());
    let sensors_before = rig.remote.sensor_docs.len();
    let status_before = rig.remote.status_docs.len();

    rig.cycle();
    rig.cycle();
    assert_eq!(
        rig.remote.sensor_docs.len(),
        sensors_before,
        "telemetry is held back while the manual command is pending"
    );
    assert_eq!(rig.remote.status_docs.len(), status_before + 2);
    assert!(rig.remote.status_docs.last().unwrap().manual_command_in_progress);
}

#[test]
fn remote_config_change_is_persisted_after_the_debounce() {
    let mut rig = Rig::new(SystemConfig::default(), 20.0);
    rig.hw.temperature_c = 10.0;
    rig.remote.record.motor_timeout_ms = Some(20_000);

    rig.cycle();
    assert_eq!(rig.app.context().config.motor_timeout_ms, 20_000);
    assert_eq!(rig.store.saves.get(), 0, "save is debounced, not immediate");

    // Default cycle interval is 2 s; the 5 s debounce elapses on cycle 4.
    rig.cycle();
    rig.cycle();
    rig.cycle();
    assert_eq!(rig.store.saves.get(), 1);
    assert_eq!(
        rig.store.last.borrow().as_ref().unwrap().motor_timeout_ms,
        20_000
    );
}
