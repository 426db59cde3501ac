//! Remote command and configuration reconciliation.
//!
//! Once per cycle (when the backend is reachable) the decoded
//! [`RemoteRecord`] is reconciled against local state:
//!
//! - tunables are applied field-by-field, each behind its own safe range
//!   and a change epsilon; anything absent, mistyped or out of range is
//!   ignored and the local value kept,
//! - a requested manual transit is accepted only when no manual command is
//!   already in flight, and drives the position driver synchronously.
//!
//! Manual-command completion is detected locally every cycle, with or
//! without connectivity; the write-back that resets `requestedState` on the
//! backend is deferred behind [`RemoteCommandSync::needs_remote_clear`]
//! until a connected cycle manages it.

pub mod record;

use core::ops::RangeInclusive;

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, Clock, EventSink, RemotePort, SensorPort};
use crate::control::context::ControlContext;
use crate::control::position::{PositionDriver, TransitOutcome};

use record::RemoteRecord;

/// What one reconcile pass did.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOutcome {
    /// At least one config field changed; the caller should persist.
    pub config_changed: bool,
    /// A manual transit ran this cycle.
    pub transit: Option<TransitOutcome>,
}

/// Reconciles the cloud record with local state and tracks the deferred
/// `requestedState` write-back.
#[derive(Debug, Default)]
pub struct RemoteCommandSync {
    needs_remote_clear: bool,
}

impl RemoteCommandSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// A completed manual command is still waiting for its backend reset.
    pub fn needs_remote_clear(&self) -> bool {
        self.needs_remote_clear
    }

    /// Apply one fetched record.  Config fields first, then at most one
    /// manual command.
    pub fn reconcile<H, C, E>(
        &mut self,
        ctx: &mut ControlContext,
        record: &RemoteRecord,
        driver: &PositionDriver,
        hw: &mut H,
        clock: &mut C,
        sink: &mut E,
    ) -> ReconcileOutcome
    where
        H: SensorPort + ActuatorPort,
        C: Clock,
        E: EventSink,
    {
        let mut outcome = ReconcileOutcome {
            config_changed: self.apply_config(ctx, record),
            transit: None,
        };

        if let Some(requested) = record.requested_state {
            if ctx.modes.manual_command_in_progress() {
                // Conflicting command: the in-flight one wins.
                warn!(
                    "remote: ignoring {:?} request, manual command already in progress",
                    requested
                );
            } else {
                let target = requested.target();
                info!("remote: accepted manual {:?} command", target);
                ctx.modes.begin_manual(target);
                ctx.config.auto_enabled = false;
                outcome.config_changed = true;
                sink.emit(&AppEvent::ManualCommandAccepted { target });
                outcome.transit = Some(driver.move_to(target, ctx, hw, clock));
            }
        }

        outcome
    }

    /// Detect manual-command completion by position, independent of
    /// connectivity.  Clears the in-progress flag and arms the deferred
    /// backend reset.
    pub fn check_completion<E>(&mut self, ctx: &mut ControlContext, sink: &mut E)
    where
        E: EventSink,
    {
        if !ctx.modes.manual_command_in_progress() {
            return;
        }
        let Some(target) = ctx.modes.pending_target() else {
            return;
        };
        if ctx.position == target.position() {
            info!("remote: manual {:?} command completed", target);
            ctx.modes.clear_manual();
            self.needs_remote_clear = true;
            sink.emit(&AppEvent::ManualCommandCompleted { target });
        }
    }

    /// Try the deferred `requestedState = "none"` write-back.  Kept armed
    /// across failures and connectivity gaps; never dropped.
    pub fn flush_remote_clear<R>(&mut self, remote: &mut R)
    where
        R: RemotePort,
    {
        if !self.needs_remote_clear || !remote.is_connected() {
            return;
        }
        match remote.clear_requested_state() {
            Ok(()) => {
                self.needs_remote_clear = false;
                info!("remote: requestedState cleared on backend");
            }
            Err(err) => warn!("remote: requestedState clear failed: {}, will retry", err),
        }
    }

    /// Field-by-field config application.  Returns whether anything changed.
    fn apply_config(&self, ctx: &mut ControlContext, record: &RemoteRecord) -> bool {
        let config = &mut ctx.config;
        let mut changed = false;

        changed |= apply_u32(
            &mut config.motor_timeout_ms,
            record.motor_timeout_ms,
            1..=300_000,
            "motorTimeout",
        );
        changed |= apply_u32(
            &mut config.sensor_read_interval_ms,
            record.sensor_read_interval_ms,
            1_000..=60_000,
            "sensorReadInterval",
        );

        changed |= apply_f32(
            &mut config.distance_extended_cm,
            record.distance_extended_cm,
            10.0..=200.0,
            DISTANCE_EPSILON_CM,
            "distanceExtended",
        );
        changed |= apply_f32(
            &mut config.distance_retracted_cm,
            record.distance_retracted_cm,
            5.0..=100.0,
            DISTANCE_EPSILON_CM,
            "distanceRetracted",
        );
        changed |= apply_f32(
            &mut config.distance_tolerance_cm,
            record.distance_tolerance_cm,
            1.0..=20.0,
            DISTANCE_EPSILON_CM,
            "distanceTolerance",
        );

        changed |= apply_bool(
            &mut config.use_custom_thresholds,
            record.use_custom_thresholds,
            "useCustomThresholds",
        );

        // Threshold fields are applied as a pair-validated candidate: each
        // value must pass its own range, and the resulting set must still
        // satisfy min < max, or the whole update is dropped and the local
        // thresholds kept.
        let mut thresholds = config.thresholds;
        let mut thresholds_changed = false;
        thresholds_changed |= apply_f32(
            &mut thresholds.temp_min_c,
            record.temp_min_c,
            0.0..=50.0,
            THRESHOLD_EPSILON,
            "tempMinThreshold",
        );
        thresholds_changed |= apply_f32(
            &mut thresholds.temp_max_c,
            record.temp_max_c,
            0.0..=60.0,
            THRESHOLD_EPSILON,
            "tempMaxThreshold",
        );
        thresholds_changed |= apply_f32(
            &mut thresholds.humidity_min_pct,
            record.humidity_min_pct,
            0.0..=100.0,
            THRESHOLD_EPSILON,
            "humidityMinThreshold",
        );
        thresholds_changed |= apply_f32(
            &mut thresholds.humidity_max_pct,
            record.humidity_max_pct,
            0.0..=100.0,
            THRESHOLD_EPSILON,
            "humidityMaxThreshold",
        );
        if thresholds_changed {
            if thresholds.is_valid() {
                config.thresholds = thresholds;
                changed = true;
            } else {
                warn!("remote: threshold update rejected, min >= max after applying");
            }
        }

        changed |= apply_bool(
            &mut config.enable_occupancy_control,
            record.enable_occupancy_control,
            "enableOccupancyControl",
        );
        changed |= apply_bool(
            &mut config.retract_on_present,
            record.retract_on_present,
            "retractOnPresent",
        );
        changed |= apply_u32(
            &mut config.occupancy_action_delay_ms,
            record.occupancy_action_delay_ms,
            0..=60_000,
            "occupancyActionDelay",
        );

        changed |= apply_name(&mut config.device_name, record.device_name.as_deref(), "deviceName");
        changed |= apply_name(
            &mut config.device_location,
            record.device_location.as_deref(),
            "deviceLocation",
        );

        if let Some(auto) = record.auto_enabled {
            if auto != config.auto_enabled {
                config.auto_enabled = auto;
                changed = true;
            }
            // The mode mutator keeps auto off while a manual command runs.
            ctx.modes.set_auto_enabled(auto);
        }

        changed
    }
}

const DISTANCE_EPSILON_CM: f32 = 0.5;
const THRESHOLD_EPSILON: f32 = 0.1;

fn apply_f32(
    field: &mut f32,
    incoming: Option<f32>,
    range: RangeInclusive<f32>,
    epsilon: f32,
    name: &str,
) -> bool {
    let Some(value) = incoming else { return false };
    if !value.is_finite() || !range.contains(&value) {
        warn!("remote: {} = {} out of range, ignored", name, value);
        return false;
    }
    if (value - *field).abs() <= epsilon {
        return false;
    }
    info!("remote: {} {} -> {}", name, *field, value);
    *field = value;
    true
}

fn apply_u32(field: &mut u32, incoming: Option<u32>, range: RangeInclusive<u32>, name: &str) -> bool {
    let Some(value) = incoming else { return false };
    if !range.contains(&value) {
        warn!("remote: {} = {} out of range, ignored", name, value);
        return false;
    }
    if value == *field {
        return false;
    }
    info!("remote: {} {} -> {}", name, *field, value);
    *field = value;
    true
}

fn apply_bool(field: &mut bool, incoming: Option<bool>, name: &str) -> bool {
    let Some(value) = incoming else { return false };
    if value == *field {
        return false;
    }
    info!("remote: {} {} -> {}", name, *field, value);
    *field = value;
    true
}

fn apply_name(field: &mut heapless::String<32>, incoming: Option<&str>, name: &str) -> bool {
    let Some(value) = incoming else { return false };
    if value.is_empty() || value.len() >= 32 {
        warn!("remote: {} length {} rejected", name, value.len());
        return false;
    }
    if field.as_str() == value {
        return false;
    }
    let Ok(bounded) = heapless::String::try_from(value) else {
        return false;
    };
    info!("remote: {} -> {}", name, value);
    *field = bounded;
    true
}

#[cfg(test)]
mod tests {
    use super::record::RequestedState;
    use super::*;
    use crate::config::SystemConfig;
    use crate::control::context::{Position, SensorSnapshot, Target};

    struct FakeHw {
        distance: f32,
        motor_on: bool,
    }

    impl SensorPort for FakeHw {
        fn read_all(&mut self) -> SensorSnapshot {
            SensorSnapshot {
                distance_cm: self.distance,
                ..SensorSnapshot::default()
            }
        }
        fn read_distance(&mut self) -> f32 {
            self.distance
        }
    }

    impl ActuatorPort for FakeHw {
        fn motor_on(&mut self) {
            self.motor_on = true;
            // Teleport to wherever the transit wants; transit mechanics are
            // covered by the position driver tests.
            self.distance = if self.distance < 35.0 { 50.0 } else { 20.0 };
        }
        fn motor_off(&mut self) {
            self.motor_on = false;
        }
        fn is_motor_on(&self) -> bool {
            self.motor_on
        }
    }

    struct FakeClock {
        now: u64,
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.now
        }
        fn sleep_ms(&mut self, ms: u32) {
            self.now += u64::from(ms);
        }
    }

    #[derive(Default)]
    struct NullSink {
        events: Vec<AppEvent>,
    }

    impl EventSink for NullSink {
        fn emit(&mut self, event: &AppEvent) {
            self.events.push(*event);
        }
    }

    fn make_ctx() -> ControlContext {
        ControlContext::new(SystemConfig::default())
    }

    #[test]
    fn out_of_range_fields_are_ignored() {
        let mut ctx = make_ctx();
        let mut record = RemoteRecord::default();
        record.motor_timeout_ms = Some(0);
        record.distance_extended_cm = Some(500.0);
        record.temp_min_c = Some(-10.0);
        record.device_name = Some("x".repeat(40));

        let changed = RemoteCommandSync::new().apply_config(&mut ctx, &record);
        assert!(!changed);
        assert_eq!(ctx.config.motor_timeout_ms, 30_000);
        assert_eq!(ctx.config.distance_extended_cm, 50.0);
    }

    #[test]
    fn epsilon_suppresses_tiny_float_changes() {
        let mut ctx = make_ctx();
        let mut record = RemoteRecord::default();
        record.distance_extended_cm = Some(50.4); // within 0.5 of 50.0
        record.temp_min_c = Some(25.05); // within 0.1 of 25.0
        assert!(!RemoteCommandSync::new().apply_config(&mut ctx, &record));

        record.distance_extended_cm = Some(51.0);
        assert!(RemoteCommandSync::new().apply_config(&mut ctx, &record));
        assert_eq!(ctx.config.distance_extended_cm, 51.0);
    }

    #[test]
    fn crossing_threshold_update_is_rejected_whole() {
        let mut ctx = make_ctx();
        // 45.0 passes its own 0–50 range but crosses the default max (40.0).
        let mut record = RemoteRecord::default();
        record.temp_min_c = Some(45.0);

        let changed = RemoteCommandSync::new().apply_config(&mut ctx, &record);
        assert!(!changed, "a min >= max pair must not raise the persist flag");
        assert_eq!(ctx.config.thresholds.temp_min_c, 25.0);
        assert!(ctx.config.thresholds.is_valid());
    }

    #[test]
    fn consistent_threshold_pair_applies_together() {
        let mut ctx = make_ctx();
        // Raising min past the old max is fine when max moves with it.
        let mut record = RemoteRecord::default();
        record.temp_min_c = Some(42.0);
        record.temp_max_c = Some(55.0);

        let changed = RemoteCommandSync::new().apply_config(&mut ctx, &record);
        assert!(changed);
        assert_eq!(ctx.config.thresholds.temp_min_c, 42.0);
        assert_eq!(ctx.config.thresholds.temp_max_c, 55.0);
        assert!(ctx.config.thresholds.is_valid());
    }

    #[test]
    fn nan_is_rejected() {
        let mut ctx = make_ctx();
        let mut record = RemoteRecord::default();
        record.distance_tolerance_cm = Some(f32::NAN);
        assert!(!RemoteCommandSync::new().apply_config(&mut ctx, &record));
        assert_eq!(ctx.config.distance_tolerance_cm, 5.0);
    }

    #[test]
    fn valid_fields_apply_and_raise_the_persist_flag() {
        let mut ctx = make_ctx();
        let mut record = RemoteRecord::default();
        record.motor_timeout_ms = Some(20_000);
        record.enable_occupancy_control = Some(true);
        record.device_name = Some("Porch_Hanger".to_string());

        let mut sync = RemoteCommandSync::new();
        let mut hw = FakeHw {
            distance: 20.0,
            motor_on: false,
        };
        let mut clock = FakeClock { now: 0 };
        let mut sink = NullSink::default();
        let driver = PositionDriver::new();
        let outcome = sync.reconcile(&mut ctx, &record, &driver, &mut hw, &mut clock, &mut sink);

        assert!(outcome.config_changed);
        assert!(outcome.transit.is_none());
        assert_eq!(ctx.config.motor_timeout_ms, 20_000);
        assert!(ctx.config.enable_occupancy_control);
        assert_eq!(ctx.config.device_name.as_str(), "Porch_Hanger");
    }

    #[test]
    fn command_accepted_and_driven_when_idle() {
        let mut ctx = make_ctx();
        ctx.position = Position::Retracted;
        let mut record = RemoteRecord::default();
        record.requested_state = Some(RequestedState::Extend);

        let mut sync = RemoteCommandSync::new();
        let mut hw = FakeHw {
            distance: 20.0,
            motor_on: false,
        };
        let mut clock = FakeClock { now: 0 };
        let mut sink = NullSink::default();
        let driver = PositionDriver::new();
        let outcome = sync.reconcile(&mut ctx, &record, &driver, &mut hw, &mut clock, &mut sink);

        assert_eq!(outcome.transit, Some(TransitOutcome::Reached));
        assert_eq!(ctx.position, Position::Extended);
        assert!(ctx.modes.manual_command_in_progress());
        assert!(!ctx.modes.auto_enabled());
        assert!(ctx.modes.invariant_holds());
        assert!(sink
            .events
            .contains(&AppEvent::ManualCommandAccepted { target: Target::Extend }));

        // Next cycle: completion detected locally, backend clear armed.
        sync.check_completion(&mut ctx, &mut sink);
        assert!(!ctx.modes.manual_command_in_progress());
        assert!(sync.needs_remote_clear());
        assert!(sink
            .events
            .contains(&AppEvent::ManualCommandCompleted { target: Target::Extend }));
    }

    #[test]
    fn conflicting_command_is_ignored() {
        let mut ctx = make_ctx();
        ctx.modes.begin_manual(Target::Extend);
        let mut record = RemoteRecord::default();
        record.requested_state = Some(RequestedState::Retract);

        let mut sync = RemoteCommandSync::new();
        let mut hw = FakeHw {
            distance: 120.0,
            motor_on: false,
        };
        let mut clock = FakeClock { now: 0 };
        let mut sink = NullSink::default();
        let driver = PositionDriver::new();
        let outcome = sync.reconcile(&mut ctx, &record, &driver, &mut hw, &mut clock, &mut sink);

        assert!(outcome.transit.is_none());
        assert_eq!(ctx.modes.pending_target(), Some(Target::Extend), "in-flight command wins");
    }

    #[test]
    fn completion_requires_matching_position() {
        let mut ctx = make_ctx();
        ctx.position = Position::Retracted;
        ctx.modes.begin_manual(Target::Extend);

        let mut sync = RemoteCommandSync::new();
        let mut sink = NullSink::default();
        sync.check_completion(&mut ctx, &mut sink);
        assert!(ctx.modes.manual_command_in_progress(), "not there yet");
        assert!(!sync.needs_remote_clear());
    }

    #[test]
    fn auto_enabled_stays_off_during_manual_even_if_remote_says_on() {
        let mut ctx = make_ctx();
        ctx.modes.begin_manual(Target::Retract);
        let mut record = RemoteRecord::default();
        record.auto_enabled = Some(true);

        RemoteCommandSync::new().apply_config(&mut ctx, &record);
        assert!(!ctx.modes.auto_enabled());
        assert!(ctx.modes.invariant_holds());
        // The config field itself is updated for persistence.
        assert!(ctx.config.auto_enabled);
    }
}
