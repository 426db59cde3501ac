//! Cycle orchestrator.
//!
//! [`AppService`] owns the control context and the core components and runs
//! the fixed cycle order:
//!
//! 1. sensor snapshot
//! 2. occupancy debounce
//! 3. manual-command completion check (connectivity-independent)
//! 4. remote reconcile + deferred `requestedState` write-back (connected only)
//! 5. error-supervisor tick
//! 6. arbitration and at most one transit
//! 7. publication (connected only; telemetry held back mid-manual)
//! 8. debounced config persistence
//!
//! All side effects go through the port traits, so the whole cycle runs on
//! the host against mocks.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::control::arbiter::{self, Action, ActionReason, ArbiterInput};
use crate::control::conditions::good_drying_conditions;
use crate::control::context::{ControlContext, Position, Target};
use crate::control::occupancy::OccupancyDebouncer;
use crate::control::position::{PositionDriver, TransitOutcome};
use crate::control::supervisor::ErrorSupervisor;
use crate::sync::RemoteCommandSync;

use super::events::{AlertLevel, AppEvent, DeviceRegistration, DeviceStatus, SensorReport};
use super::ports::{ActuatorPort, Clock, ConfigPort, EventSink, RemotePort, SensorPort};

/// Config writes are debounced so a burst of remote changes costs one
/// flash write, not one per field.
const CONFIG_SAVE_DEBOUNCE_MS: u64 = 5_000;

/// The application service: context plus the core components.
pub struct AppService {
    ctx: ControlContext,
    driver: PositionDriver,
    occupancy: OccupancyDebouncer,
    supervisor: ErrorSupervisor,
    sync: RemoteCommandSync,
    cycle_count: u64,
    started_at_ms: u64,
    config_dirty_since_ms: Option<u64>,
}

impl AppService {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            ctx: ControlContext::new(config),
            driver: PositionDriver::new(),
            occupancy: OccupancyDebouncer::new(),
            supervisor: ErrorSupervisor::new(),
            sync: RemoteCommandSync::new(),
            cycle_count: 0,
            started_at_ms: 0,
            config_dirty_since_ms: None,
        }
    }

    /// Startup: detect the initial position from a fresh distance reading
    /// and announce it.
    pub fn start<H, C, E>(&mut self, hw: &mut H, clock: &C, sink: &mut E)
    where
        H: SensorPort,
        C: Clock,
        E: EventSink,
    {
        self.started_at_ms = clock.now_ms();
        let distance = hw.read_distance();
        self.ctx.detect_initial_position(distance);
        sink.emit(&AppEvent::Started {
            position: self.ctx.position,
        });
        sink.emit(&AppEvent::Alert {
            level: AlertLevel::Info,
            message: "controller started",
        });
    }

    /// Publish the one-shot registration document, when connected.
    pub fn register<R>(&self, remote: &mut R, device_id: &str)
    where
        R: RemotePort,
    {
        if !remote.is_connected() {
            return;
        }
        let registration = DeviceRegistration {
            name: self.ctx.config.device_name.as_str(),
            location: self.ctx.config.device_location.as_str(),
            id: device_id,
        };
        if let Err(err) = remote.register_device(&registration) {
            warn!("device registration failed: {}", err);
        }
    }

    /// Run one full control cycle.
    pub fn cycle<H, C, E, R, S>(
        &mut self,
        hw: &mut H,
        clock: &mut C,
        sink: &mut E,
        remote: &mut R,
        store: &mut S,
    ) where
        H: SensorPort + ActuatorPort,
        C: Clock,
        E: EventSink,
        R: RemotePort,
        S: ConfigPort,
    {
        self.cycle_count += 1;
        let now = clock.now_ms();

        // 1. Snapshot.
        self.ctx.sensors = hw.read_all();

        // 2. Occupancy debounce.
        let fire = self.occupancy.update(
            self.ctx.sensors.presence_detected,
            now,
            self.ctx.config.occupancy_action_delay_ms,
        );

        // 3. Completion check runs with or without connectivity.
        self.sync.check_completion(&mut self.ctx, sink);

        // 4. Remote reconcile.  The deferred requestedState clear goes out
        // first so this cycle's fetch cannot return the stale command.
        if remote.is_connected() {
            self.sync.flush_remote_clear(remote);
            match remote.fetch_record() {
                Ok(record) => {
                    let outcome =
                        self.sync
                            .reconcile(&mut self.ctx, &record, &self.driver, hw, clock, sink);
                    if outcome.config_changed {
                        self.mark_config_dirty(now);
                    }
                    if outcome.transit == Some(TransitOutcome::TimedOut) {
                        self.supervisor
                            .on_transit_timeout(clock.now_ms(), &mut self.ctx, hw, sink);
                    }
                }
                Err(err) => warn!("remote fetch failed: {}", err),
            }
        }

        // 5. Error window.
        self.supervisor.tick(clock.now_ms(), &mut self.ctx, sink);

        // 6. Arbitration — suppressed entirely inside the error window.
        if !self.supervisor.active() {
            let thresholds = self.ctx.config.active_thresholds();
            let input = ArbiterInput {
                position: self.ctx.position,
                auto_enabled: self.ctx.modes.auto_enabled(),
                manual_command_in_progress: self.ctx.modes.manual_command_in_progress(),
                good_conditions: good_drying_conditions(&self.ctx.sensors, &thresholds),
                rain: self.ctx.sensors.rain_detected,
                occupancy_enabled: self.ctx.config.enable_occupancy_control,
                retract_on_present: self.ctx.config.retract_on_present,
                present: self.occupancy.present(),
                fire,
            };
            if let Some(action) = arbiter::decide(&input) {
                self.run_action(action, hw, clock, sink);
            }
        }

        // 7. Publication.  Status always goes out when connected; the
        // telemetry document is held back while a manual command is
        // pending so the backend never overwrites it mid-transit.
        if remote.is_connected() {
            let now = clock.now_ms();
            if !self.ctx.modes.manual_command_in_progress() {
                let report = self.sensor_report(now);
                if let Err(err) = remote.publish_sensors(&report) {
                    warn!("sensor publish failed: {}", err);
                }
            }
            let status = self.status(now);
            if let Err(err) = remote.publish_status(&status) {
                warn!("status publish failed: {}", err);
            }
        }

        // 8. Debounced persistence.
        self.auto_save_if_due(clock.now_ms(), store);
    }

    fn run_action<H, C, E>(&mut self, action: Action, hw: &mut H, clock: &mut C, sink: &mut E)
    where
        H: SensorPort + ActuatorPort,
        C: Clock,
        E: EventSink,
    {
        sink.emit(&AppEvent::Alert {
            level: alert_level_for(action),
            message: alert_message_for(action),
        });

        let from = self.ctx.position;
        match self.driver.move_to(action.target, &mut self.ctx, hw, clock) {
            TransitOutcome::Reached => {
                sink.emit(&AppEvent::PositionChanged {
                    from,
                    to: self.ctx.position,
                });
            }
            TransitOutcome::TimedOut => {
                self.supervisor
                    .on_transit_timeout(clock.now_ms(), &mut self.ctx, hw, sink);
            }
        }
    }

    fn mark_config_dirty(&mut self, now_ms: u64) {
        if self.config_dirty_since_ms.is_none() {
            self.config_dirty_since_ms = Some(now_ms);
        }
    }

    fn auto_save_if_due<S>(&mut self, now_ms: u64, store: &mut S)
    where
        S: ConfigPort,
    {
        let Some(since) = self.config_dirty_since_ms else {
            return;
        };
        if now_ms.saturating_sub(since) < CONFIG_SAVE_DEBOUNCE_MS {
            return;
        }
        self.force_save(store);
    }

    /// Persist immediately, clearing the dirty flag on success.
    pub fn force_save<S>(&mut self, store: &mut S)
    where
        S: ConfigPort,
    {
        match store.save(&self.ctx.config) {
            Ok(()) => {
                info!("config persisted");
                self.config_dirty_since_ms = None;
            }
            Err(err) => warn!("config save failed: {}, will retry", err),
        }
    }

    /// Build the telemetry document from the latest snapshot.
    pub fn sensor_report(&self, now_ms: u64) -> SensorReport {
        SensorReport {
            snapshot: self.ctx.sensors,
            uptime_ms: now_ms.saturating_sub(self.started_at_ms),
        }
    }

    /// Build the status document.
    pub fn status(&self, now_ms: u64) -> DeviceStatus {
        DeviceStatus {
            state: self.ctx.position.as_str(),
            auto_enabled: self.ctx.modes.auto_enabled(),
            manual_command_in_progress: self.ctx.modes.manual_command_in_progress(),
            uptime_ms: now_ms.saturating_sub(self.started_at_ms),
        }
    }

    pub fn position(&self) -> Position {
        self.ctx.position
    }

    pub fn context(&self) -> &ControlContext {
        &self.ctx
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Cycle cadence in milliseconds, from the live config.
    pub fn cycle_interval_ms(&self) -> u32 {
        self.ctx.config.sensor_read_interval_ms
    }
}

fn alert_level_for(action: Action) -> AlertLevel {
    match action.reason {
        ActionReason::EmergencyRain => AlertLevel::Emergency,
        ActionReason::Occupancy => AlertLevel::Info,
        ActionReason::AutoExtend => AlertLevel::Info,
        ActionReason::AutoRetract => AlertLevel::Warning,
    }
}

fn alert_message_for(action: Action) -> &'static str {
    match (action.reason, action.target) {
        (ActionReason::EmergencyRain, _) => "rain detected: emergency retract",
        (ActionReason::Occupancy, Target::Retract) => "presence change: retracting",
        (ActionReason::Occupancy, Target::Extend) => "presence change: extending",
        (ActionReason::AutoExtend, _) => "good drying conditions: extending",
        (ActionReason::AutoRetract, _) => "conditions unfavourable: retracting",
    }
}
