//! Position driver — drives the motor toward a target proximity band.
//!
//! One call = one transit.  The driver engages the relay, busy-polls the
//! ultrasonic distance at a fixed short cadence, and stops the instant the
//! reading enters the tolerance band or the timeout budget is exhausted.
//!
//! The motor is disengaged on **every** exit path — success, timeout, or
//! already-in-band no-op.  This is the system's central safety invariant;
//! escalation of a timeout is the caller's responsibility.
//!
//! Clock and distance reads come in through ports so the whole loop runs
//! deterministically under test without real delays.

use log::{info, warn};

use crate::app::ports::{ActuatorPort, Clock, SensorPort};
use crate::config::TRANSIT_POLL_INTERVAL_MS;

use super::context::{ControlContext, Target};

/// How a transit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitOutcome {
    /// The distance reading entered the tolerance band.
    Reached,
    /// The timeout budget elapsed first; position unchanged.
    TimedOut,
}

/// Drives the single actuator toward a target band.
pub struct PositionDriver {
    poll_interval_ms: u32,
}

impl Default for PositionDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionDriver {
    pub fn new() -> Self {
        Self {
            poll_interval_ms: TRANSIT_POLL_INTERVAL_MS,
        }
    }

    /// Run one transit to `target`.
    ///
    /// Blocks the control cycle until the band is reached or the motor
    /// timeout elapses — mutual exclusion on the actuator is structural,
    /// there is no mid-transit cancellation.
    ///
    /// On `Reached`, `ctx.position` is updated to the target; on
    /// `TimedOut` it is left unchanged and the caller escalates.
    pub fn move_to<H, C>(&self, target: Target, ctx: &mut ControlContext, hw: &mut H, clock: &mut C) -> TransitOutcome
    where
        H: SensorPort + ActuatorPort,
        C: Clock,
    {
        let center = target.band_center_cm(&ctx.config);
        let tol = ctx.config.distance_tolerance_cm;

        // Already inside the band: succeed without ever engaging the motor.
        let reading = hw.read_distance();
        if in_band(reading, center, tol) {
            info!(
                "transit to {:?}: already at {:.1} cm (target {:.1} ± {:.1})",
                target, reading, center, tol
            );
            ctx.position = target.position();
            return TransitOutcome::Reached;
        }

        info!(
            "transit to {:?}: start at {:.1} cm, target {:.1} ± {:.1} cm, budget {} ms",
            target, reading, center, tol, ctx.config.motor_timeout_ms
        );

        hw.motor_on();
        let started = clock.now_ms();

        let outcome = loop {
            let distance = hw.read_distance();
            ctx.sensors.distance_cm = distance;

            if in_band(distance, center, tol) {
                info!("transit to {:?}: reached at {:.1} cm", target, distance);
                break TransitOutcome::Reached;
            }

            if clock.now_ms().saturating_sub(started) > u64::from(ctx.config.motor_timeout_ms) {
                warn!(
                    "transit to {:?}: timed out after {} ms at {:.1} cm",
                    target, ctx.config.motor_timeout_ms, distance
                );
                break TransitOutcome::TimedOut;
            }

            clock.sleep_ms(self.poll_interval_ms);
        };

        // Unconditional postcondition: the relay is never left engaged.
        hw.motor_off();

        if outcome == TransitOutcome::Reached {
            ctx.position = target.position();
        }
        outcome
    }
}

fn in_band(distance_cm: f32, center_cm: f32, tolerance_cm: f32) -> bool {
    distance_cm >= center_cm - tolerance_cm && distance_cm <= center_cm + tolerance_cm
}
