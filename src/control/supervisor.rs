//! Error supervisor — timeout escalation and timed recovery.
//!
//! A transit timeout parks the system in the sticky `Error` position for a
//! fixed 30 s window: the actuator is forced off, exactly one ERROR alert
//! goes out, and no automatic action runs until the window elapses.
//! Recovery rechecks the distance reading against the limit bands and
//! falls back to `Retracted` when the reading matches neither.

use log::{error, info};

use crate::app::events::{AlertLevel, AppEvent};
use crate::app::ports::{ActuatorPort, EventSink};
use crate::config::ERROR_RECOVERY_WINDOW_MS;

use super::context::{classify_distance, ControlContext, Position};

/// Two states: normal (`None`) and error-held (`Some(entry time)`).
#[derive(Debug, Default)]
pub struct ErrorSupervisor {
    error_since_ms: Option<u64>,
}

impl ErrorSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the error window is currently active (gates arbitration).
    pub fn active(&self) -> bool {
        self.error_since_ms.is_some()
    }

    /// Escalate a transit timeout.  Idempotent within one incident: a second
    /// timeout inside the window does not emit a second alert.
    pub fn on_transit_timeout<H, E>(
        &mut self,
        now_ms: u64,
        ctx: &mut ControlContext,
        hw: &mut H,
        sink: &mut E,
    ) where
        H: ActuatorPort,
        E: EventSink,
    {
        // Force the relay off regardless of what the failed transit left.
        hw.motor_off();
        ctx.position = Position::Error;

        if self.error_since_ms.is_none() {
            self.error_since_ms = Some(now_ms);
            error!("motor timeout: entering error hold for {} ms", ERROR_RECOVERY_WINDOW_MS);
            sink.emit(&AppEvent::Alert {
                level: AlertLevel::Error,
                message: "motor timeout: position unknown, holding for recovery",
            });
        }
    }

    /// Advance the window.  After 30 s the position is re-derived from the
    /// latest distance reading (Retracted when ambiguous) and an INFO
    /// recovery alert is emitted.
    pub fn tick<E>(&mut self, now_ms: u64, ctx: &mut ControlContext, sink: &mut E)
    where
        E: EventSink,
    {
        let Some(since) = self.error_since_ms else {
            return;
        };
        if now_ms.saturating_sub(since) < ERROR_RECOVERY_WINDOW_MS {
            return;
        }

        self.error_since_ms = None;
        ctx.position =
            classify_distance(ctx.sensors.distance_cm, &ctx.config).unwrap_or(Position::Retracted);
        info!(
            "error hold elapsed: recovered to {} from {:.1} cm reading",
            ctx.position.as_str(),
            ctx.sensors.distance_cm
        );
        sink.emit(&AppEvent::Alert {
            level: AlertLevel::Info,
            message: "recovered from motor timeout",
        });
    }
}
