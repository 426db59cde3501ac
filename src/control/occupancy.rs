//! Occupancy debouncer.
//!
//! Converts raw PIR impulses into a sticky present/absent signal and emits
//! exactly one fire event per state flip.  A flip to Present can be armed
//! for later (`occupancy_action_delay_ms`, floored at 5 s when non-zero);
//! a flip to Absent always fires immediately and cancels any armed fire.
//!
//! The debounce state is an explicit struct owned by the instance — not
//! function-local statics — so tests can construct arbitrary starting
//! states.

use log::debug;

use crate::config::{OCCUPANCY_HOLD_WINDOW_MS, OCCUPANCY_MIN_ACTION_DELAY_MS};

/// Sticky presence state plus the armed-action deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccupancyState {
    /// Debounced presence signal.
    pub present: bool,
    /// When the sticky hold expires, absent no impulses.
    pub hold_deadline_ms: u64,
    /// Armed Present-fire deadline, when an action delay is configured.
    pub delay_deadline_ms: Option<u64>,
}

/// A debounced presence flip the arbiter should act on this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireEvent {
    /// Presence value the flip landed on.
    pub present: bool,
}

/// Presence debouncer with hold window and optional action delay.
#[derive(Debug, Default)]
pub struct OccupancyDebouncer {
    state: OccupancyState,
}

impl OccupancyDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary state (test construction).
    pub fn from_state(state: OccupancyState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> OccupancyState {
        self.state
    }

    pub fn present(&self) -> bool {
        self.state.present
    }

    /// Feed one raw PIR sample.  Returns at most one [`FireEvent`]:
    /// the flip itself (immediate) or a previously armed Present flip
    /// whose delay just expired.
    pub fn update(&mut self, impulse: bool, now_ms: u64, action_delay_ms: u32) -> Option<FireEvent> {
        let was_present = self.state.present;

        if impulse {
            self.state.present = true;
            self.state.hold_deadline_ms = now_ms + OCCUPANCY_HOLD_WINDOW_MS;
        } else if self.state.present && now_ms > self.state.hold_deadline_ms {
            self.state.present = false;
        }

        if self.state.present != was_present {
            if self.state.present {
                let delay = effective_delay_ms(action_delay_ms);
                if delay > 0 {
                    self.state.delay_deadline_ms = Some(now_ms + u64::from(delay));
                    debug!("occupancy: present, action armed for +{} ms", delay);
                    return None;
                }
                return Some(FireEvent { present: true });
            }
            // Flip to Absent fires immediately and cancels any armed fire.
            self.state.delay_deadline_ms = None;
            return Some(FireEvent { present: false });
        }

        // No flip this cycle: check whether an armed Present fire is due.
        if let Some(due) = self.state.delay_deadline_ms {
            if now_ms >= due {
                self.state.delay_deadline_ms = None;
                debug!("occupancy: armed action delay elapsed");
                return Some(FireEvent { present: true });
            }
        }

        None
    }
}

/// Zero stays zero (immediate); anything else is floored at 5 s.
fn effective_delay_ms(configured_ms: u32) -> u32 {
    if configured_ms == 0 {
        0
    } else {
        configured_ms.max(OCCUPANCY_MIN_ACTION_DELAY_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_sets_present_and_holds() {
        let mut d = OccupancyDebouncer::new();
        assert_eq!(d.update(true, 0, 0), Some(FireEvent { present: true }));
        // No impulse, but still inside the 10 s hold window.
        assert_eq!(d.update(false, 5_000, 0), None);
        assert!(d.present());
        // Hold expired.
        assert_eq!(d.update(false, 10_001, 0), Some(FireEvent { present: false }));
        assert!(!d.present());
    }

    #[test]
    fn repeated_impulses_extend_the_hold() {
        let mut d = OccupancyDebouncer::new();
        d.update(true, 0, 0);
        d.update(true, 9_000, 0);
        // 10 s after the *second* impulse, not the first.
        assert_eq!(d.update(false, 18_000, 0), None);
        assert!(d.present());
        assert_eq!(d.update(false, 19_001, 0), Some(FireEvent { present: false }));
    }

    #[test]
    fn present_flip_is_armed_for_the_delay() {
        let mut d = OccupancyDebouncer::new();
        // Flip to present with 5 s delay: nothing fires yet.
        assert_eq!(d.update(true, 0, 5_000), None);
        assert!(d.present());
        // Before the deadline: still nothing.
        assert_eq!(d.update(true, 4_999, 5_000), None);
        // At the deadline: exactly one fire.
        assert_eq!(d.update(true, 5_000, 5_000), Some(FireEvent { present: true }));
        // And never again for the same flip.
        assert_eq!(d.update(true, 6_000, 5_000), None);
    }

    #[test]
    fn small_nonzero_delay_is_floored_at_five_seconds() {
        let mut d = OccupancyDebouncer::new();
        assert_eq!(d.update(true, 0, 1_000), None);
        assert_eq!(d.update(true, 2_000, 1_000), None, "floored delay not yet elapsed");
        assert_eq!(d.update(true, 5_000, 1_000), Some(FireEvent { present: true }));
    }

    #[test]
    fn zero_delay_fires_immediately() {
        let mut d = OccupancyDebouncer::new();
        assert_eq!(d.update(true, 0, 0), Some(FireEvent { present: true }));
    }

    #[test]
    fn absent_flip_cancels_armed_present_fire() {
        // Hold expires before the armed fire is due (delay > hold here).
        let mut d = OccupancyDebouncer::from_state(OccupancyState {
            present: true,
            hold_deadline_ms: 1_000,
            delay_deadline_ms: Some(20_000),
        });
        assert_eq!(d.update(false, 1_500, 30_000), Some(FireEvent { present: false }));
        // The armed Present fire must be gone.
        assert_eq!(d.update(false, 25_000, 30_000), None);
    }

    #[test]
    fn exactly_one_fire_per_flip() {
        let mut d = OccupancyDebouncer::new();
        let mut fires = 0;
        for t in 0..30u64 {
            // Impulses for the first 5 samples, then silence.
            let impulse = t < 5;
            if d.update(impulse, t * 1_000, 0).is_some() {
                fires += 1;
            }
        }
        // One flip to present, one flip back to absent.
        assert_eq!(fires, 2);
    }
}
