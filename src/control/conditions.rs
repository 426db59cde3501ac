//! Drying-condition evaluator.
//!
//! Pure predicate over the latest sensor snapshot and the active
//! thresholds — no state, recomputed every cycle.  Comparisons are strict:
//! a reading exactly on a threshold boundary is *not* favourable.

use crate::config::DryingThresholds;

use super::context::SensorSnapshot;

/// `true` when ambient conditions are good for drying:
/// temperature and humidity strictly inside their windows and no rain.
pub fn good_drying_conditions(snapshot: &SensorSnapshot, thresholds: &DryingThresholds) -> bool {
    let temp_ok =
        snapshot.temperature_c > thresholds.temp_min_c && snapshot.temperature_c < thresholds.temp_max_c;
    let humidity_ok = snapshot.humidity_pct > thresholds.humidity_min_pct
        && snapshot.humidity_pct < thresholds.humidity_max_pct;
    temp_ok && humidity_ok && !snapshot.rain_detected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(t: f32, h: f32, rain: bool) -> SensorSnapshot {
        SensorSnapshot {
            temperature_c: t,
            humidity_pct: h,
            rain_detected: rain,
            ..SensorSnapshot::default()
        }
    }

    #[test]
    fn nominal_conditions_are_good() {
        let th = DryingThresholds::default(); // 25–40 °C, 30–70 %
        assert!(good_drying_conditions(&snap(30.0, 50.0, false), &th));
    }

    #[test]
    fn boundary_values_are_not_good() {
        let th = DryingThresholds::default();
        assert!(!good_drying_conditions(&snap(25.0, 50.0, false), &th));
        assert!(!good_drying_conditions(&snap(40.0, 50.0, false), &th));
        assert!(!good_drying_conditions(&snap(30.0, 30.0, false), &th));
        assert!(!good_drying_conditions(&snap(30.0, 70.0, false), &th));
    }

    #[test]
    fn rain_vetoes_everything() {
        let th = DryingThresholds::default();
        assert!(!good_drying_conditions(&snap(30.0, 50.0, true), &th));
    }

    #[test]
    fn out_of_window_readings_are_not_good() {
        let th = DryingThresholds::default();
        assert!(!good_drying_conditions(&snap(10.0, 50.0, false), &th));
        assert!(!good_drying_conditions(&snap(30.0, 90.0, false), &th));
    }

    #[test]
    fn evaluator_is_pure() {
        let th = DryingThresholds::default();
        let s = snap(28.5, 55.0, false);
        let first = good_drying_conditions(&s, &th);
        for _ in 0..100 {
            assert_eq!(good_drying_conditions(&s, &th), first);
        }
    }
}
