//! Rate formulas applied to the delta between two consecutive frames.
//!
//! All functions are total: a zero time delta produces `inf`/`NaN` instead of an
//! error, and consumers decide how to render non-finite values. Inputs are plain
//! `f64` deltas so counters that run backwards yield negative values instead of
//! wrapping.

/// Microseconds per second of device clock.
pub const MICROS_PER_SECOND: f64 = 1e6;

/// Centimetres per metre.
pub const CM_PER_METRE: f64 = 100.0;

/// Value reported for the peak force of a frame without force samples.
pub const EMPTY_FORCE_PEAK: f64 = 0.0;

/// Distance counter rounded to whole centimetres, as the device revolution count.
pub fn rounded_distance(distance_cm: f64) -> f64 {
    distance_cm.round()
}

/// Strokes per minute from a stroke count delta over a stroke clock delta (µs).
pub fn stroke_rate(stroke_delta: f64, stroke_time_delta_us: f64) -> f64 {
    stroke_delta / (stroke_time_delta_us / MICROS_PER_SECOND) * 60.0
}

/// Boat speed in m/s from a distance delta (cm) over a flywheel clock delta (µs).
pub fn speed(distance_delta_cm: f64, rev_time_delta_us: f64) -> f64 {
    distance_delta_cm / CM_PER_METRE / (rev_time_delta_us / MICROS_PER_SECOND)
}

/// Metres covered per stroke.
///
/// A frame that did not move the boat reports `0.0` regardless of the stroke
/// delta; this also covers duplicated frames where both deltas are zero.
pub fn dist_per_stroke(distance_delta_cm: f64, stroke_delta: f64) -> f64 {
    if distance_delta_cm == 0.0 {
        return 0.0;
    }
    distance_delta_cm / CM_PER_METRE / stroke_delta
}

/// Largest handle force of the stroke, [`EMPTY_FORCE_PEAK`] if none were sampled.
pub fn peak_force(handle_forces: &[f64]) -> f64 {
    handle_forces
        .iter()
        .copied()
        .reduce(f64::max)
        .unwrap_or(EMPTY_FORCE_PEAK)
}

/// Device microseconds to seconds.
pub fn micros_to_seconds(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_rate_from_half_second_stroke() {
        assert_eq!(stroke_rate(1.0, 500_000.0), 120.0);
    }

    #[test]
    fn stroke_rate_without_elapsed_time_is_not_finite() {
        assert!(stroke_rate(1.0, 0.0).is_infinite());
        assert!(stroke_rate(0.0, 0.0).is_nan());
    }

    #[test]
    fn speed_in_metres_per_second() {
        // 10 cm in 0.5 s
        assert!((speed(10.0, 500_000.0) - 0.2).abs() < 1e-12);
        assert!(speed(0.0, 0.0).is_nan());
    }

    #[test]
    fn dist_per_stroke_zero_when_boat_did_not_move() {
        assert_eq!(dist_per_stroke(0.0, 0.0), 0.0);
        assert_eq!(dist_per_stroke(0.0, 3.0), 0.0);
        assert!((dist_per_stroke(1000.0, 1.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn dist_per_stroke_moving_without_stroke_is_infinite() {
        assert!(dist_per_stroke(50.0, 0.0).is_infinite());
    }

    #[test]
    fn peak_force_of_curve() {
        assert_eq!(peak_force(&[12.0, 340.5, 280.0, 3.0]), 340.5);
        assert_eq!(peak_force(&[-4.0, -2.0]), -2.0);
        assert_eq!(peak_force(&[]), EMPTY_FORCE_PEAK);
    }

    #[test]
    fn rounding_matches_whole_centimetres() {
        assert_eq!(rounded_distance(1009.5), 1010.0);
        assert_eq!(rounded_distance(1009.49), 1009.0);
    }
}
