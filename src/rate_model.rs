/**
 * Maps vehicle dynamics to a beacon interval. Slow vehicles beacon rarely, fast vehicles beacon
 * often, and turning shortens whatever interval the speed asks for.
 */
use crate::telemetry::{Degrees, KilometersPerHour, Meter, Seconds};


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateParameters {
    /// Below this speed the slow rate applies.
    pub slow_speed_km_h: KilometersPerHour,
    /// Above this speed the fast rate applies.
    pub fast_speed_km_h: KilometersPerHour,
    pub slow_rate_s: Seconds,
    pub fast_rate_s: Seconds,
    /// Distance from the last beacon that triggers a new one.
    pub min_tx_distance_m: Meter,
    /// Nothing is sent sooner than this after the last beacon.
    pub min_delta_beacon_s: Seconds,
    /// Course changes smaller than this do not shorten the interval.
    pub turn_min_d: Degrees,
    pub turn_slope: f64,
}


impl Default for RateParameters {
    fn default() -> RateParameters {
        RateParameters {
            slow_speed_km_h: 10.0,
            fast_speed_km_h: 60.0,
            slow_rate_s: 300.0,
            fast_rate_s: 60.0,
            min_tx_distance_m: 100.0,
            min_delta_beacon_s: 40.0,
            turn_min_d: 28.0,
            turn_slope: 255.0,
        }
    }
}


impl RateParameters {
    /**
     * Checks the ordering constraints between the parameters.
     */
    pub fn validate(&self) -> Result<(), String> {
        if !(self.slow_speed_km_h < self.fast_speed_km_h) {
            return Err(format!(
                "Slow speed {} km/h must be less than fast speed {} km/h",
                self.slow_speed_km_h,
                self.fast_speed_km_h));
        }
        if !(self.slow_rate_s > self.fast_rate_s) {
            return Err(format!(
                "Slow rate {} s must be greater than fast rate {} s",
                self.slow_rate_s,
                self.fast_rate_s));
        }
        if !(self.fast_rate_s > 0.0) {
            return Err(format!("Fast rate {} s must be positive", self.fast_rate_s));
        }
        if !(self.turn_slope > 0.0) {
            return Err(format!("Turn slope {} must be positive", self.turn_slope));
        }
        if self.min_tx_distance_m < 0.0 || self.min_delta_beacon_s < 0.0 || self.turn_min_d < 0.0 {
            return Err("Distance, minimum interval and turn threshold must not be negative"
                .to_string());
        }
        Ok(())
    }

    /**
     * Returns the beacon interval for a speed, interpolating linearly between the slow and fast
     * rates.
     */
    pub fn base_interval_s(&self, speed_km_h: KilometersPerHour) -> Seconds {
        if speed_km_h < self.slow_speed_km_h {
            return self.slow_rate_s;
        }
        if speed_km_h > self.fast_speed_km_h {
            return self.fast_rate_s;
        }
        self.slow_rate_s
            - (speed_km_h - self.slow_speed_km_h) * (self.slow_rate_s - self.fast_rate_s)
                / (self.fast_speed_km_h - self.slow_speed_km_h)
    }

    /**
     * Returns how much a course change shortens the interval. The delta must already be folded
     * into [0, 180].
     */
    pub fn turn_speedup_factor(&self, course_delta_d: Degrees) -> f64 {
        if course_delta_d < self.turn_min_d {
            return 1.0;
        }
        1.0 + course_delta_d / self.turn_slope
    }

    pub fn adjusted_interval_s(
        &self,
        speed_km_h: KilometersPerHour,
        course_delta_d: Degrees,
    ) -> Seconds {
        self.base_interval_s(speed_km_h) / self.turn_speedup_factor(course_delta_d)
    }
}
