/**
 * Position samples and the spherical geometry used to compare them.
 */

pub type Degrees = f64;
pub type Meter = f64;
pub type Feet = f64;
pub type KilometersPerHour = f64;
pub type Knots = f64;
pub type Seconds = f64;
pub type MilliSeconds = u64;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: Meter = 6_371_000.0;
pub const KNOTS_PER_KM_H: f64 = 0.539957;
pub const KM_H_PER_KNOT: f64 = 1.852;
pub const FEET_PER_METER: f64 = 3.28084;


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLon {
    pub latitude: Degrees,
    pub longitude: Degrees,
}


/**
 * A single reading from the GPS. Invalid samples (no fix) are still produced so that the
 * scheduler can refuse to beacon on them.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSample {
    pub latitude: Degrees,
    pub longitude: Degrees,
    pub speed_km_h: KilometersPerHour,
    pub course_d: Degrees,
    pub altitude_ft: Feet,
    pub valid: bool,
    pub timestamp_ms: MilliSeconds,
}


impl PositionSample {
    pub fn location(&self) -> LatLon {
        LatLon {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn speed_knots(&self) -> Knots {
        self.speed_km_h * KNOTS_PER_KM_H
    }
}


/**
 * Returns the great-circle distance between two points.
 */
pub fn distance_m(a: &LatLon, b: &LatLon) -> Meter {
    let phi_1 = a.latitude.to_radians();
    let phi_2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let half_chord = (delta_phi / 2.0).sin().powi(2)
        + phi_1.cos() * phi_2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let angle = 2.0 * half_chord.sqrt().atan2((1.0 - half_chord).sqrt());
    EARTH_RADIUS_M * angle
}


/**
 * Returns the absolute difference between two headings, folded into [0, 180].
 */
pub fn difference_d(heading_1: Degrees, heading_2: Degrees) -> Degrees {
    let difference = (heading_1 - heading_2).abs();
    if difference > 180.0 {
        360.0 - difference
    } else {
        difference
    }
}


pub fn wrap_degrees(degrees: Degrees) -> Degrees {
    let wrapped = degrees % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
