/**
 * Reads NMEA messages from the GPS.
 */
use chrono::{NaiveDate, NaiveTime};
use std::str::FromStr;

use crate::telemetry::{Degrees, KilometersPerHour, LatLon, Meter, KM_H_PER_KNOT};


/**
 * RMC: Recommended minimum specific GNSS data.
 */
#[derive(Debug, PartialEq)]
pub struct RmcMessage {
    pub time: Option<NaiveTime>,
    /// Status A (active) as opposed to V (void)
    pub active: bool,
    pub location: Option<LatLon>,
    pub speed_km_h: Option<KilometersPerHour>,
    pub course_d: Option<Degrees>,
    pub date: Option<NaiveDate>,
}


/**
 * GGA: Global positioning system fix data.
 */
#[derive(Debug, PartialEq)]
pub struct GgaMessage {
    pub time: Option<NaiveTime>,
    pub location: Option<LatLon>,
    /// 0 means no fix
    pub fix_quality: u8,
    pub satellites: u8,
    pub horizontal_dilution_of_precision: Option<f32>,
    pub altitude_m: Option<Meter>,
}


#[derive(Debug, PartialEq)]
pub enum NmeaMessage {
    Rmc(RmcMessage),
    Gga(GgaMessage),
}


macro_rules! bail_err {
    ($result:expr) => (
        match $result {
            Ok(s) => s,
            Err(e) => return Err(e.to_string()),
        }
    );
}
macro_rules! bail_none {
    ($option:expr) => (
        match $option {
            Some(s) => s,
            None => return Err("Message too short".to_string()),
        }
    );
}


impl NmeaMessage {
    pub fn parse(message: &str) -> Result<NmeaMessage, String> {
        let body = NmeaMessage::verify_checksum(message.trim_end())?;
        let fields: Vec<&str> = body.split(',').collect();
        let at = |index: usize| field(&fields, index);

        // The first two letters are the talker (GP, GN, GL...), which we don't care about
        let sentence_type = bail_none!(fields[0].get(2..));
        if sentence_type == "RMC" {
            // $GPRMC,hhmmss.ss,A,ddmm.mm,a,dddmm.mm,a,x.x,x.x,ddmmyy,x.x,a*hh<CR><LF>
            let speed_knots: Option<f64> = parse_optional(at(7)?)?;
            Ok(
                NmeaMessage::Rmc(
                    RmcMessage {
                        time: parse_time(at(1)?)?,
                        active: at(2)? == "A",
                        location: parse_location(at(3)?, at(4)?, at(5)?, at(6)?)?,
                        speed_km_h: speed_knots.map(|knots| knots * KM_H_PER_KNOT),
                        course_d: parse_optional(at(8)?)?,
                        date: parse_date(at(9)?)?,
                    }
                )
            )
        } else if sentence_type == "GGA" {
            // $GPGGA,hhmmss.ss,ddmm.mm,a,dddmm.mm,a,x,xx,x.x,x.x,M,x.x,M,,*hh<CR><LF>
            Ok(
                NmeaMessage::Gga(
                    GgaMessage {
                        time: parse_time(at(1)?)?,
                        location: parse_location(at(2)?, at(3)?, at(4)?, at(5)?)?,
                        fix_quality: parse_optional(at(6)?)?.unwrap_or(0),
                        satellites: parse_optional(at(7)?)?.unwrap_or(0),
                        horizontal_dilution_of_precision: parse_optional(at(8)?)?,
                        altitude_m: parse_optional(at(9)?)?,
                    }
                )
            )
        } else {
            Err(format!("Unsupported NMEA message type {}", fields[0]))
        }
    }

    /**
     * Checks the XOR checksum after the '*' and returns the text between '$' and '*'.
     */
    fn verify_checksum(message: &str) -> Result<&str, String> {
        let sentence = match message.strip_prefix('$') {
            Some(s) => s,
            None => return Err("NMEA message does not start with $".to_string()),
        };
        let (body, checksum_str) = match sentence.rsplit_once('*') {
            Some(split) => split,
            None => return Err("NMEA message has no checksum".to_string()),
        };
        let expected = bail_err!(u8::from_str_radix(checksum_str, 16));
        let computed = body.bytes().fold(0u8, |part, byte| part ^ byte);
        if computed != expected {
            return Err(format!(
                "Bad NMEA checksum: computed {:02X}, expected {:02X}",
                computed,
                expected));
        }
        Ok(body)
    }
}


fn field<'a>(fields: &[&'a str], index: usize) -> Result<&'a str, String> {
    Ok(*bail_none!(fields.get(index)))
}


fn parse_optional<T: FromStr>(field: &str) -> Result<Option<T>, String>
where
    T::Err: ToString,
{
    if field.is_empty() {
        return Ok(None);
    }
    Ok(Some(bail_err!(field.parse::<T>())))
}


/**
 * Parses a ddmm.mmmm or dddmm.mmmm coordinate into signed degrees.
 */
fn parse_coordinate(
    value: &str,
    hemisphere: &str,
    degree_digits: usize,
    negative_hemisphere: &str,
) -> Result<Degrees, String> {
    if value.len() <= degree_digits || !value.is_ascii() {
        return Err(format!("Malformed coordinate '{}'", value));
    }
    let degrees: u32 = bail_err!(value[0..degree_digits].parse());
    let minutes: f64 = bail_err!(value[degree_digits..].parse());
    let d = degrees as f64 + minutes / 60.0f64;
    if hemisphere == negative_hemisphere { Ok(-d) } else { Ok(d) }
}


fn parse_location(
    latitude: &str,
    north_indicator: &str,
    longitude: &str,
    east_indicator: &str,
) -> Result<Option<LatLon>, String> {
    // No fix: the receiver leaves the fields empty
    if latitude.is_empty() || longitude.is_empty() {
        return Ok(None);
    }
    if north_indicator != "N" && north_indicator != "S" {
        return Err(format!("Bad latitude hemisphere '{}'", north_indicator));
    }
    if east_indicator != "E" && east_indicator != "W" {
        return Err(format!("Bad longitude hemisphere '{}'", east_indicator));
    }
    Ok(
        Some(
            LatLon {
                latitude: parse_coordinate(latitude, north_indicator, 2, "S")?,
                longitude: parse_coordinate(longitude, east_indicator, 3, "W")?,
            }
        )
    )
}


/**
 * Parses hhmmss.sss UTC time.
 */
fn parse_time(field: &str) -> Result<Option<NaiveTime>, String> {
    if field.is_empty() {
        return Ok(None);
    }
    if field.len() < 6 || !field.is_ascii() {
        return Err(format!("Malformed time '{}'", field));
    }
    let hours: u32 = bail_err!(field[0..2].parse());
    let minutes: u32 = bail_err!(field[2..4].parse());
    let seconds: f64 = bail_err!(field[4..].parse());
    let milliseconds = ((seconds - seconds.trunc()) * 1000.0).round() as u32;
    match NaiveTime::from_hms_milli_opt(hours, minutes, seconds.trunc() as u32, milliseconds.min(999)) {
        Some(time) => Ok(Some(time)),
        None => Err(format!("Invalid time '{}'", field)),
    }
}


/**
 * Parses ddmmyy dates. Two digit years are in the 2000s.
 */
fn parse_date(field: &str) -> Result<Option<NaiveDate>, String> {
    if field.is_empty() {
        return Ok(None);
    }
    if field.len() != 6 || !field.is_ascii() {
        return Err(format!("Malformed date '{}'", field));
    }
    let day: u32 = bail_err!(field[0..2].parse());
    let month: u32 = bail_err!(field[2..4].parse());
    let year: i32 = bail_err!(field[4..6].parse());
    match NaiveDate::from_ymd_opt(2000 + year, month, day) {
        Some(date) => Ok(Some(date)),
        None => Err(format!("Invalid date '{}'", field)),
    }
}


#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::NmeaMessage::{Gga, Rmc};
    use super::{GgaMessage, NmeaMessage};
    use crate::telemetry::LatLon;

    #[test]
    fn test_parse_rmc() {
        let message = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";
        match NmeaMessage::parse(message).unwrap() {
            Rmc(rmc) => {
                assert!(rmc.active);
                assert!(rmc.time == NaiveTime::from_hms_opt(12, 35, 19));
                // Two digit years are taken to be in the 2000s
                assert!(rmc.date == NaiveDate::from_ymd_opt(2094, 3, 23));
                let location = rmc.location.unwrap();
                assert_approx_eq!(location.latitude, 48.1173);
                assert_approx_eq!(location.longitude, 11.516666666666667);
                assert_approx_eq!(rmc.speed_km_h.unwrap(), 22.4 * 1.852);
                assert_approx_eq!(rmc.course_d.unwrap(), 84.4);
            },
            _ => assert!(false),
        }
    }

    #[test]
    fn test_parse_rmc_southern_western() {
        let message = "$GPRMC,083600.00,A,3352.128,S,15112.558,W,0.0,,161026,,,A*72";
        match NmeaMessage::parse(message).unwrap() {
            Rmc(rmc) => {
                let location = rmc.location.unwrap();
                assert_approx_eq!(location.latitude, -33.8688);
                assert_approx_eq!(location.longitude, -151.2093);
                assert!(rmc.speed_km_h == Some(0.0));
                // Receivers leave the course empty when stationary
                assert!(rmc.course_d.is_none());
                assert!(rmc.date == NaiveDate::from_ymd_opt(2026, 10, 16));
            },
            _ => assert!(false),
        }
    }

    #[test]
    fn test_parse_rmc_no_fix() {
        match NmeaMessage::parse("$GPRMC,,V,,,,,,,,,,N*53").unwrap() {
            Rmc(rmc) => {
                assert!(!rmc.active);
                assert!(rmc.location.is_none());
                assert!(rmc.time.is_none());
                assert!(rmc.speed_km_h.is_none());
            },
            _ => assert!(false),
        }
    }

    #[test]
    fn test_parse_gga() {
        let message = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
        let expected = GgaMessage {
            time: NaiveTime::from_hms_opt(12, 35, 19),
            location: Some(LatLon { latitude: 48.1173, longitude: 11.516666666666667 }),
            fix_quality: 1,
            satellites: 8,
            horizontal_dilution_of_precision: Some(0.9f32),
            altitude_m: Some(545.4),
        };
        match NmeaMessage::parse(message).unwrap() {
            Gga(gga) => {
                assert!(gga.time == expected.time);
                assert!(gga.fix_quality == expected.fix_quality);
                assert!(gga.satellites == expected.satellites);
                assert!(gga.horizontal_dilution_of_precision == expected.horizontal_dilution_of_precision);
                assert!(gga.altitude_m == expected.altitude_m);
                let location = gga.location.unwrap();
                assert_approx_eq!(location.latitude, 48.1173);
                assert_approx_eq!(location.longitude, 11.516666666666667);
            },
            _ => assert!(false),
        }
    }

    #[test]
    fn test_parse_gga_no_fix() {
        match NmeaMessage::parse("$GPGGA,,,,,,0,00,99.99,,,,,,*48").unwrap() {
            Gga(gga) => {
                assert!(gga.fix_quality == 0);
                assert!(gga.location.is_none());
                assert!(gga.altitude_m.is_none());
            },
            _ => assert!(false),
        }
    }

    #[test]
    fn test_parse_fractional_time() {
        let message = "$GNGGA,083559.00,4007.40736,N,02939.25926,E,1,09,1.01,304.8,M,36.5,M,,*48";
        match NmeaMessage::parse(message).unwrap() {
            Gga(gga) => {
                assert!(gga.time == NaiveTime::from_hms_opt(8, 35, 59));
                let location = gga.location.unwrap();
                assert_approx_eq!(location.latitude, 40.123456);
                assert_approx_eq!(location.longitude, 29.654321);
            },
            _ => assert!(false),
        }
    }

    #[test]
    fn test_bad_checksum() {
        let message = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6B";
        assert!(NmeaMessage::parse(message).is_err());
        // One changed digit with the old checksum
        let message = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.5,230394,003.1,W*6A";
        assert!(NmeaMessage::parse(message).is_err());
    }

    #[test]
    fn test_missing_checksum_or_prefix() {
        assert!(NmeaMessage::parse("$GPRMC,,V,,,,,,,,,,N").is_err());
        assert!(NmeaMessage::parse("GPRMC,,V,,,,,,,,,,N*53").is_err());
        assert!(NmeaMessage::parse("").is_err());
    }

    #[test]
    fn test_unsupported_type() {
        assert!(NmeaMessage::parse("$GPVTG,123.4,T,356.1,M,000.0,N,0036.0,K,A*13").is_err());
    }

    #[test]
    fn test_truncated_message() {
        // Valid checksum over a sentence that stops early
        let body = "GPRMC,123519,A";
        let checksum = body.bytes().fold(0u8, |part, byte| part ^ byte);
        let message = format!("${}*{:02X}", body, checksum);
        assert!(NmeaMessage::parse(&message).is_err());
    }
}
