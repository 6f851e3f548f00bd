use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read};
use std::os::unix::fs::OpenOptionsExt;

use crate::nmea::NmeaMessage;
use crate::telemetry::{
    wrap_degrees, Degrees, Feet, KilometersPerHour, LatLon, MilliSeconds, PositionSample,
    FEET_PER_METER,
};
use crate::termios::{Speed, Termio};

/// NMEA sentences are at most 82 characters; anything longer is line noise.
const MAX_LINE_LENGTH: usize = 128;


/**
 * The latest state reported by the GPS, accumulated across sentences.
 */
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GpsFix {
    pub location: Option<LatLon>,
    pub speed_km_h: KilometersPerHour,
    pub course_d: Degrees,
    pub altitude_ft: Feet,
    pub satellites: u8,
    pub valid: bool,
    pub utc: Option<NaiveDateTime>,
    date: Option<NaiveDate>,
}


impl GpsFix {
    pub fn update(&mut self, message: &NmeaMessage) {
        match message {
            NmeaMessage::Rmc(rmc) => {
                if let Some(location) = rmc.location {
                    self.location = Some(location);
                }
                if let Some(speed) = rmc.speed_km_h {
                    self.speed_km_h = speed;
                }
                // Receivers drop the course when stationary, so keep the last one
                if let Some(course) = rmc.course_d {
                    self.course_d = wrap_degrees(course);
                }
                if rmc.date.is_some() {
                    self.date = rmc.date;
                }
                self.valid = rmc.active && rmc.location.is_some();
                self.update_time(rmc.time);
            },
            NmeaMessage::Gga(gga) => {
                if let Some(location) = gga.location {
                    self.location = Some(location);
                }
                if let Some(altitude) = gga.altitude_m {
                    self.altitude_ft = altitude * FEET_PER_METER;
                }
                self.satellites = gga.satellites;
                self.valid = gga.fix_quality > 0 && gga.location.is_some();
                self.update_time(gga.time);
            },
        }
    }

    fn update_time(&mut self, time: Option<NaiveTime>) {
        if let (Some(date), Some(time)) = (self.date, time) {
            self.utc = Some(date.and_time(time));
        }
    }

    /**
     * Returns the fix as a sample. Samples without a fix are still returned, marked invalid.
     */
    pub fn sample(&self, timestamp_ms: MilliSeconds) -> PositionSample {
        let location = self.location.unwrap_or(LatLon { latitude: 0.0, longitude: 0.0 });
        PositionSample {
            latitude: location.latitude,
            longitude: location.longitude,
            speed_km_h: self.speed_km_h,
            course_d: self.course_d,
            altitude_ft: self.altitude_ft,
            valid: self.valid,
            timestamp_ms: timestamp_ms,
        }
    }
}


/**
 * Reads NMEA sentences from the GPS without blocking and keeps track of the latest fix.
 */
pub struct TelemetryProvider<R: Read> {
    reader: R,
    line: Vec<u8>,
    fix: GpsFix,
}


impl TelemetryProvider<File> {
    /**
     * Opens the GPS serial device in raw, non-blocking mode.
     */
    pub fn open(path: &str, speed: Speed) -> io::Result<TelemetryProvider<File>> {
        let tty = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)?;
        tty.make_raw()?;
        tty.set_speed(speed)?;
        tty.set_non_blocking_read()?;
        tty.drop_input_output()?;
        match tty.get_speed() {
            Ok(speed) => info!("Opened GPS on {} at {:?}", path, speed),
            Err(e) => warn!("Opened GPS on {} but unable to read back the speed: {}", path, e),
        }
        Ok(TelemetryProvider::new(tty))
    }
}


impl<R: Read> TelemetryProvider<R> {
    pub fn new(reader: R) -> TelemetryProvider<R> {
        TelemetryProvider {
            reader: reader,
            line: Vec::with_capacity(MAX_LINE_LENGTH),
            fix: GpsFix::default(),
        }
    }

    pub fn fix(&self) -> &GpsFix {
        &self.fix
    }

    pub fn sample(&self, timestamp_ms: MilliSeconds) -> PositionSample {
        self.fix.sample(timestamp_ms)
    }

    /**
     * Consumes whatever the GPS has sent so far and returns how many sentences were applied.
     * Partial lines are kept until the rest arrives.
     */
    pub fn poll(&mut self) -> io::Result<usize> {
        let mut buffer = [0u8; 256];
        let mut applied = 0;
        loop {
            let count = match self.reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(count) => count,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            for &byte in &buffer[..count] {
                if byte == b'\n' {
                    if self.apply_line() {
                        applied += 1;
                    }
                    self.line.clear();
                } else if self.line.len() < MAX_LINE_LENGTH {
                    self.line.push(byte);
                }
            }
        }
        Ok(applied)
    }

    fn apply_line(&mut self) -> bool {
        let line = String::from_utf8_lossy(&self.line);
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        match NmeaMessage::parse(line) {
            Ok(message) => {
                self.fix.update(&message);
                true
            },
            Err(e) => {
                debug!("Ignoring NMEA message '{}': {}", line, e);
                false
            },
        }
    }
}
