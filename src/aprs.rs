/**
 * Builds APRS packets: uncompressed position reports with course, speed and altitude, status
 * reports that append free text to a position, and position-less comments.
 */
use std::fmt;

use crate::telemetry::{Degrees, PositionSample};

/// Framing marker the LoRa modem expects in front of every packet.
pub const CONTROL_HEADER: [u8; 3] = [b'<', 0xFF, 0x01];

const POSITION_MARKER: char = '!';
const COMMENT_MARKER: char = '>';


/**
 * Identity of this station on the network.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct StationConfig {
    pub callsign: String,
    pub destination: String,
    /// Relay path token, e.g. WIDE1-1. May be empty.
    pub path: String,
    pub symbol_table: char,
    pub symbol: char,
}


impl Default for StationConfig {
    fn default() -> StationConfig {
        StationConfig {
            callsign: "N0CALL-6".to_string(),
            destination: "APLTE".to_string(),
            path: "WIDE1-1".to_string(),
            symbol_table: '/',
            symbol: '>',
        }
    }
}


/**
 * A routed packet. Displays as the TNC2 text form, `SOURCE>DEST,PATH:information`.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedPacket {
    pub source: String,
    pub destination: String,
    pub path: String,
    pub information: String,
}


impl EncodedPacket {
    /**
     * Returns the bytes handed to the radio: the control header followed by the packet text.
     */
    pub fn frame(&self) -> Vec<u8> {
        let text = self.to_string();
        let mut frame = Vec::with_capacity(CONTROL_HEADER.len() + text.len());
        frame.extend_from_slice(&CONTROL_HEADER);
        frame.extend_from_slice(text.as_bytes());
        frame
    }
}


impl fmt::Display for EncodedPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}>{}", self.source, self.destination)?;
        if !self.path.is_empty() {
            write!(f, ",{}", self.path)?;
        }
        write!(f, ":{}", self.information)
    }
}


/**
 * Removes the control header from a received frame, if it is there.
 */
pub fn strip_control_header(frame: &[u8]) -> &[u8] {
    if frame.starts_with(&CONTROL_HEADER) {
        &frame[CONTROL_HEADER.len()..]
    } else {
        frame
    }
}


/**
 * Splits an angle into whole degrees and minutes rounded to hundredths. Minutes that round up to
 * 60 are carried into the degrees.
 */
fn degrees_minutes(angle: Degrees) -> (u32, f64) {
    let magnitude = angle.abs();
    let mut degrees = magnitude.trunc();
    let mut hundredths = ((magnitude - degrees) * 60.0 * 100.0).round();
    if hundredths >= 6000.0 {
        degrees += 1.0;
        hundredths -= 6000.0;
    }
    (degrees as u32, hundredths / 100.0)
}


/// Formats a latitude as `DDMM.mmN`.
pub fn format_latitude(latitude: Degrees) -> String {
    let (degrees, minutes) = degrees_minutes(latitude);
    let hemisphere = if latitude >= 0.0 { 'N' } else { 'S' };
    format!("{:02}{:05.2}{}", degrees, minutes, hemisphere)
}


/// Formats a longitude as `DDDMM.mmE`.
pub fn format_longitude(longitude: Degrees) -> String {
    let (degrees, minutes) = degrees_minutes(longitude);
    let hemisphere = if longitude >= 0.0 { 'E' } else { 'W' };
    format!("{:03}{:05.2}{}", degrees, minutes, hemisphere)
}


pub struct PacketEncoder {
    station: StationConfig,
}


impl PacketEncoder {
    pub fn new(station: StationConfig) -> PacketEncoder {
        PacketEncoder { station: station }
    }

    pub fn station(&self) -> &StationConfig {
        &self.station
    }

    /**
     * Encodes a position report. Callers should only pass samples with a valid fix; anything out
     * of range produces a packet with malformed fields rather than a failure.
     */
    pub fn encode_position(&self, sample: &PositionSample) -> EncodedPacket {
        self.packet(self.position_information(sample))
    }

    /**
     * Encodes a position report followed by a free text status.
     */
    pub fn encode_status(&self, sample: &PositionSample, status: &str) -> EncodedPacket {
        let information = format!("{} {}", self.position_information(sample), status);
        self.packet(information)
    }

    /**
     * Encodes a free text comment with no position.
     */
    pub fn encode_comment(&self, comment: &str) -> EncodedPacket {
        self.packet(format!("{}{}", COMMENT_MARKER, comment))
    }

    fn position_information(&self, sample: &PositionSample) -> String {
        format!(
            "{marker}{latitude}{table}{longitude}{symbol}{course:03.0}/{speed:03.0}/A={altitude:06.0}",
            marker=POSITION_MARKER,
            latitude=format_latitude(sample.latitude),
            table=self.station.symbol_table,
            longitude=format_longitude(sample.longitude),
            symbol=self.station.symbol,
            course=sample.course_d,
            speed=sample.speed_knots(),
            altitude=sample.altitude_ft)
    }

    fn packet(&self, information: String) -> EncodedPacket {
        EncodedPacket {
            source: self.station.callsign.clone(),
            destination: self.station.destination.clone(),
            path: self.station.path.clone(),
            information: information,
        }
    }
}
