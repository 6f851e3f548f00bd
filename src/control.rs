use std::io::{ErrorKind, Read};
use std::thread;
use std::time::{Duration, Instant};

use crate::announcer::{Announcement, PeriodicAnnouncer};
use crate::aprs::{strip_control_header, EncodedPacket, PacketEncoder};
use crate::beacon_scheduler::{BeaconScheduler, Decision};
use crate::config::Config;
use crate::indicator::Indicator;
use crate::radio::Radio;
use crate::telemetry::{MilliSeconds, PositionSample};
use crate::telemetry_provider::TelemetryProvider;

const TICK_MS: u64 = 50;
const SUMMARY_INTERVAL_MS: MilliSeconds = 1000;


/**
 * Ties the GPS, the beacon scheduler, the announcer and the radio together.
 */
pub struct Tracker<S: Read, R: Radio, I: Indicator> {
    telemetry: TelemetryProvider<S>,
    scheduler: BeaconScheduler,
    announcer: PeriodicAnnouncer,
    encoder: PacketEncoder,
    status_text: String,
    comment_text: String,
    radio: R,
    indicator: I,
    beacons_sent: u32,
    last_summary_ms: Option<MilliSeconds>,
    /// Cleared once the radio bridge hangs up.
    listening: bool,
}


impl<S: Read, R: Radio, I: Indicator> Tracker<S, R, I> {
    pub fn new(
        telemetry: TelemetryProvider<S>,
        config: &Config,
        radio: R,
        indicator: I,
    ) -> Tracker<S, R, I> {
        Tracker {
            telemetry: telemetry,
            scheduler: BeaconScheduler::new(config.rates),
            announcer: PeriodicAnnouncer::new(config.schedule.clone()),
            encoder: PacketEncoder::new(config.station.clone()),
            status_text: config.status_text.clone(),
            comment_text: config.comment_text.clone(),
            radio: radio,
            indicator: indicator,
            beacons_sent: 0,
            last_summary_ms: None,
            listening: true,
        }
    }

    pub fn beacons_sent(&self) -> u32 {
        self.beacons_sent
    }

    /**
     * Runs until the GPS stops responding.
     */
    pub fn run(&mut self) {
        let start = Instant::now();
        loop {
            let now_ms = start.elapsed().as_millis() as MilliSeconds;
            if !self.run_incremental(now_ms) {
                return;
            }
            thread::sleep(Duration::from_millis(TICK_MS));
        }
    }

    /**
     * Does one pass of the loop. Returns false if the tracker should stop.
     */
    pub fn run_incremental(&mut self, now_ms: MilliSeconds) -> bool {
        match self.telemetry.poll() {
            Ok(_) => (),
            Err(e) => {
                error!("Unable to read from the GPS: {}", e);
                return false;
            }
        }
        let sample = self.telemetry.sample(now_ms);

        for announcement in self.announcer.poll(now_ms) {
            self.announce(announcement, &sample);
        }

        let decision = self.scheduler.poll(&sample, now_ms);
        if decision.send {
            self.beacon(&sample, &decision);
        }

        if self.listening {
            self.drain_received();
        }

        let summary_due = match self.last_summary_ms {
            Some(last_ms) => now_ms.saturating_sub(last_ms) >= SUMMARY_INTERVAL_MS,
            None => true,
        };
        if summary_due {
            self.log_summary(&sample, &decision);
            self.last_summary_ms = Some(now_ms);
        }

        true
    }

    fn announce(&mut self, announcement: Announcement, sample: &PositionSample) {
        let packet = match announcement {
            Announcement::Status => {
                if !sample.valid {
                    debug!("Skipping status announcement, no GPS fix");
                    return;
                }
                self.encoder.encode_status(sample, &self.status_text)
            },
            Announcement::Comment => self.encoder.encode_comment(&self.comment_text),
        };
        if self.transmit(&packet) {
            info!("Sent {:?}: {}", announcement, packet);
        }
    }

    fn beacon(&mut self, sample: &PositionSample, decision: &Decision) {
        let packet = self.encoder.encode_position(sample);
        if self.transmit(&packet) {
            self.beacons_sent += 1;
            info!(
                "Beacon {} ({:?}) after {:.0} s, moved {:.0} m, turned {:.0}: {}",
                self.beacons_sent,
                decision.trigger,
                decision.elapsed_s,
                decision.distance_m,
                decision.course_delta_d,
                packet);
        }
    }

    fn transmit(&mut self, packet: &EncodedPacket) -> bool {
        match self.radio.transmit(&packet.frame()) {
            Ok(_) => {
                self.indicator.blink();
                true
            },
            Err(e) => {
                error!("Unable to transmit {}: {}", packet, e);
                false
            }
        }
    }

    fn drain_received(&mut self) {
        loop {
            match self.radio.receive() {
                Ok(Some(frame)) => {
                    info!("Received {}", String::from_utf8_lossy(strip_control_header(&frame)));
                    self.indicator.blink();
                },
                Ok(None) => return,
                Err(ref e) if e.kind() == ErrorKind::ConnectionAborted => {
                    error!("Radio bridge went away, no longer receiving: {}", e);
                    self.listening = false;
                    return;
                },
                Err(e) => {
                    warn!("Unable to receive from the radio: {}", e);
                    return;
                }
            }
        }
    }

    fn log_summary(&self, sample: &PositionSample, decision: &Decision) {
        let fix = self.telemetry.fix();
        if !sample.valid {
            debug!("No fix, {} satellites, {} beacons sent", fix.satellites, self.beacons_sent);
            return;
        }
        debug!(
            "{:.5} {:.5} {:.0} km/h {:03.0} {:.0} ft, {} satellites, last beacon {:.0} s ago, \
             interval {:.0} s, {} beacons sent",
            sample.latitude,
            sample.longitude,
            sample.speed_km_h,
            sample.course_d,
            sample.altitude_ft,
            fix.satellites,
            decision.elapsed_s,
            decision.adjusted_interval_s,
            self.beacons_sent);
    }
}


#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Cursor, ErrorKind, Read};

    use super::Tracker;
    use crate::announcer::MINUTE_MS;
    use crate::aprs::CONTROL_HEADER;
    use crate::config::Config;
    use crate::indicator::Indicator;
    use crate::radio::Radio;
    use crate::telemetry_provider::TelemetryProvider;

    const RMC: &str = "$GNRMC,083559.00,A,4007.40736,N,02939.25926,E,10.498,90.0,161026,,,A*43\r\n";
    const GGA: &str = "$GNGGA,083559.00,4007.40736,N,02939.25926,E,1,09,1.01,304.8,M,36.5,M,,*48\r\n";
    const BEACON: &str = "N0CALL-6>APLTE,WIDE1-1:!4007.41N/02939.26E>090/010/A=001000";

    struct RecordingRadio {
        sent: Vec<Vec<u8>>,
        incoming: VecDeque<Vec<u8>>,
        fail: bool,
        hung_up: bool,
        receives: u32,
    }
    impl Radio for RecordingRadio {
        fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(ErrorKind::BrokenPipe, "no modem"));
            }
            self.sent.push(frame.to_vec());
            Ok(())
        }
        fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
            self.receives += 1;
            if self.hung_up {
                return Err(io::Error::new(ErrorKind::ConnectionAborted, "closed"));
            }
            Ok(self.incoming.pop_front())
        }
    }

    struct CountingIndicator {
        blinks: u32,
    }
    impl Indicator for CountingIndicator {
        fn blink(&mut self) {
            self.blinks += 1;
        }
    }

    fn radio() -> RecordingRadio {
        RecordingRadio {
            sent: Vec::new(),
            incoming: VecDeque::new(),
            fail: false,
            hung_up: false,
            receives: 0,
        }
    }

    fn tracker(nmea: &str) -> Tracker<Cursor<Vec<u8>>, RecordingRadio, CountingIndicator> {
        Tracker::new(
            TelemetryProvider::new(Cursor::new(nmea.as_bytes().to_vec())),
            &Config::default(),
            radio(),
            CountingIndicator { blinks: 0 })
    }

    fn framed(text: &str) -> Vec<u8> {
        let mut frame = CONTROL_HEADER.to_vec();
        frame.extend_from_slice(text.as_bytes());
        frame
    }

    #[test]
    fn test_first_beacon_waits_for_minimum_interval() {
        let mut tracker = tracker(&format!("{}{}", RMC, GGA));
        assert!(tracker.run_incremental(1000));
        assert!(tracker.run_incremental(39_000));
        assert!(tracker.radio.sent.is_empty());

        assert!(tracker.run_incremental(41_000));
        assert_eq!(tracker.radio.sent, vec![framed(BEACON)]);
        assert!(tracker.beacons_sent() == 1);
        assert!(tracker.indicator.blinks == 1);

        // Nothing new until the interval passes again
        assert!(tracker.run_incremental(42_000));
        assert!(tracker.radio.sent.len() == 1);
    }

    #[test]
    fn test_no_fix_sends_nothing() {
        let mut tracker = tracker("");
        for second in 0..100 {
            assert!(tracker.run_incremental(second * 1000));
        }
        assert!(tracker.radio.sent.is_empty());
        assert!(tracker.indicator.blinks == 0);
    }

    #[test]
    fn test_comment_goes_out_without_fix() {
        let mut tracker = tracker("");
        assert!(tracker.run_incremental(5 * MINUTE_MS));
        assert_eq!(
            tracker.radio.sent,
            vec![framed("N0CALL-6>APLTE,WIDE1-1:>LoRa tracker on 433.775MHz")]);
    }

    #[test]
    fn test_status_skipped_without_fix() {
        let mut tracker = tracker("");
        // Minutes 5 and 25 collapse into one comment; 30 is a status
        assert!(tracker.run_incremental(30 * MINUTE_MS));
        assert!(tracker.radio.sent.len() == 1);
        assert!(tracker.announcer.state().last_status_minute == Some(30));
    }

    #[test]
    fn test_status_with_fix() {
        let mut tracker = tracker(&format!("{}{}", RMC, GGA));
        assert!(tracker.run_incremental(1000));
        assert!(tracker.run_incremental(30 * MINUTE_MS));
        let status = framed(&format!("{} LoRa APRS Smart Beacon tracker", BEACON));
        assert!(tracker.radio.sent.contains(&status));
        assert!(tracker.radio.sent.contains(&framed(BEACON)));
        assert!(tracker.beacons_sent() == 1);
        // Comment, status and beacon
        assert!(tracker.indicator.blinks == 3);
    }

    #[test]
    fn test_transmit_failure_keeps_running() {
        let mut tracker = tracker(&format!("{}{}", RMC, GGA));
        tracker.radio.fail = true;
        assert!(tracker.run_incremental(41_000));
        assert!(tracker.beacons_sent() == 0);
        assert!(tracker.indicator.blinks == 0);
        // The scheduler still counted it as sent
        assert!(tracker.scheduler.state().last_sent_at_ms == 41_000);
    }

    #[test]
    fn test_received_frames_are_drained() {
        let mut tracker = tracker("");
        tracker.radio.incoming.push_back(framed("TA1AA-7>APLTE:>hi"));
        tracker.radio.incoming.push_back(b"TA2BB>APRS:>there".to_vec());
        assert!(tracker.run_incremental(0));
        assert!(tracker.radio.incoming.is_empty());
        assert!(tracker.indicator.blinks == 2);
        assert!(tracker.radio.sent.is_empty());
    }

    #[test]
    fn test_closed_bridge_is_not_polled_again() {
        let mut tracker = tracker(&format!("{}{}", RMC, GGA));
        tracker.radio.hung_up = true;
        assert!(tracker.run_incremental(1000));
        assert!(tracker.radio.receives == 1);
        for second in 2..60 {
            assert!(tracker.run_incremental(second * 1000));
        }
        assert!(tracker.radio.receives == 1);
        // Beacons still go out
        assert!(tracker.beacons_sent() == 1);
    }

    #[test]
    fn test_gps_failure_stops() {
        struct BrokenReader;
        impl Read for BrokenReader {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged"))
            }
        }
        let mut tracker = Tracker::new(
            TelemetryProvider::new(BrokenReader),
            &Config::default(),
            radio(),
            CountingIndicator { blinks: 0 });
        assert!(!tracker.run_incremental(0));
    }
}
