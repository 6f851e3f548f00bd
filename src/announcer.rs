/**
 * Schedules the status and comment announcements. These run off a minute counter and are
 * independent of the position beacons.
 */
use crate::telemetry::MilliSeconds;

pub const MINUTE_MS: MilliSeconds = 60_000;
const MINUTES_PER_HOUR: u8 = 60;


/**
 * The minutes of the hour cycle at which each announcement goes out.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct AnnounceSchedule {
    pub status_minutes: Vec<u8>,
    pub comment_minutes: Vec<u8>,
}


impl Default for AnnounceSchedule {
    fn default() -> AnnounceSchedule {
        AnnounceSchedule {
            status_minutes: vec![30, 59],
            comment_minutes: vec![5, 25, 45],
        }
    }
}


impl AnnounceSchedule {
    pub fn validate(&self) -> Result<(), String> {
        for minute in self.status_minutes.iter().chain(self.comment_minutes.iter()) {
            if *minute >= MINUTES_PER_HOUR {
                return Err(format!("Announcement minute {} is not in 0..59", minute));
            }
        }
        Ok(())
    }
}


#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnnounceState {
    pub minute_counter: u8,
    pub last_status_minute: Option<u8>,
    pub last_comment_minute: Option<u8>,
    /// Start of the minute currently being counted.
    pub minute_started_at_ms: MilliSeconds,
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Announcement {
    Status,
    Comment,
}


pub struct PeriodicAnnouncer {
    schedule: AnnounceSchedule,
    state: AnnounceState,
}


impl PeriodicAnnouncer {
    pub fn new(schedule: AnnounceSchedule) -> PeriodicAnnouncer {
        PeriodicAnnouncer {
            schedule: schedule,
            state: AnnounceState::default(),
        }
    }

    pub fn state(&self) -> &AnnounceState {
        &self.state
    }

    /**
     * Advances the minute counter by every whole minute that has passed and returns the
     * announcements that came due. Minutes are measured from the previous minute boundary rather
     * than from when we were polled, so late polls do not push the schedule back. If several
     * minutes were missed, each kind of announcement is returned at most once.
     */
    pub fn poll(&mut self, now_ms: MilliSeconds) -> Vec<Announcement> {
        let mut due = Vec::new();
        while now_ms.saturating_sub(self.state.minute_started_at_ms) >= MINUTE_MS {
            self.state.minute_started_at_ms += MINUTE_MS;
            self.state.minute_counter = (self.state.minute_counter + 1) % MINUTES_PER_HOUR;
            let minute = self.state.minute_counter;

            if self.schedule.status_minutes.contains(&minute) {
                self.state.last_status_minute = Some(minute);
                if !due.contains(&Announcement::Status) {
                    due.push(Announcement::Status);
                }
            }
            if self.schedule.comment_minutes.contains(&minute) {
                self.state.last_comment_minute = Some(minute);
                if !due.contains(&Announcement::Comment) {
                    due.push(Announcement::Comment);
                }
            }
        }
        due
    }
}
