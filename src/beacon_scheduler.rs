/**
 * Decides when to send a position beacon. Two independent rules can fire a beacon: moving far
 * enough from the last beaconed position, or waiting long enough for the speed and turn adjusted
 * interval. Neither rule fires before the minimum beacon interval has passed.
 */
use crate::rate_model::RateParameters;
use crate::telemetry::{
    difference_d, distance_m, Degrees, LatLon, Meter, MilliSeconds, PositionSample, Seconds,
};


/**
 * What was last beaconed and when. All zeros until the first beacon goes out.
 */
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BeaconState {
    pub last_latitude: Degrees,
    pub last_longitude: Degrees,
    pub last_course_d: Degrees,
    pub last_sent_at_ms: MilliSeconds,
}


impl BeaconState {
    /**
     * Returns the state after beaconing the sample at the given time.
     */
    pub fn sent(sample: &PositionSample, now_ms: MilliSeconds) -> BeaconState {
        BeaconState {
            last_latitude: sample.latitude,
            last_longitude: sample.longitude,
            last_course_d: sample.course_d,
            last_sent_at_ms: now_ms,
        }
    }

    pub fn last_location(&self) -> LatLon {
        LatLon {
            latitude: self.last_latitude,
            longitude: self.last_longitude,
        }
    }

    pub fn elapsed_s(&self, now_ms: MilliSeconds) -> Seconds {
        now_ms.saturating_sub(self.last_sent_at_ms) as Seconds / 1000.0
    }
}


/// Which rule fired a beacon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Trigger {
    Distance,
    Rate,
    Both,
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    pub send: bool,
    pub trigger: Option<Trigger>,
    pub elapsed_s: Seconds,
    pub distance_m: Meter,
    pub course_delta_d: Degrees,
    pub adjusted_interval_s: Seconds,
}


impl Decision {
    fn no_fix(elapsed_s: Seconds) -> Decision {
        Decision {
            send: false,
            trigger: None,
            elapsed_s: elapsed_s,
            distance_m: 0.0,
            course_delta_d: 0.0,
            adjusted_interval_s: 0.0,
        }
    }
}


/**
 * Decides whether the sample should be beaconed. This never changes the state; on a send the
 * caller replaces it with `BeaconState::sent`.
 */
pub fn evaluate(
    sample: &PositionSample,
    state: &BeaconState,
    parameters: &RateParameters,
    now_ms: MilliSeconds,
) -> Decision {
    let elapsed_s = state.elapsed_s(now_ms);
    if !sample.valid {
        return Decision::no_fix(elapsed_s);
    }

    let distance = distance_m(&state.last_location(), &sample.location());
    let course_delta_d = difference_d(sample.course_d, state.last_course_d);
    let adjusted_interval_s = parameters.adjusted_interval_s(sample.speed_km_h, course_delta_d);

    // The floor applies to each rule separately
    let distance_rule = distance >= parameters.min_tx_distance_m
        && elapsed_s >= parameters.min_delta_beacon_s;
    let rate_rule = elapsed_s >= adjusted_interval_s
        && elapsed_s >= parameters.min_delta_beacon_s;

    let trigger = match (distance_rule, rate_rule) {
        (true, true) => Some(Trigger::Both),
        (true, false) => Some(Trigger::Distance),
        (false, true) => Some(Trigger::Rate),
        (false, false) => None,
    };

    Decision {
        send: trigger.is_some(),
        trigger: trigger,
        elapsed_s: elapsed_s,
        distance_m: distance,
        course_delta_d: course_delta_d,
        adjusted_interval_s: adjusted_interval_s,
    }
}


/**
 * Owns the beacon state and applies the update whenever a beacon is due.
 */
pub struct BeaconScheduler {
    parameters: RateParameters,
    state: BeaconState,
}


impl BeaconScheduler {
    pub fn new(parameters: RateParameters) -> BeaconScheduler {
        BeaconScheduler::with_state(parameters, BeaconState::default())
    }

    pub fn with_state(parameters: RateParameters, state: BeaconState) -> BeaconScheduler {
        BeaconScheduler {
            parameters: parameters,
            state: state,
        }
    }

    pub fn state(&self) -> &BeaconState {
        &self.state
    }

    pub fn parameters(&self) -> &RateParameters {
        &self.parameters
    }

    /**
     * Evaluates the sample and, if a beacon is due, records it as sent. The caller is expected to
     * transmit whenever the returned decision says to send.
     */
    pub fn poll(&mut self, sample: &PositionSample, now_ms: MilliSeconds) -> Decision {
        let decision = evaluate(sample, &self.state, &self.parameters, now_ms);
        if decision.send {
            self.state = BeaconState::sent(sample, now_ms);
        }
        decision
    }
}
