#[macro_use]
extern crate log;
#[macro_use]
extern crate enum_primitive;

#[cfg(test)]
#[macro_use]
mod test_util;

pub mod announcer;
pub mod aprs;
pub mod beacon_scheduler;
pub mod config;
pub mod control;
pub mod indicator;
pub mod nmea;
pub mod radio;
pub mod rate_model;
pub mod telemetry;
pub mod telemetry_provider;
pub mod termios;
