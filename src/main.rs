#[macro_use]
extern crate log;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config as LogConfig, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::env;
use std::fs::File;
use std::process;

use smart_beacon::config::{self, Config};
use smart_beacon::control::Tracker;
use smart_beacon::indicator::{Indicator, NullIndicator, PiBlasterIndicator};
use smart_beacon::radio::{LogRadio, Radio, SocketRadio};
use smart_beacon::telemetry_provider::TelemetryProvider;


fn main() {
    let config = match handle_opts() {
        Some(config) => config,
        None => return,
    };
    info!("Starting up as {}", config.station.callsign);

    let telemetry = match TelemetryProvider::open(&config.gps_device, config.gps_speed) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            error!("Unable to open GPS {}: {}", config.gps_device, e);
            process::exit(1);
        }
    };

    let radio: Box<dyn Radio> = match config.radio_socket {
        Some(ref path) => match SocketRadio::connect(path) {
            Ok(radio) => Box::new(radio),
            Err(e) => {
                error!("Unable to connect to radio bridge {}: {}", path, e);
                process::exit(1);
            }
        },
        None => {
            warn!("No radio configured, packets will only be logged");
            Box::new(LogRadio)
        },
    };

    let indicator: Box<dyn Indicator> = match config.indicator_pin {
        Some(pin) => match PiBlasterIndicator::new(pin) {
            Ok(indicator) => Box::new(indicator),
            Err(e) => {
                warn!("Unable to open pi-blaster, not blinking pin {}: {}", pin, e);
                Box::new(NullIndicator)
            }
        },
        None => Box::new(NullIndicator),
    };

    let mut tracker = Tracker::new(telemetry, &config, radio, indicator);
    tracker.run();

    info!("Shutting down after {} beacons", tracker.beacons_sent());
}


/**
 * Parses the command line and sets up logging. Returns None if the program should exit.
 */
fn handle_opts() -> Option<Config> {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match config::parse_args(&args) {
        Ok(Some(config)) => config,
        Ok(None) => {
            print!("{}", config::usage());
            return None;
        },
        Err(e) => {
            eprintln!("{}", e);
            print!("{}", config::usage());
            process::exit(2);
        }
    };

    let level = if config.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto));
    if let Some(ref path) = config.log_file {
        match File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(level, LogConfig::default(), file)),
            Err(e) => eprintln!("Unable to open log file {}: {}", path, e),
        }
    }
    match CombinedLogger::init(loggers) {
        Ok(_) => (),
        Err(e) => {
            eprintln!("Unable to initialize logger: {}", e);
            process::exit(1);
        }
    };

    Some(config)
}
