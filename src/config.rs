/**
 * Tracker settings. The defaults suit a LoRa APRS tracker on 433.775 MHz and everything can be
 * overridden from the command line.
 */
use getopts::{Matches, Options};
use std::str::FromStr;

use crate::announcer::AnnounceSchedule;
use crate::aprs::StationConfig;
use crate::rate_model::RateParameters;
use crate::termios::Speed;


#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub station: StationConfig,
    pub rates: RateParameters,
    pub schedule: AnnounceSchedule,
    pub status_text: String,
    pub comment_text: String,
    pub gps_device: String,
    pub gps_speed: Speed,
    /// Unix socket of the modem bridge. Without one, packets are only logged.
    pub radio_socket: Option<String>,
    pub indicator_pin: Option<u8>,
    pub log_file: Option<String>,
    pub verbose: bool,
}


impl Default for Config {
    fn default() -> Config {
        Config {
            station: StationConfig::default(),
            rates: RateParameters::default(),
            schedule: AnnounceSchedule::default(),
            status_text: "LoRa APRS Smart Beacon tracker".to_string(),
            comment_text: "LoRa tracker on 433.775MHz".to_string(),
            gps_device: "/dev/ttyAMA0".to_string(),
            gps_speed: Speed::B9600,
            radio_socket: None,
            indicator_pin: None,
            log_file: None,
            verbose: false,
        }
    }
}


pub fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("c", "callsign", "Station callsign with SSID.", "CALL-SSID");
    opts.optopt("d", "destination", "Destination address.", "DEST");
    opts.optopt("p", "path", "Relay path, empty for none.", "PATH");
    opts.optopt("", "symbol", "Symbol table and symbol characters.", "TS");
    opts.optopt("", "status", "Status text.", "TEXT");
    opts.optopt("", "comment", "Comment text.", "TEXT");
    opts.optopt("", "status-minutes", "Minutes of the hour to send the status.", "M,M");
    opts.optopt("", "comment-minutes", "Minutes of the hour to send the comment.", "M,M");
    opts.optopt("", "slow-speed", "Speed below which the slow rate applies.", "KM/H");
    opts.optopt("", "fast-speed", "Speed above which the fast rate applies.", "KM/H");
    opts.optopt("", "slow-rate", "Beacon interval when slow.", "SECONDS");
    opts.optopt("", "fast-rate", "Beacon interval when fast.", "SECONDS");
    opts.optopt("", "min-distance", "Distance that triggers a beacon.", "METERS");
    opts.optopt("", "min-interval", "Minimum time between beacons.", "SECONDS");
    opts.optopt("", "turn-min", "Smallest course change that counts as a turn.", "DEGREES");
    opts.optopt("", "turn-slope", "How strongly turns shorten the interval.", "SLOPE");
    opts.optopt("", "gps", "GPS serial device.", "DEVICE");
    opts.optopt("", "baud", "GPS baud rate.", "BAUD");
    opts.optopt("", "radio", "Unix socket of the radio modem bridge.", "SOCKET");
    opts.optopt("", "indicator-pin", "GPIO pin to blink through pi-blaster.", "PIN");
    opts.optopt("", "log-file", "Also write the log to this file.", "FILE");
    opts.optflag("v", "verbose", "Prints extra logging.");
    opts.optflag("h", "help", "Print this help menu.");
    opts
}


pub fn usage() -> String {
    let brief = "Usage: smart-beacon [options]";
    options().usage(brief)
}


/**
 * Builds the configuration from the command line arguments, not including the program name.
 * Returns None if help was requested.
 */
pub fn parse_args(args: &[String]) -> Result<Option<Config>, String> {
    let matches = match options().parse(args) {
        Ok(m) => m,
        Err(e) => return Err(format!("Unable to parse options: {}", e)),
    };
    if matches.opt_present("h") {
        return Ok(None);
    }

    let mut config = Config::default();
    if let Some(callsign) = matches.opt_str("c") {
        config.station.callsign = check_address("callsign", callsign)?;
    }
    if let Some(destination) = matches.opt_str("d") {
        config.station.destination = check_address("destination", destination)?;
    }
    if let Some(path) = matches.opt_str("p") {
        config.station.path = path;
    }
    if let Some(symbol) = matches.opt_str("symbol") {
        let characters: Vec<char> = symbol.chars().collect();
        if characters.len() != 2 {
            return Err(format!("Symbol '{}' must be a table and a symbol character", symbol));
        }
        config.station.symbol_table = characters[0];
        config.station.symbol = characters[1];
    }
    if let Some(status) = matches.opt_str("status") {
        config.status_text = status;
    }
    if let Some(comment) = matches.opt_str("comment") {
        config.comment_text = comment;
    }

    if let Some(minutes) = matches.opt_str("status-minutes") {
        config.schedule.status_minutes = parse_minutes(&minutes)?;
    }
    if let Some(minutes) = matches.opt_str("comment-minutes") {
        config.schedule.comment_minutes = parse_minutes(&minutes)?;
    }
    config.schedule.validate()?;

    let rates = &mut config.rates;
    override_value(&matches, "slow-speed", &mut rates.slow_speed_km_h)?;
    override_value(&matches, "fast-speed", &mut rates.fast_speed_km_h)?;
    override_value(&matches, "slow-rate", &mut rates.slow_rate_s)?;
    override_value(&matches, "fast-rate", &mut rates.fast_rate_s)?;
    override_value(&matches, "min-distance", &mut rates.min_tx_distance_m)?;
    override_value(&matches, "min-interval", &mut rates.min_delta_beacon_s)?;
    override_value(&matches, "turn-min", &mut rates.turn_min_d)?;
    override_value(&matches, "turn-slope", &mut rates.turn_slope)?;
    rates.validate()?;

    if let Some(device) = matches.opt_str("gps") {
        config.gps_device = device;
    }
    let mut baud: u32 = 0;
    if override_value(&matches, "baud", &mut baud)? {
        config.gps_speed = match Speed::from_baud(baud) {
            Some(speed) => speed,
            None => return Err(format!("Unsupported baud rate {}", baud)),
        };
    }
    config.radio_socket = matches.opt_str("radio");
    let mut pin: u8 = 0;
    if override_value(&matches, "indicator-pin", &mut pin)? {
        config.indicator_pin = Some(pin);
    }
    config.log_file = matches.opt_str("log-file");
    config.verbose = matches.opt_present("v");

    Ok(Some(config))
}


/**
 * Replaces the value if the option was given. Returns whether it was.
 */
fn override_value<T: FromStr>(matches: &Matches, name: &str, value: &mut T) -> Result<bool, String> {
    match matches.opt_str(name) {
        Some(text) => match text.parse::<T>() {
            Ok(parsed) => {
                *value = parsed;
                Ok(true)
            },
            Err(_) => Err(format!("Invalid value '{}' for --{}", text, name)),
        },
        None => Ok(false),
    }
}


fn parse_minutes(list: &str) -> Result<Vec<u8>, String> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|minute| match minute.trim().parse::<u8>() {
            Ok(m) => Ok(m),
            Err(_) => Err(format!("Invalid minute '{}'", minute)),
        })
        .collect()
}


/// Addresses end up in the packet header, so they cannot contain its delimiters.
fn check_address(name: &str, address: String) -> Result<String, String> {
    if address.is_empty() || address.contains(|c: char| c == '>' || c == ',' || c == ':') {
        return Err(format!("Invalid {} '{}'", name, address));
    }
    Ok(address)
}


#[cfg(test)]
mod tests {
    use super::{parse_args, usage, Config};
    use crate::termios::Speed;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn test_no_arguments_gives_defaults() {
        let config = parse_args(&[]).unwrap().unwrap();
        assert_eq!(config, Config::default());
        assert!(config.radio_socket.is_none());
        assert!(config.rates.validate().is_ok());
    }

    #[test]
    fn test_help() {
        assert!(parse_args(&args(&["-h"])).unwrap().is_none());
        assert!(usage().contains("--callsign"));
    }

    #[test]
    fn test_station_overrides() {
        let config = parse_args(&args(&[
            "-c", "TA0AAA-9",
            "-d", "APZ001",
            "-p", "WIDE2-1",
            "--symbol", "\\k",
            "--status", "On the road",
            "--comment", "Hello",
        ])).unwrap().unwrap();
        assert_eq!(config.station.callsign, "TA0AAA-9");
        assert_eq!(config.station.destination, "APZ001");
        assert_eq!(config.station.path, "WIDE2-1");
        assert_eq!(config.station.symbol_table, '\\');
        assert_eq!(config.station.symbol, 'k');
        assert_eq!(config.status_text, "On the road");
        assert_eq!(config.comment_text, "Hello");
    }

    #[test]
    fn test_rate_overrides() {
        let config = parse_args(&args(&[
            "--slow-speed", "5",
            "--fast-speed", "90",
            "--slow-rate", "600",
            "--fast-rate", "30",
            "--min-distance", "250.5",
            "--min-interval", "20",
            "--turn-min", "15",
            "--turn-slope", "200",
        ])).unwrap().unwrap();
        assert!(config.rates.slow_speed_km_h == 5.0);
        assert!(config.rates.fast_speed_km_h == 90.0);
        assert!(config.rates.slow_rate_s == 600.0);
        assert!(config.rates.fast_rate_s == 30.0);
        assert!(config.rates.min_tx_distance_m == 250.5);
        assert!(config.rates.min_delta_beacon_s == 20.0);
        assert!(config.rates.turn_min_d == 15.0);
        assert!(config.rates.turn_slope == 200.0);
    }

    #[test]
    fn test_inconsistent_rates_rejected() {
        assert!(parse_args(&args(&["--slow-speed", "80"])).is_err());
        assert!(parse_args(&args(&["--fast-rate", "301"])).is_err());
        assert!(parse_args(&args(&["--slow-rate", "fast"])).is_err());
    }

    #[test]
    fn test_schedule_overrides() {
        let config = parse_args(&args(&[
            "--status-minutes", "0, 15,30",
            "--comment-minutes", "",
        ])).unwrap().unwrap();
        assert_eq!(config.schedule.status_minutes, vec![0, 15, 30]);
        assert!(config.schedule.comment_minutes.is_empty());

        assert!(parse_args(&args(&["--status-minutes", "61"])).is_err());
        assert!(parse_args(&args(&["--comment-minutes", "5,x"])).is_err());
    }

    #[test]
    fn test_hardware_overrides() {
        let config = parse_args(&args(&[
            "--gps", "/dev/ttyS0",
            "--baud", "4800",
            "--radio", "/tmp/lora.sock",
            "--indicator-pin", "2",
            "--log-file", "/tmp/beacon.log",
            "-v",
        ])).unwrap().unwrap();
        assert_eq!(config.gps_device, "/dev/ttyS0");
        assert!(config.gps_speed == Speed::B4800);
        assert_eq!(config.radio_socket, Some("/tmp/lora.sock".to_string()));
        assert_eq!(config.indicator_pin, Some(2));
        assert_eq!(config.log_file, Some("/tmp/beacon.log".to_string()));
        assert!(config.verbose);
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_args(&args(&["--baud", "9601"])).is_err());
        assert!(parse_args(&args(&["--indicator-pin", "300"])).is_err());
        assert!(parse_args(&args(&["--symbol", "/"])).is_err());
        assert!(parse_args(&args(&["-c", "BAD>CALL"])).is_err());
        assert!(parse_args(&args(&["-d", ""])).is_err());
        assert!(parse_args(&args(&["--unknown"])).is_err());
    }
}
