//! Deploy-time settings.
//!
//! Everything hardware-shaped lives in the shared [`Config`]; what varies
//! per deployment (credentials, endpoint, node identity) is compiled in
//! from the environment, e.g.
//!
//! ```text
//! DEWPOINT_WIFI_SSID=attic DEWPOINT_WIFI_PASSWORD=... cargo build --release
//! ```
//!
//! Unset variables fall back to bench defaults.

use dewpoint_core::Config;

pub const WIFI_SSID: &str = match option_env!("DEWPOINT_WIFI_SSID") {
    Some(v) => v,
    None => "dewpoint-bench",
};

pub const WIFI_PASSWORD: &str = match option_env!("DEWPOINT_WIFI_PASSWORD") {
    Some(v) => v,
    None => "",
};

/// InfluxDB host as a dotted quad; the network stack does no DNS.
pub const INFLUX_HOST: &str = match option_env!("DEWPOINT_INFLUX_HOST") {
    Some(v) => v,
    None => "192.168.1.10",
};

pub const INFLUX_PORT: &str = match option_env!("DEWPOINT_INFLUX_PORT") {
    Some(v) => v,
    None => "8086",
};

pub const INFLUX_DATABASE: &str = match option_env!("DEWPOINT_INFLUX_DATABASE") {
    Some(v) => v,
    None => "sensors",
};

pub const NODE_ID: &str = match option_env!("DEWPOINT_NODE_ID") {
    Some(v) => v,
    None => "dewpoint",
};

/// The node configuration: canonical wiring plus this deploy's identity.
pub const fn config() -> Config {
    let mut config = Config::new();
    config.report.node_id = NODE_ID;
    config
}
