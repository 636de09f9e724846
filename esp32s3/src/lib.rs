//! ESP32-S3 board crate for the dewpoint sensor node.
//!
//! Wires `dewpoint-core` to real peripherals: the shared I2C bus with the
//! SHT21 and the SSD1306, the Wi-Fi uplink and the InfluxDB write client.
//! Pin numbers and addresses come from the shared [`dewpoint_core::Config`];
//! binaries map them onto the matching GPIO peripherals at startup.
#![no_std]

pub mod hardware;
pub mod net;
pub mod panel;
pub mod settings;
