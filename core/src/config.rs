//! Node configuration.
//!
//! One immutable [`Config`] is built at startup and passed by reference
//! into every component, replacing the pile of `#define`s the firmware
//! variants of this node historically shared. [`Config::new`] is `const`
//! and infallible; the values it carries are the canonical wiring and
//! cadence for the node.

use crate::alert::Urgency;

/// Horizontal alignment selector for a display field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Align {
    /// The anchor x is the left edge of the rendered text.
    Left = 0,
    /// The anchor x is the right edge of the rendered text.
    Right = 1,
}

/// A fixed layout position for one display field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
    pub align: Align,
}

/// Shared I2C bus wiring. Pins and addresses are named fields so SDA/SCL
/// or display/sensor cannot be transposed silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// GPIO number carrying SDA.
    pub sda_pin: u8,
    /// GPIO number carrying SCL.
    pub scl_pin: u8,
    /// I2C address of the OLED display.
    pub display_addr: u8,
    /// I2C address of the SHT21 sensor board.
    pub sensor_addr: u8,
}

/// Display geometry and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// GPIO number of the display reset line, pulsed once at init.
    pub reset_pin: u8,
    /// Height in pixels of one rendered text line.
    pub line_height: u32,
    /// Where the temperature value goes.
    pub temp_anchor: Anchor,
    /// Vertical offset of the humidity value.
    pub humidity_y: i32,
    /// Which canvas edge the humidity value hangs from.
    pub humidity_align: Align,
}

/// Reporting cadence, channels and retry ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    /// Channel name for the periodic measurement write.
    pub measurement: &'static str,
    /// Channel name for threshold alerts.
    pub alert_channel: &'static str,
    /// Loop iterations between reports. Count-based: cadence follows the
    /// iteration counter, not the wall clock.
    pub interval: u32,
    /// Most link association attempts per report cycle, inclusive.
    pub wifi_max_tries: u32,
    /// Most write attempts per channel write, inclusive.
    pub influx_max_tries: u32,
    /// Stable identity tagged onto every metrics write.
    pub node_id: &'static str,
}

/// Comfort bands and the alert threshold.
///
/// A reading scores 0 while both values sit inside their band, and one
/// urgency point per step (or part of one) of excursion beyond an edge,
/// saturating at [`Urgency::MAX`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertConfig {
    /// Lower edge of the temperature comfort band, Celsius.
    pub temp_low_c: f32,
    /// Upper edge of the temperature comfort band, Celsius.
    pub temp_high_c: f32,
    /// Degrees of excursion per urgency point.
    pub temp_step_c: f32,
    /// Lower edge of the humidity comfort band, percent RH.
    pub humidity_low_pct: f32,
    /// Upper edge of the humidity comfort band, percent RH.
    pub humidity_high_pct: f32,
    /// Percent RH of excursion per urgency point.
    pub humidity_step_pct: f32,
    /// Alerts publish when a reading's urgency reaches this level.
    pub urgency_threshold: Urgency,
}

/// Everything the node needs to know, in one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub bus: BusConfig,
    pub display: DisplayConfig,
    pub report: ReportConfig,
    pub alert: AlertConfig,
    /// Pause between loop iterations, in ms.
    pub loop_delay_ms: u32,
}

impl Config {
    /// The canonical node configuration.
    pub const fn new() -> Self {
        Self {
            bus: BusConfig {
                sda_pin: 4,
                scl_pin: 15,
                display_addr: 0x3C,
                sensor_addr: 0x40,
            },
            display: DisplayConfig {
                width: 128,
                height: 64,
                reset_pin: 16,
                line_height: 8,
                temp_anchor: Anchor {
                    x: 1,
                    y: 36,
                    align: Align::Left,
                },
                humidity_y: 30,
                humidity_align: Align::Right,
            },
            report: ReportConfig {
                measurement: "temperature",
                alert_channel: "alerts",
                interval: 30,
                wifi_max_tries: 12,
                influx_max_tries: 3,
                node_id: "dewpoint",
            },
            alert: AlertConfig {
                temp_low_c: 15.0,
                temp_high_c: 30.0,
                temp_step_c: 2.0,
                humidity_low_pct: 20.0,
                humidity_high_pct: 70.0,
                humidity_step_pct: 5.0,
                urgency_threshold: Urgency::new(3),
            },
            loop_delay_ms: 10_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
