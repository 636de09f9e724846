//! Data model shared between the loop and its collaborators.

/// One raw sensor sample, before the loop stamps it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// SHT21 measurable span. Anything outside is a failed conversion on the
/// bus, not weather.
const TEMP_SPAN_C: (f32, f32) = (-40.0, 125.0);
const HUMIDITY_SPAN_PCT: (f32, f32) = (0.0, 100.0);

impl Measurement {
    /// Whether the sample can have come from a working sensor.
    ///
    /// NaN fails both range checks, so a corrupt conversion never passes.
    pub fn is_plausible(&self) -> bool {
        (TEMP_SPAN_C.0..=TEMP_SPAN_C.1).contains(&self.temperature_c)
            && (HUMIDITY_SPAN_PCT.0..=HUMIDITY_SPAN_PCT.1).contains(&self.humidity_pct)
    }
}

/// A measurement stamped with the node's monotonic uptime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub uptime_s: u32,
}

impl Reading {
    pub fn new(measurement: Measurement, uptime_s: u32) -> Self {
        Self {
            temperature_c: measurement.temperature_c,
            humidity_pct: measurement.humidity_pct,
            uptime_s,
        }
    }
}

impl core::fmt::Display for Reading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:.1} C, {:.0} %RH at {} s",
            self.temperature_c, self.humidity_pct, self.uptime_s
        )
    }
}

/// What the panel is asked to show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    /// No reading yet; shown at boot before the first sample.
    NoData,
    /// A fresh reading plus the current link state for the status header.
    Reading { reading: Reading, link_up: bool },
}
