//! Hardware abstraction traits.
//!
//! The board crate implements these against real peripherals; everything
//! above them stays host-testable. Retry budgets live in the reporter, so
//! `Link::join` and `MetricsSink::publish` each stand for exactly one
//! attempt.

use crate::error::Error;
use crate::model::{Measurement, View};

/// A temperature/humidity sensor on the shared bus.
pub trait Sensor {
    /// Put the device into a known state before the first sample.
    async fn init(&mut self) -> Result<(), Error>;

    /// Take one measurement.
    async fn sample(&mut self) -> Result<Measurement, Error>;
}

/// The front panel: a small monochrome display.
pub trait Panel {
    /// Render a view and push it to the glass.
    async fn show(&mut self, view: &View) -> Result<(), Error>;
}

/// The network uplink.
pub trait Link {
    /// Whether the link is currently usable.
    fn is_up(&self) -> bool;

    /// Make one association attempt.
    async fn join(&mut self) -> Result<(), Error>;
}

/// A metrics endpoint accepting line-protocol writes.
pub trait MetricsSink {
    /// Make one attempt to deliver an encoded line.
    async fn publish(&mut self, line: &str) -> Result<(), Error>;
}
