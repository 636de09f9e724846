//! Platform-independent logic for the dewpoint sensor node.
//!
//! The measurement loop, report cadence, alert policy, display layout and
//! wire encoding live here, generic over the hardware traits in [`traits`].
//! Nothing in this crate touches a peripheral, so the whole crate builds
//! and tests on the host with plain `cargo test`; the board crates supply
//! trait implementations for real sensors, panels and radios.
#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod config;
pub mod error;
pub mod model;
pub mod node;
pub mod proto;
pub mod render;
pub mod report;
pub mod schedule;
pub mod traits;

pub use config::Config;
pub use error::Error;
pub use model::{Measurement, Reading, View};
pub use node::{CycleReport, Node};
