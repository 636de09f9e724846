//! Network reporter.
//!
//! Wraps the link and the metrics sink in the retry discipline the node
//! runs on: bounded link bring-up, bounded per-channel writes, and a
//! dropped report (never a crash) when either budget runs out.

use log::{debug, warn};

use crate::alert::{self, Urgency};
use crate::config::{AlertConfig, ReportConfig};
use crate::model::Reading;
use crate::proto;
use crate::traits::{Link, MetricsSink};

/// Link-layer state the reporter keeps between report cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// What happened to one channel write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Delivered,
    /// All write attempts failed; the data is gone.
    Dropped,
}

/// What one report cycle produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The link never came up; nothing was written.
    LinkDown,
    /// The link was up; per-channel results.
    Written {
        measurement: ChannelOutcome,
        /// `None` while urgency stays under the alert threshold.
        alert: Option<ChannelOutcome>,
    },
}

pub struct Reporter<'a> {
    report: &'a ReportConfig,
    alert: &'a AlertConfig,
    state: LinkState,
}

impl<'a> Reporter<'a> {
    pub fn new(report: &'a ReportConfig, alert: &'a AlertConfig) -> Self {
        Self {
            report,
            alert,
            state: LinkState::Disconnected,
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.state
    }

    /// Runs one report cycle with the most recent reading.
    pub async fn report<L: Link, S: MetricsSink>(
        &mut self,
        link: &mut L,
        sink: &mut S,
        reading: &Reading,
    ) -> ReportOutcome {
        // An association that died since the last cycle starts this one
        // from Disconnected.
        if self.state == LinkState::Connected && !link.is_up() {
            debug!("link went down since the last report");
            self.state = LinkState::Disconnected;
        }

        if self.state == LinkState::Disconnected && !self.bring_up(link).await {
            return ReportOutcome::LinkDown;
        }

        let urgency = alert::urgency_for(reading, self.alert);
        let measurement = self.write_measurement(sink, reading).await;
        let alert = if alert::should_alert(urgency, self.alert) {
            Some(self.write_alert(sink, reading, urgency).await)
        } else {
            None
        };

        ReportOutcome::Written { measurement, alert }
    }

    async fn bring_up<L: Link>(&mut self, link: &mut L) -> bool {
        for attempt in 1..=self.report.wifi_max_tries {
            match link.join().await {
                Ok(()) => {
                    debug!("link up after {attempt} attempt(s)");
                    self.state = LinkState::Connected;
                    return true;
                }
                Err(e) => {
                    warn!("link attempt {attempt}/{}: {e}", self.report.wifi_max_tries);
                }
            }
        }
        self.state = LinkState::Disconnected;
        false
    }

    async fn write_channel<S: MetricsSink>(&self, sink: &mut S, line: &str) -> ChannelOutcome {
        for attempt in 1..=self.report.influx_max_tries {
            match sink.publish(line).await {
                Ok(()) => return ChannelOutcome::Delivered,
                Err(e) => {
                    warn!(
                        "write attempt {attempt}/{}: {e}",
                        self.report.influx_max_tries
                    );
                }
            }
        }
        ChannelOutcome::Dropped
    }

    async fn write_measurement<S: MetricsSink>(
        &self,
        sink: &mut S,
        reading: &Reading,
    ) -> ChannelOutcome {
        match proto::measurement_line(self.report.measurement, self.report.node_id, reading) {
            Ok(line) => self.write_channel(sink, &line).await,
            Err(_) => {
                warn!("measurement line over capacity; dropped");
                ChannelOutcome::Dropped
            }
        }
    }

    async fn write_alert<S: MetricsSink>(
        &self,
        sink: &mut S,
        reading: &Reading,
        urgency: Urgency,
    ) -> ChannelOutcome {
        match proto::alert_line(self.report.alert_channel, self.report.node_id, reading, urgency) {
            Ok(line) => self.write_channel(sink, &line).await,
            Err(_) => {
                warn!("alert line over capacity; dropped");
                ChannelOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Error;
    use embassy_futures::block_on;

    struct ScriptLink {
        up: bool,
        fail_next: u32,
        joins: u32,
    }

    impl ScriptLink {
        fn down(fail_next: u32) -> Self {
            Self {
                up: false,
                fail_next,
                joins: 0,
            }
        }

        fn already_up() -> Self {
            Self {
                up: true,
                fail_next: 0,
                joins: 0,
            }
        }
    }

    impl Link for ScriptLink {
        fn is_up(&self) -> bool {
            self.up
        }

        async fn join(&mut self) -> Result<(), Error> {
            self.joins += 1;
            if self.fail_next > 0 {
                self.fail_next -= 1;
                return Err(Error::LinkUnavailable);
            }
            self.up = true;
            Ok(())
        }
    }

    struct RecordingSink {
        lines: Vec<String>,
        fail_next: u32,
        attempts: u32,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                lines: Vec::new(),
                fail_next: 0,
                attempts: 0,
            }
        }

        fn failing(fail_next: u32) -> Self {
            Self {
                fail_next,
                ..Self::new()
            }
        }
    }

    impl MetricsSink for RecordingSink {
        async fn publish(&mut self, line: &str) -> Result<(), Error> {
            self.attempts += 1;
            if self.fail_next > 0 {
                self.fail_next -= 1;
                return Err(Error::ReportWriteFailed);
            }
            self.lines.push(line.to_string());
            Ok(())
        }
    }

    fn reading(temperature_c: f32, humidity_pct: f32) -> Reading {
        Reading {
            temperature_c,
            humidity_pct,
            uptime_s: 300,
        }
    }

    static CONFIG: Config = Config::new();

    fn reporter() -> Reporter<'static> {
        Reporter::new(&CONFIG.report, &CONFIG.alert)
    }

    #[test]
    fn twelve_link_failures_drop_the_report() {
        let mut reporter = reporter();
        let mut link = ScriptLink::down(u32::MAX);
        let mut sink = RecordingSink::new();

        let outcome = block_on(reporter.report(&mut link, &mut sink, &reading(22.5, 40.0)));

        assert_eq!(outcome, ReportOutcome::LinkDown);
        assert_eq!(link.joins, 12, "the 13th attempt must never happen");
        assert_eq!(sink.attempts, 0);
        assert_eq!(reporter.link_state(), LinkState::Disconnected);
    }

    #[test]
    fn link_comes_up_on_the_last_allowed_attempt() {
        let mut reporter = reporter();
        let mut link = ScriptLink::down(11);
        let mut sink = RecordingSink::new();

        let outcome = block_on(reporter.report(&mut link, &mut sink, &reading(22.5, 40.0)));

        assert_eq!(link.joins, 12);
        assert_eq!(reporter.link_state(), LinkState::Connected);
        assert_eq!(
            outcome,
            ReportOutcome::Written {
                measurement: ChannelOutcome::Delivered,
                alert: None,
            }
        );
    }

    #[test]
    fn three_write_failures_drop_the_measurement() {
        let mut reporter = reporter();
        let mut link = ScriptLink::already_up();
        let mut sink = RecordingSink::failing(u32::MAX);

        let outcome = block_on(reporter.report(&mut link, &mut sink, &reading(22.5, 40.0)));

        assert_eq!(sink.attempts, 3, "the 4th attempt must never happen");
        assert_eq!(
            outcome,
            ReportOutcome::Written {
                measurement: ChannelOutcome::Dropped,
                alert: None,
            }
        );
        // Write failure is not a link failure.
        assert_eq!(reporter.link_state(), LinkState::Connected);
    }

    #[test]
    fn write_succeeds_within_budget() {
        let mut reporter = reporter();
        let mut link = ScriptLink::already_up();
        let mut sink = RecordingSink::failing(2);

        let outcome = block_on(reporter.report(&mut link, &mut sink, &reading(22.5, 40.0)));

        assert_eq!(sink.attempts, 3);
        assert_eq!(
            outcome,
            ReportOutcome::Written {
                measurement: ChannelOutcome::Delivered,
                alert: None,
            }
        );
        assert_eq!(
            sink.lines,
            vec!["temperature,node=dewpoint temperature_c=22.5,humidity_pct=40.0"]
        );
    }

    #[test]
    fn urgent_reading_writes_both_channels() {
        let mut reporter = reporter();
        let mut link = ScriptLink::already_up();
        let mut sink = RecordingSink::new();

        // 35 C is three steps over the band edge: urgency 3, at threshold.
        let outcome = block_on(reporter.report(&mut link, &mut sink, &reading(35.0, 40.0)));

        assert_eq!(
            outcome,
            ReportOutcome::Written {
                measurement: ChannelOutcome::Delivered,
                alert: Some(ChannelOutcome::Delivered),
            }
        );
        assert_eq!(
            sink.lines,
            vec![
                "temperature,node=dewpoint temperature_c=35.0,humidity_pct=40.0",
                "alerts,node=dewpoint urgency=3i,temperature_c=35.0,humidity_pct=40.0",
            ]
        );
    }

    #[test]
    fn urgency_below_threshold_skips_the_alert_channel() {
        let mut reporter = reporter();
        let mut link = ScriptLink::already_up();
        let mut sink = RecordingSink::new();

        // 34 C scores 2: one short of the threshold.
        let outcome = block_on(reporter.report(&mut link, &mut sink, &reading(34.0, 40.0)));

        assert_eq!(
            outcome,
            ReportOutcome::Written {
                measurement: ChannelOutcome::Delivered,
                alert: None,
            }
        );
        assert_eq!(sink.lines.len(), 1);
    }

    #[test]
    fn alert_write_has_its_own_budget() {
        let mut reporter = reporter();
        let mut link = ScriptLink::already_up();
        // Eat the measurement's whole budget; the alert write then lands.
        let mut sink = RecordingSink::failing(3);

        let outcome = block_on(reporter.report(&mut link, &mut sink, &reading(35.0, 40.0)));

        assert_eq!(sink.attempts, 4);
        assert_eq!(
            outcome,
            ReportOutcome::Written {
                measurement: ChannelOutcome::Dropped,
                alert: Some(ChannelOutcome::Delivered),
            }
        );
    }

    #[test]
    fn established_link_is_reused() {
        let mut reporter = reporter();
        let mut link = ScriptLink::down(0);
        let mut sink = RecordingSink::new();

        block_on(reporter.report(&mut link, &mut sink, &reading(22.5, 40.0)));
        assert_eq!(link.joins, 1);

        block_on(reporter.report(&mut link, &mut sink, &reading(22.5, 40.0)));
        assert_eq!(link.joins, 1, "second cycle must not rejoin");
        assert_eq!(sink.lines.len(), 2);
    }

    #[test]
    fn dead_association_is_rebuilt_before_writing() {
        let mut reporter = reporter();
        let mut link = ScriptLink::down(0);
        let mut sink = RecordingSink::new();

        block_on(reporter.report(&mut link, &mut sink, &reading(22.5, 40.0)));
        link.up = false;

        let outcome = block_on(reporter.report(&mut link, &mut sink, &reading(22.5, 40.0)));
        assert_eq!(link.joins, 2);
        assert!(matches!(outcome, ReportOutcome::Written { .. }));
    }
}
