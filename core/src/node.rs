//! The measurement loop driver.

use log::warn;

use crate::config::Config;
use crate::error::Error;
use crate::model::{Reading, View};
use crate::report::{ReportOutcome, Reporter};
use crate::schedule::ReportCadence;
use crate::traits::{Link, MetricsSink, Panel, Sensor};

/// What one loop iteration did, for logging and the status task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// 1-based iteration count.
    pub iteration: u32,
    /// The reading this iteration produced, if the sensor delivered one.
    pub reading: Option<Reading>,
    /// Whether the panel accepted the frame.
    pub displayed: bool,
    pub report: ReportStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// This iteration is not on a report boundary.
    NotDue,
    /// Due, but the sensor failed, so there was nothing to send.
    Suppressed,
    /// Due and attempted; see the outcome.
    Attempted(ReportOutcome),
}

/// Orchestrates one component of each kind through the trait seams.
///
/// `cycle` runs one iteration; the caller owns the pause between
/// iterations, so the cadence stays count-based no matter what the loop
/// latency does.
pub struct Node<'a> {
    config: &'a Config,
    cadence: ReportCadence,
    reporter: Reporter<'a>,
}

impl<'a> Node<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            cadence: ReportCadence::new(config.report.interval),
            reporter: Reporter::new(&config.report, &config.alert),
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Runs one loop iteration: sample, render, report when due.
    pub async fn cycle<S, P, L, K>(
        &mut self,
        sensor: &mut S,
        panel: &mut P,
        link: &mut L,
        sink: &mut K,
        uptime_s: u32,
    ) -> CycleReport
    where
        S: Sensor,
        P: Panel,
        L: Link,
        K: MetricsSink,
    {
        // Ticks whether or not this iteration produces data; the report
        // boundary is an iteration count, not a success count.
        let due = self.cadence.tick();
        let iteration = self.cadence.iteration();

        let reading = match self.sample(sensor, uptime_s).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("iteration {iteration}: sensor read failed: {e}");
                let report = if due {
                    ReportStatus::Suppressed
                } else {
                    ReportStatus::NotDue
                };
                return CycleReport {
                    iteration,
                    reading: None,
                    displayed: false,
                    report,
                };
            }
        };

        let view = View::Reading {
            reading,
            link_up: link.is_up(),
        };
        let displayed = match panel.show(&view).await {
            Ok(()) => true,
            Err(e) => {
                // Skip the frame, keep the cycle.
                warn!("iteration {iteration}: display update failed: {e}");
                false
            }
        };

        let report = if due {
            ReportStatus::Attempted(self.reporter.report(link, sink, &reading).await)
        } else {
            ReportStatus::NotDue
        };

        CycleReport {
            iteration,
            reading: Some(reading),
            displayed,
            report,
        }
    }

    async fn sample<S: Sensor>(&self, sensor: &mut S, uptime_s: u32) -> Result<Reading, Error> {
        let measurement = sensor.sample().await?;
        if !measurement.is_plausible() {
            return Err(Error::SensorUnavailable);
        }
        Ok(Reading::new(measurement, uptime_s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Measurement;
    use crate::report::ChannelOutcome;
    use embassy_futures::block_on;

    struct FakeSensor {
        measurement: Measurement,
        fail_on: Option<u32>,
        calls: u32,
    }

    impl FakeSensor {
        fn steady(temperature_c: f32, humidity_pct: f32) -> Self {
            Self {
                measurement: Measurement {
                    temperature_c,
                    humidity_pct,
                },
                fail_on: None,
                calls: 0,
            }
        }

        fn failing_on(call: u32, temperature_c: f32, humidity_pct: f32) -> Self {
            Self {
                fail_on: Some(call),
                ..Self::steady(temperature_c, humidity_pct)
            }
        }
    }

    impl Sensor for FakeSensor {
        async fn init(&mut self) -> Result<(), Error> {
            Ok(())
        }

        async fn sample(&mut self) -> Result<Measurement, Error> {
            self.calls += 1;
            if self.fail_on == Some(self.calls) {
                return Err(Error::SensorUnavailable);
            }
            Ok(self.measurement)
        }
    }

    struct FakePanel {
        frames: Vec<View>,
        fail: bool,
    }

    impl FakePanel {
        fn new() -> Self {
            Self {
                frames: Vec::new(),
                fail: false,
            }
        }
    }

    impl Panel for FakePanel {
        async fn show(&mut self, view: &View) -> Result<(), Error> {
            if self.fail {
                return Err(Error::DisplayUnavailable);
            }
            self.frames.push(*view);
            Ok(())
        }
    }

    struct UpLink {
        joins: u32,
    }

    impl Link for UpLink {
        fn is_up(&self) -> bool {
            true
        }

        async fn join(&mut self) -> Result<(), Error> {
            self.joins += 1;
            Ok(())
        }
    }

    struct RecordingSink {
        lines: Vec<String>,
    }

    impl MetricsSink for RecordingSink {
        async fn publish(&mut self, line: &str) -> Result<(), Error> {
            self.lines.push(line.to_string());
            Ok(())
        }
    }

    struct Rig {
        sensor: FakeSensor,
        panel: FakePanel,
        link: UpLink,
        sink: RecordingSink,
    }

    impl Rig {
        fn new(sensor: FakeSensor) -> Self {
            Self {
                sensor,
                panel: FakePanel::new(),
                link: UpLink { joins: 0 },
                sink: RecordingSink { lines: Vec::new() },
            }
        }

        fn run(&mut self, node: &mut Node<'_>, iterations: u32) -> Vec<CycleReport> {
            (0..iterations)
                .map(|i| {
                    block_on(node.cycle(
                        &mut self.sensor,
                        &mut self.panel,
                        &mut self.link,
                        &mut self.sink,
                        i * 10,
                    ))
                })
                .collect()
        }
    }

    static CONFIG: Config = Config::new();

    #[test]
    fn reports_land_on_exact_multiples_of_the_interval() {
        let mut node = Node::new(&CONFIG);
        let mut rig = Rig::new(FakeSensor::steady(22.5, 40.0));

        let cycles = rig.run(&mut node, 90);

        let reported: Vec<u32> = cycles
            .iter()
            .filter(|c| matches!(c.report, ReportStatus::Attempted(_)))
            .map(|c| c.iteration)
            .collect();
        assert_eq!(reported, vec![30, 60, 90]);
        assert_eq!(rig.sink.lines.len(), 3);
    }

    #[test]
    fn sensor_failure_suppresses_display_and_report() {
        let mut node = Node::new(&CONFIG);
        let mut rig = Rig::new(FakeSensor::failing_on(15, 22.5, 40.0));

        let cycles = rig.run(&mut node, 15);
        let failed = &cycles[14];

        assert_eq!(failed.iteration, 15);
        assert_eq!(failed.reading, None);
        assert!(!failed.displayed);
        assert_eq!(failed.report, ReportStatus::NotDue);
        // 14 good frames, nothing for iteration 15.
        assert_eq!(rig.panel.frames.len(), 14);
        assert!(rig.sink.lines.is_empty());
    }

    #[test]
    fn due_iteration_with_failed_sensor_reports_nothing() {
        let mut node = Node::new(&CONFIG);
        let mut rig = Rig::new(FakeSensor::failing_on(30, 22.5, 40.0));

        let cycles = rig.run(&mut node, 60);

        assert_eq!(cycles[29].report, ReportStatus::Suppressed);
        // The cadence stays on multiples of 30: next report at 60, not 31.
        let reported: Vec<u32> = cycles
            .iter()
            .filter(|c| matches!(c.report, ReportStatus::Attempted(_)))
            .map(|c| c.iteration)
            .collect();
        assert_eq!(reported, vec![60]);
    }

    #[test]
    fn out_of_range_sample_counts_as_sensor_failure() {
        let mut node = Node::new(&CONFIG);
        let mut rig = Rig::new(FakeSensor::steady(22.5, 119.0));

        let cycles = rig.run(&mut node, 1);

        assert_eq!(cycles[0].reading, None);
        assert!(rig.panel.frames.is_empty());
    }

    #[test]
    fn scenario_reading_on_iteration_thirty() {
        let mut node = Node::new(&CONFIG);
        let mut rig = Rig::new(FakeSensor::steady(22.5, 40.0));

        let cycles = rig.run(&mut node, 30);
        let due = &cycles[29];

        assert_eq!(due.iteration, 30);
        assert!(due.displayed);
        assert_eq!(
            due.report,
            ReportStatus::Attempted(ReportOutcome::Written {
                measurement: ChannelOutcome::Delivered,
                alert: None,
            })
        );
        assert_eq!(
            rig.sink.lines,
            vec!["temperature,node=dewpoint temperature_c=22.5,humidity_pct=40.0"]
        );
        assert_eq!(
            rig.panel.frames[29],
            View::Reading {
                reading: Reading {
                    temperature_c: 22.5,
                    humidity_pct: 40.0,
                    uptime_s: 290,
                },
                link_up: true,
            }
        );
    }

    #[test]
    fn display_failure_does_not_block_the_report() {
        let mut node = Node::new(&CONFIG);
        let mut rig = Rig::new(FakeSensor::steady(22.5, 40.0));
        rig.panel.fail = true;

        let cycles = rig.run(&mut node, 30);
        let due = &cycles[29];

        assert!(!due.displayed);
        assert!(matches!(due.report, ReportStatus::Attempted(_)));
        assert_eq!(rig.sink.lines.len(), 1);
    }

    #[test]
    fn readings_carry_the_uptime_stamp() {
        let mut node = Node::new(&CONFIG);
        let mut rig = Rig::new(FakeSensor::steady(22.5, 40.0));

        let cycles = rig.run(&mut node, 3);

        let stamps: Vec<u32> = cycles
            .iter()
            .filter_map(|c| c.reading.map(|r| r.uptime_s))
            .collect();
        assert_eq!(stamps, vec![0, 10, 20]);
    }
}
