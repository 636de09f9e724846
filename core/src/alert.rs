//! Alert policy: the 0-9 urgency score derived from each reading.

use crate::config::AlertConfig;
use crate::model::Reading;

/// Severity of a reading on the node's 0-9 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Urgency(u8);

impl Urgency {
    /// Highest representable severity.
    pub const MAX: Urgency = Urgency(9);

    /// Clamps `raw` onto the 0-9 scale.
    pub const fn new(raw: u8) -> Self {
        if raw > Self::MAX.0 {
            Self::MAX
        } else {
            Urgency(raw)
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for Urgency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scores one band: 0 inside, one point per `step` (or part of one) of
/// excursion beyond the nearer edge.
fn band_score(value: f32, low: f32, high: f32, step: f32) -> Urgency {
    let excursion = if value < low {
        low - value
    } else if value > high {
        value - high
    } else {
        return Urgency::new(0);
    };

    // Round the step count up without f32::ceil, which core does not have.
    let whole = (excursion / step) as u32;
    let points = if (whole as f32) * step < excursion {
        whole + 1
    } else {
        whole
    };
    Urgency::new(points.min(u8::MAX as u32) as u8)
}

/// Computes a reading's urgency against the configured comfort bands.
///
/// The score is the worse of the temperature and humidity components.
pub fn urgency_for(reading: &Reading, cfg: &AlertConfig) -> Urgency {
    let temperature = band_score(
        reading.temperature_c,
        cfg.temp_low_c,
        cfg.temp_high_c,
        cfg.temp_step_c,
    );
    let humidity = band_score(
        reading.humidity_pct,
        cfg.humidity_low_pct,
        cfg.humidity_high_pct,
        cfg.humidity_step_pct,
    );
    temperature.max(humidity)
}

/// Whether `urgency` crosses the publication threshold.
pub fn should_alert(urgency: Urgency, cfg: &AlertConfig) -> bool {
    urgency >= cfg.urgency_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn reading(temperature_c: f32, humidity_pct: f32) -> Reading {
        Reading {
            temperature_c,
            humidity_pct,
            uptime_s: 0,
        }
    }

    #[test]
    fn urgency_clamps_to_nine() {
        assert_eq!(Urgency::new(12), Urgency::MAX);
        assert_eq!(Urgency::new(9), Urgency::MAX);
        assert_eq!(Urgency::new(3).get(), 3);
    }

    #[test]
    fn comfortable_reading_scores_zero() {
        let cfg = Config::new().alert;
        assert_eq!(urgency_for(&reading(22.5, 40.0), &cfg), Urgency::new(0));
    }

    #[test]
    fn band_edges_score_zero() {
        let cfg = Config::new().alert;
        assert_eq!(urgency_for(&reading(15.0, 20.0), &cfg), Urgency::new(0));
        assert_eq!(urgency_for(&reading(30.0, 70.0), &cfg), Urgency::new(0));
    }

    #[test]
    fn one_point_per_step_beyond_the_edge() {
        let cfg = Config::new().alert;
        // 2 degrees per point above 30.
        assert_eq!(urgency_for(&reading(30.5, 40.0), &cfg), Urgency::new(1));
        assert_eq!(urgency_for(&reading(32.0, 40.0), &cfg), Urgency::new(1));
        assert_eq!(urgency_for(&reading(34.0, 40.0), &cfg), Urgency::new(2));
        assert_eq!(urgency_for(&reading(35.0, 40.0), &cfg), Urgency::new(3));
        // The cold side counts the same way below 15.
        assert_eq!(urgency_for(&reading(10.0, 40.0), &cfg), Urgency::new(3));
    }

    #[test]
    fn humidity_scores_like_temperature() {
        let cfg = Config::new().alert;
        assert_eq!(urgency_for(&reading(22.0, 72.0), &cfg), Urgency::new(1));
        assert_eq!(urgency_for(&reading(22.0, 85.0), &cfg), Urgency::new(3));
        assert_eq!(urgency_for(&reading(22.0, 5.0), &cfg), Urgency::new(3));
    }

    #[test]
    fn worse_component_wins() {
        let cfg = Config::new().alert;
        // Temperature at 2 points, humidity at 3: the score is 3.
        assert_eq!(urgency_for(&reading(34.0, 85.0), &cfg), Urgency::new(3));
    }

    #[test]
    fn extreme_excursion_saturates_at_nine() {
        let cfg = Config::new().alert;
        assert_eq!(urgency_for(&reading(120.0, 40.0), &cfg), Urgency::MAX);
    }

    #[test]
    fn alert_threshold_is_inclusive() {
        let cfg = Config::new().alert;
        assert!(should_alert(Urgency::new(3), &cfg));
        assert!(should_alert(Urgency::new(9), &cfg));
        assert!(!should_alert(Urgency::new(2), &cfg));
        assert!(!should_alert(Urgency::new(0), &cfg));
    }
}
