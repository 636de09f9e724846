//! InfluxDB 1.x line-protocol encoding.
//!
//! Lines carry a `node` tag and omit the timestamp; the server assigns
//! one on arrival. Encoding never allocates; a line that will not fit the
//! fixed buffer is an encode error and the caller drops that write.

use core::fmt::{self, Write};

use crate::alert::Urgency;
use crate::model::Reading;

/// Fixed capacity for one encoded line.
pub const MAX_LINE: usize = 128;

pub type Line = heapless::String<MAX_LINE>;

/// Escapes a tag value the way the line protocol requires.
fn write_tag_value(out: &mut Line, value: &str) -> fmt::Result {
    for c in value.chars() {
        if matches!(c, ',' | ' ' | '=') {
            out.write_char('\\')?;
        }
        out.write_char(c)?;
    }
    Ok(())
}

fn write_prefix(out: &mut Line, channel: &str, node_id: &str) -> fmt::Result {
    out.write_str(channel)?;
    out.write_str(",node=")?;
    write_tag_value(out, node_id)
}

/// Encodes the periodic measurement write:
/// `temperature,node=dewpoint temperature_c=22.5,humidity_pct=40.0`
pub fn measurement_line(channel: &str, node_id: &str, reading: &Reading) -> Result<Line, fmt::Error> {
    let mut line = Line::new();
    write_prefix(&mut line, channel, node_id)?;
    write!(
        line,
        " temperature_c={:.1},humidity_pct={:.1}",
        reading.temperature_c, reading.humidity_pct
    )?;
    Ok(line)
}

/// Encodes the alert write, carrying the urgency that crossed the
/// threshold:
/// `alerts,node=dewpoint urgency=3i,temperature_c=35.1,humidity_pct=40.0`
pub fn alert_line(
    channel: &str,
    node_id: &str,
    reading: &Reading,
    urgency: Urgency,
) -> Result<Line, fmt::Error> {
    let mut line = Line::new();
    write_prefix(&mut line, channel, node_id)?;
    write!(
        line,
        " urgency={urgency}i,temperature_c={:.1},humidity_pct={:.1}",
        reading.temperature_c, reading.humidity_pct
    )?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature_c: f32, humidity_pct: f32) -> Reading {
        Reading {
            temperature_c,
            humidity_pct,
            uptime_s: 300,
        }
    }

    #[test]
    fn measurement_line_layout() {
        let line = measurement_line("temperature", "dewpoint", &reading(22.5, 40.0)).unwrap();
        assert_eq!(
            line.as_str(),
            "temperature,node=dewpoint temperature_c=22.5,humidity_pct=40.0"
        );
    }

    #[test]
    fn negative_temperature_encodes() {
        let line = measurement_line("temperature", "shed", &reading(-12.3, 81.2)).unwrap();
        assert_eq!(
            line.as_str(),
            "temperature,node=shed temperature_c=-12.3,humidity_pct=81.2"
        );
    }

    #[test]
    fn alert_line_layout() {
        let line = alert_line("alerts", "dewpoint", &reading(35.1, 40.0), Urgency::new(3)).unwrap();
        assert_eq!(
            line.as_str(),
            "alerts,node=dewpoint urgency=3i,temperature_c=35.1,humidity_pct=40.0"
        );
    }

    #[test]
    fn node_tag_is_escaped() {
        let line = measurement_line("temperature", "lab rack,2", &reading(22.5, 40.0)).unwrap();
        assert_eq!(
            line.as_str(),
            "temperature,node=lab\\ rack\\,2 temperature_c=22.5,humidity_pct=40.0"
        );
    }

    #[test]
    fn oversized_node_id_is_an_encode_error() {
        let long_id: String = core::iter::repeat('x').take(MAX_LINE).collect();
        assert!(measurement_line("temperature", &long_id, &reading(22.5, 40.0)).is_err());
    }
}
