//! Display layout and drawing.
//!
//! Drawing is generic over [`DrawTarget`] so the layout runs (and is
//! tested) on the host; the board crate owns only controller init and the
//! flush. The font is 8 px tall to match the configured line height.

use core::fmt::Write;

use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_5X8},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::config::{Align, DisplayConfig};
use crate::model::View;

/// Text shown in place of a value before the first reading arrives.
const NO_DATA_TEXT: &str = "no data";

/// Marker in the top-right corner while the uplink is usable.
const LINK_MARKER: &str = "net";

/// Temperature the way the panel shows it: one decimal, no unit.
pub fn format_temperature(temperature_c: f32) -> heapless::String<8> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{temperature_c:.1}");
    s
}

/// Humidity the way the panel shows it: whole percent, no unit.
pub fn format_humidity(humidity_pct: f32) -> heapless::String<8> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{humidity_pct:.0}");
    s
}

/// X anchor for the humidity value: the canvas edge its alignment hangs
/// from.
pub fn humidity_anchor_x(cfg: &DisplayConfig) -> i32 {
    match cfg.humidity_align {
        Align::Left => 0,
        Align::Right => cfg.width as i32 - 1,
    }
}

fn text_alignment(align: Align) -> Alignment {
    match align {
        Align::Left => Alignment::Left,
        Align::Right => Alignment::Right,
    }
}

/// Renders a view onto any monochrome target with the configured layout.
///
/// The caller clears nothing and flushes nothing; this draws a full frame
/// over a cleared canvas and leaves pushing it to the glass to the panel.
pub fn draw_view<D>(
    target: &mut D,
    cfg: &DisplayConfig,
    view: &View,
    node_id: &str,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    let character = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
    let left = TextStyleBuilder::new().baseline(Baseline::Top).build();
    let right = TextStyleBuilder::new()
        .baseline(Baseline::Top)
        .alignment(Alignment::Right)
        .build();

    // Status header: node id on the left, link marker on the right.
    Text::with_text_style(node_id, Point::zero(), character, left).draw(target)?;

    let temp_style = TextStyleBuilder::new()
        .baseline(Baseline::Top)
        .alignment(text_alignment(cfg.temp_anchor.align))
        .build();
    let temp_point = Point::new(cfg.temp_anchor.x, cfg.temp_anchor.y);

    match view {
        View::NoData => {
            Text::with_text_style(NO_DATA_TEXT, temp_point, character, temp_style)
                .draw(target)?;
        }
        View::Reading { reading, link_up } => {
            if *link_up {
                Text::with_text_style(
                    LINK_MARKER,
                    Point::new(cfg.width as i32 - 1, 0),
                    character,
                    right,
                )
                .draw(target)?;
            }

            let temperature = format_temperature(reading.temperature_c);
            Text::with_text_style(temperature.as_str(), temp_point, character, temp_style)
                .draw(target)?;

            let humidity = format_humidity(reading.humidity_pct);
            let humidity_style = TextStyleBuilder::new()
                .baseline(Baseline::Top)
                .alignment(text_alignment(cfg.humidity_align))
                .build();
            Text::with_text_style(
                humidity.as_str(),
                Point::new(humidity_anchor_x(cfg), cfg.humidity_y),
                character,
                humidity_style,
            )
            .draw(target)?;
        }
    }

    Ok(())
}
