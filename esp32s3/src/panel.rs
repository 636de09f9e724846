//! SSD1306 front panel.
//!
//! Controller bring-up and the flush live here; what a frame looks like is
//! `dewpoint_core::render`'s business.

use embedded_hal::i2c::I2c as I2cBus;
use esp_hal::{delay::Delay, gpio::Output};
use log::info;
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

use dewpoint_core::render::draw_view;
use dewpoint_core::{Config, Error, View, traits::Panel};

/// Width of the reset pulse and the settle time around it. The controller
/// needs only microseconds low; 10 ms also rides out the power-on ramp.
const RESET_PULSE_MS: u32 = 10;

type Driver<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// The 128x64 OLED behind the [`Panel`] seam.
pub struct Oled<'a, I2C> {
    display: Driver<I2C>,
    reset: Output<'a>,
    config: &'a Config,
}

impl<'a, I2C: I2cBus> Oled<'a, I2C> {
    pub fn new(i2c: I2C, reset: Output<'a>, config: &'a Config) -> Self {
        let interface = I2CDisplayInterface::new_custom_address(i2c, config.bus.display_addr);
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self {
            display,
            reset,
            config,
        }
    }

    /// One-time bring-up: reset pulse, controller init, boot splash.
    ///
    /// The reset line is pulsed here and never again; a failure on a later
    /// frame skips that frame rather than re-running this.
    pub fn init(&mut self) -> Result<(), Error> {
        let delay = Delay::new();
        self.reset.set_high();
        delay.delay_millis(RESET_PULSE_MS);
        self.reset.set_low();
        delay.delay_millis(RESET_PULSE_MS);
        self.reset.set_high();
        delay.delay_millis(RESET_PULSE_MS);

        self.display.init().map_err(|_| Error::DisplayUnavailable)?;
        info!(
            "SSD1306 up at 0x{:02X}, reset on GPIO{}",
            self.config.bus.display_addr, self.config.display.reset_pin
        );

        self.render(&View::NoData)
    }

    fn render(&mut self, view: &View) -> Result<(), Error> {
        draw_view(
            &mut self.display,
            &self.config.display,
            view,
            self.config.report.node_id,
        )
        .map_err(|_| Error::DisplayUnavailable)?;
        self.display.flush().map_err(|_| Error::DisplayUnavailable)
    }
}

impl<I2C: I2cBus> Panel for Oled<'_, I2C> {
    async fn show(&mut self, view: &View) -> Result<(), Error> {
        self.render(view)
    }
}
