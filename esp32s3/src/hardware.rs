//! Shared I2C bus bring-up and the SHT21 driver.

use core::cell::RefCell;

use embedded_hal::i2c::I2c as I2cBus;
use embedded_hal_bus::i2c::RefCellDevice;
use esp_hal::{
    delay::Delay,
    gpio::AnyPin,
    i2c::master::{Config as I2cConfig, I2c},
    peripherals::I2C0,
    time::Rate,
};

use dewpoint_core::config::BusConfig;
use dewpoint_core::{Error, Measurement, traits::Sensor};

const BUS_FREQ_KHZ: u32 = 100;

/// The shared bus. Sensor and panel hold [`RefCellDevice`] handles, so
/// their transactions stay serialized within one loop iteration.
pub struct Bus<'a> {
    i2c: RefCell<I2c<'a, esp_hal::Blocking>>,
}

impl<'a> Bus<'a> {
    pub fn new<SDA, SCL>(i2c_periph: I2C0<'a>, sda: SDA, scl: SCL) -> Self
    where
        SDA: Into<AnyPin<'a>>,
        SCL: Into<AnyPin<'a>>,
    {
        let i2c = I2c::new(
            i2c_periph,
            I2cConfig::default().with_frequency(Rate::from_khz(BUS_FREQ_KHZ)),
        )
        .unwrap()
        .with_sda(sda.into())
        .with_scl(scl.into());

        Self {
            i2c: RefCell::new(i2c),
        }
    }

    /// A device handle for one address holder on the bus.
    pub fn device(&self) -> RefCellDevice<'_, I2c<'a, esp_hal::Blocking>> {
        RefCellDevice::new(&self.i2c)
    }

    /// Walks the 7-bit address space and reports what answers.
    pub fn scan(&self, cfg: &BusConfig) {
        let mut i2c = self.i2c.borrow_mut();
        esp_println::println!("I2C scan start");
        for addr in 0x03..=0x77u8 {
            if i2c.write(addr, &[]).is_ok() {
                let note = if addr == cfg.display_addr {
                    " (display)"
                } else if addr == cfg.sensor_addr {
                    " (sensor)"
                } else {
                    ""
                };
                esp_println::println!("Found device at 0x{:02X}{}", addr, note);
            }
        }
        esp_println::println!("I2C scan done");
    }
}

const CMD_SOFT_RESET: u8 = 0xFE;
const CMD_MEASURE_TEMP_NO_HOLD: u8 = 0xF3;
const CMD_MEASURE_HUMIDITY_NO_HOLD: u8 = 0xF5;

/// Datasheet maximum conversion and reset times at full resolution, ms.
const TEMP_CONVERSION_MS: u32 = 85;
const HUMIDITY_CONVERSION_MS: u32 = 29;
const SOFT_RESET_MS: u32 = 15;

/// SHT21 temperature/humidity sensor in no-hold-master mode.
///
/// No-hold keeps the bus free during conversions instead of clock
/// stretching through them.
pub struct Sht21<I2C> {
    i2c: I2C,
    address: u8,
    delay: Delay,
}

impl<I2C: I2cBus> Sht21<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            delay: Delay::new(),
        }
    }

    fn command(&mut self, cmd: u8) -> Result<(), Error> {
        self.i2c
            .write(self.address, &[cmd])
            .map_err(|_| Error::SensorUnavailable)
    }

    /// One raw conversion: trigger, wait it out, read data msb/lsb + CRC.
    fn measure_raw(&mut self, cmd: u8, conversion_ms: u32) -> Result<u16, Error> {
        self.command(cmd)?;
        self.delay.delay_millis(conversion_ms);

        let mut frame = [0u8; 3];
        self.i2c
            .read(self.address, &mut frame)
            .map_err(|_| Error::SensorUnavailable)?;

        if crc8(&frame[..2]) != frame[2] {
            return Err(Error::SensorUnavailable);
        }

        // The low two bits of the word are status flags, not data.
        Ok(u16::from_be_bytes([frame[0], frame[1]]) & !0b11)
    }

    pub fn read_temperature(&mut self) -> Result<f32, Error> {
        let raw = self.measure_raw(CMD_MEASURE_TEMP_NO_HOLD, TEMP_CONVERSION_MS)?;
        Ok(convert_temperature(raw))
    }

    pub fn read_humidity(&mut self) -> Result<f32, Error> {
        let raw = self.measure_raw(CMD_MEASURE_HUMIDITY_NO_HOLD, HUMIDITY_CONVERSION_MS)?;
        Ok(convert_humidity(raw))
    }
}

impl<I2C: I2cBus> Sensor for Sht21<I2C> {
    async fn init(&mut self) -> Result<(), Error> {
        self.command(CMD_SOFT_RESET)?;
        self.delay.delay_millis(SOFT_RESET_MS);
        Ok(())
    }

    async fn sample(&mut self) -> Result<Measurement, Error> {
        let temperature_c = self.read_temperature()?;
        let humidity_pct = self.read_humidity()?;
        Ok(Measurement {
            temperature_c,
            humidity_pct,
        })
    }
}

/// Datasheet conversion: T = -46.85 + 175.72 * S / 2^16.
pub fn convert_temperature(raw: u16) -> f32 {
    -46.85 + 175.72 * (raw as f32) / 65536.0
}

/// Datasheet conversion: RH = -6 + 125 * S / 2^16, clipped to the
/// physical range as the datasheet instructs for readings near the rails.
pub fn convert_humidity(raw: u16) -> f32 {
    (-6.0 + 125.0 * (raw as f32) / 65536.0).clamp(0.0, 100.0)
}

/// CRC-8 over the measurement bytes, polynomial x^8 + x^5 + x^4 + 1,
/// init 0x00.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
