//! Walks the I2C address space and reports what answers, annotating the
//! addresses the node expects. Rescans every few seconds, so rewiring at
//! the bench shows up without a reflash.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;

use dewpoint_core::Config;
use dewpoint_esp32s3::{hardware::Bus, settings};

esp_bootloader_esp_idf::esp_app_desc!();

static CONFIG: Config = settings::config();

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("=== dewpoint I2C scan ===");

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // SDA GPIO4, SCL GPIO15 per CONFIG.bus.
    let bus = Bus::new(peripherals.I2C0, peripherals.GPIO4, peripherals.GPIO15);

    loop {
        bus.scan(&CONFIG.bus);
        Timer::after(Duration::from_secs(5)).await;
    }
}
