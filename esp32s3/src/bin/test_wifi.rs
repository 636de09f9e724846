#![no_std]
#![no_main]

use core::fmt::Write as _;

use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{rng::Rng, timer::timg::TimerGroup};
use esp_radio::wifi::WifiDevice;
use static_cell::StaticCell;

use dewpoint_core::{
    Config,
    traits::{Link, MetricsSink},
};
use dewpoint_esp32s3::{
    net::{InfluxSink, WifiLink},
    settings,
};

esp_bootloader_esp_idf::esp_app_desc!();

static CONFIG: Config = settings::config();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("=== dewpoint Wi-Fi tests ===");
    esp_println::println!(
        "SSID {:?}, endpoint {}:{}, database {:?}",
        settings::WIFI_SSID,
        settings::INFLUX_HOST,
        settings::INFLUX_PORT,
        settings::INFLUX_DATABASE
    );

    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let radio = RADIO.init(esp_radio::init().unwrap());
    let (controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()).unwrap();

    let mut rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );
    if let Err(e) = spawner.spawn(net_task(runner)) {
        esp_println::println!("[ERROR] Failed to spawn task: {:?}", e);
    }

    let mut link = WifiLink::new(controller, stack);

    // Same budget the reporter runs with.
    let mut joined = false;
    for attempt in 1..=CONFIG.report.wifi_max_tries {
        esp_println::println!(
            "[JOIN] attempt {}/{}",
            attempt,
            CONFIG.report.wifi_max_tries
        );
        match link.join().await {
            Ok(()) => {
                joined = true;
                break;
            }
            Err(e) => esp_println::println!("[JOIN] {}", e),
        }
    }

    if !joined {
        esp_println::println!("✗ link never came up; check SSID and password");
        loop {
            Timer::after(Duration::from_secs(10)).await;
        }
    }
    esp_println::println!("✓ link up");

    // One write through the production path, into a scratch measurement.
    let mut sink = InfluxSink::new(stack);
    let mut line = heapless::String::<64>::new();
    let _ = write!(line, "test,node={} value=1i", settings::NODE_ID);

    let mut delivered = false;
    for attempt in 1..=CONFIG.report.influx_max_tries {
        esp_println::println!(
            "[WRITE] attempt {}/{}: {}",
            attempt,
            CONFIG.report.influx_max_tries,
            line
        );
        match sink.publish(&line).await {
            Ok(()) => {
                delivered = true;
                break;
            }
            Err(e) => esp_println::println!("[WRITE] {}", e),
        }
    }
    if delivered {
        esp_println::println!("✓ write accepted");
    } else {
        esp_println::println!("✗ write never accepted; check the endpoint and database");
    }

    loop {
        esp_println::println!(
            "[LINK] {}",
            if link.is_up() { "up" } else { "down" }
        );
        Timer::after(Duration::from_secs(5)).await;
    }
}
