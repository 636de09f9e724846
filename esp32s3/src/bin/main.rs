#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::watch::{DynReceiver, Watch};
use embassy_time::{Duration, Instant, Timer};
use esp_backtrace as _;
use esp_hal::{
    gpio::{Level, Output, OutputConfig},
    rng::Rng,
    timer::timg::TimerGroup,
};
use esp_radio::wifi::WifiDevice;
use log::{info, warn};
use static_cell::StaticCell;

use dewpoint_core::{
    Config, Node, Reading,
    node::ReportStatus,
    report::{ChannelOutcome, ReportOutcome},
    traits::Sensor,
};
use dewpoint_esp32s3::{
    hardware::{Bus, Sht21},
    net::{InfluxSink, WifiLink},
    panel::Oled,
    settings,
};

const STATUS_INTERVAL_MS: u64 = 60_000;

esp_bootloader_esp_idf::esp_app_desc!();

static CONFIG: Config = settings::config();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

/// Rolled-up loop progress, latest value wins.
#[derive(Debug, Clone, Copy)]
struct NodeStatus {
    iteration: u32,
    reading: Option<Reading>,
    delivered: u32,
    dropped: u32,
}

static CYCLES: Watch<CriticalSectionRawMutex, NodeStatus, 2> = Watch::new();

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn run_status(mut status: DynReceiver<'static, NodeStatus>) {
    loop {
        Timer::after(Duration::from_millis(STATUS_INTERVAL_MS)).await;
        let uptime = Instant::now().as_secs();
        match status.try_get() {
            Some(NodeStatus {
                iteration,
                reading: Some(r),
                delivered,
                dropped,
            }) => info!(
                "up {uptime}s, iteration {iteration}, last {:.1}C {:.0}%RH, reports {delivered} ok/{dropped} dropped",
                r.temperature_c, r.humidity_pct
            ),
            Some(NodeStatus {
                iteration,
                reading: None,
                delivered,
                dropped,
            }) => info!(
                "up {uptime}s, iteration {iteration}, no reading, reports {delivered} ok/{dropped} dropped"
            ),
            None => info!("up {uptime}s, waiting for the first cycle"),
        }
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("=== dewpoint node {} ===", settings::NODE_ID);

    // The radio driver allocates from this heap.
    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    if let Err(e) = spawner.spawn(run_status(CYCLES.dyn_receiver().unwrap())) {
        esp_println::println!("[ERROR] Failed to spawn task: {:?}", e);
    }

    // Radio and network stack.
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

    // Shared I2C bus; the wiring matches CONFIG.bus (SDA GPIO4, SCL GPIO15).
    let bus = Bus::new(peripherals.I2C0, peripherals.GPIO4, peripherals.GPIO15);

    let mut sensor = Sht21::new(bus.device(), CONFIG.bus.sensor_addr);
    if let Err(e) = sensor.init().await {
        // Soft reset is advisory. Every sample stands alone, so a missing
        // sensor surfaces as per-iteration failures, not a dead node.
        warn!("sensor reset failed: {e}");
    }

    // Display reset line, GPIO16 per CONFIG.display.reset_pin.
    let reset = Output::new(peripherals.GPIO16, Level::High, OutputConfig::default());
    let mut panel = Oled::new(bus.device(), reset, &CONFIG);
    if let Err(e) = panel.init() {
        warn!("display init failed: {e}");
    }

    let mut link = WifiLink::new(controller, stack);
    let mut sink = InfluxSink::new(stack);

    let mut node = Node::new(&CONFIG);
    let status_tx = CYCLES.sender();
    let mut delivered: u32 = 0;
    let mut dropped: u32 = 0;

    loop {
        let uptime_s = Instant::now().as_secs() as u32;
        let cycle = node
            .cycle(&mut sensor, &mut panel, &mut link, &mut sink, uptime_s)
            .await;

        match cycle.report {
            ReportStatus::NotDue => {}
            ReportStatus::Attempted(ReportOutcome::Written {
                measurement: ChannelOutcome::Delivered,
                ..
            }) => delivered += 1,
            _ => dropped += 1,
        }

        if let Some(r) = cycle.reading {
            info!(
                "iteration {}: {:.1}C {:.0}%RH",
                cycle.iteration, r.temperature_c, r.humidity_pct
            );
        }

        status_tx.send(NodeStatus {
            iteration: cycle.iteration,
            reading: cycle.reading,
            delivered,
            dropped,
        });

        Timer::after(Duration::from_millis(u64::from(CONFIG.loop_delay_ms))).await;
    }
}
