#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use embedded_hal::i2c::I2c as I2cBus;
use embedded_io_async::{ErrorType, Read};
use esp_backtrace as _;
use esp_hal::{
    gpio::{Level, Output, OutputConfig},
    timer::timg::TimerGroup,
};

use dewpoint_core::{
    Config, Reading, View,
    alert::{self, Urgency},
    proto,
    schedule::ReportCadence,
    traits::{Panel, Sensor},
};
use dewpoint_esp32s3::{
    hardware::{Bus, Sht21, convert_humidity, convert_temperature, crc8},
    net::{http_status, parse_endpoint, read_status, write_request},
    panel::Oled,
    settings,
};

esp_bootloader_esp_idf::esp_app_desc!();

static CONFIG: Config = settings::config();

// Test result tracking
struct TestResults {
    passed: u32,
    failed: u32,
    total: u32,
}

impl TestResults {
    fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            total: 0,
        }
    }

    fn assert(&mut self, condition: bool, test_name: &str) {
        self.total += 1;
        if condition {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED", test_name);
        }
    }

    fn assert_eq<T: PartialEq + core::fmt::Debug>(&mut self, left: T, right: T, test_name: &str) {
        self.total += 1;
        if left == right {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED: {:?} != {:?}", test_name, left, right);
        }
    }

    fn assert_close(&mut self, value: f32, expected: f32, tolerance: f32, test_name: &str) {
        self.total += 1;
        if (value - expected).abs() < tolerance {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!(
                "  ✗ {} FAILED: {:.2} not close to {:.2} (tolerance: {:.2})",
                test_name,
                value,
                expected,
                tolerance
            );
        }
    }

    fn print_summary(&self) {
        esp_println::println!("\n==========================================");
        esp_println::println!("Test Summary:");
        esp_println::println!("  Total:  {}", self.total);
        esp_println::println!("  Passed: {}", self.passed);
        esp_println::println!("  Failed: {}", self.failed);
        if self.failed == 0 {
            esp_println::println!("\n✓ ALL TESTS PASSED!");
        } else {
            esp_println::println!("\n✗ SOME TESTS FAILED");
        }
        esp_println::println!("==========================================");
    }
}

fn reading(temperature_c: f32, humidity_pct: f32) -> Reading {
    Reading {
        temperature_c,
        humidity_pct,
        uptime_s: 300,
    }
}

fn test_cadence(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Report Cadence Tests");

    let mut cadence = ReportCadence::new(CONFIG.report.interval);
    results.assert(!cadence.tick(), "first iteration is not due");

    let mut due = heapless::Vec::<u32, 4>::new();
    for _ in 1..90 {
        if cadence.tick() {
            let _ = due.push(cadence.iteration());
        }
    }
    results.assert_eq(due.as_slice(), [30, 60, 90].as_slice(), "due on multiples of 30");

    let mut every = ReportCadence::new(1);
    results.assert(every.tick() && every.tick(), "interval 1 fires every time");
}

fn test_urgency(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Alert Policy Tests");

    let cfg = &CONFIG.alert;
    results.assert_eq(
        alert::urgency_for(&reading(22.5, 40.0), cfg),
        Urgency::new(0),
        "comfortable reading scores 0",
    );
    results.assert_eq(
        alert::urgency_for(&reading(35.0, 40.0), cfg),
        Urgency::new(3),
        "35C scores 3",
    );
    results.assert_eq(
        alert::urgency_for(&reading(22.0, 85.0), cfg),
        Urgency::new(3),
        "85%RH scores 3",
    );
    results.assert_eq(
        alert::urgency_for(&reading(120.0, 40.0), cfg),
        Urgency::MAX,
        "extreme excursion saturates at 9",
    );
    results.assert(
        alert::should_alert(Urgency::new(3), cfg),
        "threshold is inclusive",
    );
    results.assert(
        !alert::should_alert(Urgency::new(2), cfg),
        "below threshold stays quiet",
    );
}

fn test_wire_encoding(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Line Protocol Tests");

    match proto::measurement_line("temperature", "dewpoint", &reading(22.5, 40.0)) {
        Ok(line) => results.assert_eq(
            line.as_str(),
            "temperature,node=dewpoint temperature_c=22.5,humidity_pct=40.0",
            "measurement line layout",
        ),
        Err(_) => results.assert(false, "measurement line layout (encode error)"),
    }

    match proto::alert_line("alerts", "dewpoint", &reading(35.1, 40.0), Urgency::new(3)) {
        Ok(line) => results.assert_eq(
            line.as_str(),
            "alerts,node=dewpoint urgency=3i,temperature_c=35.1,humidity_pct=40.0",
            "alert line layout",
        ),
        Err(_) => results.assert(false, "alert line layout (encode error)"),
    }

    match proto::measurement_line("temperature", "lab rack", &reading(22.5, 40.0)) {
        Ok(line) => results.assert(
            line.as_str().contains("node=lab\\ rack"),
            "node tag is escaped",
        ),
        Err(_) => results.assert(false, "node tag is escaped (encode error)"),
    }
}

fn test_conversions(results: &mut TestResults) {
    esp_println::println!("\n[TEST] SHT21 Conversion Tests");

    // Datasheet CRC example: 0x683A checksums to 0x7C.
    results.assert_eq(crc8(&[0x68, 0x3A]), 0x7C, "CRC-8 datasheet vector");
    results.assert_eq(crc8(&[0x63, 0x52]), 0x64, "CRC-8 second vector");

    results.assert_close(convert_temperature(0x6509), 22.5, 0.01, "raw 0x6509 is 22.5C");
    results.assert_close(convert_temperature(0x0000), -46.85, 0.01, "raw zero is the offset");
    // Datasheet humidity example, masked to a data word: 42.5%RH.
    results.assert_close(convert_humidity(0x6350), 42.5, 0.05, "datasheet humidity vector");
    results.assert_close(convert_humidity(0x5E34), 40.0, 0.01, "raw 0x5E34 is 40%RH");
    results.assert_close(convert_humidity(0xFFFC), 100.0, 0.01, "humidity clips at 100");
    results.assert_close(convert_humidity(0x0000), 0.0, 0.01, "humidity clips at 0");
}

/// Serves a canned response in fixed fragments, one chunk per read.
struct Fragments<'a> {
    chunks: &'a [&'a [u8]],
    next: usize,
}

impl ErrorType for Fragments<'_> {
    type Error = core::convert::Infallible;
}

impl Read for Fragments<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some(chunk) = self.chunks.get(self.next) else {
            return Ok(0);
        };
        self.next += 1;
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }
}

async fn test_write_client(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Write Client Tests");

    results.assert_eq(
        http_status(b"HTTP/1.1 204 No Content\r\n"),
        Some(204),
        "status parses from a 204 head",
    );
    results.assert_eq(
        http_status(b"HTTP/1.1 400 Bad Request\r\n"),
        Some(400),
        "status parses from a 400 head",
    );
    results.assert_eq(http_status(b"garbage"), None, "garbage head has no status");

    match parse_endpoint("192.168.1.10", "8086") {
        Some((addr, port)) => {
            results.assert_eq(addr.octets(), [192, 168, 1, 10], "endpoint address parses");
            results.assert_eq(port, 8086, "endpoint port parses");
        }
        None => results.assert(false, "endpoint address parses (no endpoint)"),
    }
    results.assert(
        parse_endpoint("influx.local", "8086").is_none(),
        "hostnames are rejected",
    );

    match parse_endpoint("192.168.1.10", "8086") {
        Some((addr, port)) => match write_request("sensors", addr, port, "m,node=dewpoint v=1") {
            Ok(request) => {
                results.assert(
                    request.starts_with("POST /write?db=sensors HTTP/1.1\r\n"),
                    "request targets the write endpoint",
                );
                results.assert(
                    request.contains("Host: 192.168.1.10:8086\r\n"),
                    "request carries the host header",
                );
                results.assert(
                    request.contains("Content-Length: 20\r\n"),
                    "content length counts the newline",
                );
                results.assert(
                    request.ends_with("\r\n\r\nm,node=dewpoint v=1\n"),
                    "body is the line plus newline",
                );
            }
            Err(_) => results.assert(false, "write request encodes"),
        },
        None => results.assert(false, "write request encodes (no endpoint)"),
    }

    // TCP is free to split the status line across segments.
    let mut fragmented = Fragments {
        chunks: &[b"HTTP/1.1 2", b"04 No Content\r\n"],
        next: 0,
    };
    match read_status(&mut fragmented).await {
        Ok(code) => results.assert_eq(code, Some(204), "status assembles across split reads"),
        Err(_) => results.assert(false, "status assembles across split reads"),
    }

    let mut truncated = Fragments {
        chunks: &[b"HTTP/1.1 2"],
        next: 0,
    };
    match read_status(&mut truncated).await {
        Ok(code) => results.assert_eq(code, None, "close before the code yields no status"),
        Err(_) => results.assert(false, "close before the code yields no status"),
    }

    let mut noise = Fragments {
        chunks: &[b"NOT AN HTTP RESPONSE HEAD AT ALL!!"],
        next: 0,
    };
    match read_status(&mut noise).await {
        Ok(code) => results.assert_eq(code, None, "junk fills the window with no status"),
        Err(_) => results.assert(false, "junk fills the window with no status"),
    }
}

async fn test_sht21<I2C: I2cBus>(results: &mut TestResults, sensor: &mut Sht21<I2C>) {
    esp_println::println!("\n[TEST] SHT21 Sensor Tests");

    match sensor.init().await {
        Ok(()) => results.assert(true, "SHT21 soft reset"),
        Err(e) => {
            esp_println::println!("    reset failed: {}", e);
            results.assert(false, "SHT21 soft reset");
        }
    }

    match sensor.sample().await {
        Ok(m) => {
            esp_println::println!(
                "    Reading: {:.2}C, {:.2}%RH",
                m.temperature_c,
                m.humidity_pct
            );
            results.assert(true, "SHT21 sample");
            results.assert(m.is_plausible(), "sample within the measurable span");
        }
        Err(e) => {
            esp_println::println!("    sample failed: {}", e);
            results.assert(false, "SHT21 sample");
            results.assert(false, "sample within the measurable span");
        }
    }
}

async fn test_oled<I2C: I2cBus>(results: &mut TestResults, panel: &mut Oled<'_, I2C>) {
    esp_println::println!("\n[TEST] SSD1306 Panel Tests");

    match panel.init() {
        Ok(()) => results.assert(true, "SSD1306 init and splash"),
        Err(e) => {
            esp_println::println!("    init failed: {}", e);
            results.assert(false, "SSD1306 init and splash");
        }
    }

    let view = View::Reading {
        reading: reading(22.5, 40.0),
        link_up: false,
    };
    match panel.show(&view).await {
        Ok(()) => results.assert(true, "frame renders and flushes"),
        Err(e) => {
            esp_println::println!("    show failed: {}", e);
            results.assert(false, "frame renders and flushes");
        }
    }
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("=== dewpoint hardware tests ===");

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let mut results = TestResults::new();

    test_cadence(&mut results);
    test_urgency(&mut results);
    test_wire_encoding(&mut results);
    test_conversions(&mut results);
    test_write_client(&mut results).await;

    // Shared bus, wired per CONFIG.bus: SDA GPIO4, SCL GPIO15.
    let bus = Bus::new(peripherals.I2C0, peripherals.GPIO4, peripherals.GPIO15);
    bus.scan(&CONFIG.bus);

    let mut sensor = Sht21::new(bus.device(), CONFIG.bus.sensor_addr);
    test_sht21(&mut results, &mut sensor).await;

    let reset = Output::new(peripherals.GPIO16, Level::High, OutputConfig::default());
    let mut panel = Oled::new(bus.device(), reset, &CONFIG);
    test_oled(&mut results, &mut panel).await;

    results.print_summary();

    loop {
        Timer::after(Duration::from_secs(10)).await;
    }
}
