//! Wi-Fi uplink and the InfluxDB write client.
//!
//! Both halves stand for exactly one attempt per call; retry ceilings are
//! the caller's business. The HTTP exchange is a single line-protocol POST
//! with `Connection: close`, so every write gets a fresh socket and a
//! stalled server cannot wedge the loop.

use core::fmt::Write as _;
use core::net::Ipv4Addr;
use core::str::FromStr;

use embassy_net::{Stack, tcp::TcpSocket};
use embassy_time::{Duration, with_timeout};
use embedded_io_async::{Read, Write};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiStaState};
use log::{debug, info, warn};

use dewpoint_core::{
    Error,
    traits::{Link, MetricsSink},
};

use crate::settings;

/// One association attempt, from start to join accept.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Link-up plus DHCP lease after a successful join.
const ADDRESS_TIMEOUT: Duration = Duration::from_secs(15);
/// Per-operation ceiling on the write socket.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Room for the request head plus one encoded line.
pub const REQUEST_CAPACITY: usize = 384;

const RX_BUFFER: usize = 512;
const TX_BUFFER: usize = 512;

/// Response head window; a status line prefix always fits.
const HEAD_BUFFER: usize = 32;

/// The station interface behind the [`Link`] seam.
///
/// Owns the Wi-Fi controller outright. `join` drives one association
/// attempt to completion instead of parking a handler task on disconnect
/// events; between calls the radio keeps whatever state it reached.
pub struct WifiLink {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    ssid: &'static str,
    password: &'static str,
}

impl WifiLink {
    pub fn new(controller: WifiController<'static>, stack: Stack<'static>) -> Self {
        Self {
            controller,
            stack,
            ssid: settings::WIFI_SSID,
            password: settings::WIFI_PASSWORD,
        }
    }
}

impl Link for WifiLink {
    fn is_up(&self) -> bool {
        matches!(esp_radio::wifi::sta_state(), WifiStaState::Connected)
            && self.stack.is_config_up()
    }

    async fn join(&mut self) -> Result<(), Error> {
        if !matches!(self.controller.is_started(), Ok(true)) {
            let mode = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(self.ssid.into())
                    .with_password(self.password.into()),
            );
            self.controller
                .set_config(&mode)
                .map_err(|_| Error::LinkUnavailable)?;
            self.controller
                .start_async()
                .await
                .map_err(|_| Error::LinkUnavailable)?;
            info!("radio started, station {}", self.ssid);
        }

        match with_timeout(JOIN_TIMEOUT, self.controller.connect_async()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("association with {} rejected: {e:?}", self.ssid);
                return Err(Error::LinkUnavailable);
            }
            Err(_) => {
                debug!("association with {} timed out", self.ssid);
                return Err(Error::LinkUnavailable);
            }
        }

        let stack = self.stack;
        let addressed = with_timeout(ADDRESS_TIMEOUT, async {
            stack.wait_link_up().await;
            stack.wait_config_up().await;
        })
        .await;
        if addressed.is_err() {
            debug!("no DHCP lease before the deadline");
            return Err(Error::LinkUnavailable);
        }

        if let Some(v4) = self.stack.config_v4() {
            info!("link up, address {}", v4.address);
        }
        Ok(())
    }
}

/// InfluxDB 1.x write endpoint behind the [`MetricsSink`] seam.
pub struct InfluxSink {
    stack: Stack<'static>,
    /// Parsed once from settings; `None` leaves the sink inert and every
    /// publish fails fast.
    endpoint: Option<(Ipv4Addr, u16)>,
    database: &'static str,
    rx_buf: [u8; RX_BUFFER],
    tx_buf: [u8; TX_BUFFER],
}

impl InfluxSink {
    pub fn new(stack: Stack<'static>) -> Self {
        let endpoint = parse_endpoint(settings::INFLUX_HOST, settings::INFLUX_PORT);
        if endpoint.is_none() {
            warn!(
                "bad InfluxDB endpoint {}:{}, reporting disabled",
                settings::INFLUX_HOST,
                settings::INFLUX_PORT
            );
        }
        Self {
            stack,
            endpoint,
            database: settings::INFLUX_DATABASE,
            rx_buf: [0; RX_BUFFER],
            tx_buf: [0; TX_BUFFER],
        }
    }

    async fn exchange(socket: &mut TcpSocket<'_>, request: &[u8]) -> Result<(), Error> {
        socket.write_all(request).await.map_err(|e| {
            debug!("write failed: {e:?}");
            Error::ReportWriteFailed
        })?;
        socket.flush().await.map_err(|_| Error::ReportWriteFailed)?;

        let status = read_status(socket).await.map_err(|e| {
            debug!("read failed: {e:?}");
            Error::ReportWriteFailed
        })?;

        match status {
            Some(code) if (200..300).contains(&code) => Ok(()),
            Some(code) => {
                warn!("write rejected: HTTP {code}");
                Err(Error::ReportWriteFailed)
            }
            None => {
                debug!("unparseable response head");
                Err(Error::ReportWriteFailed)
            }
        }
    }
}

impl MetricsSink for InfluxSink {
    async fn publish(&mut self, line: &str) -> Result<(), Error> {
        let Some((addr, port)) = self.endpoint else {
            return Err(Error::ReportWriteFailed);
        };
        let request =
            write_request(self.database, addr, port, line).map_err(|_| Error::ReportWriteFailed)?;

        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buf, &mut self.tx_buf);
        socket.set_timeout(Some(SOCKET_TIMEOUT));

        match with_timeout(SOCKET_TIMEOUT, socket.connect((addr, port))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("connect {addr}:{port} failed: {e:?}");
                return Err(Error::ReportWriteFailed);
            }
            Err(_) => {
                debug!("connect {addr}:{port} timed out");
                return Err(Error::ReportWriteFailed);
            }
        }

        let outcome = Self::exchange(&mut socket, request.as_bytes()).await;
        socket.close();
        outcome
    }
}

/// Endpoint settings parsed into address and port. The host must be a
/// dotted quad; the stack runs no resolver.
pub fn parse_endpoint(host: &str, port: &str) -> Option<(Ipv4Addr, u16)> {
    Some((Ipv4Addr::from_str(host).ok()?, port.parse().ok()?))
}

/// One `POST /write` request carrying a single line-protocol record.
pub fn write_request(
    database: &str,
    addr: Ipv4Addr,
    port: u16,
    line: &str,
) -> Result<heapless::String<REQUEST_CAPACITY>, core::fmt::Error> {
    let mut request = heapless::String::new();
    write!(
        request,
        "POST /write?db={database} HTTP/1.1\r\n\
         Host: {addr}:{port}\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {line}\n",
        line.len() + 1
    )?;
    Ok(request)
}

/// Status code out of an HTTP response head, when one parses.
pub fn http_status(head: &[u8]) -> Option<u16> {
    let space = head.iter().position(|&b| b == b' ')?;
    let digits = head.get(space + 1..space + 4)?;
    let mut code: u16 = 0;
    for &d in digits {
        let digit = d.checked_sub(b'0').filter(|&v| v < 10)?;
        code = code * 10 + u16::from(digit);
    }
    Some(code)
}

/// Reads the response head until a status code parses, the peer closes,
/// or the window fills. TCP is free to deliver the status line in
/// fragments, so a short first read is not a verdict.
pub async fn read_status<R: Read>(source: &mut R) -> Result<Option<u16>, R::Error> {
    let mut head = [0u8; HEAD_BUFFER];
    let mut filled = 0;
    while filled < head.len() {
        let n = source.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
        if let Some(code) = http_status(&head[..filled]) {
            return Ok(Some(code));
        }
    }
    Ok(None)
}
