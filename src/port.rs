use std::io::{self, BufRead, BufReader, Read};
use std::time::Duration;

use anyhow::{Context as _, Result};
use serialport::SerialPort;
use tracing::{debug, info, warn};

pub const BAUD_RATE: u32 = 115_200;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Delay after opening a candidate, giving the remote device time to start
/// transmitting.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Line reads attempted per candidate before moving on.
const READ_ATTEMPTS: usize = 10;

/// Keys expected somewhere in the sensor's output.
const EXPECTED_KEYWORDS: [&str; 5] = ["co2", "temperature", "humidity", "tvoc", "pm"];

/// Probes every available serial interface and returns the first one emitting
/// recognizable sensor text.
///
/// Candidates that fail to open or read are logged and skipped. `Ok(None)`
/// means no candidate qualified; the caller decides whether that is fatal.
pub fn find_active_port() -> Result<Option<String>> {
    let ports = serialport::available_ports().context("failed to enumerate serial ports")?;

    for port in ports {
        debug!("trying port: {}", port.port_name);
        match probe_port(&port.port_name) {
            Ok(true) => {
                info!("active port found: {}", port.port_name);
                return Ok(Some(port.port_name));
            }
            Ok(false) => {}
            Err(e) => {
                warn!("failed to read from port {}: {e:#}", port.port_name);
            }
        }
    }

    Ok(None)
}

/// Opens the named port with the fixed baud rate and read timeout.
pub fn open_port(name: &str) -> Result<Box<dyn SerialPort>> {
    serialport::new(name, BAUD_RATE)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("failed to open serial port {name}"))
}

fn probe_port(name: &str) -> Result<bool> {
    let port = open_port(name)?;
    std::thread::sleep(SETTLE_DELAY);

    let mut reader = BufReader::new(port);
    for _ in 0..READ_ATTEMPTS {
        let line = match read_lossy_line(&mut reader) {
            Ok(line) => line,
            // A quiet candidate is not an error, just not this one.
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(e).context("failed to read line"),
        };

        if line.is_empty() {
            continue;
        }

        if line_matches(&line) {
            return Ok(true);
        }
    }

    Ok(false)
}

pub(crate) fn line_matches(line: &str) -> bool {
    EXPECTED_KEYWORDS.iter().any(|keyword| line.contains(keyword))
}

/// Reads one `\n`-terminated line, replacing invalid UTF-8 byte sequences
/// instead of failing on them.
pub(crate) fn read_lossy_line<R: Read>(reader: &mut BufReader<R>) -> io::Result<String> {
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).trim().to_string())
}
