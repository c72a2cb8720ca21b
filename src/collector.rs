//! The polling collector: reads one batch of lines per cycle, parses it,
//! stamps it, and hands exactly one complete [`Reading`] to the sink.
//!
//! Cycle flow is `POLLING -> READING_BATCH -> PARSING -> PERSISTING ->
//! POLLING`. Any per-cycle failure is logged and followed by a fixed backoff;
//! the loop itself only terminates when the sink reports closed (external
//! shutdown) or, at startup, when no port can be found at all.

use std::io::{self, BufReader};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use serialport::SerialPort;
use tracing::{debug, info, warn};

use crate::parse::parse_lines;
use crate::port;
use crate::reading::Reading;

/// Wait between successful cycles.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Wait after a failed cycle before retrying.
const FAILURE_BACKOFF: Duration = Duration::from_secs(5);

/// A source of line batches. One batch is everything the device emits up to a
/// blank line or a read timeout.
pub trait LineSource {
    fn read_batch(&mut self) -> io::Result<Vec<String>>;
}

/// The storage boundary. A reading is either submitted whole or dropped
/// whole; there are no partial writes.
pub trait ReadingSink {
    fn submit(&mut self, reading: Reading) -> Result<(), SinkError>;
}

#[derive(Debug)]
pub enum SinkError {
    /// The sink refused this reading; the loop logs and continues.
    Rejected(anyhow::Error),

    /// The sink is gone (consumer shut down); the loop stops.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    AwaitingPort,
    Polling,
    ReadingBatch,
    Parsing,
    Persisting,
    Failed,
}

/// Reads batches from an open serial handle, decoding lossily. A timeout
/// mid-batch ends the batch; it is not an error.
pub struct SerialLineSource {
    reader: BufReader<Box<dyn SerialPort>>,
}

impl SerialLineSource {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            reader: BufReader::new(port),
        }
    }
}

impl LineSource for SerialLineSource {
    fn read_batch(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            match port::read_lossy_line(&mut self.reader) {
                Ok(line) if line.is_empty() => break,
                Ok(line) => lines.push(line),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }
        Ok(lines)
    }
}

/// Owns the device handle for the process lifetime and drives the poll loop.
pub struct Collector<S> {
    source: S,
    timezone: Tz,
    state: CollectorState,
    poll_interval: Duration,
    failure_backoff: Duration,
}

impl Collector<SerialLineSource> {
    /// Discovers the active port and opens it. Finding no port is the fatal
    /// setup failure: the collector must not start its loop.
    pub fn discover(timezone: Tz) -> Result<Self> {
        let Some(name) = port::find_active_port()? else {
            anyhow::bail!("no active serial port found; connect the sensor and try again");
        };
        let handle = port::open_port(&name)?;
        info!("listening on {name}");
        Ok(Self::with_source(SerialLineSource::new(handle), timezone))
    }
}

impl<S: LineSource> Collector<S> {
    pub fn with_source(source: S, timezone: Tz) -> Self {
        Self {
            source,
            timezone,
            state: CollectorState::Polling,
            poll_interval: POLL_INTERVAL,
            failure_backoff: FAILURE_BACKOFF,
        }
    }

    /// Overrides the cycle delays. Tests use zero durations.
    pub fn with_intervals(mut self, poll_interval: Duration, failure_backoff: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.failure_backoff = failure_backoff;
        self
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Runs one READING_BATCH -> PARSING cycle. An empty batch produces no
    /// reading; that is a skip, not an error.
    pub fn poll_cycle(&mut self) -> Result<Option<Reading>> {
        self.state = CollectorState::ReadingBatch;
        let lines = self.source.read_batch()?;

        if lines.is_empty() {
            debug!("empty batch, no reading this cycle");
            self.state = CollectorState::Polling;
            return Ok(None);
        }

        self.state = CollectorState::Parsing;
        let parsed = parse_lines(&lines);
        let recorded_at = Utc::now().with_timezone(&self.timezone);

        self.state = CollectorState::Polling;
        Ok(Some(Reading::from_parsed(recorded_at, parsed)))
    }

    /// Polls until the sink closes. At most one reading is emitted per cycle;
    /// any transient failure is logged and retried after the backoff.
    pub fn run(&mut self, sink: &mut impl ReadingSink) -> Result<()> {
        loop {
            match self.poll_cycle() {
                Ok(Some(reading)) => {
                    self.state = CollectorState::Persisting;
                    match sink.submit(reading) {
                        Ok(()) => {
                            self.state = CollectorState::Polling;
                        }
                        Err(SinkError::Rejected(e)) => {
                            warn!("sink rejected reading: {e:#}");
                            self.state = CollectorState::Polling;
                            std::thread::sleep(self.failure_backoff);
                            continue;
                        }
                        Err(SinkError::Closed) => {
                            info!("sink closed, stopping collector");
                            return Ok(());
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("error in poll cycle: {e:#}");
                    self.state = CollectorState::Polling;
                    std::thread::sleep(self.failure_backoff);
                    continue;
                }
            }

            std::thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::reading::Value;

    /// Replays scripted batches, then empty batches forever.
    struct ScriptedSource {
        batches: VecDeque<io::Result<Vec<String>>>,
    }

    impl ScriptedSource {
        fn new(batches: Vec<io::Result<Vec<String>>>) -> Self {
            Self {
                batches: batches.into(),
            }
        }
    }

    impl LineSource for ScriptedSource {
        fn read_batch(&mut self) -> io::Result<Vec<String>> {
            self.batches
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Collects submitted readings, reporting closed once full.
    struct VecSink {
        readings: Vec<Reading>,
        capacity: usize,
    }

    impl VecSink {
        fn with_capacity(capacity: usize) -> Self {
            Self {
                readings: Vec::new(),
                capacity,
            }
        }
    }

    impl ReadingSink for VecSink {
        fn submit(&mut self, reading: Reading) -> Result<(), SinkError> {
            if self.readings.len() >= self.capacity {
                return Err(SinkError::Closed);
            }
            self.readings.push(reading);
            Ok(())
        }
    }

    fn batch(lines: &[&str]) -> io::Result<Vec<String>> {
        Ok(lines.iter().map(|s| s.to_string()).collect())
    }

    fn collector(batches: Vec<io::Result<Vec<String>>>) -> Collector<ScriptedSource> {
        Collector::with_source(ScriptedSource::new(batches), chrono_tz::UTC)
            .with_intervals(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn starts_polling() {
        let c = collector(vec![]);
        assert_eq!(c.state(), CollectorState::Polling);
    }

    #[test]
    fn empty_batch_produces_no_reading() {
        let mut c = collector(vec![batch(&[])]);
        let reading = c.poll_cycle().unwrap();
        assert!(reading.is_none());
    }

    #[test]
    fn cycle_parses_stamps_and_fills_missing_fields() {
        let mut c = collector(vec![batch(&[
            "\"co2\": \"812.3\"",
            "\"co2_unit\": \"ppm\"",
            "garbage_no_colon",
        ])]);

        let reading = c.poll_cycle().unwrap().expect("one reading");

        assert_eq!(reading.get("co2"), Some(&Value::Number(812.3)));
        assert_eq!(
            reading.get("co2_unit"),
            Some(&Value::Text("ppm".to_string()))
        );
        assert_eq!(reading.get("tvoc"), Some(&Value::Missing));
        assert_eq!(reading.fields.len(), crate::schema::FIELDS.len());
    }

    #[test]
    fn io_error_surfaces_from_poll_cycle() {
        let mut c = collector(vec![Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "device unplugged",
        ))]);
        assert!(c.poll_cycle().is_err());
    }

    #[test]
    fn run_survives_transient_failures_and_stops_when_sink_closes() {
        let mut c = collector(vec![
            batch(&["co2: 400"]),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "glitch")),
            batch(&[]),
            batch(&["co2: 410"]),
            batch(&["co2: 420"]),
        ]);
        let mut sink = VecSink::with_capacity(2);

        c.run(&mut sink).unwrap();

        assert_eq!(sink.readings.len(), 2);
        assert_eq!(sink.readings[0].get("co2"), Some(&Value::Number(400.0)));
        assert_eq!(sink.readings[1].get("co2"), Some(&Value::Number(410.0)));
    }
}
