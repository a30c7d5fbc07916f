//! Core application runner for `tpms-listener`.
//!
//! This module is intentionally decoupled from CLI parsing and process exit codes
//! so it can be tested deterministically.

use crate::alias::{Alias, AliasMap};
use crate::handler::{AdvertisementHandler, Notification, ScanEvent};
use crate::output::influxdb::InfluxDbFormatter;
use crate::output::text::TextFormatter;
use crate::output::{Format, OutputFormatter};
use crate::scanner::{Backend, ScanError};
use crate::throttle::Throttle;
use clap::Parser;
use log::{debug, info};
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::sync::mpsc;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Output format
    #[arg(long, default_value_t, value_enum)]
    pub format: Format,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "tpms")]
    pub influxdb_measurement: String,

    /// Specify human-readable alias for a sensor address.
    /// Format: --alias AA:BB:CC:DD:EE:01=front-left
    #[arg(long = "alias", value_parser = crate::alias::parse_alias, value_name = "ALIAS")]
    pub aliases: Vec<Alias>,

    /// Verbose output, print decode failures and malformed advertisements
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Emit at most one reading per sensor per interval.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, value_parser = crate::throttle::parse_duration)]
    pub throttle: Option<Duration>,

    /// Stop scanning after this long. Scans forever when not given.
    #[arg(long, value_parser = crate::throttle::parse_duration)]
    pub duration: Option<Duration>,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Scanner abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(
        &self,
        backend: Backend,
        duration: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<ScanEvent>, ScanError>> + Send + '_>>;
}

/// Real scanner implementation that delegates to the compiled-in backends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(
        &self,
        backend: Backend,
        duration: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<ScanEvent>, ScanError>> + Send + '_>>
    {
        Box::pin(async move { crate::scanner::start_scan(backend, duration).await })
    }
}

fn formatter_for(options: &Options) -> Box<dyn OutputFormatter> {
    match options.format {
        Format::Text => Box::new(TextFormatter),
        Format::Influxdb => Box::new(InfluxDbFormatter::new(options.influxdb_measurement.clone())),
    }
}

fn write_line(
    formatter: &dyn OutputFormatter,
    notification: &Notification,
    name: &str,
    timestamp: SystemTime,
    out: &mut dyn Write,
) -> io::Result<()> {
    match formatter.format(notification, name, timestamp) {
        Some(line) => writeln!(out, "{line}"),
        None => Ok(()),
    }
}

/// Run the core processing loop, writing notifications to `out` and verbose errors to `err`.
///
/// - Beacon discoveries, readings and scan timeouts are formatted and written to `out`
///   (discoveries and readings each throttled per address).
/// - Decode failures and malformed advertisements are written to `err` only when
///   `options.verbose` is true.
pub async fn run_with_io(
    options: Options,
    scanner: &dyn Scanner,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let aliases: AliasMap = crate::alias::to_map(&options.aliases);
    let formatter = formatter_for(&options);
    let mut throttle = options.throttle.map(Throttle::new);
    let mut beacon_throttle = options.throttle.map(Throttle::new);
    let mut handler = AdvertisementHandler::new();

    let mut events = scanner.start_scan(options.backend, options.duration).await?;

    while let Some(event) = events.recv().await {
        let timestamp = SystemTime::now();

        for notification in handler.handle(&event) {
            let name = notification
                .address()
                .map(|address| crate::alias::resolve_name(address, &aliases))
                .unwrap_or_default();

            match &notification {
                Notification::BeaconFound { name: beacon, address } => {
                    let should_emit = beacon_throttle
                        .as_mut()
                        .is_none_or(|t: &mut Throttle| t.should_emit(*address));
                    if should_emit {
                        info!("found tpms beacon {beacon} at {address} ({})", address.kind);
                        write_line(formatter.as_ref(), &notification, &name, timestamp, out)?;
                    }
                }
                Notification::Reading { address, .. } => {
                    let should_emit = throttle
                        .as_mut()
                        .is_none_or(|t: &mut Throttle| t.should_emit(*address));
                    if should_emit {
                        write_line(formatter.as_ref(), &notification, &name, timestamp, out)?;
                    }
                }
                Notification::DecodeFailed { .. } | Notification::MalformedPayload { .. } => {
                    debug!("{notification:?}");
                    if options.verbose {
                        write_line(&TextFormatter, &notification, &name, timestamp, err)?;
                    }
                }
                Notification::ScanTimedOut => {
                    info!("scan window ended");
                    write_line(formatter.as_ref(), &notification, &name, timestamp, out)?;
                }
            }
        }
    }

    Ok(())
}
