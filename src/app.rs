//! Core application runner for `tempodisk-listener`.
//!
//! This module is decoupled from CLI parsing, logger setup and process exit
//! codes so it can be tested deterministically with an injected radio.

use crate::alias::Alias;
use crate::discovery::{
    DEFAULT_DESCRIPTION, DEFAULT_DISPLAY_NAME, DeviceMetadata, DiscoveryError, DiscoveryLoop,
};
use crate::entity::DeviceEntity;
use crate::host::Host;
use crate::output::OutputFormatter;
use crate::output::influxdb::InfluxDbFormatter;
use crate::property::Property;
use crate::scanner::{Backend, RadioConnection, ScanError};
use crate::throttle::Throttle;
use clap::Parser;
use log::info;
use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Display name given to discovered sensors.
    #[arg(long, default_value = DEFAULT_DISPLAY_NAME)]
    pub display_name: String,

    /// Description given to discovered sensors.
    #[arg(long, default_value = DEFAULT_DESCRIPTION)]
    pub description: String,

    /// Give one sensor its own display name.
    /// Format: --alias AA:BB:CC:DD:EE:FF=Cellar
    #[arg(long = "alias", value_parser = crate::alias::parse_alias, value_name = "ALIAS")]
    pub aliases: Vec<Alias>,

    /// Report each property of each sensor at most once per interval.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, value_parser = crate::throttle::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "tempodisk")]
    pub influxdb_measurement: String,

    /// Verbose output, log ignored advertisements
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,
}

impl Options {
    pub fn device_metadata(&self) -> DeviceMetadata {
        DeviceMetadata {
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            aliases: crate::alias::to_map(&self.aliases),
        }
    }
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Radio abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Radio: Send + Sync {
    fn open(
        &self,
        backend: Backend,
    ) -> Pin<Box<dyn Future<Output = Result<RadioConnection, ScanError>> + Send + '_>>;
}

/// Real radio implementation that delegates to the compiled-in backends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealRadio;

impl Radio for RealRadio {
    fn open(
        &self,
        backend: Backend,
    ) -> Pin<Box<dyn Future<Output = Result<RadioConnection, ScanError>> + Send + '_>> {
        Box::pin(async move { crate::scanner::open(backend).await })
    }
}

/// Host that writes every property change as one formatted line.
pub struct WriterHost<'a> {
    formatter: &'a dyn OutputFormatter,
    throttle: Option<Throttle>,
    out: &'a mut dyn Write,
}

impl<'a> WriterHost<'a> {
    pub fn new(
        formatter: &'a dyn OutputFormatter,
        throttle: Option<Throttle>,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            formatter,
            throttle,
            out,
        }
    }
}

impl Host for WriterHost<'_> {
    fn device_added(&mut self, device: &DeviceEntity) -> io::Result<()> {
        info!(
            "added {} \"{}\" ({})",
            device.entity_id(),
            device.name(),
            device.id().to_address_string()
        );
        Ok(())
    }

    fn property_changed(&mut self, device: &DeviceEntity, property: &Property) -> io::Result<()> {
        let should_emit = self
            .throttle
            .as_mut()
            .is_none_or(|t| t.should_emit(device.id(), property.name()));
        if !should_emit {
            return Ok(());
        }

        match self.formatter.format(device, property, SystemTime::now()) {
            Some(line) => writeln!(self.out, "{line}"),
            None => Ok(()),
        }
    }
}

/// Run the discovery loop until the radio stops, writing property changes to `out`.
pub async fn run_with_io(
    options: Options,
    radio: &dyn Radio,
    out: &mut dyn Write,
) -> Result<(), RunError> {
    let formatter = InfluxDbFormatter::new(options.influxdb_measurement.clone());
    let throttle = options.poll_interval.map(Throttle::new);
    let host = WriterHost::new(&formatter, throttle, out);

    let RadioConnection { stack, mut events } = radio.open(options.backend).await?;
    info!("listening for Tempo Disk broadcasts using {} backend", options.backend);

    let mut discovery = DiscoveryLoop::new(stack, host, options.device_metadata());
    discovery.run(&mut events).await?;
    Ok(())
}
