//! PMS5003 sensor connection
//!
//! Owns the serial connection, frames the byte stream and recovers from read
//! timeouts by reopening the port. From the acquisition loop's point of view a
//! timeout is just a cycle without a reading.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{SensorMode, SerialConfig};
use crate::error::{PmsError, Result};
use crate::io::{SerialPair, SerialPortFactory, SerialReader};
use crate::protocol::{parse_frame, PmsCommand, PmsFrame, FRAME_LENGTH, FRAME_SIZE, FRAME_START};

/// Outcome of one acquisition attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    /// A valid frame arrived
    Frame(PmsFrame),
    /// No frame within the read timeout; the connection has been reinitialized
    TimedOut,
}

/// Source of particulate frames consumed by the acquisition loop
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticulateSource: Send {
    /// Wait for the next frame
    ///
    /// Timeouts and I/O failures are recovered internally and reported as
    /// [`Acquisition::TimedOut`]. Corrupt frames are returned as errors.
    async fn acquire(&mut self) -> Result<Acquisition>;

    /// Release the underlying connection
    async fn shutdown(&mut self);
}

/// PMS5003 particulate sensor on a serial port
pub struct Pms5003 {
    config: SerialConfig,
    factory: Arc<dyn SerialPortFactory>,
    connection: Option<SerialPair>,
}

impl Pms5003 {
    pub fn new(config: SerialConfig, factory: Arc<dyn SerialPortFactory>) -> Self {
        Self {
            config,
            factory,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the serial port and put the sensor into the configured mode
    pub async fn connect(&mut self) -> Result<()> {
        let mut pair = self
            .factory
            .open(
                &self.config.port,
                self.config.baud_rate,
                self.config.read_timeout(),
            )
            .await?;

        let mode = match self.config.mode {
            SensorMode::Active => PmsCommand::ActiveMode,
            SensorMode::Passive => PmsCommand::PassiveMode,
        };
        pair.writer
            .write_bytes(&PmsCommand::Wakeup.to_bytes())
            .await?;
        pair.writer.write_bytes(&mode.to_bytes()).await?;

        self.connection = Some(pair);
        info!(
            "PMS5003 connected on {} ({:?} mode)",
            self.config.port, self.config.mode
        );
        Ok(())
    }

    /// Drop the serial connection
    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            info!("PMS5003 on {} disconnected", self.config.port);
        }
    }

    /// Close and reopen the serial connection
    pub async fn reconnect(&mut self) -> Result<()> {
        self.disconnect();
        self.connect().await
    }

    /// Read the next data frame, bounded by the configured read timeout
    pub async fn read_frame(&mut self) -> Result<PmsFrame> {
        let timeout = self.config.read_timeout();
        let passive = self.config.mode == SensorMode::Passive;
        let pair = self.connection.as_mut().ok_or(PmsError::NotConnected)?;

        if passive {
            pair.writer
                .write_bytes(&PmsCommand::PassiveRead.to_bytes())
                .await?;
        }

        match tokio::time::timeout(timeout, next_frame(pair.reader.as_mut())).await {
            Ok(result) => result,
            Err(_) => Err(PmsError::Timeout(format!(
                "No frame from {} within {:?}",
                self.config.port, timeout
            ))),
        }
    }
}

#[async_trait]
impl ParticulateSource for Pms5003 {
    async fn acquire(&mut self) -> Result<Acquisition> {
        if !self.is_connected() {
            self.connect().await?;
        }

        match self.read_frame().await {
            Ok(frame) => Ok(Acquisition::Frame(frame)),
            Err(e) if e.requires_reconnect() => {
                warn!("PMS5003 read failed: {}. Reinitializing sensor", e);
                if let Err(e) = self.reconnect().await {
                    warn!("Failed to reopen {}: {}", self.config.port, e);
                }
                Ok(Acquisition::TimedOut)
            }
            Err(e) => Err(e),
        }
    }

    async fn shutdown(&mut self) {
        self.disconnect();
    }
}

async fn read_byte(reader: &mut dyn SerialReader) -> Result<u8> {
    reader
        .read_bytes(1)
        .await?
        .first()
        .copied()
        .ok_or_else(|| PmsError::SerialPort("Serial port returned no data".to_string()))
}

/// Scan the stream for the start bytes and read one data frame
///
/// Frames with a different length field, such as command acknowledgements,
/// are consumed and skipped.
async fn next_frame(reader: &mut dyn SerialReader) -> Result<PmsFrame> {
    loop {
        let mut previous = read_byte(reader).await?;
        loop {
            let byte = read_byte(reader).await?;
            if previous == FRAME_START[0] && byte == FRAME_START[1] {
                break;
            }
            previous = byte;
        }

        let header = reader.read_bytes(2).await?;
        let length = u16::from_be_bytes([header[0], header[1]]);
        if length != FRAME_LENGTH {
            debug!("Skipping frame with length {}", length);
            if length < FRAME_LENGTH {
                reader.read_bytes(usize::from(length)).await?;
            }
            continue;
        }

        let body = reader.read_bytes(usize::from(FRAME_LENGTH)).await?;
        let mut bytes = Vec::with_capacity(FRAME_SIZE);
        bytes.extend_from_slice(&FRAME_START);
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&body);
        return parse_frame(&bytes);
    }
}
