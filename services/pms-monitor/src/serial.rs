//! Serial port implementation using tokio-serial
//!
//! This module provides concrete implementations of the I/O traits
//! using tokio-serial for actual hardware communication.

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, trace};

use crate::error::{PmsError, Result};
use crate::io::{SerialPair, SerialPortFactory, SerialReader, SerialWriter};

/// Serial reader using tokio-serial
pub struct TokioSerialReader {
    reader: ReadHalf<SerialStream>,
}

impl TokioSerialReader {
    /// Create a new serial reader from a read half of a serial stream
    pub fn new(reader: ReadHalf<SerialStream>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl SerialReader for TokioSerialReader {
    async fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; count];
        match self.reader.read_exact(&mut buffer).await {
            Ok(_) => {
                trace!("Serial read: {:02X?}", buffer);
                Ok(buffer)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                Err(PmsError::Timeout("Serial read timed out".to_string()))
            }
            Err(e) => Err(PmsError::Io(e)),
        }
    }
}

/// Serial writer using tokio-serial
pub struct TokioSerialWriter {
    writer: WriteHalf<SerialStream>,
}

impl TokioSerialWriter {
    /// Create a new serial writer from a write half of a serial stream
    pub fn new(writer: WriteHalf<SerialStream>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl SerialWriter for TokioSerialWriter {
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        debug!("Serial write: {:02X?}", bytes);
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Serial port factory using tokio-serial
#[derive(Default, Clone)]
pub struct TokioSerialPortFactory;

impl TokioSerialPortFactory {
    /// Create a new serial port factory
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SerialPortFactory for TokioSerialPortFactory {
    async fn open(&self, port: &str, baud_rate: u32, timeout: Duration) -> Result<SerialPair> {
        debug!(
            "Opening serial port {} at {} baud with {:?} timeout",
            port, baud_rate, timeout
        );

        let stream = tokio_serial::new(port, baud_rate)
            .timeout(timeout)
            .open_native_async()
            .map_err(|e| PmsError::SerialPort(format!("Failed to open {}: {}", port, e)))?;

        debug!("Serial port {} opened successfully", port);

        let (reader, writer) = tokio::io::split(stream);

        Ok(SerialPair {
            reader: Box::new(TokioSerialReader::new(reader)),
            writer: Box::new(TokioSerialWriter::new(writer)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_nonexistent_port_fails() {
        let factory = TokioSerialPortFactory::default();
        let result = factory
            .open("/dev/nonexistent_port_12345", 9600, Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(PmsError::SerialPort(_))));
    }
}
