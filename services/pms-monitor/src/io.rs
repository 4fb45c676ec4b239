//! I/O traits for serial communication
//!
//! This module provides trait abstractions for serial port operations.
//! These traits enable mockall-based testing without requiring actual hardware.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Pair of reader and writer for a serial connection
pub struct SerialPair {
    /// Reader for receiving data
    pub reader: Box<dyn SerialReader>,
    /// Writer for sending data
    pub writer: Box<dyn SerialWriter>,
}

/// Trait for reading raw bytes from a serial port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SerialReader: Send {
    /// Read exactly `count` bytes
    ///
    /// Blocks until all bytes arrived. Callers bound the wait with their own
    /// timeout.
    async fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>>;
}

/// Trait for writing raw bytes to a serial port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SerialWriter: Send {
    /// Write and flush the given bytes
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Trait for creating serial port connections
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SerialPortFactory: Send + Sync {
    /// Open a serial port connection
    ///
    /// Returns a pair of reader and writer on success.
    async fn open(&self, port: &str, baud_rate: u32, timeout: Duration) -> Result<SerialPair>;
}
