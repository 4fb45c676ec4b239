//! Mock serial port implementation for running without hardware
//!
//! This module provides mock implementations of the serial I/O traits that
//! emit well-formed PMS5003 frames with slowly drifting concentrations.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::io::{SerialPair, SerialPortFactory, SerialReader, SerialWriter};
use crate::protocol::{encode_frame, PmsCommand, PmsFrame};

/// Simulated sensor shared between mock reader and writer
#[derive(Debug, Default)]
struct MockState {
    pending: VecDeque<u8>,
    tick: u64,
    asleep: bool,
}

impl MockState {
    /// Concentrations follow a short repeating pattern on top of a slow ramp
    fn next_frame(&mut self) -> PmsFrame {
        const PATTERN: [u16; 8] = [0, 1, 3, 4, 3, 1, 0, 2];
        let drift = ((self.tick / 60) % 10) as u16;
        let wobble = PATTERN[(self.tick % PATTERN.len() as u64) as usize];
        self.tick += 1;

        let pm1_0 = 4 + drift + wobble;
        let pm2_5 = 7 + drift + wobble * 2;
        let pm10 = 9 + drift + wobble * 3;
        PmsFrame::from_words([
            pm1_0,
            pm2_5,
            pm10,
            pm1_0,
            pm2_5,
            pm10,
            900 + wobble * 20,
            270 + wobble * 5,
            58 + wobble,
            4,
            2,
            0,
            0x9700,
        ])
    }

    fn process_command(&mut self, bytes: &[u8]) {
        if bytes == PmsCommand::Sleep.to_bytes().as_slice() {
            self.asleep = true;
        } else if bytes == PmsCommand::Wakeup.to_bytes().as_slice() {
            self.asleep = false;
        }
        debug!("Mock processed command {:02X?} (asleep={})", bytes, self.asleep);
    }
}

/// Mock serial reader producing frames on demand
pub struct MockSerialReader {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl SerialReader for MockSerialReader {
    async fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        loop {
            {
                let mut state = self.state.lock().await;
                if !state.asleep {
                    while state.pending.len() < count {
                        let frame = state.next_frame();
                        state.pending.extend(encode_frame(&frame));
                    }
                    return Ok(state.pending.drain(..count).collect());
                }
            }
            // A sleeping sensor sends nothing
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Mock serial writer that applies sleep/wakeup commands
pub struct MockSerialWriter {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl SerialWriter for MockSerialWriter {
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        debug!("Mock serial write: {:02X?}", bytes);
        self.state.lock().await.process_command(bytes);
        Ok(())
    }
}

/// Mock serial port factory
///
/// Keeps the simulated sensor across reconnects so concentrations continue
/// where they left off.
#[derive(Clone, Default)]
pub struct MockSerialPortFactory {
    persistent_state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl SerialPortFactory for MockSerialPortFactory {
    async fn open(&self, port: &str, baud_rate: u32, _timeout: Duration) -> Result<SerialPair> {
        debug!("Mock serial port opened: {} at {} baud", port, baud_rate);

        let state = Arc::clone(&self.persistent_state);
        // Partial frames do not survive a reopen
        state.lock().await.pending.clear();

        Ok(SerialPair {
            reader: Box::new(MockSerialReader {
                state: Arc::clone(&state),
            }),
            writer: Box::new(MockSerialWriter { state }),
        })
    }
}
