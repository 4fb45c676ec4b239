//! Rolling mean/max over a fixed trailing time window
//!
//! Each [`WindowAggregator`] keeps the readings whose age relative to the most
//! recent timestamp is strictly less than its duration. A reading exactly one
//! duration old is evicted, so a 60 second window fed at 1 Hz holds 60 readings.
//!
//! Statistics are maintained incrementally. Concentrations are already rounded
//! to hundredths, so the per-field sums are kept as integer hundredths and stay
//! exact no matter how many readings pass through. Maxima come from one
//! monotonic deque per field, which yields amortized O(1) work per insert and
//! per eviction.

use std::collections::VecDeque;
use std::time::Duration;

use crate::reading::{round2, Pollutant, Reading};

const HUNDREDTHS: f64 = 100.0;

fn to_hundredths(value: f64) -> i64 {
    (value * HUNDREDTHS).round() as i64
}

/// Mean and maximum of one pollutant over a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub mean: f64,
    pub max: f64,
}

/// Statistics of a non-empty window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Number of readings the statistics were computed over
    pub samples: usize,
    pub pm1_0: FieldStats,
    pub pm2_5: FieldStats,
    pub pm10: FieldStats,
}

impl WindowStats {
    pub fn field(&self, pollutant: Pollutant) -> FieldStats {
        match pollutant {
            Pollutant::Pm1_0 => self.pm1_0,
            Pollutant::Pm2_5 => self.pm2_5,
            Pollutant::Pm10 => self.pm10,
        }
    }
}

/// Time-windowed history of readings with running mean and max
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    duration: Duration,
    span_secs: f64,
    history: VecDeque<Reading>,
    /// Sequence number the next inserted reading receives
    next_seq: u64,
    sums: [i64; 3],
    /// Per field: (sequence, value) with values strictly decreasing front to back
    maxima: [VecDeque<(u64, f64)>; 3],
}

impl WindowAggregator {
    /// Create an aggregator retaining readings younger than `duration`
    pub fn new(duration: Duration) -> Self {
        Self::with_capacity(duration, 0)
    }

    /// Create an aggregator pre-sized for one reading every `cadence`
    ///
    /// The history is expected to hold about `duration / cadence` readings.
    /// That figure only sizes the initial allocation; faster feeds still grow
    /// the history as needed.
    pub fn with_capacity_hint(duration: Duration, cadence: Duration) -> Self {
        let hint = if cadence.is_zero() {
            0
        } else {
            (duration.as_secs_f64() / cadence.as_secs_f64()).ceil() as usize
        };
        Self::with_capacity(duration, hint)
    }

    fn with_capacity(duration: Duration, capacity: usize) -> Self {
        Self {
            duration,
            span_secs: duration.as_secs_f64(),
            history: VecDeque::with_capacity(capacity),
            next_seq: 0,
            sums: [0; 3],
            maxima: Default::default(),
        }
    }

    /// Append a reading to the back of the history
    ///
    /// # Panics
    ///
    /// Panics if the reading is older than the latest reading already held,
    /// or if any of its values is not finite.
    pub fn insert(&mut self, reading: Reading) {
        assert!(
            reading.timestamp().is_finite(),
            "reading timestamp must be finite, got {}",
            reading.timestamp()
        );
        if let Some(latest) = self.history.back() {
            assert!(
                reading.timestamp() >= latest.timestamp(),
                "non-monotonic insert into {:?} window: {} is earlier than latest {}",
                self.duration,
                reading.timestamp(),
                latest.timestamp()
            );
        }

        for pollutant in Pollutant::ALL {
            assert!(
                reading.value(pollutant).is_finite(),
                "{} value must be finite",
                pollutant
            );
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        for pollutant in Pollutant::ALL {
            let value = reading.value(pollutant);
            let idx = pollutant.index();
            self.sums[idx] += to_hundredths(value);

            let maxima = &mut self.maxima[idx];
            while maxima.back().is_some_and(|&(_, held)| held <= value) {
                maxima.pop_back();
            }
            maxima.push_back((seq, value));
        }

        self.history.push_back(reading);
    }

    /// Drop every reading at least one window duration older than `now`
    ///
    /// Stops at the first reading still inside the window.
    pub fn evict(&mut self, now: f64) {
        let cutoff = now - self.span_secs;

        while let Some(oldest) = self.history.front() {
            if oldest.timestamp() > cutoff {
                break;
            }
            let seq = self.front_seq();
            if let Some(expired) = self.history.pop_front() {
                self.forget(seq, &expired);
            }
        }
    }

    fn front_seq(&self) -> u64 {
        self.next_seq - self.history.len() as u64
    }

    fn forget(&mut self, seq: u64, expired: &Reading) {
        for pollutant in Pollutant::ALL {
            let idx = pollutant.index();
            self.sums[idx] -= to_hundredths(expired.value(pollutant));
            if self.maxima[idx].front().is_some_and(|&(held, _)| held == seq) {
                self.maxima[idx].pop_front();
            }
        }
    }

    /// Mean and max per pollutant over the current history
    ///
    /// Returns None if the window holds no readings.
    pub fn snapshot(&self) -> Option<WindowStats> {
        if self.history.is_empty() {
            return None;
        }

        let samples = self.history.len();
        let field = |pollutant: Pollutant| {
            let idx = pollutant.index();
            let sum = self.sums[idx] as f64 / HUNDREDTHS;
            let max = self.maxima[idx].front().map(|&(_, value)| value)?;
            Some(FieldStats {
                mean: round2(sum / samples as f64),
                max,
            })
        };

        Some(WindowStats {
            samples,
            pm1_0: field(Pollutant::Pm1_0)?,
            pm2_5: field(Pollutant::Pm2_5)?,
            pm10: field(Pollutant::Pm10)?,
        })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn oldest(&self) -> Option<&Reading> {
        self.history.front()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.history.back()
    }

    /// Readings oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.history.iter()
    }
}
