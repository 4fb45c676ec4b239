//! Timestamped particulate readings

use std::fmt;

use chrono::{DateTime, Local};

use crate::protocol::{ParticleSize, PmsFrame};

/// Round a concentration to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The three mass concentrations reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pollutant {
    Pm1_0,
    Pm2_5,
    Pm10,
}

impl Pollutant {
    pub const ALL: [Pollutant; 3] = [Pollutant::Pm1_0, Pollutant::Pm2_5, Pollutant::Pm10];

    pub fn label(self) -> &'static str {
        match self {
            Pollutant::Pm1_0 => "PM1.0",
            Pollutant::Pm2_5 => "PM2.5",
            Pollutant::Pm10 => "PM10",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Pollutant::Pm1_0 => 0,
            Pollutant::Pm2_5 => 1,
            Pollutant::Pm10 => 2,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One immutable measurement of PM1.0/PM2.5/PM10 in µg/m³
///
/// `timestamp` is Unix time in seconds. Concentrations are rounded to two
/// decimal places on construction and every statistic is computed from the
/// rounded values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    timestamp: f64,
    values: [f64; 3],
}

impl Reading {
    pub fn new(timestamp: f64, pm1_0: f64, pm2_5: f64, pm10: f64) -> Self {
        Self {
            timestamp,
            values: [round2(pm1_0), round2(pm2_5), round2(pm10)],
        }
    }

    /// Build a reading from the standard-particle concentrations of a frame
    pub fn from_frame(timestamp: f64, frame: &PmsFrame) -> Self {
        Self::new(
            timestamp,
            f64::from(frame.pm_ug_per_m3(ParticleSize::Pm1_0, false)),
            f64::from(frame.pm_ug_per_m3(ParticleSize::Pm2_5, false)),
            f64::from(frame.pm_ug_per_m3(ParticleSize::Pm10, false)),
        )
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn pm1_0(&self) -> f64 {
        self.values[0]
    }

    pub fn pm2_5(&self) -> f64 {
        self.values[1]
    }

    pub fn pm10(&self) -> f64 {
        self.values[2]
    }

    pub fn value(&self, pollutant: Pollutant) -> f64 {
        self.values[pollutant.index()]
    }

    /// Timestamp in local time as `YYYY-MM-DD HH:MM:SS`
    pub fn local_time(&self) -> String {
        let secs = self.timestamp.floor();
        let nanos = ((self.timestamp - secs) * 1e9) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
            .map(|utc| {
                utc.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_default()
    }
}
