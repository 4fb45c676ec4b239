//! PMS5003 particulate monitor
//!
//! Polls a PMS5003 particulate sensor once per cadence tick, keeps rolling
//! mean/max statistics over several trailing windows, appends every reading to
//! a CSV file and repaints a live terminal view.
//!
//! The statistics engine lives in [`window`] and [`tracker`]; everything else
//! is the acquisition plumbing around it.

pub mod acquisition;
pub mod config;
pub mod display;
pub mod error;
pub mod io;
#[cfg(feature = "mock")]
pub mod mock;
pub mod protocol;
pub mod reading;
pub mod sensor;
pub mod serial;
pub mod storage;
pub mod tracker;
pub mod window;

pub use acquisition::{AcquisitionLoop, AcquisitionStats};
pub use config::{
    load_config, AcquisitionConfig, Config, DisplayConfig, SensorMode, SerialConfig,
    StorageConfig, WindowConfig,
};
pub use error::{PmsError, Result};
pub use io::SerialPortFactory;
pub use reading::{round2, Pollutant, Reading};
pub use sensor::{Acquisition, ParticulateSource, Pms5003};
pub use tracker::{MultiWindowTracker, TrackerHandle, TrackerReport, WindowReport};
pub use window::{FieldStats, WindowAggregator, WindowStats};

#[cfg(feature = "mock")]
pub use mock::MockSerialPortFactory;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::display::Dashboard;
use crate::serial::TokioSerialPortFactory;
use crate::storage::CsvSink;
use crate::tracker::new_tracker_handle;

/// Builder for the monitor.
///
/// Wires the sensor, tracker, CSV sink and dashboard from a configuration.
pub struct MonitorBuilder {
    config: Config,
    factory: Arc<dyn SerialPortFactory>,
}

impl MonitorBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factory: Arc::new(TokioSerialPortFactory::new()),
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn SerialPortFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn build(self) -> Result<Monitor> {
        self.config.validate()?;

        let cadence = self.config.acquisition.cadence();
        let tracker = new_tracker_handle(MultiWindowTracker::from_config(
            &self.config.windows,
            cadence,
        ));
        info!(
            "Tracking windows: {}",
            self.config
                .windows
                .iter()
                .map(|w| w.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let sensor = Pms5003::new(self.config.serial.clone(), self.factory);
        let cancel = CancellationToken::new();
        let mut acquisition = AcquisitionLoop::new(
            Box::new(sensor),
            Arc::clone(&tracker),
            cadence,
            cancel.clone(),
        );

        if self.config.storage.enabled {
            let sink = CsvSink::open(&self.config.storage.path)?;
            acquisition = acquisition.with_sink(Box::new(sink));
        }

        if self.config.display.enabled {
            acquisition = acquisition.with_view(Box::new(Dashboard::new(std::io::stdout())));
        }

        Ok(Monitor {
            acquisition,
            tracker,
            cancel,
        })
    }
}

/// A fully wired monitor, ready to run
pub struct Monitor {
    acquisition: AcquisitionLoop,
    tracker: TrackerHandle,
    cancel: CancellationToken,
}

impl Monitor {
    pub fn tracker(&self) -> TrackerHandle {
        Arc::clone(&self.tracker)
    }

    /// Token that stops the acquisition loop after the current cycle
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until Ctrl-C, then finish the cycle in flight and flush the CSV file
    pub async fn start(self) -> Result<AcquisitionStats> {
        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!("Failed to listen for ctrl-c: {}", e),
            }
            cancel_for_signal.cancel();
        });

        self.run().await
    }

    /// Run until the cancellation token fires
    pub async fn run(self) -> Result<AcquisitionStats> {
        self.acquisition.run().await
    }
}
