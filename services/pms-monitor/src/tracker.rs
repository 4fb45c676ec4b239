//! Fan-out of readings to every configured window

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::WindowConfig;
use crate::reading::Reading;
use crate::window::{WindowAggregator, WindowStats};

/// Snapshot of one named window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub name: String,
    pub duration: Duration,
    /// None when the window currently holds no readings
    pub stats: Option<WindowStats>,
}

/// Point-in-time view of all windows plus the most recent reading
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerReport {
    pub latest: Option<Reading>,
    pub windows: Vec<WindowReport>,
}

impl TrackerReport {
    pub fn window(&self, name: &str) -> Option<&WindowReport> {
        self.windows.iter().find(|w| w.name == name)
    }
}

/// Owns one [`WindowAggregator`] per configured window, in configuration order
#[derive(Debug, Clone)]
pub struct MultiWindowTracker {
    windows: Vec<(String, WindowAggregator)>,
    latest: Option<Reading>,
    ingested: u64,
}

impl MultiWindowTracker {
    /// Create a tracker from `(name, duration)` pairs
    ///
    /// # Panics
    ///
    /// Panics if two windows share a name. `Config::validate` rejects such
    /// configurations before they reach the tracker.
    pub fn new<I, S>(windows: I) -> Self
    where
        I: IntoIterator<Item = (S, Duration)>,
        S: Into<String>,
    {
        Self::from_aggregators(
            windows
                .into_iter()
                .map(|(name, duration)| (name.into(), WindowAggregator::new(duration))),
        )
    }

    /// Create a tracker whose windows are pre-sized for the given cadence
    pub fn from_config(windows: &[WindowConfig], cadence: Duration) -> Self {
        Self::from_aggregators(windows.iter().map(|w| {
            (
                w.name.clone(),
                WindowAggregator::with_capacity_hint(w.duration, cadence),
            )
        }))
    }

    fn from_aggregators(windows: impl Iterator<Item = (String, WindowAggregator)>) -> Self {
        let windows: Vec<(String, WindowAggregator)> = windows.collect();
        let mut seen = HashSet::new();
        for (name, _) in &windows {
            assert!(seen.insert(name.as_str()), "duplicate window name '{}'", name);
        }

        Self {
            windows,
            latest: None,
            ingested: 0,
        }
    }

    /// Insert a reading into every window and evict what has aged out
    ///
    /// # Panics
    ///
    /// Panics if the reading is older than the previously ingested one.
    pub fn ingest(&mut self, reading: Reading) {
        for (_, window) in &mut self.windows {
            window.insert(reading);
            window.evict(reading.timestamp());
        }
        self.latest = Some(reading);
        self.ingested += 1;
    }

    /// Snapshot every window without mutating anything
    pub fn report(&self) -> TrackerReport {
        TrackerReport {
            latest: self.latest,
            windows: self
                .windows
                .iter()
                .map(|(name, window)| WindowReport {
                    name: name.clone(),
                    duration: window.duration(),
                    stats: window.snapshot(),
                })
                .collect(),
        }
    }

    pub fn window(&self, name: &str) -> Option<&WindowAggregator> {
        self.windows
            .iter()
            .find(|(window_name, _)| window_name == name)
            .map(|(_, window)| window)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.windows.iter().map(|(name, _)| name.as_str())
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    /// Total number of readings ingested since construction
    pub fn ingested(&self) -> u64 {
        self.ingested
    }
}

/// Shared tracker: the acquisition loop is the only writer
pub type TrackerHandle = Arc<RwLock<MultiWindowTracker>>;

pub fn new_tracker_handle(tracker: MultiWindowTracker) -> TrackerHandle {
    Arc::new(RwLock::new(tracker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> MultiWindowTracker {
        MultiWindowTracker::new([
            ("10s", Duration::from_secs(10)),
            ("1m", Duration::from_secs(60)),
        ])
    }

    #[test]
    fn new_tracker_reports_no_data_everywhere() {
        let report = tracker().report();
        assert_eq!(report.latest, None);
        assert_eq!(report.windows.len(), 2);
        assert!(report.windows.iter().all(|w| w.stats.is_none()));
    }

    #[test]
    fn ingest_reaches_every_window() {
        let mut tracker = tracker();
        let reading = Reading::new(1.0, 1.0, 2.0, 3.0);
        tracker.ingest(reading);

        for name in ["10s", "1m"] {
            assert_eq!(tracker.window(name).unwrap().latest(), Some(&reading));
        }
        assert_eq!(tracker.latest(), Some(&reading));
        assert_eq!(tracker.ingested(), 1);
    }

    #[test]
    fn shorter_window_evicts_sooner() {
        let mut tracker = tracker();
        for t in 0..30 {
            tracker.ingest(Reading::new(f64::from(t), 1.0, 1.0, 1.0));
        }

        assert_eq!(tracker.window("10s").unwrap().len(), 10);
        assert_eq!(tracker.window("1m").unwrap().len(), 30);
    }

    #[test]
    fn report_preserves_configured_order() {
        let tracker = MultiWindowTracker::new([
            ("12h", Duration::from_secs(43_200)),
            ("1m", Duration::from_secs(60)),
        ]);
        let names: Vec<&str> = tracker.names().collect();
        assert_eq!(names, ["12h", "1m"]);

        let report = tracker.report();
        assert_eq!(report.windows[0].name, "12h");
        assert_eq!(report.window("1m").unwrap().duration, Duration::from_secs(60));
    }

    #[test]
    fn unknown_window_is_none() {
        assert!(tracker().window("5m").is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate window name '1m'")]
    fn duplicate_window_names_are_rejected() {
        MultiWindowTracker::new([
            ("1m", Duration::from_secs(60)),
            ("1m", Duration::from_secs(300)),
        ]);
    }

    #[test]
    #[should_panic(expected = "non-monotonic")]
    fn ingest_rejects_out_of_order_reading() {
        let mut tracker = tracker();
        tracker.ingest(Reading::new(5.0, 1.0, 1.0, 1.0));
        tracker.ingest(Reading::new(4.0, 1.0, 1.0, 1.0));
    }
}
