//! Acquisition loop: sensor → tracker → CSV and dashboard, once per cadence tick

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::display::ReportView;
use crate::error::Result;
use crate::reading::Reading;
use crate::sensor::{Acquisition, ParticulateSource};
use crate::storage::ReadingSink;
use crate::tracker::TrackerHandle;

/// Wall-clock timestamps that never go backwards
///
/// A wall-clock step backwards (NTP correction, manual change) repeats the
/// last timestamp instead of handing the tracker an out-of-order reading.
#[derive(Debug, Default)]
pub struct WallClock {
    last: f64,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current Unix time in seconds, clamped to be non-decreasing
    pub fn now(&mut self) -> f64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        self.advance(now)
    }

    fn advance(&mut self, candidate: f64) -> f64 {
        if candidate > self.last {
            self.last = candidate;
        }
        self.last
    }
}

/// Counters for a finished acquisition run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub cycles: u64,
    pub readings: u64,
    pub skipped: u64,
}

/// Drives one sensor at a fixed cadence until cancelled
pub struct AcquisitionLoop {
    source: Box<dyn ParticulateSource>,
    tracker: TrackerHandle,
    sink: Option<Box<dyn ReadingSink>>,
    view: Option<Box<dyn ReportView>>,
    cadence: Duration,
    clock: WallClock,
    started_at: Instant,
    cancel: CancellationToken,
    stats: AcquisitionStats,
}

impl AcquisitionLoop {
    pub fn new(
        source: Box<dyn ParticulateSource>,
        tracker: TrackerHandle,
        cadence: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            tracker,
            sink: None,
            view: None,
            cadence,
            clock: WallClock::new(),
            started_at: Instant::now(),
            cancel,
            stats: AcquisitionStats::default(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ReadingSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_view(mut self, view: Box<dyn ReportView>) -> Self {
        self.view = Some(view);
        self
    }

    /// Run cycles until the cancellation token fires
    ///
    /// Cancellation is only observed between cycles, so the cycle in flight
    /// always completes. The sink is flushed and the sensor released before
    /// returning. A failing sink ends the run with its error.
    pub async fn run(mut self) -> Result<AcquisitionStats> {
        let mut ticker = interval(self.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.started_at = Instant::now();
        info!("Acquisition started with {:?} cadence", self.cadence);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Acquisition stopped: shutdown signal received");
                    break Ok(());
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.cycle().await {
                error!("Acquisition aborted: {}", e);
                break Err(e);
            }
        };

        self.finish().await;
        info!(
            "Acquisition finished: {} cycles, {} readings, {} skipped",
            self.stats.cycles, self.stats.readings, self.stats.skipped
        );
        outcome.map(|()| self.stats)
    }

    async fn cycle(&mut self) -> Result<()> {
        self.stats.cycles += 1;

        let frame = match self.source.acquire().await {
            Ok(Acquisition::Frame(frame)) => frame,
            Ok(Acquisition::TimedOut) => {
                self.stats.skipped += 1;
                warn!("No reading this cycle: sensor timed out");
                return Ok(());
            }
            Err(e) => {
                self.stats.skipped += 1;
                warn!("No reading this cycle: {}", e);
                return Ok(());
            }
        };

        let reading = Reading::from_frame(self.clock.now(), &frame);
        debug!(
            "Reading: PM1.0={} PM2.5={} PM10={}",
            reading.pm1_0(),
            reading.pm2_5(),
            reading.pm10()
        );

        self.tracker.write().await.ingest(reading);
        self.stats.readings += 1;
        let report = self.tracker.read().await.report();

        if let Some(sink) = self.sink.as_mut() {
            sink.append(&reading)?;
        }

        if let Some(view) = self.view.as_mut() {
            if let Err(e) = view.show(&report, self.started_at.elapsed()) {
                warn!("Failed to draw dashboard: {}", e);
            }
        }

        Ok(())
    }

    async fn finish(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.flush() {
                warn!("Failed to flush readings: {}", e);
            }
        }
        self.source.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PmsFrame;
    use crate::sensor::MockParticulateSource;
    use crate::tracker::{new_tracker_handle, MultiWindowTracker};

    #[test]
    fn clock_never_goes_backwards() {
        let mut clock = WallClock::new();
        assert_eq!(clock.advance(100.0), 100.0);
        assert_eq!(clock.advance(99.0), 100.0);
        assert_eq!(clock.advance(101.5), 101.5);
    }

    #[test]
    fn clock_reports_current_time() {
        let mut clock = WallClock::new();
        assert!(clock.now() > 1_600_000_000.0);
    }

    #[tokio::test]
    async fn timed_out_cycle_leaves_tracker_untouched() {
        let cancel = CancellationToken::new();
        let mut source = MockParticulateSource::new();
        let mut calls = 0;
        let cancel_in_source = cancel.clone();
        source.expect_acquire().returning(move || {
            calls += 1;
            if calls == 2 {
                cancel_in_source.cancel();
            }
            if calls == 1 {
                Ok(Acquisition::TimedOut)
            } else {
                Ok(Acquisition::Frame(PmsFrame::with_concentrations(2, 4, 6)))
            }
        });
        source.expect_shutdown().times(1).returning(|| ());

        let tracker = new_tracker_handle(MultiWindowTracker::new([("1m", Duration::from_secs(60))]));
        let stats = AcquisitionLoop::new(
            Box::new(source),
            std::sync::Arc::clone(&tracker),
            Duration::from_millis(5),
            cancel,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.readings, 1);
        let tracker = tracker.read().await;
        assert_eq!(tracker.ingested(), 1);
        assert_eq!(tracker.latest().unwrap().pm2_5(), 4.0);
    }
}
