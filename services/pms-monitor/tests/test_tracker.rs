//! End-to-end tests for multi-window tracking

use std::time::Duration;

use pms_monitor::{MultiWindowTracker, Pollutant, Reading, WindowAggregator};

fn cycling_readings(count: usize) -> Vec<Reading> {
    const PM2_5: [f64; 4] = [5.0, 10.0, 15.0, 20.0];
    (0..count)
        .map(|i| Reading::new(i as f64, 1.0, PM2_5[i % 4], 30.0))
        .collect()
}

fn standard_tracker() -> MultiWindowTracker {
    MultiWindowTracker::new([
        ("1m", Duration::from_secs(60)),
        ("5m", Duration::from_secs(300)),
    ])
}

#[test]
fn two_minutes_of_one_hertz_readings() {
    let mut tracker = standard_tracker();
    for reading in cycling_readings(120) {
        tracker.ingest(reading);
    }

    let one_minute = tracker.window("1m").unwrap();
    assert_eq!(one_minute.len(), 60);
    assert_eq!(one_minute.oldest().unwrap().timestamp(), 60.0);
    let stats = one_minute.snapshot().unwrap();
    assert_eq!(stats.pm2_5.mean, 12.5);
    assert_eq!(stats.pm2_5.max, 20.0);

    let five_minutes = tracker.window("5m").unwrap();
    assert_eq!(five_minutes.len(), 120);
    let stats = five_minutes.snapshot().unwrap();
    assert_eq!(stats.pm2_5.mean, 12.5);
    assert_eq!(stats.pm2_5.max, 20.0);
    assert_eq!(stats.pm1_0.mean, 1.0);
    assert_eq!(stats.pm10.max, 30.0);
}

#[test]
fn every_window_sees_the_same_latest_reading() {
    let mut tracker = MultiWindowTracker::new([
        ("10s", Duration::from_secs(10)),
        ("1m", Duration::from_secs(60)),
        ("1h", Duration::from_secs(3_600)),
    ]);
    for reading in cycling_readings(30) {
        tracker.ingest(reading);
    }

    let latest = *tracker.latest().unwrap();
    assert_eq!(latest.timestamp(), 29.0);
    for name in ["10s", "1m", "1h"] {
        assert_eq!(tracker.window(name).unwrap().latest(), Some(&latest));
    }
    assert_eq!(tracker.window("10s").unwrap().len(), 10);
    assert_eq!(tracker.window("1m").unwrap().len(), 30);
    assert_eq!(tracker.ingested(), 30);
}

#[test]
fn report_follows_configuration_order() {
    let mut tracker = standard_tracker();
    let empty = tracker.report();
    assert!(empty.latest.is_none());
    assert!(empty.windows.iter().all(|w| w.stats.is_none()));

    tracker.ingest(Reading::new(1_000.0, 2.0, 4.0, 8.0));
    let report = tracker.report();
    let names: Vec<&str> = report.windows.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, ["1m", "5m"]);
    assert_eq!(report.window("5m").unwrap().duration, Duration::from_secs(300));

    let stats = report.window("1m").unwrap().stats.unwrap();
    assert_eq!(stats.samples, 1);
    assert_eq!(stats.field(Pollutant::Pm10).mean, 8.0);
}

#[test]
fn gap_longer_than_window_empties_only_short_windows() {
    let mut tracker = standard_tracker();
    for reading in cycling_readings(10) {
        tracker.ingest(reading);
    }
    tracker.ingest(Reading::new(200.0, 3.0, 3.0, 3.0));

    let short = tracker.window("1m").unwrap().snapshot().unwrap();
    assert_eq!(short.samples, 1);
    assert_eq!(short.pm2_5.max, 3.0);

    let long = tracker.window("5m").unwrap().snapshot().unwrap();
    assert_eq!(long.samples, 11);
    assert_eq!(long.pm2_5.max, 20.0);
}

#[test]
fn mean_is_rounded_to_two_decimals() {
    let mut window = WindowAggregator::new(Duration::from_secs(60));
    for (ts, value) in [(0.0, 1.0), (1.0, 1.0), (2.0, 2.0)] {
        window.insert(Reading::new(ts, value, value, value));
    }

    let stats = window.snapshot().unwrap();
    assert_eq!(stats.pm1_0.mean, 1.33);
    assert_eq!(stats.pm1_0.max, 2.0);
}
