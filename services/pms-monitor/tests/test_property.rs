#[cfg(not(miri))] // Skip property tests under miri as they're too slow
use pms_monitor::{round2, Reading, WindowAggregator};
#[cfg(not(miri))]
use proptest::prelude::*;
#[cfg(not(miri))]
use std::time::Duration;

/// Timestamp steps in tenths of a second and values in hundredths
#[cfg(not(miri))]
fn readings_strategy() -> impl Strategy<Value = Vec<Reading>> {
    prop::collection::vec((0u32..50, 0u32..100_000, 0u32..100_000, 0u32..100_000), 1..200)
        .prop_map(|steps| {
            let mut ts = 1_700_000_000.0;
            steps
                .into_iter()
                .map(|(step, a, b, c)| {
                    ts += f64::from(step) / 10.0;
                    Reading::new(
                        ts,
                        f64::from(a) / 100.0,
                        f64::from(b) / 100.0,
                        f64::from(c) / 100.0,
                    )
                })
                .collect()
        })
}

#[cfg(not(miri))]
fn survivors(readings: &[Reading], latest: f64, span: f64) -> Vec<Reading> {
    readings
        .iter()
        .filter(|r| r.timestamp() > latest - span)
        .copied()
        .collect()
}

#[cfg(not(miri))]
proptest! {
    #[test]
    fn window_holds_exactly_the_recent_readings(
        readings in readings_strategy(),
        span in 1u64..30,
    ) {
        let mut window = WindowAggregator::new(Duration::from_secs(span));
        for reading in &readings {
            window.insert(*reading);
            window.evict(reading.timestamp());
        }

        let latest = readings.last().unwrap().timestamp();
        let expected = survivors(&readings, latest, span as f64);
        let held: Vec<Reading> = window.iter().copied().collect();
        prop_assert_eq!(held, expected);
    }

    #[test]
    fn snapshot_matches_recomputation(
        readings in readings_strategy(),
        span in 1u64..30,
    ) {
        let mut window = WindowAggregator::new(Duration::from_secs(span));
        for reading in &readings {
            window.insert(*reading);
            window.evict(reading.timestamp());
        }

        let latest = readings.last().unwrap().timestamp();
        let expected = survivors(&readings, latest, span as f64);
        let stats = window.snapshot().unwrap();
        prop_assert_eq!(stats.samples, expected.len());

        for (field, value) in [
            (stats.pm1_0, expected.iter().map(Reading::pm1_0).collect::<Vec<_>>()),
            (stats.pm2_5, expected.iter().map(Reading::pm2_5).collect::<Vec<_>>()),
            (stats.pm10, expected.iter().map(Reading::pm10).collect::<Vec<_>>()),
        ] {
            let max = value.iter().copied().fold(f64::MIN, f64::max);
            let mean = round2(value.iter().sum::<f64>() / value.len() as f64);
            prop_assert_eq!(field.max, max);
            prop_assert!((field.mean - mean).abs() <= 0.011, "{} vs {}", field.mean, mean);
        }
    }
}
