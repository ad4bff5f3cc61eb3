#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub t: f64,
    pub wpm: f64,
}

impl TimeSeriesPoint {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

impl From<TimeSeriesPoint> for (f64, f64) {
    fn from(p: TimeSeriesPoint) -> Self {
        (p.t, p.wpm)
    }
}

/// Running correct-WPM after each forward keystroke.
///
/// `samples` holds `(timestamp_ms, typed_len)`; the zero-elapsed first
/// keystroke carries no rate and is skipped.
pub fn wpm_series(start_ms: u64, samples: &[(u64, usize)]) -> Vec<TimeSeriesPoint> {
    samples
        .iter()
        .filter(|(ts, _)| *ts > start_ms)
        .map(|&(ts, len)| {
            let elapsed_ms = (ts - start_ms) as f64;
            TimeSeriesPoint::new(
                elapsed_ms / 1000.0,
                len as f64 / 5.0 / (elapsed_ms / 60_000.0),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_skips_start_and_computes_rate() {
        let points = wpm_series(1_000, &[(1_000, 1), (7_000, 10), (13_000, 20)]);
        assert_eq!(
            points,
            vec![
                TimeSeriesPoint::new(6.0, 20.0),
                TimeSeriesPoint::new(12.0, 20.0),
            ]
        );
    }

    #[test]
    fn empty_samples() {
        assert!(wpm_series(0, &[]).is_empty());
    }
}
