use codetype::time_series::TimeSeriesPoint;

/// X (seconds) and Y (WPM) upper bounds for the results chart
pub fn compute_chart_params(series: &[TimeSeriesPoint]) -> (f64, f64) {
    let highest_wpm = series.iter().map(|p| p.wpm).fold(0.0, f64::max);
    let overall_duration = series.last().map_or(1.0, |p| p.t).max(1.0);

    (overall_duration, highest_wpm.round().max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

/// `Some(v)` rendered through `f`, a dash otherwise.
pub fn or_dash<T>(val: Option<T>, f: impl FnOnce(T) -> String) -> String {
    val.map(f).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        assert_eq!(compute_chart_params(&[]), (1.0, 1.0));
    }

    #[test]
    fn test_compute_chart_params_series() {
        let series = [
            TimeSeriesPoint::new(0.4, 30.0),
            TimeSeriesPoint::new(2.5, 61.6),
            TimeSeriesPoint::new(4.0, 55.0),
        ];
        assert_eq!(compute_chart_params(&series), (4.0, 62.0));
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(Some(120u64), |v| format!("{v}ms")), "120ms");
        assert_eq!(or_dash(None::<u64>, |v| format!("{v}ms")), "-");
    }
}
