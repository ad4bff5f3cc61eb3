use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::session::SessionState;
use crate::util::{mean, std_dev, wpm};

const PROBLEM_KEY_LIMIT: usize = 3;

/// Aggregate results of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub duration_ms: u64,
    pub time_to_first_key_ms: Option<u64>,
    pub target_chars: usize,
    pub correct_chars: usize,
    pub total_typed_chars: usize,
    pub mistakes: usize,
    pub backspaces: usize,
    pub raw_wpm: f64,
    pub correct_wpm: f64,
    pub accuracy: f64,
    pub consistency: Option<u32>,
    pub problem_keys: Vec<char>,
    pub longest_pause_ms: Option<u64>,
    pub avg_correction_latency_ms: Option<f64>,
}

/// Counters known only to the caller at completion time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunTotals {
    pub target_chars: usize,
    pub correct_chars: usize,
    pub total_typed_chars: usize,
    pub duration_ms: u64,
    pub time_to_first_key_ms: Option<u64>,
}

/// `max(1, completion - (start ?? completion))`
pub fn duration_ms(start_ms: Option<u64>, completion_ms: u64) -> u64 {
    let start = start_ms.unwrap_or(completion_ms);
    completion_ms.saturating_sub(start).max(1)
}

pub fn time_to_first_key_ms(start_ms: Option<u64>, first_render_ms: u64) -> Option<u64> {
    start_ms.map(|start| start.saturating_sub(first_render_ms))
}

/// Rhythm score in 0..=100 from the coefficient of variation of the
/// positive inter-keystroke intervals. `None` without enough data.
pub fn compute_consistency(timestamps: &[u64]) -> Option<u32> {
    if timestamps.len() < 4 {
        return None;
    }

    let intervals: Vec<f64> = timestamps
        .iter()
        .tuple_windows()
        .filter(|(a, b)| b > a)
        .map(|(a, b)| (b - a) as f64)
        .collect();

    if intervals.len() < 3 {
        return None;
    }

    let avg = mean(&intervals)?;
    if avg <= 0.0 {
        return None;
    }
    let cv = std_dev(&intervals)? / avg;
    let score = (100.0 - cv * 100.0).clamp(0.0, 100.0);

    Some(score.round() as u32)
}

/// Up to three most-missed characters. Ties keep first-miss order.
pub fn problem_keys(error_counts: &[(char, usize)]) -> Vec<char> {
    error_counts
        .iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(PROBLEM_KEY_LIMIT)
        .map(|(c, _)| *c)
        .collect()
}

pub fn longest_pause_ms(progress_keystrokes: &[u64]) -> Option<u64> {
    progress_keystrokes
        .iter()
        .tuple_windows()
        .map(|(a, b)| b.saturating_sub(*a))
        .max()
}

pub fn avg_correction_latency_ms(latencies: &[u64]) -> Option<f64> {
    let values: Vec<f64> = latencies.iter().map(|l| *l as f64).collect();
    mean(&values)
}

pub fn compute_run_stats(state: &SessionState, totals: RunTotals) -> RunStats {
    let RunTotals {
        target_chars,
        correct_chars,
        total_typed_chars,
        duration_ms,
        time_to_first_key_ms,
    } = totals;

    let accuracy = if total_typed_chars > 0 {
        correct_chars as f64 / total_typed_chars as f64
    } else {
        0.0
    };

    RunStats {
        duration_ms,
        time_to_first_key_ms,
        target_chars,
        correct_chars,
        total_typed_chars,
        mistakes: total_typed_chars.saturating_sub(correct_chars),
        backspaces: state.backspaces,
        raw_wpm: wpm(total_typed_chars, duration_ms),
        correct_wpm: wpm(correct_chars, duration_ms),
        accuracy,
        consistency: compute_consistency(&state.keystrokes),
        problem_keys: problem_keys(&state.error_counts),
        longest_pause_ms: longest_pause_ms(&state.progress_keystrokes),
        avg_correction_latency_ms: avg_correction_latency_ms(&state.correction_latencies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_needs_enough_samples() {
        assert_eq!(compute_consistency(&[]), None);
        assert_eq!(compute_consistency(&[0, 100, 200]), None);
        // four stamps but two duplicates leave only two positive deltas
        assert_eq!(compute_consistency(&[0, 0, 100, 200]), None);
    }

    #[test]
    fn perfectly_even_rhythm_scores_100() {
        assert_eq!(compute_consistency(&[0, 100, 200, 300, 400]), Some(100));
    }

    #[test]
    fn consistency_uses_population_variance() {
        // deltas 100, 200, 300: mean 200, population sd ~81.65, cv ~0.408
        assert_eq!(compute_consistency(&[0, 100, 300, 600]), Some(59));
    }

    #[test]
    fn erratic_rhythm_clamps_to_zero() {
        assert_eq!(compute_consistency(&[0, 1, 2, 3, 5_000]), Some(0));
    }

    #[test]
    fn problem_keys_top_three_with_stable_ties() {
        let counts = vec![('a', 1), ('b', 3), ('c', 1), ('d', 2), ('e', 1)];
        assert_eq!(problem_keys(&counts), vec!['b', 'd', 'a']);
        assert!(problem_keys(&[]).is_empty());
    }

    #[test]
    fn longest_pause_needs_two_stamps() {
        assert_eq!(longest_pause_ms(&[]), None);
        assert_eq!(longest_pause_ms(&[500]), None);
        assert_eq!(longest_pause_ms(&[0, 100, 900, 1_000]), Some(800));
    }

    #[test]
    fn avg_latency() {
        assert_eq!(avg_correction_latency_ms(&[]), None);
        assert_eq!(avg_correction_latency_ms(&[100, 300]), Some(200.0));
    }

    #[test]
    fn duration_and_first_key() {
        assert_eq!(duration_ms(Some(1_000), 3_000), 2_000);
        assert_eq!(duration_ms(None, 3_000), 1);
        assert_eq!(duration_ms(Some(3_000), 3_000), 1);
        assert_eq!(time_to_first_key_ms(Some(1_500), 1_000), Some(500));
        assert_eq!(time_to_first_key_ms(Some(900), 1_000), Some(0));
        assert_eq!(time_to_first_key_ms(None, 1_000), None);
    }

    #[test]
    fn run_stats_from_state() {
        let mut state = SessionState::new(0);
        state.keystrokes = vec![100, 200, 300, 400];
        state.progress_keystrokes = vec![100, 200, 400];
        state.backspaces = 1;
        state.error_counts = vec![('o', 2), ('p', 1)];
        state.correction_latencies = vec![50, 150];

        let stats = compute_run_stats(
            &state,
            RunTotals {
                target_chars: 10,
                correct_chars: 10,
                total_typed_chars: 12,
                duration_ms: 60_000,
                time_to_first_key_ms: Some(100),
            },
        );

        assert_eq!(stats.mistakes, 2);
        assert_eq!(stats.backspaces, 1);
        assert!((stats.accuracy - 10.0 / 12.0).abs() < 1e-12);
        assert!((stats.raw_wpm - 2.4).abs() < 1e-12);
        assert!((stats.correct_wpm - 2.0).abs() < 1e-12);
        assert_eq!(stats.consistency, Some(100));
        assert_eq!(stats.problem_keys, vec!['o', 'p']);
        assert_eq!(stats.longest_pause_ms, Some(200));
        assert_eq!(stats.avg_correction_latency_ms, Some(100.0));
    }

    #[test]
    fn empty_run_has_zero_accuracy() {
        let stats = compute_run_stats(
            &SessionState::new(0),
            RunTotals {
                target_chars: 0,
                correct_chars: 0,
                total_typed_chars: 0,
                duration_ms: 1,
                time_to_first_key_ms: None,
            },
        );
        assert_eq!(stats.accuracy, 0.0);
        assert_eq!(stats.consistency, None);
        assert_eq!(stats.longest_pause_ms, None);
        assert_eq!(stats.avg_correction_latency_ms, None);
    }
}
