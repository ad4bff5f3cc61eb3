use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::util::{clamp, lerp};

const MAX_DIFFICULTY_MULTIPLIER: f64 = 1.35;
const MAX_CONSISTENCY_MULTIPLIER: f64 = 1.2;
const CONSISTENCY_BONUS: f64 = 0.2;
/// Snippets at or above this many characters use raw accuracy.
const ACCURACY_NORMALIZATION_CHARS: f64 = 80.0;

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }
}

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScoringMode {
    /// cWPM * accuracy, nothing else
    Simple,
    #[default]
    Tuned,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInput {
    pub correct_characters: f64,
    pub total_typed_characters: f64,
    pub time_ms: f64,
    pub difficulty: Difficulty,
    pub target_chars: f64,
    pub consistency: Option<f64>,
    pub scoring_mode: ScoringMode,
}

impl ScoreInput {
    /// Input with the service defaults: easy, tuned, no consistency and
    /// `target_chars == correct_characters`.
    pub fn new(correct_characters: f64, total_typed_characters: f64, time_ms: f64) -> Self {
        Self {
            correct_characters,
            total_typed_characters,
            time_ms,
            difficulty: Difficulty::default(),
            target_chars: correct_characters,
            consistency: None,
            scoring_mode: ScoringMode::default(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_target_chars(mut self, target_chars: f64) -> Self {
        self.target_chars = target_chars;
        self
    }

    pub fn with_consistency(mut self, consistency: Option<f64>) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_scoring_mode(mut self, scoring_mode: ScoringMode) -> Self {
        self.scoring_mode = scoring_mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutput {
    #[serde(rename = "cWPM")]
    pub cwpm: f64,
    /// Raw accuracy in 0..=1, never the length-normalized value
    pub accuracy: f64,
    pub score: f64,
}

pub fn difficulty_multiplier(difficulty: Difficulty) -> f64 {
    let multiplier = match difficulty {
        Difficulty::Easy => 1.0,
        Difficulty::Medium => 1.15,
        Difficulty::Hard => 1.35,
    };
    clamp(multiplier, 1.0, MAX_DIFFICULTY_MULTIPLIER)
}

/// Quadratic bonus on a 0..=100 consistency score. Missing data is neutral.
pub fn consistency_multiplier(consistency: Option<f64>) -> f64 {
    let Some(consistency) = consistency else {
        return 1.0;
    };

    let normalized = clamp(consistency, 0.0, 100.0) / 100.0;
    let multiplier = 1.0 + normalized.powi(2) * CONSISTENCY_BONUS;

    clamp(multiplier, 1.0, MAX_CONSISTENCY_MULTIPLIER)
}

/// Pulls accuracy toward 1.0 on snippets shorter than 80 characters.
pub fn effective_accuracy(accuracy: f64, target_chars: f64) -> f64 {
    let t = clamp(target_chars / ACCURACY_NORMALIZATION_CHARS, 0.0, 1.0);
    lerp(1.0, accuracy, t)
}

pub fn compute_score(input: &ScoreInput) -> ScoreOutput {
    let time_ms = input.time_ms.max(1.0);

    let cwpm = input.correct_characters / 5.0 / (time_ms / 60_000.0);
    let accuracy = if input.total_typed_characters > 0.0 {
        input.correct_characters / input.total_typed_characters
    } else {
        0.0
    };

    let score = match input.scoring_mode {
        ScoringMode::Simple => cwpm * accuracy,
        ScoringMode::Tuned => {
            cwpm * effective_accuracy(accuracy, input.target_chars)
                * difficulty_multiplier(input.difficulty)
                * consistency_multiplier(input.consistency)
        }
    };

    ScoreOutput {
        cwpm,
        accuracy,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base() -> ScoreInput {
        ScoreInput::new(100.0, 100.0, 60_000.0)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[rstest]
    #[case(Difficulty::Easy, 1.0)]
    #[case(Difficulty::Medium, 1.15)]
    #[case(Difficulty::Hard, 1.35)]
    fn difficulty_table(#[case] difficulty: Difficulty, #[case] expected: f64) {
        assert_eq!(difficulty_multiplier(difficulty), expected);
        assert!(difficulty_multiplier(difficulty) <= MAX_DIFFICULTY_MULTIPLIER);
    }

    #[test]
    fn consistency_multiplier_bounds() {
        assert_eq!(consistency_multiplier(None), 1.0);
        assert_eq!(consistency_multiplier(Some(0.0)), 1.0);
        assert_eq!(consistency_multiplier(Some(100.0)), 1.2);
        assert_eq!(consistency_multiplier(Some(150.0)), 1.2);
        assert_eq!(consistency_multiplier(Some(-10.0)), 1.0);
    }

    #[test]
    fn consistency_multiplier_is_monotonic() {
        let values: Vec<f64> = (0..=100)
            .map(|c| consistency_multiplier(Some(c as f64)))
            .collect();
        for pair in values.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn consistency_bonus_is_quadratic() {
        let mid_bonus = consistency_multiplier(Some(50.0)) - 1.0;
        let max_bonus = consistency_multiplier(Some(100.0)) - 1.0;
        assert!(mid_bonus < max_bonus / 2.0);
    }

    #[rstest]
    #[case(0.9, 80.0, 0.9)]
    #[case(0.9, 200.0, 0.9)]
    #[case(0.5, 0.0, 1.0)]
    #[case(0.8, 40.0, 0.9)]
    #[case(0.8, 20.0, 0.95)]
    #[case(1.0, 40.0, 1.0)]
    fn effective_accuracy_cases(
        #[case] accuracy: f64,
        #[case] target_chars: f64,
        #[case] expected: f64,
    ) {
        assert!(close(effective_accuracy(accuracy, target_chars), expected));
    }

    #[test]
    fn baseline_score() {
        let out = compute_score(&base());
        assert!(close(out.cwpm, 20.0));
        assert_eq!(out.accuracy, 1.0);
        assert!(close(out.score, 20.0));
    }

    #[test]
    fn difficulty_scales_score() {
        let easy = compute_score(&base().with_difficulty(Difficulty::Easy));
        let medium = compute_score(&base().with_difficulty(Difficulty::Medium));
        let hard = compute_score(&base().with_difficulty(Difficulty::Hard));

        assert!(hard.score > medium.score && medium.score > easy.score);
        assert!(close(hard.score / easy.score, 1.35));
        assert!(close(medium.score / easy.score, 1.15));
    }

    #[test]
    fn combined_multiplier_is_capped() {
        let plain = compute_score(&base());
        let maxed = compute_score(
            &base()
                .with_difficulty(Difficulty::Hard)
                .with_consistency(Some(100.0)),
        );
        let ratio = maxed.score / plain.score;
        assert!(close(ratio, 1.62));
        assert!(ratio <= 1.62 + 1e-9);
    }

    #[test]
    fn reports_raw_accuracy() {
        let out = compute_score(&ScoreInput::new(36.0, 40.0, 60_000.0).with_target_chars(40.0));
        assert!(close(out.accuracy, 0.9));
        // 40 chars => halfway between 1.0 and 0.9
        assert!(close(out.score, out.cwpm * 0.95));
    }

    #[test]
    fn simple_mode_ignores_multipliers() {
        let input = ScoreInput::new(90.0, 100.0, 30_000.0).with_scoring_mode(ScoringMode::Simple);
        let plain = compute_score(&input);
        let decorated = compute_score(
            &input
                .with_difficulty(Difficulty::Hard)
                .with_consistency(Some(100.0))
                .with_target_chars(10.0),
        );

        assert_eq!(plain.score, decorated.score);
        assert_eq!(plain.score, plain.cwpm * plain.accuracy);
    }

    #[test]
    fn zero_inputs_are_finite() {
        let out = compute_score(&ScoreInput::new(0.0, 0.0, 0.0));
        assert_eq!(out.cwpm, 0.0);
        assert_eq!(out.accuracy, 0.0);
        assert_eq!(out.score, 0.0);

        let out = compute_score(&ScoreInput::new(10.0, 10.0, 0.0));
        assert!(out.cwpm.is_finite());
        assert!(out.score.is_finite());
    }

    #[test]
    fn difficulty_parses_lowercase() {
        assert_eq!(Difficulty::from_str("hard", true), Ok(Difficulty::Hard));
        assert_eq!(Difficulty::Medium.to_string(), "medium");
        assert_eq!(Difficulty::Hard.next(), Difficulty::Easy);
    }
}
