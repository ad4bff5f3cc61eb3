use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::score::Difficulty;

static PROMPT_DIR: Dir = include_dir!("src/prompts");
const CATALOGUE_FILE: &str = "catalogue.json";

pub const LINE_OPTIONS: [u8; 3] = [1, 2, 3];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub language: String,
    pub code: String,
    pub difficulty: Difficulty,
    pub lines: u8,
}

impl Prompt {
    /// A user-supplied snippet outside the catalogue.
    pub fn custom(code: String, difficulty: Difficulty) -> Self {
        let lines = code.split('\n').count().min(u8::MAX as usize) as u8;
        Self {
            id: "custom".to_string(),
            language: "text".to_string(),
            code,
            difficulty,
            lines,
        }
    }
}

/// Supplies the next target snippet.
pub trait TargetProvider {
    fn first(&self, lines: u8, difficulty: Difficulty) -> Prompt;
    fn random(&self, lines: u8, difficulty: Difficulty) -> Prompt;
}

#[derive(Debug, Clone)]
pub struct Catalogue {
    prompts: Vec<Prompt>,
}

impl Catalogue {
    pub fn embedded() -> Result<Self> {
        let file = PROMPT_DIR
            .get_file(CATALOGUE_FILE)
            .ok_or(Error::MissingAsset(CATALOGUE_FILE))?;
        let text = file
            .contents_utf8()
            .ok_or(Error::InvalidAsset(CATALOGUE_FILE))?;
        Self::from_prompts(serde_json::from_str(text)?)
    }

    pub fn from_prompts(prompts: Vec<Prompt>) -> Result<Self> {
        if prompts.is_empty() {
            return Err(Error::EmptyCatalogue);
        }
        Ok(Self { prompts })
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn eligible(&self, lines: u8, difficulty: Difficulty) -> Vec<&Prompt> {
        self.prompts
            .iter()
            .filter(|p| p.lines == lines && p.difficulty == difficulty)
            .collect()
    }

    fn fallback(&self) -> Prompt {
        // from_prompts guarantees at least one entry
        self.prompts[0].clone()
    }
}

impl TargetProvider for Catalogue {
    fn first(&self, lines: u8, difficulty: Difficulty) -> Prompt {
        self.eligible(lines, difficulty)
            .first()
            .map(|p| (*p).clone())
            .unwrap_or_else(|| self.fallback())
    }

    fn random(&self, lines: u8, difficulty: Difficulty) -> Prompt {
        self.eligible(lines, difficulty)
            .choose(&mut rand::thread_rng())
            .map(|p| (*p).clone())
            .unwrap_or_else(|| self.fallback())
    }
}

/// Always hands back the same snippet, e.g. a `--prompt` from the command line.
#[derive(Debug, Clone)]
pub struct FixedTarget(pub Prompt);

impl TargetProvider for FixedTarget {
    fn first(&self, _lines: u8, _difficulty: Difficulty) -> Prompt {
        self.0.clone()
    }

    fn random(&self, _lines: u8, difficulty: Difficulty) -> Prompt {
        Prompt {
            difficulty,
            ..self.0.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn embedded_catalogue_covers_every_combination() {
        let catalogue = Catalogue::embedded().unwrap();
        for lines in LINE_OPTIONS {
            for difficulty in Difficulty::ALL {
                let eligible = catalogue.eligible(lines, difficulty);
                assert!(!eligible.is_empty(), "{lines} {difficulty}");
                for p in eligible {
                    assert_eq!(p.code.split('\n').count(), lines as usize);
                }
            }
        }
    }

    #[test]
    fn first_prompt_is_deterministic() {
        let catalogue = Catalogue::embedded().unwrap();
        let p = catalogue.first(1, Difficulty::Easy);
        assert_eq!(p.id, "00");
        assert_eq!(p.code, "function noop() {}");
    }

    #[test]
    fn random_prompt_respects_filters() {
        let catalogue = Catalogue::embedded().unwrap();
        for _ in 0..20 {
            let p = catalogue.random(2, Difficulty::Hard);
            assert_eq!(p.lines, 2);
            assert_eq!(p.difficulty, Difficulty::Hard);
        }
    }

    #[test]
    fn unmatched_filter_falls_back_to_first_entry() {
        let catalogue = Catalogue::embedded().unwrap();
        assert_eq!(catalogue.random(9, Difficulty::Easy).id, "00");
    }

    #[test]
    fn empty_catalogue_is_rejected() {
        assert_matches!(Catalogue::from_prompts(vec![]), Err(Error::EmptyCatalogue));
    }

    #[test]
    fn custom_prompt_counts_lines() {
        let p = Prompt::custom("a\nb".to_string(), Difficulty::Medium);
        assert_eq!(p.lines, 2);
        assert_eq!(FixedTarget(p.clone()).random(1, Difficulty::Hard).code, "a\nb");
    }
}
