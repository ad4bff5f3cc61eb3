use crossterm::event::KeyEvent;
use tracing::{debug, info};

use crate::keystroke::{Interpreter, KeyAction, Progress};
use crate::prompts::Prompt;
use crate::score::{compute_score, ScoreInput, ScoreOutput, ScoringMode};
use crate::session::{RunId, SessionState, SessionTracker};
use crate::stats::{self, compute_run_stats, RunStats, RunTotals};
use crate::submit::Scored;
use crate::time_series::{wpm_series, TimeSeriesPoint};

/// Everything known about a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub run_id: RunId,
    pub prompt: Prompt,
    pub stats: RunStats,
    /// Scored locally the moment the run finished
    pub provisional: ScoreOutput,
    /// Reply from the external scorer; `None` until it arrives or if it failed
    pub remote: Option<ScoreOutput>,
    pub remote_settled: bool,
    pub wpm_series: Vec<TimeSeriesPoint>,
}

impl RunResult {
    /// The score to show: the scorer's if it answered, else the local one.
    pub fn score(&self) -> &ScoreOutput {
        self.remote.as_ref().unwrap_or(&self.provisional)
    }

    pub fn score_input(&self, scoring_mode: ScoringMode) -> ScoreInput {
        score_input(&self.prompt, &self.stats, scoring_mode)
    }
}

pub fn score_input(prompt: &Prompt, stats: &RunStats, scoring_mode: ScoringMode) -> ScoreInput {
    ScoreInput::new(
        stats.correct_chars as f64,
        stats.total_typed_chars as f64,
        stats.duration_ms as f64,
    )
    .with_difficulty(prompt.difficulty)
    .with_target_chars(stats.target_chars as f64)
    .with_consistency(stats.consistency.map(f64::from))
    .with_scoring_mode(scoring_mode)
}

/// One typing run over one prompt.
#[derive(Debug)]
pub struct Game {
    prompt: Prompt,
    interpreter: Interpreter,
    tracker: SessionTracker,
    scoring_mode: ScoringMode,
    last_progress: Option<Progress>,
    samples: Vec<(u64, usize)>,
    result: Option<RunResult>,
}

impl Game {
    pub fn new(prompt: Prompt, scoring_mode: ScoringMode, now_ms: u64) -> Self {
        let mut tracker = SessionTracker::new(now_ms);
        tracker.reset(now_ms);
        Self {
            interpreter: Interpreter::new(&prompt.code),
            prompt,
            tracker,
            scoring_mode,
            last_progress: None,
            samples: Vec::new(),
            result: None,
        }
    }

    /// Start over on `prompt`. The previous run's id stops being accepted.
    pub fn reset(&mut self, prompt: Prompt, now_ms: u64) -> RunId {
        self.interpreter = Interpreter::new(&prompt.code);
        self.prompt = prompt;
        self.last_progress = None;
        self.samples.clear();
        self.result = None;
        let run_id = self.tracker.reset(now_ms);
        debug!(run = run_id.0, prompt = %self.prompt.id, "new run");
        run_id
    }

    pub fn restart(&mut self, now_ms: u64) -> RunId {
        self.reset(self.prompt.clone(), now_ms)
    }

    pub fn set_scoring_mode(&mut self, scoring_mode: ScoringMode) {
        self.scoring_mode = scoring_mode;
    }

    pub fn scoring_mode(&self) -> ScoringMode {
        self.scoring_mode
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn run_id(&self) -> RunId {
        self.tracker.run_id()
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn session(&self) -> &SessionState {
        self.tracker.state()
    }

    pub fn result(&self) -> Option<&RunResult> {
        self.result.as_ref()
    }

    pub fn has_started(&self) -> bool {
        self.last_progress.is_some()
    }

    pub fn has_finished(&self) -> bool {
        self.result.is_some()
    }

    /// Feed one key. Returns the result when this key finished the run.
    pub fn on_key(&mut self, key: &KeyEvent, timestamp: u64) -> Option<&RunResult> {
        if self.has_finished() {
            return None;
        }
        let progress = self.interpreter.handle_key(key, timestamp)?;
        self.on_progress(progress)
    }

    /// Same as `on_key` for an already-classified action.
    pub fn on_action(&mut self, action: KeyAction, timestamp: u64) -> Option<&RunResult> {
        if self.has_finished() {
            return None;
        }
        let progress = self.interpreter.apply(action, timestamp)?;
        self.on_progress(progress)
    }

    pub fn on_paste(&self, text: &str) {
        self.interpreter.handle_paste(text);
    }

    fn on_progress(&mut self, progress: Progress) -> Option<&RunResult> {
        let run_id = self.tracker.run_id();
        if !self.tracker.ingest(run_id, &progress) {
            return None;
        }

        if !progress.is_error {
            self.samples.push((progress.timestamp, progress.typed_len()));
        }

        let complete = progress.typed_len() == self.interpreter.target_len();
        let completed_at = progress.timestamp;
        self.last_progress = Some(progress);

        if complete {
            self.finish(run_id, completed_at);
            return self.result.as_ref();
        }
        None
    }

    fn finish(&mut self, run_id: RunId, completed_at: u64) {
        let Some(last) = self.last_progress.as_ref() else {
            return;
        };

        let state = self.tracker.take(completed_at);
        let duration_ms = stats::duration_ms(state.start_ms, completed_at);
        let totals = RunTotals {
            target_chars: self.interpreter.target_len(),
            correct_chars: last.correct_characters,
            total_typed_chars: last.total_typed_characters,
            duration_ms,
            time_to_first_key_ms: stats::time_to_first_key_ms(
                state.start_ms,
                state.first_render_ms,
            ),
        };

        let run_stats = compute_run_stats(&state, totals);
        let provisional = compute_score(&score_input(&self.prompt, &run_stats, self.scoring_mode));
        let series = wpm_series(state.start_ms.unwrap_or(completed_at), &self.samples);

        info!(
            run = run_id.0,
            prompt = %self.prompt.id,
            wpm = run_stats.correct_wpm,
            accuracy = run_stats.accuracy,
            score = provisional.score,
            "run complete"
        );

        self.result = Some(RunResult {
            run_id,
            prompt: self.prompt.clone(),
            stats: run_stats,
            provisional,
            remote: None,
            remote_settled: false,
            wpm_series: series,
        });
    }

    /// Attach a scorer reply. Replies for earlier runs are dropped.
    pub fn apply_remote_score(&mut self, scored: Scored) -> bool {
        match self.result.as_mut() {
            Some(result) if result.run_id == scored.run_id => {
                result.remote = scored.score;
                result.remote_settled = true;
                true
            }
            _ => {
                debug!(run = scored.run_id.0, "ignoring score for stale run");
                false
            }
        }
    }

    /// Correct words per minute so far.
    pub fn live_wpm(&self, now_ms: u64) -> f64 {
        match (self.session().start_ms, &self.last_progress) {
            (Some(start), Some(last)) => {
                let elapsed = now_ms.saturating_sub(start).max(1);
                last.correct_characters as f64 / 5.0 / (elapsed as f64 / 60_000.0)
            }
            _ => 0.0,
        }
    }

    pub fn live_accuracy(&self) -> f64 {
        match &self.last_progress {
            Some(p) if p.total_typed_characters > 0 => {
                p.correct_characters as f64 / p.total_typed_characters as f64
            }
            _ => 0.0,
        }
    }
}
