use tracing::{debug, warn};

use crate::keystroke::Progress;

/// Identifies one run; bumped on every reset so stale events can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunId(pub u64);

impl RunId {
    pub fn next(self) -> Self {
        RunId(self.0 + 1)
    }
}

/// Raw telemetry for a single run. Only `SessionTracker` mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub start_ms: Option<u64>,
    pub first_render_ms: u64,
    pub keystrokes: Vec<u64>,
    /// Non-error, length-increasing events only
    pub progress_keystrokes: Vec<u64>,
    pub backspaces: usize,
    pub prev_typed_len: usize,
    /// Expected character -> miss count, in first-miss order
    pub error_counts: Vec<(char, usize)>,
    pub pending_error_ms: Option<u64>,
    pub correction_latencies: Vec<u64>,
}

impl SessionState {
    pub fn new(first_render_ms: u64) -> Self {
        Self {
            start_ms: None,
            first_render_ms,
            keystrokes: Vec::new(),
            progress_keystrokes: Vec::new(),
            backspaces: 0,
            prev_typed_len: 0,
            error_counts: Vec::new(),
            pending_error_ms: None,
            correction_latencies: Vec::new(),
        }
    }

    pub fn error_count(&self, c: char) -> usize {
        self.error_counts
            .iter()
            .find(|(k, _)| *k == c)
            .map_or(0, |(_, n)| *n)
    }

    fn record_error(&mut self, c: char) {
        match self.error_counts.iter_mut().find(|(k, _)| *k == c) {
            Some((_, n)) => *n += 1,
            None => self.error_counts.push((c, 1)),
        }
    }
}

/// Accumulates progress events; never computes aggregates.
#[derive(Debug)]
pub struct SessionTracker {
    run_id: RunId,
    state: SessionState,
}

impl SessionTracker {
    pub fn new(now_ms: u64) -> Self {
        Self {
            run_id: RunId::default(),
            state: SessionState::new(now_ms),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Replace the whole state and start a new run.
    pub fn reset(&mut self, now_ms: u64) -> RunId {
        self.run_id = self.run_id.next();
        self.state = SessionState::new(now_ms);
        debug!(run = self.run_id.0, "session reset");
        self.run_id
    }

    /// Hand the finished state over, leaving a fresh one behind.
    pub fn take(&mut self, now_ms: u64) -> SessionState {
        std::mem::replace(&mut self.state, SessionState::new(now_ms))
    }

    /// Returns false when the event belongs to an earlier run.
    pub fn ingest(&mut self, run_id: RunId, progress: &Progress) -> bool {
        if run_id != self.run_id {
            warn!(
                event_run = run_id.0,
                current_run = self.run_id.0,
                "dropping progress from stale run"
            );
            return false;
        }

        let state = &mut self.state;
        let typed_len = progress.typed_len();
        let ts = progress.timestamp;

        if state.start_ms.is_none() {
            state.start_ms = Some(ts);
        }

        if !progress.is_error && typed_len > state.prev_typed_len {
            state.progress_keystrokes.push(ts);
        }

        if typed_len < state.prev_typed_len {
            state.backspaces += state.prev_typed_len - typed_len;
        }

        if progress.is_error_recovery {
            if let Some(err_ms) = state.pending_error_ms.take() {
                state.correction_latencies.push(ts.saturating_sub(err_ms));
            }
        }

        state.prev_typed_len = typed_len;

        if progress.is_error {
            if let Some(expected) = progress.expected_char {
                state.record_error(expected);
                state.pending_error_ms = Some(ts);
            }
        }

        state.keystrokes.push(ts);
        true
    }
}
