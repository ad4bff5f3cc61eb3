use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{decode_response, encode_request, handle_score_request, STATUS_OK};
use crate::score::{ScoreInput, ScoreOutput};
use crate::session::RunId;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("scoring service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("scoring service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed scoring response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// An external scorer. Implementations may block; they are called off
/// the input path.
pub trait ScoreService: Send + Sync + 'static {
    fn score(&self, input: &ScoreInput) -> Result<ScoreOutput, SubmitError>;
}

/// Runs the endpoint handler in-process, going through the same JSON
/// request and response bodies a remote scorer would see.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalScoreService;

impl ScoreService for LocalScoreService {
    fn score(&self, input: &ScoreInput) -> Result<ScoreOutput, SubmitError> {
        let response = handle_score_request(&encode_request(input));
        if response.status != STATUS_OK {
            return Err(SubmitError::Rejected {
                status: response.status,
                body: response.body,
            });
        }
        Ok(decode_response(&response.body)?)
    }
}

/// Outcome of one submission; `score` is `None` when the scorer failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub run_id: RunId,
    pub score: Option<ScoreOutput>,
}

/// Fire-and-forget submission to a `ScoreService` on a worker thread.
pub struct Submitter<S: ScoreService> {
    service: Arc<S>,
    tx: Sender<Scored>,
    rx: Receiver<Scored>,
}

impl<S: ScoreService> Submitter<S> {
    pub fn new(service: S) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            service: Arc::new(service),
            tx,
            rx,
        }
    }

    pub fn submit(&self, run_id: RunId, input: ScoreInput) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();

        thread::spawn(move || {
            let score = match service.score(&input) {
                Ok(output) => {
                    debug!(run = run_id.0, score = output.score, "score received");
                    Some(output)
                }
                Err(err) => {
                    warn!(run = run_id.0, error = %err, "score submission failed");
                    None
                }
            };
            // receiver gone means the app shut down
            let _ = tx.send(Scored { run_id, score });
        });
    }

    /// Non-blocking check for a finished submission.
    pub fn poll(&self) -> Option<Scored> {
        match self.rx.try_recv() {
            Ok(scored) => Some(scored),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocking variant for headless callers.
    pub fn wait(&self, timeout: std::time::Duration) -> Option<Scored> {
        self.rx.recv_timeout(timeout).ok()
    }
}
