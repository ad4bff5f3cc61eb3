// Typing core shared by the `codetype` binary and the integration tests.
// Terminal rendering stays in the binary.
pub mod api;
pub mod app_dirs;
pub mod codec;
pub mod config;
pub mod error;
pub mod game;
pub mod history;
pub mod keystroke;
pub mod prompts;
pub mod runtime;
pub mod score;
pub mod session;
pub mod stats;
pub mod submit;
pub mod time_series;
pub mod util;

pub use error::{Error, Result};
