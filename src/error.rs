use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("embedded file not found: {0}")]
    MissingAsset(&'static str),

    #[error("embedded file is not valid utf-8: {0}")]
    InvalidAsset(&'static str),

    #[error("prompt catalogue is empty")]
    EmptyCatalogue,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
