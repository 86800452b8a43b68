use std::path::PathBuf;

use shared::domain::{RatingDimension, RatingScoreError, Screen};
use thiserror::Error;

/// A screen's answers are incomplete or malformed. The participant stays on
/// the current screen and nothing is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("consent must be given before the study can begin")]
    ConsentNotGiven,
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
    #[error("no rating selected for {0}")]
    MissingRating(RatingDimension),
    #[error("rating for {dimension} is invalid: {source}")]
    InvalidRating {
        dimension: RatingDimension,
        source: RatingScoreError,
    },
    #[error("unknown rating dimension `{0}`")]
    UnknownDimension(String),
    #[error("`{value}` is not a valid answer for `{field}`")]
    InvalidChoice { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("action belongs to the {expected} screen but the session is on {actual}")]
    WrongScreen { expected: Screen, actual: Screen },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("playback has not been started")]
    PlaybackNotStarted,
    #[error("playback has not reached the end of the presentation")]
    PlaybackIncomplete,
    #[error("tick addressed to playback {received} but playback {current} is active")]
    StalePlayback { received: u64, current: u64 },
}

impl FlowError {
    pub fn is_validation(&self) -> bool {
        matches!(self, FlowError::Validation(_))
    }
}

/// The report was asked to summarize a record the flow should never have
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("session record has no {0} rating")]
    MissingRating(RatingDimension),
    #[error("session record {index} has no {dimension} rating")]
    IncompleteStoredSession {
        index: usize,
        dimension: RatingDimension,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write export artifact '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid persistence endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("persistence request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("persistence service rejected the session with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
