use crate::eval::{DatasetName, SampleUid, SplitName};

// ---------------------------------------------------------------------------
// Sub-error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset request failed: {0}")]
    Connection(String),
    #[error("dataset service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("failed to decode dataset payload: {0}")]
    Decode(String),
    #[error("split {split} of {dataset} returned no rows")]
    EmptySplit {
        dataset: DatasetName,
        split: SplitName,
    },
    #[error("row {row} has no usable image under key {key}")]
    MissingImageField { row: usize, key: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to decode template record: {0}")]
    Decode(String),
    #[error("template set declares no query templates")]
    NoTemplates,
    #[error("template set declares no data pairs")]
    NoPairs,
    #[error("unknown query template {name}")]
    MissingTemplate { name: String },
    #[error("no condition phrases for category {category}")]
    MissingCategory { category: String },
    #[error("split {split} maps to no condition category")]
    UnknownSplit { split: SplitName },
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("session has not been started with a user id")]
    NotStarted,
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session already submitted")]
    AlreadySubmitted,
    #[error("score must be between 1 and 10, got {value}")]
    ScoreOutOfRange { value: u8 },
    #[error("sample {uid} must be scored before it can be skipped")]
    SkipUnscored { uid: SampleUid },
    #[error("submit is only available on the last sample, currently at {current} of {total}")]
    SubmitNotReady { current: usize, total: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink io error: {0}")]
    Io(String),
    #[error("sink connection failed: {0}")]
    Connection(String),
    #[error("sink returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("failed to encode response row: {0}")]
    Encode(String),
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
