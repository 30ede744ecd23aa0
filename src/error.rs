use std::path::PathBuf;

use thiserror::Error;

/// A file in the incoming tree could not become an acquisition record.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{path}: failed to open DICOM file ({message})")]
    Open { path: PathBuf, message: String },

    #[error("{path}: missing required attribute {attribute}")]
    MissingAttribute {
        path: PathBuf,
        attribute: &'static str,
    },
}

/// Persisting a metadata correction back to the source file failed.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{path}: not a readable DICOM file ({message})")]
    Unreadable { path: PathBuf, message: String },

    #[error("{path}: {message}")]
    Dicom { path: PathBuf, message: String },

    #[error("{path}: missing attribute {attribute}")]
    MissingAttribute {
        path: PathBuf,
        attribute: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("{path}: {field} is required for {slot}")]
    MissingField {
        path: PathBuf,
        field: &'static str,
        slot: &'static str,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("analyzer command is not configured")]
    NotConfigured,

    #[error("failed to run analyzer: {0}")]
    Io(#[from] std::io::Error),

    #[error("analyzer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("analyzer output is not valid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("expected a {expected} result, analyzer returned {actual}")]
    UnexpectedResult {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid analyzer result: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("malformed {field} value {value:?}")]
    Format { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("{path} is not under {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Everything that can stop a single cohort from being analysed.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("slot {0} is empty")]
    MissingSlot(&'static str),

    #[error("{folder}: no readable slice left in series")]
    EmptySeries { folder: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Fatal for a whole pass.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("cannot read incoming tree {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}
