use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unsupported option: {0}")]
    UnsupportedOption(String),

    #[error("alive predicate takes {0} parameters, expected 3 or 6")]
    InvalidPredicateArity(usize),

    #[error("simulation folder does not exist: {0}")]
    FolderNotFound(PathBuf),

    #[error("missing key in info file: {0}")]
    MissingInfoKey(String),

    #[error("malformed value for info key {key}: {value}")]
    MalformedInfoValue { key: String, value: String },

    #[error("worker pool could not be built: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
