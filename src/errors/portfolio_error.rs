use std::path::PathBuf;

use thiserror::Error;

use super::IoError;

/* Fatal conditions: the run stops and the binary exits with a non-zero status */
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("input path {} does not exist", .0.display())]
    InputNotFound(PathBuf),
    #[error("no transactions found")]
    EmptyPortfolio,
    #[error("exchange {0} has no past transaction")]
    EmptyExchange(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Io(#[from] IoError),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot {} is invalid: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] IoError),
}
