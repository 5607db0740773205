use thiserror::Error;

use crate::notify::PipelineStage;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Roster error: {0}")]
    DataSource(String),

    #[error("Mail dispatch failed: {0}")]
    Dispatch(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NotifyError {
    /// Stable tag reported to HTTP clients and stored in run history
    pub fn kind(&self) -> &'static str {
        match self {
            NotifyError::DataSource(_) => "data_source",
            NotifyError::Dispatch(_) => "dispatch",
            NotifyError::Validation(_) => "validation",
            NotifyError::Database(_) => "database",
            NotifyError::Config(_) => "config",
            NotifyError::Io(_) => "io",
            NotifyError::Other(_) => "internal",
        }
    }

    /// Last pipeline stage that completed before this error aborted the request
    pub fn failed_after(&self) -> PipelineStage {
        match self {
            NotifyError::Dispatch(_) => PipelineStage::Filtered,
            _ => PipelineStage::Received,
        }
    }
}

impl From<config::ConfigError> for NotifyError {
    fn from(e: config::ConfigError) -> Self {
        NotifyError::Config(e.to_string())
    }
}

impl From<calamine::Error> for NotifyError {
    fn from(e: calamine::Error) -> Self {
        NotifyError::DataSource(e.to_string())
    }
}

impl From<csv::Error> for NotifyError {
    fn from(e: csv::Error) -> Self {
        NotifyError::DataSource(e.to_string())
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(e: serde_json::Error) -> Self {
        NotifyError::Other(e.into())
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
