// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::table::TableKind;

/// Errors raised while turning one XML dump into a normalized table.
///
/// Undefined category codes are never an error: they decode to null.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed XML document {path}: {message}")]
    MalformedDocument { path: PathBuf, message: String },

    #[error("input for {kind} not found at {path}")]
    MissingInput { kind: TableKind, path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl NormalizeError {
    pub fn malformed(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        NormalizeError::MalformedDocument {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NormalizeError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = NormalizeError> = std::result::Result<T, E>;
