// src/error.rs

use std::io;
use thiserror::Error;

/// Every failure the registry, decoder and persistence layers can raise.
#[derive(Error, Debug)]
pub enum SigtapError {
    #[error("no layout matching `{pattern}` in {source_name}")]
    LayoutNotFound {
        source_name: String,
        pattern: String,
    },

    #[error("layout `{table}` defined twice: `{first}` and `{second}`")]
    DuplicateLayout {
        table: String,
        first: String,
        second: String,
    },

    #[error("invalid column `{column}` in layout `{table}`: {reason}")]
    InvalidLayout {
        table: String,
        column: String,
        reason: String,
    },

    #[error("unreadable layout `{entry}`: {reason}")]
    LayoutFormat { entry: String, reason: String },

    #[error("no layout for data entry `{entry}` (table `{table}`)")]
    UnknownTable { table: String, entry: String },

    #[error("reading data for table `{table}`: {source}")]
    ColumnMismatch {
        table: String,
        #[source]
        source: io::Error,
    },

    #[error("decoded table `{table}` has columns [{found}] but layout `{layout}` expects [{expected}]")]
    LayoutMismatch {
        table: String,
        layout: String,
        expected: String,
        found: String,
    },

    #[error("table `{table}` line {line}: {len} bytes, layout needs {required}")]
    ShortRecord {
        table: String,
        line: usize,
        len: usize,
        required: usize,
    },

    #[error("persisting table `{table}`: {source}")]
    Persistence {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("config: {0}")]
    Config(String),
}

pub type Result<T, E = SigtapError> = std::result::Result<T, E>;

impl SigtapError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        SigtapError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn persistence(table: &str, source: impl Into<anyhow::Error>) -> Self {
        SigtapError::Persistence {
            table: table.to_string(),
            source: source.into(),
        }
    }
}
