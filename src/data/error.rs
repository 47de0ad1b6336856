use std::path::PathBuf;

use thiserror::Error;

use super::model::Field;

/// Failure to turn a source file into a [`VehicleTable`](super::model::VehicleTable).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("unknown text encoding label '{0}'")]
    UnknownEncoding(String),

    #[error("source is not valid {encoding} text")]
    Decode { encoding: &'static str },

    #[error("delimiter '{0}' is not a single-byte character")]
    InvalidDelimiter(char),

    #[error("malformed CSV")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON")]
    Json(#[from] serde_json::Error),

    #[error("malformed parquet file")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("unreadable arrow batch")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("required columns missing after normalisation: {}", join_fields(.0))]
    MissingColumns(Vec<Field>),

    #[error("source has no header row")]
    EmptySource,
}

/// Outcome of a selection that cannot be turned into a single record.
///
/// None of these are fatal: the user recovers by changing an earlier choice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no vehicle matches the current choices (stopped at {field})")]
    Unresolvable { field: Field },

    #[error("selection is complete but no record matches it")]
    NoMatch,

    #[error("selection is incomplete: {} not chosen", join_fields(.missing))]
    Incomplete { missing: Vec<Field> },

    #[error("{0} is not a selection step of this profile")]
    UnknownField(Field),
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.column_name())
        .collect::<Vec<_>>()
        .join(", ")
}
