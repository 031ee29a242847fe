//! Error types for ipidx.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for index build operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Two source tables that must have one entry per row disagree in length
    #[error("table length mismatch: {table} has {actual} rows, expected {expected}")]
    TableLengthMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A table's byte length is not a whole number of records
    #[error("truncated table: {table} is {len} bytes, not a multiple of {record_size}-byte records")]
    TruncatedTable {
        table: &'static str,
        len: usize,
        record_size: usize,
    },

    /// A computed read offset falls outside a source buffer
    #[error("offset out of bounds: {table}[{offset}..{end}] exceeds table length {len}")]
    OffsetOutOfBounds {
        table: &'static str,
        offset: usize,
        end: usize,
        len: usize,
    },

    /// A location id of zero has no record (ids are 1-based)
    #[error("invalid location id: 0")]
    InvalidLocationId,

    /// Country code field holds bytes outside `A`-`Z`
    #[error("invalid country code: {0}")]
    InvalidCountryCode(String),

    /// Numeric country code outside the encodable range
    #[error("invalid country code number: {0}")]
    InvalidCountryNumber(u16),

    /// Geocode packing requested without a location table
    #[error("location table required for geocode packing")]
    MissingLocationTable,

    /// IO error with the offending path
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Attach the offending path to an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for index build operations.
pub type Result<T> = std::result::Result<T, Error>;
