//! memdb Library
//!
//! An in-memory storage and query engine for meteorological observations.
//! Stations, level/time-range descriptors, station-level values and observation
//! values are held in append-only arenas and indexed by their application identity,
//! so that ad-hoc queries can be answered without an external database.
//!
//! This library provides tools for:
//! - Find-or-create of stations and level/time-range descriptors with deduplication
//! - Insert-or-replace of observation and station values, with attributes
//! - Index-driven queries combining position, identity, code, date and level filters
//! - Comparison-expression filters on values and their attributes
//! - CSV snapshots of the whole archive, each file replaced atomically

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod datafilter;
        pub mod memdb;
        pub mod snapshot;
        pub mod vartable;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::var::{Var, VarType, VarValue, Varcode, Varinfo};
pub use app::models::{Coords, LevTr, Level, Query, Station, Trange};
pub use app::services::memdb::Memdb;
pub use app::services::vartable::{BufrTable, VarTable};
pub use config::Config;

/// Result type alias for memdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for memdb operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A lookup found no entity, or a slot id addresses a hole
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// An operation would break an identity or reference invariant
    #[error("Consistency error: {message}")]
    Consistency { message: String },

    /// Malformed comparison expression or threshold
    #[error("Parse error in '{input}': {message}")]
    Parse { input: String, message: String },

    /// Value used with an incompatible variable type
    #[error("Type error for {code}: {message}")]
    TypeMismatch { code: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error
    #[error("CSV parsing error in file '{file}': {message}")]
    CsvParsing {
        file: String,
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Date/time parsing error
    #[error("Date/time parsing error: {message}")]
    DateTimeParsing {
        message: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a consistency error
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    /// Create a parse error for the given input text
    pub fn parse(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a type error for a variable code
    pub fn type_mismatch(code: impl ToString, message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a CSV parsing error with context
    pub fn csv_parsing(
        file: impl Into<String>,
        message: impl Into<String>,
        source: Option<csv::Error>,
    ) -> Self {
        Self::CsvParsing {
            file: file.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a date/time parsing error
    pub fn datetime_parsing(message: impl Into<String>, source: chrono::ParseError) -> Self {
        Self::DateTimeParsing {
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for errors reporting a missing entity
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::CsvParsing {
            file: "unknown".to_string(),
            message: "CSV parsing failed".to_string(),
            source: Some(error),
        }
    }
}

impl From<chrono::ParseError> for Error {
    fn from(error: chrono::ParseError) -> Self {
        Self::DateTimeParsing {
            message: "Date/time parsing failed".to_string(),
            source: error,
        }
    }
}
