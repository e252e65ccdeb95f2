#![forbid(unsafe_code)]

//! Crate-wide error type and result alias.

use std::error::Error as StdError;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TesseraError>;

/// Errors surfaced by the data-access core.
///
/// Downstream execution failures are carried through unchanged so callers can
/// inspect the storage engine's own error type.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// A by-key operation was invoked on a record type without a resolvable key.
    #[error("{model} has no primary key field")]
    MissingPrimaryKey {
        /// Type name of the record.
        model: String,
    },
    /// The operation needs a collaborator that was not configured.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(&'static str),
    /// The snowflake generator observed the clock moving backwards.
    #[error("clock moved backwards: refusing to generate id ({last} > {now})")]
    ClockRegression {
        /// Last timestamp handed out, in milliseconds.
        last: i64,
        /// Timestamp observed now, in milliseconds.
        now: i64,
    },
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A value could not be converted into the field's Rust type.
    #[error("property '{property}' expects {expected}, found {found}")]
    TypeMismatch {
        /// Property being assigned.
        property: String,
        /// Expected kind.
        expected: &'static str,
        /// Kind that was supplied.
        found: &'static str,
    },
    /// The record type does not declare the property.
    #[error("{model} has no property '{property}'")]
    UnknownProperty {
        /// Type name of the record.
        model: String,
        /// Property that was requested.
        property: String,
    },
    /// Error raised by the bundled SQLite executor.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// Error raised by any other statement executor.
    #[error(transparent)]
    Execution(Box<dyn StdError + Send + Sync>),
}

impl TesseraError {
    /// Wraps an arbitrary executor error.
    pub fn execution<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        TesseraError::Execution(Box::new(err))
    }

    /// Builds a [`TesseraError::TypeMismatch`] for a property assignment.
    pub fn mismatch(property: &str, expected: &'static str, found: &'static str) -> Self {
        TesseraError::TypeMismatch {
            property: property.to_string(),
            expected,
            found,
        }
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            TesseraError::MissingPrimaryKey { .. } => "MissingPrimaryKey",
            TesseraError::UnsupportedCapability(_) => "UnsupportedCapability",
            TesseraError::ClockRegression { .. } => "ClockRegression",
            TesseraError::Config(_) => "Config",
            TesseraError::TypeMismatch { .. } => "TypeMismatch",
            TesseraError::UnknownProperty { .. } => "UnknownProperty",
            TesseraError::Sqlite(_) | TesseraError::Execution(_) => "Execution",
        }
    }

    /// True for errors caused by configuration rather than data or storage.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TesseraError::MissingPrimaryKey { .. }
                | TesseraError::UnsupportedCapability(_)
                | TesseraError::Config(_)
        )
    }
}
