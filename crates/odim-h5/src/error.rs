//! Error types for ODIM_H5 object model operations.

use std::fmt;

use thiserror::Error;

use crate::attribute::AttributeType;
use crate::store::{StoreError, Target};

/// Result type for ODIM_H5 operations.
pub type Result<T> = std::result::Result<T, OdimError>;

/// What an error is about: the kind of object, its name and where it lives.
///
/// The path is queried from the backing store when the error is raised, so it
/// is only present if the location handle was still valid at that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub target: Target,
    pub name: Option<String>,
    pub path: Option<String>,
}

impl ErrorContext {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            name: None,
            path: None,
        }
    }

    pub fn named(target: Target, name: impl Into<String>) -> Self {
        Self {
            target,
            name: Some(name.into()),
            path: None,
        }
    }

    pub fn at(mut self, path: Option<String>) -> Self {
        self.path = path;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        if let Some(name) = &self.name {
            write!(f, " '{}'", name)?;
        }
        if let Some(path) = &self.path {
            write!(f, " at {}", path)?;
        }
        Ok(())
    }
}

/// The backing-store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Open,
    Read,
    Write,
    Remove,
}

/// Error types for the ODIM_H5 object model.
#[derive(Error, Debug)]
pub enum OdimError {
    #[error("failed to create {context}: {source}")]
    CreateFailed {
        context: ErrorContext,
        #[source]
        source: StoreError,
    },

    #[error("failed to open {context}: {source}")]
    OpenFailed {
        context: ErrorContext,
        #[source]
        source: StoreError,
    },

    #[error("failed to read {context}: {source}")]
    ReadFailed {
        context: ErrorContext,
        #[source]
        source: StoreError,
    },

    #[error("failed to write {context}: {source}")]
    WriteFailed {
        context: ErrorContext,
        #[source]
        source: StoreError,
    },

    /// Removing an attribute ahead of recreating it failed. The on-disk
    /// state of that attribute is undefined afterwards.
    #[error("failed to remove {context}: {source}")]
    RemoveFailed {
        context: ErrorContext,
        #[source]
        source: StoreError,
    },

    /// An accessor was used that does not match the stored type.
    #[error("type mismatch on {context}: requested {requested}, stored {stored}")]
    TypeMismatch {
        context: ErrorContext,
        requested: AttributeType,
        stored: AttributeType,
    },

    /// The stored value is larger than the buffer sized for it.
    #[error("size mismatch on {context}: stored value is {stored} bytes, buffer holds {capacity}")]
    SizeMismatch {
        context: ErrorContext,
        stored: usize,
        capacity: usize,
    },

    /// Structurally present but semantically invalid.
    #[error("bad value for {context}: {reason}")]
    BadValue {
        context: ErrorContext,
        reason: String,
    },

    #[error("no such {0}")]
    NotFound(ErrorContext),

    #[error("configuration error: {0}")]
    Config(String),
}

impl OdimError {
    /// Wrap a backing-store failure as the error kind for `op`.
    pub fn storage(op: Operation, context: ErrorContext, source: StoreError) -> Self {
        match op {
            Operation::Create => Self::CreateFailed { context, source },
            Operation::Open => Self::OpenFailed { context, source },
            Operation::Read => Self::ReadFailed { context, source },
            Operation::Write => Self::WriteFailed { context, source },
            Operation::Remove => Self::RemoveFailed { context, source },
        }
    }

    pub fn bad_value(context: ErrorContext, reason: impl Into<String>) -> Self {
        Self::BadValue {
            context,
            reason: reason.into(),
        }
    }

    /// Context of the failing object, when the error has one.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::CreateFailed { context, .. }
            | Self::OpenFailed { context, .. }
            | Self::ReadFailed { context, .. }
            | Self::WriteFailed { context, .. }
            | Self::RemoveFailed { context, .. }
            | Self::TypeMismatch { context, .. }
            | Self::SizeMismatch { context, .. }
            | Self::BadValue { context, .. } => Some(context),
            Self::NotFound(context) => Some(context),
            Self::Config(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
