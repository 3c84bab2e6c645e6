//! Service-level error taxonomy.
//!
//! # Responsibility
//! - Define the stable error kinds callers (the shell) act on.
//! - Classify repository failures in exactly one place.
//!
//! # Invariants
//! - `NotFound`, `InvalidArguments` and `Cancelled` pass through verbatim.
//! - Everything else, timeouts included, becomes `Internal`.

use crate::repo::task_repo::RepoError;
use crate::validation::{FieldError, ValidationErrors};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse error category exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArguments,
    Internal,
    Cancelled,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidArguments => "invalid_arguments",
            Self::Internal => "internal",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Error returned by task service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Referenced task id does not exist.
    NotFound(String),
    /// Request failed validation before reaching the store.
    InvalidArguments(ValidationErrors),
    /// Store, migration or timeout failure.
    Internal(Box<dyn Error + Send + Sync>),
    /// Caller aborted the operation.
    Cancelled,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn internal(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidArguments(errors) => write!(f, "invalid arguments: {errors}"),
            Self::Internal(err) => write!(f, "internal error: {err}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArguments(errors) => Some(errors),
            Self::Internal(err) => Some(err.as_ref()),
            Self::NotFound(_) | Self::Cancelled => None,
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::InvalidArguments(value)
    }
}

impl From<FieldError> for ServiceError {
    fn from(value: FieldError) -> Self {
        Self::InvalidArguments(value.into())
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id.to_string()),
            RepoError::Cancelled => Self::Cancelled,
            other => Self::internal(other),
        }
    }
}
