use thiserror::Error;

use crate::pattern::ValidationError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure taxonomy for store operations.
///
/// Only [`StoreError::Backend`] is worth retrying; everything else needs a
/// different request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("constraint violated in {operation}: {reason}")]
    Constraint {
        operation: &'static str,
        reason: String,
    },

    #[error("backend unavailable during {operation}{}", fmt_id(.id.as_deref()))]
    Backend {
        operation: &'static str,
        id: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error("{operation} cancelled before completion")]
    Cancelled { operation: &'static str },
}

fn fmt_id(id: Option<&str>) -> String {
    id.map_or_else(String::new, |id| format!(" (id={id})"))
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn constraint(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Constraint {
            operation,
            reason: reason.into(),
        }
    }

    pub fn backend<E>(operation: &'static str, id: Option<&str>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Backend {
            operation,
            id: id.map(ToString::to_string),
            source: source.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}
