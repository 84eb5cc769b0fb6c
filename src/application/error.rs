use std::error::Error as StdError;

use thiserror::Error;

use crate::{domain::error::CacheError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// The error message followed by every underlying source, outermost first.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = self.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        messages
    }
}
