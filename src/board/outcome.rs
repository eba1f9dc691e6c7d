use std::fmt;

/// Result of a board operation.
///
/// Every operation resolves to exactly one of these; callers never see a raw
/// store error. The web layer decides how each variant is rendered.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    /// The referenced post does not exist.
    NotFound(String),
    /// A required field was missing or malformed.
    ValidationFailure(String),
    /// The store rejected or failed the operation. The cause has already been
    /// logged; it is kept here for tests and never sent to clients.
    StoreFailure(anyhow::Error),
}

impl<T> Outcome<T> {
    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn invalid(message: impl fmt::Display) -> Self {
        Self::ValidationFailure(message.to_string())
    }

    /// Log `err` against `operation` and wrap it.
    pub fn store_failure(operation: &str, err: anyhow::Error) -> Self {
        tracing::error!(operation, "Board store failure: {err:#}");
        Self::StoreFailure(err)
    }

    /// The success value, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Short-circuit an `anyhow::Result` inside a function returning `Outcome`.
macro_rules! try_store {
    ($operation:expr, $result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => return $crate::board::Outcome::store_failure($operation, err),
        }
    };
}

pub(crate) use try_store;
