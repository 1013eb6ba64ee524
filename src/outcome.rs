//! Explicit build/lookup outcome. Fallback tiers branch on these variants
//! instead of swallowing errors.

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Artifact or result available.
    Ready(T),
    /// Corpus or interaction matrix is empty. Expected during cold start.
    NoData,
    /// Anchor product or buyer has no row in the relevant matrix.
    UnknownAnchor,
    /// The store could not be read.
    Failed(StoreError),
}

impl<T> Outcome<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ready(v) => Outcome::Ready(f(v)),
            Outcome::NoData => Outcome::NoData,
            Outcome::UnknownAnchor => Outcome::UnknownAnchor,
            Outcome::Failed(e) => Outcome::Failed(e),
        }
    }

    /// Chain a lookup that can itself miss.
    pub fn and_then<U, F: FnOnce(T) -> Outcome<U>>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ready(v) => f(v),
            Outcome::NoData => Outcome::NoData,
            Outcome::UnknownAnchor => Outcome::UnknownAnchor,
            Outcome::Failed(e) => Outcome::Failed(e),
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Ready(_) => "ready",
            Outcome::NoData => "no-data",
            Outcome::UnknownAnchor => "unknown-anchor",
            Outcome::Failed(_) => "failed",
        }
    }
}

impl<T> From<Result<Option<T>, StoreError>> for Outcome<T> {
    fn from(r: Result<Option<T>, StoreError>) -> Self {
        match r {
            Ok(Some(v)) => Outcome::Ready(v),
            Ok(None) => Outcome::NoData,
            Err(e) => Outcome::Failed(e),
        }
    }
}
