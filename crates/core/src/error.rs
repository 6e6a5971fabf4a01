//! Error taxonomy
//!
//! Every error that can end up inside a [`crate::RefreshOutcome`] is `Clone`,
//! because outcomes are broadcast to any number of subscribers. Underlying
//! causes are carried as messages rather than boxed sources for that reason.

use std::time::Duration;

/// Failure to obtain the raw receipt bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("receipt not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("receipt is empty")]
    Empty,
    #[error("receipt refresh failed: {0}")]
    RefreshFailed(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Failure to turn receipt bytes into a validated [`crate::PurchaseRecord`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    #[error("network error: {0}")]
    Network(String),
    #[error("receipt rejected: {0}")]
    Rejected(String),
    #[error("malformed validator response: {0}")]
    Malformed(String),
    #[error("validator returned no record")]
    NoRecord,
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("receipt references unknown product '{0}'")]
    UnknownProduct(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("product '{product}' already belongs to group '{group}'")]
    DuplicateProduct { product: String, group: String },
    #[error("product group id must not be empty")]
    EmptyGroupId,
}

/// The error reported by a refresh cycle, alongside its fallback entitlements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no receipt available{}", cause(.0))]
    NoReceiptAvailable(Option<ProviderError>),
    #[error("receipt validation failed{}", cause(.0))]
    Validator(Option<ValidatorError>),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Errors returned by monitor configuration calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("refresh interval must be greater than zero")]
    InvalidInterval,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn cause<E: std::fmt::Display>(err: &Option<E>) -> String {
    err.as_ref().map(|e| format!(": {e}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_error_display_includes_cause() {
        let err = RefreshError::NoReceiptAvailable(Some(ProviderError::Empty));
        assert_eq!(err.to_string(), "no receipt available: receipt is empty");

        let err = RefreshError::Validator(None);
        assert_eq!(err.to_string(), "receipt validation failed");
    }

    #[test]
    fn resolve_error_is_transparent() {
        let err: RefreshError = ResolveError::UnknownProduct("x.gold".into()).into();
        assert_eq!(err.to_string(), "receipt references unknown product 'x.gold'");
    }
}
