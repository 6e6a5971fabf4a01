//! Raw receipt acquisition
//!
//! [`RecordProvider`] is the capability the monitor depends on. The default
//! implementation, [`RetryingProvider`], wraps the two platform primitives of a
//! [`ReceiptSource`] and enforces "read once, refresh once on failure, read
//! once more, then give up".

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::ProviderError;

/// Supplies raw receipt bytes.
#[async_trait]
pub trait RecordProvider: Send + Sync {
    async fn get_record(&self) -> Result<Vec<u8>, ProviderError>;
}

/// Platform primitives for the default provider.
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    /// One-shot read of the locally stored receipt.
    async fn read(&self) -> Result<Vec<u8>, ProviderError>;

    /// Ask the store to refresh the local receipt.
    async fn request_refresh(&self) -> Result<(), ProviderError>;
}

#[async_trait]
impl<S: ReceiptSource + ?Sized> ReceiptSource for Arc<S> {
    async fn read(&self) -> Result<Vec<u8>, ProviderError> {
        (**self).read().await
    }

    async fn request_refresh(&self) -> Result<(), ProviderError> {
        (**self).request_refresh().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    RefreshRequested,
}

/// Default [`RecordProvider`]: at most one remote refresh per failed read.
///
/// Calls are serialized; a second `get_record` waits for the first to finish
/// instead of sharing its refresh. Each call starts from [`RetryState::Idle`],
/// so a failed call leaves the next one eligible for its own retry.
pub struct RetryingProvider<S> {
    source: S,
    state: Mutex<RetryState>,
    turn: tokio::sync::Mutex<()>,
}

impl<S: ReceiptSource> RetryingProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: Mutex::new(RetryState::Idle),
            turn: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> RetryState {
        *lock(&self.state)
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: ReceiptSource> RecordProvider for RetryingProvider<S> {
    async fn get_record(&self) -> Result<Vec<u8>, ProviderError> {
        let _turn = self.turn.lock().await;

        let first = match self.source.read().await {
            Ok(data) => return Ok(data),
            Err(e) => e,
        };
        tracing::debug!(error = %first, "receipt read failed, requesting refresh");

        let refreshed = {
            let _pending = StateGuard::enter(&self.state);
            self.source.request_refresh().await
        };

        match refreshed {
            Ok(()) => self.source.read().await,
            Err(e) => {
                tracing::debug!(error = %e, "receipt refresh failed");
                Err(e)
            }
        }
    }
}

/// Holds `RefreshRequested` for its lifetime; back to `Idle` on drop, which
/// also covers a caller abandoning the future mid-refresh.
struct StateGuard<'a> {
    state: &'a Mutex<RetryState>,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a Mutex<RetryState>) -> Self {
        *lock(state) = RetryState::RefreshRequested;
        Self { state }
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = RetryState::Idle;
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
