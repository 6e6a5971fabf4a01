//! Tests for the one-retry record acquisition policy

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subwatch_core::{ProviderError, ReceiptSource, RecordProvider, RetryState, RetryingProvider};

/// Source whose reads and refreshes follow a script.
#[derive(Default)]
struct ScriptedSource {
    reads: Mutex<VecDeque<Result<Vec<u8>, ProviderError>>>,
    refreshes: Mutex<VecDeque<Result<(), ProviderError>>>,
    read_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    refresh_delay: Option<Duration>,
}

impl ScriptedSource {
    fn new(
        reads: Vec<Result<Vec<u8>, ProviderError>>,
        refreshes: Vec<Result<(), ProviderError>>,
    ) -> Self {
        Self {
            reads: Mutex::new(reads.into()),
            refreshes: Mutex::new(refreshes.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ReceiptSource for ScriptedSource {
    async fn read(&self) -> Result<Vec<u8>, ProviderError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.reads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::NotFound("script exhausted".into())))
    }

    async fn request_refresh(&self) -> Result<(), ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.refresh_delay {
            tokio::time::sleep(delay).await;
        }
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::RefreshFailed("script exhausted".into())))
    }
}

fn missing() -> ProviderError {
    ProviderError::NotFound("receipt.json".into())
}

#[tokio::test]
async fn successful_read_needs_no_refresh() {
    let source = Arc::new(ScriptedSource::new(vec![Ok(b"r1".to_vec())], vec![]));
    let provider = RetryingProvider::new(Arc::clone(&source));

    assert_eq!(provider.get_record().await.unwrap(), b"r1");
    assert_eq!(source.read_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.state(), RetryState::Idle);
}

#[tokio::test]
async fn failed_read_then_refresh_then_read_succeeds_once() {
    let source = Arc::new(ScriptedSource::new(
        vec![Err(missing()), Ok(b"fresh".to_vec())],
        vec![Ok(())],
    ));
    let provider = RetryingProvider::new(Arc::clone(&source));

    let data = provider.get_record().await.unwrap();
    assert_eq!(data, b"fresh");
    assert_eq!(source.read_calls.load(Ordering::SeqCst), 2);
    assert_eq!(source.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.state(), RetryState::Idle);
}

#[tokio::test]
async fn failed_refresh_fails_the_call_and_returns_to_idle() {
    let source = Arc::new(ScriptedSource::new(
        vec![Err(missing()), Err(missing()), Ok(b"later".to_vec())],
        vec![Err(ProviderError::RefreshFailed("store offline".into())), Ok(())],
    ));
    let provider = RetryingProvider::new(Arc::clone(&source));

    let err = provider.get_record().await.unwrap_err();
    assert_eq!(err, ProviderError::RefreshFailed("store offline".into()));
    assert_eq!(source.read_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.state(), RetryState::Idle);

    // The next call gets its own retry.
    let data = provider.get_record().await.unwrap();
    assert_eq!(data, b"later");
    assert_eq!(source.refresh_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn read_failing_after_refresh_is_not_retried_again() {
    let source = Arc::new(ScriptedSource::new(
        vec![Err(missing()), Err(ProviderError::Io("permission denied".into()))],
        vec![Ok(()), Ok(())],
    ));
    let provider = RetryingProvider::new(Arc::clone(&source));

    let err = provider.get_record().await.unwrap_err();
    assert_eq!(err, ProviderError::Io("permission denied".into()));
    assert_eq!(source.read_calls.load(Ordering::SeqCst), 2);
    assert_eq!(source.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn state_is_refresh_requested_while_refreshing() {
    let mut source = ScriptedSource::new(vec![Err(missing()), Ok(b"ok".to_vec())], vec![Ok(())]);
    source.refresh_delay = Some(Duration::from_secs(5));
    let provider = Arc::new(RetryingProvider::new(source));

    let task = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.get_record().await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(provider.state(), RetryState::RefreshRequested);

    assert_eq!(task.await.unwrap().unwrap(), b"ok");
    assert_eq!(provider.state(), RetryState::Idle);
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_are_serialized() {
    let mut source = ScriptedSource::new(
        vec![Err(missing()), Ok(b"first".to_vec()), Ok(b"second".to_vec())],
        vec![Ok(())],
    );
    source.refresh_delay = Some(Duration::from_secs(5));
    let provider = Arc::new(RetryingProvider::new(source));

    let first = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.get_record().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.get_record().await })
    };

    assert_eq!(first.await.unwrap().unwrap(), b"first");
    assert_eq!(second.await.unwrap().unwrap(), b"second");
    assert_eq!(provider.source().refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_call_resets_state() {
    let mut source = ScriptedSource::new(vec![Err(missing())], vec![Ok(())]);
    source.refresh_delay = Some(Duration::from_secs(60));
    let provider = RetryingProvider::new(source);

    let result = tokio::time::timeout(Duration::from_secs(1), provider.get_record()).await;
    assert!(result.is_err());
    assert_eq!(provider.state(), RetryState::Idle);
}
