use subwatch_cli::sources::FileReceiptSource;
use subwatch_core::{ProviderError, ReceiptSource, RecordProvider, RetryingProvider};

#[tokio::test]
async fn reads_receipt_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("receipt.json");
    std::fs::write(&path, b"{}").unwrap();

    let source = FileReceiptSource::new(&path, None).unwrap();
    assert_eq!(source.read().await.unwrap(), b"{}");
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let source = FileReceiptSource::new(tmp.path().join("nope.json"), None).unwrap();
    assert!(matches!(
        source.read().await.unwrap_err(),
        ProviderError::NotFound(_)
    ));
}

#[tokio::test]
async fn empty_file_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("receipt.json");
    std::fs::write(&path, b"").unwrap();

    let source = FileReceiptSource::new(&path, None).unwrap();
    assert_eq!(source.read().await.unwrap_err(), ProviderError::Empty);
}

#[tokio::test]
async fn refresh_without_url_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let source = FileReceiptSource::new(tmp.path().join("receipt.json"), None).unwrap();
    assert!(matches!(
        source.request_refresh().await.unwrap_err(),
        ProviderError::RefreshFailed(_)
    ));
}

#[tokio::test]
async fn retrying_provider_reports_the_refresh_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let source = FileReceiptSource::new(tmp.path().join("receipt.json"), None).unwrap();
    let provider = RetryingProvider::new(source);

    let err = provider.get_record().await.unwrap_err();
    assert!(matches!(err, ProviderError::RefreshFailed(_)));
}

#[tokio::test]
async fn stored_receipt_is_recognised_by_clones() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("receipt.json");
    let source = FileReceiptSource::new(&path, None).unwrap();
    let watcher_side = source.clone();

    assert!(!watcher_side.is_own_write().await);

    source.store(b"").await.unwrap();
    assert!(watcher_side.is_own_write().await);
    assert_eq!(source.read().await.unwrap_err(), ProviderError::Empty);

    std::fs::write(&path, b"{}").unwrap();
    assert!(!watcher_side.is_own_write().await);
}
