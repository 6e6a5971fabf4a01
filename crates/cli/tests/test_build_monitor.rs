use std::path::Path;
use subwatch_cli::sources::build_monitor;
use subwatch_core::{
    Environment, Product, ProductGroup, ProviderError, RefreshError, SubwatchConfig,
    ValidatorError, ValidatorKind,
};

fn local_config(dir: &Path) -> SubwatchConfig {
    let mut config = SubwatchConfig::default();
    config.receipt.path = dir.join("receipt.json");
    config.validator.kind = ValidatorKind::Local;
    config.groups.push(ProductGroup::new(
        "plan",
        vec![
            Product::new("plan.pro", 1),
            Product::new("plan.basic", 2),
            Product::free("plan.free", 3),
        ],
    ));
    config
}

const PRO_RECEIPT: &str = r#"{
    "environment": "production",
    "lines": [
        {"product_id": "plan.basic", "purchased_at": "2020-01-01T00:00:00Z"},
        {"product_id": "plan.pro", "purchased_at": "2020-01-01T00:00:00Z"}
    ]
}"#;

#[tokio::test]
async fn local_receipt_resolves_to_best_tier() {
    let tmp = tempfile::tempdir().unwrap();
    let config = local_config(tmp.path());
    std::fs::write(&config.receipt.path, PRO_RECEIPT).unwrap();

    let monitor = build_monitor(&config, false).unwrap();
    let outcome = monitor.refresh_now().await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    let active = outcome.active.unwrap();
    assert_eq!(active.get("plan").unwrap().product.id, "plan.pro");
    assert!(monitor.current_record().is_some());
}

#[tokio::test]
async fn sandbox_flag_overrides_configured_environment() {
    let tmp = tempfile::tempdir().unwrap();
    let config = local_config(tmp.path());
    std::fs::write(&config.receipt.path, PRO_RECEIPT).unwrap();

    let monitor = build_monitor(&config, true).unwrap();
    assert_eq!(monitor.environment(), Environment::Sandbox);

    let outcome = monitor.refresh_now().await;
    assert!(matches!(
        outcome.error,
        Some(RefreshError::Validator(Some(ValidatorError::Rejected(_))))
    ));
    // Free tier still reported
    assert_eq!(
        outcome.active.unwrap().get("plan").unwrap().product.id,
        "plan.free"
    );
}

#[tokio::test]
async fn missing_receipt_without_refresh_url() {
    let tmp = tempfile::tempdir().unwrap();
    let config = local_config(tmp.path());

    let monitor = build_monitor(&config, false).unwrap();
    let outcome = monitor.refresh_now().await;

    assert!(matches!(
        outcome.error,
        Some(RefreshError::NoReceiptAvailable(Some(
            ProviderError::RefreshFailed(_)
        )))
    ));
    assert!(monitor.current_record().is_none());
}

#[test]
fn conflicting_groups_fail_to_build() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = local_config(tmp.path());
    config
        .groups
        .push(ProductGroup::new("other", vec![Product::new("plan.pro", 1)]));

    assert!(build_monitor(&config, false).is_err());
}

#[test]
fn building_does_not_start_the_timer() {
    let tmp = tempfile::tempdir().unwrap();
    let monitor = build_monitor(&local_config(tmp.path()), false).unwrap();
    assert!(!monitor.is_refreshing());
    assert!(monitor.last_validation_time().is_none());
}
