//! Offline validator for development receipts

use async_trait::async_trait;
use subwatch_core::{PurchaseRecord, RecordValidator, ValidationContext, ValidatorError};

/// Parses the receipt bytes as an already-validated JSON [`PurchaseRecord`].
///
/// A record that names an environment must match the one being validated
/// against, so a sandbox receipt never unlocks production entitlements.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalValidator;

#[async_trait]
impl RecordValidator for LocalValidator {
    async fn validate(
        &self,
        data: &[u8],
        ctx: &ValidationContext,
    ) -> Result<PurchaseRecord, ValidatorError> {
        let record: PurchaseRecord =
            serde_json::from_slice(data).map_err(|e| ValidatorError::Malformed(e.to_string()))?;

        match record.environment {
            Some(env) if env != ctx.environment => Err(ValidatorError::Rejected(format!(
                "{env} receipt used in {} environment",
                ctx.environment
            ))),
            _ => Ok(record),
        }
    }
}
