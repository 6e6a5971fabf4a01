//! Receipt validation capability

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ValidatorError;
use crate::record::{Environment, PurchaseRecord};

/// What the monitor hands the validator besides the receipt bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationContext {
    pub environment: Environment,
}

/// Submits raw receipt bytes to a trust-issuing authority and parses the reply.
#[async_trait]
pub trait RecordValidator: Send + Sync {
    async fn validate(
        &self,
        data: &[u8],
        ctx: &ValidationContext,
    ) -> Result<PurchaseRecord, ValidatorError>;
}

#[async_trait]
impl<V: RecordValidator + ?Sized> RecordValidator for Arc<V> {
    async fn validate(
        &self,
        data: &[u8],
        ctx: &ValidationContext,
    ) -> Result<PurchaseRecord, ValidatorError> {
        (**self).validate(data, ctx).await
    }
}
