//! The result of one refresh cycle, as delivered to callbacks and subscribers

use crate::error::RefreshError;
use crate::record::PurchaseRecord;
use crate::resolve::ActiveEntitlements;
use std::sync::Arc;

/// Outcome of a refresh cycle.
///
/// `active` and `error` may both be present: a failed cycle still reports the
/// always-active subscriptions it could resolve without a receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    /// Sequence number of the cycle, starting at 1
    pub cycle: u64,
    pub record: Option<PurchaseRecord>,
    pub active: Option<ActiveEntitlements>,
    pub error: Option<RefreshError>,
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Registered result callback.
pub type RefreshCallback = Arc<dyn Fn(&RefreshOutcome) + Send + Sync>;
