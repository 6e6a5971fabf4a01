//! Refresh orchestrator
//!
//! [`SubscriptionMonitor`] owns the product catalog, the last validated
//! receipt, and the last computed entitlements. A refresh cycle fetches the
//! raw receipt, validates it, resolves entitlements, and delivers exactly one
//! [`RefreshOutcome`] to the registered callback and to broadcast
//! subscribers, whichever branch the cycle ends in.
//!
//! Cycles are serialized: a trigger that arrives while a cycle is in flight
//! waits for that cycle to finish. Configuration calls and
//! [`SubscriptionMonitor::snapshot_entitlements`] never wait on a cycle.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{MonitorError, ProviderError, RefreshError, ValidatorError};
use crate::event::{RefreshCallback, RefreshOutcome};
use crate::product::{Catalog, ProductGroup};
use crate::provider::RecordProvider;
use crate::record::{Environment, PurchaseRecord};
use crate::resolve::{resolve, ActiveEntitlements};
use crate::validator::{RecordValidator, ValidationContext};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Tunables for a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub refresh_interval: Duration,
    pub environment: Environment,
    /// Upper bound on one receipt fetch (including its retry)
    pub fetch_timeout: Duration,
    /// Upper bound on one validation round trip
    pub validate_timeout: Duration,
    /// Outcomes buffered per broadcast subscriber
    pub event_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            environment: Environment::default(),
            fetch_timeout: DEFAULT_STAGE_TIMEOUT,
            validate_timeout: DEFAULT_STAGE_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

struct State {
    catalog: Catalog,
    last_validation_time: Option<DateTime<Utc>>,
    current_record: Option<PurchaseRecord>,
    active: Option<ActiveEntitlements>,
    refreshing: bool,
    interval: Duration,
    environment: Environment,
    callback: Option<RefreshCallback>,
    cycles: u64,
}

struct Inner {
    provider: Arc<dyn RecordProvider>,
    validator: Arc<dyn RecordValidator>,
    fetch_timeout: Duration,
    validate_timeout: Duration,
    state: RwLock<State>,
    // Lock order: `timer` before `state`.
    timer: Mutex<Option<JoinHandle<()>>>,
    cycle_gate: tokio::sync::Mutex<()>,
    events: broadcast::Sender<RefreshOutcome>,
}

/// Handle to a subscription monitor. Clones share the same monitor.
#[derive(Clone)]
pub struct SubscriptionMonitor {
    inner: Arc<Inner>,
}

impl SubscriptionMonitor {
    pub fn new(provider: Arc<dyn RecordProvider>, validator: Arc<dyn RecordValidator>) -> Self {
        Self::with_settings(provider, validator, MonitorSettings::default())
    }

    /// A zero interval or stage timeout in `settings` falls back to its default.
    pub fn with_settings(
        provider: Arc<dyn RecordProvider>,
        validator: Arc<dyn RecordValidator>,
        settings: MonitorSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        let interval = or_default(settings.refresh_interval, DEFAULT_REFRESH_INTERVAL);

        Self {
            inner: Arc::new(Inner {
                provider,
                validator,
                fetch_timeout: or_default(settings.fetch_timeout, DEFAULT_STAGE_TIMEOUT),
                validate_timeout: or_default(settings.validate_timeout, DEFAULT_STAGE_TIMEOUT),
                state: RwLock::new(State {
                    catalog: Catalog::new(),
                    last_validation_time: None,
                    current_record: None,
                    active: None,
                    refreshing: false,
                    interval,
                    environment: settings.environment,
                    callback: None,
                    cycles: 0,
                }),
                timer: Mutex::new(None),
                cycle_gate: tokio::sync::Mutex::new(()),
                events,
            }),
        }
    }

    /// Replaces the whole catalog.
    pub fn with_catalog(self, catalog: Catalog) -> Self {
        self.inner.write().catalog = catalog;
        self
    }

    // ── Configuration ─────────────────────────────────────────

    /// Adds or replaces a product group. Does not trigger a refresh.
    pub fn add_group(&self, group: ProductGroup) -> Result<(), MonitorError> {
        self.inner.write().catalog.add_group(group)?;
        Ok(())
    }

    /// Removes a product group. Does not trigger a refresh.
    pub fn remove_group(&self, group_id: &str) -> Option<ProductGroup> {
        self.inner.write().catalog.remove_group(group_id)
    }

    pub fn catalog(&self) -> Catalog {
        self.inner.read().catalog.clone()
    }

    pub fn groups(&self) -> Vec<ProductGroup> {
        self.inner.read().catalog.groups().cloned().collect()
    }

    pub fn environment(&self) -> Environment {
        self.inner.read().environment
    }

    /// Takes effect from the next cycle.
    pub fn set_environment(&self, environment: Environment) {
        self.inner.write().environment = environment;
    }

    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&RefreshOutcome) + Send + Sync + 'static,
    {
        self.inner.write().callback = Some(Arc::new(callback));
    }

    pub fn clear_callback(&self) {
        self.inner.write().callback = None;
    }

    /// Receives every outcome delivered after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshOutcome> {
        self.inner.events.subscribe()
    }

    // ── Periodic refresh ──────────────────────────────────────

    /// Enables periodic refresh. The first cycle runs one full interval from
    /// now. Must be called from within a Tokio runtime.
    pub fn start_refreshing(&self) {
        self.set_refreshing(true);
    }

    /// Disables periodic refresh. A cycle already in flight still completes
    /// and delivers its outcome.
    pub fn stop_refreshing(&self) {
        self.set_refreshing(false);
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.read().refreshing
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.read().interval
    }

    /// Changes the period. While refreshing, the timer restarts so the next
    /// cycle runs one new period from now.
    pub fn set_refresh_interval(&self, interval: Duration) -> Result<(), MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidInterval);
        }
        let mut timer = lock(&self.inner.timer);
        self.inner.write().interval = interval;
        self.restart_timer(&mut timer);
        Ok(())
    }

    /// Resets the timer phase and runs one cycle, returning the outcome that
    /// was delivered to the callback and subscribers.
    ///
    /// The cycle runs on its own task, so it completes and delivers even if
    /// the returned future is dropped.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        {
            let mut timer = lock(&self.inner.timer);
            self.restart_timer(&mut timer);
        }

        let inner = Arc::clone(&self.inner);
        let cycle = tokio::spawn(async move { inner.run_cycle().await });
        match cycle.await {
            Ok(outcome) => outcome,
            // The cycle task is never aborted, so a join error is a panic.
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }

    /// Whether a periodic timer task is currently scheduled.
    pub fn has_timer(&self) -> bool {
        lock(&self.inner.timer)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn set_refreshing(&self, on: bool) {
        let mut timer = lock(&self.inner.timer);
        {
            let mut state = self.inner.write();
            if state.refreshing == on {
                return;
            }
            state.refreshing = on;
        }
        tracing::debug!(refreshing = on, "periodic refresh toggled");
        self.restart_timer(&mut timer);
    }

    /// Tears down the current timer and, if refreshing, schedules a new one.
    fn restart_timer(&self, slot: &mut Option<JoinHandle<()>>) {
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let (refreshing, period) = {
            let state = self.inner.read();
            (state.refreshing, state.interval)
        };
        if refreshing {
            *slot = Some(spawn_timer(&self.inner, period));
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Start time of the most recent cycle.
    pub fn last_validation_time(&self) -> Option<DateTime<Utc>> {
        self.inner.read().last_validation_time
    }

    /// The last receipt that validated and resolved successfully.
    pub fn current_record(&self) -> Option<PurchaseRecord> {
        self.inner.read().current_record.clone()
    }

    /// Entitlements reported by the most recent cycle.
    ///
    /// After a failed cycle this is the fallback set (always-active products
    /// only), not the last successful result.
    pub fn active_entitlements(&self) -> Option<ActiveEntitlements> {
        self.inner.read().active.clone()
    }

    /// Resolves the cached receipt at `at` without any I/O.
    ///
    /// Returns `None` when the receipt no longer resolves against the current
    /// catalog (e.g. a group was removed since it was validated).
    pub fn snapshot_entitlements(&self, at: DateTime<Utc>) -> Option<ActiveEntitlements> {
        let state = self.inner.read();
        match resolve(&state.catalog, state.current_record.as_ref(), at) {
            Ok(active) => Some(active),
            Err(e) => {
                tracing::debug!(error = %e, "entitlement snapshot failed");
                None
            }
        }
    }
}

fn spawn_timer(inner: &Arc<Inner>, period: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            tracing::debug!("periodic refresh fired");
            // Aborting the timer must not cut a cycle short, so the cycle
            // gets its own task; waiting on it keeps ticks from piling up.
            let _ = tokio::spawn(async move {
                inner.run_cycle().await;
            })
            .await;
        }
    })
}

impl Inner {
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_cycle(&self) -> RefreshOutcome {
        let _gate = self.cycle_gate.lock().await;

        let now = Utc::now();
        let (cycle, ctx, fallback) = {
            let mut state = self.write();
            state.cycles += 1;
            state.last_validation_time = Some(now);
            let ctx = ValidationContext {
                environment: state.environment,
            };
            // Without a receipt resolution cannot fail; this is the set the
            // cycle reports if anything below goes wrong.
            let fallback = resolve(&state.catalog, None, now).ok();
            (state.cycles, ctx, fallback)
        };
        tracing::debug!(cycle, environment = %ctx.environment, "refresh cycle started");

        let data = match tokio::time::timeout(self.fetch_timeout, self.provider.get_record()).await
        {
            Ok(Ok(data)) if !data.is_empty() => data,
            Ok(Ok(_)) => {
                let err = RefreshError::NoReceiptAvailable(Some(ProviderError::Empty));
                return self.finish_failed(cycle, None, fallback, err);
            }
            Ok(Err(e)) => {
                let err = RefreshError::NoReceiptAvailable(Some(e));
                return self.finish_failed(cycle, None, fallback, err);
            }
            Err(_) => {
                let err = RefreshError::NoReceiptAvailable(Some(ProviderError::TimedOut(
                    self.fetch_timeout,
                )));
                return self.finish_failed(cycle, None, fallback, err);
            }
        };

        let record = match tokio::time::timeout(
            self.validate_timeout,
            self.validator.validate(&data, &ctx),
        )
        .await
        {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                let err = RefreshError::Validator(Some(e));
                return self.finish_failed(cycle, None, fallback, err);
            }
            Err(_) => {
                let err = RefreshError::Validator(Some(ValidatorError::TimedOut(
                    self.validate_timeout,
                )));
                return self.finish_failed(cycle, None, fallback, err);
            }
        };

        // Validation can take a while; resolve at the moment it finished.
        let resolved = {
            let state = self.read();
            resolve(&state.catalog, Some(&record), Utc::now())
        };
        match resolved {
            Ok(active) => self.finish_ok(cycle, record, active),
            Err(e) => self.finish_failed(cycle, Some(record), fallback, e.into()),
        }
    }

    fn finish_ok(
        &self,
        cycle: u64,
        record: PurchaseRecord,
        active: ActiveEntitlements,
    ) -> RefreshOutcome {
        {
            let mut state = self.write();
            state.current_record = Some(record.clone());
            state.active = Some(active.clone());
        }
        tracing::info!(
            cycle,
            lines = record.lines.len(),
            subscriptions = active.len(),
            "refresh cycle completed"
        );
        self.deliver(RefreshOutcome {
            cycle,
            record: Some(record),
            active: Some(active),
            error: None,
        })
    }

    /// The cached receipt is left alone; the public entitlements become the
    /// fallback set.
    fn finish_failed(
        &self,
        cycle: u64,
        record: Option<PurchaseRecord>,
        fallback: Option<ActiveEntitlements>,
        error: RefreshError,
    ) -> RefreshOutcome {
        self.write().active = fallback.clone();
        tracing::warn!(cycle, error = %error, "refresh cycle failed");
        self.deliver(RefreshOutcome {
            cycle,
            record,
            active: fallback,
            error: Some(error),
        })
    }

    fn deliver(&self, outcome: RefreshOutcome) -> RefreshOutcome {
        let callback = self.read().callback.clone();
        if let Some(callback) = callback {
            callback(&outcome);
        }
        // No subscribers is not an error.
        let _ = self.events.send(outcome.clone());
        outcome
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}

/// Zero durations mean "unset".
fn or_default(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
