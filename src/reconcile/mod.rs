//! The poll/diff/log/notify cycle.
//!
//! Each tick polls the status source, maps raw labels, and for every
//! connector whose canonical status changed appends a transition to the log
//! *before* updating memory. The log is therefore always a superset of what
//! memory reflects, even if the process dies between the two steps.

pub mod context;

pub use self::context::{MonitorSnapshot, RunContext, TickOutcome};

use crate::alert::{format, AlertPolicy};
use crate::clock::Clock;
use crate::notify::{DispatchReport, Notifier};
use crate::status::{map_status, SourceError, StatusSource};
use crate::storage::{StorageError, TransitionRecord, TransitionStore};
use chrono::{DateTime, FixedOffset, SubsecRound};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn, Instrument};

/// Consecutive source failures that raise the one-off failure alert.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What one successful tick did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub at: DateTime<FixedOffset>,
    pub polled: usize,
    pub transitions: Vec<TransitionRecord>,
    pub alerts: usize,
    pub delivery: Option<DispatchReport>,
}

pub struct Reconciler {
    source: Arc<dyn StatusSource>,
    store: Arc<dyn TransitionStore>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    policy: AlertPolicy,
    failure_threshold: u32,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn StatusSource>,
        store: Arc<dyn TransitionStore>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            clock,
            policy: AlertPolicy::default(),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn TransitionStore> {
        &self.store
    }

    /// Current time, truncated to whole seconds as it is stored in the log.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().trunc_subsecs(0)
    }

    /// Run one full cycle against `ctx`. Must not be called concurrently on
    /// the same context.
    pub async fn tick(&self, ctx: &mut RunContext) -> Result<TickReport, TickError> {
        let span = tracing::info_span!("tick", id = %uuid::Uuid::new_v4());
        self.run_tick(ctx).instrument(span).await
    }

    async fn run_tick(&self, ctx: &mut RunContext) -> Result<TickReport, TickError> {
        let now = self.now();

        let polled = match self.source.fetch().await {
            Ok(polled) => polled,
            Err(e) => {
                let failures = ctx.record_failure();
                warn!(failures, threshold = self.failure_threshold, "Status poll failed: {}", e);
                if failures == self.failure_threshold {
                    self.raise_failure_alert(failures, &e).await;
                }
                return Err(e.into());
            }
        };

        let cleared = ctx.reset_failures();
        if cleared > 0 {
            info!(after_failures = cleared, "Status source recovered");
        }

        let suppress_alerts = ctx.is_first_tick();
        let mut transitions = Vec::new();
        let mut alerts = Vec::new();

        for (id, raw) in &polled {
            let status = map_status(raw);
            let prior = ctx.state(id);
            if prior.is_some_and(|p| p.status == status) {
                continue;
            }

            let record = TransitionRecord::observed(now, id, prior, &status);
            if let Err(e) = self.store.append(&record) {
                error!(connector = %id, "Failed to append transition, state left unchanged: {}", e);
                return Err(e.into());
            }
            ctx.commit(record.to_state());

            info!(
                connector = %id,
                from = record.old_status_label(),
                to = %record.new_status,
                after = record.duration_label(),
                "Connector transition"
            );

            if !suppress_alerts && self.policy.should_alert(&record) {
                alerts.push(format::transition_block(&record));
            }
            transitions.push(record);
        }

        if suppress_alerts {
            info!(connectors = polled.len(), transitions = transitions.len(), "Initial snapshot recorded, alerts suppressed");
            ctx.finish_first_tick();
        }

        let delivery = if alerts.is_empty() {
            None
        } else {
            Some(self.notifier.dispatch(&format::batch_header(&now), &alerts).await)
        };

        Ok(TickReport {
            at: now,
            polled: polled.len(),
            transitions,
            alerts: alerts.len(),
            delivery,
        })
    }

    async fn raise_failure_alert(&self, failures: u32, err: &SourceError) {
        let block = format::failure_block(failures, &err.to_string());
        let report = self
            .notifier
            .dispatch(&format::failure_header(), std::slice::from_ref(&block))
            .await;
        if !report.is_complete() {
            warn!("Failure alert could not be delivered");
        }
    }
}
