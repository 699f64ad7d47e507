use crate::reconcile::{MonitorSnapshot, Reconciler, RunContext, TickError, TickOutcome};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Main monitor loop.
///
/// The first tick runs immediately, then one per `period`. Each tick is
/// awaited before the next one is considered, and late ticks are skipped
/// rather than bunched up, so two ticks never touch `ctx` at once. Returns
/// when `shutdown` resolves.
pub async fn run_monitor_loop(
    reconciler: Reconciler,
    mut ctx: RunContext,
    period: Duration,
    snapshots: watch::Sender<MonitorSnapshot>,
    shutdown: impl Future<Output = ()>,
) -> RunContext {
    info!(period_secs = period.as_secs(), "Monitor loop started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Monitor loop stopping");
                break;
            }
            _ = interval.tick() => {
                let outcome = tick_once(&reconciler, &mut ctx).await;
                snapshots.send_replace(ctx.snapshot(Some(outcome)));
            }
        }
    }

    ctx
}

/// Run a single tick and log its outcome. Tick errors never escape.
pub async fn tick_once(reconciler: &Reconciler, ctx: &mut RunContext) -> TickOutcome {
    let at = reconciler.now();
    match reconciler.tick(ctx).await {
        Ok(report) => {
            info!(
                polled = report.polled,
                transitions = report.transitions.len(),
                alerts = report.alerts,
                "Tick complete"
            );
            let error = report
                .delivery
                .as_ref()
                .and_then(|d| d.error.clone())
                .map(|e| format!("alert delivery: {e}"));
            TickOutcome {
                at: report.at,
                ok: true,
                transitions: report.transitions.len(),
                alerts: report.alerts,
                error,
            }
        }
        Err(e) => {
            match &e {
                TickError::Source(_) => warn!("Tick skipped: {}", e),
                TickError::Storage(_) => error!("Tick aborted, transition log unavailable: {}", e),
            }
            TickOutcome {
                at,
                ok: false,
                transitions: 0,
                alerts: 0,
                error: Some(e.to_string()),
            }
        }
    }
}
