//! chargewatch -- charging connector status monitor.
//!
//! Polls a charge-point backend for connector statuses, records every status
//! transition in an append-only CSV log, and sends batched alerts when
//! connectors go offline or recover.

pub mod alert;
pub mod api;
pub mod clock;
pub mod config;
pub mod notify;
pub mod reconcile;
pub mod scheduler;
pub mod status;
pub mod storage;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::notify::{AlertChannel, LogChannel, Notifier, TelegramChannel};
use crate::reconcile::{Reconciler, RunContext, TickReport};
use crate::status::HttpStatusSource;
use crate::storage::CsvTransitionLog;

/// Open the transition log described by `config`.
pub fn open_log(config: &Config) -> Result<CsvTransitionLog> {
    Ok(CsvTransitionLog::new(
        config.log.path.clone(),
        config.log.segmenting,
        config.log.offset()?,
    ))
}

/// Telegram when credentials are present, otherwise the tracing log.
pub fn build_notifier(config: &Config) -> Result<Notifier> {
    let channel: Arc<dyn AlertChannel> = match config.telegram.credentials() {
        Some((token, chat_id)) => Arc::new(TelegramChannel::new(
            &config.telegram.api_base,
            token,
            chat_id,
            std::time::Duration::from_secs(config.telegram.timeout_secs),
        )?),
        None => {
            tracing::warn!("Telegram credentials not configured, alerts go to the log only");
            Arc::new(LogChannel)
        }
    };
    Ok(Notifier::new(
        channel,
        config.monitor.batch_size,
        config.monitor.batch_pause(),
    ))
}

pub fn build_reconciler(config: &Config) -> Result<Reconciler> {
    if config.source.url.is_empty() {
        bail!("source.url is not configured");
    }
    let source = HttpStatusSource::new(
        &config.source.url,
        &config.source.bearer_token,
        config.source.timeout(),
        &config.source.user_agent,
    )?;
    let store = open_log(config)?;
    let clock = SystemClock::new(config.log.offset()?);

    Ok(Reconciler::new(
        Arc::new(source),
        Arc::new(store),
        build_notifier(config)?,
        Arc::new(clock),
    )
    .with_failure_threshold(config.monitor.failure_threshold))
}

/// Start the monitor daemon: replay the log, optionally serve the status
/// API, and tick until Ctrl-C.
pub async fn run(config: &Config, bind: Option<String>) -> Result<()> {
    let reconciler = build_reconciler(config)?;
    let ctx = RunContext::restore(reconciler.store().as_ref())
        .context("Failed to replay transition log")?;

    let (snapshots, rx) = watch::channel(ctx.snapshot(None));

    if let Some(bind) = bind.or_else(|| config.api.bind.clone()) {
        let addr: std::net::SocketAddr = bind
            .parse()
            .with_context(|| format!("invalid bind address '{}'", bind))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind status API on {}", addr))?;
        let app = api::router(api::state::AppState { snapshots: rx });

        tracing::info!(%addr, "Status API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Status API stopped: {}", e);
            }
        });
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    scheduler::run_monitor_loop(
        reconciler,
        ctx,
        config.monitor.poll_interval(),
        snapshots,
        shutdown,
    )
    .await;
    Ok(())
}

/// Replay the log and run exactly one tick.
pub async fn check_once(config: &Config) -> Result<TickReport> {
    let reconciler = build_reconciler(config)?;
    let mut ctx = RunContext::restore(reconciler.store().as_ref())
        .context("Failed to replay transition log")?;
    Ok(reconciler.tick(&mut ctx).await?)
}
