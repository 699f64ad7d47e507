//! Alert delivery -- channel trait, batching dispatcher, and channels.
//!
//! Delivery is best-effort: a failed batch stops the remaining batches for
//! that dispatch, and nothing is retried.

pub mod log;
pub mod telegram;

pub use self::log::LogChannel;
pub use self::telegram::TelegramChannel;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}

/// A destination for formatted alert text.
#[async_trait::async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver one batch: `header` followed by `blocks`, as a single message.
    async fn deliver(&self, header: &str, blocks: &[String]) -> Result<(), TransportError>;
}

/// Outcome of one [`Notifier::dispatch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub batches_sent: usize,
    pub blocks_sent: usize,
    pub blocks_dropped: usize,
    pub error: Option<String>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Splits alert blocks into fixed-size batches and hands them to a channel.
#[derive(Clone)]
pub struct Notifier {
    channel: Arc<dyn AlertChannel>,
    batch_size: usize,
    pause: Duration,
}

impl Notifier {
    pub fn new(channel: Arc<dyn AlertChannel>, batch_size: usize, pause: Duration) -> Self {
        Self {
            channel,
            batch_size: batch_size.max(1),
            pause,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Send `blocks` in order, `batch_size` at a time, pausing between calls.
    /// Stops at the first failed batch; the rest are dropped.
    pub async fn dispatch(&self, header: &str, blocks: &[String]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (idx, batch) in blocks.chunks(self.batch_size).enumerate() {
            if idx > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            match self.channel.deliver(header, batch).await {
                Ok(()) => {
                    report.batches_sent += 1;
                    report.blocks_sent += batch.len();
                    debug!(channel = self.channel.name(), batch = idx + 1, size = batch.len(), "Alert batch delivered");
                }
                Err(e) => {
                    report.blocks_dropped = blocks.len() - report.blocks_sent;
                    error!(
                        channel = self.channel.name(),
                        batch = idx + 1,
                        dropped = report.blocks_dropped,
                        "Alert delivery failed, dropping remaining alerts: {}",
                        e
                    );
                    report.error = Some(e.to_string());
                    return report;
                }
            }
        }

        if report.blocks_sent > 0 {
            info!(
                channel = self.channel.name(),
                alerts = report.blocks_sent,
                batches = report.batches_sent,
                "Alerts delivered"
            );
        }
        report
    }
}
