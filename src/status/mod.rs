//! Connector status polling -- the source trait, its HTTP implementation,
//! and the raw-to-canonical status mapper.

pub mod api;
pub mod mapper;

use std::collections::BTreeMap;

use thiserror::Error;

pub use self::api::HttpStatusSource;
pub use self::mapper::map_status;

/// One poll result: connector id -> raw upstream status label.
///
/// Ordered by id so that transitions (and therefore alerts) come out in a
/// stable order from tick to tick.
pub type RawStatuses = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("status request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("status API returned HTTP {status}")]
    Status { status: u16 },

    #[error("failed to decode status payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("status source unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can report the current raw status of every connector.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self) -> Result<RawStatuses, SourceError>;
}
