use super::{RawStatuses, SourceError, StatusSource};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Polls the charge-point backend's connector listing over HTTP.
pub struct HttpStatusSource {
    client: Client,
    url: String,
    bearer_token: String,
}

impl HttpStatusSource {
    pub fn new(url: &str, bearer_token: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build status API client")?;

        Ok(Self {
            client,
            url: url.to_string(),
            bearer_token: bearer_token.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self) -> Result<RawStatuses, SourceError> {
        let resp = self
            .client
            .get(&self.url)
            .bearer_auth(&self.bearer_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        let statuses = parse_payload(&body)?;
        debug!(connectors = statuses.len(), "Status poll decoded");
        Ok(statuses)
    }
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    data: Option<Vec<ChargePoint>>,
}

#[derive(Debug, Deserialize)]
struct ChargePoint {
    #[serde(default)]
    connectors: Option<Vec<ConnectorEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectorEntry {
    #[serde(default)]
    device_id: Option<Value>,
    #[serde(default)]
    detailed_status: Option<String>,
}

/// Decode `{ data: [ { connectors: [ { deviceId, detailedStatus } ] } ] }`.
///
/// Connectors without a usable `deviceId` or `detailedStatus` are skipped.
/// A repeated `deviceId` keeps the last occurrence.
pub fn parse_payload(body: &[u8]) -> Result<RawStatuses, SourceError> {
    let payload: StatusPayload = serde_json::from_slice(body)?;

    let mut statuses = RawStatuses::new();
    for charge_point in payload.data.unwrap_or_default() {
        for connector in charge_point.connectors.unwrap_or_default() {
            let id = match connector.device_id.as_ref().and_then(device_id_string) {
                Some(id) => id,
                None => {
                    warn!(raw = ?connector.device_id, "Skipping connector without deviceId");
                    continue;
                }
            };
            match connector.detailed_status {
                Some(status) if !status.is_empty() => {
                    statuses.insert(id, status);
                }
                _ => warn!(connector = %id, "Skipping connector without detailedStatus"),
            }
        }
    }
    Ok(statuses)
}

fn device_id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
