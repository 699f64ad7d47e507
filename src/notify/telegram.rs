use super::{AlertChannel, TransportError};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Telegram Bot API channel sending MarkdownV2 messages to one chat.
pub struct TelegramChannel {
    client: Client,
    endpoint: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

impl TelegramChannel {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Telegram client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl AlertChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, header: &str, blocks: &[String]) -> Result<(), TransportError> {
        for text in compose(header, blocks, MAX_MESSAGE_LEN) {
            self.send(&text).await?;
        }
        Ok(())
    }
}

impl TelegramChannel {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "MarkdownV2",
        };

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(len = message_len(text), "Telegram message accepted");
        Ok(())
    }
}

/// Telegram rejects messages longer than this many UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Header followed by the blocks in order, split into as few messages as
/// fit under `limit`. Every message repeats the header; a block is never
/// split across messages.
pub fn compose(header: &str, blocks: &[String], limit: usize) -> Vec<String> {
    let header_len = message_len(header);
    let mut messages = Vec::new();
    let mut text = header.to_string();
    let mut len = header_len;
    let mut has_blocks = false;

    for block in blocks {
        let block_len = message_len(block);
        if has_blocks && len + block_len > limit {
            messages.push(std::mem::replace(&mut text, header.to_string()));
            len = header_len;
        }
        text.push_str(block);
        len += block_len;
        has_blocks = true;
    }
    messages.push(text);
    messages
}
