use super::{AlertChannel, TransportError};

/// Writes alert batches to the tracing log. Used when no messaging channel
/// is configured; never fails.
#[derive(Debug, Default)]
pub struct LogChannel;

#[async_trait::async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, header: &str, blocks: &[String]) -> Result<(), TransportError> {
        tracing::warn!(alerts = blocks.len(), "{}{}", header.trim_end(), summary(blocks));
        Ok(())
    }
}

fn summary(blocks: &[String]) -> String {
    blocks
        .iter()
        .map(|b| format!("\n{}", b.trim_end()))
        .collect()
}
