use crate::block::events::{BlockEvent, BlockEventLog, BlockReason};
use crate::config::BlockConfig;
use chrono::Utc;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use std::collections::HashSet;
use std::sync::Arc;

/// Classifies responses as blocked or challenged
///
/// Status codes are checked first; only when the status is not itself a block
/// is a bounded, lowercased prefix of the body scanned for challenge phrases.
/// Bodies are scanned when the Content-Type is textual or the sample itself
/// sniffs as text, so mislabelled challenge pages are still caught.
#[derive(Debug)]
pub struct BlockDetector {
    statuses: HashSet<u16>,
    phrases: Vec<String>,
    sample_bytes: usize,
    log: Arc<BlockEventLog>,
}

impl BlockDetector {
    pub fn new(config: &BlockConfig) -> Self {
        Self {
            statuses: config.statuses.iter().copied().collect(),
            phrases: config
                .phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .collect(),
            sample_bytes: config.sample_bytes,
            log: Arc::new(BlockEventLog::new(config.event_capacity)),
        }
    }

    /// Classifies a response and records a block event when it is blocked
    ///
    /// # Returns
    ///
    /// * `Some(BlockReason)` - The response is a block wall
    /// * `None` - Not blocked
    pub fn classify(
        &self,
        url: &str,
        status: u16,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Option<BlockReason> {
        self.inspect(url, status, headers, body).map(|event| event.reason)
    }

    /// Like [`classify`](Self::classify), but hands back the recorded event
    pub fn inspect(
        &self,
        url: &str,
        status: u16,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Option<BlockEvent> {
        let reason = self.reason_for(status, headers, body)?;

        tracing::warn!("Block detected at {}: {} (status {})", url, reason, status);
        let event = BlockEvent {
            url: url.to_string(),
            reason,
            status_code: status,
            timestamp: Utc::now(),
        };
        self.log.record(event.clone());

        Some(event)
    }

    fn reason_for(&self, status: u16, headers: &HeaderMap, body: &[u8]) -> Option<BlockReason> {
        if self.statuses.contains(&status) {
            return Some(BlockReason::HttpStatus(status));
        }

        if self.phrases.is_empty() {
            return None;
        }

        let sample = &body[..body.len().min(self.sample_bytes)];
        if !is_textual(headers) && !looks_like_text(sample) {
            return None;
        }
        let lowered = String::from_utf8_lossy(sample).to_lowercase();

        self.phrases
            .iter()
            .any(|phrase| lowered.contains(phrase.as_str()))
            .then_some(BlockReason::CaptchaContent)
    }

    /// The shared event log this detector writes to
    pub fn events(&self) -> Arc<BlockEventLog> {
        Arc::clone(&self.log)
    }

    /// Whether a status code is in the configured block set
    pub fn is_block_status(&self, status: u16) -> bool {
        self.statuses.contains(&status)
    }
}

/// Bodies without a Content-Type are assumed textual
fn is_textual(headers: &HeaderMap) -> bool {
    match headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ["text", "html", "json", "xml", "javascript"]
                .iter()
                .any(|kind| ct.contains(kind))
        }
        None => true,
    }
}

/// Valid UTF-8 with no control bytes other than whitespace
fn looks_like_text(sample: &[u8]) -> bool {
    let utf8 = match std::str::from_utf8(sample) {
        Ok(_) => true,
        // A multi-byte character cut off at the sample bound
        Err(e) => e.error_len().is_none(),
    };
    utf8 && !sample
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c))
}
