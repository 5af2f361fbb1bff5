//! Bounded log of recent block classifications

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Why a response was classified as a block wall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// The status code is in the configured block set
    HttpStatus(u16),
    /// The body carries a challenge phrase
    CaptchaContent,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(code) => write!(f, "http_status_{}", code),
            Self::CaptchaContent => write!(f, "captcha_content"),
        }
    }
}

/// One recorded block classification
#[derive(Debug, Clone)]
pub struct BlockEvent {
    pub url: String,
    pub reason: BlockReason,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}

/// Ring buffer of the most recent block events
///
/// Recording never blocks crawl progress: the lock is held only for a push.
#[derive(Debug)]
pub struct BlockEventLog {
    capacity: usize,
    events: Mutex<VecDeque<BlockEvent>>,
    total: AtomicU64,
}

impl BlockEventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            total: AtomicU64::new(0),
        }
    }

    /// Appends an event, evicting the oldest one when full
    pub fn record(&self, event: BlockEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the retained events, oldest first
    pub fn recent(&self) -> Vec<BlockEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of events currently retained
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events ever recorded, including evicted ones
    pub fn total_recorded(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: u16) -> BlockEvent {
        BlockEvent {
            url: format!("https://example.com/{}", n),
            reason: BlockReason::HttpStatus(403),
            status_code: 403,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(BlockReason::HttpStatus(429).to_string(), "http_status_429");
        assert_eq!(BlockReason::CaptchaContent.to_string(), "captcha_content");
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let log = BlockEventLog::new(3);
        for n in 0..5 {
            log.record(event(n));
        }

        let recent = log.recent();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].url, "https://example.com/2");
        assert_eq!(recent[2].url, "https://example.com/4");
        assert_eq!(log.total_recorded(), 5);
    }

    #[test]
    fn test_empty_log() {
        let log = BlockEventLog::new(10);
        assert!(log.is_empty());
        assert!(log.recent().is_empty());
    }
}
