//! Block-wall detection
//!
//! Decides whether a response is a bot wall (by status code or challenge
//! phrases) and keeps a bounded log of every such classification for
//! diagnostics.

mod detector;
mod events;

pub use detector::BlockDetector;
pub use events::{BlockEvent, BlockEventLog, BlockReason};
