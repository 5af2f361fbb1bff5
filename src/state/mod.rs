//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageResult` / `FailureReason`: the per-URL outcome of a fetch
//! - `HostSession`: per-host visitor session (identity, referrer, request count)

mod host_session;
mod outcome;

pub use host_session::HostSession;
pub use outcome::{FailureReason, FetchOutcome, PageResult, UrlOutcome};
