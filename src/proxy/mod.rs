//! Egress proxy pool
//!
//! Tracks a set of proxies, rotates between them, bans the ones that keep
//! failing and brings them back after a successful health probe.

mod health;
mod pool;

pub use health::{HealthProbe, HttpProbe};
pub use pool::{Proxy, ProxyHealthReport, ProxyPool};
