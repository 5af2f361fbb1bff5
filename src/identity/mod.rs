//! Browser identity profiles and per-host sessions
//!
//! # Components
//!
//! - `archetype`: fixed catalogue of device/OS/browser combinations
//! - `IdentityGenerator`: seeded, rotating profile derivation
//! - `SessionStore`: one profile per host, kept for the session TTL

mod archetype;
mod generator;
mod session;

pub use archetype::{Archetype, BrowserFamily, DeviceClass, OsFamily, ARCHETYPES};
pub use generator::{derive_profile, IdentityGenerator, IdentityProfile, PlatformHints, Viewport};
pub use session::{request_headers, SessionSnapshot, SessionStore};
