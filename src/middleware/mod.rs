//! Request middleware applied by the router.
//!
//! - `trusted_host`: `Host` header allow-list, applied to every route
//! - `rate_limit`: per-IP `tower_governor` budget, applied to `/api/ingest`

pub mod rate_limit;
pub mod trusted_host;

pub use rate_limit::{limit_per_minute, ClientIpExtractor};
pub use trusted_host::{trusted_host, AllowedHosts};
