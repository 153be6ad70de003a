//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (hardening + CORS headers, preflight answer)
//!     → rate_limit.rs (per-client quota under the API scope)
//!     → limits.rs (body size ceiling)
//!     → Pass to ingestion
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod headers;
pub mod limits;
pub mod rate_limit;
