//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (after static lookup missed)
//!     → router.rs (ordered prefix scan)
//!     → matcher.rs (segment-boundary prefix match, strip)
//!     → Matched handler-set, or Unmatched → 404
//!
//! Registry construction (at startup):
//!     catalog.rs (resource list, mount order)
//!     → RegistryBuilder (duplicate detection)
//!     → Freeze as immutable RouterRegistry
//! ```
//!
//! # Design Decisions
//! - Registry built at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same handler-set
//! - First match wins (registration order)

pub mod catalog;
pub mod echo;
pub mod matcher;
pub mod router;

pub use matcher::PathPrefixMatcher;
pub use router::{Registration, RegistryBuilder, RegistryError, Resolution, RouterRegistry};
