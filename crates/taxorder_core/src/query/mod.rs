//! Read-path ordering for term listings.
//!
//! # Responsibility
//! - Carry the join/order fragments exchanged with the host's term query.
//! - Decide, per queried taxonomy, whether listings sort by stored position.
//!
//! # Invariants
//! - When no queried taxonomy is position-enabled, fragments pass through
//!   unchanged.
//! - Every enabled taxonomy keeps its own position order; one taxonomy never
//!   overrides another's.

pub mod clauses;
pub mod rewriter;
