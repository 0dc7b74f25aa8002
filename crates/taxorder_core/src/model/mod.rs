//! Domain model for taxonomy terms and their custom positions.
//!
//! # Invariants
//! - A term belongs to exactly one taxonomy for its whole lifetime.
//! - `position` is absent until backfilled or reordered.

pub mod term;
