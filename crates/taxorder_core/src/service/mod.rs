//! Ordering use-case services.
//!
//! # Responsibility
//! - Backfill and rewrite stored positions (`order_service`).
//! - Serve ordered term listings (`listing_service`).
//! - Validate reorder submissions (`reorder`).
//!
//! # Invariants
//! - Services receive `OrderingConfig` at construction and never look up
//!   taxonomy settings elsewhere.

pub mod listing_service;
pub mod order_service;
pub mod reorder;
