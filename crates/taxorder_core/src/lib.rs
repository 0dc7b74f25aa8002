//! Custom display order for taxonomy terms.
//!
//! Terms get a persisted integer position per taxonomy. Positions are
//! backfilled lazily, rewritten wholesale when an administrator submits a new
//! order, and applied to every term listing of a position-enabled taxonomy.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{ConfigError, OrderingConfig, TaxonomySettings};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::term::{Position, Term, TermId};
pub use query::clauses::{
    QueryContext, SortDirection, SortField, TermClauses, TermSort, UnsupportedSort,
    DEFAULT_TERM_ORDER_BY,
};
pub use query::rewriter::{QueryRewriter, TaxonomyOrder, TaxonomySort, TermOrderPlan};
pub use repo::position_repo::{PositionStore, SqlitePositionStore};
pub use repo::term_repo::{
    NewTerm, RepoError, RepoResult, SqliteTermRepository, TermQuery, TermRepository,
};
pub use service::listing_service::TermListingService;
pub use service::order_service::{OrderMaintainer, OrderReport, OrderServiceError};
pub use service::reorder::{
    handle_reorder, ReorderEntry, ReorderError, ReorderRequest, ReorderResponse,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
