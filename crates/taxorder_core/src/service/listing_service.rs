//! Term listing use-case: fetch terms in persisted order.
//!
//! # Responsibility
//! - Serve term listings for admin and public contexts.
//! - Expose the fragment rewrite for hosts that run their own term query.
//!
//! # Invariants
//! - Listings with no position-enabled taxonomy run exactly one query with
//!   the store's default fragments, or the admin's explicit sort.
//! - Otherwise each taxonomy is fetched with its own sort and the results are
//!   merged client-side, grouped in query order.

use crate::config::OrderingConfig;
use crate::model::term::Term;
use crate::query::clauses::{QueryContext, TermClauses};
use crate::query::rewriter::QueryRewriter;
use crate::repo::term_repo::{RepoResult, TermQuery, TermRepository};
use log::debug;

/// Read-path facade over a term repository.
pub struct TermListingService<R: TermRepository> {
    repo: R,
    rewriter: QueryRewriter,
}

impl<R: TermRepository> TermListingService<R> {
    pub fn new(repo: R, config: OrderingConfig) -> Self {
        Self {
            repo,
            rewriter: QueryRewriter::new(config),
        }
    }

    /// Lists terms matching `query`, honoring custom positions.
    pub fn list_terms(&self, query: &TermQuery, context: &QueryContext) -> RepoResult<Vec<Term>> {
        let base = context.base_clauses();
        let plan = self.rewriter.plan(&query.taxonomies, context);
        if plan.is_noop() {
            return self.repo.query_terms(query, &base);
        }

        let mut merged = Vec::new();
        for entry in plan.entries() {
            let single = TermQuery {
                taxonomies: vec![entry.taxonomy.clone()],
                hide_empty: query.hide_empty,
            };
            let clauses = plan
                .restricted_to(&entry.taxonomy)
                .rewrite_clauses(&base);
            merged.extend(self.repo.query_terms(&single, &clauses)?);
        }
        plan.sort_terms(&mut merged);

        debug!(
            "event=terms_list module=service status=ok taxonomies={} terms={}",
            plan.entries().len(),
            merged.len()
        );
        Ok(merged)
    }

    /// Lists every term of one taxonomy, empty ones included.
    pub fn ordered_terms(&self, taxonomy: &str, context: &QueryContext) -> RepoResult<Vec<Term>> {
        self.list_terms(&TermQuery::new([taxonomy]), context)
    }

    /// Rewrites a host's own join/order fragments for `taxonomies`.
    pub fn rewrite_clauses<S: AsRef<str>>(
        &self,
        taxonomies: &[S],
        clauses: &TermClauses,
        context: &QueryContext,
    ) -> TermClauses {
        self.rewriter.rewrite(taxonomies, clauses, context)
    }
}
