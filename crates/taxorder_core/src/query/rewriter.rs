//! Query rewriter: per-taxonomy sort plans for term listings.
//!
//! # Responsibility
//! - Build an explicit sort plan for the taxonomies of one listing request.
//! - Render the plan into SQL join/order fragments for hosts that build
//!   their own term query.
//! - Apply the same plan client-side to already-fetched terms.
//!
//! # Invariants
//! - A plan with no position-enabled taxonomy leaves fragments and term
//!   order untouched.
//! - Results group by taxonomy in query order; inside an enabled taxonomy
//!   positioned terms come first, ascending, and unpositioned terms follow.
//! - Ties fall back to the default term order.

use crate::config::OrderingConfig;
use crate::model::term::{default_order, Term};
use crate::query::clauses::{QueryContext, TermClauses};
use crate::repo::term_repo::TERM_TABLE_ALIAS;
use log::debug;
use std::cmp::Ordering;

/// Alias under which the rewritten join exposes `term_positions`.
pub const POSITION_JOIN_ALIAS: &str = "term_position";

/// How one taxonomy's terms are ordered inside a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomySort {
    /// Ascending by stored position.
    Position,
    /// The store's default order.
    Default,
}

/// Sort decision for one queried taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyOrder {
    pub taxonomy: String,
    pub sort: TaxonomySort,
}

/// Explicit sort specification for one listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermOrderPlan {
    entries: Vec<TaxonomyOrder>,
}

impl TermOrderPlan {
    /// Per-taxonomy decisions in query order.
    pub fn entries(&self) -> &[TaxonomyOrder] {
        &self.entries
    }

    /// Returns whether the plan leaves listings in default order.
    pub fn is_noop(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|entry| entry.sort == TaxonomySort::Position)
    }

    /// Sort decision for `taxonomy`; taxonomies outside the plan use the
    /// default order.
    pub fn sort_for(&self, taxonomy: &str) -> TaxonomySort {
        self.entries
            .iter()
            .find(|entry| entry.taxonomy == taxonomy)
            .map_or(TaxonomySort::Default, |entry| entry.sort)
    }

    /// Sub-plan covering only `taxonomy`, used for per-taxonomy fetches.
    pub fn restricted_to(&self, taxonomy: &str) -> TermOrderPlan {
        TermOrderPlan {
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.taxonomy == taxonomy)
                .cloned()
                .collect(),
        }
    }

    /// Renders the plan over the host's default fragments.
    ///
    /// The original order expression is kept as the final tie-breaker.
    pub fn rewrite_clauses(&self, clauses: &TermClauses) -> TermClauses {
        if self.is_noop() {
            return clauses.clone();
        }

        let alias = TERM_TABLE_ALIAS;
        let join = format!(
            "{} LEFT JOIN term_positions AS {POSITION_JOIN_ALIAS} ON {POSITION_JOIN_ALIAS}.term_id = {alias}.term_id",
            clauses.join
        );

        let mut keys = Vec::new();
        if self.entries.len() > 1 {
            let arms = self
                .entries
                .iter()
                .enumerate()
                .map(|(index, entry)| format!("WHEN {} THEN {index}", sql_literal(&entry.taxonomy)))
                .collect::<Vec<_>>()
                .join(" ");
            keys.push(format!(
                "CASE {alias}.taxonomy {arms} ELSE {} END ASC",
                self.entries.len()
            ));
        }

        let all_enabled = self
            .entries
            .iter()
            .all(|entry| entry.sort == TaxonomySort::Position);
        let rank = if all_enabled {
            format!("{POSITION_JOIN_ALIAS}.position")
        } else {
            let enabled = self
                .entries
                .iter()
                .filter(|entry| entry.sort == TaxonomySort::Position)
                .map(|entry| sql_literal(&entry.taxonomy))
                .collect::<Vec<_>>()
                .join(", ");
            format!("CASE WHEN {alias}.taxonomy IN ({enabled}) THEN {POSITION_JOIN_ALIAS}.position END")
        };
        keys.push(format!("{rank} IS NULL ASC"));
        keys.push(format!("{rank} ASC"));

        let fallback = strip_order_by(&clauses.orderby);
        if !fallback.is_empty() {
            keys.push(fallback.to_string());
        }

        TermClauses {
            join,
            orderby: format!("ORDER BY {}", keys.join(", ")),
        }
    }

    /// Merge-sorts fetched terms by taxonomy, then by position.
    ///
    /// Stable; a no-op plan keeps the input order exactly.
    pub fn sort_terms(&self, terms: &mut [Term]) {
        if self.is_noop() {
            return;
        }
        terms.sort_by(|left, right| self.compare(left, right));
    }

    fn compare(&self, left: &Term, right: &Term) -> Ordering {
        self.taxonomy_rank(&left.taxonomy)
            .cmp(&self.taxonomy_rank(&right.taxonomy))
            .then_with(|| match self.sort_for(&left.taxonomy) {
                TaxonomySort::Position => position_rank(left).cmp(&position_rank(right)),
                TaxonomySort::Default => Ordering::Equal,
            })
            .then_with(|| default_order(left, right))
    }

    fn taxonomy_rank(&self, taxonomy: &str) -> usize {
        self.entries
            .iter()
            .position(|entry| entry.taxonomy == taxonomy)
            .unwrap_or(self.entries.len())
    }
}

/// Builds sort plans from the ordering configuration.
#[derive(Debug, Clone)]
pub struct QueryRewriter {
    config: OrderingConfig,
}

impl QueryRewriter {
    pub fn new(config: OrderingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrderingConfig {
        &self.config
    }

    /// Decides the sort of every queried taxonomy.
    ///
    /// Blank and repeated names are dropped. An admin request with an
    /// explicit sort gets an all-default plan.
    pub fn plan<S: AsRef<str>>(&self, taxonomies: &[S], context: &QueryContext) -> TermOrderPlan {
        let suppressed = context.suppresses_positions();
        let mut entries: Vec<TaxonomyOrder> = Vec::with_capacity(taxonomies.len());
        for name in taxonomies {
            let taxonomy = name.as_ref().trim();
            if taxonomy.is_empty() || entries.iter().any(|entry| entry.taxonomy == taxonomy) {
                continue;
            }
            let sort = if !suppressed && self.config.is_position_enabled(taxonomy) {
                TaxonomySort::Position
            } else {
                TaxonomySort::Default
            };
            entries.push(TaxonomyOrder {
                taxonomy: taxonomy.to_string(),
                sort,
            });
        }

        let plan = TermOrderPlan { entries };
        debug!(
            "event=term_order_plan module=query status=ok taxonomies={} positioned={} suppressed={}",
            plan.entries.len(),
            plan.entries
                .iter()
                .filter(|entry| entry.sort == TaxonomySort::Position)
                .count(),
            suppressed
        );
        plan
    }

    /// Rewrites host fragments for a listing of `taxonomies`.
    pub fn rewrite<S: AsRef<str>>(
        &self,
        taxonomies: &[S],
        clauses: &TermClauses,
        context: &QueryContext,
    ) -> TermClauses {
        self.plan(taxonomies, context).rewrite_clauses(clauses)
    }
}

fn position_rank(term: &Term) -> (bool, i64) {
    (term.position.is_none(), term.position.unwrap_or_default())
}

fn strip_order_by(orderby: &str) -> &str {
    let trimmed = orderby.trim();
    match trimmed.get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case("order by") => trimmed[8..].trim(),
        _ => trimmed,
    }
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
