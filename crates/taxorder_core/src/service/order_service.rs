//! Order maintainer: backfills and rewrites stored term positions.
//!
//! # Responsibility
//! - Give every term of a taxonomy a position on first admin access.
//! - Persist a submitted order as positions `1..=n`, or explicit
//!   `(term, position)` pairs as sent by the admin UI.
//!
//! # Invariants
//! - Backfill is idempotent and never moves a term that already has a
//!   position.
//! - Writes are not wrapped in a transaction: on failure the positions
//!   already written stay, and the error reports how many there were.
//! - Blank or unregistered taxonomies make backfill a silent no-op.

use crate::config::OrderingConfig;
use crate::model::term::{Position, TermId};
use crate::repo::position_repo::PositionStore;
use crate::repo::term_repo::{RepoError, TermRepository};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from order maintenance.
#[derive(Debug)]
pub enum OrderServiceError {
    /// A submitted term id does not exist (strict membership only).
    TermNotFound(TermId),
    /// A submitted term belongs to another taxonomy (strict membership only).
    TermNotInTaxonomy {
        term_id: TermId,
        expected: String,
        actual: String,
    },
    /// A term id appears twice in one submission (strict membership only).
    DuplicateTerm(TermId),
    /// Backfill would need a position past `Position::MAX`.
    PositionOverflow {
        taxonomy: String,
        highest: Position,
        missing: usize,
    },
    /// Some positions were written before the store failed.
    PartialWrite { written: usize, source: RepoError },
    /// Store failure before anything was written.
    Repo(RepoError),
}

impl Display for OrderServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TermNotFound(id) => write!(f, "term not found: {id}"),
            Self::TermNotInTaxonomy {
                term_id,
                expected,
                actual,
            } => write!(
                f,
                "term {term_id} belongs to taxonomy `{actual}`, not `{expected}`"
            ),
            Self::DuplicateTerm(id) => write!(f, "term {id} submitted more than once"),
            Self::PositionOverflow {
                taxonomy,
                highest,
                missing,
            } => write!(
                f,
                "cannot number {missing} terms of `{taxonomy}` after position {highest}"
            ),
            Self::PartialWrite { written, source } => write!(
                f,
                "position store failed after {written} positions were written: {source}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OrderServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PartialWrite { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for OrderServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of one maintenance call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderReport {
    /// Terms inspected or submitted.
    pub examined: usize,
    /// Positions written to the store.
    pub written: usize,
}

/// Keeps stored positions complete and applies submitted orders.
pub struct OrderMaintainer<T: TermRepository, P: PositionStore> {
    terms: T,
    positions: P,
    config: OrderingConfig,
}

impl<T: TermRepository, P: PositionStore> OrderMaintainer<T, P> {
    pub fn new(terms: T, positions: P, config: OrderingConfig) -> Self {
        Self {
            terms,
            positions,
            config,
        }
    }

    pub fn config(&self) -> &OrderingConfig {
        &self.config
    }

    /// Assigns a position to every term of `taxonomy` that lacks one.
    ///
    /// Terms are walked in the store's default order, empty terms included.
    /// New positions continue after the largest existing one, so a fresh
    /// taxonomy of `n` terms gets `1..=n` and later additions append.
    pub fn ensure_positions(&self, taxonomy: &str) -> Result<OrderReport, OrderServiceError> {
        let taxonomy = taxonomy.trim();
        if !self.config.is_registered(taxonomy) {
            debug!("event=positions_backfill module=service status=skipped reason=unregistered");
            return Ok(OrderReport::default());
        }

        let started_at = Instant::now();
        let terms = self.terms.list_terms(taxonomy).inspect_err(|err| {
            error!(
                "event=positions_backfill module=service status=error stage=list_terms error={err}"
            );
        })?;

        let missing: Vec<TermId> = terms
            .iter()
            .filter(|term| term.position.is_none())
            .map(|term| term.term_id)
            .collect();
        let highest = terms
            .iter()
            .filter_map(|term| term.position)
            .max()
            .unwrap_or(0);
        let fits = i64::try_from(missing.len())
            .ok()
            .and_then(|count| highest.checked_add(count))
            .is_some();
        if !fits {
            error!(
                "event=positions_backfill module=service status=error stage=numbering taxonomy={taxonomy} highest={highest} missing={}",
                missing.len()
            );
            return Err(OrderServiceError::PositionOverflow {
                taxonomy: taxonomy.to_string(),
                highest,
                missing: missing.len(),
            });
        }

        let mut written = 0;
        let mut position = highest;
        for term_id in &missing {
            // Bounded by `highest + missing.len()`, checked above.
            position += 1;
            self.write_position(*term_id, position, written, "positions_backfill")?;
            written += 1;
        }

        let report = OrderReport {
            examined: terms.len(),
            written,
        };
        info!(
            "event=positions_backfill module=service status=ok taxonomy={taxonomy} examined={} written={} duration_ms={}",
            report.examined,
            report.written,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Stores `ordered_term_ids[i]` at position `i + 1`.
    ///
    /// Term ids are trusted unless `strict_membership` is configured, in
    /// which case every id must exist in `taxonomy` exactly once before
    /// anything is written.
    pub fn apply_new_order(
        &self,
        taxonomy: &str,
        ordered_term_ids: &[TermId],
    ) -> Result<OrderReport, OrderServiceError> {
        let assignments: Vec<(TermId, Position)> =
            ordered_term_ids.iter().copied().zip(1..).collect();
        self.apply_positions(taxonomy, &assignments)
    }

    /// Stores each `(term_id, position)` pair as given, in slice order.
    ///
    /// Positions need not be contiguous; terms not named keep theirs.
    /// Membership checks follow [`Self::apply_new_order`].
    pub fn apply_positions(
        &self,
        taxonomy: &str,
        assignments: &[(TermId, Position)],
    ) -> Result<OrderReport, OrderServiceError> {
        let taxonomy = taxonomy.trim();
        let started_at = Instant::now();
        if self.config.strict_membership {
            self.validate_membership(taxonomy, assignments.iter().map(|pair| pair.0))?;
        }

        let mut written = 0;
        for &(term_id, position) in assignments {
            self.write_position(term_id, position, written, "positions_reorder")?;
            written += 1;
        }

        info!(
            "event=positions_reorder module=service status=ok taxonomy={taxonomy} written={written} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(OrderReport {
            examined: assignments.len(),
            written,
        })
    }

    fn validate_membership(
        &self,
        taxonomy: &str,
        term_ids: impl Iterator<Item = TermId>,
    ) -> Result<(), OrderServiceError> {
        let mut seen = HashSet::new();
        for term_id in term_ids {
            if !seen.insert(term_id) {
                return Err(OrderServiceError::DuplicateTerm(term_id));
            }
            let term = self
                .terms
                .get_term(term_id)?
                .ok_or(OrderServiceError::TermNotFound(term_id))?;
            if term.taxonomy != taxonomy {
                return Err(OrderServiceError::TermNotInTaxonomy {
                    term_id,
                    expected: taxonomy.to_string(),
                    actual: term.taxonomy,
                });
            }
        }
        Ok(())
    }

    fn write_position(
        &self,
        term_id: TermId,
        position: Position,
        written: usize,
        event: &'static str,
    ) -> Result<(), OrderServiceError> {
        self.positions
            .set_position(term_id, position)
            .map_err(|source| {
                if written == 0 {
                    error!(
                        "event={event} module=service status=error term_id={term_id} written=0 error={source}"
                    );
                    OrderServiceError::Repo(source)
                } else {
                    warn!(
                        "event={event} module=service status=partial term_id={term_id} written={written} error={source}"
                    );
                    OrderServiceError::PartialWrite { written, source }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderMaintainer, OrderServiceError};
    use crate::config::OrderingConfig;
    use crate::model::term::{Position, Term, TermId};
    use crate::query::clauses::TermClauses;
    use crate::repo::position_repo::PositionStore;
    use crate::repo::term_repo::{NewTerm, RepoError, RepoResult, TermQuery, TermRepository};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FixedTerms(Vec<Term>);

    impl TermRepository for FixedTerms {
        fn create_term(&self, _new_term: &NewTerm) -> RepoResult<Term> {
            Err(RepoError::InvalidInput("read-only fixture".to_string()))
        }

        fn get_term(&self, term_id: TermId) -> RepoResult<Option<Term>> {
            Ok(self.0.iter().find(|term| term.term_id == term_id).cloned())
        }

        fn delete_term(&self, term_id: TermId) -> RepoResult<()> {
            Err(RepoError::TermNotFound(term_id))
        }

        fn query_terms(&self, query: &TermQuery, _clauses: &TermClauses) -> RepoResult<Vec<Term>> {
            Ok(self
                .0
                .iter()
                .filter(|term| query.taxonomies.contains(&term.taxonomy))
                .cloned()
                .collect())
        }
    }

    /// Fails every write after `fail_after` successful ones.
    struct FlakyPositions {
        stored: RefCell<HashMap<TermId, Position>>,
        fail_after: usize,
    }

    impl PositionStore for FlakyPositions {
        fn get_position(&self, term_id: TermId) -> RepoResult<Option<Position>> {
            Ok(self.stored.borrow().get(&term_id).copied())
        }

        fn set_position(&self, term_id: TermId, position: Position) -> RepoResult<()> {
            let mut stored = self.stored.borrow_mut();
            if stored.len() >= self.fail_after {
                return Err(RepoError::InvalidData("store offline".to_string()));
            }
            stored.insert(term_id, position);
            Ok(())
        }
    }

    fn term(term_id: TermId, name: &str) -> Term {
        Term {
            term_id,
            taxonomy: "category".to_string(),
            name: name.to_string(),
            parent_id: None,
            item_count: 0,
            position: None,
        }
    }

    fn maintainer(fail_after: usize) -> OrderMaintainer<FixedTerms, FlakyPositions> {
        OrderMaintainer::new(
            FixedTerms(vec![term(1, "A"), term(2, "B"), term(3, "C")]),
            FlakyPositions {
                stored: RefCell::new(HashMap::new()),
                fail_after,
            },
            OrderingConfig::new().with_taxonomy("category", true),
        )
    }

    #[test]
    fn reorder_failure_keeps_written_positions() {
        let maintainer = maintainer(2);
        let err = maintainer
            .apply_new_order("category", &[3, 1, 2])
            .unwrap_err();

        assert!(matches!(err, OrderServiceError::PartialWrite { written: 2, .. }));
        let stored = maintainer.positions.stored.borrow();
        assert_eq!(stored.get(&3), Some(&1));
        assert_eq!(stored.get(&1), Some(&2));
        assert_eq!(stored.get(&2), None);
    }

    #[test]
    fn first_write_failure_is_plain_repo_error() {
        let maintainer = maintainer(0);
        let err = maintainer.ensure_positions("category").unwrap_err();
        assert!(matches!(err, OrderServiceError::Repo(_)));
    }

    #[test]
    fn backfill_past_max_position_fails_before_writing() {
        let mut full = term(1, "A");
        full.position = Some(Position::MAX);
        let maintainer = OrderMaintainer::new(
            FixedTerms(vec![full, term(2, "B")]),
            FlakyPositions {
                stored: RefCell::new(HashMap::new()),
                fail_after: 10,
            },
            OrderingConfig::new().with_taxonomy("category", true),
        );

        let err = maintainer.ensure_positions("category").unwrap_err();

        assert!(matches!(
            err,
            OrderServiceError::PositionOverflow {
                highest: Position::MAX,
                missing: 1,
                ..
            }
        ));
        assert!(maintainer.positions.stored.borrow().is_empty());
    }

    #[test]
    fn explicit_positions_are_written_as_given() {
        let maintainer = maintainer(10);
        let report = maintainer
            .apply_positions("category", &[(2, 4), (3, 5)])
            .unwrap();

        assert_eq!(report.written, 2);
        let stored = maintainer.positions.stored.borrow();
        assert_eq!(stored.get(&2), Some(&4));
        assert_eq!(stored.get(&3), Some(&5));
        assert_eq!(stored.get(&1), None);
    }

    #[test]
    fn unregistered_taxonomy_backfill_is_noop() {
        let maintainer = maintainer(10);
        let report = maintainer.ensure_positions("genre").unwrap();
        assert_eq!(report.written, 0);
        let report = maintainer.ensure_positions("").unwrap();
        assert_eq!(report.examined, 0);
        assert!(maintainer.positions.stored.borrow().is_empty());
    }
}
