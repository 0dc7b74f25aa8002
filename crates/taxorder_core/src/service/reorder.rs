//! Reorder submission endpoint.
//!
//! # Responsibility
//! - Parse and validate the `updated_array` payload sent by the admin UI.
//! - Hand the validated order to the order maintainer and report an explicit
//!   result.
//!
//! # Invariants
//! - A malformed or inconsistent payload fails before any position is
//!   written.
//! - The term submitted at index `i` is stored at position `i + 1`. Indices
//!   need not be contiguous, so a partial reorder leaves other terms alone.

use crate::model::term::{Position, TermId};
use crate::repo::position_repo::PositionStore;
use crate::repo::term_repo::TermRepository;
use crate::service::order_service::{OrderMaintainer, OrderServiceError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One `[term_id, new_index]` pair from the submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderEntry(pub TermId, pub i64);

/// Reorder submission payload.
///
/// ```json
/// { "taxonomy": "category", "updated_array": [[12, 0], [7, 1]] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderRequest {
    pub taxonomy: String,
    pub updated_array: Vec<ReorderEntry>,
}

/// Successful reorder acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReorderResponse {
    pub taxonomy: String,
    /// Positions written.
    pub updated: usize,
}

/// Errors returned by the reorder endpoint.
#[derive(Debug)]
pub enum ReorderError {
    /// Body is not valid JSON for [`ReorderRequest`].
    Malformed(serde_json::Error),
    BlankTaxonomy,
    NegativeIndex { term_id: TermId, index: i64 },
    DuplicateIndex(i64),
    DuplicateTerm(TermId),
    /// `index + 1` does not fit a stored position.
    IndexOutOfRange { term_id: TermId, index: i64 },
    /// Order maintenance failed; see the wrapped error for partial writes.
    Order(OrderServiceError),
}

impl ReorderError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_payload",
            Self::BlankTaxonomy => "blank_taxonomy",
            Self::NegativeIndex { .. } => "negative_index",
            Self::DuplicateIndex(_) => "duplicate_index",
            Self::DuplicateTerm(_) => "duplicate_term",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::Order(OrderServiceError::PartialWrite { .. }) => "partial_write",
            Self::Order(OrderServiceError::Repo(_)) => "store_failure",
            Self::Order(OrderServiceError::PositionOverflow { .. }) => "position_overflow",
            Self::Order(_) => "invalid_membership",
        }
    }

    /// Returns whether the payload was rejected before any write.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::Order(OrderServiceError::PartialWrite { .. })
                | Self::Order(OrderServiceError::Repo(_))
        )
    }

    /// Error body for the submitting client.
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let Self::Order(OrderServiceError::PartialWrite { written, .. }) = self {
            body["written"] = serde_json::json!(written);
        }
        body
    }
}

impl Display for ReorderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed reorder payload: {err}"),
            Self::BlankTaxonomy => write!(f, "taxonomy must not be blank"),
            Self::NegativeIndex { term_id, index } => {
                write!(f, "negative index {index} for term {term_id}")
            }
            Self::DuplicateIndex(index) => write!(f, "index {index} submitted more than once"),
            Self::DuplicateTerm(id) => write!(f, "term {id} submitted more than once"),
            Self::IndexOutOfRange { term_id, index } => {
                write!(f, "index {index} for term {term_id} is out of range")
            }
            Self::Order(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReorderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Order(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OrderServiceError> for ReorderError {
    fn from(value: OrderServiceError) -> Self {
        Self::Order(value)
    }
}

impl ReorderRequest {
    /// Parses a JSON request body.
    pub fn from_json(raw: &str) -> Result<Self, ReorderError> {
        serde_json::from_str(raw).map_err(ReorderError::Malformed)
    }

    /// Validates the payload and returns `(term_id, position)` pairs
    /// ordered by index, each at `index + 1`.
    pub fn assignments(&self) -> Result<Vec<(TermId, Position)>, ReorderError> {
        if self.taxonomy.trim().is_empty() {
            return Err(ReorderError::BlankTaxonomy);
        }

        let mut seen_terms = HashSet::with_capacity(self.updated_array.len());
        let mut seen_indices = HashSet::with_capacity(self.updated_array.len());
        let mut assignments = Vec::with_capacity(self.updated_array.len());
        for &ReorderEntry(term_id, index) in &self.updated_array {
            if index < 0 {
                return Err(ReorderError::NegativeIndex { term_id, index });
            }
            if !seen_terms.insert(term_id) {
                return Err(ReorderError::DuplicateTerm(term_id));
            }
            if !seen_indices.insert(index) {
                return Err(ReorderError::DuplicateIndex(index));
            }
            let position = index
                .checked_add(1)
                .ok_or(ReorderError::IndexOutOfRange { term_id, index })?;
            assignments.push((term_id, position));
        }

        assignments.sort_by_key(|pair| pair.1);
        Ok(assignments)
    }
}

/// Handles one reorder submission body end to end.
pub fn handle_reorder<T, P>(
    maintainer: &OrderMaintainer<T, P>,
    body: &str,
) -> Result<ReorderResponse, ReorderError>
where
    T: TermRepository,
    P: PositionStore,
{
    let request = ReorderRequest::from_json(body).and_then(|request| {
        let assignments = request.assignments()?;
        Ok((request, assignments))
    });
    let (request, assignments) = match request {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(
                "event=reorder_request module=service status=rejected error_code={}",
                err.code()
            );
            return Err(err);
        }
    };

    let taxonomy = request.taxonomy.trim().to_string();
    let report = maintainer.apply_positions(&taxonomy, &assignments)?;
    info!(
        "event=reorder_request module=service status=ok taxonomy={taxonomy} updated={}",
        report.written
    );
    Ok(ReorderResponse {
        taxonomy,
        updated: report.written,
    })
}
