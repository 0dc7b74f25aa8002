//! Taxonomy term read model.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Stable term identifier, unique across all taxonomies in one store.
pub type TermId = i64;

/// Custom rank of a term inside its taxonomy. Lower sorts first.
pub type Position = i64;

/// One value inside a taxonomy, e.g. `Sports` in `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub term_id: TermId,
    /// Owning taxonomy name.
    pub taxonomy: String,
    /// User-facing label; drives the default alphabetical order.
    pub name: String,
    /// Parent term for hierarchical taxonomies. `None` means top level.
    pub parent_id: Option<TermId>,
    /// Number of content items attached to this term.
    pub item_count: u32,
    /// Stored custom position, if one has been assigned.
    pub position: Option<Position>,
}

impl Term {
    /// Returns whether no content items reference this term.
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

/// Compares two terms by the store's default order.
///
/// Case-insensitive name first, then term id. Mirrors the SQL default
/// `ORDER BY name COLLATE NOCASE, term_id` for ASCII names.
pub fn default_order(left: &Term, right: &Term) -> Ordering {
    left.name
        .to_ascii_lowercase()
        .cmp(&right.name.to_ascii_lowercase())
        .then(left.term_id.cmp(&right.term_id))
}

#[cfg(test)]
mod tests {
    use super::{default_order, Term};
    use std::cmp::Ordering;

    fn term(term_id: i64, name: &str) -> Term {
        Term {
            term_id,
            taxonomy: "category".to_string(),
            name: name.to_string(),
            parent_id: None,
            item_count: 0,
            position: None,
        }
    }

    #[test]
    fn default_order_ignores_ascii_case() {
        assert_eq!(default_order(&term(1, "beta"), &term(2, "Alpha")), Ordering::Greater);
    }

    #[test]
    fn default_order_breaks_name_ties_by_id() {
        assert_eq!(default_order(&term(7, "News"), &term(3, "news")), Ordering::Greater);
    }

    #[test]
    fn term_without_items_is_empty() {
        let mut value = term(1, "Sports");
        assert!(value.is_empty());
        value.item_count = 4;
        assert!(!value.is_empty());
    }
}
