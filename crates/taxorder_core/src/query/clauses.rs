//! Query fragments and request context for term listings.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Default ordering used by the term store.
pub const DEFAULT_TERM_ORDER_BY: &str = "ORDER BY t.name COLLATE NOCASE ASC, t.term_id ASC";

/// Join and order fragments of one term-listing query.
///
/// Fragments reference the `terms` table through
/// [`TERM_TABLE_ALIAS`](crate::repo::term_repo::TERM_TABLE_ALIAS).
/// `join` is appended verbatim after the `FROM` clause, so a non-empty value
/// starts with whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermClauses {
    pub join: String,
    pub orderby: String,
}

impl TermClauses {
    pub fn new(join: impl Into<String>, orderby: impl Into<String>) -> Self {
        Self {
            join: join.into(),
            orderby: orderby.into(),
        }
    }
}

impl Default for TermClauses {
    fn default() -> Self {
        Self::new("", DEFAULT_TERM_ORDER_BY)
    }
}

/// Column an administrator can sort a term listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Count,
    Id,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Explicit sort requested from the admin screen, e.g. a clicked column
/// header.
///
/// Parsed from `<field> [asc|desc]`, where field is `name`, `count` or `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl TermSort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Default-join fragments that apply this sort.
    ///
    /// Ties fall back to name, then id, so the order stays deterministic.
    pub fn clauses(&self) -> TermClauses {
        let dir = self.direction.sql();
        let orderby = match self.field {
            SortField::Name => format!("ORDER BY t.name COLLATE NOCASE {dir}, t.term_id {dir}"),
            SortField::Count => format!(
                "ORDER BY t.item_count {dir}, t.name COLLATE NOCASE ASC, t.term_id ASC"
            ),
            SortField::Id => format!("ORDER BY t.term_id {dir}"),
        };
        TermClauses::new("", orderby)
    }
}

/// Rejected admin sort expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedSort(pub String);

impl Display for UnsupportedSort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported sort `{}`; expected name|count|id optionally followed by asc|desc",
            self.0
        )
    }
}

impl Error for UnsupportedSort {}

impl FromStr for TermSort {
    type Err = UnsupportedSort;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unsupported = || UnsupportedSort(raw.trim().to_string());
        let mut parts = raw.split_whitespace();
        let field = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("name") => SortField::Name,
            Some("count") => SortField::Count,
            Some("id") => SortField::Id,
            _ => return Err(unsupported()),
        };
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(_) => return Err(unsupported()),
        };
        if parts.next().is_some() {
            return Err(unsupported());
        }
        Ok(Self { field, direction })
    }
}

/// Where a term listing request originates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QueryContext {
    /// Public-facing page render.
    #[default]
    Public,
    /// Administrative screen, optionally with an explicit column sort.
    Admin { explicit_sort: Option<TermSort> },
}

impl QueryContext {
    /// Admin request without an explicit sort.
    pub fn admin() -> Self {
        Self::Admin {
            explicit_sort: None,
        }
    }

    /// Admin request that asked for a specific sort.
    pub fn admin_sorted_by(sort: TermSort) -> Self {
        Self::Admin {
            explicit_sort: Some(sort),
        }
    }

    pub fn explicit_sort(&self) -> Option<TermSort> {
        match self {
            Self::Public => None,
            Self::Admin { explicit_sort } => *explicit_sort,
        }
    }

    /// An explicit admin sort takes precedence over custom positions.
    pub fn suppresses_positions(&self) -> bool {
        self.explicit_sort().is_some()
    }

    /// Fragments a listing starts from before any position rewrite.
    pub fn base_clauses(&self) -> TermClauses {
        self.explicit_sort()
            .map_or_else(TermClauses::default, |sort| sort.clauses())
    }
}
