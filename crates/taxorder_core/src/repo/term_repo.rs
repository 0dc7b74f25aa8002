//! Term repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist taxonomy terms and enumerate them in the store's default order.
//! - Execute term listings with caller-supplied join/order fragments.
//!
//! # Invariants
//! - Default order is `name COLLATE NOCASE ASC, term_id ASC`.
//! - Listings include empty terms unless the query asks to hide them.
//! - Stored positions are read alongside terms but never written here.

use crate::db::DbError;
use crate::model::term::{Term, TermId};
use crate::query::clauses::TermClauses;
use crate::repo::ensure_tables_ready;
use crate::repo::position_repo::position_from_value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Alias of the `terms` table used by every listing query.
pub const TERM_TABLE_ALIAS: &str = "t";

const TERM_COLUMNS_SQL: &str = "SELECT
    t.term_id AS term_id,
    t.taxonomy AS taxonomy,
    t.name AS name,
    t.parent_id AS parent_id,
    t.item_count AS item_count,
    (SELECT p.position FROM term_positions p WHERE p.term_id = t.term_id) AS position
FROM terms t";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by term and position persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target term does not exist.
    TermNotFound(TermId),
    /// Write input violates a term invariant.
    InvalidInput(String),
    /// Persisted data cannot be converted into the read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::TermNotFound(id) => write!(f, "term not found: {id}"),
            Self::InvalidInput(message) => write!(f, "invalid term input: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted term data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "term repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "term repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Write model for creating one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTerm {
    pub taxonomy: String,
    pub name: String,
    pub parent_id: Option<TermId>,
    pub item_count: u32,
}

impl NewTerm {
    /// Creates a top-level term with no attached items.
    pub fn new(taxonomy: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            name: name.into(),
            parent_id: None,
            item_count: 0,
        }
    }

    pub fn with_parent(mut self, parent_id: TermId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_item_count(mut self, item_count: u32) -> Self {
        self.item_count = item_count;
        self
    }
}

/// Filter options for term listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermQuery {
    /// Taxonomies to list. An empty set yields an empty listing.
    pub taxonomies: Vec<String>,
    /// Skip terms with no attached content items.
    pub hide_empty: bool,
}

impl TermQuery {
    /// Lists every term of the given taxonomies, empty ones included.
    pub fn new<I, S>(taxonomies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taxonomies: taxonomies.into_iter().map(Into::into).collect(),
            hide_empty: false,
        }
    }

    pub fn hide_empty(mut self, hide_empty: bool) -> Self {
        self.hide_empty = hide_empty;
        self
    }
}

/// Repository interface for term persistence.
pub trait TermRepository {
    /// Creates one term and returns its read model.
    fn create_term(&self, new_term: &NewTerm) -> RepoResult<Term>;
    /// Loads one term by id.
    fn get_term(&self, term_id: TermId) -> RepoResult<Option<Term>>;
    /// Deletes one term. Its stored position is left behind.
    fn delete_term(&self, term_id: TermId) -> RepoResult<()>;
    /// Lists terms matching `query`, shaped by `clauses`.
    fn query_terms(&self, query: &TermQuery, clauses: &TermClauses) -> RepoResult<Vec<Term>>;

    /// Lists every term of one taxonomy in the store's default order.
    fn list_terms(&self, taxonomy: &str) -> RepoResult<Vec<Term>> {
        self.query_terms(&TermQuery::new([taxonomy]), &TermClauses::default())
    }
}

/// SQLite-backed term repository.
pub struct SqliteTermRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTermRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables_ready(conn, &["terms", "term_positions"])?;
        Ok(Self { conn })
    }
}

impl TermRepository for SqliteTermRepository<'_> {
    fn create_term(&self, new_term: &NewTerm) -> RepoResult<Term> {
        let taxonomy = new_term.taxonomy.trim();
        let name = new_term.name.trim();
        if taxonomy.is_empty() {
            return Err(RepoError::InvalidInput(
                "taxonomy must not be blank".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(RepoError::InvalidInput("name must not be blank".to_string()));
        }

        if let Some(parent_id) = new_term.parent_id {
            let parent = self
                .get_term(parent_id)?
                .ok_or(RepoError::TermNotFound(parent_id))?;
            if parent.taxonomy != taxonomy {
                return Err(RepoError::InvalidInput(format!(
                    "parent {parent_id} belongs to taxonomy `{}`",
                    parent.taxonomy
                )));
            }
        }

        self.conn.execute(
            "INSERT INTO terms (taxonomy, name, parent_id, item_count)
             VALUES (?1, ?2, ?3, ?4);",
            params![taxonomy, name, new_term.parent_id, new_term.item_count],
        )?;
        let term_id = self.conn.last_insert_rowid();
        self.get_term(term_id)?
            .ok_or(RepoError::TermNotFound(term_id))
    }

    fn get_term(&self, term_id: TermId) -> RepoResult<Option<Term>> {
        let sql = format!("{TERM_COLUMNS_SQL} WHERE t.term_id = ?1;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([term_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_term_row(row)?)),
            None => Ok(None),
        }
    }

    fn delete_term(&self, term_id: TermId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM terms WHERE term_id = ?1;", [term_id])?;
        if changed == 0 {
            return Err(RepoError::TermNotFound(term_id));
        }
        Ok(())
    }

    fn query_terms(&self, query: &TermQuery, clauses: &TermClauses) -> RepoResult<Vec<Term>> {
        let taxonomies: Vec<&str> = query
            .taxonomies
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        if taxonomies.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=taxonomies.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let empty_filter = if query.hide_empty {
            " AND t.item_count > 0"
        } else {
            ""
        };
        let sql = format!(
            "{TERM_COLUMNS_SQL}{join} WHERE t.taxonomy IN ({placeholders}){empty_filter} {orderby};",
            join = clauses.join,
            orderby = clauses.orderby,
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(taxonomies.iter()))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_term_row(row)?);
        }
        Ok(items)
    }
}

fn parse_term_row(row: &Row<'_>) -> RepoResult<Term> {
    let term_id: TermId = row.get("term_id")?;
    let item_count_raw: i64 = row.get("item_count")?;
    let item_count = u32::try_from(item_count_raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid item_count `{item_count_raw}` for term {term_id}"
        ))
    })?;

    Ok(Term {
        term_id,
        taxonomy: row.get("taxonomy")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
        item_count,
        position: position_from_value(term_id, row.get("position")?)?,
    })
}
