use rusqlite::Connection;
use taxorder_core::db::open_db_in_memory;
use taxorder_core::{
    NewTerm, OrderMaintainer, OrderServiceError, OrderingConfig, PositionStore, RepoError,
    SqlitePositionStore, SqliteTermRepository, TermId, TermRepository,
};

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn config() -> OrderingConfig {
    OrderingConfig::new()
        .with_taxonomy("category", true)
        .with_taxonomy("post_tag", false)
}

fn maintainer(
    conn: &Connection,
    config: OrderingConfig,
) -> OrderMaintainer<SqliteTermRepository<'_>, SqlitePositionStore<'_>> {
    OrderMaintainer::new(
        SqliteTermRepository::try_new(conn).unwrap(),
        SqlitePositionStore::try_new(conn).unwrap(),
        config,
    )
}

fn add_terms(conn: &Connection, taxonomy: &str, names: &[&str]) -> Vec<TermId> {
    let repo = SqliteTermRepository::try_new(conn).unwrap();
    names
        .iter()
        .map(|name| repo.create_term(&NewTerm::new(taxonomy, *name)).unwrap().term_id)
        .collect()
}

fn positions(conn: &Connection, ids: &[TermId]) -> Vec<Option<i64>> {
    let store = SqlitePositionStore::try_new(conn).unwrap();
    ids.iter()
        .map(|id| store.get_position(*id).unwrap())
        .collect()
}

#[test]
fn backfill_assigns_one_to_n_in_default_order() {
    let conn = setup();
    // Inserted out of alphabetical order; default order is by name.
    let ids = add_terms(&conn, "category", &["Weather", "arts", "Sports", "News"]);

    let report = maintainer(&conn, config())
        .ensure_positions("category")
        .unwrap();

    assert_eq!(report.examined, 4);
    assert_eq!(report.written, 4);
    // arts=1, News=2, Sports=3, Weather=4
    assert_eq!(
        positions(&conn, &ids),
        vec![Some(4), Some(1), Some(3), Some(2)]
    );
}

#[test]
fn backfill_includes_terms_without_items() {
    let conn = setup();
    let repo = SqliteTermRepository::try_new(&conn).unwrap();
    let used = repo
        .create_term(&NewTerm::new("category", "Used").with_item_count(3))
        .unwrap();
    let unused = repo.create_term(&NewTerm::new("category", "Unused")).unwrap();

    maintainer(&conn, config())
        .ensure_positions("category")
        .unwrap();

    assert_eq!(
        positions(&conn, &[unused.term_id, used.term_id]),
        vec![Some(1), Some(2)]
    );
}

#[test]
fn backfill_is_idempotent() {
    let conn = setup();
    let ids = add_terms(&conn, "category", &["A", "B", "C"]);
    let maintainer = maintainer(&conn, config());

    maintainer.ensure_positions("category").unwrap();
    let first = positions(&conn, &ids);
    let second_report = maintainer.ensure_positions("category").unwrap();

    assert_eq!(second_report.written, 0);
    assert_eq!(positions(&conn, &ids), first);
}

#[test]
fn backfill_appends_new_terms_after_existing_positions() {
    let conn = setup();
    let ids = add_terms(&conn, "category", &["A", "B", "C"]);
    let maintainer = maintainer(&conn, config());
    maintainer.ensure_positions("category").unwrap();
    maintainer
        .apply_new_order("category", &[ids[2], ids[0], ids[1]])
        .unwrap();

    let late = add_terms(&conn, "category", &["Aardvark"]);
    let report = maintainer.ensure_positions("category").unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(positions(&conn, &late), vec![Some(4)]);
    assert_eq!(
        positions(&conn, &ids),
        vec![Some(2), Some(3), Some(1)]
    );
}

#[test]
fn backfill_of_unregistered_taxonomy_writes_nothing() {
    let conn = setup();
    let ids = add_terms(&conn, "genre", &["Jazz", "Blues"]);

    let report = maintainer(&conn, config()).ensure_positions("genre").unwrap();

    assert_eq!(report.written, 0);
    assert_eq!(positions(&conn, &ids), vec![None, None]);
}

#[test]
fn backfill_only_touches_requested_taxonomy() {
    let conn = setup();
    let categories = add_terms(&conn, "category", &["A", "B"]);
    let tags = add_terms(&conn, "post_tag", &["x", "y"]);

    maintainer(&conn, config())
        .ensure_positions("category")
        .unwrap();

    assert_eq!(positions(&conn, &categories), vec![Some(1), Some(2)]);
    assert_eq!(positions(&conn, &tags), vec![None, None]);
}

#[test]
fn apply_new_order_sets_index_plus_one() {
    let conn = setup();
    let ids = add_terms(&conn, "category", &["t1", "t2", "t3"]);
    let (t1, t2, t3) = (ids[0], ids[1], ids[2]);

    let report = maintainer(&conn, config())
        .apply_new_order("category", &[t3, t1, t2])
        .unwrap();

    assert_eq!(report.written, 3);
    assert_eq!(positions(&conn, &[t3, t1, t2]), vec![Some(1), Some(2), Some(3)]);
}

#[test]
fn apply_new_order_trusts_ids_by_default() {
    let conn = setup();
    let tags = add_terms(&conn, "post_tag", &["x"]);

    let report = maintainer(&conn, config())
        .apply_new_order("category", &[tags[0], 9_999])
        .unwrap();

    assert_eq!(report.written, 2);
    assert_eq!(positions(&conn, &[tags[0], 9_999]), vec![Some(1), Some(2)]);
}

#[test]
fn strict_membership_rejects_foreign_terms_before_writing() {
    let conn = setup();
    let categories = add_terms(&conn, "category", &["A", "B"]);
    let tags = add_terms(&conn, "post_tag", &["x"]);
    let maintainer = maintainer(&conn, config().with_strict_membership(true));

    let err = maintainer
        .apply_new_order("category", &[categories[1], tags[0], categories[0]])
        .unwrap_err();
    assert!(matches!(
        err,
        OrderServiceError::TermNotInTaxonomy { term_id, ref actual, .. }
            if term_id == tags[0] && actual == "post_tag"
    ));
    assert_eq!(positions(&conn, &categories), vec![None, None]);

    let err = maintainer
        .apply_new_order("category", &[categories[0], 424_242])
        .unwrap_err();
    assert!(matches!(err, OrderServiceError::TermNotFound(424_242)));

    let err = maintainer
        .apply_new_order("category", &[categories[0], categories[0]])
        .unwrap_err();
    assert!(matches!(err, OrderServiceError::DuplicateTerm(id) if id == categories[0]));
}

#[test]
fn deleted_term_leaves_orphan_position() {
    let conn = setup();
    let ids = add_terms(&conn, "category", &["A", "B"]);
    maintainer(&conn, config())
        .ensure_positions("category")
        .unwrap();

    SqliteTermRepository::try_new(&conn)
        .unwrap()
        .delete_term(ids[0])
        .unwrap();

    assert_eq!(positions(&conn, &ids), vec![Some(1), Some(2)]);
    let listed = SqliteTermRepository::try_new(&conn)
        .unwrap()
        .list_terms("category")
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].term_id, ids[1]);
}

#[test]
fn backfill_after_max_position_returns_error() {
    let conn = setup();
    let ids = add_terms(&conn, "category", &["A", "B"]);
    SqlitePositionStore::try_new(&conn)
        .unwrap()
        .set_position(ids[0], i64::MAX)
        .unwrap();

    let err = maintainer(&conn, config())
        .ensure_positions("category")
        .unwrap_err();

    assert!(matches!(
        err,
        OrderServiceError::PositionOverflow {
            highest: i64::MAX,
            missing: 1,
            ..
        }
    ));
    assert_eq!(positions(&conn, &ids), vec![Some(i64::MAX), None]);
}

#[test]
fn backfill_reports_corrupt_position_as_invalid_data() {
    let conn = setup();
    let ids = add_terms(&conn, "category", &["A", "B"]);
    conn.execute(
        "INSERT INTO term_positions (term_id, position) VALUES (?1, 'first');",
        [ids[0]],
    )
    .unwrap();

    let err = maintainer(&conn, config())
        .ensure_positions("category")
        .unwrap_err();

    assert!(matches!(
        err,
        OrderServiceError::Repo(RepoError::InvalidData(_))
    ));
}
