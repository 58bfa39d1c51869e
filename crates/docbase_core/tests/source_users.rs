use docbase_core::db::open_db_in_memory;
use docbase_core::{SourceService, SourceServiceError, SqliteSourceRepository};
use rusqlite::Connection;
use serde_json::json;

fn service(conn: &mut Connection) -> SourceService<SqliteSourceRepository<'_>> {
    SourceService::new(SqliteSourceRepository::try_new(conn).unwrap())
}

fn seed_user(conn: &Connection, email: &str) -> i64 {
    conn.execute("INSERT INTO users (email) VALUES (?1);", [email])
        .unwrap();
    conn.last_insert_rowid()
}

fn association_count(conn: &Connection, source_id: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM source_users WHERE source_id = ?1;",
        [source_id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn create_with_duplicate_users_stores_a_set() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = seed_user(&conn, "alice@example.com");
    let bob = seed_user(&conn, "bob@example.com");

    let source = {
        let mut service = service(&mut conn);
        service
            .create_source(&json!({
                "foreign_id": "acme",
                "users": [bob, alice, bob, alice]
            }))
            .unwrap()
    };

    assert_eq!(source.users, vec![alice, bob]);
    assert_eq!(association_count(&conn, source.id), 2);
}

#[test]
fn update_replaces_user_set_instead_of_merging() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = seed_user(&conn, "alice@example.com");
    let bob = seed_user(&conn, "bob@example.com");
    let carol = seed_user(&conn, "carol@example.com");

    let source = {
        let mut service = service(&mut conn);
        let source = service
            .create_source(&json!({ "foreign_id": "acme", "users": [alice, bob] }))
            .unwrap();
        service
            .update_source(source.id, &json!({ "users": [carol] }))
            .unwrap()
    };

    assert_eq!(source.users, vec![carol]);
    assert_eq!(association_count(&conn, source.id), 1);
    let lost: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM source_users WHERE source_id = ?1 AND user_id IN (?2, ?3);",
            [source.id, alice, bob],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(lost, 0);
}

#[test]
fn update_without_users_clears_all_associations() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = seed_user(&conn, "alice@example.com");

    let source = {
        let mut service = service(&mut conn);
        let source = service
            .create_source(&json!({ "foreign_id": "acme", "users": [alice] }))
            .unwrap();
        service
            .update_source(source.id, &json!({ "label": "Renamed" }))
            .unwrap()
    };

    assert!(source.users.is_empty());
    assert_eq!(association_count(&conn, source.id), 0);
}

#[test]
fn unknown_user_id_fails_and_rolls_back_creation() {
    let mut conn = open_db_in_memory().unwrap();

    {
        let mut service = service(&mut conn);
        let err = service
            .create_source(&json!({ "foreign_id": "acme", "users": [9999] }))
            .unwrap_err();
        assert!(matches!(err, SourceServiceError::Repo(_)));
        assert!(service.get_by_foreign_id(Some("acme")).unwrap().is_none());
    }

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM sources;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}
