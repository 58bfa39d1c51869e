use docbase_core::db::open_db_in_memory;
use docbase_core::{Source, SourceService, SqliteSourceRepository};
use rusqlite::{params, Connection};
use serde_json::json;

fn service(conn: &mut Connection) -> SourceService<SqliteSourceRepository<'_>> {
    SourceService::new(SqliteSourceRepository::try_new(conn).unwrap())
}

fn create_source(conn: &mut Connection, foreign_id: &str) -> Source {
    let mut service = service(conn);
    service
        .create_source(&json!({ "foreign_id": foreign_id }))
        .unwrap()
}

fn seed_document(conn: &Connection, source_id: i64, title: &str) -> i64 {
    conn.execute(
        "INSERT INTO documents (source_id, title) VALUES (?1, ?2);",
        params![source_id, title],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn seed_page(conn: &Connection, document_id: i64, number: i64) {
    conn.execute(
        "INSERT INTO pages (document_id, number, text) VALUES (?1, ?2, 'page text');",
        params![document_id, number],
    )
    .unwrap();
}

fn seed_reference(conn: &Connection, document_id: i64, entity_id: i64) {
    conn.execute(
        "INSERT INTO document_references (document_id, entity_id, weight) VALUES (?1, ?2, 1);",
        params![document_id, entity_id],
    )
    .unwrap();
}

fn count_for_source(conn: &Connection, table: &str, source_id: i64) -> i64 {
    let sql = match table {
        "documents" => "SELECT COUNT(*) FROM documents WHERE source_id = ?1;".to_string(),
        other => format!(
            "SELECT COUNT(*) FROM {other}
             WHERE document_id IN (SELECT id FROM documents WHERE source_id = ?1);"
        ),
    };
    conn.query_row(&sql, [source_id], |row| row.get(0)).unwrap()
}

#[test]
fn delete_cascades_to_pages_references_and_documents() {
    let mut conn = open_db_in_memory().unwrap();
    let doomed = create_source(&mut conn, "doomed");
    let survivor = create_source(&mut conn, "survivor");

    for source_id in [doomed.id, survivor.id] {
        let doc_a = seed_document(&conn, source_id, "report");
        let doc_b = seed_document(&conn, source_id, "appendix");
        seed_page(&conn, doc_a, 1);
        seed_page(&conn, doc_a, 2);
        seed_page(&conn, doc_b, 1);
        seed_reference(&conn, doc_a, 10);
        seed_reference(&conn, doc_b, 20);
    }

    {
        let mut service = service(&mut conn);
        service.delete_source(doomed.id).unwrap();
        assert!(service.get_source(doomed.id).unwrap().is_none());
        assert!(service
            .get_by_foreign_id(Some("doomed"))
            .unwrap()
            .is_none());
        assert!(service.get_source(survivor.id).unwrap().is_some());
    }

    assert_eq!(count_for_source(&conn, "pages", doomed.id), 0);
    assert_eq!(count_for_source(&conn, "document_references", doomed.id), 0);
    assert_eq!(count_for_source(&conn, "documents", doomed.id), 0);

    assert_eq!(count_for_source(&conn, "pages", survivor.id), 3);
    assert_eq!(count_for_source(&conn, "document_references", survivor.id), 2);
    assert_eq!(count_for_source(&conn, "documents", survivor.id), 2);
}

#[test]
fn delete_removes_user_associations_but_not_users() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO users (email) VALUES ('alice@example.com');", [])
        .unwrap();
    let alice = conn.last_insert_rowid();

    let source = {
        let mut service = service(&mut conn);
        let source = service
            .create_source(&json!({ "foreign_id": "acme", "users": [alice] }))
            .unwrap();
        service.delete_source(source.id).unwrap();
        source
    };

    let associations: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM source_users WHERE source_id = ?1;",
            [source.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(associations, 0);

    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users WHERE id = ?1;", [alice], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(users, 1);
}

#[test]
fn deleted_source_is_absent_from_listings_and_labels() {
    let mut conn = open_db_in_memory().unwrap();
    let doomed = create_source(&mut conn, "doomed");
    let survivor = create_source(&mut conn, "survivor");

    let mut service = service(&mut conn);
    service.delete_source(doomed.id).unwrap();

    let listed = service.list_sources(None).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, survivor.id);

    let labels = service.source_labels(None).unwrap();
    assert!(!labels.contains_key(&doomed.id));
    assert!(labels.contains_key(&survivor.id));
}
