//! Source repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over `sources` and their user associations.
//! - Own cascade deletion of dependent document rows.
//!
//! # Invariants
//! - `update_data` replaces the whole user set in one transaction.
//! - `delete` removes dependents strictly before parents, all-or-nothing.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::forms::SourceData;
use crate::model::source::{Source, SourceId, UserId};
use log::info;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const SOURCE_SELECT_SQL: &str = "SELECT
    id,
    foreign_id,
    label,
    public,
    created_at,
    updated_at
FROM sources";

const REQUIRED_TABLES: &[&str] = &[
    "sources",
    "users",
    "source_users",
    "documents",
    "pages",
    "document_references",
];

const REQUIRED_SOURCE_COLUMNS: &[&str] = &[
    "id",
    "foreign_id",
    "label",
    "public",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for source persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(SourceId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "source not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted source data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind expected {expected_version}; run migrations first"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
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

/// Input for inserting a new source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSource {
    /// Resolved foreign id: caller-supplied or a generated token.
    pub foreign_id: String,
    pub data: SourceData,
}

/// Repository interface for source CRUD operations.
pub trait SourceRepository {
    /// Inserts a new source and its user set, returning the persisted record.
    fn insert(&mut self, new: &NewSource) -> RepoResult<Source>;
    /// Applies editable fields and replaces the full user association set.
    fn update_data(&mut self, id: SourceId, data: &SourceData) -> RepoResult<Source>;
    /// Cascading removal of the source and everything attributed to it.
    fn delete(&mut self, id: SourceId) -> RepoResult<()>;
    /// Point lookup by surrogate key.
    fn by_id(&self, id: SourceId) -> RepoResult<Option<Source>>;
    /// Point lookup by foreign id. `None` input short-circuits to no result.
    fn by_foreign_id(&self, foreign_id: Option<&str>) -> RepoResult<Option<Source>>;
    /// Lists sources, optionally restricted to an id set.
    fn all(&self, ids: Option<&[SourceId]>) -> RepoResult<Vec<Source>>;
    /// Maps source ids to labels, optionally restricted to an id set.
    fn all_labels(&self, ids: Option<&[SourceId]>)
        -> RepoResult<HashMap<SourceId, Option<String>>>;
}

/// SQLite-backed source repository.
pub struct SqliteSourceRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteSourceRepository<'conn> {
    /// Constructs a repository from a migrated, ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SourceRepository for SqliteSourceRepository<'_> {
    fn insert(&mut self, new: &NewSource) -> RepoResult<Source> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO sources (foreign_id, label, public) VALUES (?1, ?2, ?3);",
            params![
                new.foreign_id.as_str(),
                new.data.label.as_deref(),
                bool_to_int(new.data.public),
            ],
        )?;
        let id = tx.last_insert_rowid();
        insert_users_in_tx(&tx, id, &new.data.users)?;

        let source = load_source(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("source {id} missing directly after insert"))
        })?;
        tx.commit()?;

        info!("event=source_insert module=repo status=ok source_id={id}");
        Ok(source)
    }

    fn update_data(&mut self, id: SourceId, data: &SourceData) -> RepoResult<Source> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE sources
             SET
                label = ?1,
                public = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3;",
            params![data.label.as_deref(), bool_to_int(data.public), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        tx.execute("DELETE FROM source_users WHERE source_id = ?1;", [id])?;
        insert_users_in_tx(&tx, id, &data.users)?;

        let source = load_source(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("source {id} missing directly after update"))
        })?;
        tx.commit()?;

        Ok(source)
    }

    fn delete(&mut self, id: SourceId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Dependents before parents, to satisfy referential constraints.
        let pages = tx.execute(
            "DELETE FROM pages
             WHERE document_id IN (SELECT id FROM documents WHERE source_id = ?1);",
            [id],
        )?;
        let references = tx.execute(
            "DELETE FROM document_references
             WHERE document_id IN (SELECT id FROM documents WHERE source_id = ?1);",
            [id],
        )?;
        let documents = tx.execute("DELETE FROM documents WHERE source_id = ?1;", [id])?;
        tx.execute("DELETE FROM source_users WHERE source_id = ?1;", [id])?;

        let changed = tx.execute("DELETE FROM sources WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;

        info!(
            "event=source_delete module=repo status=ok source_id={id} \
             documents={documents} pages={pages} references={references}"
        );
        Ok(())
    }

    fn by_id(&self, id: SourceId) -> RepoResult<Option<Source>> {
        load_source(self.conn, id)
    }

    fn by_foreign_id(&self, foreign_id: Option<&str>) -> RepoResult<Option<Source>> {
        let Some(foreign_id) = foreign_id else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare(&format!("{SOURCE_SELECT_SQL} WHERE foreign_id = ?1;"))?;
        let mut rows = stmt.query([foreign_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_source_row(self.conn, row)?));
        }

        Ok(None)
    }

    fn all(&self, ids: Option<&[SourceId]>) -> RepoResult<Vec<Source>> {
        let mut sql = String::from(SOURCE_SELECT_SQL);
        let mut bind_values: Vec<SqlValue> = Vec::new();

        if let Some(ids) = ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            push_id_restriction(&mut sql, &mut bind_values, ids);
        }

        sql.push_str(" ORDER BY id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut sources = Vec::new();
        while let Some(row) = rows.next()? {
            sources.push(parse_source_row(self.conn, row)?);
        }

        Ok(sources)
    }

    fn all_labels(
        &self,
        ids: Option<&[SourceId]>,
    ) -> RepoResult<HashMap<SourceId, Option<String>>> {
        let mut sql = String::from("SELECT id, label FROM sources");
        let mut bind_values: Vec<SqlValue> = Vec::new();

        if let Some(ids) = ids {
            if ids.is_empty() {
                return Ok(HashMap::new());
            }
            push_id_restriction(&mut sql, &mut bind_values, ids);
        }
        sql.push(';');

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut labels = HashMap::new();
        while let Some(row) = rows.next()? {
            labels.insert(row.get::<_, SourceId>("id")?, row.get("label")?);
        }

        Ok(labels)
    }
}

fn push_id_restriction(sql: &mut String, bind_values: &mut Vec<SqlValue>, ids: &[SourceId]) {
    let placeholders = vec!["?"; ids.len()].join(", ");
    sql.push_str(&format!(" WHERE id IN ({placeholders})"));
    bind_values.extend(ids.iter().map(|id| SqlValue::Integer(*id)));
}

fn insert_users_in_tx(tx: &Transaction<'_>, source_id: SourceId, users: &[UserId]) -> RepoResult<()> {
    let mut stmt =
        tx.prepare("INSERT OR IGNORE INTO source_users (source_id, user_id) VALUES (?1, ?2);")?;
    for user_id in users {
        stmt.execute(params![source_id, user_id])?;
    }
    Ok(())
}

fn load_source(conn: &Connection, id: SourceId) -> RepoResult<Option<Source>> {
    let mut stmt = conn.prepare(&format!("{SOURCE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_source_row(conn, row)?));
    }
    Ok(None)
}

fn parse_source_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Source> {
    let id: SourceId = row.get("id")?;
    let public = match row.get::<_, i64>("public")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid public value `{other}` in sources.public"
            )));
        }
    };

    Ok(Source {
        id,
        foreign_id: row.get("foreign_id")?,
        label: row.get("label")?,
        public,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        users: load_users_for_source(conn, id)?,
    })
}

fn load_users_for_source(conn: &Connection, source_id: SourceId) -> RepoResult<Vec<UserId>> {
    let mut stmt = conn.prepare(
        "SELECT user_id
         FROM source_users
         WHERE source_id = ?1
         ORDER BY user_id ASC;",
    )?;
    let mut rows = stmt.query([source_id])?;
    let mut users = Vec::new();
    while let Some(row) = rows.next()? {
        users.push(row.get(0)?);
    }
    Ok(users)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected = latest_version();
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual < expected {
        return Err(RepoError::UninitializedConnection {
            expected_version: expected,
            actual_version: actual,
        });
    }

    for &table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for &column in REQUIRED_SOURCE_COLUMNS {
        if !table_has_column(conn, "sources", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "sources",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
