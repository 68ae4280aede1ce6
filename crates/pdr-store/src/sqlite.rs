//! SQLite-backed store.
//!
//! Layout:
//!
//! ```text
//! repositories(did PK, head, created_at, updated_at)
//! commits(repository_did, id, prev, data, signature, created_at)   PK (repository_did, id)
//! documents(repository_did, id, type, value, created_at, updated_at) PK (repository_did, id)
//! ```
//!
//! Timestamps are stored as fixed-width RFC 3339 text (see
//! [`pdr_types::format_timestamp`]) so `ORDER BY created_at` is chronological.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use pdr_types::{format_timestamp, parse_timestamp, Commit, CommitId, Did, Document, Repository};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_batch, CommitBatch, DocumentIndex, RepoStore, Store};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS repositories (
    did TEXT PRIMARY KEY,
    head TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS commits (
    repository_did TEXT NOT NULL,
    id TEXT NOT NULL,
    prev TEXT NOT NULL DEFAULT '',
    data BLOB NOT NULL,
    signature BLOB,
    created_at TEXT NOT NULL,
    PRIMARY KEY (repository_did, id)
);

CREATE TABLE IF NOT EXISTS documents (
    repository_did TEXT NOT NULL,
    id TEXT NOT NULL,
    type TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (repository_did, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_type
    ON documents(repository_did, type, created_at);
";

const DOCUMENT_COLUMNS: &str = "repository_did, id, type, value, created_at, updated_at";
const COMMIT_COLUMNS: &str = "repository_did, id, prev, data, signature, created_at";

/// Durable store on a single SQLite connection.
///
/// The connection is guarded by a `Mutex`; every trait call holds it for the
/// duration of the call. Multiple processes may share one database file:
/// `apply_commit` runs in an `IMMEDIATE` transaction, so its head check and
/// writes are atomic across processes as well.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite store");
        Self::with_connection(conn)
    }

    /// Create a private in-memory database (for tests).
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

struct RepositoryRow {
    did: String,
    head: String,
    created_at: String,
    updated_at: String,
}

impl RepositoryRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            did: row.get(0)?,
            head: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    fn decode(self) -> StoreResult<Repository> {
        Ok(Repository {
            did: Did::parse(self.did)?,
            head: CommitId::from_hex(&self.head)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct CommitRow {
    did: String,
    id: String,
    prev: String,
    data: Vec<u8>,
    signature: Option<Vec<u8>>,
    created_at: String,
}

impl CommitRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            did: row.get(0)?,
            id: row.get(1)?,
            prev: row.get(2)?,
            data: row.get(3)?,
            signature: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn decode(self) -> StoreResult<Commit> {
        Ok(Commit {
            id: CommitId::from_hex(&self.id)?,
            repository_did: Did::parse(self.did)?,
            prev: CommitId::from_hex(&self.prev)?,
            data: self.data,
            signature: self.signature,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct DocumentRow {
    did: String,
    id: String,
    kind: String,
    value: String,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            did: row.get(0)?,
            id: row.get(1)?,
            kind: row.get(2)?,
            value: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn decode(self) -> StoreResult<Document> {
        Ok(Document {
            id: self.id,
            repository_did: Did::parse(self.did)?,
            kind: self.kind,
            value: serde_json::from_str(&self.value)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Statements shared by the trait methods and the transactional path
// ---------------------------------------------------------------------------

fn select_head(conn: &Connection, did: &Did) -> StoreResult<Option<(CommitId, String)>> {
    let row = conn
        .query_row(
            "SELECT head, updated_at FROM repositories WHERE did = ?1",
            params![did.as_str()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    row.map(|(head, updated_at)| -> StoreResult<_> {
        Ok((CommitId::from_hex(&head)?, updated_at))
    })
    .transpose()
}

fn insert_document(conn: &Connection, doc: &Document) -> StoreResult<()> {
    conn.execute(
        &format!("INSERT INTO documents ({DOCUMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            doc.repository_did.as_str(),
            doc.id,
            doc.kind,
            serde_json::to_string(&doc.value)?,
            format_timestamp(&doc.created_at),
            format_timestamp(&doc.updated_at),
        ],
    )?;
    Ok(())
}

fn insert_commit(
    conn: &Connection,
    did: &Did,
    commit: &Commit,
    or_ignore: bool,
) -> StoreResult<()> {
    let verb = if or_ignore { "INSERT OR IGNORE" } else { "INSERT" };
    conn.execute(
        &format!("{verb} INTO commits ({COMMIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            did.as_str(),
            commit.id.to_hex(),
            commit.prev.to_hex(),
            commit.data,
            commit.signature,
            format_timestamp(&commit.created_at),
        ],
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn get_repository(&self, did: &Did) -> StoreResult<Option<Repository>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT did, head, created_at, updated_at FROM repositories WHERE did = ?1",
                params![did.as_str()],
                RepositoryRow::read,
            )
            .optional()?;
        row.map(RepositoryRow::decode).transpose()
    }

    fn save_repository(&self, repo: &Repository) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO repositories (did, head, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(did) DO UPDATE SET head = excluded.head, updated_at = excluded.updated_at",
            params![
                repo.did.as_str(),
                repo.head.to_hex(),
                format_timestamp(&repo.created_at),
                format_timestamp(&repo.updated_at),
            ],
        )?;
        Ok(())
    }

    fn ensure_repository(&self, repo: &Repository) -> StoreResult<Repository> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO repositories (did, head, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(did) DO NOTHING",
            params![
                repo.did.as_str(),
                repo.head.to_hex(),
                format_timestamp(&repo.created_at),
                format_timestamp(&repo.updated_at),
            ],
        )?;
        let stored = tx
            .query_row(
                "SELECT did, head, created_at, updated_at FROM repositories WHERE did = ?1",
                params![repo.did.as_str()],
                RepositoryRow::read,
            )?
            .decode()?;
        tx.commit()?;
        Ok(stored)
    }

    fn get_commit(&self, did: &Did, id: &CommitId) -> StoreResult<Option<Commit>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {COMMIT_COLUMNS} FROM commits WHERE repository_did = ?1 AND id = ?2"
                ),
                params![did.as_str(), id.to_hex()],
                CommitRow::read,
            )
            .optional()?;
        row.map(CommitRow::decode).transpose()
    }

    fn save_commit(&self, did: &Did, commit: &Commit) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if select_head(&tx, did)?.is_none() {
            return Err(StoreError::RepositoryNotFound(did.clone()));
        }
        insert_commit(&tx, did, commit, true)?;
        tx.commit()?;
        Ok(())
    }

    fn count_commits(&self, did: &Did) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM commits WHERE repository_did = ?1",
            params![did.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn list_repositories(&self) -> StoreResult<Vec<Did>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT did FROM repositories ORDER BY did")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|did| Did::parse(did).map_err(StoreError::from))
            .collect()
    }
}

impl DocumentIndex for SqliteStore {
    fn create_document(&self, doc: &Document) -> StoreResult<()> {
        let conn = self.lock()?;
        insert_document(&conn, doc)
    }

    fn get_document(&self, did: &Did, id: &str) -> StoreResult<Option<Document>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE repository_did = ?1 AND id = ?2"
                ),
                params![did.as_str(), id],
                DocumentRow::read,
            )
            .optional()?;
        row.map(DocumentRow::decode).transpose()
    }

    fn get_documents_by_type(&self, did: &Did, kind: &str) -> StoreResult<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents
             WHERE repository_did = ?1 AND type = ?2
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map(params![did.as_str(), kind], DocumentRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(DocumentRow::decode).collect()
    }
}

impl RepoStore for SqliteStore {
    fn apply_commit(&self, batch: &CommitBatch) -> StoreResult<Repository> {
        validate_batch(batch)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (current, updated_at) = select_head(&tx, &batch.did)?
            .ok_or_else(|| StoreError::RepositoryNotFound(batch.did.clone()))?;
        if current != batch.expected_head {
            tracing::warn!(
                did = %batch.did,
                expected = ?batch.expected_head,
                actual = ?current,
                "head moved, rejecting commit"
            );
            return Err(StoreError::HeadConflict {
                did: batch.did.clone(),
                expected: batch.expected_head,
                actual: current,
            });
        }

        insert_document(&tx, &batch.document)?;
        insert_commit(&tx, &batch.did, &batch.commit, false)?;

        let updated_at = parse_timestamp(&updated_at)?.max(batch.commit.created_at);
        tx.execute(
            "UPDATE repositories SET head = ?1, updated_at = ?2 WHERE did = ?3",
            params![
                batch.commit.id.to_hex(),
                format_timestamp(&updated_at),
                batch.did.as_str(),
            ],
        )?;

        let repo = tx
            .query_row(
                "SELECT did, head, created_at, updated_at FROM repositories WHERE did = ?1",
                params![batch.did.as_str()],
                RepositoryRow::read,
            )?
            .decode()?;
        tx.commit()?;

        tracing::debug!(did = %batch.did, head = %batch.commit.id.short_hex(), "applied commit");
        Ok(repo)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}
