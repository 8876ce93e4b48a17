//! Session persistence
//!
//! One session record survives process restarts. The store is a trait seam
//! so the shell never touches SQLite directly; tests and `--ephemeral`
//! runs use the in-memory variant.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use groundgate_protocol::Session;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Errors from loading or saving the session record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Persistent home of the single session record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>, StoreError>;
    async fn save(&self, session: &Session) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        (**self).load().await
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        (**self).save(session).await
    }
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// SQLite-backed store: a single-row table holding the session as JSON.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn open(path: &PathBuf) -> Result<Connection, StoreError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                payload TEXT NOT NULL
            )",
            [],
        )?;
        Ok(conn)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        let path = self.path.clone();
        let payload: Option<String> = tokio::task::spawn_blocking(move || {
            let conn = Self::open(&path)?;
            let row = conn
                .query_row("SELECT payload FROM session WHERE id = 0", [], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok::<_, StoreError>(row)
        })
        .await??;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let path = self.path.clone();
        let payload = serde_json::to_string(session)?;
        tokio::task::spawn_blocking(move || {
            let conn = Self::open(&path)?;
            conn.execute(
                "INSERT INTO session (id, payload) VALUES (0, ?1)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
                params![payload],
            )?;
            Ok::<_, StoreError>(())
        })
        .await??;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-lifetime store for tests and `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryStore {
    session: Mutex<Option<Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.session.lock().expect("store lock poisoned").clone())
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        *self.session.lock().expect("store lock poisoned") = Some(session.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use groundgate_protocol::{Credential, WorkspaceRef};

    fn sample_session() -> Session {
        Session {
            logged_in: true,
            last_workspace: WorkspaceRef::workspace("g7"),
            credential: Some(Credential {
                access_token: "access".into(),
                refresh_token: "refresh".into(),
            }),
        }
    }

    #[tokio::test]
    async fn sqlite_store_round_trips_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("session.db"));

        assert!(store.load().await.unwrap().is_none());

        let session = sample_session();
        store.save(&session).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn sqlite_store_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("session.db"));

        store.save(&sample_session()).await.unwrap();
        store.save(&Session::default()).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert!(!loaded.logged_in);
        assert_eq!(loaded.last_workspace, WorkspaceRef::NoWorkspace);
    }

    #[tokio::test]
    async fn sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");

        SqliteStore::new(path.clone())
            .save(&sample_session())
            .await
            .unwrap();

        let reopened = SqliteStore::new(path);
        assert_eq!(reopened.load().await.unwrap(), Some(sample_session()));
    }

    #[tokio::test]
    async fn memory_store_round_trips_session() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&sample_session()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample_session()));
    }
}
