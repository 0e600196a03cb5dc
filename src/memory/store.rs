//! Persistence for per-user memory documents.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::memory::schema::{initialize_schema, is_initialized};
use crate::memory::types::{MemoryStore, UserId};

/// Storage for one memory document per user.
///
/// Saving replaces only the memory document; anything else a host keeps
/// about the user is untouched.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Load a user's memory, or `None` if they have none yet.
    async fn load(&self, user_id: &UserId) -> Result<Option<MemoryStore>>;

    /// Replace a user's memory document.
    async fn save(&self, user_id: &UserId, store: &MemoryStore) -> Result<()>;
}

/// Process-local repository.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    documents: RwLock<HashMap<UserId, MemoryStore>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's document.
    pub async fn insert(&self, user_id: UserId, store: MemoryStore) {
        self.documents.write().await.insert(user_id, store);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl MemoryRepository for InMemoryRepository {
    async fn load(&self, user_id: &UserId) -> Result<Option<MemoryStore>> {
        Ok(self.documents.read().await.get(user_id).cloned())
    }

    async fn save(&self, user_id: &UserId, store: &MemoryStore) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(user_id.clone(), store.clone());
        Ok(())
    }
}

/// SQLite-backed repository storing each document as JSON.
pub struct SqliteMemoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMemoryRepository {
    /// Open or create a repository at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if !is_initialized(&conn) {
            initialize_schema(&conn)?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory repository (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock connection: {}", e)))?;
        f(&conn).map_err(|e| Error::MemoryStorage(e.to_string()))
    }

    /// Number of users with a stored document.
    pub fn user_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM user_memory", [], |row| {
                row.get::<_, i64>(0)
            })
        })
        .map(|n| n as usize)
    }

    /// All user ids with a stored document, in id order.
    pub fn user_ids(&self) -> Result<Vec<UserId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM user_memory ORDER BY user_id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .map(|r| r.map(UserId::from))
                .collect::<rusqlite::Result<Vec<_>>>();
            ids
        })
    }
}

#[async_trait]
impl MemoryRepository for SqliteMemoryRepository {
    async fn load(&self, user_id: &UserId) -> Result<Option<MemoryStore>> {
        let document: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT document FROM user_memory WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| row.get(0),
            )
            .optional()
        })?;

        document
            .map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }

    async fn save(&self, user_id: &UserId, store: &MemoryStore) -> Result<()> {
        let document = serde_json::to_string(store)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_memory (user_id, document, extraction_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    document = excluded.document,
                    extraction_count = excluded.extraction_count,
                    updated_at = excluded.updated_at",
                params![
                    user_id.as_str(),
                    document,
                    store.extraction_count as i64,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }
}
