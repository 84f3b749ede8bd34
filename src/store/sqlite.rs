use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

use super::{
    schema, split_path, ChangeCallback, ChangeHub, Document, DocumentStore, StoreError,
    Subscription,
};

/// SQLite-backed [`DocumentStore`].
///
/// Documents are rows in a single `documents` table keyed by path, with the
/// JSON payload stored as text. The path primary key is what makes
/// `set_full` an atomic upsert: concurrent writers to the same path resolve
/// to one row, last write winning.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    changes: ChangeHub,
}

impl SqliteStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: ChangeHub::new(),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "johari")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("johari.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: ChangeHub::new(),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }
}

fn decode(path: &str, raw: &str) -> Result<Value, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Malformed {
        path: path.to_string(),
        source,
    })
}

impl DocumentStore for SqliteStore {
    fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let path = format!("{collection}/{id}");
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO documents (path, collection, data, updated_at) VALUES (?, ?, ?, ?)",
            (&path, collection, serde_json::to_string(&data)?, &now),
        )?;
        drop(conn);

        self.changes.publish(&path);
        Ok(id)
    }

    fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        split_path(path)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT data FROM documents WHERE path = ?")?;

        let mut rows = stmt.query([path])?;
        if let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            Ok(Some(decode(path, &raw)?))
        } else {
            Ok(None)
        }
    }

    fn set_full(&self, path: &str, data: Value) -> Result<(), StoreError> {
        let (collection, _) = split_path(path)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO documents (path, collection, data, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            (path, collection, serde_json::to_string(&data)?, &now),
        )?;
        drop(conn);

        self.changes.publish(path);
        Ok(())
    }

    fn query(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let prefix = format!("{collection}/");
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT path, data FROM documents WHERE collection = ? ORDER BY path",
        )?;

        let rows = stmt
            .query_map([collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::new();
        for (path, raw) in rows {
            let id = path.strip_prefix(&prefix).unwrap_or(&path).to_string();
            results.push(Document {
                id,
                data: decode(&path, &raw)?,
            });
        }
        Ok(results)
    }

    fn subscribe(&self, prefix: &str, callback: ChangeCallback) -> Subscription {
        self.changes.subscribe(prefix, callback)
    }
}
