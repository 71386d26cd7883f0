//! Durable key/value storage for the session, with SQLite and in-memory backends.

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};

/// Trait for session storage backends.
///
/// Each key is written independently, so a crash between two writes leaves
/// the other keys intact for the reader to reconcile.
pub trait SessionStorage: Send + Sync {
  fn save(&self, key: &str, value: &str) -> Result<()>;

  fn load(&self, key: &str) -> Result<Option<String>>;

  fn remove(&self, key: &str) -> Result<()>;
}

/// Storage that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl SessionStorage for MemoryStorage {
  fn save(&self, key: &str, value: &str) -> Result<()> {
    self.entries().insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn load(&self, key: &str) -> Result<Option<String>> {
    Ok(self.entries().get(key).cloned())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.entries().remove(key);
    Ok(())
  }
}

/// SQLite-based session storage.
///
/// Keys are prefixed with a digest of the API base URL so one database can
/// hold sessions for several backends.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
  namespace: String,
}

/// Schema for the session table.
const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS session_kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStorage {
  /// Open (or create) the database at `path`.
  pub fn open(path: &Path, base_url: &str) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("failed to create session directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::Storage(format!(
        "failed to open session database at {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::with_connection(conn, base_url)
  }

  pub fn open_in_memory(base_url: &str) -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?, base_url)
  }

  /// Default database path under the user's data directory.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::Storage("could not determine data directory".to_string()))?;

    Ok(data_dir.join("troupe").join("session.db"))
  }

  fn with_connection(conn: Connection, base_url: &str) -> Result<Self> {
    conn
      .execute_batch(SESSION_SCHEMA)
      .map_err(|e| Error::Storage(format!("failed to run session migrations: {}", e)))?;

    Ok(Self {
      conn: Mutex::new(conn),
      namespace: namespace_for(base_url),
    })
  }

  fn conn(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn scoped(&self, key: &str) -> String {
    format!("{}:{}", self.namespace, key)
  }
}

impl SessionStorage for SqliteStorage {
  fn save(&self, key: &str, value: &str) -> Result<()> {
    self.conn().execute(
      "INSERT OR REPLACE INTO session_kv (key, value, updated_at)
       VALUES (?, ?, datetime('now'))",
      params![self.scoped(key), value],
    )?;
    Ok(())
  }

  fn load(&self, key: &str) -> Result<Option<String>> {
    let value: Option<String> = self
      .conn()
      .query_row(
        "SELECT value FROM session_kv WHERE key = ?",
        params![self.scoped(key)],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.conn().execute(
      "DELETE FROM session_kv WHERE key = ?",
      params![self.scoped(key)],
    )?;
    Ok(())
  }
}

/// Stable, fixed-length namespace for a backend.
fn namespace_for(base_url: &str) -> String {
  let normalized = base_url.trim().trim_end_matches('/').to_lowercase();
  let mut hasher = Sha256::new();
  hasher.update(normalized.as_bytes());
  hex::encode(&hasher.finalize()[..8])
}
