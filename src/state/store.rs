use rusqlite::{Connection, OptionalExtension, Result as SqlResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use super::data::Record;

/// Slot key under which the activity collection is stored
pub const ACTIVITIES_KEY: &str = "activities";

/// Errors a record store can return
///
/// Deserialization failure is deliberately absent: a stored collection that
/// no longer parses is treated as an empty one, never surfaced to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slot backend error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to serialize activity collection: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A named text cell in some persistence medium
///
/// Mirrors a web-storage style API: one string value per key, get and set
/// only. A key that was never written is indistinguishable from an absent
/// value.
pub trait Slot {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Durable slot storage backed by a single-table SQLite database
pub struct SqliteSlot {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteSlot {
    /// Create a slot store at the default location.
    ///
    /// The database file is created in the user's data directory:
    /// - Linux: ~/.local/share/activity-editor/activities.db
    /// - macOS: ~/Library/Application Support/activity-editor/activities.db
    /// - Windows: %APPDATA%\activity-editor\activities.db
    pub fn new() -> SqlResult<Self> {
        let db_path = Self::get_db_path();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .expect("Failed to create application data directory");
        }

        let conn = Connection::open(&db_path)?;

        println!("📁 Activity store initialized at: {}", db_path.display());

        let slot = SqliteSlot { conn, db_path };
        slot.init_schema()?;

        Ok(slot)
    }

    /// Open a slot store at an explicit path, creating the schema if needed
    pub fn open(path: &Path) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        let slot = SqliteSlot {
            conn,
            db_path: path.to_path_buf(),
        };
        slot.init_schema()?;
        Ok(slot)
    }

    /// Fully in-memory slot store (nothing touches disk)
    pub fn in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        let slot = SqliteSlot {
            conn,
            db_path: PathBuf::from(":memory:"),
        };
        slot.init_schema()?;
        Ok(slot)
    }

    /// Get the path where the database should be stored
    fn get_db_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(|| dirs::home_dir())
            .expect("Could not determine user data directory");

        path.push("activity-editor");
        path.push("activities.db");
        path
    }

    /// Initialize the database schema.
    /// One table, one row per slot key.
    fn init_schema(&self) -> SqlResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS slots (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }
}

impl Slot for SqliteSlot {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO slots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for SqliteSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSlot")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// In-process slot storage for tests and previews
///
/// Handles are cheap clones sharing one map, so a test can keep a handle
/// and give another to the store under test.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    cells: Rc<RefCell<HashMap<String, String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Slot for MemorySlot {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.cells.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.cells
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The RecordStore manages the persisted activity collection.
///
/// The whole collection lives in a single slot as one JSON document, read
/// fully and written fully on every operation, so no caller can observe a
/// half-written state. Collections are expected to stay small; the linear
/// scans below are fine.
pub struct RecordStore {
    slot: Box<dyn Slot>,
    key: String,
}

impl RecordStore {
    /// Create a store over the given slot using the standard collection key
    pub fn new(slot: Box<dyn Slot>) -> Self {
        RecordStore {
            slot,
            key: ACTIVITIES_KEY.to_string(),
        }
    }

    /// Load the full collection.
    ///
    /// A missing slot is an empty collection. So is a stored value that no
    /// longer parses: malformed data is treated as absence, not as an error
    /// the caller has to handle.
    pub fn load_all(&self) -> Result<Vec<Record>, StoreError> {
        let raw = match self.slot.get(&self.key)? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                eprintln!("⚠️  Stored activity collection is unreadable, starting empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Find a record by ID
    ///
    /// Linear scan over the collection; IDs are unique, so the first match
    /// is the only one.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Record>, StoreError> {
        Ok(self.load_all()?.into_iter().find(|r| r.id == id))
    }

    /// Replace the record whose ID matches, leaving all others untouched
    ///
    /// Collection order and size are preserved. If no record matches, the
    /// collection is written back unchanged; record creation happens
    /// elsewhere. The updated collection goes out in a single set.
    pub fn upsert(&self, record: &Record) -> Result<(), StoreError> {
        let updated: Vec<Record> = self
            .load_all()?
            .into_iter()
            .map(|r| if r.id == record.id { record.clone() } else { r })
            .collect();

        self.slot.set(&self.key, &serde_json::to_string(&updated)?)
    }

    /// Number of records currently stored
    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.load_all()?.len())
    }
}
