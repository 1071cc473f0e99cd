//! Database abstraction for symptom-rag
//!
//! Thin SQLite wrapper that opens connections with foreign keys enforced.
//! The knowledge store owns one of these and layers the symptom schema on
//! top.
//!
//! # Example
//! ```no_run
//! use symptom_rag::db::SqliteDatabase;
//!
//! let db = SqliteDatabase::open(".symptom-rag/data/symptoms.db")?;
//! let count: i64 = db
//!     .connection()
//!     .query_row("SELECT COUNT(*) FROM symptoms", [], |row| row.get(0))?;
//! # let _ = count;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod sqlite;

pub use sqlite::SqliteDatabase;
