//! SQLite-backed knowledge store
//!
//! Follows the storage pattern: concrete wrapper around SqliteDatabase with
//! domain-specific methods. Join tables carry a `position` column so
//! conditions and questions come back in the order they were ingested.

use rusqlite::{params, OptionalExtension, Transaction};
use serde::Serialize;
use std::path::Path;

use super::types::{StoreError, SymptomRecord};
use crate::db::SqliteDatabase;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS symptoms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symptom TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS conditions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    condition TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS symptom_condition (
    symptom_id INTEGER NOT NULL REFERENCES symptoms(id),
    condition_id INTEGER NOT NULL REFERENCES conditions(id),
    position INTEGER NOT NULL,
    PRIMARY KEY (symptom_id, condition_id)
);

CREATE TABLE IF NOT EXISTS symptom_question (
    symptom_id INTEGER NOT NULL REFERENCES symptoms(id),
    question_id INTEGER NOT NULL REFERENCES questions(id),
    position INTEGER NOT NULL,
    PRIMARY KEY (symptom_id, question_id)
);

CREATE TABLE IF NOT EXISTS symptom_embeddings (
    symptom_id INTEGER PRIMARY KEY REFERENCES symptoms(id),
    embedding BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS embedding_metadata (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_name TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    symptom_count INTEGER NOT NULL,
    generated_at TEXT NOT NULL
);
"#;

/// Embedding generation metadata
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingMetadata {
    pub model_name: String,
    pub dimension: usize,
    pub symptom_count: usize,
    pub generated_at: String,
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub symptoms: usize,
    pub conditions: usize,
    pub questions: usize,
    pub embeddings: usize,
}

/// Normalized symptom knowledge base
pub struct KnowledgeStore {
    db: SqliteDatabase,
}

impl KnowledgeStore {
    /// Open (or create) the store at `path` and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = SqliteDatabase::open(path).map_err(|e| StoreError::Open {
            reason: format!("{:#}", e),
        })?;
        Self::with_database(db)
    }

    /// In-memory store for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = SqliteDatabase::open_in_memory().map_err(|e| StoreError::Open {
            reason: format!("{:#}", e),
        })?;
        Self::with_database(db)
    }

    fn with_database(db: SqliteDatabase) -> Result<Self, StoreError> {
        db.connection().execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    // =========================================================================
    // Writes (ingestion and the embedding job)
    //
    // Every write runs in one transaction, so a failure part-way leaves the
    // previous contents untouched.
    // =========================================================================

    /// Insert one symptom with its conditions and questions
    ///
    /// Re-inserting an existing symptom links any new conditions/questions
    /// after the existing ones; duplicates are ignored.
    pub fn insert_record(
        &mut self,
        symptom: &str,
        conditions: &[String],
        questions: &[String],
    ) -> Result<i64, StoreError> {
        let tx = self.db.connection_mut().transaction()?;
        let id = insert_in_tx(&tx, symptom, conditions, questions)?;
        tx.commit()?;
        Ok(id)
    }

    /// Insert many records in a single transaction
    pub fn insert_records<'a, I>(&mut self, records: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = (&'a str, &'a [String], &'a [String])>,
    {
        let tx = self.db.connection_mut().transaction()?;
        let count = insert_all_in_tx(&tx, records)?;
        tx.commit()?;
        Ok(count)
    }

    /// Swap the whole knowledge base for `records`
    ///
    /// Clears and inserts in one transaction; on error the old contents stay.
    pub fn replace_records<'a, I>(&mut self, records: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = (&'a str, &'a [String], &'a [String])>,
    {
        let tx = self.db.connection_mut().transaction()?;
        clear_in_tx(&tx)?;
        let count = insert_all_in_tx(&tx, records)?;
        tx.commit()?;
        Ok(count)
    }

    /// Delete every row
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let tx = self.db.connection_mut().transaction()?;
        clear_in_tx(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Replace every stored embedding and the generation metadata
    ///
    /// Old vectors survive unless the whole set commits.
    pub fn replace_embeddings(
        &mut self,
        model_name: &str,
        dimension: usize,
        embeddings: &[(i64, Vec<f32>)],
    ) -> Result<(), StoreError> {
        let tx = self.db.connection_mut().transaction()?;
        tx.execute_batch("DELETE FROM symptom_embeddings; DELETE FROM embedding_metadata;")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO symptom_embeddings (symptom_id, embedding) VALUES (?1, ?2)",
            )?;
            for (symptom_id, embedding) in embeddings {
                stmt.execute(params![symptom_id, encode_vector(embedding)])?;
            }
        }

        tx.execute(
            "INSERT INTO embedding_metadata (model_name, dimension, symptom_count, generated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                model_name,
                dimension as i64,
                embeddings.len() as i64,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All symptoms as (id, text), in id order
    pub fn symptoms(&self) -> Result<Vec<(i64, String)>, StoreError> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT id, symptom FROM symptoms ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Symptom text for an id
    pub fn lookup_symptom(&self, symptom_id: i64) -> Result<Option<String>, StoreError> {
        let text = self
            .db
            .connection()
            .query_row(
                "SELECT symptom FROM symptoms WHERE id = ?1",
                [symptom_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(text)
    }

    /// Conditions linked to a symptom, in ingestion order
    pub fn lookup_conditions(&self, symptom_id: i64) -> Result<Vec<String>, StoreError> {
        self.linked_text(
            "SELECT c.condition FROM conditions c
             JOIN symptom_condition sc ON c.id = sc.condition_id
             WHERE sc.symptom_id = ?1
             ORDER BY sc.position",
            symptom_id,
        )
    }

    /// Follow-up questions linked to a symptom, in ingestion order
    pub fn lookup_questions(&self, symptom_id: i64) -> Result<Vec<String>, StoreError> {
        self.linked_text(
            "SELECT q.question FROM questions q
             JOIN symptom_question sq ON q.id = sq.question_id
             WHERE sq.symptom_id = ?1
             ORDER BY sq.position",
            symptom_id,
        )
    }

    fn linked_text(&self, sql: &str, symptom_id: i64) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.db.connection().prepare_cached(sql)?;
        let rows = stmt
            .query_map([symptom_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    /// Full record for an id
    pub fn record(&self, symptom_id: i64) -> Result<Option<SymptomRecord>, StoreError> {
        let Some(text) = self.lookup_symptom(symptom_id)? else {
            return Ok(None);
        };

        Ok(Some(SymptomRecord {
            id: symptom_id,
            text,
            conditions: self.lookup_conditions(symptom_id)?,
            questions: self.lookup_questions(symptom_id)?,
        }))
    }

    /// Load every stored vector with its symptom id, in id order
    ///
    /// Dimension agreement is checked by the embedding index, not here.
    pub fn load_all_vectors(&self) -> Result<(Vec<Vec<f32>>, Vec<i64>), StoreError> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT symptom_id, embedding FROM symptom_embeddings ORDER BY symptom_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut vectors = Vec::with_capacity(rows.len());
        let mut ids = Vec::with_capacity(rows.len());
        for (symptom_id, blob) in rows {
            vectors.push(decode_vector(symptom_id, &blob)?);
            ids.push(symptom_id);
        }

        Ok((vectors, ids))
    }

    /// Most recent embedding generation metadata
    pub fn embedding_metadata(&self) -> Result<Option<EmbeddingMetadata>, StoreError> {
        let metadata = self
            .db
            .connection()
            .query_row(
                "SELECT model_name, dimension, symptom_count, generated_at
                 FROM embedding_metadata
                 ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(EmbeddingMetadata {
                        model_name: row.get(0)?,
                        dimension: row.get::<_, i64>(1)? as usize,
                        symptom_count: row.get::<_, i64>(2)? as usize,
                        generated_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(metadata)
    }

    /// Row counts per table
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = self.db.connection().query_row(
                &format!("SELECT COUNT(*) FROM {}", table),
                [],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            symptoms: count("symptoms")?,
            conditions: count("conditions")?,
            questions: count("questions")?,
            embeddings: count("symptom_embeddings")?,
        })
    }
}

fn clear_in_tx(tx: &Transaction<'_>) -> Result<(), StoreError> {
    tx.execute_batch(
        "DELETE FROM symptom_embeddings;
         DELETE FROM embedding_metadata;
         DELETE FROM symptom_condition;
         DELETE FROM symptom_question;
         DELETE FROM conditions;
         DELETE FROM questions;
         DELETE FROM symptoms;",
    )?;
    Ok(())
}

fn insert_all_in_tx<'a, I>(tx: &Transaction<'_>, records: I) -> Result<usize, StoreError>
where
    I: IntoIterator<Item = (&'a str, &'a [String], &'a [String])>,
{
    let mut count = 0;
    for (symptom, conditions, questions) in records {
        insert_in_tx(tx, symptom, conditions, questions)?;
        count += 1;
    }
    Ok(count)
}

fn insert_in_tx(
    tx: &Transaction<'_>,
    symptom: &str,
    conditions: &[String],
    questions: &[String],
) -> Result<i64, StoreError> {
    tx.execute(
        "INSERT OR IGNORE INTO symptoms (symptom) VALUES (?1)",
        [symptom],
    )?;
    let symptom_id: i64 = tx.query_row(
        "SELECT id FROM symptoms WHERE symptom = ?1",
        [symptom],
        |row| row.get(0),
    )?;

    for condition in conditions {
        tx.execute(
            "INSERT OR IGNORE INTO conditions (condition) VALUES (?1)",
            [condition],
        )?;
        let condition_id: i64 = tx.query_row(
            "SELECT id FROM conditions WHERE condition = ?1",
            [condition],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO symptom_condition (symptom_id, condition_id, position)
             SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0)
             FROM symptom_condition WHERE symptom_id = ?1",
            params![symptom_id, condition_id],
        )?;
    }

    for question in questions {
        tx.execute(
            "INSERT OR IGNORE INTO questions (question) VALUES (?1)",
            [question],
        )?;
        let question_id: i64 = tx.query_row(
            "SELECT id FROM questions WHERE question = ?1",
            [question],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO symptom_question (symptom_id, question_id, position)
             SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0)
             FROM symptom_question WHERE symptom_id = ?1",
            params![symptom_id, question_id],
        )?;
    }

    Ok(symptom_id)
}

/// Convert f32 vector to little-endian bytes for a SQLite blob
pub fn encode_vector(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|&f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 blob
pub fn decode_vector(symptom_id: i64, blob: &[u8]) -> Result<Vec<f32>, StoreError> {
    if blob.len() % 4 != 0 {
        return Err(StoreError::CorruptVector {
            symptom_id,
            len: blob.len(),
        });
    }

    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
