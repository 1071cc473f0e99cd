//! CSV → knowledge store ingestion
//!
//! Expected header (column order is free, names are case-insensitive):
//!
//! ```text
//! symptom,conditions,follow_up_questions
//! sore throat,"strep throat, common cold",Do you have a fever?;Any cough?
//! ```
//!
//! Conditions are comma-separated inside their (quoted) field and lowercased.
//! Questions are semicolon-separated and keep their case.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{KnowledgeStore, StoreError};

const SYMPTOM_COLUMN: &str = "symptom";
const CONDITIONS_COLUMN: &str = "conditions";
const QUESTIONS_COLUMN: &str = "follow_up_questions";

/// Ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV input is empty (no header row)")]
    MissingHeader,

    #[error("CSV header has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One normalized CSV row, ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRow {
    pub symptom: String,
    pub conditions: Vec<String>,
    pub questions: Vec<String>,
}

impl IngestRow {
    /// Normalize raw field values
    pub fn from_fields(symptom: &str, conditions: &str, questions: &str) -> Self {
        Self {
            symptom: symptom.trim().to_lowercase(),
            conditions: split_clean(conditions, ',', true),
            questions: split_clean(questions, ';', false),
        }
    }
}

fn split_clean(field: &str, sep: char, lowercase: bool) -> Vec<String> {
    field
        .split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if lowercase {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        })
        .collect()
}

/// Parse CSV text into normalized rows
///
/// A leading UTF-8 byte order mark (spreadsheet exports) is ignored. Rows
/// with an empty symptom are skipped with a warning.
pub fn parse_csv(text: &str) -> Result<Vec<IngestRow>, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text)?.into_iter();

    let (_, header) = records.next().ok_or(IngestError::MissingHeader)?;
    let column = |name: &'static str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or(IngestError::MissingColumn(name))
    };
    let symptom_idx = column(SYMPTOM_COLUMN)?;
    let conditions_idx = column(CONDITIONS_COLUMN)?;
    let questions_idx = column(QUESTIONS_COLUMN)?;

    let mut rows = Vec::new();
    for (line, fields) in records {
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let field = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");

        let row = IngestRow::from_fields(
            field(symptom_idx),
            field(conditions_idx),
            field(questions_idx),
        );
        if row.symptom.is_empty() {
            warn!(line, "Skipping CSV row with empty symptom");
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Split CSV text into records of fields, tagged with their starting line
///
/// Handles quoted fields with embedded commas, newlines and `""` escapes.
fn split_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, IngestError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut fields)));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(IngestError::UnterminatedQuote { line: quote_line });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }

    Ok(records)
}

fn row_fields<'a>(
    rows: &'a [IngestRow],
) -> impl Iterator<Item = (&'a str, &'a [String], &'a [String])> + 'a {
    rows.iter().map(|row| {
        (
            row.symptom.as_str(),
            row.conditions.as_slice(),
            row.questions.as_slice(),
        )
    })
}

/// Insert parsed rows in one transaction, returning the number ingested
pub fn ingest_rows(store: &mut KnowledgeStore, rows: &[IngestRow]) -> Result<usize, IngestError> {
    let count = store.insert_records(row_fields(rows))?;
    debug!(count, "Inserted symptom rows");
    Ok(count)
}

/// Replace the knowledge base with parsed rows in one transaction
pub fn replace_rows(store: &mut KnowledgeStore, rows: &[IngestRow]) -> Result<usize, IngestError> {
    let count = store.replace_records(row_fields(rows))?;
    debug!(count, "Replaced knowledge base");
    Ok(count)
}

fn read_rows(path: &Path) -> Result<Vec<IngestRow>, IngestError> {
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(&text)
}

/// Read, parse and ingest a CSV file
pub fn ingest_csv(store: &mut KnowledgeStore, path: &Path) -> Result<usize, IngestError> {
    let rows = read_rows(path)?;
    let count = ingest_rows(store, &rows)?;
    info!(count, path = %path.display(), "Ingested symptom CSV");
    Ok(count)
}

/// Read and parse a CSV file, then swap it in for the current contents
///
/// The store is only touched once the whole file has parsed.
pub fn replace_csv(store: &mut KnowledgeStore, path: &Path) -> Result<usize, IngestError> {
    let rows = read_rows(path)?;
    let count = replace_rows(store, &rows)?;
    info!(count, path = %path.display(), "Replaced knowledge base from CSV");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_fields() {
        let csv = "symptom,conditions,follow_up_questions\n\
                   \"  Sore Throat \",\"Strep Throat, Common Cold\",Do you have a fever?; Any cough? \n";
        let rows = parse_csv(csv).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symptom, "sore throat");
        assert_eq!(rows[0].conditions, vec!["strep throat", "common cold"]);
        assert_eq!(rows[0].questions, vec!["Do you have a fever?", "Any cough?"]);
    }

    #[test]
    fn test_parse_header_order_and_case() {
        let csv = "Follow_Up_Questions,SYMPTOM,Conditions\nHow long?,headache,migraine\n";
        let rows = parse_csv(csv).unwrap();

        assert_eq!(rows[0].symptom, "headache");
        assert_eq!(rows[0].conditions, vec!["migraine"]);
        assert_eq!(rows[0].questions, vec!["How long?"]);
    }

    #[test]
    fn test_parse_drops_empty_pieces() {
        let csv = "symptom,conditions,follow_up_questions\nrash,\"eczema,,\",;\n";
        let rows = parse_csv(csv).unwrap();

        assert_eq!(rows[0].conditions, vec!["eczema"]);
        assert!(rows[0].questions.is_empty());
    }

    #[test]
    fn test_parse_escaped_quotes_and_crlf() {
        let csv = "symptom,conditions,follow_up_questions\r\n\
                   cough,bronchitis,\"Is it \"\"dry\"\" or wet?\"\r\n";
        let rows = parse_csv(csv).unwrap();

        assert_eq!(rows[0].questions, vec!["Is it \"dry\" or wet?"]);
    }

    #[test]
    fn test_parse_skips_blank_and_empty_symptom_rows() {
        let csv = "symptom,conditions,follow_up_questions\n\n,flu,\nfever,flu,\n";
        let rows = parse_csv(csv).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symptom, "fever");
    }

    #[test]
    fn test_parse_missing_final_newline() {
        let csv = "symptom,conditions,follow_up_questions\nfatigue,anemia,Are you sleeping well?";
        assert_eq!(parse_csv(csv).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_csv(""), Err(IngestError::MissingHeader)));
        assert!(matches!(
            parse_csv("symptom,conditions\nfever,flu\n"),
            Err(IngestError::MissingColumn("follow_up_questions"))
        ));
        assert!(matches!(
            parse_csv("symptom,conditions,follow_up_questions\nfever,\"flu,\n"),
            Err(IngestError::UnterminatedQuote { line: 2 })
        ));
    }

    #[test]
    fn test_ingest_rows_into_store() {
        let mut store = KnowledgeStore::open_in_memory().unwrap();
        let rows = parse_csv(
            "symptom,conditions,follow_up_questions\n\
             headache,migraine,Do you have nausea?\n\
             sore throat,\"strep throat, common cold\",Do you have a fever?\n",
        )
        .unwrap();

        assert_eq!(ingest_rows(&mut store, &rows).unwrap(), 2);
        let stats = store.stats().unwrap();
        assert_eq!(stats.symptoms, 2);
        assert_eq!(stats.conditions, 3);
        assert_eq!(stats.questions, 2);
    }

    #[test]
    fn test_parse_strips_byte_order_mark() {
        let csv = "\u{feff}symptom,conditions,follow_up_questions\nfever,flu,How high?\n";
        let rows = parse_csv(csv).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symptom, "fever");
    }

    #[test]
    fn test_replace_rows_swaps_contents() {
        let mut store = KnowledgeStore::open_in_memory().unwrap();
        let old = parse_csv("symptom,conditions,follow_up_questions\nrash,eczema,\n").unwrap();
        ingest_rows(&mut store, &old).unwrap();

        let new = parse_csv("symptom,conditions,follow_up_questions\nfever,flu,\ncough,cold,\n").unwrap();
        assert_eq!(replace_rows(&mut store, &new).unwrap(), 2);

        let symptoms: Vec<String> = store.symptoms().unwrap().into_iter().map(|(_, s)| s).collect();
        assert_eq!(symptoms, vec!["fever", "cough"]);
    }

    #[test]
    fn test_replace_with_bad_csv_keeps_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = KnowledgeStore::open_in_memory().unwrap();
        let rows = parse_csv("symptom,conditions,follow_up_questions\nfever,flu,\n").unwrap();
        ingest_rows(&mut store, &rows).unwrap();

        let bad = dir.path().join("bad.csv");
        fs::write(&bad, "symptom,conditions\nheadache,migraine\n").unwrap();
        assert!(matches!(
            replace_csv(&mut store, &bad),
            Err(IngestError::MissingColumn("follow_up_questions"))
        ));
        assert!(matches!(
            replace_csv(&mut store, &dir.path().join("missing.csv")),
            Err(IngestError::Io { .. })
        ));

        assert_eq!(store.stats().unwrap().symptoms, 1);
    }
}
