use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::export;
use crate::models::{CommentExportRow, EngagementRecord};

// All comments live under one key as a student_id -> text JSON object.
const COMMENTS_KEY: &str = "advisor_comments";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persisted state is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Keyed persistence capability backing advisor state. Injected so the store
/// logic runs against an in-memory map in tests.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// A JSON object in a single file on disk. A missing file reads as an empty
/// store.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        std::fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }
}

/// Free-text advisor notes keyed by student id. Independent of the dataset
/// cache: invalidating the dataset leaves comments untouched.
pub struct AnnotationStore<S> {
    store: S,
}

impl<S: StateStore> AnnotationStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn read_comments(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match self.store.get(COMMENTS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BTreeMap::new()),
        }
    }

    /// The stored comment for a student, empty when none was recorded.
    pub fn comment(&self, student_id: &str) -> Result<String, StoreError> {
        Ok(self
            .read_comments()?
            .get(student_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Upsert, persisted immediately.
    pub fn set_comment(&self, student_id: &str, text: &str) -> Result<(), StoreError> {
        let mut comments = self.read_comments()?;
        comments.insert(student_id.to_string(), text.to_string());
        self.store
            .set(COMMENTS_KEY, &serde_json::to_string(&comments)?)?;
        Ok(())
    }

    /// Project stored comments onto the dataset as CSV. A comment whose id
    /// matches no record is dropped rather than exported stale.
    pub fn export_comments(
        &self,
        records: &[EngagementRecord],
        date: NaiveDate,
    ) -> anyhow::Result<String> {
        let comments = self.read_comments()?;
        let rows: Vec<CommentExportRow> = comments
            .iter()
            .filter_map(|(student_id, comment)| {
                records
                    .iter()
                    .find(|record| &record.student_id == student_id)
                    .map(|record| CommentExportRow {
                        student_id: student_id.clone(),
                        student_name: record.student_name.clone(),
                        department: record.department.clone(),
                        comment: comment.clone(),
                        date,
                    })
            })
            .collect();
        Ok(export::to_csv(&rows)?)
    }
}
