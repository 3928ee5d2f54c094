use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::EngagementRecord;
use crate::normalize::{normalize, RawRow};
use crate::synthetic;

/// Size of the generated dataset served when the real source is unavailable.
pub const FALLBACK_ROWS: usize = 100;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("failed to read table source {0}: {1}")]
    Read(String, #[source] std::io::Error),
    #[error("malformed row in table source {0}: {1}")]
    Malformed(String, #[source] csv::Error),
}

/// Collaborator that resolves a source reference into raw rows. Row order from
/// the source is preserved through normalization.
pub trait TableSource {
    fn fetch_rows(
        &self,
        source_ref: &str,
    ) -> impl Future<Output = Result<Vec<RawRow>, DataSourceError>> + Send;
}

/// Reads a CSV file from disk. Header row names the columns; empty cells are
/// treated as absent so the normalizer applies its defaults.
pub struct CsvTableSource;

impl TableSource for CsvTableSource {
    async fn fetch_rows(&self, source_ref: &str) -> Result<Vec<RawRow>, DataSourceError> {
        let bytes = tokio::fs::read(source_ref)
            .await
            .map_err(|err| DataSourceError::Read(source_ref.to_string(), err))?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes.as_slice());
        let headers = reader
            .headers()
            .map_err(|err| DataSourceError::Malformed(source_ref.to_string(), err))?
            .clone();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record =
                result.map_err(|err| DataSourceError::Malformed(source_ref.to_string(), err))?;
            let mut row = RawRow::new();
            for (column, cell) in headers.iter().zip(record.iter()) {
                if !cell.is_empty() {
                    row.set(column, Value::String(cell.to_string()));
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

#[derive(Debug)]
pub enum DatasetOrigin {
    Source,
    Cache,
    Fallback(DataSourceError),
}

#[derive(Debug)]
pub struct LoadedDataset {
    pub records: Arc<Vec<EngagementRecord>>,
    pub origin: DatasetOrigin,
}

/// Owns the single resident dataset. The cache slot sits behind a mutex that
/// is held across fetch+normalize, so overlapping loads serialize instead of
/// racing the slot.
pub struct DatasetService<S> {
    source: S,
    cache: Mutex<Option<Arc<Vec<EngagementRecord>>>>,
    generation: AtomicU64,
}

impl<S: TableSource> DatasetService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Return the cached collection when present, otherwise fetch, normalize
    /// and cache. On fetch failure the caller still gets a dataset: a
    /// generated sample collection, flagged by its origin.
    pub async fn load(&self, source_ref: &str) -> LoadedDataset {
        let mut slot = self.cache.lock().await;
        if let Some(records) = slot.as_ref() {
            return LoadedDataset {
                records: Arc::clone(records),
                origin: DatasetOrigin::Cache,
            };
        }
        self.fill(&mut slot, source_ref).await
    }

    /// Drop the cached collection; the next load re-reads the source.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Invalidate and reload in one step. A refresh that loses the race to a
    /// concurrent refresh returns the freshly cached collection instead of
    /// paying for a second fetch cycle.
    pub async fn refresh(&self, source_ref: &str) -> LoadedDataset {
        let seen = self.generation.load(Ordering::SeqCst);
        let mut slot = self.cache.lock().await;
        if self.generation.load(Ordering::SeqCst) != seen {
            if let Some(records) = slot.as_ref() {
                return LoadedDataset {
                    records: Arc::clone(records),
                    origin: DatasetOrigin::Cache,
                };
            }
        }
        *slot = None;
        self.fill(&mut slot, source_ref).await
    }

    async fn fill(
        &self,
        slot: &mut Option<Arc<Vec<EngagementRecord>>>,
        source_ref: &str,
    ) -> LoadedDataset {
        match self.source.fetch_rows(source_ref).await {
            Ok(rows) => {
                let records: Vec<EngagementRecord> = rows
                    .iter()
                    .enumerate()
                    .map(|(index, row)| normalize(row, index))
                    .collect();
                info!(
                    records = records.len(),
                    source = source_ref,
                    "loaded engagement dataset"
                );
                let records = Arc::new(records);
                *slot = Some(Arc::clone(&records));
                self.generation.fetch_add(1, Ordering::SeqCst);
                LoadedDataset {
                    records,
                    origin: DatasetOrigin::Source,
                }
            }
            Err(error) => {
                // The fallback is never cached: the next load retries the
                // real source.
                warn!(%error, "table source unavailable, serving generated sample data");
                LoadedDataset {
                    records: Arc::new(synthetic::generate_records(FALLBACK_ROWS)),
                    origin: DatasetOrigin::Fallback(error),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TableSource for Arc<CountingSource> {
        async fn fetch_rows(&self, _source_ref: &str) -> Result<Vec<RawRow>, DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(DataSourceError::Read(
                    "missing.csv".to_string(),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                ));
            }
            Ok(vec![
                student_row("STU0001", 1),
                student_row("STU0001", 2),
                student_row("STU0002", 1),
            ])
        }
    }

    fn student_row(student_id: &str, week: u32) -> RawRow {
        let mut row = RawRow::new();
        row.set("student_id", json!(student_id));
        row.set("week_number", json!(week));
        row
    }

    #[tokio::test]
    async fn load_serves_the_cache_after_the_first_fetch() {
        let source = CountingSource::new(false);
        let service = DatasetService::new(Arc::clone(&source));

        let first = service.load("engagement.csv").await;
        assert!(matches!(first.origin, DatasetOrigin::Source));
        assert_eq!(first.records.len(), 3);

        let second = service.load("engagement.csv").await;
        assert!(matches!(second.origin, DatasetOrigin::Cache));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_the_next_load_to_refetch() {
        let source = CountingSource::new(false);
        let service = DatasetService::new(Arc::clone(&source));

        service.load("engagement.csv").await;
        service.invalidate().await;
        let reloaded = service.load("engagement.csv").await;

        assert!(matches!(reloaded.origin, DatasetOrigin::Source));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let source = CountingSource::new(false);
        let service = DatasetService::new(Arc::clone(&source));

        let (first, second) = tokio::join!(
            service.load("engagement.csv"),
            service.load("engagement.csv")
        );

        assert_eq!(source.calls(), 1);
        assert_eq!(first.records.len(), second.records.len());
    }

    #[tokio::test]
    async fn concurrent_refreshes_cost_one_fetch_cycle() {
        let source = CountingSource::new(false);
        let service = DatasetService::new(Arc::clone(&source));

        service.load("engagement.csv").await;
        assert_eq!(source.calls(), 1);

        let (first, second) = tokio::join!(
            service.refresh("engagement.csv"),
            service.refresh("engagement.csv")
        );

        assert_eq!(source.calls(), 2);
        let cache_hits = usize::from(matches!(first.origin, DatasetOrigin::Cache))
            + usize::from(matches!(second.origin, DatasetOrigin::Cache));
        assert_eq!(cache_hits, 1);
    }

    #[tokio::test]
    async fn failed_fetch_falls_back_without_caching() {
        let source = CountingSource::new(true);
        let service = DatasetService::new(Arc::clone(&source));

        let first = service.load("engagement.csv").await;
        assert!(matches!(first.origin, DatasetOrigin::Fallback(_)));
        assert_eq!(first.records.len(), FALLBACK_ROWS);
        for record in first.records.iter() {
            assert!(record.total_activity_score >= 0.0);
            assert!(record.total_activity_score <= 100.0);
        }

        let second = service.load("engagement.csv").await;
        assert!(matches!(second.origin, DatasetOrigin::Fallback(_)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn csv_source_yields_rows_in_file_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engagement.csv");
        std::fs::write(
            &path,
            "student_id,week_number,attendance_rate\nSTU0009,2,\nSTU0010,3,91.5\n",
        )
        .expect("write csv");

        let rows = CsvTableSource
            .fetch_rows(path.to_str().expect("utf-8 path"))
            .await
            .expect("rows");
        assert_eq!(rows.len(), 2);

        let first = normalize(&rows[0], 0);
        assert_eq!(first.student_id, "STU0009");
        assert_eq!(first.week_number, 2);
        assert_eq!(first.attendance_rate, 0.0);

        let second = normalize(&rows[1], 1);
        assert_eq!(second.student_id, "STU0010");
        assert_eq!(second.attendance_rate, 91.5);
    }
}
