//! Archival engine
//!
//! Moves messages older than a cutoff out of the live store into
//! checksummed, date-partitioned archive batches, and records auditable
//! job state. Failure is contained per batch: one bad batch never fails
//! a whole course's run, and messages belonging to a failed batch are
//! never deleted from the live store.

use crate::batch::{batch_path, time_range, BatchPayload};
use crate::config::ArchiveConfig;
use crate::error::{Error, Result};
use crate::meta::{
    fmt_ts, normalize_content, now_ts, ArchiveBatch, CourseLocks, JobStatus, MetaDb,
    SearchIndexEntry,
};
use crate::model::Message;
use crate::source::LiveMessageSource;
use crate::storage::ObjectStorage;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Outcome of a single batch write-verify-record sequence
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch_index: i64,
    pub success: bool,
    pub messages_processed: usize,
    pub bytes_written: usize,
    pub error: Option<String>,
}

/// Outcome of one course's archival run
#[derive(Debug, Clone, Serialize)]
pub struct CourseReport {
    pub course_id: String,
    pub job_id: Option<String>,
    pub skipped: bool,
    pub batches: Vec<BatchResult>,
    pub messages_archived: usize,
    pub total_bytes: usize,
    pub messages_deleted: u64,
    pub error: Option<String>,
}

impl CourseReport {
    fn skipped(course_id: &str) -> Self {
        Self {
            course_id: course_id.to_string(),
            job_id: None,
            skipped: true,
            batches: Vec::new(),
            messages_archived: 0,
            total_bytes: 0,
            messages_deleted: 0,
            error: None,
        }
    }

    pub fn batches_failed(&self) -> usize {
        self.batches.iter().filter(|b| !b.success).count()
    }
}

/// Outcome of a whole archival run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub cutoff: DateTime<Utc>,
    pub courses: Vec<CourseReport>,
}

/// The archival engine. Holds the shared stores; runs are invoked by an
/// external scheduler through [`ArchivalEngine::run`].
pub struct ArchivalEngine {
    db: MetaDb,
    storage: Arc<dyn ObjectStorage>,
    source: Arc<dyn LiveMessageSource>,
    /// Shared with the search engine so index writes here serialize
    /// against its rebuilds
    locks: CourseLocks,
    config: ArchiveConfig,
}

impl ArchivalEngine {
    pub fn new(
        db: MetaDb,
        storage: Arc<dyn ObjectStorage>,
        source: Arc<dyn LiveMessageSource>,
        locks: CourseLocks,
        config: ArchiveConfig,
    ) -> Self {
        Self {
            db,
            storage,
            source,
            locks,
            config,
        }
    }

    /// The archival eligibility boundary: messages created before this
    /// instant are archived
    pub fn cutoff(&self) -> DateTime<Utc> {
        Utc::now() - Duration::days(self.config.cutoff_days)
    }

    /// Run archival across all courses that need it
    pub async fn run(&self) -> Result<RunSummary> {
        let cutoff = self.cutoff();
        info!("Starting archival run with cutoff {}", cutoff);

        let courses = self
            .source
            .list_courses_needing_archival(cutoff, self.config.min_messages)
            .await?;
        info!("{} courses need archival", courses.len());

        let mut reports = Vec::with_capacity(courses.len());
        for course_id in &courses {
            reports.push(self.archive_course(course_id, cutoff).await?);
        }

        Ok(RunSummary {
            cutoff,
            courses: reports,
        })
    }

    /// Archive one course's eligible messages. Returns a report rather
    /// than an error for everything that is contained at course level;
    /// only metadata-database failures propagate.
    pub async fn archive_course(
        &self,
        course_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<CourseReport> {
        let Some(job) = self.db.claim_job(course_id, cutoff).await? else {
            warn!(
                "Skipping course {}: an archival job is already processing",
                course_id
            );
            return Ok(CourseReport::skipped(course_id));
        };

        let mut report = CourseReport {
            course_id: course_id.to_string(),
            job_id: Some(job.id.clone()),
            skipped: false,
            batches: Vec::new(),
            messages_archived: 0,
            total_bytes: 0,
            messages_deleted: 0,
            error: None,
        };

        // A fetch failure before batching begins is the one condition
        // that fails the whole course's job.
        let mut messages = match self.source.fetch_messages(course_id, cutoff).await {
            Ok(messages) => messages,
            Err(e) => {
                error!("Fetch for course {} failed: {}", course_id, e);
                self.db
                    .complete_job(&job.id, JobStatus::Failed, Some(e.to_string()))
                    .await?;
                report.error = Some(e.to_string());
                return Ok(report);
            }
        };

        if messages.is_empty() {
            info!("Course {}: nothing to archive", course_id);
            self.db
                .complete_job(&job.id, JobStatus::Completed, None)
                .await?;
            return Ok(report);
        }

        // Chronological order so batch index order matches time
        // coverage: batch N always precedes batch N+1.
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let start_index = self.db.next_batch_index(course_id).await?;
        let chunks: Vec<&[Message]> = messages.chunks(self.config.batch_size).collect();
        let total_batches = chunks.len();
        info!(
            "Course {}: {} messages in {} batches",
            course_id,
            messages.len(),
            total_batches
        );

        let mut failed_range_start: Option<DateTime<Utc>> = None;

        for (i, chunk) in chunks.iter().enumerate() {
            let batch_index = start_index + i as i64;
            let result = self.write_batch(course_id, batch_index, chunk).await;

            if result.success {
                report.messages_archived += result.messages_processed;
                report.total_bytes += result.bytes_written;
                self.mark_archived(chunk).await;
            } else if let Some((start, _)) = time_range(chunk) {
                failed_range_start = Some(match failed_range_start {
                    Some(existing) => existing.min(start),
                    None => start,
                });
            }
            report.batches.push(result);

            let progress = ((i + 1) * 100 / total_batches) as i64;
            self.db
                .update_job_progress(
                    &job.id,
                    progress,
                    report.messages_archived as i64,
                    report.total_bytes as i64,
                    report.batches_failed() as i64,
                )
                .await?;
        }

        // Request deletion of the archived originals. The bound never
        // reaches into a failed batch's range, so those messages stay
        // live and are picked up again by the next run.
        if report.messages_archived > 0 {
            let bound = match failed_range_start {
                Some(start) => cutoff.min(start),
                None => cutoff,
            };
            match self.source.delete_messages(course_id, bound).await {
                Ok(deleted) => {
                    info!("Course {}: deleted {} archived messages", course_id, deleted);
                    report.messages_deleted = deleted;
                }
                Err(e) => {
                    // Archive stays the source of truth; the live copies
                    // linger until a later run re-archives and purges.
                    warn!("Course {}: post-archive deletion failed: {}", course_id, e);
                }
            }
        }

        self.db
            .complete_job(&job.id, JobStatus::Completed, None)
            .await?;
        info!(
            "Course {}: archived {} messages in {} batches ({} failed)",
            course_id,
            report.messages_archived,
            report.batches.len(),
            report.batches_failed()
        );

        Ok(report)
    }

    /// One batch's write-verify-record sequence with bounded retries.
    /// There is no mid-batch resume: a failed attempt cleans up any
    /// partial object and the whole batch is retried or abandoned.
    async fn write_batch(&self, course_id: &str, batch_index: i64, messages: &[Message]) -> BatchResult {
        let mut last_err = String::new();

        for attempt in 1..=self.config.max_batch_attempts {
            match self.try_write_batch(course_id, batch_index, messages).await {
                Ok(bytes_written) => {
                    debug!(
                        "Course {}: batch {} written ({} messages, {} bytes)",
                        course_id,
                        batch_index,
                        messages.len(),
                        bytes_written
                    );
                    return BatchResult {
                        batch_index,
                        success: true,
                        messages_processed: messages.len(),
                        bytes_written,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(
                        "Course {}: batch {} attempt {}/{} failed: {}",
                        course_id, batch_index, attempt, self.config.max_batch_attempts, e
                    );
                    last_err = e.to_string();
                    if attempt < self.config.max_batch_attempts {
                        tokio::time::sleep(std::time::Duration::from_millis(
                            200 * attempt as u64,
                        ))
                        .await;
                    }
                }
            }
        }

        BatchResult {
            batch_index,
            success: false,
            messages_processed: messages.len(),
            bytes_written: 0,
            error: Some(last_err),
        }
    }

    async fn try_write_batch(
        &self,
        course_id: &str,
        batch_index: i64,
        messages: &[Message],
    ) -> Result<usize> {
        let archived_at = Utc::now();
        let payload = BatchPayload::build(course_id, batch_index, archived_at, messages.to_vec())?;
        let bytes = payload.encode()?;
        let path = batch_path(course_id, batch_index, archived_at);

        let outcome = self
            .write_and_record(&path, &bytes, &payload, messages)
            .await;
        if outcome.is_err() {
            // Never leave a ghost object behind a missing row
            if let Err(cleanup) = self.storage.delete(&path).await {
                warn!("Cleanup of partial object {} failed: {}", path, cleanup);
            }
        }
        outcome?;
        Ok(bytes.len())
    }

    async fn write_and_record(
        &self,
        path: &str,
        bytes: &[u8],
        payload: &BatchPayload,
        messages: &[Message],
    ) -> Result<()> {
        self.storage.put(path, bytes).await?;

        // Verify the write before recording: the object must exist and
        // read back with a matching checksum.
        if !self.storage.exists(path).await? {
            return Err(Error::Storage(format!(
                "object {} missing after write",
                path
            )));
        }
        let stored = self.storage.get(path).await?;
        BatchPayload::decode_verified(&stored, path, &payload.checksum)?;

        let (range_start, range_end) =
            time_range(messages).ok_or_else(|| Error::Storage("empty batch".to_string()))?;

        self.db
            .insert_batch(&ArchiveBatch {
                id: Uuid::new_v4().to_string(),
                course_id: payload.course_id.clone(),
                tenant_id: messages[0].tenant_id.clone(),
                storage_path: path.to_string(),
                message_count: messages.len() as i64,
                size_bytes: bytes.len() as i64,
                batch_index: payload.batch_index,
                checksum: payload.checksum.clone(),
                range_start: fmt_ts(range_start),
                range_end: fmt_ts(range_end),
                created_at: fmt_ts(payload.archived_at),
            })
            .await?;

        Ok(())
    }

    /// Flip index entries to archived for a durably written batch. The
    /// batch is already recorded, so an index hiccup here is logged and
    /// left for the next rebuild rather than failing the batch.
    async fn mark_archived(&self, messages: &[Message]) {
        let Some(first) = messages.first() else {
            return;
        };
        let lock = self.locks.acquire(&first.course_id).await;
        let _guard = lock.lock().await;

        for message in messages {
            let entry = SearchIndexEntry {
                message_id: message.id.clone(),
                course_id: message.course_id.clone(),
                tenant_id: message.tenant_id.clone(),
                author_id: message.author_id.clone(),
                content: normalize_content(&message.content),
                created_at: fmt_ts(message.created_at),
                archived: true,
                indexed_at: now_ts(),
            };
            if let Err(e) = self.db.upsert_index_entry(&entry).await {
                warn!("Index update for message {} failed: {}", message.id, e);
            }
        }
    }

    /// Restore/cleanup path: delete a batch's stored object together
    /// with its row. The row goes last so a crash in between leaves a
    /// detectable dangling row, not an unrecorded object.
    pub async fn remove_batch(&self, batch_id: &str) -> Result<ArchiveBatch> {
        let batch = self
            .db
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| Error::BatchNotFound(batch_id.to_string()))?;

        self.storage.delete(&batch.storage_path).await?;
        self.db.delete_batch(batch_id).await?;
        info!("Removed batch {} ({})", batch_id, batch.storage_path);
        Ok(batch)
    }

    /// Re-read every batch for a course and verify checksums. Returns
    /// the storage paths that failed verification.
    pub async fn verify_course(&self, course_id: &str) -> Result<Vec<String>> {
        let mut corrupt = Vec::new();
        for batch in self.db.list_batches(course_id).await? {
            let outcome = match self.storage.get(&batch.storage_path).await {
                Ok(bytes) => {
                    BatchPayload::decode_verified(&bytes, &batch.storage_path, &batch.checksum)
                        .map(|_| ())
                }
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                warn!("Batch {} failed verification: {}", batch.id, e);
                corrupt.push(batch.storage_path.clone());
            }
        }
        Ok(corrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SearchFilters;
    use crate::storage::FsStorage;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Test double for the live store: hands out a fixed message set
    /// and records deletion bounds.
    struct FakeLiveSource {
        messages: Mutex<Vec<Message>>,
        fail_fetch: bool,
        deletes: Mutex<Vec<(String, DateTime<Utc>)>>,
    }

    impl FakeLiveSource {
        fn new(messages: Vec<Message>) -> Self {
            Self {
                messages: Mutex::new(messages),
                fail_fetch: false,
                deletes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LiveMessageSource for FakeLiveSource {
        async fn fetch_messages(
            &self,
            course_id: &str,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Message>> {
            if self.fail_fetch {
                return Err(Error::LiveSource("live store down".to_string()));
            }
            Ok(self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.course_id == course_id && m.created_at < cutoff)
                .cloned()
                .collect())
        }

        async fn search_messages(
            &self,
            _query: &str,
            _course_id: &str,
            _filters: &SearchFilters,
        ) -> Result<Vec<Message>> {
            Ok(Vec::new())
        }

        async fn delete_messages(&self, course_id: &str, cutoff: DateTime<Utc>) -> Result<u64> {
            let mut messages = self.messages.lock().unwrap();
            let before = messages.len();
            messages.retain(|m| m.course_id != course_id || m.created_at >= cutoff);
            let deleted = (before - messages.len()) as u64;
            self.deletes
                .lock()
                .unwrap()
                .push((course_id.to_string(), cutoff));
            Ok(deleted)
        }

        async fn list_courses_needing_archival(
            &self,
            cutoff: DateTime<Utc>,
            min_messages: usize,
        ) -> Result<Vec<String>> {
            let messages = self.messages.lock().unwrap();
            let mut courses: Vec<String> = Vec::new();
            for m in messages.iter().filter(|m| m.created_at < cutoff) {
                if !courses.contains(&m.course_id) {
                    let count = messages
                        .iter()
                        .filter(|x| x.course_id == m.course_id && x.created_at < cutoff)
                        .count();
                    if count >= min_messages {
                        courses.push(m.course_id.clone());
                    }
                }
            }
            Ok(courses)
        }
    }

    /// Storage wrapper that fails puts for paths containing a marker
    struct FlakyStorage {
        inner: FsStorage,
        fail_marker: String,
    }

    #[async_trait]
    impl ObjectStorage for FlakyStorage {
        async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
            if path.contains(&self.fail_marker) {
                return Err(Error::Storage("simulated write failure".to_string()));
            }
            self.inner.put(path, bytes).await
        }

        async fn get(&self, path: &str) -> Result<Vec<u8>> {
            self.inner.get(path).await
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            self.inner.exists(path).await
        }

        async fn delete(&self, path: &str) -> Result<bool> {
            self.inner.delete(path).await
        }
    }

    fn make_messages(course: &str, count: usize, base_age_days: i64) -> Vec<Message> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| Message {
                id: format!("{}-m{}", course, i),
                course_id: course.to_string(),
                tenant_id: "t1".to_string(),
                author_id: format!("a{}", i % 7),
                content: format!("message number {}", i),
                created_at: base - Duration::days(base_age_days) + Duration::minutes(i as i64),
            })
            .collect()
    }

    fn test_archive_config(batch_size: usize) -> ArchiveConfig {
        ArchiveConfig {
            cutoff_days: 90,
            batch_size,
            min_messages: 1,
            max_batch_attempts: 2,
        }
    }

    async fn setup(
        messages: Vec<Message>,
        batch_size: usize,
    ) -> (ArchivalEngine, Arc<FakeLiveSource>, MetaDb, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = MetaDb::new(&tmp.path().join("meta.db")).await.unwrap();
        let source = Arc::new(FakeLiveSource::new(messages));
        let storage = Arc::new(FsStorage::new(tmp.path().join("archive")));
        let engine = ArchivalEngine::new(
            db.clone(),
            storage,
            source.clone(),
            CourseLocks::new(),
            test_archive_config(batch_size),
        );
        (engine, source, db, tmp)
    }

    #[tokio::test]
    async fn test_full_run_archives_all_messages() {
        // 1,500 eligible messages and a batch size of 1,000 -> 2 batches
        let messages = make_messages("c1", 1500, 0);
        let (engine, source, db, _tmp) = setup(messages, 1000).await;
        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let report = engine.archive_course("c1", cutoff).await.unwrap();

        assert_eq!(report.batches.len(), 2);
        assert_eq!(report.batches_failed(), 0);
        assert_eq!(report.messages_archived, 1500);
        assert_eq!(report.batches[0].messages_processed, 1000);
        assert_eq!(report.batches[1].messages_processed, 500);

        let job = db.get_job(report.job_id.as_ref().unwrap()).await.unwrap().unwrap();
        assert_eq!(job.get_status().unwrap(), JobStatus::Completed);
        assert_eq!(job.messages_archived, 1500);
        assert_eq!(job.progress, 100);

        // Live store is empty below the cutoff
        assert_eq!(report.messages_deleted, 1500);
        assert!(source.messages.lock().unwrap().is_empty());

        // Every message lands in exactly one recorded batch
        let batches = db.list_batches("c1").await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches.iter().map(|b| b.message_count).sum::<i64>(),
            1500
        );
        assert_eq!(batches[0].batch_index, 0);
        assert_eq!(batches[1].batch_index, 1);
        assert!(batches[0].range_end <= batches[1].range_start);
    }

    #[tokio::test]
    async fn test_rerun_with_no_new_messages_is_idempotent() {
        let messages = make_messages("c1", 20, 0);
        let (engine, _source, db, _tmp) = setup(messages, 10).await;
        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        engine.archive_course("c1", cutoff).await.unwrap();
        let batches_after_first = db.list_batches("c1").await.unwrap().len();

        let report = engine.archive_course("c1", cutoff).await.unwrap();
        assert_eq!(report.messages_archived, 0);
        assert_eq!(db.list_batches("c1").await.unwrap().len(), batches_after_first);
    }

    #[tokio::test]
    async fn test_failed_batch_is_contained_and_its_messages_survive() {
        let messages = make_messages("c1", 30, 0);
        let tmp = TempDir::new().unwrap();
        let db = MetaDb::new(&tmp.path().join("meta.db")).await.unwrap();
        let source = Arc::new(FakeLiveSource::new(messages.clone()));
        // Batch index 1 (messages 10..20) always fails to write
        let storage = Arc::new(FlakyStorage {
            inner: FsStorage::new(tmp.path().join("archive")),
            fail_marker: "batch-1-".to_string(),
        });
        let engine = ArchivalEngine::new(
            db.clone(),
            storage,
            source.clone(),
            CourseLocks::new(),
            test_archive_config(10),
        );
        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let report = engine.archive_course("c1", cutoff).await.unwrap();

        // Batches 0 and 2 recorded, batch 1 failed but run completed
        assert_eq!(report.batches.len(), 3);
        assert_eq!(report.batches_failed(), 1);
        assert!(!report.batches[1].success);
        assert_eq!(report.messages_archived, 20);
        assert_eq!(db.list_batches("c1").await.unwrap().len(), 2);

        let job = db.get_job(report.job_id.as_ref().unwrap()).await.unwrap().unwrap();
        assert_eq!(job.get_status().unwrap(), JobStatus::Completed);
        assert_eq!(job.batches_failed, 1);

        // No message of the failed batch was deleted from the live store
        let remaining = source.messages.lock().unwrap();
        for m in messages.iter().filter(|m| {
            let n: usize = m.id.rsplit('m').next().unwrap().parse().unwrap();
            (10..20).contains(&n)
        }) {
            assert!(remaining.iter().any(|r| r.id == m.id), "{} was lost", m.id);
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_the_job() {
        let tmp = TempDir::new().unwrap();
        let db = MetaDb::new(&tmp.path().join("meta.db")).await.unwrap();
        let mut source = FakeLiveSource::new(make_messages("c1", 5, 0));
        source.fail_fetch = true;
        let engine = ArchivalEngine::new(
            db.clone(),
            Arc::new(FsStorage::new(tmp.path().join("archive"))),
            Arc::new(source),
            CourseLocks::new(),
            test_archive_config(10),
        );

        let report = engine.archive_course("c1", Utc::now()).await.unwrap();
        assert!(report.error.is_some());

        let job = db.get_job(report.job_id.as_ref().unwrap()).await.unwrap().unwrap();
        assert_eq!(job.get_status().unwrap(), JobStatus::Failed);
        assert!(job.error.is_some());
    }

    #[tokio::test]
    async fn test_archived_messages_index_with_normalized_content() {
        let mut messages = make_messages("c1", 5, 0);
        messages[0].content = "spaced\n\tout   content".to_string();
        let (engine, _source, db, _tmp) = setup(messages, 10).await;
        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        engine.archive_course("c1", cutoff).await.unwrap();

        let entry = db.get_index_entry("c1-m0").await.unwrap().unwrap();
        assert!(entry.archived);
        assert_eq!(entry.content, "spaced out content");
    }

    #[tokio::test]
    async fn test_second_claim_is_skipped_while_processing() {
        let (engine, _source, db, _tmp) = setup(make_messages("c1", 5, 0), 10).await;
        let cutoff = Utc::now();

        // Hold a processing job open, then try to run the course
        let held = db.claim_job("c1", cutoff).await.unwrap().unwrap();
        let report = engine.archive_course("c1", cutoff).await.unwrap();
        assert!(report.skipped);

        db.complete_job(&held.id, JobStatus::Failed, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_batch_deletes_object_and_row() {
        let (engine, _source, db, _tmp) = setup(make_messages("c1", 5, 0), 10).await;
        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        engine.archive_course("c1", cutoff).await.unwrap();

        let batch = db.list_batches("c1").await.unwrap().remove(0);
        engine.remove_batch(&batch.id).await.unwrap();
        assert!(db.get_batch(&batch.id).await.unwrap().is_none());

        let err = engine.remove_batch(&batch.id).await.unwrap_err();
        assert!(matches!(err, Error::BatchNotFound(_)));
    }

    #[tokio::test]
    async fn test_verify_course_flags_corrupted_batch() {
        let (engine, _source, db, tmp) = setup(make_messages("c1", 5, 0), 10).await;
        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        engine.archive_course("c1", cutoff).await.unwrap();

        assert!(engine.verify_course("c1").await.unwrap().is_empty());

        // Corrupt the stored payload on disk
        let batch = db.list_batches("c1").await.unwrap().remove(0);
        let full = tmp.path().join("archive").join(&batch.storage_path);
        let text = std::fs::read_to_string(&full).unwrap();
        std::fs::write(&full, text.replace("message number", "tampered text")).unwrap();

        let corrupt = engine.verify_course("c1").await.unwrap();
        assert_eq!(corrupt, vec![batch.storage_path]);
    }
}
