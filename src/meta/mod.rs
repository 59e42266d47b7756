//! Metadata storage using SQLite
//!
//! This module handles all local metadata storage including:
//! - Archive batches (one row per durable batch file)
//! - Archival jobs (run history and progress)
//! - The search index (one row per indexed message)

mod schema;

pub use schema::*;

use crate::error::{Error, Result};
use crate::model::SearchFilters;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Format a timestamp for storage. All stored timestamps go through
/// this so lexicographic comparison in SQL matches time order.
pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time in storage format
pub fn now_ts() -> String {
    fmt_ts(Utc::now())
}

/// Normalize message content for indexing: collapse whitespace runs to
/// single spaces. Every writer of `search_index.content` goes through
/// this so the same message indexes identically regardless of which
/// engine touched it last.
pub fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Per-course async locks serializing full index rebuilds against
/// incremental index updates. Clones share state, so one instance can
/// be handed to both engines.
#[derive(Clone, Default)]
pub struct CourseLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl CourseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for one course. The caller holds the returned mutex
    /// for the duration of its index mutation.
    pub async fn acquire(&self, course_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock().await;
        locks
            .entry(course_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Archival job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(Error::Config(format!("Unknown job status: {}", s))),
        }
    }
}

/// One durable archive batch file
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ArchiveBatch {
    pub id: String,
    pub course_id: String,
    pub tenant_id: String,
    pub storage_path: String,
    pub message_count: i64,
    pub size_bytes: i64,
    pub batch_index: i64,
    pub checksum: String,
    pub range_start: String,
    pub range_end: String,
    pub created_at: String,
}

impl ArchiveBatch {
    /// Whether this batch's covered time range contains the timestamp
    pub fn covers(&self, ts: DateTime<Utc>) -> bool {
        let ts = fmt_ts(ts);
        self.range_start <= ts && ts <= self.range_end
    }
}

/// One archival run for one course
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ArchivalJob {
    pub id: String,
    pub course_id: String,
    pub cutoff: String,
    pub status: String,
    pub progress: i64,
    pub messages_archived: i64,
    pub total_bytes: i64,
    pub batches_failed: i64,
    pub error: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl ArchivalJob {
    pub fn get_status(&self) -> Result<JobStatus> {
        self.status.parse()
    }
}

/// One indexed message, live or archived
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    pub message_id: String,
    pub course_id: String,
    pub tenant_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: String,
    pub archived: bool,
    pub indexed_at: String,
}

/// Per-course search index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub live_count: usize,
    pub archived_count: usize,
    pub content_bytes: usize,
}

/// Per-course archive statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub batch_count: usize,
    pub message_count: usize,
    pub total_bytes: usize,
}

/// Maximum ids bound into one IN (...) list, comfortably under
/// SQLite's bind-parameter limit
const BIND_CHUNK: usize = 500;

/// Escape `%`, `_` and the escape character itself for a LIKE pattern
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Metadata database handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Open (and auto-initialize) the database at the given path
    pub async fn new(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };

        if !db.is_initialized().await? {
            db.init_schema().await?;
        }

        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='archive_batches'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.is_some())
    }

    // ===== Archive batch operations =====

    /// Record a fully written and verified batch. Batches are immutable
    /// after this point; there is no update path.
    pub async fn insert_batch(&self, batch: &ArchiveBatch) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO archive_batches
                (id, course_id, tenant_id, storage_path, message_count, size_bytes,
                 batch_index, checksum, range_start, range_end, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.course_id)
        .bind(&batch.tenant_id)
        .bind(&batch.storage_path)
        .bind(batch.message_count)
        .bind(batch.size_bytes)
        .bind(batch.batch_index)
        .bind(&batch.checksum)
        .bind(&batch.range_start)
        .bind(&batch.range_end)
        .bind(&batch.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get batch by ID
    pub async fn get_batch(&self, id: &str) -> Result<Option<ArchiveBatch>> {
        let batch = sqlx::query_as::<_, ArchiveBatch>("SELECT * FROM archive_batches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch)
    }

    /// List all batches for a course in batch-index order
    pub async fn list_batches(&self, course_id: &str) -> Result<Vec<ArchiveBatch>> {
        let batches = sqlx::query_as::<_, ArchiveBatch>(
            "SELECT * FROM archive_batches WHERE course_id = ? ORDER BY batch_index",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(batches)
    }

    /// Find the batch whose covered time range contains the timestamp.
    /// Newer batches win when ranges overlap after a re-archival run.
    pub async fn find_covering_batch(
        &self,
        course_id: &str,
        ts: DateTime<Utc>,
    ) -> Result<Option<ArchiveBatch>> {
        let ts = fmt_ts(ts);
        let batch = sqlx::query_as::<_, ArchiveBatch>(
            r#"
            SELECT * FROM archive_batches
            WHERE course_id = ? AND range_start <= ? AND range_end >= ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .bind(&ts)
        .bind(&ts)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    /// Next batch sequence index for a course. Strictly increasing
    /// across runs so index N always precedes N+1 in time coverage.
    pub async fn next_batch_index(&self, course_id: &str) -> Result<i64> {
        let max: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(batch_index) FROM archive_batches WHERE course_id = ?",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(max.map(|m| m + 1).unwrap_or(0))
    }

    /// Delete a batch row (restore/cleanup path; the caller deletes the
    /// stored object first)
    pub async fn delete_batch(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM archive_batches WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Aggregate archive statistics for a course
    pub async fn archive_stats(&self, course_id: &str) -> Result<ArchiveStats> {
        let row: (i64, Option<i64>, Option<i64>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), SUM(message_count), SUM(size_bytes)
            FROM archive_batches WHERE course_id = ?
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ArchiveStats {
            batch_count: row.0 as usize,
            message_count: row.1.unwrap_or(0) as usize,
            total_bytes: row.2.unwrap_or(0) as usize,
        })
    }

    // ===== Archival job operations =====

    /// Atomically claim an archival run for a course. The INSERT only
    /// lands when no other job for the course is still `processing`, so
    /// two concurrent runs cannot both claim the same course.
    pub async fn claim_job(
        &self,
        course_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<ArchivalJob>> {
        let id = Uuid::new_v4().to_string();
        let started_at = now_ts();

        let result = sqlx::query(
            r#"
            INSERT INTO archival_jobs (id, course_id, cutoff, status, started_at)
            SELECT ?, ?, ?, 'processing', ?
            WHERE NOT EXISTS (
                SELECT 1 FROM archival_jobs WHERE course_id = ? AND status = 'processing'
            )
            "#,
        )
        .bind(&id)
        .bind(course_id)
        .bind(fmt_ts(cutoff))
        .bind(&started_at)
        .bind(course_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Course {} already has a processing job", course_id);
            return Ok(None);
        }

        self.get_job(&id).await
    }

    /// Get job by ID
    pub async fn get_job(&self, id: &str) -> Result<Option<ArchivalJob>> {
        let job = sqlx::query_as::<_, ArchivalJob>("SELECT * FROM archival_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Update running totals after a batch. Progress never moves
    /// backwards even if a caller passes a smaller value.
    pub async fn update_job_progress(
        &self,
        id: &str,
        progress: i64,
        messages_archived: i64,
        total_bytes: i64,
        batches_failed: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE archival_jobs SET
                progress = MAX(progress, ?),
                messages_archived = ?,
                total_bytes = ?,
                batches_failed = ?
            WHERE id = ?
            "#,
        )
        .bind(progress)
        .bind(messages_archived)
        .bind(total_bytes)
        .bind(batches_failed)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Close a job with its terminal state
    pub async fn complete_job(
        &self,
        id: &str,
        status: JobStatus,
        error: Option<String>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE archival_jobs SET
                status = ?,
                error = ?,
                completed_at = ?,
                progress = CASE WHEN ? = 'completed' THEN 100 ELSE progress END
            WHERE id = ?
            "#,
        )
        .bind(status.to_string())
        .bind(error)
        .bind(now_ts())
        .bind(status.to_string())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Latest job for a course
    pub async fn latest_job(&self, course_id: &str) -> Result<Option<ArchivalJob>> {
        let job = sqlx::query_as::<_, ArchivalJob>(
            "SELECT * FROM archival_jobs WHERE course_id = ? ORDER BY started_at DESC LIMIT 1",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    /// List most recent jobs across courses
    pub async fn list_recent_jobs(&self, limit: usize) -> Result<Vec<ArchivalJob>> {
        let jobs = sqlx::query_as::<_, ArchivalJob>(
            "SELECT * FROM archival_jobs ORDER BY started_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    // ===== Search index operations =====

    /// Insert or update an index entry. The archived flag follows the
    /// message's current location.
    pub async fn upsert_index_entry(&self, entry: &SearchIndexEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO search_index
                (message_id, course_id, tenant_id, author_id, content, created_at, archived, indexed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(message_id) DO UPDATE SET
                content = excluded.content,
                archived = excluded.archived,
                indexed_at = excluded.indexed_at
            "#,
        )
        .bind(&entry.message_id)
        .bind(&entry.course_id)
        .bind(&entry.tenant_id)
        .bind(&entry.author_id)
        .bind(&entry.content)
        .bind(&entry.created_at)
        .bind(entry.archived)
        .bind(&entry.indexed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get index entry by message ID
    pub async fn get_index_entry(&self, message_id: &str) -> Result<Option<SearchIndexEntry>> {
        let entry =
            sqlx::query_as::<_, SearchIndexEntry>("SELECT * FROM search_index WHERE message_id = ?")
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(entry)
    }

    /// Delete all index entries for a course (start of a full rebuild)
    pub async fn delete_course_index(&self, course_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM search_index WHERE course_id = ?")
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete live (non-archived) entries whose messages no longer
    /// exist in the live store. The stale set is computed here and
    /// deleted in bounded chunks so the id list never exceeds SQLite's
    /// bind-parameter limit.
    pub async fn delete_stale_live_entries(
        &self,
        course_id: &str,
        current_ids: &[String],
    ) -> Result<u64> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT message_id FROM search_index WHERE course_id = ? AND archived = 0",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let keep: HashSet<&str> = current_ids.iter().map(String::as_str).collect();
        let stale: Vec<&str> = rows
            .iter()
            .map(|(id,)| id.as_str())
            .filter(|id| !keep.contains(id))
            .collect();

        let mut deleted = 0;
        for chunk in stale.chunks(BIND_CHUNK) {
            let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "DELETE FROM search_index WHERE course_id = ? AND archived = 0 AND message_id IN ({})",
                placeholders
            );
            let mut query_builder = sqlx::query(&sql).bind(course_id);
            for id in chunk {
                query_builder = query_builder.bind(id);
            }
            deleted += query_builder.execute(&self.pool).await?.rows_affected();
        }
        Ok(deleted)
    }

    /// Lexical text match over the course's index, newest first. Actual
    /// relevance scoring happens in the rank module; this narrows the
    /// candidate set.
    pub async fn search_index(
        &self,
        query: &str,
        course_id: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<SearchIndexEntry>> {
        // One LIKE term per query word: an entry matching only some of
        // the words is still a candidate, and the scorer decides how
        // strongly it matches.
        let patterns: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|word| format!("%{}%", escape_like(word)))
            .collect();
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let like_terms = patterns
            .iter()
            .map(|_| "lower(content) LIKE ? ESCAPE '\\'")
            .collect::<Vec<_>>()
            .join(" OR ");
        let mut sql = format!(
            "SELECT * FROM search_index WHERE course_id = ? AND ({})",
            like_terms
        );
        if filters.author_id.is_some() {
            sql.push_str(" AND author_id = ?");
        }
        if filters.date_from.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if filters.date_to.is_some() {
            sql.push_str(" AND created_at <= ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query_builder = sqlx::query_as::<_, SearchIndexEntry>(&sql).bind(course_id);
        for pattern in &patterns {
            query_builder = query_builder.bind(pattern);
        }
        if let Some(author) = &filters.author_id {
            query_builder = query_builder.bind(author);
        }
        if let Some(from) = filters.date_from {
            query_builder = query_builder.bind(fmt_ts(from));
        }
        if let Some(to) = filters.date_to {
            query_builder = query_builder.bind(fmt_ts(to));
        }
        query_builder = query_builder.bind(limit as i64);

        let entries = query_builder.fetch_all(&self.pool).await?;
        Ok(entries)
    }

    /// Per-course index statistics
    pub async fn index_stats(&self, course_id: &str) -> Result<IndexStats> {
        let row: (Option<i64>, Option<i64>, Option<i64>) = sqlx::query_as(
            r#"
            SELECT
                SUM(CASE WHEN archived = 0 THEN 1 ELSE 0 END),
                SUM(CASE WHEN archived = 1 THEN 1 ELSE 0 END),
                SUM(length(content))
            FROM search_index WHERE course_id = ?
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(IndexStats {
            live_count: row.0.unwrap_or(0) as usize,
            archived_count: row.1.unwrap_or(0) as usize,
            content_bytes: row.2.unwrap_or(0) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn setup_test_db() -> (MetaDb, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = MetaDb::new(&tmp.path().join("test.db")).await.unwrap();
        (db, tmp)
    }

    fn make_batch(course: &str, index: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> ArchiveBatch {
        ArchiveBatch {
            id: Uuid::new_v4().to_string(),
            course_id: course.to_string(),
            tenant_id: "t-1".to_string(),
            storage_path: format!("2024/01/01/{}/batch-{}.json", course, index),
            message_count: 10,
            size_bytes: 1024,
            batch_index: index,
            checksum: "abc".to_string(),
            range_start: fmt_ts(start),
            range_end: fmt_ts(end),
            created_at: now_ts(),
        }
    }

    #[tokio::test]
    async fn test_batch_insert_and_covering_lookup() {
        let (db, _tmp) = setup_test_db().await;
        let now = Utc::now();

        let batch = make_batch("c1", 0, now - Duration::days(10), now - Duration::days(5));
        db.insert_batch(&batch).await.unwrap();

        let found = db
            .find_covering_batch("c1", now - Duration::days(7))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, batch.id);

        assert!(db
            .find_covering_batch("c1", now - Duration::days(1))
            .await
            .unwrap()
            .is_none());
        assert!(db
            .find_covering_batch("c2", now - Duration::days(7))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_next_batch_index_increases() {
        let (db, _tmp) = setup_test_db().await;
        let now = Utc::now();

        assert_eq!(db.next_batch_index("c1").await.unwrap(), 0);

        let batch = make_batch("c1", 0, now - Duration::days(10), now - Duration::days(5));
        db.insert_batch(&batch).await.unwrap();
        assert_eq!(db.next_batch_index("c1").await.unwrap(), 1);
        assert_eq!(db.next_batch_index("c2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_job_claim_is_exclusive_per_course() {
        let (db, _tmp) = setup_test_db().await;
        let cutoff = Utc::now();

        let job = db.claim_job("c1", cutoff).await.unwrap();
        assert!(job.is_some());

        // Second claim for the same course is refused
        assert!(db.claim_job("c1", cutoff).await.unwrap().is_none());
        // A different course is unaffected
        assert!(db.claim_job("c2", cutoff).await.unwrap().is_some());

        let job = job.unwrap();
        db.complete_job(&job.id, JobStatus::Completed, None)
            .await
            .unwrap();

        // Terminal state releases the course
        assert!(db.claim_job("c1", cutoff).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_job_progress_is_monotonic() {
        let (db, _tmp) = setup_test_db().await;
        let job = db.claim_job("c1", Utc::now()).await.unwrap().unwrap();

        db.update_job_progress(&job.id, 60, 600, 4096, 0).await.unwrap();
        db.update_job_progress(&job.id, 40, 700, 5000, 1).await.unwrap();

        let loaded = db.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.progress, 60);
        assert_eq!(loaded.messages_archived, 700);
        assert_eq!(loaded.batches_failed, 1);
    }

    #[tokio::test]
    async fn test_completed_job_records_terminal_state() {
        let (db, _tmp) = setup_test_db().await;
        let job = db.claim_job("c1", Utc::now()).await.unwrap().unwrap();

        db.complete_job(&job.id, JobStatus::Completed, None)
            .await
            .unwrap();
        let loaded = db.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.get_status().unwrap(), JobStatus::Completed);
        assert_eq!(loaded.progress, 100);
        assert!(loaded.completed_at.is_some());
    }

    fn make_entry(id: &str, course: &str, content: &str, ts: DateTime<Utc>) -> SearchIndexEntry {
        SearchIndexEntry {
            message_id: id.to_string(),
            course_id: course.to_string(),
            tenant_id: "t-1".to_string(),
            author_id: "a-1".to_string(),
            content: content.to_string(),
            created_at: fmt_ts(ts),
            archived: false,
            indexed_at: now_ts(),
        }
    }

    #[tokio::test]
    async fn test_index_upsert_flips_archived_flag() {
        let (db, _tmp) = setup_test_db().await;
        let mut entry = make_entry("m1", "c1", "hello world", Utc::now());
        db.upsert_index_entry(&entry).await.unwrap();

        entry.archived = true;
        db.upsert_index_entry(&entry).await.unwrap();

        let loaded = db.get_index_entry("m1").await.unwrap().unwrap();
        assert!(loaded.archived);

        // Still exactly one row per message
        let stats = db.index_stats("c1").await.unwrap();
        assert_eq!(stats.live_count + stats.archived_count, 1);
    }

    #[tokio::test]
    async fn test_search_index_matching_and_filters() {
        let (db, _tmp) = setup_test_db().await;
        let now = Utc::now();

        db.upsert_index_entry(&make_entry("m1", "c1", "Rust ownership question", now))
            .await
            .unwrap();
        db.upsert_index_entry(&make_entry(
            "m2",
            "c1",
            "borrow checker help",
            now - Duration::days(1),
        ))
        .await
        .unwrap();
        db.upsert_index_entry(&make_entry("m3", "c2", "rust in another course", now))
            .await
            .unwrap();

        let hits = db
            .search_index("rust", "c1", &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message_id, "m1");

        let filters = SearchFilters {
            date_to: Some(now - Duration::hours(12)),
            ..Default::default()
        };
        let hits = db.search_index("borrow", "c1", &filters, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message_id, "m2");
    }

    #[tokio::test]
    async fn test_search_index_matches_partial_query_words() {
        let (db, _tmp) = setup_test_db().await;
        let now = Utc::now();

        db.upsert_index_entry(&make_entry("m1", "c1", "a question about lifetimes", now))
            .await
            .unwrap();
        db.upsert_index_entry(&make_entry("m2", "c1", "off topic chatter", now))
            .await
            .unwrap();

        // Neither word pair appears verbatim; matching one word is
        // enough to make the entry a candidate.
        let hits = db
            .search_index("borrow lifetime", "c1", &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message_id, "m1");
    }

    #[tokio::test]
    async fn test_search_index_escapes_like_wildcards() {
        let (db, _tmp) = setup_test_db().await;
        db.upsert_index_entry(&make_entry("m1", "c1", "discount is 100%", Utc::now()))
            .await
            .unwrap();
        db.upsert_index_entry(&make_entry("m2", "c1", "unrelated", Utc::now()))
            .await
            .unwrap();

        let hits = db
            .search_index("100%", "c1", &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message_id, "m1");
    }

    #[tokio::test]
    async fn test_delete_stale_live_entries_keeps_archived() {
        let (db, _tmp) = setup_test_db().await;
        let now = Utc::now();

        db.upsert_index_entry(&make_entry("m1", "c1", "still live", now))
            .await
            .unwrap();
        db.upsert_index_entry(&make_entry("m2", "c1", "gone from live", now))
            .await
            .unwrap();
        let mut archived = make_entry("m3", "c1", "archived copy", now);
        archived.archived = true;
        db.upsert_index_entry(&archived).await.unwrap();

        let deleted = db
            .delete_stale_live_entries("c1", &["m1".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_index_entry("m2").await.unwrap().is_none());
        assert!(db.get_index_entry("m3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_stale_live_entries_handles_large_id_sets() {
        let (db, _tmp) = setup_test_db().await;
        let now = Utc::now();

        // More stale rows than fit in a single bound id list
        let total = BIND_CHUNK * 2 + 50;
        for i in 0..total {
            db.upsert_index_entry(&make_entry(&format!("m{}", i), "c1", "bulk entry", now))
                .await
                .unwrap();
        }

        let deleted = db
            .delete_stale_live_entries("c1", &["m0".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted as usize, total - 1);
        assert!(db.get_index_entry("m0").await.unwrap().is_some());
        assert!(db.get_index_entry("m1").await.unwrap().is_none());
    }
}
