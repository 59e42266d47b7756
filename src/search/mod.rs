//! Search engine
//!
//! Answers a text query against both live and archived messages as a
//! single ranked result set, and maintains the search index that makes
//! archived content searchable without reading every batch per query.
//!
//! Availability beats completeness at query time: an unavailable source
//! degrades the response to the other branch, and a batch that fails
//! checksum verification has its hits excluded rather than failing the
//! whole query.

use crate::batch::BatchPayload;
use crate::cache::Cache;
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::meta::{fmt_ts, normalize_content, now_ts, CourseLocks, MetaDb, SearchIndexEntry};
use crate::model::{Message, SearchFilters};
use crate::rank::{Ranker, Scorer, SearchHit};
use crate::source::LiveMessageSource;
use crate::storage::ObjectStorage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How many index candidates to pull per query, relative to the
/// configured result cap, before ranking narrows them down.
const CANDIDATE_FACTOR: usize = 4;

/// Combined, ranked query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub course_id: String,
    pub filters: SearchFilters,
    pub hits: Vec<SearchHit>,
    pub live_count: usize,
    pub archived_count: usize,
    /// True when at least one source was unavailable and the result set
    /// is partial (or empty, when both failed)
    pub degraded: bool,
    pub took_ms: u64,
    pub cached: bool,
}

/// Outcome of a full index rebuild for one course
#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    pub course_id: String,
    pub live_indexed: usize,
    pub archived_indexed: usize,
    pub batches_skipped: usize,
    pub content_bytes: usize,
}

struct IndexCandidates {
    /// Messages resolved from archive batches
    archived: Vec<Message>,
    /// Non-archived index entries still holding full content
    live: Vec<Message>,
}

/// The search engine. Shares the metadata database and archive store
/// with the archival engine but never writes to the archive store.
pub struct SearchEngine {
    db: MetaDb,
    storage: Arc<dyn ObjectStorage>,
    source: Arc<dyn LiveMessageSource>,
    cache: Arc<dyn Cache>,
    scorer: Arc<dyn Scorer>,
    config: SearchConfig,
    /// Coarse per-course locks serializing a rebuild against
    /// incremental index updates (shared with the archival engine)
    locks: CourseLocks,
}

impl SearchEngine {
    pub fn new(
        db: MetaDb,
        storage: Arc<dyn ObjectStorage>,
        source: Arc<dyn LiveMessageSource>,
        cache: Arc<dyn Cache>,
        scorer: Arc<dyn Scorer>,
        locks: CourseLocks,
        config: SearchConfig,
    ) -> Self {
        Self {
            db,
            storage,
            source,
            cache,
            scorer,
            config,
            locks,
        }
    }

    // ===== Index maintenance =====

    /// Full index rebuild for a course: drop its entries, re-index the
    /// live store, then re-index every checksum-verified archive batch.
    pub async fn rebuild_index(&self, course_id: &str) -> Result<RebuildReport> {
        let lock = self.locks.acquire(course_id).await;
        let _guard = lock.lock().await;

        info!("Rebuilding search index for course {}", course_id);
        let deleted = self.db.delete_course_index(course_id).await?;
        debug!("Dropped {} existing index entries", deleted);

        // Live store first; a cutoff of "now" covers every message.
        let live_messages = self.source.fetch_messages(course_id, Utc::now()).await?;
        let live_indexed = live_messages.len();
        for message in &live_messages {
            self.upsert_message(message, false).await?;
        }

        // Archived content comes only from batches that verify. An
        // unverifiable batch is never indexed.
        let mut archived_indexed = 0;
        let mut batches_skipped = 0;
        for batch in self.db.list_batches(course_id).await? {
            let payload = match self.read_verified_batch(&batch.storage_path, &batch.checksum).await
            {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        "Skipping batch {} during rebuild: {}",
                        batch.storage_path, e
                    );
                    batches_skipped += 1;
                    continue;
                }
            };
            for message in &payload.messages {
                self.upsert_message(message, true).await?;
                archived_indexed += 1;
            }
        }

        let stats = self.db.index_stats(course_id).await?;
        info!(
            "Course {}: indexed {} live and {} archived messages ({} batches skipped)",
            course_id, live_indexed, archived_indexed, batches_skipped
        );

        Ok(RebuildReport {
            course_id: course_id.to_string(),
            live_indexed,
            archived_indexed,
            batches_skipped,
            content_bytes: stats.content_bytes,
        })
    }

    /// Incrementally index a single message (called on message
    /// creation, or by the archiver when a message moves). Takes the
    /// same per-course lock a rebuild holds.
    pub async fn index_message(&self, message: &Message, archived: bool) -> Result<()> {
        let lock = self.locks.acquire(&message.course_id).await;
        let _guard = lock.lock().await;
        self.upsert_message(message, archived).await
    }

    /// Drop live index entries whose messages no longer exist
    pub async fn prune_live_entries(
        &self,
        course_id: &str,
        current_ids: &[String],
    ) -> Result<u64> {
        let lock = self.locks.acquire(course_id).await;
        let _guard = lock.lock().await;
        self.db.delete_stale_live_entries(course_id, current_ids).await
    }

    async fn upsert_message(&self, message: &Message, archived: bool) -> Result<()> {
        self.db
            .upsert_index_entry(&SearchIndexEntry {
                message_id: message.id.clone(),
                course_id: message.course_id.clone(),
                tenant_id: message.tenant_id.clone(),
                author_id: message.author_id.clone(),
                content: normalize_content(&message.content),
                created_at: fmt_ts(message.created_at),
                archived,
                indexed_at: now_ts(),
            })
            .await
    }

    // ===== Query path =====

    /// Answer a query against both sources as one ranked result set
    pub async fn query(
        &self,
        query: &str,
        course_id: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResponse> {
        let query = query.trim();
        self.validate_query(query)?;

        let cache_key = format!(
            "search:{}:{}:{}",
            course_id,
            query.to_lowercase(),
            filters.cache_key_part()
        );
        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok(mut response) = serde_json::from_str::<SearchResponse>(&cached) {
                debug!("Cache hit for query '{}'", query);
                response.cached = true;
                return Ok(response);
            }
        }

        let started = Instant::now();

        // Both branches run concurrently; each failure degrades the
        // response instead of surfacing to the caller.
        let (live_result, index_result) = tokio::join!(
            self.source.search_messages(query, course_id, filters),
            self.search_index(query, course_id, filters),
        );

        let mut degraded = false;
        let live = match live_result {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Live search unavailable for course {}: {}", course_id, e);
                degraded = true;
                Vec::new()
            }
        };
        let candidates = match index_result {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Index search unavailable for course {}: {}", course_id, e);
                degraded = true;
                IndexCandidates {
                    archived: Vec::new(),
                    live: Vec::new(),
                }
            }
        };

        let mut live_messages = live;
        live_messages.extend(candidates.live);

        let ranker = Ranker::new(self.scorer.as_ref());
        let mut hits = ranker.merge_and_rank(query, live_messages, candidates.archived);
        hits.truncate(self.config.max_results);

        let live_count = hits.iter().filter(|h| !h.archived).count();
        let archived_count = hits.len() - live_count;

        let response = SearchResponse {
            query: query.to_string(),
            course_id: course_id.to_string(),
            filters: filters.clone(),
            hits,
            live_count,
            archived_count,
            degraded,
            took_ms: started.elapsed().as_millis() as u64,
            cached: false,
        };

        if let Ok(serialized) = serde_json::to_string(&response) {
            self.cache
                .put(
                    &cache_key,
                    serialized,
                    Duration::from_secs(self.config.cache_ttl_secs),
                )
                .await;
        }

        info!(
            "Query '{}' on course {}: {} hits ({} live, {} archived){}",
            query,
            course_id,
            response.hits.len(),
            response.live_count,
            response.archived_count,
            if response.degraded { ", degraded" } else { "" }
        );
        Ok(response)
    }

    /// Reject malformed queries before touching storage
    fn validate_query(&self, query: &str) -> Result<()> {
        let len = query.chars().count();
        if len < self.config.min_query_len {
            return Err(Error::Validation(format!(
                "query must be at least {} characters",
                self.config.min_query_len
            )));
        }
        if len > self.config.max_query_len {
            return Err(Error::Validation(format!(
                "query must be at most {} characters",
                self.config.max_query_len
            )));
        }
        Ok(())
    }

    /// Run the index text match and resolve archived hits back to full
    /// message payloads. Hits from a batch that fails verification are
    /// excluded; everything else still comes back.
    async fn search_index(
        &self,
        query: &str,
        course_id: &str,
        filters: &SearchFilters,
    ) -> Result<IndexCandidates> {
        let entries = self
            .db
            .search_index(
                query,
                course_id,
                filters,
                self.config.max_results * CANDIDATE_FACTOR,
            )
            .await?;

        let mut candidates = IndexCandidates {
            archived: Vec::new(),
            live: Vec::new(),
        };
        // Per-query batch cache: one read + verify per covering batch,
        // however many hits it holds. None marks a batch already found
        // unusable this query.
        let mut batches: HashMap<String, Option<BatchPayload>> = HashMap::new();

        for entry in entries {
            if !entry.archived {
                candidates.live.push(entry_to_message(&entry));
                continue;
            }

            let Ok(created_at) = DateTime::parse_from_rfc3339(&entry.created_at) else {
                warn!("Index entry {} has a bad timestamp", entry.message_id);
                continue;
            };
            let created_at = created_at.with_timezone(&Utc);

            let Some(batch) = self.db.find_covering_batch(course_id, created_at).await? else {
                warn!(
                    "No covering batch for archived message {}",
                    entry.message_id
                );
                continue;
            };

            let payload = match batches.entry(batch.id.clone()) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    let loaded = match self
                        .read_verified_batch(&batch.storage_path, &batch.checksum)
                        .await
                    {
                        Ok(payload) => Some(payload),
                        Err(err) => {
                            warn!(
                                "Excluding batch {} from results: {}",
                                batch.storage_path, err
                            );
                            None
                        }
                    };
                    e.insert(loaded)
                }
            };

            if let Some(payload) = payload {
                if let Some(message) =
                    payload.messages.iter().find(|m| m.id == entry.message_id)
                {
                    candidates.archived.push(message.clone());
                }
            }
        }

        Ok(candidates)
    }

    async fn read_verified_batch(&self, path: &str, checksum: &str) -> Result<BatchPayload> {
        let bytes = self.storage.get(path).await?;
        BatchPayload::decode_verified(&bytes, path, checksum)
    }
}

fn entry_to_message(entry: &SearchIndexEntry) -> Message {
    Message {
        id: entry.message_id.clone(),
        course_id: entry.course_id.clone(),
        tenant_id: entry.tenant_id.clone(),
        author_id: entry.author_id.clone(),
        content: entry.content.clone(),
        created_at: DateTime::parse_from_rfc3339(&entry.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}
