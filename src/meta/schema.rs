//! SQLite schema definition

/// SQL schema for the metadata database
pub const SCHEMA_SQL: &str = r#"
-- Archive batches: one durable object-storage file per row
CREATE TABLE IF NOT EXISTS archive_batches (
    id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    storage_path TEXT NOT NULL UNIQUE,
    message_count INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    batch_index INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    range_start TEXT NOT NULL,
    range_end TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(course_id, batch_index)
);

-- Archival jobs: one row per archival run per course
CREATE TABLE IF NOT EXISTS archival_jobs (
    id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL,
    cutoff TEXT NOT NULL,
    status TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    messages_archived INTEGER NOT NULL DEFAULT 0,
    total_bytes INTEGER NOT NULL DEFAULT 0,
    batches_failed INTEGER NOT NULL DEFAULT 0,
    error TEXT,
    started_at TEXT NOT NULL,
    completed_at TEXT
);

-- Search index: one row per indexed message, live or archived
CREATE TABLE IF NOT EXISTS search_index (
    message_id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    author_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    archived INTEGER NOT NULL DEFAULT 0,
    indexed_at TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_batches_course ON archive_batches(course_id);
CREATE INDEX IF NOT EXISTS idx_batches_range ON archive_batches(course_id, range_start, range_end);
CREATE INDEX IF NOT EXISTS idx_jobs_course ON archival_jobs(course_id);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON archival_jobs(course_id, status);
CREATE INDEX IF NOT EXISTS idx_index_course ON search_index(course_id);
CREATE INDEX IF NOT EXISTS idx_index_created ON search_index(course_id, created_at);
"#;
