//! Default values for configuration

/// Default live message source base URL
pub fn default_live_source_url() -> String {
    std::env::var("COURSEVAULT_LIVE_SOURCE_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
}

/// Default environment variable name for the live source API token
pub fn default_live_source_token_env() -> String {
    "COURSEVAULT_API_TOKEN".to_string()
}

/// Default timeout for bulk message fetches (seconds). Archival pulls
/// can carry large payloads, so this is deliberately long.
pub fn default_fetch_timeout() -> u64 {
    120
}

/// Default timeout for query-time calls to the live source (seconds)
pub fn default_search_timeout() -> u64 {
    15
}

/// Default message age threshold for archival (days)
pub fn default_cutoff_days() -> i64 {
    90
}

/// Default number of messages per archive batch
pub fn default_batch_size() -> usize {
    1000
}

/// Default minimum eligible messages before a course is archived
pub fn default_min_messages() -> usize {
    10
}

/// Default write attempts per batch before it is counted as failed
pub fn default_max_batch_attempts() -> u32 {
    3
}

/// Default minimum query length (characters)
pub fn default_min_query_len() -> usize {
    3
}

/// Default maximum query length (characters)
pub fn default_max_query_len() -> usize {
    200
}

/// Default maximum combined result count
pub fn default_max_results() -> usize {
    50
}

/// Default TTL for cached query responses (seconds)
pub fn default_cache_ttl() -> u64 {
    300
}
