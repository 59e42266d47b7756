//! Query command implementation

use crate::error::Result;
use crate::model::SearchFilters;
use crate::search::{SearchEngine, SearchResponse};
use chrono::{DateTime, Utc};
use tracing::info;

/// Options for a search query
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub author_id: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// Search live and archived messages for a course
pub async fn cmd_query(
    engine: &SearchEngine,
    query: &str,
    course_id: &str,
    options: QueryOptions,
) -> Result<SearchResponse> {
    info!("Querying course {} for '{}'", course_id, query);

    let filters = SearchFilters {
        author_id: options.author_id,
        date_from: options.date_from,
        date_to: options.date_to,
    };

    engine.query(query, course_id, &filters).await
}

/// Print query results to console
pub fn print_query_results(response: &SearchResponse) {
    println!(
        "\n🔍 {} results for '{}' in course {} ({} live, {} archived, {}ms{}{})",
        response.hits.len(),
        response.query,
        response.course_id,
        response.live_count,
        response.archived_count,
        response.took_ms,
        if response.cached { ", cached" } else { "" },
        if response.degraded { ", partial" } else { "" },
    );

    if response.degraded {
        println!("⚠ A message source was unavailable; results may be incomplete.");
    }

    for (i, hit) in response.hits.iter().enumerate() {
        let origin = if hit.archived { "archived" } else { "live" };
        println!(
            "\n{}. [{:.2}] {} — {} ({})",
            i + 1,
            hit.score,
            hit.message.author_id,
            hit.message.created_at.to_rfc3339(),
            origin
        );
        println!("   {}", hit.message.content);
    }

    if response.hits.is_empty() {
        println!("\nNo matching messages.");
    }
}
