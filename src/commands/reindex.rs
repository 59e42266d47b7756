//! Reindex command implementation

use crate::error::Result;
use crate::search::{RebuildReport, SearchEngine};
use tracing::info;

/// Rebuild the search index for the given courses
pub async fn cmd_reindex(engine: &SearchEngine, course_ids: &[String]) -> Result<Vec<RebuildReport>> {
    let mut reports = Vec::with_capacity(course_ids.len());
    for course_id in course_ids {
        info!("Reindexing course {}", course_id);
        reports.push(engine.rebuild_index(course_id).await?);
    }
    Ok(reports)
}

/// Print reindex reports to console
pub fn print_reindex_reports(reports: &[RebuildReport]) {
    println!("\n✓ Reindex complete");
    for report in reports {
        println!("• {}", report.course_id);
        println!("  Live messages indexed: {}", report.live_indexed);
        println!("  Archived messages indexed: {}", report.archived_indexed);
        if report.batches_skipped > 0 {
            println!(
                "  ⚠ Batches skipped (failed verification): {}",
                report.batches_skipped
            );
        }
        println!("  Indexed content: {} bytes", report.content_bytes);
    }
}
