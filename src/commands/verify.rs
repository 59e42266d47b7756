//! Verify and batch-removal command implementations

use crate::archiver::ArchivalEngine;
use crate::error::Result;
use crate::meta::{ArchiveBatch, MetaDb};
use serde::Serialize;
use tracing::info;

/// Outcome of a verification pass over one course's batches
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub course_id: String,
    pub batches_checked: usize,
    pub corrupt_paths: Vec<String>,
}

/// Re-read and checksum-verify every archive batch for a course
pub async fn cmd_verify(
    engine: &ArchivalEngine,
    db: &MetaDb,
    course_id: &str,
) -> Result<VerifyReport> {
    info!("Verifying archive batches for course {}", course_id);

    let batches_checked = db.list_batches(course_id).await?.len();
    let corrupt_paths = engine.verify_course(course_id).await?;

    Ok(VerifyReport {
        course_id: course_id.to_string(),
        batches_checked,
        corrupt_paths,
    })
}

/// Remove one archive batch (object and record) by id
pub async fn cmd_remove_batch(engine: &ArchivalEngine, batch_id: &str) -> Result<ArchiveBatch> {
    info!("Removing archive batch {}", batch_id);
    engine.remove_batch(batch_id).await
}

/// Print a verification report to console
pub fn print_verify_report(report: &VerifyReport) {
    println!(
        "\n✓ Verified {} batches for course {}",
        report.batches_checked, report.course_id
    );

    if report.corrupt_paths.is_empty() {
        println!("All batches passed checksum verification.");
    } else {
        println!(
            "⚠ {} batches failed verification:",
            report.corrupt_paths.len()
        );
        for path in &report.corrupt_paths {
            println!("  {}", path);
        }
    }
}

/// Print batch-removal confirmation to console
pub fn print_removed_batch(batch: &ArchiveBatch) {
    println!("✓ Removed batch {} from course {}", batch.id, batch.course_id);
    println!("  Path: {}", batch.storage_path);
    println!(
        "  Covered: {} messages from {} to {}",
        batch.message_count, batch.range_start, batch.range_end
    );
}
