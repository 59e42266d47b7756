//! Archive command implementation

use crate::archiver::{ArchivalEngine, CourseReport, RunSummary};
use crate::error::Result;
use tracing::info;

/// Run archival, either across every course that needs it or for one
/// explicitly named course
pub async fn cmd_archive(engine: &ArchivalEngine, course_id: Option<&str>) -> Result<RunSummary> {
    match course_id {
        Some(course_id) => {
            info!("Archiving course {}", course_id);
            let cutoff = engine.cutoff();
            let report = engine.archive_course(course_id, cutoff).await?;
            Ok(RunSummary {
                cutoff,
                courses: vec![report],
            })
        }
        None => engine.run().await,
    }
}

/// Print an archival run summary to console
pub fn print_run_summary(summary: &RunSummary) {
    println!("\n✓ Archival run complete (cutoff {})", summary.cutoff);

    if summary.courses.is_empty() {
        println!("No courses needed archival.");
        return;
    }

    for report in &summary.courses {
        print_course_report(report);
    }
}

fn print_course_report(report: &CourseReport) {
    if report.skipped {
        println!("• {} — skipped (job already running)", report.course_id);
        return;
    }

    println!("• {}", report.course_id);
    if let Some(job_id) = &report.job_id {
        println!("  Job: {}", job_id);
    }
    println!("  Messages archived: {}", report.messages_archived);
    println!("  Batches: {} ({} failed)", report.batches.len(), report.batches_failed());
    println!("  Bytes written: {}", report.total_bytes);
    println!("  Live messages deleted: {}", report.messages_deleted);
    if let Some(error) = &report.error {
        println!("  Error: {}", error);
    }
}
