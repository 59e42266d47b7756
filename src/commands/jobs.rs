//! Jobs command implementation

use crate::error::Result;
use crate::meta::{ArchivalJob, ArchiveStats, MetaDb};
use serde::Serialize;
use tracing::info;

/// Recent archival jobs, optionally with per-course archive statistics
#[derive(Debug, Clone, Serialize)]
pub struct JobsInfo {
    pub jobs: Vec<ArchivalJob>,
    pub course_id: Option<String>,
    pub stats: Option<ArchiveStats>,
}

/// List recent archival jobs; scoped to one course when given
pub async fn cmd_jobs(db: &MetaDb, course_id: Option<&str>, limit: usize) -> Result<JobsInfo> {
    info!("Listing archival jobs");

    let (jobs, stats) = match course_id {
        Some(course_id) => {
            let job = db.latest_job(course_id).await?;
            let stats = db.archive_stats(course_id).await?;
            (job.into_iter().collect(), Some(stats))
        }
        None => (db.list_recent_jobs(limit).await?, None),
    };

    Ok(JobsInfo {
        jobs,
        course_id: course_id.map(String::from),
        stats,
    })
}

/// Print job listing to console
pub fn print_jobs(info: &JobsInfo) {
    match &info.course_id {
        Some(course_id) => println!("\n📋 Archival status for course {}\n", course_id),
        None => println!("\n📋 Recent archival jobs\n"),
    }

    if info.jobs.is_empty() {
        println!("No archival jobs recorded.");
    }

    for job in &info.jobs {
        println!("• {} [{}]", job.id, job.status);
        println!("  Course: {}", job.course_id);
        println!("  Cutoff: {}", job.cutoff);
        println!("  Progress: {}%", job.progress);
        println!(
            "  Archived: {} messages, {} bytes ({} batches failed)",
            job.messages_archived, job.total_bytes, job.batches_failed
        );
        println!("  Started: {}", job.started_at);
        if let Some(completed_at) = &job.completed_at {
            println!("  Completed: {}", completed_at);
        }
        if let Some(error) = &job.error {
            println!("  Error: {}", error);
        }
        println!();
    }

    if let Some(stats) = &info.stats {
        println!("Archive totals:");
        println!("  Batches: {}", stats.batch_count);
        println!("  Messages: {}", stats.message_count);
        println!("  Bytes: {}", stats.total_bytes);
    }
}
