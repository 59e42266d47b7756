//! coursevault CLI entry point

use clap::{Parser, Subcommand};
use coursevault::{
    archiver::ArchivalEngine,
    cache::MemoryCache,
    commands::{
        cmd_archive, cmd_init, cmd_jobs, cmd_query, cmd_reindex, cmd_remove_batch, cmd_verify,
        print_init, print_jobs, print_query_results, print_reindex_reports, print_removed_batch,
        print_run_summary, print_verify_report, QueryOptions,
    },
    config::Config,
    error::{Error, Result},
    meta::{CourseLocks, MetaDb},
    rank::LexicalScorer,
    search::SearchEngine,
    source::HttpLiveSource,
    storage::FsStorage,
};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "coursevault")]
#[command(version, about = "Chat message archival and hybrid search for course discussions", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize coursevault configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Archive aged messages out of the live store
    Archive {
        /// Only archive this course (defaults to every course that
        /// needs archival)
        #[arg(long)]
        course: Option<String>,
    },

    /// Rebuild the search index for one or more courses
    Reindex {
        /// Course IDs to reindex
        #[arg(required = true)]
        courses: Vec<String>,
    },

    /// Search live and archived messages
    Query {
        /// The search query
        query: String,

        /// Course to search in
        #[arg(long)]
        course: String,

        /// Only messages by this author
        #[arg(long)]
        author: Option<String>,

        /// Only messages created at or after this RFC 3339 timestamp
        #[arg(long)]
        from: Option<String>,

        /// Only messages created at or before this RFC 3339 timestamp
        #[arg(long)]
        to: Option<String>,
    },

    /// List recent archival jobs
    Jobs {
        /// Show the latest job and archive totals for one course
        #[arg(long)]
        course: Option<String>,

        /// Maximum number of jobs to list
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Re-read and checksum-verify a course's archive batches
    Verify {
        /// Course to verify
        course: String,
    },

    /// Remove an archive batch (object and record)
    RemoveBatch {
        /// Batch ID to remove (see 'coursevault jobs --course ...')
        batch_id: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Handle init specially (doesn't need existing config)
    if let Commands::Init { force } = &cli.command {
        let force = *force;
        let base_dir = cli.config.as_deref().and_then(|p| p.parent().map(PathBuf::from));
        let config = cmd_init(base_dir, force).await?;
        if cli.json {
            println!(
                r#"{{"status": "ok", "config": "{}"}}"#,
                config.paths.config_file.display()
            );
        } else {
            print_init(&config);
        }
        return Ok(());
    }

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    // Initialize components
    let db = MetaDb::new(&config.paths.db_file).await?;
    let storage = Arc::new(FsStorage::new(config.paths.archive_dir.clone()));
    let source = Arc::new(HttpLiveSource::new(
        &config.live_source,
        config.live_source_token(),
    )?);
    // One lock registry per process; both engines index through it
    let locks = CourseLocks::new();

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Archive { course } => {
            let engine = ArchivalEngine::new(db, storage, source, locks, config.archive.clone());
            let summary = cmd_archive(&engine, course.as_deref()).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_run_summary(&summary);
            }
        }

        Commands::Reindex { courses } => {
            let engine = search_engine(db, storage, source, locks, &config);
            let reports = cmd_reindex(&engine, &courses).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_reindex_reports(&reports);
            }
        }

        Commands::Query {
            query,
            course,
            author,
            from,
            to,
        } => {
            let options = QueryOptions {
                author_id: author,
                date_from: from.as_deref().map(parse_timestamp).transpose()?,
                date_to: to.as_deref().map(parse_timestamp).transpose()?,
            };

            let engine = search_engine(db, storage, source, locks, &config);
            let response = cmd_query(&engine, &query, &course, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_query_results(&response);
            }
        }

        Commands::Jobs { course, limit } => {
            let info = cmd_jobs(&db, course.as_deref(), limit).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_jobs(&info);
            }
        }

        Commands::Verify { course } => {
            let engine =
                ArchivalEngine::new(db.clone(), storage, source, locks, config.archive.clone());
            let report = cmd_verify(&engine, &db, &course).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_verify_report(&report);
            }
        }

        Commands::RemoveBatch { batch_id } => {
            let engine = ArchivalEngine::new(db, storage, source, locks, config.archive.clone());
            let batch = cmd_remove_batch(&engine, &batch_id).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&batch)?);
            } else {
                print_removed_batch(&batch);
            }
        }
    }

    Ok(())
}

fn search_engine(
    db: MetaDb,
    storage: Arc<FsStorage>,
    source: Arc<HttpLiveSource>,
    locks: CourseLocks,
    config: &Config,
) -> SearchEngine {
    SearchEngine::new(
        db,
        storage,
        source,
        Arc::new(MemoryCache::new()),
        Arc::new(LexicalScorer),
        locks,
        config.search.clone(),
    )
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("invalid timestamp '{}': {}", value, e)))
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);
    Config::load(&config_path)
}
