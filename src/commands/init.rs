//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use std::path::PathBuf;
use tracing::info;

/// Initialize coursevault configuration, archive directory, and database
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let config = Config::load_from(base_dir)?;

    if config.paths.config_file.exists() && !force {
        return Err(Error::AlreadyInitialized(
            config.paths.config_file.display().to_string(),
        ));
    }

    config.validate()?;
    config.save()?;
    info!("Created config at {:?}", config.paths.config_file);

    tokio::fs::create_dir_all(&config.paths.archive_dir).await?;

    // Opening the database creates the schema
    MetaDb::new(&config.paths.db_file).await?;
    info!("Created database at {:?}", config.paths.db_file);

    Ok(config)
}

/// Print init result to console
pub fn print_init(config: &Config) {
    println!("✓ coursevault initialized at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Database: {:?}", config.paths.db_file);
    println!("Archive directory: {:?}", config.paths.archive_dir);
    println!("\nNext steps:");
    println!("  1. Edit the config file to point at your live message API");
    println!(
        "  2. Export the API token: export {}=...",
        config.live_source.api_token_env
    );
    println!("  3. Schedule 'coursevault archive' (e.g. nightly via cron)");
}
