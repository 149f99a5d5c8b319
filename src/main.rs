//! MacroLog
//!
//! An MCP server for calorie and macro logging.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};

use macrolog::build_info;
use macrolog::config::Config;
use macrolog::db::{migrations, Database};
use macrolog::mcp::MacroLogService;
use macrolog::tools::foods::FoodSources;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // Logs go to stderr; stdout carries the MCP stream
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let db_path = config.database_path.clone();
    eprintln!("Database path: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = Database::new(&db_path)?;

    database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        let version = migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let sources = FoodSources::from_config(&config.sources)?;
    tracing::info!(
        "Food sources: {}",
        sources
            .kinds()
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let service = MacroLogService::new(db_path, database, sources);

    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
