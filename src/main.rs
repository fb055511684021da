use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use formwizard::cache::database::{self, DatabaseStore};
use formwizard::config::{CacheDriver, Config};
use formwizard::{logging, rest};

#[derive(Parser)]
#[command(name = "formwizard")]
#[command(about = "Multi-step form wizards with resumable progress")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server hosting the configured wizards
    Serve {
        /// Port to listen on (default: 7010)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the wizard table in the configured database
    Migrate,

    /// Print the OpenAPI document as JSON
    Openapi,

    /// Write the default configuration to .formwizard/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let server_mode = matches!(cli.command, Commands::Serve { .. });
    let logging_handle = logging::init_logging(&config, server_mode, cli.debug)?;

    match cli.command {
        Commands::Serve { port } => {
            cmd_serve(&config, port).await?;
        }
        Commands::Migrate => {
            cmd_migrate(&config).await?;
        }
        Commands::Openapi => {
            println!("{}", rest::ApiDoc::json()?);
        }
        Commands::Init { force } => {
            cmd_init(&config, force)?;
        }
    }

    if let Some(log_path) = logging_handle.log_file_path {
        tracing::debug!(path = %log_path.display(), "log written");
    }

    Ok(())
}

async fn open_database(config: &Config) -> Result<sqlx::SqlitePool> {
    std::fs::create_dir_all(config.state_path()).context("Failed to create state directory")?;

    let pool = database::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    DatabaseStore::migrate(&pool, &config.wizard.table)
        .await
        .context("Failed to create wizard table")?;
    Ok(pool)
}

async fn cmd_serve(config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);

    let pool = match config.wizard.driver {
        CacheDriver::Database if config.wizard.cache => Some(open_database(config).await?),
        _ => None,
    };

    println!("Starting formwizard server...");
    println!("  Port:   {}", port);
    println!("  Driver: {:?}", config.wizard.driver);
    println!("  Wizards:");
    for wizard in &config.wizards {
        println!("    {} ({} steps)", wizard.name, wizard.steps.len());
    }
    println!("  Endpoints:");
    println!("    GET    /api/v1/health                        Health check");
    println!("    GET    /api/v1/wizards                       List wizards");
    println!("    GET    /api/v1/wizards/:name                 Wizard progress");
    println!("    GET    /api/v1/wizards/:name/steps/:slug     Step form");
    println!("    POST   /api/v1/wizards/:name/steps/:slug     Submit step");
    println!("    DELETE /api/v1/wizards/:name                 Reset progress");
    println!();

    let state = rest::ApiState::new(config.clone(), pool);
    rest::serve(state, port).await?;

    Ok(())
}

async fn cmd_migrate(config: &Config) -> Result<()> {
    let pool = open_database(config).await?;
    pool.close().await;

    println!(
        "Wizard table '{}' is ready in {}",
        config.wizard.table, config.database.url
    );
    Ok(())
}

fn cmd_init(config: &Config, force: bool) -> Result<()> {
    let path = Config::project_config_path();
    if path.exists() && !force {
        println!("Config already exists at {} (use --force to overwrite)", path.display());
        return Ok(());
    }

    let path = config.save()?;
    println!("Wrote {}", path.display());
    Ok(())
}
