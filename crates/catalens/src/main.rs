use anyhow::Result;
use catalens_common::{logger, AppConfig};
use catalens_store::{import_legacy, Database, ImageStore, ProductRepository};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "catalens")]
#[command(about = "Catalens - visual similarity search over a product catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,

        /// Data directory (database, images, logs)
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Copy products from a legacy catalog database
    Import {
        /// Legacy SQLite file
        #[arg(long)]
        legacy_db: PathBuf,

        /// Directory relative image paths in the legacy database resolve against
        #[arg(long)]
        legacy_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // AppConfig::from_env() also loads .env; doing it first lets CLI
    // overrides below take precedence
    load_dotenv_from_project_root();

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            db_path,
        }) => {
            if let Some(host) = &host {
                std::env::set_var("SERVER_HOST", host);
            }
            if let Some(port) = port {
                std::env::set_var("SERVER_PORT", port.to_string());
            }
            if let Some(db) = &db_path {
                std::env::set_var("DB_BASE_PATH", db);
            }

            serve(AppConfig::from_env()?).await?;
        }
        Some(Commands::Import {
            legacy_db,
            legacy_root,
        }) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging(&config.log_level)?;

            let legacy_root = match legacy_root {
                Some(root) => root,
                None => legacy_db
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(".")),
            };

            let db = Arc::new(Database::new(&config.database_path)?);
            let repository = ProductRepository::new(db, config.embedding_dim)?;
            let images = ImageStore::new(config.upload_dir.clone());

            let report = import_legacy(&legacy_db, &legacy_root, &repository, &images).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        None => {
            serve(AppConfig::from_env()?).await?;
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("Catalens starting...");
    tracing::info!("Configuration loaded:");
    tracing::info!("  Bind: {}", config.server_bind_address());
    tracing::info!("  Database: {}", config.database_path.display());
    tracing::info!("  Images: {}", config.upload_dir.display());
    tracing::info!(
        "  Embedding: {} ({} dimensions)",
        config.embedding_backend.as_str(),
        config.embedding_dim
    );

    println!("Server listening on http://{}", config.server_bind_address());

    catalens_server::start_server(config).await?;
    Ok(())
}
