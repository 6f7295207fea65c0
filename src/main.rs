use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use learnpath::api::{self, SecurityConfig};
use learnpath::config::ServerConfig;
use learnpath::db;

#[derive(Parser)]
#[command(name = "learnpath")]
#[command(about = "Course progress tracking and content unlocking service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (overrides config and LEARNPATH_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database file (overrides config and LEARNPATH_DATABASE)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
    /// Apply pending database migrations and exit
    Migrate {
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "learnpath=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<db::Database> {
    let db = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let db = open_database(config.database_path.clone())?;
    let app = api::create_router_with_security(db, SecurityConfig::from_config(&config));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    tracing::info!("learnpath listening on http://127.0.0.1:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = ServerConfig::load();

    match cli.command {
        Some(Commands::Serve { port, database }) => {
            if let Some(port) = port {
                config.port = port;
            }
            if database.is_some() {
                config.database_path = database;
            }
            serve(config).await?;
        }
        Some(Commands::Migrate { database }) => {
            open_database(database.or(config.database_path))?;
            tracing::info!("Database is up to date");
        }
        None => serve(config).await?,
    }

    Ok(())
}
