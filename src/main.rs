//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the server and utility functions, handling the
//! shared concerns: environment loading, structured logging, and the tokio
//! runtime.
//!
//! ## Subcommands
//!
//! - `serve`: start the HTTP API server.
//! - `hash-password`: hash a password for seeding accounts by hand.
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection string.
//! - `SESSION_SECRET`: HMAC key for session tokens (env only).
//! - `LOG_FORMAT=json`: switch logs to JSON for container platforms.

use anyhow::Result;
use clap::{Parser, Subcommand};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use welcomehome::{auth, server};

#[derive(Parser)]
#[command(name = "welcomehome", about = "Donation tracking platform for charity warehouses")]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Hash a password for manual account seeding
    HashPassword {
        /// The plaintext password to hash
        password: String,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for K8s, human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port } => {
            let database_url = cli.database_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("DATABASE_URL is required (set via --database-url or env)")
            })?;
            let secret = auth::session_secret();
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(server::run(*port, database_url, &secret))
        }
        Commands::HashPassword { password } => {
            let hashed = auth::hash_password(password)?;
            println!("{}", hashed);
            Ok(())
        }
    }
}
