use std::sync::Arc;

use bitcaskd::config::ServerConfig;
use bitcaskd::net::Server;
use bitcaskd::storage::bitcask::Config;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "server")]
struct Args {
    /// Settings file (TOML), overridable by BITCASKD_* environment variables.
    #[arg(long, default_value = "bitcaskd")]
    config: String,

    /// Port to listen on. Overrides the settings file.
    #[arg(long)]
    port: Option<u16>,

    /// Database directory. Overrides the settings file.
    #[arg(long)]
    db: Option<String>,

    /// Run a merge before accepting any connections.
    #[arg(long, default_value_t = false)]
    merge_on_start: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let settings = ServerConfig::load(&args.config)?;
    let port = args.port.unwrap_or(settings.port);
    let db_path = args.db.unwrap_or(settings.db);
    let merge_on_start = args.merge_on_start || settings.merge_on_start;

    let db = Config::default().open(&db_path)?;
    if merge_on_start {
        db.merge()?;
    }
    let db = Arc::new(db);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, db = %db_path, "starting server");

    let server = Server::new(listener, db, signal::ctrl_c());
    server.run().await;

    Ok(())
}
