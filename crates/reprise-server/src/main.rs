use anyhow::Context;
use clap::Parser;
use reprise_server::admin_api::{AdminApiServer, AdminState};
use reprise_server::config::Config;
use reprise_server::logging;
use reprise_server::repository::RecordingRepository;
use reprise_server::status::ServerStatus;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "reprise-server")]
#[command(author, version, about = "Recording editor and replay simulator")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "REPRISE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the admin API listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("load configuration {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.admin.listen = listen;
    }

    logging::init(&config, args.log_level.as_deref())?;

    let repository = match &config.recordings.snapshot_path {
        Some(path) => RecordingRepository::with_snapshot(path)
            .with_context(|| format!("load recordings from {}", path.display()))?,
        None => RecordingRepository::new(),
    };
    info!("Loaded {} recordings", repository.len());

    let status = ServerStatus::new(config.status.mode, config.status.statistics_interval_secs);
    let state = AdminState::new(Arc::new(repository), Arc::new(status), args.config.clone());

    let server = AdminApiServer::bind(config.admin.listen, Arc::new(state)).await?;
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
