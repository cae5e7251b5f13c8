use anyhow::Result;
use clap::Parser;
use facelogind::config::Config;
use facelogind::engine::spawn_engine;
use facelogind::routes::{router, AppState};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "facelogind", about = "Face login HTTP service", version)]
struct Args {
    /// Path to a TOML config file (defaults to $FACELOGIN_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    tracing::info!("facelogind starting");

    let config = Config::load(args.config.as_deref())?;
    tracing::info!(
        bind = %config.bind_addr,
        db = %config.db_path.display(),
        uploads = %config.upload_dir.display(),
        threshold = config.match_threshold,
        "configuration loaded"
    );

    let (auth, files) = facelogind::open_services(&config)?;
    let engine = spawn_engine(auth)?;
    let app = router(AppState { engine, files }, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "facelogind ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("facelogind shutting down");
    Ok(())
}
