use zen_core::config::GlobalConfig;
use zen_core::ipc::{AppState, IpcServer};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:57474";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    tracing::info!("Zen core daemon starting");

    let config = GlobalConfig::load()?;
    let listen_addr = config
        .listen_addr
        .clone()
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

    let state = AppState::new(config);
    let server = IpcServer::new(state, &listen_addr);

    if let Err(e) = server.start().await {
        tracing::error!("IPC server error: {}", e);
    }

    tracing::info!("Zen core daemon shutting down");
    Ok(())
}
