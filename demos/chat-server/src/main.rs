use roomchat::prelude::*;
use tracing_subscriber::EnvFilter;

/// Usage: `chat-server [config.json]`
///
/// Without an argument the server listens on 127.0.0.1:12000 and stores
/// resources under `./res`. Set `RUST_LOG` to change verbosity.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            let config: ServerConfig = serde_json::from_str(&text)?;
            tracing::info!(%path, "loaded config");
            config
        }
        None => ServerConfig::default(),
    };

    let server = ChatServerBuilder::from_config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "starting chat server");
    server.run().await?;
    Ok(())
}
