use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use colorburst::{
    ChatRepl, Commands, Container, ContainerConfig, ConversationSession, FileKeyValueStore,
    HttpRelayClient, Router,
};

#[derive(Parser)]
#[command(name = "colorburst")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Where the chat client keeps its preferences
    #[arg(short, long, global = true, default_value = "~/.colorburst")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            public,
            mock_upstream,
        } => {
            let container = Arc::new(Container::new(ContainerConfig::from_env(mock_upstream)));
            info!(
                "Upstream: {} ({})",
                container.provider_name(),
                if container.mock_upstream() { "echo" } else { container.base_url() }
            );

            let host = Commands::bind_host(&host, public);
            let listener = TcpListener::bind((host, port)).await?;

            let shutdown = CancellationToken::new();
            {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Shutting down");
                        shutdown.cancel();
                    }
                });
            }

            Router::new(container).serve(listener, shutdown).await?;
        }

        Commands::Chat { server } => {
            let data_dir = PathBuf::from(expand_tilde(&cli.data_dir));
            let store = Arc::new(FileKeyValueStore::new(data_dir));
            let relay = Arc::new(HttpRelayClient::new(server));

            let session = ConversationSession::load(store, relay).await;
            ChatRepl::new(session).run().await?;
        }
    }

    Ok(())
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
