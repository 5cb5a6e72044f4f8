use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

mod assistant;
mod data_source;
mod documents;
mod error;
mod latency;
mod notify;
mod responder;
mod server;
mod session;
mod settings;

use settings::{resolve_effective_settings, SettingsLayer};

#[derive(Debug, Parser)]
#[command(name = "assistant_sessions")]
#[command(about = "Session and reply simulator for the demo assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Start {
        #[arg(long, default_value = "127.0.0.1:7171")]
        listen: String,
        /// JSON file with delay, preview and seed overrides
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        upload_delay_ms: Option<u64>,
        #[arg(long)]
        reply_delay_ms: Option<u64>,
        #[arg(long)]
        metrics_listen: Option<String>,
    },
    /// Print the data source catalog as JSON
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Start {
            listen,
            config,
            seed,
            upload_delay_ms,
            reply_delay_ms,
            metrics_listen,
        } => {
            let addr: SocketAddr = listen.parse()?;
            let file = match config {
                Some(path) => SettingsLayer::from_file(&path)?,
                None => SettingsLayer::default(),
            };
            let env = SettingsLayer::from_env()?;
            let cli_layer = SettingsLayer {
                seed,
                upload_delay_ms,
                reply_delay_ms,
                ..Default::default()
            };
            let settings = resolve_effective_settings(&file, &env, &cli_layer);
            tracing::info!(?settings, "effective settings");

            if let Some(m) = metrics_listen {
                let maddr: SocketAddr = m.parse()?;
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .with_http_listener(maddr)
                    .install()?;
            }

            let notifications = Arc::new(notify::BufferedSink::new());
            let latency = Arc::new(latency::SimulatedLatency::from_settings(&settings));
            let assistant = assistant::Assistant::new(settings, notifications.clone());
            let state = server::AppState {
                assistant: assistant::SharedAssistant::new(assistant, latency),
                notifications,
            };
            server::serve(addr, state).await?;
        }
        Commands::Catalog => {
            println!("{}", serde_json::to_string_pretty(data_source::CATALOG)?);
        }
    }
    Ok(())
}
