mod config;
use clap::{Parser, Subcommand};
use config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod server;
use hashserv_core::{ContentStore, StagingArea, StoreConfig};
use server::run_server;

#[derive(Parser)]
#[command(name = "hashserv")]
#[command(about = "Content-addressed file storage over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,

        /// Create the store directories, then exit
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hashserv=info,hashserv_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { config, init } => {
            tracing::info!("Starting Hashserv server with config: {}", config);

            let cfg = match Config::from_file(&config) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to load config: {}", e);
                    std::process::exit(1);
                }
            };

            if let Err(error) = ensure_local_layout(&cfg.store) {
                tracing::error!("Initialization failed: {}", error);
                std::process::exit(1);
            }

            if init {
                tracing::info!("Initialization completed (init-only mode)");
                return;
            }

            tracing::info!(
                "Bind: {}, Data: {:?}, Staging: {:?}",
                cfg.server.bind_addr,
                cfg.store.data_dir,
                cfg.store.process_dir
            );

            if let Err(e) = run_server(cfg).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn ensure_local_layout(store: &StoreConfig) -> hashserv_core::Result<()> {
    ContentStore::new(store.data_dir.clone())?;
    StagingArea::new(store.process_dir.clone())?;
    tracing::info!(
        "Ensured directories exist: {:?}, {:?}",
        store.data_dir,
        store.process_dir
    );
    Ok(())
}
