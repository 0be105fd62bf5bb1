use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pb_core::eval::ResponseSink;
use pb_server::bootstrap::{self, RuntimeConfig, SinkSelection};
use pb_server::config::AppConfig;
use pb_server::dataset::DatasetClient;
use pb_server::handler::{self, AppState};
use pb_server::sessions::SessionMap;
use pb_sink::{CsvSink, SheetsSink};

#[derive(Parser)]
#[command(name = "pb", about = "pairbench human evaluation server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration file and exit.
    Validate,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Validate) => {
            run_validate(&cli.config);
        }
        None => {
            let runtime = load_runtime(&cli.config);
            init_tracing(&runtime.log_level, &runtime.log_format);

            let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Error starting runtime: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve(runtime)) {
                tracing::error!(error = %e, "server exited with error");
                std::process::exit(1);
            }
        }
    }
}

fn run_validate(path: &std::path::Path) {
    let config = match AppConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {e}");
            std::process::exit(1);
        }
    };

    match bootstrap::into_runtime(config) {
        Ok(_runtime) => {
            println!("Config valid: {}", path.display());
        }
        Err(e) => {
            eprintln!("Config invalid: {e}");
            std::process::exit(1);
        }
    }
}

fn load_runtime(path: &std::path::Path) -> RuntimeConfig {
    let config = match AppConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {e}");
            std::process::exit(1);
        }
    };

    match bootstrap::into_runtime(config) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Config invalid: {e}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn serve(runtime: RuntimeConfig) -> anyhow::Result<()> {
    let sink: Arc<dyn ResponseSink> = match runtime.sink {
        SinkSelection::LocalCsv { path } => Arc::new(CsvSink::new(path)),
        SinkSelection::Sheets {
            api_base,
            spreadsheet_id,
            sheet_name,
            credential,
        } => Arc::new(SheetsSink::new(api_base, spreadsheet_id, sheet_name, credential)),
    };

    let session_map = SessionMap::new();
    session_map.start_background_sweep(runtime.session_ttl, runtime.sweep_interval);

    let state = Arc::new(AppState {
        dataset: DatasetClient::new(runtime.dataset_api_base),
        sessions: session_map.shared(),
        sink,
        dataset_name: runtime.dataset_name,
        split: runtime.split,
        templates_query: runtime.templates_query,
        images_query: runtime.images_query,
        target_count: runtime.target_count,
    });

    let app = handler::router(state);

    let listener = tokio::net::TcpListener::bind(&runtime.listen_addr).await?;
    tracing::info!(addr = %runtime.listen_addr, "pairbench listening");
    axum::serve(listener, app).await?;
    Ok(())
}
