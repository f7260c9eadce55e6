//! recflow-pd (Program Director) - recommendation flows over SQLite and Redis
//!
//! Subcommands:
//! - `recommend`: evaluate a named flow for seed ids and print JSON
//! - `setup`: create the database schema, optionally with demo data
//! - `populate-index`: load a neighbor file into a Redis similarity index
//! - `serve`: expose the named flows over HTTP

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use recflow_common::config::TomlConfig;
use recflow_common::db::init::init_database;
use recflow_common::db::seed::insert_demo_data;
use recflow_core::EntityId;
use recflow_pd::config::ConfigOverrides;
use recflow_pd::flows::{Collaborators, Flows};
use recflow_pd::index::{populate_from_file, RedisSimilarityIndex};
use recflow_pd::stores::SqliteStore;
use recflow_pd::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "recflow-pd")]
#[command(about = "Recommendation flow program director")]
#[command(version)]
struct Args {
    /// Config file (overrides RECFLOW_CONFIG and the default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true, env = "RECFLOW_DATABASE")]
    database: Option<PathBuf>,

    /// Redis URL for similarity indexes
    #[arg(long, global = true, env = "RECFLOW_REDIS_URL")]
    redis_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a flow and print the resulting entities as JSON
    Recommend {
        #[arg(short, long, value_enum, default_value_t = FlowName::All)]
        flow: FlowName,

        /// Seed ids (user ids, or author ids for author-collab)
        #[arg(required = true)]
        seeds: Vec<String>,
    },

    /// Create the database schema
    Setup {
        /// Also insert the demo users, authors, songs and interactions
        #[arg(long)]
        demo_data: bool,
    },

    /// Load `<id> <n1> <n2> ...` lines into a similarity index
    PopulateIndex {
        /// Index name (keys are written as `<index>:<id>`)
        #[arg(long)]
        index: String,

        file: PathBuf,
    },

    /// Serve the flows over HTTP
    Serve {
        /// Listen address
        #[arg(long, env = "RECFLOW_BIND")]
        bind: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FlowName {
    Songs,
    Authors,
    All,
    AuthorCollab,
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(
        config
            .logging
            .level
            .parse::<Directive>()
            .with_context(|| format!("Invalid log level: {}", config.logging.level))?,
    );

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

async fn collaborators(config: &TomlConfig) -> Result<Collaborators> {
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let store = Arc::new(SqliteStore::new(pool));
    let index = Arc::new(RedisSimilarityIndex::connect(&config.redis_url).await?);

    Ok(Collaborators {
        signals: store.clone(),
        index,
        catalog: store.clone(),
        author_songs: store,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (file_config, config_path) = TomlConfig::load_or_default(args.config.as_deref())?;

    let bind = match &args.command {
        Command::Serve { bind } => bind.clone(),
        _ => None,
    };
    let config = ConfigOverrides {
        database_path: args.database,
        redis_url: args.redis_url,
        log_level: args.log_level,
        bind,
    }
    .apply(file_config);

    init_tracing(&config)?;

    info!(
        "Starting recflow program director (recflow-pd) v{}",
        env!("CARGO_PKG_VERSION")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }

    match args.command {
        Command::Recommend { flow, seeds } => {
            let flows = Flows::build(&collaborators(&config).await?, &config);
            let flow = match flow {
                FlowName::Songs => &flows.songs,
                FlowName::Authors => &flows.authors,
                FlowName::All => &flows.recommendations,
                FlowName::AuthorCollab => &flows.author_collab,
            };

            let seeds: Vec<EntityId> = seeds.iter().map(|s| EntityId::parse(s)).collect();
            let output = flow.evaluate(seeds).await?;
            info!(results = output.len(), "Flow complete");
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Setup { demo_data } => {
            let pool = init_database(&config.database_path)
                .await
                .context("Failed to initialize database")?;
            info!("Schema ready: {}", config.database_path.display());
            if demo_data {
                insert_demo_data(&pool).await?;
                info!("Demo data inserted");
            }
            pool.close().await;
        }
        Command::PopulateIndex { index, file } => {
            let redis = RedisSimilarityIndex::connect(&config.redis_url).await?;
            let written = populate_from_file(&redis, &index, &file).await?;
            info!("Wrote {} keys to {}", written, index);
        }
        Command::Serve { .. } => {
            let flows = Flows::build(&collaborators(&config).await?, &config);
            let app = build_router(AppState::new(flows));

            let listener = tokio::net::TcpListener::bind(&config.bind)
                .await
                .with_context(|| format!("Failed to bind to {}", config.bind))?;
            info!("recflow-pd listening on http://{}", config.bind);
            info!("Health check: http://{}/health", config.bind);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
            info!("Server shutdown complete");
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
