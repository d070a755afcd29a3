use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use consign_core::adapters::{PostgresMarketStore, PostgresNotificationSink};
use consign_core::cli::{Cli, Commands, DbCommands};
use consign_core::config::{Config, LogFormat};
use consign_core::{cors_layer, create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Db(DbCommands::Migrate)) => {
            consign_core::cli::handle_db_migrate(&config).await
        }
        Some(Commands::Config) => consign_core::cli::handle_config_validate(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(fmt_layer)
        .init();
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    db::run_migrations(&pool).await?;

    let store = Arc::new(PostgresMarketStore::new(pool.clone()));
    let notifier = Arc::new(PostgresNotificationSink::new(pool));
    let app_state = AppState::new(store, notifier);

    let app = create_app(app_state).layer(cors_layer(&config.cors_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!(env = ?config.app_env, "listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
