use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use atlas_backend::config::ServerConfig;
use atlas_backend::db;
use atlas_backend::db::services::rbac_service::RbacService;
use atlas_backend::db::services::webhook_service::WebhookService;
use atlas_backend::web::{run_http_server, AppState};
use atlas_backend::webhooks::dispatcher::WebhookDispatcher;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an optional .env file
    #[arg(short, long)]
    env_file: Option<String>,
}

fn init_logging() {
    let file_appender = rolling::daily("logs", "atlas.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

/// Seed a first admin account so the API is reachable on a fresh database.
/// Skipped when any admin user already exists.
async fn seed_initial_admin(rbac_service: &RbacService) -> Result<(), Box<dyn std::error::Error>> {
    if !rbac_service.list_admin_users().await?.is_empty() {
        return Ok(());
    }

    let Ok(password) = std::env::var("ADMIN_INITIAL_PASSWORD") else {
        warn!("no admin users exist and ADMIN_INITIAL_PASSWORD is unset; skipping bootstrap admin");
        return Ok(());
    };

    let roles = rbac_service.list_roles().await?;
    let admin_role = roles
        .iter()
        .find(|r| r.role.name == "admin")
        .ok_or("built-in admin role missing")?;

    rbac_service
        .create_admin_user("admin", &password, &admin_role.role.id)
        .await?;
    info!("bootstrap admin account created");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path).ok();
        }
        None => {
            dotenv().ok();
        }
    }

    init_logging();

    let config = ServerConfig::from_env().map_err(|e| {
        error!("configuration error: {e}");
        e
    })?;

    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    db::init_schema(&db_pool).await?;

    let rbac_service = RbacService::new(db_pool.clone());
    rbac_service.init_permissions().await?;
    rbac_service.init_builtin_roles().await?;
    seed_initial_admin(&rbac_service).await?;

    let webhook_service =
        WebhookService::new(db_pool.clone(), config.webhook_encryption_key.clone());
    let dispatcher = WebhookDispatcher::new(webhook_service.clone())?;

    let http_addr: SocketAddr = config.listen_addr.parse()?;
    let app_state = Arc::new(AppState {
        config,
        webhook_service,
        rbac_service,
        dispatcher,
    });

    tokio::select! {
        result = run_http_server(app_state, http_addr) => {
            if let Err(e) = result {
                error!("HTTP server failed: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}
