//! Application entry point.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use reward_relayer::api::create_router;
use reward_relayer::app::{AppState, OrderConfig, RewardConfig, ServiceConfig};
use reward_relayer::domain::NotificationSink;
use reward_relayer::infra::{
    DisabledNotificationSink, FixedRateQuoteCalculator, HttpWalletClient, PostgresClient,
    PostgresConfig, SystemClock, WalletApiConfig, WebhookNotificationSink,
};

/// Application configuration
struct Config {
    database_url: String,
    host: String,
    port: u16,
    wallet: WalletApiConfig,
    rewards: RewardConfig,
    orders: OrderConfig,
    quotes: FixedRateQuoteCalculator,
    /// Notification webhook (optional, notifications are dropped if unset)
    notification_webhook_url: Option<String>,
    notification_timeout: Duration,
    json_logs: bool,
}

impl Config {
    fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let wallet = WalletApiConfig::from_env().context("Invalid wallet service configuration")?;
        let orders = OrderConfig::from_env().context("Invalid order configuration")?;
        let quotes = FixedRateQuoteCalculator::from_env().context("Invalid quote rates")?;

        let notification_webhook_url = env::var("NOTIFICATION_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.is_empty());
        let notification_timeout = env::var("NOTIFICATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let json_logs = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            host,
            port,
            wallet,
            rewards: RewardConfig::from_env(),
            orders,
            quotes,
            notification_webhook_url,
            notification_timeout,
            json_logs,
        })
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    info!("🏗️  Reward Relayer v{}", env!("CARGO_PKG_VERSION"));
    info!("📦 Initializing infrastructure...");

    let postgres_client = PostgresClient::new(&config.database_url, PostgresConfig::default()).await?;
    postgres_client.run_migrations().await?;
    info!("   ✓ Database connected and migrations applied");

    // One client serves both transfers and user resolution
    let wallet_client = Arc::new(HttpWalletClient::new(config.wallet)?);
    info!("   ✓ Wallet service client created");

    let notifier: Arc<dyn NotificationSink> = match &config.notification_webhook_url {
        Some(url) => {
            info!("   ✓ Notification webhook configured");
            Arc::new(WebhookNotificationSink::new(
                url.clone(),
                config.notification_timeout,
            )?)
        }
        None => {
            info!("   ○ Notification webhook not configured (notifications disabled)");
            Arc::new(DisabledNotificationSink)
        }
    };

    let app_state = Arc::new(AppState::new(
        Arc::new(postgres_client),
        Arc::clone(&wallet_client) as _,
        wallet_client,
        notifier,
        Arc::new(config.quotes),
        Arc::new(SystemClock),
        ServiceConfig {
            rewards: config.rewards,
            orders: config.orders,
        },
    ));

    let router = create_router(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🚀 Server starting on http://{}", addr);
    info!("📖 Swagger UI available at http://{}/swagger-ui", addr);
    info!("📄 OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
