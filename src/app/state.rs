//! Application state management.

use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    Clock, HealthResponse, HealthStatus, LedgerStore, NotificationSink, QuoteCalculator,
    UserResolver, WalletClient,
};

use super::engine::TransactionEngine;
use super::orders::{OrderConfig, OrderService};
use super::rewards::{RewardConfig, RewardService};
use super::swap::SwapService;

/// Per-service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub rewards: RewardConfig,
    pub orders: OrderConfig,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rewards: Arc<RewardService>,
    pub swaps: Arc<SwapService>,
    pub orders: Arc<OrderService>,
    pub store: Arc<dyn LedgerStore>,
    pub wallet: Arc<dyn WalletClient>,
}

impl AppState {
    /// Wire every service around one shared engine
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        wallet: Arc<dyn WalletClient>,
        resolver: Arc<dyn UserResolver>,
        notifier: Arc<dyn NotificationSink>,
        calculator: Arc<dyn QuoteCalculator>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        let engine = Arc::new(TransactionEngine::new(
            Arc::clone(&store),
            Arc::clone(&wallet),
            Arc::clone(&resolver),
            Arc::clone(&notifier),
            Arc::clone(&clock),
        ));
        let swaps = Arc::new(SwapService::new(
            Arc::clone(&engine),
            config.rewards.chain_id.clone(),
        ));
        let rewards = Arc::new(RewardService::new(
            Arc::clone(&engine),
            Arc::clone(&store),
            resolver,
            notifier,
            Arc::clone(&clock),
            config.rewards,
        ));
        let orders = Arc::new(OrderService::new(
            engine,
            Arc::clone(&store),
            calculator,
            clock,
            config.orders,
        ));
        Self {
            rewards,
            swaps,
            orders,
            store,
            wallet,
        }
    }

    /// Perform health check on all dependencies
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthResponse {
        let db_health = match self.store.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        let wallet_health = match self.wallet.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        HealthResponse::new(db_health, wallet_health)
    }
}
