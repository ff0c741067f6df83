//! G1 → GX quotes and orders.

use std::env;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::engine::TransactionEngine;
use crate::domain::{
    AppError, Clock, ConfigError, EntryDetails, LedgerFamily, LedgerLookup, LedgerStore, Order,
    OrderOutcome, OrderStatus, PlaceOrderRequest, Quote, QuoteCalculator, QuoteRequest,
    Recipient, SenderContext, TransferIntent, TransferOutcome, TransferPayload, TransferRequest,
    ValidationError, WalletError,
};

const ORDER_REASON: &str = "gx_order";

/// Where the G1 leg of an order is sent
#[derive(Debug, Clone)]
pub struct OrderConfig {
    pub chain_id: String,
    pub g1_token_address: String,
    pub treasury_address: String,
}

impl OrderConfig {
    /// Load from `ORDER_*` variables. The treasury address has no default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let treasury_address = env::var("ORDER_TREASURY_ADDRESS")
            .map_err(|_| ConfigError::MissingEnv("ORDER_TREASURY_ADDRESS".to_string()))?;
        Ok(Self {
            chain_id: env::var("ORDER_CHAIN_ID").unwrap_or_else(|_| "eip155:137".to_string()),
            g1_token_address: env::var("ORDER_G1_TOKEN_ADDRESS").unwrap_or_else(|_| {
                "0xe36BD65609c08Cd17b53520293523CF4560533d0".to_string()
            }),
            treasury_address,
        })
    }
}

/// Quote creation and order placement
pub struct OrderService {
    engine: Arc<TransactionEngine>,
    store: Arc<dyn LedgerStore>,
    calculator: Arc<dyn QuoteCalculator>,
    clock: Arc<dyn Clock>,
    config: OrderConfig,
}

impl OrderService {
    #[must_use]
    pub fn new(
        engine: Arc<TransactionEngine>,
        store: Arc<dyn LedgerStore>,
        calculator: Arc<dyn QuoteCalculator>,
        clock: Arc<dyn Clock>,
        config: OrderConfig,
    ) -> Self {
        Self {
            engine,
            store,
            calculator,
            clock,
            config,
        }
    }

    /// Compute and persist a new quote. Identical requests yield distinct
    /// quotes.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_quote(&self, request: QuoteRequest) -> Result<Quote, AppError> {
        request.validate()?;
        if request.g1_quantity.is_sign_negative() || request.usd_quantity.is_sign_negative() {
            return Err(AppError::Validation(ValidationError::InvalidField {
                field: "quantity".to_string(),
                message: "Quantities must not be negative".to_string(),
            }));
        }

        let amounts = self.calculator.compute(&request);
        let quote = Quote::new(
            Uuid::new_v4().to_string(),
            &request,
            amounts,
            self.clock.now(),
        );
        self.store.insert_quote(&quote).await?;

        info!(quote_id = %quote.quote_id, gx_received = %quote.gx_received, "Quote created");
        Ok(quote)
    }

    pub async fn get_quote(&self, quote_id: &str) -> Result<Option<Quote>, AppError> {
        self.store.get_quote(quote_id).await
    }

    pub async fn list_quotes_for_user(&self, user_id: &str) -> Result<Vec<Quote>, AppError> {
        self.store.list_quotes_for_user(user_id).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>, AppError> {
        self.store.get_order(order_id).await
    }

    /// Place an order against a quote and run its G1 leg.
    ///
    /// An order that is waiting on its USD leg or complete blocks placement.
    /// A `Pending` order (an earlier call stopped before recording the
    /// outcome) or a hard failure drives the G1 leg through the engine
    /// again; the ledger entry keyed by the quote id keeps that from paying
    /// twice.
    #[instrument(skip(self, request), fields(quote_id = %request.quote_id, user_id = %request.user_id))]
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<OrderOutcome, AppError> {
        request.validate()?;

        let quote = match self.store.get_quote(&request.quote_id).await? {
            Some(quote) if quote.user_id == request.user_id => quote,
            Some(_) => {
                warn!("Quote belongs to another user");
                return Ok(OrderOutcome::NoQuote);
            }
            None => return Ok(OrderOutcome::NoQuote),
        };

        let existing = self.store.get_order(&quote.quote_id).await?;
        if let Some(existing) = &existing
            && !existing.status.accepts_placement()
        {
            info!(status = %existing.status, "Order already in progress");
            return Ok(OrderOutcome::AlreadyProcessing(existing.clone()));
        }

        let mut order = match existing {
            Some(previous) if previous.status == OrderStatus::Pending => {
                info!("Resuming order left pending");
                previous
            }
            _ => {
                let order = Order::from_quote(&quote, OrderStatus::Pending, self.clock.now());
                self.store.upsert_order(&order).await?;
                order
            }
        };

        let outcome = match self.engine.process(&self.g1_intent(&quote)).await {
            Ok(outcome) => outcome,
            Err(AppError::Wallet(WalletError::ResolutionFailed(user))) => {
                warn!(user = %user, "User wallet could not be resolved");
                order.status = OrderStatus::Failure;
                self.store.upsert_order(&order).await?;
                return Ok(OrderOutcome::Failed(order));
            }
            Err(e) => {
                error!(error = %e, "G1 transfer errored");
                order.status = OrderStatus::Failure;
                if let Err(write_err) = self.store.upsert_order(&order).await {
                    warn!(error = %write_err, "Could not record order failure");
                }
                return Err(e);
            }
        };

        if !outcome.is_success() {
            info!(?outcome, "G1 transfer not completed");
            order.status = OrderStatus::FailureG1;
            self.store.upsert_order(&order).await?;
            return Ok(OrderOutcome::Failed(order));
        }

        order.transaction_hash_g1 = match outcome {
            TransferOutcome::Completed {
                transaction_hash: Some(hash),
            } => Some(hash),
            _ => self.recorded_hash(&quote.quote_id).await?,
        };
        order.status = if quote.needs_usd_leg() {
            OrderStatus::WaitingUsd
        } else {
            OrderStatus::Complete
        };
        self.store.upsert_order(&order).await?;

        info!(status = %order.status, "Order placed");
        Ok(OrderOutcome::Placed(order))
    }

    fn g1_intent(&self, quote: &Quote) -> TransferIntent {
        TransferIntent {
            family: LedgerFamily::GxOrder,
            event_id: quote.quote_id.clone(),
            subject_user_id: quote.user_id.clone(),
            counterparty_user_id: None,
            amount: quote.token_amount_g1,
            reason: Some(ORDER_REASON.to_string()),
            message: Some("G1 leg of GX order".to_string()),
            details: EntryDetails::None,
            request: TransferRequest {
                sender: SenderContext::User(quote.user_id.clone()),
                recipient: Recipient::Address(self.config.treasury_address.clone()),
                payload: TransferPayload::Token {
                    chain_id: self.config.chain_id.clone(),
                    token_address: self.config.g1_token_address.clone(),
                    amount: quote.token_amount_g1,
                },
            },
        }
    }

    async fn recorded_hash(&self, quote_id: &str) -> Result<Option<String>, AppError> {
        let entry = self
            .store
            .find_entry(
                LedgerFamily::GxOrder,
                &LedgerLookup::ByEvent {
                    event_id: quote_id.to_string(),
                },
            )
            .await?;
        Ok(entry.and_then(|e| e.transaction_hash))
    }
}
