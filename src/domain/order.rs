//! Quote and order types for G1 → GX conversions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request for a conversion quote
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
    /// G1 tokens the user commits
    #[schema(value_type = String, example = "1000")]
    pub g1_quantity: Decimal,
    /// USD the user commits on top of G1
    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub usd_quantity: Decimal,
}

/// Amounts produced by a quote calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteAmounts {
    pub usd_from_usd_investment: Decimal,
    pub usd_from_g1_investment: Decimal,
    pub equivalent_usd_invested: Decimal,
    pub gx_usd_exchange_rate: Decimal,
    pub gx_received: Decimal,
}

/// Immutable snapshot of a conversion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub quote_id: String,
    pub user_id: String,
    #[schema(value_type = String)]
    pub token_amount_g1: Decimal,
    #[schema(value_type = String)]
    pub usd_from_usd_investment: Decimal,
    #[schema(value_type = String)]
    pub usd_from_g1_investment: Decimal,
    #[schema(value_type = String)]
    pub equivalent_usd_invested: Decimal,
    #[schema(value_type = String)]
    pub gx_usd_exchange_rate: Decimal,
    #[schema(value_type = String)]
    pub gx_received: Decimal,
    pub date: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        quote_id: String,
        request: &QuoteRequest,
        amounts: QuoteAmounts,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            quote_id,
            user_id: request.user_id.clone(),
            token_amount_g1: request.g1_quantity,
            usd_from_usd_investment: amounts.usd_from_usd_investment,
            usd_from_g1_investment: amounts.usd_from_g1_investment,
            equivalent_usd_invested: amounts.equivalent_usd_invested,
            gx_usd_exchange_rate: amounts.gx_usd_exchange_rate,
            gx_received: amounts.gx_received,
            date,
        }
    }

    /// Whether the order needs a USD leg after the G1 transfer
    pub fn needs_usd_leg(&self) -> bool {
        self.usd_from_usd_investment > Decimal::ZERO
    }
}

/// Order super-state layered over the G1 transfer lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    /// G1 leg done, USD leg settled elsewhere
    WaitingUsd,
    Complete,
    FailureG1,
    FailureUsd,
    Failure,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::WaitingUsd => "WAITING_USD",
            Self::Complete => "COMPLETE",
            Self::FailureG1 => "FAILURE_G1",
            Self::FailureUsd => "FAILURE_USD",
            Self::Failure => "FAILURE",
        }
    }

    /// Failure states after which the order may be placed again
    #[inline]
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, Self::FailureG1 | Self::FailureUsd | Self::Failure)
    }

    /// Whether placing the order again should drive its G1 leg
    #[inline]
    pub fn accepts_placement(&self) -> bool {
        matches!(self, Self::Pending) || self.is_hard_failure()
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "WAITING_USD" => Ok(Self::WaitingUsd),
            "COMPLETE" => Ok(Self::Complete),
            "FAILURE_G1" => Ok(Self::FailureG1),
            "FAILURE_USD" => Ok(Self::FailureUsd),
            "FAILURE" => Ok(Self::Failure),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Funded order referencing a quote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Same as the quote id
    pub order_id: String,
    pub user_id: String,
    #[schema(value_type = String)]
    pub token_amount_g1: Decimal,
    #[schema(value_type = String)]
    pub usd_from_usd_investment: Decimal,
    #[schema(value_type = String)]
    pub gx_received: Decimal,
    pub status: OrderStatus,
    pub transaction_hash_g1: Option<String>,
    pub date: DateTime<Utc>,
}

impl Order {
    pub fn from_quote(quote: &Quote, status: OrderStatus, date: DateTime<Utc>) -> Self {
        Self {
            order_id: quote.quote_id.clone(),
            user_id: quote.user_id.clone(),
            token_amount_g1: quote.token_amount_g1,
            usd_from_usd_investment: quote.usd_from_usd_investment,
            gx_received: quote.gx_received,
            status,
            transaction_hash_g1: None,
            date,
        }
    }
}

/// Request to fund an order against a quote
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "Quote id is required"))]
    pub quote_id: String,
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
}

/// Result of placing an order
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    /// No quote exists for the id
    NoQuote,
    /// An order for this quote is in flight or done
    AlreadyProcessing(Order),
    /// The G1 leg did not complete
    Failed(Order),
    Placed(Order),
}

impl OrderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Placed(_))
    }

    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::NoQuote => None,
            Self::AlreadyProcessing(order) | Self::Failed(order) | Self::Placed(order) => {
                Some(order)
            }
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NoQuote => "No quote available for this ID",
            Self::AlreadyProcessing(_) => "This order is already being processed",
            Self::Failed(_) => "G1 transfer failed",
            Self::Placed(_) => "Order placed",
        }
    }
}

/// Response body for order placement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub message: String,
    pub order: Option<Order>,
}

impl From<OrderOutcome> for PlaceOrderResponse {
    fn from(outcome: OrderOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            message: outcome.message().to_string(),
            order: outcome.order().cloned(),
        }
    }
}
