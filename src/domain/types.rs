//! Domain types for ledger entries, transfers and inbound events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Class of ledger an entry belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LedgerFamily {
    SignupReward,
    ReferralReward,
    LinkReward,
    Swap,
    GxOrder,
}

impl LedgerFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignupReward => "signup_reward",
            Self::ReferralReward => "referral_reward",
            Self::LinkReward => "link_reward",
            Self::Swap => "swap",
            Self::GxOrder => "gx_order",
        }
    }

    /// Reward families predate event ids and may hold unkeyed rows that
    /// still count as a payout to the same parties.
    pub fn tracks_legacy_entries(&self) -> bool {
        matches!(
            self,
            Self::SignupReward | Self::ReferralReward | Self::LinkReward
        )
    }
}

impl std::str::FromStr for LedgerFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup_reward" => Ok(Self::SignupReward),
            "referral_reward" => Ok(Self::ReferralReward),
            "link_reward" => Ok(Self::LinkReward),
            "swap" => Ok(Self::Swap),
            "gx_order" => Ok(Self::GxOrder),
            _ => Err(format!("Invalid ledger family: {}", s)),
        }
    }
}

impl std::fmt::Display for LedgerFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a ledger entry.
///
/// Persisted statuses only ever move along
/// `Pending -> PendingHash -> {Success | Failure}`; an absent entry is the
/// implicit initial state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Submission failed or returned nothing usable, safe to resubmit
    #[default]
    Pending,
    /// Accepted by the wallet service, waiting for a transaction hash
    PendingHash,
    /// Confirmed with a transaction hash
    Success,
    /// Given up on
    Failure,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingHash => "pending_hash",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }

    #[inline]
    pub fn awaits_hash(&self) -> bool {
        matches!(self, Self::PendingHash)
    }

    pub const ALL: [Self; 4] = [Self::Pending, Self::PendingHash, Self::Success, Self::Failure];

    /// Position along the lifecycle
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::PendingHash => 1,
            Self::Success | Self::Failure => 2,
        }
    }

    /// Whether a persisted entry in this status may be rewritten to `next`.
    /// Terminal statuses never change and nothing moves backward.
    pub fn can_move_to(&self, next: Self) -> bool {
        !self.is_terminal() && self.rank() <= next.rank()
    }

    /// Statuses an entry may be in for a write of `next` to apply
    pub fn predecessors_of(next: Self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|status| status.can_move_to(next))
            .collect()
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "pending_hash" => Ok(Self::PendingHash),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extra fields recorded for swaps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SwapDetails {
    pub chain_id: String,
    pub token_in: String,
    pub amount_in: String,
    pub token_out: String,
    pub amount_out: String,
}

/// Family-specific fields carried alongside the shared lifecycle fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryDetails {
    #[default]
    None,
    Swap(SwapDetails),
}

/// Persisted record tracking one transfer's lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub family: LedgerFamily,
    /// Idempotency key, absent only on rows written before keys existed
    pub event_id: Option<String>,
    /// User receiving (or, for orders and swaps, spending) value
    pub subject_user_id: String,
    /// Referrer or sponsor for relational rewards
    pub counterparty_user_id: Option<String>,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub wallet_address: String,
    pub status: TransactionStatus,
    pub transaction_hash: Option<String>,
    pub user_op_hash: Option<String>,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub details: EntryDetails,
}

impl LedgerEntry {
    /// Apply a partial update in place. `date_added` and the descriptive
    /// fields are never touched.
    pub fn apply(&mut self, update: &LedgerUpdate) {
        self.status = update.status;
        if let Some(hash) = &update.transaction_hash {
            self.transaction_hash = Some(hash.clone());
        }
        if let Some(op) = &update.user_op_hash {
            self.user_op_hash = Some(op.clone());
        }
    }
}

/// Partial update applied to an existing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub status: TransactionStatus,
    pub transaction_hash: Option<String>,
    pub user_op_hash: Option<String>,
}

impl LedgerUpdate {
    pub fn status(status: TransactionStatus) -> Self {
        Self {
            status,
            transaction_hash: None,
            user_op_hash: None,
        }
    }

    pub fn success(transaction_hash: impl Into<String>) -> Self {
        Self {
            status: TransactionStatus::Success,
            transaction_hash: Some(transaction_hash.into()),
            user_op_hash: None,
        }
    }

    pub fn awaiting_hash(user_op_hash: impl Into<String>) -> Self {
        Self {
            status: TransactionStatus::PendingHash,
            transaction_hash: None,
            user_op_hash: Some(user_op_hash.into()),
        }
    }
}

/// How to find an entry within a family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLookup {
    ByEvent { event_id: String },
    /// Entries without an event id, matched on the parties involved.
    /// Failed rows never match.
    Legacy {
        subject_user_id: String,
        counterparty_user_id: Option<String>,
    },
}

/// Wallet that signs the transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "user_id", rename_all = "snake_case")]
pub enum SenderContext {
    /// The service's own funding account
    Treasury,
    /// A user's custodial wallet
    User(String),
}

/// Where value is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// The subject's resolved custodial wallet
    Subject,
    Address(String),
}

/// What is being sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferPayload {
    /// ERC-20 transfer of `amount` whole tokens
    Token {
        chain_id: String,
        token_address: String,
        amount: Decimal,
    },
    /// Contract call on the recipient address
    ContractCall {
        chain_id: String,
        data: String,
        value: String,
    },
}

/// Transfer handed to the wallet service
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub sender: SenderContext,
    pub recipient: Recipient,
    pub payload: TransferPayload,
}

/// Transfer with the recipient resolved to an address
#[derive(Debug, Clone, PartialEq)]
pub struct WalletTransfer {
    pub sender: SenderContext,
    pub recipient_address: String,
    pub payload: TransferPayload,
}

/// What the wallet service returned for a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub tx_hash: Option<String>,
    pub user_op_hash: Option<String>,
}

impl TransferReceipt {
    pub fn confirmed(hash: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(hash.into()),
            user_op_hash: None,
        }
    }

    pub fn accepted(user_op_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: None,
            user_op_hash: Some(user_op_hash.into()),
        }
    }
}

/// Everything the engine needs to drive one ledger entry
#[derive(Debug, Clone)]
pub struct TransferIntent {
    pub family: LedgerFamily,
    pub event_id: String,
    pub subject_user_id: String,
    pub counterparty_user_id: Option<String>,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub details: EntryDetails,
    pub request: TransferRequest,
}

/// Result of driving an entry through the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Reached `Success` during this invocation. The hash is absent only
    /// when a `PendingHash` entry had no operation handle to poll.
    Completed { transaction_hash: Option<String> },
    /// Entry was already `Success`
    AlreadyCompleted,
    /// A non-failed entry without event id already covers these parties
    LegacyDuplicate,
    /// Left in `Pending`, resubmit later
    Pending,
    /// Left in `PendingHash`, poll again later
    AwaitingHash,
    /// Reconciliation window elapsed, entry forced to `Failure`
    DeadlineExceeded,
    /// Entry was already `Failure`
    Failed,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::AlreadyCompleted | Self::LegacyDuplicate
        )
    }
}

/// A user known to have received every reward requested at sign-up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub user_id: String,
    pub user_handle: Option<String>,
    pub user_name: Option<String>,
    pub wallet_address: String,
    pub date_added: DateTime<Utc>,
}

/// Inbound "new user" event
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUserEvent {
    #[validate(length(min = 1, message = "Event id is required"))]
    pub event_id: String,
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
    pub user_handle: Option<String>,
    pub user_name: Option<String>,
    /// User who referred the new user
    pub referent_user_id: Option<String>,
    /// User whose shared link brought the new user in
    pub link_sponsor_user_id: Option<String>,
    #[serde(default)]
    pub needs_signup_reward: bool,
    #[serde(default)]
    pub needs_referral_reward: bool,
    #[serde(default)]
    pub needs_link_reward: bool,
}

/// Inbound swap request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    #[validate(length(min = 1, message = "Event id is required"))]
    pub event_id: String,
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "Router address is required"))]
    pub to: String,
    #[validate(length(min = 1, message = "Call data is required"))]
    pub data: String,
    #[serde(default = "zero_value")]
    pub value: String,
    pub chain_id: Option<String>,
    pub token_in: String,
    pub amount_in: String,
    pub token_out: String,
    pub amount_out: String,
}

fn zero_value() -> String {
    "0x00".to_string()
}

/// Boolean result returned to the event delivery layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct EventResponse {
    pub success: bool,
}

/// Outward notification payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    TransferCompleted {
        family: LedgerFamily,
        event_id: Option<String>,
        subject_user_id: String,
        counterparty_user_id: Option<String>,
        amount: Decimal,
        wallet_address: String,
        transaction_hash: String,
    },
    UserIdentified {
        user_id: String,
        user_handle: Option<String>,
        user_name: Option<String>,
        wallet_address: String,
    },
}

impl NotificationEvent {
    pub fn transfer_completed(entry: &LedgerEntry, transaction_hash: &str) -> Self {
        Self::TransferCompleted {
            family: entry.family,
            event_id: entry.event_id.clone(),
            subject_user_id: entry.subject_user_id.clone(),
            counterparty_user_id: entry.counterparty_user_id.clone(),
            amount: entry.amount,
            wallet_address: entry.wallet_address.clone(),
            transaction_hash: transaction_hash.to_string(),
        }
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub wallet: HealthStatus,
    pub timestamp: DateTime<Utc>,
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(database: HealthStatus, wallet: HealthStatus) -> Self {
        let status = match (&database, &wallet) {
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        };
        Self {
            status,
            database,
            wallet,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    #[schema(example = "validation_error")]
    pub r#type: String,
    pub message: String,
}
