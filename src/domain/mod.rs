//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod order;
pub mod traits;
pub mod types;

pub use error::{
    AppError, ConfigError, DatabaseError, ExternalServiceError, ValidationError, WalletError,
};
pub use order::{
    Order, OrderOutcome, OrderStatus, PlaceOrderRequest, PlaceOrderResponse, Quote, QuoteAmounts,
    QuoteRequest,
};
pub use traits::{Clock, LedgerStore, NotificationSink, QuoteCalculator, UserResolver, WalletClient};
pub use types::{
    EntryDetails, ErrorDetail, ErrorResponse, EventResponse, HealthResponse, HealthStatus,
    LedgerEntry, LedgerFamily, LedgerLookup, LedgerUpdate, NewUserEvent, NotificationEvent,
    Recipient, SenderContext, SwapDetails, SwapEvent, TransactionStatus, TransferIntent,
    TransferOutcome, TransferPayload, TransferReceipt, TransferRequest, UserRecord,
    WalletTransfer,
};
