//! Domain traits defining contracts for external systems.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::AppError;
use super::order::{Order, Quote, QuoteAmounts, QuoteRequest};
use super::types::{
    LedgerEntry, LedgerFamily, LedgerLookup, LedgerUpdate, NotificationEvent, TransferReceipt,
    UserRecord, WalletTransfer,
};

/// Persistence for ledger entries, users, quotes and orders.
///
/// There are no transactions across families; every write is a single
/// insert or a last-write-wins partial update.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Check store connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Find one entry in a family
    async fn find_entry(
        &self,
        family: LedgerFamily,
        lookup: &LedgerLookup,
    ) -> Result<Option<LedgerEntry>, AppError>;

    /// Insert a new entry
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), AppError>;

    /// Apply a partial update to the entry keyed by `event_id`
    async fn update_entry(
        &self,
        family: LedgerFamily,
        event_id: &str,
        update: &LedgerUpdate,
    ) -> Result<(), AppError>;

    /// Get a user record by id
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, AppError>;

    /// Insert or replace a user record, keeping the original `date_added`
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), AppError>;

    /// Persist a freshly computed quote
    async fn insert_quote(&self, quote: &Quote) -> Result<(), AppError>;

    /// Get a quote by id
    async fn get_quote(&self, quote_id: &str) -> Result<Option<Quote>, AppError>;

    /// List a user's quotes, newest first
    async fn list_quotes_for_user(&self, user_id: &str) -> Result<Vec<Quote>, AppError>;

    /// Get an order by id
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, AppError>;

    /// Insert or replace an order
    async fn upsert_order(&self, order: &Order) -> Result<(), AppError>;
}

/// Custodial wallet service that executes transfers
#[async_trait]
pub trait WalletClient: Send + Sync {
    /// Check wallet service connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Submit a transfer. The receipt may carry a transaction hash, an
    /// operation handle, or neither.
    async fn submit_transfer(&self, transfer: &WalletTransfer) -> Result<TransferReceipt, AppError>;

    /// Look up the transaction hash for an operation handle.
    /// `Ok(None)` means the operation has not been mined yet.
    async fn transaction_status(&self, user_op_hash: &str) -> Result<Option<String>, AppError> {
        let _ = user_op_hash;
        Err(AppError::NotSupported(
            "transaction_status not implemented".to_string(),
        ))
    }
}

/// Maps a user id to the user's custodial wallet address
#[async_trait]
pub trait UserResolver: Send + Sync {
    async fn resolve_wallet(&self, user_id: &str) -> Result<String, AppError>;
}

/// Best-effort outward notifications. Callers log and drop errors.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), AppError>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Pure conversion of a quote request into amounts
pub trait QuoteCalculator: Send + Sync {
    fn compute(&self, request: &QuoteRequest) -> QuoteAmounts;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SenderContext, TransferPayload};
    use rust_decimal::Decimal;

    struct SubmitOnlyWallet;

    #[async_trait]
    impl WalletClient for SubmitOnlyWallet {
        async fn health_check(&self) -> Result<(), AppError> {
            Ok(())
        }

        async fn submit_transfer(
            &self,
            _transfer: &WalletTransfer,
        ) -> Result<TransferReceipt, AppError> {
            Ok(TransferReceipt::confirmed("0xhash"))
        }
    }

    #[tokio::test]
    async fn test_wallet_client_transaction_status_not_supported() {
        let client = SubmitOnlyWallet;
        let result = client.transaction_status("0xop").await;
        assert!(matches!(result, Err(AppError::NotSupported(_))));

        let receipt = client
            .submit_transfer(&WalletTransfer {
                sender: SenderContext::Treasury,
                recipient_address: "0xrecipient".to_string(),
                payload: TransferPayload::Token {
                    chain_id: "eip155:137".to_string(),
                    token_address: "0xtoken".to_string(),
                    amount: Decimal::ONE,
                },
            })
            .await
            .unwrap();
        assert_eq!(receipt.tx_hash.as_deref(), Some("0xhash"));
    }
}
