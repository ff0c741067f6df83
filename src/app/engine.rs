//! Transaction lifecycle engine.
//!
//! Drives one ledger entry per `(family, event_id)` through
//! `Pending -> PendingHash -> {Success | Failure}`. Every call re-reads the
//! persisted entry before acting, so repeated or concurrent invocations
//! converge through the store rather than through in-memory state:
//!
//! - `Success` is a pure read, nothing is resubmitted.
//! - `PendingHash` is reconciled by polling the wallet service until the
//!   reconciliation deadline, after which the entry is forced to `Failure`.
//! - `Pending` or no entry at all triggers a (re)submission.
//!
//! The engine holds no lock across workers. Two invocations that both read
//! `Pending` will both submit; the wallet service's own idempotency covers
//! that window. Stores refuse writes that would move an entry backward, and
//! a refused write makes the engine report the state another worker left.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    AppError, Clock, DatabaseError, LedgerEntry, LedgerFamily, LedgerLookup, LedgerStore,
    LedgerUpdate, NotificationEvent, NotificationSink, Recipient, TransactionStatus,
    TransferIntent, TransferOutcome, UserResolver, WalletClient, WalletError, WalletTransfer,
};

/// Minutes after `date_added` during which a `PendingHash` entry is polled
pub const RECONCILIATION_DEADLINE_MINUTES: i64 = 10;

/// Idempotent submit/poll/timeout protocol shared by every handler
pub struct TransactionEngine {
    store: Arc<dyn LedgerStore>,
    wallet: Arc<dyn WalletClient>,
    resolver: Arc<dyn UserResolver>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    deadline: Duration,
}

impl TransactionEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        wallet: Arc<dyn WalletClient>,
        resolver: Arc<dyn UserResolver>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            wallet,
            resolver,
            notifier,
            clock,
            deadline: Duration::minutes(RECONCILIATION_DEADLINE_MINUTES),
        }
    }

    /// Drive the entry for `intent` one step forward.
    ///
    /// Expected conditions (transient wallet errors, pending hashes, elapsed
    /// deadlines) come back as a [`TransferOutcome`]. `Err` is reserved for
    /// store failures and for an unresolvable recipient wallet, neither of
    /// which leaves a ledger write behind.
    #[instrument(
        skip(self, intent),
        fields(family = %intent.family, event_id = %intent.event_id, subject = %intent.subject_user_id)
    )]
    pub async fn process(&self, intent: &TransferIntent) -> Result<TransferOutcome, AppError> {
        let existing = self
            .store
            .find_entry(
                intent.family,
                &LedgerLookup::ByEvent {
                    event_id: intent.event_id.clone(),
                },
            )
            .await?;

        if let Some(entry) = &existing
            && entry.status.is_success()
        {
            debug!("Entry already successful, skipping");
            return Ok(TransferOutcome::AlreadyCompleted);
        }

        if self.has_legacy_duplicate(intent).await? {
            info!("Legacy entry already covers this transfer");
            return Ok(TransferOutcome::LegacyDuplicate);
        }

        match existing {
            Some(entry) => match entry.status {
                TransactionStatus::Success => Ok(TransferOutcome::AlreadyCompleted),
                TransactionStatus::Failure => {
                    debug!("Entry already failed, skipping");
                    Ok(TransferOutcome::Failed)
                }
                TransactionStatus::PendingHash => self.reconcile(entry).await,
                TransactionStatus::Pending => self.submit(intent, Some(entry)).await,
            },
            None => self.submit(intent, None).await,
        }
    }

    async fn has_legacy_duplicate(&self, intent: &TransferIntent) -> Result<bool, AppError> {
        if !intent.family.tracks_legacy_entries() {
            return Ok(false);
        }
        let legacy = self
            .store
            .find_entry(
                intent.family,
                &LedgerLookup::Legacy {
                    subject_user_id: intent.subject_user_id.clone(),
                    counterparty_user_id: intent.counterparty_user_id.clone(),
                },
            )
            .await?;
        Ok(legacy.is_some())
    }

    async fn submit(
        &self,
        intent: &TransferIntent,
        existing: Option<LedgerEntry>,
    ) -> Result<TransferOutcome, AppError> {
        let wallet_address = match existing.as_ref().map(|e| e.wallet_address.as_str()) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => self
                .resolver
                .resolve_wallet(&intent.subject_user_id)
                .await
                .map_err(|e| {
                    warn!(error = %e, "Wallet resolution failed, nothing submitted");
                    AppError::Wallet(WalletError::ResolutionFailed(
                        intent.subject_user_id.clone(),
                    ))
                })?,
        };

        let transfer = WalletTransfer {
            sender: intent.request.sender.clone(),
            recipient_address: match &intent.request.recipient {
                Recipient::Subject => wallet_address.clone(),
                Recipient::Address(address) => address.clone(),
            },
            payload: intent.request.payload.clone(),
        };

        let receipt = match self.wallet.submit_transfer(&transfer).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if e.is_permanent() {
                    error!(error = %e, "Transfer refused, will fail again until fixed");
                } else {
                    warn!(error = %e, "Transfer submission failed, leaving entry pending");
                }
                if self
                    .record(
                        intent,
                        existing,
                        wallet_address,
                        LedgerUpdate::status(TransactionStatus::Pending),
                    )
                    .await?
                    .is_none()
                {
                    return self.settled(intent.family, &intent.event_id).await;
                }
                return Ok(TransferOutcome::Pending);
            }
        };
        let family = intent.family;
        let event_id = intent.event_id.as_str();

        let tx_hash = receipt.tx_hash.filter(|h| !h.is_empty());
        let user_op_hash = receipt.user_op_hash.filter(|h| !h.is_empty());

        match (tx_hash, user_op_hash) {
            (Some(hash), _) => {
                let Some(entry) = self
                    .record(intent, existing, wallet_address, LedgerUpdate::success(&hash))
                    .await?
                else {
                    return self.settled(family, event_id).await;
                };
                info!(transaction_hash = %hash, "Transfer confirmed");
                self.notify_completed(&entry, &hash).await;
                Ok(TransferOutcome::Completed {
                    transaction_hash: Some(hash),
                })
            }
            (None, Some(op)) => {
                if self
                    .record(
                        intent,
                        existing,
                        wallet_address,
                        LedgerUpdate::awaiting_hash(&op),
                    )
                    .await?
                    .is_none()
                {
                    return self.settled(family, event_id).await;
                }
                info!(user_op_hash = %op, "Transfer accepted, awaiting transaction hash");
                Ok(TransferOutcome::AwaitingHash)
            }
            (None, None) => {
                warn!("Wallet service returned neither hash nor operation handle");
                if self
                    .record(
                        intent,
                        existing,
                        wallet_address,
                        LedgerUpdate::status(TransactionStatus::Pending),
                    )
                    .await?
                    .is_none()
                {
                    return self.settled(family, event_id).await;
                }
                Ok(TransferOutcome::Pending)
            }
        }
    }

    async fn reconcile(&self, mut entry: LedgerEntry) -> Result<TransferOutcome, AppError> {
        let Some(event_id) = entry.event_id.clone() else {
            return Err(AppError::Internal(
                "cannot reconcile an entry without event id".to_string(),
            ));
        };

        let elapsed = self.clock.now() - entry.date_added;
        if elapsed > self.deadline {
            warn!(
                elapsed_secs = elapsed.num_seconds(),
                "Reconciliation deadline exceeded, marking entry failed"
            );
            let update = LedgerUpdate::status(TransactionStatus::Failure);
            if !self.apply_update(entry.family, &event_id, &update).await? {
                return self.settled(entry.family, &event_id).await;
            }
            return Ok(TransferOutcome::DeadlineExceeded);
        }

        // TODO: confirm with the wallet team whether a pending-hash entry
        // without an operation handle can still appear; if not, this branch
        // should fail the entry instead of promoting it.
        let Some(user_op_hash) = entry.user_op_hash.clone().filter(|h| !h.is_empty()) else {
            warn!("Pending hash without operation handle, promoting to success");
            let update = LedgerUpdate::status(TransactionStatus::Success);
            if !self.apply_update(entry.family, &event_id, &update).await? {
                return self.settled(entry.family, &event_id).await;
            }
            return Ok(TransferOutcome::Completed {
                transaction_hash: None,
            });
        };

        match self.wallet.transaction_status(&user_op_hash).await {
            Ok(Some(hash)) if !hash.is_empty() => {
                let update = LedgerUpdate::success(&hash);
                if !self.apply_update(entry.family, &event_id, &update).await? {
                    return self.settled(entry.family, &event_id).await;
                }
                entry.apply(&update);
                info!(transaction_hash = %hash, "Pending transfer reconciled");
                self.notify_completed(&entry, &hash).await;
                Ok(TransferOutcome::Completed {
                    transaction_hash: Some(hash),
                })
            }
            Ok(_) => {
                debug!(user_op_hash = %user_op_hash, "Transaction hash not available yet");
                Ok(TransferOutcome::AwaitingHash)
            }
            Err(e) => {
                warn!(error = %e, user_op_hash = %user_op_hash, "Status query failed, will retry");
                Ok(TransferOutcome::AwaitingHash)
            }
        }
    }

    /// Update the existing entry, or insert a new one stamped with the
    /// current time. `None` when another worker already moved the entry
    /// past what this write expected.
    async fn record(
        &self,
        intent: &TransferIntent,
        existing: Option<LedgerEntry>,
        wallet_address: String,
        update: LedgerUpdate,
    ) -> Result<Option<LedgerEntry>, AppError> {
        match existing {
            Some(mut entry) => {
                if !self
                    .apply_update(intent.family, &intent.event_id, &update)
                    .await?
                {
                    return Ok(None);
                }
                entry.apply(&update);
                Ok(Some(entry))
            }
            None => {
                let entry = LedgerEntry {
                    family: intent.family,
                    event_id: Some(intent.event_id.clone()),
                    subject_user_id: intent.subject_user_id.clone(),
                    counterparty_user_id: intent.counterparty_user_id.clone(),
                    amount: intent.amount,
                    reason: intent.reason.clone(),
                    message: intent.message.clone(),
                    wallet_address,
                    status: update.status,
                    transaction_hash: update.transaction_hash.clone(),
                    user_op_hash: update.user_op_hash.clone(),
                    date_added: self.clock.now(),
                    details: intent.details.clone(),
                };
                match self.store.insert_entry(&entry).await {
                    Ok(()) => Ok(Some(entry)),
                    Err(AppError::Database(DatabaseError::Duplicate(_))) => {
                        debug!("Entry inserted concurrently, updating it instead");
                        if !self
                            .apply_update(intent.family, &intent.event_id, &update)
                            .await?
                        {
                            return Ok(None);
                        }
                        self.store
                            .find_entry(
                                intent.family,
                                &LedgerLookup::ByEvent {
                                    event_id: intent.event_id.clone(),
                                },
                            )
                            .await
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// `false` when the store refused the write as stale
    async fn apply_update(
        &self,
        family: LedgerFamily,
        event_id: &str,
        update: &LedgerUpdate,
    ) -> Result<bool, AppError> {
        match self.store.update_entry(family, event_id, update).await {
            Ok(()) => Ok(true),
            Err(AppError::Database(DatabaseError::StaleWrite(reason))) => {
                info!(%reason, "Entry moved on concurrently, write dropped");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Outcome for whatever state another worker left the entry in
    async fn settled(
        &self,
        family: LedgerFamily,
        event_id: &str,
    ) -> Result<TransferOutcome, AppError> {
        let current = self
            .store
            .find_entry(
                family,
                &LedgerLookup::ByEvent {
                    event_id: event_id.to_string(),
                },
            )
            .await?;
        Ok(match current.map(|e| e.status) {
            Some(TransactionStatus::Success) => TransferOutcome::AlreadyCompleted,
            Some(TransactionStatus::Failure) => TransferOutcome::Failed,
            Some(TransactionStatus::PendingHash) => TransferOutcome::AwaitingHash,
            Some(TransactionStatus::Pending) | None => TransferOutcome::Pending,
        })
    }

    async fn notify_completed(&self, entry: &LedgerEntry, transaction_hash: &str) {
        let event = NotificationEvent::transfer_completed(entry, transaction_hash);
        if let Err(e) = self.notifier.notify(&event).await {
            warn!(error = %e, "Completion notification failed, ignoring");
        }
    }
}
