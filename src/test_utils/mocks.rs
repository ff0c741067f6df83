//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::{
    AppError, Clock, DatabaseError, ExternalServiceError, LedgerEntry, LedgerFamily,
    LedgerLookup, LedgerStore, LedgerUpdate, NotificationEvent, NotificationSink, Order, Quote,
    TransactionStatus, TransferReceipt, UserRecord, UserResolver, WalletClient, WalletError,
    WalletTransfer,
};

/// In-memory ledger store with a per-entry status history
pub struct MockLedgerStore {
    entries: Mutex<Vec<LedgerEntry>>,
    history: Mutex<Vec<(LedgerFamily, String, TransactionStatus)>>,
    users: Mutex<HashMap<String, UserRecord>>,
    quotes: Mutex<Vec<Quote>>,
    orders: Mutex<HashMap<String, Order>>,
    should_fail: AtomicBool,
}

impl MockLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            users: Mutex::new(HashMap::new()),
            quotes: Mutex::new(Vec::new()),
            orders: Mutex::new(HashMap::new()),
            should_fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with a connection error
    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::Relaxed);
    }

    /// Insert an entry directly, bypassing history (for seeding legacy rows)
    pub fn seed_entry(&self, entry: LedgerEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn seed_order(&self, order: Order) {
        self.orders
            .lock()
            .unwrap()
            .insert(order.order_id.clone(), order);
    }

    pub fn entry(&self, family: LedgerFamily, event_id: &str) -> Option<LedgerEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.family == family && e.event_id.as_deref() == Some(event_id))
            .cloned()
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Every status written for one entry, in order
    pub fn status_history(&self, family: LedgerFamily, event_id: &str) -> Vec<TransactionStatus> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(f, id, _)| *f == family && id == event_id)
            .map(|(_, _, status)| *status)
            .collect()
    }

    pub fn user(&self, user_id: &str) -> Option<UserRecord> {
        self.users.lock().unwrap().get(user_id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.orders.lock().unwrap().get(order_id).cloned()
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(AppError::Database(DatabaseError::Connection(
                "Mock store unavailable".to_string(),
            )));
        }
        Ok(())
    }
}

impl Default for MockLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.check_should_fail()
    }

    async fn find_entry(
        &self,
        family: LedgerFamily,
        lookup: &LedgerLookup,
    ) -> Result<Option<LedgerEntry>, AppError> {
        self.check_should_fail()?;
        let entries = self.entries.lock().unwrap();
        let found = entries.iter().find(|e| {
            e.family == family
                && match lookup {
                    LedgerLookup::ByEvent { event_id } => {
                        e.event_id.as_deref() == Some(event_id.as_str())
                    }
                    LedgerLookup::Legacy {
                        subject_user_id,
                        counterparty_user_id,
                    } => {
                        e.event_id.is_none()
                            && !e.status.is_failure()
                            && &e.subject_user_id == subject_user_id
                            && (counterparty_user_id.is_none()
                                || &e.counterparty_user_id == counterparty_user_id)
                    }
                }
        });
        Ok(found.cloned())
    }

    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), AppError> {
        self.check_should_fail()?;
        let mut entries = self.entries.lock().unwrap();
        if let Some(event_id) = &entry.event_id {
            if entries
                .iter()
                .any(|e| e.family == entry.family && e.event_id.as_ref() == Some(event_id))
            {
                return Err(AppError::Database(DatabaseError::Duplicate(
                    event_id.clone(),
                )));
            }
            self.history
                .lock()
                .unwrap()
                .push((entry.family, event_id.clone(), entry.status));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn update_entry(
        &self,
        family: LedgerFamily,
        event_id: &str,
        update: &LedgerUpdate,
    ) -> Result<(), AppError> {
        self.check_should_fail()?;
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.family == family && e.event_id.as_deref() == Some(event_id))
            .ok_or_else(|| AppError::Database(DatabaseError::NotFound(event_id.to_string())))?;
        if !entry.status.can_move_to(update.status) {
            return Err(AppError::Database(DatabaseError::StaleWrite(format!(
                "{family}/{event_id} is {}, cannot become {}",
                entry.status, update.status
            ))));
        }
        entry.apply(update);
        self.history
            .lock()
            .unwrap()
            .push((family, event_id.to_string(), update.status));
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        self.check_should_fail()?;
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<(), AppError> {
        self.check_should_fail()?;
        let mut users = self.users.lock().unwrap();
        let date_added = users
            .get(&user.user_id)
            .map(|existing| existing.date_added)
            .unwrap_or(user.date_added);
        let mut record = user.clone();
        record.date_added = date_added;
        users.insert(user.user_id.clone(), record);
        Ok(())
    }

    async fn insert_quote(&self, quote: &Quote) -> Result<(), AppError> {
        self.check_should_fail()?;
        self.quotes.lock().unwrap().push(quote.clone());
        Ok(())
    }

    async fn get_quote(&self, quote_id: &str) -> Result<Option<Quote>, AppError> {
        self.check_should_fail()?;
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.quote_id == quote_id)
            .cloned())
    }

    async fn list_quotes_for_user(&self, user_id: &str) -> Result<Vec<Quote>, AppError> {
        self.check_should_fail()?;
        let mut quotes: Vec<Quote> = self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect();
        quotes.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(quotes)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, AppError> {
        self.check_should_fail()?;
        Ok(self.orders.lock().unwrap().get(order_id).cloned())
    }

    async fn upsert_order(&self, order: &Order) -> Result<(), AppError> {
        self.check_should_fail()?;
        self.orders
            .lock()
            .unwrap()
            .insert(order.order_id.clone(), order.clone());
        Ok(())
    }
}

/// Scripted wallet client.
///
/// Queued responses are consumed in order; once a queue is empty,
/// submissions confirm immediately with `0xtx<n>` and status polls report
/// no hash yet.
pub struct MockWalletClient {
    submit_responses: Mutex<VecDeque<Result<TransferReceipt, WalletError>>>,
    status_responses: Mutex<VecDeque<Result<Option<String>, String>>>,
    submissions: Mutex<Vec<WalletTransfer>>,
    status_queries: Mutex<Vec<String>>,
    counter: AtomicUsize,
    is_healthy: AtomicBool,
}

impl MockWalletClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            submit_responses: Mutex::new(VecDeque::new()),
            status_responses: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            status_queries: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            is_healthy: AtomicBool::new(true),
        }
    }

    pub fn push_submit(&self, response: Result<TransferReceipt, String>) {
        self.submit_responses
            .lock()
            .unwrap()
            .push_back(response.map_err(WalletError::Connection));
    }

    /// Queue a transient failure
    pub fn push_submit_error(&self, message: impl Into<String>) {
        self.push_submit(Err(message.into()));
    }

    /// Queue a refusal that would repeat on retry
    pub fn push_submit_rejection(&self, message: impl Into<String>) {
        self.submit_responses
            .lock()
            .unwrap()
            .push_back(Err(WalletError::Rejected(message.into())));
    }

    pub fn push_status(&self, response: Result<Option<String>, String>) {
        self.status_responses.lock().unwrap().push_back(response);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn submissions(&self) -> Vec<WalletTransfer> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn status_queries(&self) -> Vec<String> {
        self.status_queries.lock().unwrap().clone()
    }
}

impl Default for MockWalletClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletClient for MockWalletClient {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Wallet(WalletError::Connection(
                "Unhealthy".to_string(),
            )));
        }
        Ok(())
    }

    async fn submit_transfer(&self, transfer: &WalletTransfer) -> Result<TransferReceipt, AppError> {
        self.submissions.lock().unwrap().push(transfer.clone());
        let scripted = self.submit_responses.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(receipt)) => Ok(receipt),
            Some(Err(err)) => Err(AppError::Wallet(err)),
            None => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed);
                Ok(TransferReceipt::confirmed(format!("0xtx{}", n)))
            }
        }
    }

    async fn transaction_status(&self, user_op_hash: &str) -> Result<Option<String>, AppError> {
        self.status_queries
            .lock()
            .unwrap()
            .push(user_op_hash.to_string());
        match self.status_responses.lock().unwrap().pop_front() {
            Some(Ok(hash)) => Ok(hash),
            Some(Err(msg)) => Err(AppError::Wallet(WalletError::StatusQuery(msg))),
            None => Ok(None),
        }
    }
}

/// Resolves `user` to `0xwallet_user` unless told to fail
pub struct MockUserResolver {
    failing: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockUserResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            failing: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_for(&self, user_id: &str) {
        self.failing.lock().unwrap().push(user_id.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn address_for(user_id: &str) -> String {
        format!("0xwallet_{}", user_id)
    }
}

impl Default for MockUserResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserResolver for MockUserResolver {
    async fn resolve_wallet(&self, user_id: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.lock().unwrap().iter().any(|u| u == user_id) {
            return Err(AppError::Wallet(WalletError::ResolutionFailed(
                user_id.to_string(),
            )));
        }
        Ok(Self::address_for(user_id))
    }
}

/// Records every notification; optionally fails after recording
pub struct MockNotificationSink {
    events: Mutex<Vec<NotificationEvent>>,
    should_fail: AtomicBool,
}

impl MockNotificationSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.should_fail.store(true, Ordering::Relaxed);
        sink
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Default for MockNotificationSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for MockNotificationSink {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), AppError> {
        self.events.lock().unwrap().push(event.clone());
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(AppError::ExternalService(ExternalServiceError::Unavailable(
                "Mock sink down".to_string(),
            )));
        }
        Ok(())
    }
}

/// Clock that only moves when told to
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
