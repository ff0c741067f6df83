//! PostgreSQL ledger store implementation.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

use crate::domain::{
    AppError, DatabaseError, EntryDetails, LedgerEntry, LedgerFamily, LedgerLookup, LedgerStore,
    LedgerUpdate, Order, OrderStatus, Quote, TransactionStatus, UserRecord,
};

const ENTRY_COLUMNS: &str = r#"
    family, event_id, subject_user_id, counterparty_user_id, amount, reason, message,
    wallet_address, status, transaction_hash, user_op_hash, date_added, details
"#;

const QUOTE_COLUMNS: &str = r#"
    quote_id, user_id, token_amount_g1, usd_from_usd_investment, usd_from_g1_investment,
    equivalent_usd_invested, gx_usd_exchange_rate, gx_received, date
"#;

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// PostgreSQL ledger store with connection pooling
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client with custom configuration
    pub async fn new(database_url: &str, config: PostgresConfig) -> Result<Self, AppError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client with default configuration
    pub async fn with_defaults(database_url: &str) -> Result<Self, AppError> {
        Self::new(database_url, PostgresConfig::default()).await
    }

    /// Run database migrations using sqlx migrate
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Migration(e.to_string())))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying connection pool (for testing)
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<LedgerEntry, AppError> {
        let family: String = row.get("family");
        let status: String = row.get("status");
        let Json(details): Json<EntryDetails> = row.get("details");

        Ok(LedgerEntry {
            family: family.parse().map_err(decode_error)?,
            event_id: row.get("event_id"),
            subject_user_id: row.get("subject_user_id"),
            counterparty_user_id: row.get("counterparty_user_id"),
            amount: row.get("amount"),
            reason: row.get("reason"),
            message: row.get("message"),
            wallet_address: row.get("wallet_address"),
            status: status.parse::<TransactionStatus>().map_err(decode_error)?,
            transaction_hash: row.get("transaction_hash"),
            user_op_hash: row.get("user_op_hash"),
            date_added: row.get("date_added"),
            details,
        })
    }

    fn row_to_user(row: &sqlx::postgres::PgRow) -> UserRecord {
        UserRecord {
            user_id: row.get("user_id"),
            user_handle: row.get("user_handle"),
            user_name: row.get("user_name"),
            wallet_address: row.get("wallet_address"),
            date_added: row.get("date_added"),
        }
    }

    fn row_to_quote(row: &sqlx::postgres::PgRow) -> Quote {
        Quote {
            quote_id: row.get("quote_id"),
            user_id: row.get("user_id"),
            token_amount_g1: row.get("token_amount_g1"),
            usd_from_usd_investment: row.get("usd_from_usd_investment"),
            usd_from_g1_investment: row.get("usd_from_g1_investment"),
            equivalent_usd_invested: row.get("equivalent_usd_invested"),
            gx_usd_exchange_rate: row.get("gx_usd_exchange_rate"),
            gx_received: row.get("gx_received"),
            date: row.get("date"),
        }
    }

    fn row_to_order(row: &sqlx::postgres::PgRow) -> Result<Order, AppError> {
        let status: String = row.get("status");
        Ok(Order {
            order_id: row.get("order_id"),
            user_id: row.get("user_id"),
            token_amount_g1: row.get("token_amount_g1"),
            usd_from_usd_investment: row.get("usd_from_usd_investment"),
            gx_received: row.get("gx_received"),
            status: status.parse::<OrderStatus>().map_err(decode_error)?,
            transaction_hash_g1: row.get("transaction_hash_g1"),
            date: row.get("date"),
        })
    }
}

fn decode_error(message: String) -> AppError {
    AppError::Database(DatabaseError::Decode(message))
}

#[async_trait]
impl LedgerStore for PostgresClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_entry(
        &self,
        family: LedgerFamily,
        lookup: &LedgerLookup,
    ) -> Result<Option<LedgerEntry>, AppError> {
        let row = match lookup {
            LedgerLookup::ByEvent { event_id } => {
                sqlx::query(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE family = $1 AND event_id = $2"
                ))
                .bind(family.as_str())
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await
            }
            LedgerLookup::Legacy {
                subject_user_id,
                counterparty_user_id,
            } => {
                sqlx::query(&format!(
                    r#"
                    SELECT {ENTRY_COLUMNS} FROM ledger_entries
                    WHERE family = $1 AND event_id IS NULL AND subject_user_id = $2
                      AND ($3::TEXT IS NULL OR counterparty_user_id = $3)
                      AND status <> $4
                    ORDER BY date_added ASC
                    LIMIT 1
                    "#
                ))
                .bind(family.as_str())
                .bind(subject_user_id)
                .bind(counterparty_user_id)
                .bind(TransactionStatus::Failure.as_str())
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(DatabaseError::from)?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    #[instrument(skip(self, entry), fields(family = %entry.family, event_id = ?entry.event_id, status = %entry.status))]
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), AppError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO ledger_entries ({ENTRY_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#
        ))
        .bind(entry.family.as_str())
        .bind(&entry.event_id)
        .bind(&entry.subject_user_id)
        .bind(&entry.counterparty_user_id)
        .bind(entry.amount)
        .bind(&entry.reason)
        .bind(&entry.message)
        .bind(&entry.wallet_address)
        .bind(entry.status.as_str())
        .bind(&entry.transaction_hash)
        .bind(&entry.user_op_hash)
        .bind(entry.date_added)
        .bind(Json(&entry.details))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self, update), fields(status = %update.status))]
    async fn update_entry(
        &self,
        family: LedgerFamily,
        event_id: &str,
        update: &LedgerUpdate,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE ledger_entries
            SET status = $3,
                transaction_hash = COALESCE($4, transaction_hash),
                user_op_hash = COALESCE($5, user_op_hash)
            WHERE family = $1 AND event_id = $2 AND status = ANY($6)
            "#,
        )
        .bind(family.as_str())
        .bind(event_id)
        .bind(update.status.as_str())
        .bind(&update.transaction_hash)
        .bind(&update.user_op_hash)
        .bind(
            TransactionStatus::predecessors_of(update.status)
                .iter()
                .map(|s| s.as_str().to_string())
                .collect::<Vec<_>>(),
        )
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let current: Option<String> = sqlx::query_scalar(
            "SELECT status FROM ledger_entries WHERE family = $1 AND event_id = $2",
        )
        .bind(family.as_str())
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Err(AppError::Database(match current {
            Some(status) => DatabaseError::StaleWrite(format!(
                "{family}/{event_id} is {status}, cannot become {}",
                update.status
            )),
            None => DatabaseError::NotFound(format!("{family}/{event_id}")),
        }))
    }

    #[instrument(skip(self))]
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, user_handle, user_name, wallet_address, date_added
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.as_ref().map(Self::row_to_user))
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, user_handle, user_name, wallet_address, date_added)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
            SET user_handle = EXCLUDED.user_handle,
                user_name = EXCLUDED.user_name,
                wallet_address = EXCLUDED.wallet_address
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.user_handle)
        .bind(&user.user_name)
        .bind(&user.wallet_address)
        .bind(user.date_added)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self, quote), fields(quote_id = %quote.quote_id))]
    async fn insert_quote(&self, quote: &Quote) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO quotes ({QUOTE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(&quote.quote_id)
        .bind(&quote.user_id)
        .bind(quote.token_amount_g1)
        .bind(quote.usd_from_usd_investment)
        .bind(quote.usd_from_g1_investment)
        .bind(quote.equivalent_usd_invested)
        .bind(quote.gx_usd_exchange_rate)
        .bind(quote.gx_received)
        .bind(quote.date)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_quote(&self, quote_id: &str) -> Result<Option<Quote>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE quote_id = $1"
        ))
        .bind(quote_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.as_ref().map(Self::row_to_quote))
    }

    #[instrument(skip(self))]
    async fn list_quotes_for_user(&self, user_id: &str) -> Result<Vec<Quote>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE user_id = $1 ORDER BY date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.iter().map(Self::row_to_quote).collect())
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT order_id, user_id, token_amount_g1, usd_from_usd_investment, gx_received,
                   status, transaction_hash_g1, date
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    #[instrument(skip(self, order), fields(order_id = %order.order_id, status = %order.status))]
    async fn upsert_order(&self, order: &Order) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                order_id, user_id, token_amount_g1, usd_from_usd_investment, gx_received,
                status, transaction_hash_g1, date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (order_id) DO UPDATE
            SET status = EXCLUDED.status,
                transaction_hash_g1 = EXCLUDED.transaction_hash_g1,
                date = EXCLUDED.date
            "#,
        )
        .bind(&order.order_id)
        .bind(&order.user_id)
        .bind(order.token_amount_g1)
        .bind(order.usd_from_usd_investment)
        .bind(order.gx_received)
        .bind(order.status.as_str())
        .bind(&order.transaction_hash_g1)
        .bind(order.date)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }
}
