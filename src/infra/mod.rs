//! Infrastructure layer implementations.

pub mod clock;
pub mod database;
pub mod notify;
pub mod quote;
pub mod wallet;

pub use clock::SystemClock;
pub use database::{PostgresClient, PostgresConfig};
pub use notify::{DisabledNotificationSink, WebhookNotificationSink};
pub use quote::FixedRateQuoteCalculator;
pub use wallet::{HttpWalletClient, WalletApiConfig};
