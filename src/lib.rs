//! Idempotent token reward and order relayer.
//!
//! Inbound events (new users, swaps, orders) become custodial-wallet
//! transfers tracked in a ledger, so redelivered events never pay twice and
//! transfers stuck without a transaction hash are reconciled or given up on
//! after a fixed window.

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
