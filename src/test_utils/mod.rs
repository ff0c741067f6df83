//! Test doubles for the domain traits.

pub mod mocks;

pub use mocks::{
    MockClock, MockLedgerStore, MockNotificationSink, MockUserResolver, MockWalletClient,
};
