//! Outward notification sinks.

pub mod webhook;

pub use webhook::{DisabledNotificationSink, WebhookNotificationSink};
