//! Application layer containing business logic and shared state.

pub mod engine;
pub mod orders;
pub mod rewards;
pub mod state;
pub mod swap;

pub use engine::{RECONCILIATION_DEADLINE_MINUTES, TransactionEngine};
pub use orders::{OrderConfig, OrderService};
pub use rewards::{RewardConfig, RewardService};
pub use state::{AppState, ServiceConfig};
pub use swap::SwapService;
