//! Custodial wallet service integration.

pub mod calldata;
pub mod http;

pub use calldata::{TOKEN_DECIMALS, encode_transfer, to_base_units};
pub use http::{HttpWalletClient, WalletApiConfig};
