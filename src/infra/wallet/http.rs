//! HTTP client for the custodial wallet service.
//!
//! The service signs and submits transactions on behalf of users and of the
//! treasury account, and maps user ids to their custodial addresses.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::calldata::encode_transfer;
use crate::domain::{
    AppError, ConfigError, SenderContext, TransferPayload, TransferReceipt, UserResolver,
    WalletClient, WalletError, WalletTransfer,
};

/// Connection settings for the wallet service
#[derive(Debug)]
pub struct WalletApiConfig {
    pub base_url: String,
    pub api_token: SecretString,
    /// Wallet-service user id of the treasury account
    pub treasury_user_id: String,
    pub timeout: Duration,
}

impl WalletApiConfig {
    /// Load from `WALLET_API_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("WALLET_API_URL")
            .map_err(|_| ConfigError::MissingEnv("WALLET_API_URL".to_string()))?;
        let api_token = env::var("WALLET_API_TOKEN")
            .map_err(|_| ConfigError::MissingEnv("WALLET_API_TOKEN".to_string()))?;
        let treasury_user_id = env::var("WALLET_TREASURY_USER_ID")
            .map_err(|_| ConfigError::MissingEnv("WALLET_TREASURY_USER_ID".to_string()))?;
        let timeout_secs = match env::var("WALLET_API_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "WALLET_API_TIMEOUT_SECS".to_string(),
                message: e.to_string(),
            })?,
            Err(_) => 30,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: SecretString::from(api_token),
            treasury_user_id,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KernelTxRequest<'a> {
    user_id: &'a str,
    chain: &'a str,
    to: Vec<&'a str>,
    value: Vec<&'a str>,
    data: Vec<String>,
    delegatecall: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TxStatusRequest<'a> {
    user_op_hash: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxStatusResponse {
    tx_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveRequest<'a> {
    user_ids: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    users: Vec<ResolvedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedUser {
    user_id: String,
    wallet_address: Option<String>,
}

/// Wallet service client implementing both transfers and user resolution
pub struct HttpWalletClient {
    http_client: Client,
    config: WalletApiConfig,
}

impl HttpWalletClient {
    pub fn new(config: WalletApiConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Wallet(WalletError::Connection(e.to_string())))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn sender_id<'a>(&'a self, sender: &'a SenderContext) -> &'a str {
        match sender {
            SenderContext::Treasury => &self.config.treasury_user_id,
            SenderContext::User(user_id) => user_id,
        }
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, WalletError> {
        let response = self
            .http_client
            .post(self.url(path))
            .bearer_auth(self.config.api_token.expose_secret())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, path = %path, body = %body, "Wallet service returned error");
            return Err(WalletError::Rejected(format!("{}: {}", status, body)));
        }

        response.json::<R>().await.map_err(WalletError::from)
    }
}

#[async_trait]
impl WalletClient for HttpWalletClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let response = self
            .http_client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(WalletError::from)?;
        if !response.status().is_success() {
            return Err(AppError::Wallet(WalletError::Connection(format!(
                "health endpoint returned {}",
                response.status()
            ))));
        }
        Ok(())
    }

    #[instrument(skip(self, transfer), fields(recipient = %transfer.recipient_address))]
    async fn submit_transfer(&self, transfer: &WalletTransfer) -> Result<TransferReceipt, AppError> {
        let request = match &transfer.payload {
            TransferPayload::Token {
                chain_id,
                token_address,
                amount,
            } => KernelTxRequest {
                user_id: self.sender_id(&transfer.sender),
                chain: chain_id,
                to: vec![token_address.as_str()],
                value: vec!["0x00"],
                data: vec![encode_transfer(&transfer.recipient_address, *amount)?],
                delegatecall: 0,
            },
            TransferPayload::ContractCall {
                chain_id,
                data,
                value,
            } => KernelTxRequest {
                user_id: self.sender_id(&transfer.sender),
                chain: chain_id,
                to: vec![transfer.recipient_address.as_str()],
                value: vec![value.as_str()],
                data: vec![data.clone()],
                delegatecall: 0,
            },
        };

        let receipt: TransferReceipt = self.post("/kernel/tx", &request).await?;
        debug!(tx_hash = ?receipt.tx_hash, user_op_hash = ?receipt.user_op_hash, "Transfer submitted");
        Ok(receipt)
    }

    #[instrument(skip(self))]
    async fn transaction_status(&self, user_op_hash: &str) -> Result<Option<String>, AppError> {
        let response: TxStatusResponse = self
            .post("/kernel/txStatus", &TxStatusRequest { user_op_hash })
            .await
            .map_err(|e| WalletError::StatusQuery(e.to_string()))?;
        Ok(response.tx_hash.filter(|h| !h.is_empty()))
    }
}

#[async_trait]
impl UserResolver for HttpWalletClient {
    #[instrument(skip(self))]
    async fn resolve_wallet(&self, user_id: &str) -> Result<String, AppError> {
        let response: ResolveResponse = self
            .post(
                "/resolver",
                &ResolveRequest {
                    user_ids: vec![user_id],
                },
            )
            .await?;

        response
            .users
            .into_iter()
            .find(|u| u.user_id == user_id)
            .and_then(|u| u.wallet_address)
            .filter(|address| !address.is_empty())
            .ok_or_else(|| AppError::Wallet(WalletError::ResolutionFailed(user_id.to_string())))
    }
}
