//! Integration tests for the HTTP wallet client and the webhook sink.
//!
//! Uses `wiremock` to stand in for the wallet service and the notification
//! webhook.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

use reward_relayer::domain::{
    AppError, LedgerFamily, NotificationEvent, NotificationSink, SenderContext, TransferPayload,
    UserResolver, WalletClient, WalletError, WalletTransfer,
};
use reward_relayer::infra::{HttpWalletClient, WalletApiConfig, WebhookNotificationSink};

const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";

fn client(server: &MockServer) -> HttpWalletClient {
    HttpWalletClient::new(WalletApiConfig {
        base_url: server.uri(),
        api_token: SecretString::from("test_token"),
        treasury_user_id: "treasury".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn token_transfer(sender: SenderContext) -> WalletTransfer {
    WalletTransfer {
        sender,
        recipient_address: RECIPIENT.to_string(),
        payload: TransferPayload::Token {
            chain_id: "eip155:137".to_string(),
            token_address: "0xtoken".to_string(),
            amount: Decimal::from(100),
        },
    }
}

// ============================================================================
// TRANSFER SUBMISSION
// ============================================================================

mod submit_tests {
    use super::*;

    #[tokio::test]
    async fn test_token_transfer_from_treasury_confirms() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/kernel/tx"))
            .and(header("Authorization", "Bearer test_token"))
            .and(body_partial_json(json!({
                "userId": "treasury",
                "chain": "eip155:137",
                "to": ["0xtoken"],
                "value": ["0x00"],
                "delegatecall": 0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txHash": "0xabc" })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = client(&server)
            .submit_transfer(&token_transfer(SenderContext::Treasury))
            .await
            .unwrap();

        assert_eq!(receipt.tx_hash.as_deref(), Some("0xabc"));
        assert!(receipt.user_op_hash.is_none());
    }

    #[tokio::test]
    async fn test_token_transfer_encodes_erc20_call() {
        let server = MockServer::start().await;

        let expected_data = format!(
            "0xa9059cbb{:0>64}{:064x}",
            &RECIPIENT[2..],
            100u128 * 10u128.pow(18)
        );
        Mock::given(method("POST"))
            .and(path("/kernel/tx"))
            .and(body_partial_json(json!({ "data": [expected_data] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "userOpHash": "0xop" })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = client(&server)
            .submit_transfer(&token_transfer(SenderContext::User("u1".to_string())))
            .await
            .unwrap();

        assert!(receipt.tx_hash.is_none());
        assert_eq!(receipt.user_op_hash.as_deref(), Some("0xop"));
    }

    #[tokio::test]
    async fn test_contract_call_targets_recipient() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/kernel/tx"))
            .and(body_partial_json(json!({
                "userId": "trader",
                "to": ["0xrouter"],
                "value": ["0x10"],
                "data": ["0xdeadbeef"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txHash": "0xswap" })))
            .mount(&server)
            .await;

        let transfer = WalletTransfer {
            sender: SenderContext::User("trader".to_string()),
            recipient_address: "0xrouter".to_string(),
            payload: TransferPayload::ContractCall {
                chain_id: "eip155:137".to_string(),
                data: "0xdeadbeef".to_string(),
                value: "0x10".to_string(),
            },
        };
        let receipt = client(&server).submit_transfer(&transfer).await.unwrap();

        assert_eq!(receipt.tx_hash.as_deref(), Some("0xswap"));
    }

    #[tokio::test]
    async fn test_empty_receipt_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/kernel/tx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let receipt = client(&server)
            .submit_transfer(&token_transfer(SenderContext::Treasury))
            .await
            .unwrap();

        assert!(receipt.tx_hash.is_none());
        assert!(receipt.user_op_hash.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/kernel/tx"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = client(&server)
            .submit_transfer(&token_transfer(SenderContext::Treasury))
            .await;

        assert!(matches!(
            result,
            Err(AppError::Wallet(WalletError::Rejected(_)))
        ));
    }

    #[tokio::test]
    async fn test_invalid_recipient_never_reaches_service() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/kernel/tx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txHash": "0x1" })))
            .expect(0)
            .mount(&server)
            .await;

        let mut transfer = token_transfer(SenderContext::Treasury);
        transfer.recipient_address = "not-an-address".to_string();

        let result = client(&server).submit_transfer(&transfer).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

// ============================================================================
// STATUS POLLING
// ============================================================================

mod status_tests {
    use super::*;

    #[tokio::test]
    async fn test_status_returns_hash() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/kernel/txStatus"))
            .and(body_partial_json(json!({ "userOpHash": "0xop" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txHash": "0xmined" })))
            .mount(&server)
            .await;

        let hash = client(&server).transaction_status("0xop").await.unwrap();
        assert_eq!(hash.as_deref(), Some("0xmined"));
    }

    #[tokio::test]
    async fn test_status_without_hash_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/kernel/txStatus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txHash": "" })))
            .mount(&server)
            .await;

        let hash = client(&server).transaction_status("0xop").await.unwrap();
        assert!(hash.is_none());
    }

    #[tokio::test]
    async fn test_status_failure_maps_to_status_query_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/kernel/txStatus"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client(&server).transaction_status("0xop").await;
        assert!(matches!(
            result,
            Err(AppError::Wallet(WalletError::StatusQuery(_)))
        ));
    }
}

// ============================================================================
// USER RESOLUTION
// ============================================================================

mod resolver_tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_matching_user() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/resolver"))
            .and(body_partial_json(json!({ "userIds": ["u1"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [{ "userId": "u1", "walletAddress": RECIPIENT }]
            })))
            .mount(&server)
            .await;

        let address = client(&server).resolve_wallet("u1").await.unwrap();
        assert_eq!(address, RECIPIENT);
    }

    #[tokio::test]
    async fn test_unknown_user_fails_resolution() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/resolver"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
            .mount(&server)
            .await;

        let result = client(&server).resolve_wallet("ghost").await;
        assert!(matches!(
            result,
            Err(AppError::Wallet(WalletError::ResolutionFailed(ref user))) if user == "ghost"
        ));
    }
}

// ============================================================================
// HEALTH AND NOTIFICATIONS
// ============================================================================

#[tokio::test]
async fn test_wallet_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(client(&server).health_check().await.is_ok());
}

#[tokio::test]
async fn test_webhook_sink_posts_event() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/rewards"))
        .and(body_partial_json(json!({
            "event": "transfer_completed",
            "family": "signup_reward",
            "transaction_hash": "0xabc"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookNotificationSink::new(
        format!("{}/hooks/rewards", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();

    let event = NotificationEvent::TransferCompleted {
        family: LedgerFamily::SignupReward,
        event_id: Some("evt-1".to_string()),
        subject_user_id: "u1".to_string(),
        counterparty_user_id: None,
        amount: Decimal::from(100),
        wallet_address: RECIPIENT.to_string(),
        transaction_hash: "0xabc".to_string(),
    };
    sink.notify(&event).await.unwrap();
}

#[tokio::test]
async fn test_webhook_sink_reports_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = WebhookNotificationSink::new(server.uri(), Duration::from_secs(5)).unwrap();
    let event = NotificationEvent::UserIdentified {
        user_id: "u1".to_string(),
        user_handle: None,
        user_name: None,
        wallet_address: RECIPIENT.to_string(),
    };

    assert!(matches!(
        sink.notify(&event).await,
        Err(AppError::ExternalService(_))
    ));
}
