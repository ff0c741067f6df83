//! Swap execution from a user's custodial wallet.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

use super::engine::TransactionEngine;
use crate::domain::{
    AppError, EntryDetails, LedgerFamily, Recipient, SenderContext, SwapDetails, SwapEvent,
    TransferIntent, TransferPayload, TransferRequest,
};

/// Runs swap events through the engine under the `swap` family
pub struct SwapService {
    engine: Arc<TransactionEngine>,
    default_chain_id: String,
}

impl SwapService {
    #[must_use]
    pub fn new(engine: Arc<TransactionEngine>, default_chain_id: impl Into<String>) -> Self {
        Self {
            engine,
            default_chain_id: default_chain_id.into(),
        }
    }

    #[instrument(skip(self, event), fields(event_id = %event.event_id, user_id = %event.user_id))]
    pub async fn handle_swap(&self, event: &SwapEvent) -> bool {
        match self.execute(event).await {
            Ok(success) => success,
            Err(e) => {
                error!(error = %e, "Swap event failed");
                false
            }
        }
    }

    async fn execute(&self, event: &SwapEvent) -> Result<bool, AppError> {
        event.validate()?;
        let outcome = self.engine.process(&self.intent(event)).await?;
        info!(?outcome, "Swap processed");
        Ok(outcome.is_success())
    }

    fn intent(&self, event: &SwapEvent) -> TransferIntent {
        let chain_id = event
            .chain_id
            .clone()
            .unwrap_or_else(|| self.default_chain_id.clone());

        TransferIntent {
            family: LedgerFamily::Swap,
            event_id: event.event_id.clone(),
            subject_user_id: event.user_id.clone(),
            counterparty_user_id: None,
            // amounts arrive as base-unit strings; non-numeric ones are recorded as zero
            amount: event.amount_in.parse().unwrap_or(Decimal::ZERO),
            reason: Some("swap".to_string()),
            message: None,
            details: EntryDetails::Swap(SwapDetails {
                chain_id: chain_id.clone(),
                token_in: event.token_in.clone(),
                amount_in: event.amount_in.clone(),
                token_out: event.token_out.clone(),
                amount_out: event.amount_out.clone(),
            }),
            request: TransferRequest {
                sender: SenderContext::User(event.user_id.clone()),
                recipient: Recipient::Address(event.to.clone()),
                payload: TransferPayload::ContractCall {
                    chain_id,
                    data: event.data.clone(),
                    value: event.value.clone(),
                },
            },
        }
    }
}
