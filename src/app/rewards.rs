//! Sign-up reward composition.
//!
//! A new-user event may request up to three independent rewards. They run in
//! the fixed order signup → referral → link, each through the
//! [`TransactionEngine`] under its own family but the same outer event id.
//! The first requested reward that does not succeed stops the chain and the
//! user stays unknown. Redelivery of the event resumes at the first reward
//! that is not yet `Success`, because the ones before it are pure reads.

use rust_decimal::Decimal;
use std::env;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use super::engine::TransactionEngine;
use crate::domain::{
    AppError, Clock, EntryDetails, LedgerFamily, LedgerStore, NewUserEvent, NotificationEvent,
    NotificationSink, Recipient, SenderContext, TransferIntent, TransferOutcome, TransferPayload,
    TransferRequest, UserRecord, UserResolver, ValidationError,
};

pub const SIGNUP_REASON: &str = "user_sign_up";
pub const REFERRAL_REASON: &str = "referral_reward";
pub const LINK_REASON: &str = "referral_link";

/// Reward token and amounts
#[derive(Debug, Clone)]
pub struct RewardConfig {
    pub chain_id: String,
    pub token_address: String,
    pub signup_amount: Decimal,
    pub referral_amount: Decimal,
    pub link_amount: Decimal,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            chain_id: "eip155:137".to_string(),
            token_address: "0xe36BD65609c08Cd17b53520293523CF4560533d0".to_string(),
            signup_amount: Decimal::from(100),
            referral_amount: Decimal::from(50),
            link_amount: Decimal::from(10),
        }
    }
}

impl RewardConfig {
    /// Read overrides from `REWARD_*` variables, keeping defaults for
    /// anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chain_id: env::var("REWARD_CHAIN_ID").unwrap_or(defaults.chain_id),
            token_address: env::var("REWARD_TOKEN_ADDRESS").unwrap_or(defaults.token_address),
            signup_amount: decimal_env("REWARD_SIGNUP_AMOUNT").unwrap_or(defaults.signup_amount),
            referral_amount: decimal_env("REWARD_REFERRAL_AMOUNT")
                .unwrap_or(defaults.referral_amount),
            link_amount: decimal_env("REWARD_LINK_AMOUNT").unwrap_or(defaults.link_amount),
        }
    }
}

fn decimal_env(key: &str) -> Option<Decimal> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Reward composition guard for new-user events
pub struct RewardService {
    engine: Arc<TransactionEngine>,
    store: Arc<dyn LedgerStore>,
    resolver: Arc<dyn UserResolver>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: RewardConfig,
}

impl RewardService {
    #[must_use]
    pub fn new(
        engine: Arc<TransactionEngine>,
        store: Arc<dyn LedgerStore>,
        resolver: Arc<dyn UserResolver>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: RewardConfig,
    ) -> Self {
        Self {
            engine,
            store,
            resolver,
            notifier,
            clock,
            config,
        }
    }

    /// Handle one new-user event. `true` only when every requested reward
    /// succeeded and the user record was written.
    #[instrument(skip(self, event), fields(event_id = %event.event_id, user_id = %event.user_id))]
    pub async fn handle_new_user(&self, event: &NewUserEvent) -> bool {
        match self.compose(event).await {
            Ok(done) => done,
            Err(e) => {
                error!(error = %e, "New user event failed");
                false
            }
        }
    }

    async fn compose(&self, event: &NewUserEvent) -> Result<bool, AppError> {
        event.validate()?;

        if event.needs_signup_reward && !self.signup_reward(event).await?.is_success() {
            info!("Signup reward not completed, stopping");
            return Ok(false);
        }

        if event.needs_referral_reward && !self.referral_reward(event).await?.is_success() {
            info!("Referral reward not completed, stopping");
            return Ok(false);
        }

        if event.needs_link_reward && !self.link_reward(event).await?.is_success() {
            info!("Link reward not completed, stopping");
            return Ok(false);
        }

        self.promote_user(event).await?;
        Ok(true)
    }

    /// Reward the new user for signing up
    pub async fn signup_reward(&self, event: &NewUserEvent) -> Result<TransferOutcome, AppError> {
        let intent = self.reward_intent(
            LedgerFamily::SignupReward,
            event,
            event.user_id.clone(),
            None,
            self.config.signup_amount,
            SIGNUP_REASON,
            "Sign up reward",
        );
        self.engine.process(&intent).await
    }

    /// Reward the user who referred the new user
    pub async fn referral_reward(&self, event: &NewUserEvent) -> Result<TransferOutcome, AppError> {
        let referrer = required(&event.referent_user_id, "referentUserId")?;
        let intent = self.reward_intent(
            LedgerFamily::ReferralReward,
            event,
            referrer,
            Some(event.user_id.clone()),
            self.config.referral_amount,
            REFERRAL_REASON,
            "Referral reward",
        );
        self.engine.process(&intent).await
    }

    /// Reward the user whose shared link brought the new user in
    pub async fn link_reward(&self, event: &NewUserEvent) -> Result<TransferOutcome, AppError> {
        let sponsor = required(&event.link_sponsor_user_id, "linkSponsorUserId")?;
        let intent = self.reward_intent(
            LedgerFamily::LinkReward,
            event,
            sponsor,
            Some(event.user_id.clone()),
            self.config.link_amount,
            LINK_REASON,
            "Referral link reward",
        );
        self.engine.process(&intent).await
    }

    #[allow(clippy::too_many_arguments)]
    fn reward_intent(
        &self,
        family: LedgerFamily,
        event: &NewUserEvent,
        subject_user_id: String,
        counterparty_user_id: Option<String>,
        amount: Decimal,
        reason: &str,
        message: &str,
    ) -> TransferIntent {
        TransferIntent {
            family,
            event_id: event.event_id.clone(),
            subject_user_id,
            counterparty_user_id,
            amount,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            details: EntryDetails::None,
            request: TransferRequest {
                sender: SenderContext::Treasury,
                recipient: Recipient::Subject,
                payload: TransferPayload::Token {
                    chain_id: self.config.chain_id.clone(),
                    token_address: self.config.token_address.clone(),
                    amount,
                },
            },
        }
    }

    async fn promote_user(&self, event: &NewUserEvent) -> Result<(), AppError> {
        let wallet_address = self.resolver.resolve_wallet(&event.user_id).await?;
        let user = UserRecord {
            user_id: event.user_id.clone(),
            user_handle: event.user_handle.clone(),
            user_name: event.user_name.clone(),
            wallet_address: wallet_address.clone(),
            date_added: self.clock.now(),
        };
        self.store.upsert_user(&user).await?;
        info!("User record created");

        let identify = NotificationEvent::UserIdentified {
            user_id: user.user_id,
            user_handle: user.user_handle,
            user_name: user.user_name,
            wallet_address,
        };
        if let Err(e) = self.notifier.notify(&identify).await {
            warn!(error = %e, "Identify notification failed, ignoring");
        }
        Ok(())
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, AppError> {
    value
        .as_ref()
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| AppError::Validation(ValidationError::MissingField(field.to_string())))
}
