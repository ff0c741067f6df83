//! Fixed-rate quote calculator.

use rust_decimal::Decimal;
use std::env;

use crate::domain::{ConfigError, QuoteAmounts, QuoteCalculator, QuoteRequest};

/// Decimal places kept on computed amounts
const QUOTE_DP: u32 = 18;

/// Prices G1 and GX at configured USD rates
#[derive(Debug, Clone, Copy)]
pub struct FixedRateQuoteCalculator {
    /// USD per G1
    g1_usd_rate: Decimal,
    /// USD per GX
    gx_usd_rate: Decimal,
}

impl FixedRateQuoteCalculator {
    pub fn new(g1_usd_rate: Decimal, gx_usd_rate: Decimal) -> Result<Self, ConfigError> {
        if g1_usd_rate.is_sign_negative() {
            return Err(ConfigError::InvalidValue {
                key: "G1_USD_RATE".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        if gx_usd_rate <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                key: "GX_USD_RATE".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(Self {
            g1_usd_rate,
            gx_usd_rate,
        })
    }

    /// Load `G1_USD_RATE` and `GX_USD_RATE`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(rate_from_env("G1_USD_RATE")?, rate_from_env("GX_USD_RATE")?)
    }
}

fn rate_from_env(key: &str) -> Result<Decimal, ConfigError> {
    let raw = env::var(key).map_err(|_| ConfigError::MissingEnv(key.to_string()))?;
    raw.parse().map_err(|e: rust_decimal::Error| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

impl QuoteCalculator for FixedRateQuoteCalculator {
    fn compute(&self, request: &QuoteRequest) -> QuoteAmounts {
        let usd_from_g1_investment = request
            .g1_quantity
            .saturating_mul(self.g1_usd_rate)
            .round_dp(QUOTE_DP);
        let equivalent_usd_invested = request.usd_quantity.saturating_add(usd_from_g1_investment);
        let gx_received = equivalent_usd_invested
            .checked_div(self.gx_usd_rate)
            .unwrap_or(Decimal::ZERO)
            .round_dp(QUOTE_DP);

        QuoteAmounts {
            usd_from_usd_investment: request.usd_quantity,
            usd_from_g1_investment,
            equivalent_usd_invested,
            gx_usd_exchange_rate: self.gx_usd_rate,
            gx_received,
        }
    }
}
