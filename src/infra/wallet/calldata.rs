//! ERC-20 call data encoding.

use rust_decimal::Decimal;

use crate::domain::{AppError, ValidationError};

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: &str = "a9059cbb";

/// Decimals of every token this service moves
pub const TOKEN_DECIMALS: u32 = 18;

/// Convert a whole-token amount to base units.
///
/// Fails on negative amounts, on more fractional digits than the token
/// carries, and on overflow.
pub fn to_base_units(amount: Decimal) -> Result<u128, AppError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(invalid_amount("Amount must not be negative"));
    }

    let amount = amount.normalize();
    let scale = amount.scale();
    if scale > TOKEN_DECIMALS {
        return Err(invalid_amount("Amount has more than 18 decimal places"));
    }

    let mantissa = u128::try_from(amount.mantissa())
        .map_err(|_| invalid_amount("Amount must not be negative"))?;
    10u128
        .checked_pow(TOKEN_DECIMALS - scale)
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| invalid_amount("Amount overflows uint256 encoding"))
}

/// Encode `transfer(recipient, amount)` as a 0x-prefixed hex string
pub fn encode_transfer(recipient: &str, amount: Decimal) -> Result<String, AppError> {
    let address = parse_address(recipient)?;
    let base_units = to_base_units(amount)?;
    Ok(format!(
        "0x{TRANSFER_SELECTOR}{:0>64}{:064x}",
        address.to_lowercase(),
        base_units
    ))
}

fn parse_address(address: &str) -> Result<&str, AppError> {
    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::Validation(ValidationError::InvalidField {
            field: "recipient".to_string(),
            message: format!("Not an EVM address: {}", address),
        }));
    }
    Ok(hex)
}

fn invalid_amount(message: &str) -> AppError {
    AppError::Validation(ValidationError::InvalidField {
        field: "amount".to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const RECIPIENT: &str = "0x00000000000000000000000000000000DeaDBeef";

    #[test]
    fn test_base_units() {
        assert_eq!(
            to_base_units(Decimal::from(100)).unwrap(),
            100_000_000_000_000_000_000
        );
        assert_eq!(
            to_base_units(Decimal::from_str("0.5").unwrap()).unwrap(),
            500_000_000_000_000_000
        );
        assert_eq!(to_base_units(Decimal::ZERO).unwrap(), 0);
        assert_eq!(
            to_base_units(Decimal::from_str("1.500000000000000000000").unwrap()).unwrap(),
            1_500_000_000_000_000_000
        );
    }

    #[test]
    fn test_base_units_rejects_bad_amounts() {
        assert!(to_base_units(Decimal::from(-1)).is_err());
        assert!(to_base_units(Decimal::from_str("0.0000000000000000001").unwrap()).is_err());
        // 7.9e28 * 1e18 does not fit in u128
        assert!(matches!(
            to_base_units(Decimal::MAX),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_encode_transfer() {
        let data = encode_transfer(RECIPIENT, Decimal::ONE).unwrap();

        assert_eq!(data.len(), 2 + 8 + 64 + 64);
        assert!(data.starts_with("0xa9059cbb"));
        assert_eq!(
            &data[10..74],
            "00000000000000000000000000000000000000000000000000000000deadbeef"
        );
        assert_eq!(
            &data[74..],
            "0000000000000000000000000000000000000000000000000de0b6b3a7640000"
        );
    }

    #[test]
    fn test_encode_transfer_rejects_bad_address() {
        assert!(encode_transfer("0x1234", Decimal::ONE).is_err());
        assert!(encode_transfer("not-an-address-at-all-not-an-address-xyz", Decimal::ONE).is_err());
    }
}
