//! Fixed-point conversion of payout amounts and clock helpers.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised when a decimal amount cannot be represented on-chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
	#[error("amount must be positive, got {0}")]
	NotPositive(Decimal),
	#[error("amount {amount} has more than {decimals} fractional digits")]
	TooPrecise { amount: Decimal, decimals: u8 },
	#[error("amount {0} overflows uint256")]
	Overflow(Decimal),
}

/// Scales a decimal amount into the token's integer representation.
///
/// `10.5` with 18 decimals becomes `10500000000000000000`. Fractional digits
/// beyond `decimals` are rejected rather than truncated.
pub fn parse_units(amount: &Decimal, decimals: u8) -> Result<U256, UnitsError> {
	if amount.is_sign_negative() || amount.is_zero() {
		return Err(UnitsError::NotPositive(*amount));
	}

	let normalized = amount.normalize();
	let scale = normalized.scale();
	if scale > u32::from(decimals) {
		return Err(UnitsError::TooPrecise {
			amount: *amount,
			decimals,
		});
	}

	// Positive and at most 96 bits, so the mantissa fits a u128.
	let mantissa = U256::from(normalized.mantissa().unsigned_abs());
	let factor = U256::from(10u64).pow(U256::from(u32::from(decimals) - scale));
	mantissa
		.checked_mul(factor)
		.ok_or(UnitsError::Overflow(*amount))
}

/// Current UNIX timestamp in seconds, 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}
