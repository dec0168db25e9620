//! Monetary amount conversion
//!
//! Domain amounts are major-unit floats (`10.50`); wire amounts are integer
//! minor-unit strings without separators (`"1050"`).

use crate::error::{AppError, AppResult};

/// Amount in major units to its minor-unit wire form
pub fn to_wire(amount: f64) -> AppResult<String> {
    Ok(to_minor_units(amount)?.to_string())
}

/// Amount in major units to minor units, rounded to the cent
pub fn to_minor_units(amount: f64) -> AppResult<i64> {
    if !amount.is_finite() {
        return Err(AppError::invalid_amount(format!(
            "{} is not a finite number",
            amount
        )));
    }
    if amount < 0.0 {
        return Err(AppError::invalid_amount(format!(
            "{} is negative",
            amount
        )));
    }

    let cents = (amount * 100.0).round();
    if cents > i64::MAX as f64 {
        return Err(AppError::invalid_amount(format!("{} is too large", amount)));
    }
    Ok(cents as i64)
}

/// Minor-unit wire string back to major units
pub fn from_wire(value: &str) -> AppResult<f64> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::invalid_amount(format!(
            "'{}' is not a minor-unit integer",
            value
        )));
    }
    let cents: i64 = value
        .parse()
        .map_err(|e| AppError::invalid_amount(format!("'{}': {}", value, e)))?;
    Ok(cents as f64 / 100.0)
}
