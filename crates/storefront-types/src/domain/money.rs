//! Cent arithmetic. Overflow is an error, never a wrapped or panicking value.

use crate::domain::error::DomainError;

pub fn line_total_cents(unit_price_cents: i64, quantity: u32) -> Result<i64, DomainError> {
    unit_price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| {
            DomainError::validation(format!(
                "line total out of range: {quantity} x {unit_price_cents} cents"
            ))
        })
}

pub fn sum_cents(amounts: impl IntoIterator<Item = i64>) -> Result<i64, DomainError> {
    amounts.into_iter().try_fold(0i64, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| DomainError::validation("total out of range"))
    })
}

/// Units across lines. Widened so no realistic number of lines can overflow.
pub fn sum_quantities(quantities: impl IntoIterator<Item = u32>) -> u64 {
    quantities.into_iter().map(u64::from).sum()
}
