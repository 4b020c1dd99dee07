//! Order totals computed with decimal arithmetic.
//!
//! All amounts are integers in the currency's minor unit (e.g. cents).
//! VAT is a whole percentage per line item; each line's tax is rounded
//! half away from zero before summing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors raised while computing totals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("vat rate cannot be negative")]
    NegativeVat,
    #[error("shipping cannot be negative")]
    NegativeShipping,
    #[error("order total is too large")]
    Overflow,
}

/// The priced part of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    /// Unit price in minor units.
    pub price: i64,
    /// Number of units.
    pub quantity: i32,
    /// VAT rate in percent.
    pub vat: i32,
}

/// Monetary summary of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub taxes: i64,
    pub shipping: i64,
    pub total: i64,
}

impl OrderTotals {
    /// Compute totals for a set of line items plus a flat shipping amount.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] for negative prices, VAT or shipping, a
    /// quantity below one, or a total that does not fit in `i64`.
    pub fn compute<I>(lines: I, shipping: i64) -> Result<Self, PriceError>
    where
        I: IntoIterator<Item = LineAmount>,
    {
        if shipping < 0 {
            return Err(PriceError::NegativeShipping);
        }

        let mut subtotal = Decimal::ZERO;
        let mut taxes = Decimal::ZERO;

        for line in lines {
            if line.price < 0 {
                return Err(PriceError::NegativePrice);
            }
            if line.quantity < 1 {
                return Err(PriceError::InvalidQuantity);
            }
            if line.vat < 0 {
                return Err(PriceError::NegativeVat);
            }

            let amount = Decimal::from(line.price)
                .checked_mul(Decimal::from(line.quantity))
                .ok_or(PriceError::Overflow)?;
            let tax = amount
                .checked_mul(Decimal::from(line.vat))
                .ok_or(PriceError::Overflow)?
                / Decimal::ONE_HUNDRED;
            let tax = tax.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

            subtotal = subtotal.checked_add(amount).ok_or(PriceError::Overflow)?;
            taxes = taxes.checked_add(tax).ok_or(PriceError::Overflow)?;
        }

        let subtotal = subtotal.to_i64().ok_or(PriceError::Overflow)?;
        let taxes = taxes.to_i64().ok_or(PriceError::Overflow)?;
        let total = subtotal
            .checked_add(taxes)
            .and_then(|t| t.checked_add(shipping))
            .ok_or(PriceError::Overflow)?;

        Ok(Self {
            subtotal,
            taxes,
            shipping,
            total,
        })
    }
}
