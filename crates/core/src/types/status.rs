//! Order lifecycle states.
//!
//! All three states are stored as lowercase text and serialized the same
//! way on the wire.

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted state string is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct InvalidState {
    kind: &'static str,
    value: String,
}

/// Payment state of an order.
///
/// Once an order is `Paid`, its currency and billing address are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentState {
    /// Lowercase wire/database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    /// Whether payment-related fields are locked.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// Fulfillment state of an order.
///
/// Any state past `Pending` freezes the shipping address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentState {
    #[default]
    Pending,
    Shipping,
    Shipped,
}

impl FulfillmentState {
    /// Lowercase wire/database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Shipping => "shipping",
            Self::Shipped => "shipped",
        }
    }

    /// Whether the shipping address can no longer change.
    #[must_use]
    pub const fn locks_shipping_address(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Overall order state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    #[default]
    Pending,
    Paid,
    Shipped,
    Failed,
}

impl OrderState {
    /// Lowercase wire/database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Failed => "failed",
        }
    }
}

macro_rules! impl_state_text {
    ($name:ident, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidState;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == Self::$variant.as_str() {
                        return Ok(Self::$variant);
                    }
                )+
                Err(InvalidState {
                    kind: $kind,
                    value: s.to_owned(),
                })
            }
        }
    };
}

impl_state_text!(PaymentState, "payment state", [Pending, Paid, Failed]);
impl_state_text!(
    FulfillmentState,
    "fulfillment state",
    [Pending, Shipping, Shipped]
);
impl_state_text!(OrderState, "order state", [Pending, Paid, Shipped, Failed]);
