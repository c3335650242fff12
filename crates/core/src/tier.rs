//! Subscription tiers and the feature gates they control.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Paid plan a service provider is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Basic,
    Pro,
    Business,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Business => "business",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "basic" => Ok(Self::Basic),
            "pro" => Ok(Self::Pro),
            "business" => Ok(Self::Business),
            other => Err(CoreError::Validation(format!("Unknown tier '{other}'"))),
        }
    }

    /// Maximum number of simultaneously pending quotes; `None` is unlimited.
    pub fn pending_quote_allowance(&self) -> Option<i64> {
        match self {
            Self::Basic => Some(5),
            Self::Pro => Some(30),
            Self::Business => None,
        }
    }
}

/// Billing state mirrored from the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    None,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::None => "none",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "active" => Ok(Self::Active),
            "trialing" => Ok(Self::Trialing),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            "none" => Ok(Self::None),
            other => Err(CoreError::Validation(format!(
                "Unknown subscription status '{other}'"
            ))),
        }
    }

    pub fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// The tier whose features a user actually gets. A lapsed subscription falls
/// back to basic.
pub fn effective_tier(tier: Tier, status: SubscriptionStatus) -> Tier {
    if status.is_entitled() {
        tier
    } else {
        Tier::Basic
    }
}

/// Check whether a provider with `pending` open quotes may submit another.
pub fn check_quote_allowance(tier: Tier, pending: i64) -> Result<(), CoreError> {
    match tier.pending_quote_allowance() {
        Some(limit) if pending >= limit => Err(CoreError::Forbidden(format!(
            "The {} plan allows {limit} pending quotes; upgrade to send more",
            tier.as_str()
        ))),
        _ => Ok(()),
    }
}
