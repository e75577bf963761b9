//! Domain Value Objects
//!
//! Immutable value types for the purchase domain.

use std::fmt;

/// Payment provider a transaction originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Apple,
    Stripe,
    Paystack,
}

impl Provider {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provider::Apple => "apple",
            Provider::Stripe => "stripe",
            Provider::Paystack => "paystack",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "apple" => Some(Provider::Apple),
            "stripe" => Some(Provider::Stripe),
            "paystack" => Some(Provider::Paystack),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction lifecycle status
///
/// A transaction is immutable once `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "success" => Some(TransactionStatus::Success),
            "failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

/// What kind of billing event a transaction records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Purchase,
    Payout,
    Refund,
}

impl TransactionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Payout => "payout",
            TransactionKind::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(TransactionKind::Purchase),
            "payout" => Some(TransactionKind::Payout),
            "refund" => Some(TransactionKind::Refund),
            _ => None,
        }
    }
}

/// Direction of money movement from the user's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionDirection {
    Debit,
    Credit,
}

impl TransactionDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionDirection::Debit => "debit",
            TransactionDirection::Credit => "credit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debit" => Some(TransactionDirection::Debit),
            "credit" => Some(TransactionDirection::Credit),
            _ => None,
        }
    }
}

/// One purchased line item extracted from a verified receipt
///
/// `original_transaction_id` is the vendor-assigned identifier that is
/// stable across renewals and re-deliveries of the same purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLineItem {
    pub product_id: String,
    pub original_transaction_id: String,
}

impl PurchaseLineItem {
    pub fn new(product_id: impl Into<String>, original_transaction_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            original_transaction_id: original_transaction_id.into(),
        }
    }
}
