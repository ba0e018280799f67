//! Order domain: delivery address, payment kind, status lifecycle, and
//! draft assembly for submission.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::pricing::{self, DeliveryOption, LineItem, PricingBreakdown, PricingError};

pub(crate) fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

pub fn generate_order_number() -> String {
    format!("ORD-{:08}", rand::random::<u32>() % 100_000_000)
}

/// Where an order ships to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DeliveryAddress {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.name.trim().is_empty() {
            return Err(OrderError::MissingField("name"));
        }
        if self.phone.trim().is_empty() {
            return Err(OrderError::MissingField("phone"));
        }
        if self.street.trim().is_empty() {
            return Err(OrderError::MissingField("street"));
        }
        if self.city.trim().is_empty() {
            return Err(OrderError::MissingField("city"));
        }
        if digit_count(&self.phone) < 10 {
            return Err(OrderError::InvalidPhone);
        }
        Ok(())
    }
}

/// How the shopper pays. Orders persist the kind only; card details never
/// leave the checkout wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Momo,
    Card,
    Cash,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Momo => "momo",
            Self::Card => "card",
            Self::Cash => "cash",
        }
    }
}

/// Admin-driven lifecycle; nothing computes these automatically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Processing) | (Processing, Shipped) | (Shipped, Delivered) => true,
            (Delivered, _) | (Cancelled, _) => false,
            (_, Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validates an admin-requested status change.
pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderError::IllegalTransition { from, to })
    }
}

/// A validated, fully priced order ready to persist. Construction is the
/// only way to get one, so a draft always carries server-computed totals.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub order_number: String,
    pub user_id: Uuid,
    pub lines: Vec<LineItem>,
    pub address: DeliveryAddress,
    pub delivery_option: DeliveryOption,
    pub payment: PaymentKind,
    pub totals: PricingBreakdown,
}

impl OrderDraft {
    pub fn new(
        user_id: Uuid,
        lines: Vec<LineItem>,
        address: DeliveryAddress,
        delivery_option: DeliveryOption,
        payment: PaymentKind,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        address.validate()?;
        let totals = pricing::quote(&lines, delivery_option)?;
        Ok(Self {
            order_number: generate_order_number(),
            user_id,
            lines,
            address,
            delivery_option,
            payment,
            totals,
        })
    }

    /// Cosmetic estimate shown to the shopper, not a delivery guarantee.
    pub fn estimated_delivery_at(&self) -> DateTime<Utc> {
        Utc::now() + Duration::minutes(self.delivery_option.estimated_minutes())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order has no items")]
    EmptyOrder,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("phone number must have at least 10 digits")]
    InvalidPhone,
    #[error("cannot change status from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::ItemSize;
    use crate::domain::value_objects::Money;

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            name: "Aline U.".into(),
            phone: "0788123456".into(),
            street: "KG 11 Ave 42".into(),
            city: "Kigali".into(),
            notes: None,
        }
    }

    fn line(price: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(),
            name: "Beans".into(),
            unit_price: Money::rwf(price),
            quantity,
            size: ItemSize::Regular,
            discount_percent: 0,
        }
    }

    #[test]
    fn test_empty_order_rejected() {
        let err = OrderDraft::new(
            Uuid::new_v4(),
            vec![],
            address(),
            DeliveryOption::Standard,
            PaymentKind::Cash,
        )
        .unwrap_err();
        assert_eq!(err, OrderError::EmptyOrder);
    }

    #[test]
    fn test_draft_totals_match_quote() {
        let draft = OrderDraft::new(
            Uuid::new_v4(),
            vec![line(2500, 1), line(1200, 2)],
            address(),
            DeliveryOption::Standard,
            PaymentKind::Momo,
        )
        .unwrap();
        assert_eq!(draft.totals.subtotal.amount(), 4900);
        assert_eq!(draft.totals.total.amount(), 6782);
        assert!(draft.order_number.starts_with("ORD-"));
    }

    #[test]
    fn test_address_validation() {
        let mut a = address();
        a.city = "  ".into();
        assert_eq!(a.validate(), Err(OrderError::MissingField("city")));

        let mut a = address();
        a.phone = "123".into();
        assert_eq!(a.validate(), Err(OrderError::InvalidPhone));
    }

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Processing));
        assert!(Delivered.is_terminal());
    }

    #[test]
    fn test_illegal_transition_error() {
        let err = transition(OrderStatus::Delivered, OrderStatus::Cancelled).unwrap_err();
        assert_eq!(
            err,
            OrderError::IllegalTransition { from: OrderStatus::Delivered, to: OrderStatus::Cancelled }
        );
    }
}
