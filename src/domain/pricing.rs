//! Pricing calculator.
//!
//! Every amount shown to a shopper comes from here: line totals, cart
//! subtotal, delivery fee, VAT, grand total. Pure functions over in-memory
//! line items; the fee schedule and VAT rate have exactly one definition
//! site.
//!
//! Amounts are integer minor units. The fractional factors (large-size
//! multiplier, discount percentage, VAT) are applied in `Decimal` and
//! rounded half-away-from-zero to whole minor units, once per derived
//! amount.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{Money, MoneyError, DEFAULT_CURRENCY};

/// Flat delivery fee in minor units, shared by both tiers.
pub const BASE_DELIVERY_FEE: i64 = 1000;
/// Added on top of the base fee for express delivery.
pub const EXPRESS_SURCHARGE: i64 = 1500;

/// VAT at 18%, applied to the subtotal only, never to the delivery fee.
pub fn vat_rate() -> Decimal {
    Decimal::new(18, 2)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSize {
    #[default]
    Regular,
    Large,
}

impl ItemSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Large => "large",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(Self::Regular),
            "large" => Some(Self::Large),
            _ => None,
        }
    }

    fn multiplier(&self) -> Decimal {
        match self {
            Self::Regular => Decimal::ONE,
            Self::Large => Decimal::new(15, 1),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    #[default]
    Standard,
    Express,
}

impl DeliveryOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "express" => Some(Self::Express),
            _ => None,
        }
    }

    /// Cosmetic delivery estimate shown on the confirmation screen, not a
    /// fulfillment guarantee.
    pub fn estimated_minutes(&self) -> i64 {
        match self {
            Self::Standard => 120,
            Self::Express => 30,
        }
    }
}

/// One product entry in a cart with its own quantity, size and discount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub size: ItemSize,
    #[serde(default)]
    pub discount_percent: u8,
}

/// Full money breakdown for a cart and delivery selection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricingBreakdown {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("discount must be between 0 and 100")]
    DiscountOutOfRange,
    #[error("unit price cannot be negative")]
    NegativeUnitPrice,
    #[error("amount out of range")]
    Overflow,
    #[error(transparent)]
    Money(#[from] MoneyError),
}

fn round_minor(d: Decimal) -> Result<i64, PricingError> {
    d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Overflow)
}

/// `unit_price * quantity * size_multiplier * (1 - discount/100)`, rounded
/// to whole minor units.
pub fn line_total(item: &LineItem) -> Result<Money, PricingError> {
    if item.quantity == 0 {
        return Err(PricingError::ZeroQuantity);
    }
    if item.discount_percent > 100 {
        return Err(PricingError::DiscountOutOfRange);
    }
    if item.unit_price.is_negative() {
        return Err(PricingError::NegativeUnitPrice);
    }
    let gross = Decimal::from(item.unit_price.amount())
        * Decimal::from(item.quantity)
        * item.size.multiplier();
    let keep = (Decimal::ONE_HUNDRED - Decimal::from(item.discount_percent)) / Decimal::ONE_HUNDRED;
    Ok(Money::new(round_minor(gross * keep)?, item.unit_price.currency()))
}

/// Sum of line totals. Empty cart is zero; the sum is commutative over
/// reordering. Mixed currencies are rejected.
pub fn subtotal(items: &[LineItem]) -> Result<Money, PricingError> {
    let currency = items
        .first()
        .map(|i| i.unit_price.currency().to_string())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    items.iter().try_fold(Money::zero(&currency), |acc, item| {
        Ok(acc.add(&line_total(item)?)?)
    })
}

pub fn delivery_fee(option: DeliveryOption) -> Money {
    match option {
        DeliveryOption::Standard => Money::rwf(BASE_DELIVERY_FEE),
        DeliveryOption::Express => Money::rwf(BASE_DELIVERY_FEE + EXPRESS_SURCHARGE),
    }
}

pub fn tax(subtotal: &Money) -> Result<Money, PricingError> {
    let amount = round_minor(Decimal::from(subtotal.amount()) * vat_rate())?;
    Ok(Money::new(amount, subtotal.currency()))
}

/// `subtotal + delivery_fee + tax(subtotal)`.
pub fn quote(items: &[LineItem], option: DeliveryOption) -> Result<PricingBreakdown, PricingError> {
    let subtotal = subtotal(items)?;
    let delivery_fee = delivery_fee(option);
    let tax = tax(&subtotal)?;
    let total = subtotal.add(&delivery_fee)?.add(&tax)?;
    Ok(PricingBreakdown { subtotal, delivery_fee, tax, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(price: i64, quantity: u32, size: ItemSize, discount_percent: u8) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(),
            name: "Item".into(),
            unit_price: Money::rwf(price),
            quantity,
            size,
            discount_percent,
        }
    }

    #[test]
    fn test_worked_example_standard() {
        let items = vec![
            item(2500, 1, ItemSize::Regular, 0),
            item(1200, 2, ItemSize::Regular, 0),
        ];
        let q = quote(&items, DeliveryOption::Standard).unwrap();
        assert_eq!(q.subtotal.amount(), 4900);
        assert_eq!(q.delivery_fee.amount(), 1000);
        assert_eq!(q.tax.amount(), 882);
        assert_eq!(q.total.amount(), 6782);
    }

    #[test]
    fn test_worked_example_express() {
        let items = vec![
            item(2500, 1, ItemSize::Regular, 0),
            item(1200, 2, ItemSize::Regular, 0),
        ];
        let q = quote(&items, DeliveryOption::Express).unwrap();
        assert_eq!(q.total.amount(), 8282);
    }

    #[test]
    fn test_large_size_multiplier() {
        let lt = line_total(&item(1000, 2, ItemSize::Large, 0)).unwrap();
        assert_eq!(lt.amount(), 3000);
    }

    #[test]
    fn test_half_unit_rounds_away_from_zero() {
        // 1.5 * 333 = 499.5 -> 500
        let lt = line_total(&item(333, 1, ItemSize::Large, 0)).unwrap();
        assert_eq!(lt.amount(), 500);
    }

    #[test]
    fn test_discount_applied() {
        let lt = line_total(&item(2000, 1, ItemSize::Regular, 25)).unwrap();
        assert_eq!(lt.amount(), 1500);
    }

    #[test]
    fn test_empty_cart_subtotal_is_zero() {
        assert_eq!(subtotal(&[]).unwrap().amount(), 0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert_eq!(line_total(&item(1000, 0, ItemSize::Regular, 0)), Err(PricingError::ZeroQuantity));
        assert_eq!(line_total(&item(1000, 1, ItemSize::Regular, 101)), Err(PricingError::DiscountOutOfRange));
        assert_eq!(line_total(&item(-1, 1, ItemSize::Regular, 0)), Err(PricingError::NegativeUnitPrice));
    }

    #[test]
    fn test_tax_is_18_percent_of_subtotal() {
        assert_eq!(tax(&Money::rwf(4900)).unwrap().amount(), 882);
        assert_eq!(tax(&Money::rwf(100)).unwrap().amount(), 18);
        assert_eq!(tax(&Money::rwf(0)).unwrap().amount(), 0);
    }

    #[test]
    fn test_delivery_fee_is_not_taxed() {
        let items = vec![item(100, 1, ItemSize::Regular, 0)];
        let q = quote(&items, DeliveryOption::Express).unwrap();
        assert_eq!(q.tax.amount(), 18);
        assert_eq!(q.total.amount(), 100 + 2500 + 18);
    }

    proptest! {
        #[test]
        fn prop_line_total_bounds(price in 0i64..1_000_000, qty in 1u32..100, discount in 0u8..=100, large: bool) {
            let size = if large { ItemSize::Large } else { ItemSize::Regular };
            let lt = line_total(&item(price, qty, size, discount)).unwrap().amount();
            prop_assert!(lt >= 0);
            // Upper bound allows the half-unit the rounding rule can add.
            let cap = Decimal::from(price) * Decimal::from(qty) * Decimal::new(15, 1) + Decimal::new(5, 1);
            prop_assert!(Decimal::from(lt) <= cap);
        }

        #[test]
        fn prop_subtotal_commutative(prices in proptest::collection::vec(0i64..100_000, 0..8)) {
            let items: Vec<LineItem> = prices.iter().map(|&p| item(p, 1, ItemSize::Regular, 0)).collect();
            let mut reversed = items.clone();
            reversed.reverse();
            prop_assert_eq!(subtotal(&items).unwrap(), subtotal(&reversed).unwrap());
        }

        #[test]
        fn prop_express_exceeds_standard_by_surcharge(prices in proptest::collection::vec(1i64..100_000, 1..6)) {
            let items: Vec<LineItem> = prices.iter().map(|&p| item(p, 1, ItemSize::Regular, 0)).collect();
            let standard = quote(&items, DeliveryOption::Standard).unwrap().total.amount();
            let express = quote(&items, DeliveryOption::Express).unwrap().total.amount();
            prop_assert_eq!(express - standard, EXPRESS_SURCHARGE);
        }
    }
}
