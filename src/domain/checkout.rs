//! Checkout wizard.
//!
//! Linear three-stage flow: delivery address, payment selection,
//! confirmation. Each transition is guarded by validation; a failed guard
//! leaves the stage unchanged so the shopper can edit and resubmit.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::domain::aggregates::cart::Cart;
use crate::domain::aggregates::order::{
    digit_count, generate_order_number, DeliveryAddress, OrderError, PaymentKind,
};
use crate::domain::pricing::{self, DeliveryOption, PricingBreakdown, PricingError};

/// Payment details entered on the selection screen. Card data lives only
/// inside the wizard; orders persist the method kind alone.
#[derive(Clone, Debug)]
pub enum PaymentMethod {
    Momo { phone: String },
    Card { number: String, holder: String, expiry: String, cvv: String },
    Cash,
}

impl PaymentMethod {
    pub fn kind(&self) -> PaymentKind {
        match self {
            Self::Momo { .. } => PaymentKind::Momo,
            Self::Card { .. } => PaymentKind::Card,
            Self::Cash => PaymentKind::Cash,
        }
    }

    pub fn validate(&self) -> Result<(), CheckoutError> {
        match self {
            Self::Momo { phone } => {
                if digit_count(phone) < 10 {
                    return Err(CheckoutError::InvalidMomoNumber);
                }
            }
            Self::Card { number, holder, expiry, cvv } => {
                if digit_count(number) < 16 {
                    return Err(CheckoutError::InvalidCardNumber);
                }
                if holder.trim().is_empty() {
                    return Err(CheckoutError::MissingCardHolder);
                }
                if expiry.trim().len() < 5 {
                    return Err(CheckoutError::InvalidExpiry);
                }
                if cvv.trim().len() < 3 {
                    return Err(CheckoutError::InvalidCvv);
                }
            }
            Self::Cash => {}
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Address,
    PaymentSelection,
    Confirmed,
}

/// What the confirmation screen shows. The delivery estimate is cosmetic.
#[derive(Clone, Debug)]
pub struct Confirmation {
    pub order_reference: String,
    pub totals: PricingBreakdown,
    pub payment: PaymentKind,
    pub address: DeliveryAddress,
    pub estimated_delivery_at: DateTime<Utc>,
}

/// The wizard itself. Holds the one cart instance for the session; totals
/// are re-derived from it at confirmation time rather than threaded through
/// as loose parameters.
#[derive(Clone, Debug)]
pub struct CheckoutFlow {
    cart: Cart,
    delivery_option: DeliveryOption,
    address: Option<DeliveryAddress>,
    confirmation: Option<Confirmation>,
}

impl CheckoutFlow {
    /// Starts a checkout over a non-empty cart.
    pub fn begin(cart: Cart, delivery_option: DeliveryOption) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(Self { cart, delivery_option, address: None, confirmation: None })
    }

    pub fn stage(&self) -> Stage {
        if self.confirmation.is_some() {
            Stage::Confirmed
        } else if self.address.is_some() {
            Stage::PaymentSelection
        } else {
            Stage::Address
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn delivery_option(&self) -> DeliveryOption {
        self.delivery_option
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn submit_address(&mut self, address: DeliveryAddress) -> Result<(), CheckoutError> {
        if self.stage() != Stage::Address {
            return Err(CheckoutError::WrongStage(self.stage()));
        }
        address.validate()?;
        self.address = Some(address);
        Ok(())
    }

    /// Back to the address screen; the entered address is discarded.
    pub fn back(&mut self) {
        if self.stage() == Stage::PaymentSelection {
            self.address = None;
        }
    }

    pub fn select_payment(&mut self, payment: PaymentMethod) -> Result<Confirmation, CheckoutError> {
        let address = match (&self.confirmation, &self.address) {
            (None, Some(addr)) => addr.clone(),
            _ => return Err(CheckoutError::WrongStage(self.stage())),
        };
        payment.validate()?;
        let totals = pricing::quote(self.cart.items(), self.delivery_option)?;
        let confirmation = Confirmation {
            order_reference: generate_order_number(),
            totals,
            payment: payment.kind(),
            address,
            estimated_delivery_at: Utc::now()
                + Duration::minutes(self.delivery_option.estimated_minutes()),
        };
        self.confirmation = Some(confirmation.clone());
        Ok(confirmation)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("card number must have at least 16 digits")]
    InvalidCardNumber,
    #[error("cardholder name is required")]
    MissingCardHolder,
    #[error("expiry must be in MM/YY form")]
    InvalidExpiry,
    #[error("security code must have at least 3 digits")]
    InvalidCvv,
    #[error("mobile money number must have at least 10 digits")]
    InvalidMomoNumber,
    #[error("operation not valid on the {0:?} screen")]
    WrongStage(Stage),
    #[error(transparent)]
    Address(#[from] OrderError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::{ItemSize, LineItem};
    use crate::domain::value_objects::Money;
    use uuid::Uuid;

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(LineItem {
            product_id: Uuid::new_v4(),
            name: "Rice 5kg".into(),
            unit_price: Money::rwf(2500),
            quantity: 1,
            size: ItemSize::Regular,
            discount_percent: 0,
        });
        cart.add(LineItem {
            product_id: Uuid::new_v4(),
            name: "Milk".into(),
            unit_price: Money::rwf(1200),
            quantity: 2,
            size: ItemSize::Regular,
            discount_percent: 0,
        });
        cart
    }

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            name: "Eric N.".into(),
            phone: "0788000111".into(),
            street: "KK 5 Rd 10".into(),
            city: "Kigali".into(),
            notes: Some("call at the gate".into()),
        }
    }

    #[test]
    fn test_empty_cart_cannot_begin() {
        let err = CheckoutFlow::begin(Cart::new(), DeliveryOption::Standard).unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
    }

    #[test]
    fn test_happy_path_cash() {
        let mut flow = CheckoutFlow::begin(cart(), DeliveryOption::Standard).unwrap();
        assert_eq!(flow.stage(), Stage::Address);

        flow.submit_address(address()).unwrap();
        assert_eq!(flow.stage(), Stage::PaymentSelection);

        let confirmation = flow.select_payment(PaymentMethod::Cash).unwrap();
        assert_eq!(flow.stage(), Stage::Confirmed);
        assert_eq!(confirmation.totals.total.amount(), 6782);
        assert_eq!(confirmation.payment, PaymentKind::Cash);
        assert!(confirmation.order_reference.starts_with("ORD-"));
    }

    #[test]
    fn test_invalid_address_keeps_stage() {
        let mut flow = CheckoutFlow::begin(cart(), DeliveryOption::Standard).unwrap();
        let mut bad = address();
        bad.name = String::new();
        assert!(flow.submit_address(bad).is_err());
        assert_eq!(flow.stage(), Stage::Address);
    }

    #[test]
    fn test_short_card_number_keeps_stage() {
        let mut flow = CheckoutFlow::begin(cart(), DeliveryOption::Standard).unwrap();
        flow.submit_address(address()).unwrap();

        let err = flow
            .select_payment(PaymentMethod::Card {
                number: "411111111111111".into(), // 15 digits
                holder: "ERIC N".into(),
                expiry: "12/27".into(),
                cvv: "123".into(),
            })
            .unwrap_err();
        assert_eq!(err, CheckoutError::InvalidCardNumber);
        assert_eq!(flow.stage(), Stage::PaymentSelection);
    }

    #[test]
    fn test_momo_number_validated() {
        let mut flow = CheckoutFlow::begin(cart(), DeliveryOption::Express).unwrap();
        flow.submit_address(address()).unwrap();
        let err = flow
            .select_payment(PaymentMethod::Momo { phone: "078812".into() })
            .unwrap_err();
        assert_eq!(err, CheckoutError::InvalidMomoNumber);

        let confirmation = flow
            .select_payment(PaymentMethod::Momo { phone: "0788123456".into() })
            .unwrap();
        assert_eq!(confirmation.totals.total.amount(), 8282);
    }

    #[test]
    fn test_back_discards_address() {
        let mut flow = CheckoutFlow::begin(cart(), DeliveryOption::Standard).unwrap();
        flow.submit_address(address()).unwrap();
        flow.back();
        assert_eq!(flow.stage(), Stage::Address);
    }

    #[test]
    fn test_payment_before_address_rejected() {
        let mut flow = CheckoutFlow::begin(cart(), DeliveryOption::Standard).unwrap();
        let err = flow.select_payment(PaymentMethod::Cash).unwrap_err();
        assert_eq!(err, CheckoutError::WrongStage(Stage::Address));
    }

    #[test]
    fn test_confirmed_flow_is_terminal() {
        let mut flow = CheckoutFlow::begin(cart(), DeliveryOption::Standard).unwrap();
        flow.submit_address(address()).unwrap();
        flow.select_payment(PaymentMethod::Cash).unwrap();
        assert!(flow.select_payment(PaymentMethod::Cash).is_err());
        assert!(flow.confirmation().is_some());
    }

    #[test]
    fn test_estimates_differ_by_tier() {
        for (option, minutes) in [(DeliveryOption::Standard, 120), (DeliveryOption::Express, 30)] {
            let mut flow = CheckoutFlow::begin(cart(), option).unwrap();
            flow.submit_address(address()).unwrap();
            let before = Utc::now();
            let confirmation = flow.select_payment(PaymentMethod::Cash).unwrap();
            let eta = confirmation.estimated_delivery_at - before;
            assert!(eta >= Duration::minutes(minutes));
            assert!(eta < Duration::minutes(minutes + 1));
        }
    }
}
