//! Cart aggregate.

use uuid::Uuid;

use crate::domain::pricing::{self, ItemSize, LineItem, PricingError};
use crate::domain::value_objects::Money;

/// Ordered line-item list for one shopper session. The single cart
/// representation: screens and the checkout flow all share this type
/// instead of seeding their own arrays.
#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self { items: vec![] }
    }

    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            cart.add(item);
        }
        cart
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds a line, merging into an existing `(product_id, size)` line
    /// instead of duplicating the row.
    pub fn add(&mut self, item: LineItem) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id && i.size == item.size)
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Removing an absent line is a no-op.
    pub fn remove(&mut self, product_id: Uuid, size: ItemSize) {
        self.items
            .retain(|i| !(i.product_id == product_id && i.size == size));
    }

    /// Applies a quantity delta, clamped at a floor of 1. The line survives
    /// even when the delta would drive it to zero or below.
    pub fn adjust_quantity(&mut self, product_id: Uuid, size: ItemSize, delta: i32) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id && i.size == size)
        {
            let next = i64::from(item.quantity) + i64::from(delta);
            item.quantity = next.clamp(1, i64::from(u32::MAX)) as u32;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn subtotal(&self) -> Result<Money, PricingError> {
        pricing::subtotal(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: u32, size: ItemSize) -> LineItem {
        LineItem {
            product_id,
            name: "Tomatoes".into(),
            unit_price: Money::rwf(500),
            quantity,
            size,
            discount_percent: 0,
        }
    }

    #[test]
    fn test_add_merges_same_product_and_size() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(id, 2, ItemSize::Regular));
        cart.add(line(id, 1, ItemSize::Regular));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 3); // Merged
    }

    #[test]
    fn test_add_keeps_sizes_separate() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(id, 1, ItemSize::Regular));
        cart.add(line(id, 1, ItemSize::Large));
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(line(Uuid::new_v4(), 1, ItemSize::Regular));
        cart.remove(Uuid::new_v4(), ItemSize::Regular);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_quantity_floor_is_one() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(line(id, 3, ItemSize::Regular));
        cart.adjust_quantity(id, ItemSize::Regular, -100);
        assert_eq!(cart.items()[0].quantity, 1);
        cart.adjust_quantity(id, ItemSize::Regular, 4);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_clear_then_subtotal_zero() {
        let mut cart = Cart::new();
        cart.add(line(Uuid::new_v4(), 2, ItemSize::Regular));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal().unwrap().amount(), 0);
    }
}
