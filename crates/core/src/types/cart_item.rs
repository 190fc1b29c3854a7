//! Cart line items and derived totals.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product reference plus the quantity requested.
///
/// The quantity is never zero: a line that would drop to zero is removed from
/// the cart instead, and stored data holding a zero quantity fails to
/// deserialize.
///
/// Serialized field names match the device storage format:
///
/// ```json
/// {"id":"p1","title":"Shirt","image_url":"http://...","price":29.9,"quantity":2}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Catalog product id.
    pub id: ProductId,
    /// Display name.
    pub title: String,
    /// Display image reference.
    pub image_url: String,
    /// Unit price.
    pub price: Price,
    /// Number of units in the cart.
    pub quantity: NonZeroU32,
}

impl CartItem {
    /// Price of this line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.times(self.quantity.get())
    }
}

/// A product being added to the cart for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub price: Price,
}

impl NewCartItem {
    /// Create a new cart item from its parts.
    #[must_use]
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: Price,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }

    /// Convert into a cart line holding a single unit.
    #[must_use]
    pub fn into_cart_item(self) -> CartItem {
        CartItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity: NonZeroU32::MIN,
        }
    }
}

/// Totals derived from the current cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartSummary {
    /// Sum of quantities across all lines.
    pub item_count: u64,
    /// Number of distinct lines.
    pub line_count: usize,
    /// Sum of line totals.
    pub subtotal: Decimal,
}

impl CartSummary {
    /// Compute totals for a sequence of cart lines.
    #[must_use]
    pub fn from_items(items: &[CartItem]) -> Self {
        items.iter().fold(
            Self {
                line_count: items.len(),
                ..Self::default()
            },
            |acc, item| Self {
                item_count: acc.item_count + u64::from(item.quantity.get()),
                subtotal: acc.subtotal.saturating_add(item.line_total()),
                ..acc
            },
        )
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    /// Subtotal formatted to two decimal places (e.g., `"59.80"`).
    #[must_use]
    pub fn formatted_subtotal(&self) -> String {
        format!("{:.2}", self.subtotal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shirt() -> NewCartItem {
        NewCartItem::new(
            ProductId::parse("p1").unwrap(),
            "Shirt",
            "http://img/shirt.png",
            "29.9".parse().unwrap(),
        )
    }

    #[test]
    fn test_new_item_starts_at_one() {
        let item = shirt().into_cart_item();
        assert_eq!(item.quantity.get(), 1);
        assert_eq!(item.id, "p1");
    }

    #[test]
    fn test_storage_format() {
        let mut item = shirt().into_cart_item();
        item.quantity = NonZeroU32::new(2).unwrap();

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "p1",
                "title": "Shirt",
                "image_url": "http://img/shirt.png",
                "price": 29.9,
                "quantity": 2
            })
        );
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let raw = r#"{"id":"p1","title":"T","image_url":"u","price":10,"quantity":0}"#;
        let result: Result<CartItem, _> = serde_json::from_str(raw);
        assert!(result.is_err());
    }

    #[test]
    fn test_summary() {
        let mut shirt = shirt().into_cart_item();
        shirt.quantity = NonZeroU32::new(2).unwrap();
        let mug = NewCartItem::new(
            ProductId::parse("p2").unwrap(),
            "Mug",
            "u",
            "5".parse().unwrap(),
        )
        .into_cart_item();

        let summary = CartSummary::from_items(&[shirt, mug]);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.subtotal, Decimal::new(648, 1));
        assert_eq!(summary.formatted_subtotal(), "64.80");
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::from_items(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.subtotal, Decimal::ZERO);
    }
}
