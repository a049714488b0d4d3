//! The guest cart: a client-local shopping cart for unauthenticated visitors.
//!
//! A visitor with no account accumulates a cart here; the storefront persists
//! it in the session after every mutation and reconciles it into the
//! server-side cart at the moment the visitor logs in. The server cart is the
//! only authoritative cart; this one exists so nothing is lost before a
//! session exists.
//!
//! # Invariants
//!
//! - Every line has `quantity > 0`. Setting a quantity to zero removes the
//!   line entirely; it is the sole removal path.
//! - Lines keep insertion order, so repeat renders are stable.
//! - One line per product ID; adding the same product again accumulates
//!   quantity and refreshes the cached display snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// A denormalized copy of product display fields, captured at add-time.
///
/// This is a snapshot, not a reference: it can go stale relative to the
/// catalog (price changes, renamed product) and is never trusted for
/// anything beyond display. Repeat adds overwrite it with fresh values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product display name.
    pub name: String,
    /// Unit price at the time of the add. Advisory only.
    pub price: Decimal,
    /// Sales unit, e.g. "lb", "bunch", "dozen".
    #[serde(default)]
    pub unit: Option<String>,
    /// Product photo URL.
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Name of the producing farm.
    #[serde(default)]
    pub farm_name: Option<String>,
}

/// One guest-cart line: a quantity plus the display snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestLine {
    /// The marketplace product this line refers to.
    pub product_id: ProductId,
    /// Always positive; a zero quantity deletes the line instead.
    pub quantity: u32,
    /// Cached display data, possibly stale.
    pub snapshot: ProductSnapshot,
}

impl GuestLine {
    /// Line total using the cached (possibly stale) price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.snapshot.price * Decimal::from(self.quantity)
    }
}

/// The guest cart itself: insertion-ordered lines, one per product ID.
///
/// Serialized whole into the session blob; all mutating methods leave the
/// cart in a state where every line satisfies `quantity > 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuestCart {
    lines: Vec<GuestLine>,
}

impl GuestCart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` of a product, accumulating onto an existing line.
    ///
    /// `quantity` is clamped to a minimum of 1, so `add_item(.., 0)` still
    /// adds one unit - an "add to cart" click always has an effect. The
    /// stored snapshot is always overwritten with the one passed in, so
    /// display data self-heals on repeat adds even when the first add cached
    /// a stale price or name.
    pub fn add_item(&mut self, product_id: ProductId, snapshot: ProductSnapshot, quantity: u32) {
        let quantity = quantity.max(1);
        match self.line_mut(product_id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity);
                line.snapshot = snapshot;
            }
            None => self.lines.push(GuestLine {
                product_id,
                quantity,
                snapshot: snapshot.clone(),
            }),
        }
    }

    /// Set the absolute quantity of an existing line.
    ///
    /// A quantity of 0 removes the line; this is the sole removal path.
    /// Setting a quantity for a product that has no line is a no-op (there
    /// is no snapshot to attach), which matches how the cart page uses it:
    /// quantity steppers only exist for lines already present.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.lines.retain(|line| line.product_id != product_id);
        } else if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        }
    }

    /// Remove a line entirely. Equivalent to `set_quantity(id, 0)`.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.set_quantity(product_id, 0);
    }

    /// Point-in-time view of the lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[GuestLine] {
        &self.lines
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&GuestLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Advisory subtotal over cached prices.
    ///
    /// Never sent to the server; the authenticated cart's totals always come
    /// from the API response.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(GuestLine::line_total).sum()
    }

    /// Total unit count across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines
            .iter()
            .fold(0, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Number of distinct product lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut GuestLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot(name: &str, price: &str) -> ProductSnapshot {
        ProductSnapshot {
            name: name.to_string(),
            price: price.parse().unwrap(),
            unit: Some("lb".to_string()),
            photo_url: None,
            farm_name: Some("Hilltop Farm".to_string()),
        }
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_accumulates_single_line() {
        let mut cart = GuestCart::new();
        let id = ProductId::new(42);
        cart.add_item(id, snapshot("Tomatoes", "2.50"), 2);
        cart.add_item(id, snapshot("Tomatoes", "2.50"), 3);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(id).unwrap().quantity, 5);
    }

    #[test]
    fn test_add_refreshes_snapshot() {
        let mut cart = GuestCart::new();
        let id = ProductId::new(7);
        cart.add_item(id, snapshot("Eggs", "4.00"), 1);
        cart.add_item(id, snapshot("Eggs (dozen)", "4.50"), 1);

        let line = cart.get(id).unwrap();
        assert_eq!(line.snapshot.name, "Eggs (dozen)");
        assert_eq!(line.snapshot.price, d("4.50"));
    }

    #[test]
    fn test_add_clamps_zero_quantity_to_one() {
        let mut cart = GuestCart::new();
        let id = ProductId::new(1);
        cart.add_item(id, snapshot("Kale", "3.00"), 0);
        assert_eq!(cart.get(id).unwrap().quantity, 1);
    }

    #[test]
    fn test_no_line_ever_has_zero_quantity() {
        let mut cart = GuestCart::new();
        let a = ProductId::new(1);
        let b = ProductId::new(2);
        cart.add_item(a, snapshot("Kale", "3.00"), 2);
        cart.add_item(b, snapshot("Honey", "9.00"), 1);
        cart.set_quantity(a, 0);
        cart.set_quantity(b, 4);
        cart.remove_item(ProductId::new(99)); // absent, no-op

        assert!(cart.items().iter().all(|line| line.quantity > 0));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(b).unwrap().quantity, 4);
    }

    #[test]
    fn test_set_zero_equals_remove() {
        let id = ProductId::new(3);
        let mut via_set = GuestCart::new();
        via_set.add_item(id, snapshot("Squash", "1.75"), 2);
        via_set.set_quantity(id, 0);

        let mut via_remove = GuestCart::new();
        via_remove.add_item(id, snapshot("Squash", "1.75"), 2);
        via_remove.remove_item(id);

        assert_eq!(via_set, via_remove);
        assert!(via_set.is_empty());
    }

    #[test]
    fn test_set_quantity_on_absent_product_is_noop() {
        let mut cart = GuestCart::new();
        cart.set_quantity(ProductId::new(5), 3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_tracks_entries() {
        let mut cart = GuestCart::new();
        let a = ProductId::new(1);
        let b = ProductId::new(2);
        cart.add_item(a, snapshot("Kale", "3.00"), 2);
        cart.add_item(b, snapshot("Honey", "9.50"), 1);
        assert_eq!(cart.subtotal(), d("15.50"));

        cart.remove_item(a);
        assert_eq!(cart.subtotal(), d("9.50"));

        cart.clear();
        assert_eq!(cart.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn test_insertion_order_is_stable() {
        let mut cart = GuestCart::new();
        for id in [30, 10, 20] {
            cart.add_item(ProductId::new(id), snapshot("P", "1.00"), 1);
        }
        // Accumulating onto an existing line must not reorder it.
        cart.add_item(ProductId::new(10), snapshot("P", "1.00"), 1);

        let ids: Vec<i64> = cart
            .items()
            .iter()
            .map(|line| line.product_id.as_i64())
            .collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut cart = GuestCart::new();
        cart.add_item(ProductId::new(42), snapshot("Tomatoes", "2.50"), 3);
        cart.add_item(ProductId::new(7), snapshot("Eggs", "4.00"), 1);

        let blob = serde_json::to_string(&cart).unwrap();
        let restored: GuestCart = serde_json::from_str(&blob).unwrap();

        let pairs: Vec<(i64, u32)> = restored
            .items()
            .iter()
            .map(|line| (line.product_id.as_i64(), line.quantity))
            .collect();
        assert_eq!(pairs, vec![(42, 3), (7, 1)]);
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_total_quantity() {
        let mut cart = GuestCart::new();
        cart.add_item(ProductId::new(1), snapshot("Kale", "3.00"), 2);
        cart.add_item(ProductId::new(2), snapshot("Honey", "9.00"), 5);
        assert_eq!(cart.total_quantity(), 7);
    }
}
