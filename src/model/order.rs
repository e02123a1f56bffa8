//! The order record and its status.
//!
//! The `id` is assigned once by the [`OrderSubmitter`](crate::submitter::OrderSubmitter)
//! and doubles as the partition key on every topic. The `status` only ever moves
//! forward, see [`Order::advance_to`].

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Bytes used as the partition key.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<Uuid> for OrderId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of an order, in stage order.
///
/// The derived `Ord` follows declaration order, so
/// `Pending < OrderMade < InventoryChecking < Shipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    OrderMade,
    InventoryChecking,
    Shipped,
}

impl OrderStatus {
    /// `SHIPPED` is terminal.
    pub fn is_terminal(self) -> bool {
        self == OrderStatus::Shipped
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::OrderMade => "ORDER_MADE",
            OrderStatus::InventoryChecking => "INVENTORY_CHECKING",
            OrderStatus::Shipped => "SHIPPED",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a customer order moving through the processing stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub item_name: String,
    pub status: OrderStatus,
}

/// Payload for placing a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub item_name: String,
}

impl Order {
    /// Creates a new `PENDING` order with a freshly generated id.
    pub fn new(item_name: impl Into<String>) -> Self {
        Self {
            id: OrderId::generate(),
            item_name: item_name.into(),
            status: OrderStatus::Pending,
        }
    }

    /// Moves the status forward to `target`.
    ///
    /// Returns `false` and leaves the order untouched when it is already at or
    /// past `target`, so replaying a stage never regresses a record.
    pub fn advance_to(&mut self, target: OrderStatus) -> bool {
        if target > self.status {
            self.status = target;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_follows_stages() {
        assert!(OrderStatus::Pending < OrderStatus::OrderMade);
        assert!(OrderStatus::OrderMade < OrderStatus::InventoryChecking);
        assert!(OrderStatus::InventoryChecking < OrderStatus::Shipped);
        assert!(OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn advance_never_regresses() {
        let mut order = Order::new("widget");
        assert!(order.advance_to(OrderStatus::InventoryChecking));
        assert!(!order.advance_to(OrderStatus::OrderMade));
        assert!(!order.advance_to(OrderStatus::InventoryChecking));
        assert_eq!(order.status, OrderStatus::InventoryChecking);
    }

    #[test]
    fn wire_format_uses_upper_snake_case() {
        let order = Order::new("widget");
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["item_name"], "widget");
        assert_eq!(json["id"], order.id.to_string());

        let parsed: OrderStatus = serde_json::from_str("\"INVENTORY_CHECKING\"").unwrap();
        assert_eq!(parsed, OrderStatus::InventoryChecking);
    }
}
