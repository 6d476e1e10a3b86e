use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::catalog::Product;
use crate::domain::error::DomainError;
use crate::domain::money;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Cancellation is only possible before the parcel leaves the warehouse.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The forward lifecycle `Pending -> Processing -> Shipped -> Delivered`
    /// plus cancellation from the first two states.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Processing) | (Processing, Shipped) | (Shipped, Delivered) => true,
            (from, Cancelled) => from.is_cancellable(),
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown order status `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingDetails {
    pub address: String,
    pub city: String,
    pub district: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub phone: String,
    pub payment_method: String,
}

impl ShippingDetails {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("address", &self.address),
            ("city", &self.city),
            ("district", &self.district),
            ("phone", &self.phone),
            ("payment_method", &self.payment_method),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{field} empty")));
            }
        }
        Ok(())
    }
}

/// Frozen copy of one cart line at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for one order line: what the cart held, at the price it captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: String,
    pub order_date: DateTime<Utc>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub shipping: ShippingDetails,
    pub is_paid: bool,
    pub paid_date: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        user_id: impl Into<String>,
        shipping: ShippingDetails,
        lines: Vec<OrderLine>,
    ) -> Result<Self, DomainError> {
        shipping.validate()?;
        if lines.is_empty() {
            return Err(DomainError::validation("order has no items"));
        }
        if lines.iter().any(|l| l.quantity == 0) {
            return Err(DomainError::validation("item qty must be > 0"));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let items = lines
            .into_iter()
            .map(|l| {
                Ok(OrderItem {
                    id: Uuid::new_v4(),
                    order_id: id,
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price_cents,
                    total_cents: money::line_total_cents(l.unit_price_cents, l.quantity)?,
                    created_at: now,
                })
            })
            .collect::<Result<Vec<OrderItem>, DomainError>>()?;
        let total_cents = money::sum_cents(items.iter().map(|it| it.total_cents))?;

        Ok(Self {
            id,
            order_number: generate_order_number(now),
            user_id: user_id.into(),
            order_date: now,
            total_cents,
            status: OrderStatus::Pending,
            shipping,
            is_paid: false,
            paid_date: None,
            items,
            created_at: now,
            updated_at: now,
        })
    }

    /// Draws a fresh order number after a uniqueness conflict.
    pub fn renumber(&mut self) {
        self.order_number = generate_order_number(self.order_date);
    }

    /// Sets the status without consulting the lifecycle.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if !self.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }
        self.set_status(OrderStatus::Cancelled);
        Ok(())
    }

    pub fn mark_paid(&mut self) {
        let now = Utc::now();
        self.is_paid = true;
        self.paid_date = Some(now);
        self.updated_at = now;
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.items.iter().map(|it| it.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// `ORD-<YYYYMMDD>-<8 uppercase hex>`.
pub fn generate_order_number(at: DateTime<Utc>) -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("ORD-{}-{}", at.format("%Y%m%d"), &hex[..8])
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            image_url: p.image_url.clone(),
        }
    }
}

/// An order together with the current display data of the products it references.
/// Products deleted since checkout are absent from `products`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub products: Vec<ProductSummary>,
}

impl OrderDetails {
    pub fn product_name(&self, product_id: Uuid) -> Option<&str> {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            address: "1 Main St".into(),
            city: "Izmir".into(),
            district: "Konak".into(),
            postal_code: None,
            phone: "555-0100".into(),
            payment_method: "card".into(),
        }
    }

    fn line(qty: u32, price: i64) -> OrderLine {
        OrderLine {
            product_id: Uuid::new_v4(),
            quantity: qty,
            unit_price_cents: price,
        }
    }

    #[test]
    fn new_order_computes_totals_and_defaults_pending() {
        let order = Order::new("u1", shipping(), vec![line(2, 500), line(1, 250)]).unwrap();
        assert_eq!(order.total_cents, 1250);
        assert_eq!(order.items[0].total_cents, 1000);
        assert!(order.items.iter().all(|it| it.order_id == order.id));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);
        assert!(order.paid_date.is_none());
    }

    #[test]
    fn order_number_format() {
        let order = Order::new("u1", shipping(), vec![line(1, 100)]).unwrap();
        let n = &order.order_number;
        assert_eq!(n.len(), 21);
        assert!(n.starts_with(&format!("ORD-{}-", order.order_date.format("%Y%m%d"))));
        assert!(n[13..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn validation_errors() {
        assert!(Order::new("u1", shipping(), vec![]).is_err());
        assert!(Order::new("u1", shipping(), vec![line(0, 100)]).is_err());
        let mut bad = shipping();
        bad.city = "  ".into();
        assert!(Order::new("u1", bad, vec![line(1, 100)]).is_err());
    }

    #[test]
    fn totals_out_of_range_are_rejected() {
        let res = Order::new("u1", shipping(), vec![line(2, i64::MAX / 2 + 1)]);
        assert!(matches!(res, Err(DomainError::Validation(_))));

        let res = Order::new(
            "u1",
            shipping(),
            vec![line(1, i64::MAX), line(1, 1)],
        );
        assert!(matches!(res, Err(DomainError::Validation(_))));
    }

    #[test]
    fn cancel_only_before_shipping() {
        for (status, ok) in [
            (OrderStatus::Pending, true),
            (OrderStatus::Processing, true),
            (OrderStatus::Shipped, false),
            (OrderStatus::Delivered, false),
            (OrderStatus::Cancelled, false),
        ] {
            let mut order = Order::new("u1", shipping(), vec![line(1, 100)]).unwrap();
            order.set_status(status);
            assert_eq!(order.cancel().is_ok(), ok, "{status}");
            let expected = if ok { OrderStatus::Cancelled } else { status };
            assert_eq!(order.status, expected);
        }
    }

    #[test]
    fn lifecycle_graph() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Processing));
        assert!(Delivered.is_terminal() && Cancelled.is_terminal());
    }

    #[test]
    fn mark_paid_is_independent_of_status() {
        let mut order = Order::new("u1", shipping(), vec![line(1, 100)]).unwrap();
        order.set_status(OrderStatus::Delivered);
        order.mark_paid();
        assert!(order.is_paid);
        assert!(order.paid_date.is_some());
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn status_parses_from_its_display_form() {
        for s in ["Pending", "Processing", "Shipped", "Delivered", "Cancelled"] {
            assert_eq!(s.parse::<OrderStatus>().unwrap().to_string(), s);
        }
        assert!("Completed".parse::<OrderStatus>().is_err());
    }
}
