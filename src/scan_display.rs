use crate::catalog::{LoyaltyCustomer, Order, OrderStatus, Product};
use crate::types::{LookupResult, ScanContext};
use crate::utils::{format_currency, format_timestamp};

pub const NO_ACTIVE_ORDER: &str = "Aucune commande active trouvée pour ce produit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    Empty,
    Low,
    Available,
}

impl StockLevel {
    pub fn classify(stock: i64) -> Self {
        if stock <= 0 {
            StockLevel::Empty
        } else if stock <= 5 {
            StockLevel::Low
        } else {
            StockLevel::Available
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupLine {
    pub label: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickupBlock {
    Order {
        reference: String,
        customer: String,
        email: String,
        lines: Vec<PickupLine>,
        total: String,
        can_mark_ready: bool,
        can_hand_over: bool,
    },
    NoActiveOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanCard {
    pub title: String,
    pub stock_badge: String,
    pub stock_level: StockLevel,
    pub sku: String,
    pub price: String,
    pub added_on: String,
    pub order_chip: Option<String>,
    pub pickup: Option<PickupBlock>,
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "—".to_string()
    } else {
        value.to_string()
    }
}

fn pickup_block(product: &Product, order: &Order) -> PickupBlock {
    let lines = order.lines();
    let unit = |price: Option<f64>| price.unwrap_or(product.price);
    let computed: f64 = lines
        .iter()
        .map(|l| unit(l.unit_price) * f64::from(l.quantity))
        .sum();
    PickupBlock::Order {
        reference: order.reference.clone(),
        customer: or_dash(&order.customer),
        email: or_dash(order.email.as_deref().unwrap_or_default()),
        lines: lines
            .iter()
            .map(|l| PickupLine {
                label: format!(
                    "{} × {}",
                    l.quantity,
                    l.product_name.as_deref().unwrap_or(&product.name)
                ),
                amount: format_currency(unit(l.unit_price) * f64::from(l.quantity)),
            })
            .collect(),
        total: format_currency(order.total.unwrap_or(computed)),
        can_mark_ready: !matches!(
            order.status,
            OrderStatus::ReadyForPickup | OrderStatus::HandedOver
        ),
        can_hand_over: order.status != OrderStatus::HandedOver,
    }
}

impl ScanCard {
    /// Cards exist for product and order hits only.
    pub fn build(result: &LookupResult, context: ScanContext) -> Option<Self> {
        let product = result.product()?;
        let order = result.order();
        let pickup = (context == ScanContext::Pickup).then(|| match order {
            Some(order) => pickup_block(product, order),
            None => PickupBlock::NoActiveOrder,
        });
        Some(Self {
            title: product.name.clone(),
            stock_badge: format!("{} en stock", product.stock),
            stock_level: StockLevel::classify(product.stock),
            sku: product.sku.clone(),
            price: format_currency(product.price),
            added_on: format_timestamp(product.created_at),
            order_chip: order.map(|o| format!("Commande {} • {}", o.reference, o.status)),
            pickup,
        })
    }

    /// Plain-text rendering, one line per entry.
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.stock_badge.clone(),
            format!("Code-barres : {}", self.sku),
            format!("Prix : {}", self.price),
            format!("Ajouté le : {}", self.added_on),
        ];
        if let Some(chip) = &self.order_chip {
            lines.push(chip.clone());
        }
        match &self.pickup {
            Some(PickupBlock::Order {
                reference,
                customer,
                email,
                lines: items,
                total,
                ..
            }) => {
                lines.push(format!("Commande : {}", reference));
                lines.push(format!("Client : {}", customer));
                lines.push(format!("Email : {}", email));
                lines.extend(items.iter().map(|i| format!("{}  {}", i.label, i.amount)));
                lines.push(format!("Total : {}", total));
            }
            Some(PickupBlock::NoActiveOrder) => lines.push(NO_ACTIVE_ORDER.to_string()),
            None => {}
        }
        lines
    }
}

pub fn customer_summary(customer: &LoyaltyCustomer) -> String {
    format!("{} • {} pts", customer.full_name(), customer.points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OrderItem;
    use chrono::{TimeZone, Utc};

    fn product() -> Product {
        Product {
            id: "prd-1".into(),
            name: "Miel".into(),
            sku: "3760003".into(),
            price: 8.0,
            stock: 4,
            description: String::new(),
            created_at: Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 0).unwrap(),
        }
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: "ord-1".into(),
            reference: "5566".into(),
            product_id: "prd-1".into(),
            product_sku: None,
            product_name: None,
            quantity: 1,
            customer: "Lina".into(),
            email: None,
            notes: String::new(),
            status,
            created_at: Utc::now(),
            total: None,
            items: vec![OrderItem {
                product_id: "prd-1".into(),
                product_name: None,
                product_sku: None,
                quantity: 3,
                unit_price: None,
            }],
            history: Vec::new(),
        }
    }

    #[test]
    fn inventory_card_has_chip_but_no_pickup_block() {
        let result = LookupResult::Product {
            product: product(),
            related_order: Some(order(OrderStatus::Preparing)),
        };
        let card = ScanCard::build(&result, ScanContext::Inventory).unwrap();
        assert_eq!(card.stock_level, StockLevel::Low);
        assert_eq!(card.added_on, "14 nov. 2023, 23:13");
        assert_eq!(
            card.order_chip.as_deref(),
            Some("Commande 5566 • En préparation")
        );
        assert_eq!(card.pickup, None);
    }

    #[test]
    fn pickup_card_totals_items_at_product_price() {
        let result = LookupResult::Order {
            product: product(),
            order: order(OrderStatus::ReadyForPickup),
        };
        let card = ScanCard::build(&result, ScanContext::Pickup).unwrap();
        match card.pickup {
            Some(PickupBlock::Order {
                customer,
                email,
                lines,
                total,
                can_mark_ready,
                can_hand_over,
                ..
            }) => {
                assert_eq!(customer, "Lina");
                assert_eq!(email, "—");
                assert_eq!(lines[0].label, "3 × Miel");
                assert_eq!(total, format_currency(24.0));
                assert!(!can_mark_ready);
                assert!(can_hand_over);
            }
            other => panic!("expected an order block, got {:?}", other),
        }
    }

    #[test]
    fn pickup_without_order_says_so() {
        let result = LookupResult::Product {
            product: product(),
            related_order: None,
        };
        let card = ScanCard::build(&result, ScanContext::Pickup).unwrap();
        assert!(card.detail_lines().contains(&NO_ACTIVE_ORDER.to_string()));
    }

    #[test]
    fn not_found_has_no_card() {
        let result = LookupResult::NotFound {
            context: ScanContext::Inventory,
            code: "00".into(),
        };
        assert!(ScanCard::build(&result, ScanContext::Inventory).is_none());
    }
}
