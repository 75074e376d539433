// Records follow the console's persisted JSON layout: camelCase keys,
// millisecond timestamps.
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "En attente")]
    Pending,
    #[serde(rename = "En préparation")]
    Preparing,
    #[serde(rename = "En cours de livraison")]
    OutForDelivery,
    #[serde(rename = "Livré")]
    Delivered,
    #[serde(rename = "Annulé")]
    Cancelled,
    #[serde(rename = "Prêt pour retrait")]
    ReadyForPickup,
    #[serde(rename = "Remis au client")]
    HandedOver,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::ReadyForPickup,
        OrderStatus::HandedOver,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "En attente",
            OrderStatus::Preparing => "En préparation",
            OrderStatus::OutForDelivery => "En cours de livraison",
            OrderStatus::Delivered => "Livré",
            OrderStatus::Cancelled => "Annulé",
            OrderStatus::ReadyForPickup => "Prêt pour retrait",
            OrderStatus::HandedOver => "Remis au client",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.label() == s)
            .ok_or_else(|| CatalogError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_sku: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub reference: String,
    pub product_id: String,
    #[serde(default)]
    pub product_sku: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Order {
    pub fn references_product(&self, product_id: &str) -> bool {
        self.product_id == product_id || self.items.iter().any(|i| i.product_id == product_id)
    }

    /// Line items; older orders only carry the primary product fields.
    pub fn lines(&self) -> Vec<OrderItem> {
        if !self.items.is_empty() {
            return self.items.clone();
        }
        vec![OrderItem {
            product_id: self.product_id.clone(),
            product_name: self.product_name.clone(),
            product_sku: self.product_sku.clone(),
            quantity: self.quantity,
            unit_price: None,
        }]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyCustomer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_purchase: Option<DateTime<Utc>>,
}

impl LoyaltyCustomer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Read side of the record store. The scan pipeline never writes through it.
pub trait Catalog {
    fn find_product(
        &self,
        predicate: &dyn Fn(&Product) -> bool,
    ) -> Result<Option<Product>, CatalogError>;

    fn find_order(&self, predicate: &dyn Fn(&Order) -> bool)
    -> Result<Option<Order>, CatalogError>;

    fn filter_orders(&self, predicate: &dyn Fn(&Order) -> bool)
    -> Result<Vec<Order>, CatalogError>;

    fn find_customer(
        &self,
        predicate: &dyn Fn(&LoyaltyCustomer) -> bool,
    ) -> Result<Option<LoyaltyCustomer>, CatalogError>;

    fn filter_customers(
        &self,
        predicate: &dyn Fn(&LoyaltyCustomer) -> bool,
    ) -> Result<Vec<LoyaltyCustomer>, CatalogError>;

    // Keyed lookups. Stores with an index override these.
    fn product_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        self.find_product(&|p: &Product| p.id == id)
    }

    fn order_by_reference(&self, reference: &str) -> Result<Option<Order>, CatalogError> {
        self.find_order(&|o: &Order| o.reference == reference)
    }

    fn orders_for_product(&self, product_id: &str) -> Result<Vec<Order>, CatalogError> {
        self.filter_orders(&|o: &Order| o.references_product(product_id))
    }
}

impl<T: Catalog + ?Sized> Catalog for &T {
    fn find_product(
        &self,
        predicate: &dyn Fn(&Product) -> bool,
    ) -> Result<Option<Product>, CatalogError> {
        (**self).find_product(predicate)
    }

    fn find_order(
        &self,
        predicate: &dyn Fn(&Order) -> bool,
    ) -> Result<Option<Order>, CatalogError> {
        (**self).find_order(predicate)
    }

    fn filter_orders(
        &self,
        predicate: &dyn Fn(&Order) -> bool,
    ) -> Result<Vec<Order>, CatalogError> {
        (**self).filter_orders(predicate)
    }

    fn find_customer(
        &self,
        predicate: &dyn Fn(&LoyaltyCustomer) -> bool,
    ) -> Result<Option<LoyaltyCustomer>, CatalogError> {
        (**self).find_customer(predicate)
    }

    fn filter_customers(
        &self,
        predicate: &dyn Fn(&LoyaltyCustomer) -> bool,
    ) -> Result<Vec<LoyaltyCustomer>, CatalogError> {
        (**self).filter_customers(predicate)
    }

    fn product_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        (**self).product_by_id(id)
    }

    fn order_by_reference(&self, reference: &str) -> Result<Option<Order>, CatalogError> {
        (**self).order_by_reference(reference)
    }

    fn orders_for_product(&self, product_id: &str) -> Result<Vec<Order>, CatalogError> {
        (**self).orders_for_product(product_id)
    }
}

/// The console state blob. Keys the scan pipeline has no use for
/// (`tpeHistory`, `storeCart`, product images) are skipped on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleState {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub loyalty_customers: Vec<LoyaltyCustomer>,
}

impl ConsoleState {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        let state = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            products = state.products.len(),
            orders = state.orders.len(),
            customers = state.loyalty_customers.len(),
            "console snapshot loaded"
        );
        Ok(state)
    }
}

impl Catalog for ConsoleState {
    fn find_product(
        &self,
        predicate: &dyn Fn(&Product) -> bool,
    ) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.iter().find(|p| predicate(p)).cloned())
    }

    fn find_order(
        &self,
        predicate: &dyn Fn(&Order) -> bool,
    ) -> Result<Option<Order>, CatalogError> {
        Ok(self.orders.iter().find(|o| predicate(o)).cloned())
    }

    fn filter_orders(
        &self,
        predicate: &dyn Fn(&Order) -> bool,
    ) -> Result<Vec<Order>, CatalogError> {
        Ok(self.orders.iter().filter(|o| predicate(o)).cloned().collect())
    }

    fn find_customer(
        &self,
        predicate: &dyn Fn(&LoyaltyCustomer) -> bool,
    ) -> Result<Option<LoyaltyCustomer>, CatalogError> {
        Ok(self.loyalty_customers.iter().find(|c| predicate(c)).cloned())
    }

    fn filter_customers(
        &self,
        predicate: &dyn Fn(&LoyaltyCustomer) -> bool,
    ) -> Result<Vec<LoyaltyCustomer>, CatalogError> {
        Ok(self
            .loyalty_customers
            .iter()
            .filter(|c| predicate(c))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "products": [
            {"id": "prd-1", "name": "Café moulu", "sku": "3760001", "price": 4.5, "stock": 12,
             "description": "", "createdAt": 1700000000000, "image": null}
        ],
        "orders": [
            {"id": "ord-1", "reference": "CMD-ABC123", "productId": "prd-1",
             "productSku": "3760001", "productName": "Café moulu", "quantity": 2,
             "customer": "Jeanne", "notes": "", "status": "En préparation",
             "createdAt": 1700000100000, "total": 9.0,
             "items": [{"productId": "prd-1", "productName": "Café moulu",
                        "productSku": "3760001", "quantity": 2, "unitPrice": 4.5}],
             "history": [{"status": "En préparation", "date": 1700000100000,
                          "note": "Commande créée manuellement depuis le tableau de bord."}]}
        ],
        "tpeHistory": [{"amount": 12}],
        "storeCart": [],
        "loyaltyCustomers": [
            {"id": "loyalty-abc", "firstName": "Jeanne", "lastName": "Martin",
             "email": "jeanne@example.fr", "phone": "0600000000", "points": 10,
             "totalSpent": 10.0, "createdAt": 1700000000000, "lastPurchase": null, "qrCode": null}
        ]
    }"#;

    #[test]
    fn snapshot_loads_and_ignores_unrelated_keys() {
        let state = ConsoleState::from_json(SNAPSHOT).unwrap();
        assert_eq!(state.products.len(), 1);
        assert_eq!(state.orders[0].status, OrderStatus::Preparing);
        assert_eq!(state.orders[0].created_at.timestamp_millis(), 1_700_000_100_000);
        assert_eq!(state.loyalty_customers[0].last_purchase, None);
    }

    #[test]
    fn status_labels_round_trip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.label().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("Expédié".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn order_lines_fall_back_to_primary_product() {
        let mut state = ConsoleState::from_json(SNAPSHOT).unwrap();
        let order = &mut state.orders[0];
        assert_eq!(order.lines().len(), 1);
        order.items.clear();
        let lines = order.lines();
        assert_eq!(lines[0].product_id, "prd-1");
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn predicate_lookups_over_snapshot() {
        let state = ConsoleState::from_json(SNAPSHOT).unwrap();
        let product = state.find_product(&|p| p.sku == "3760001").unwrap();
        assert_eq!(product.map(|p| p.id), Some("prd-1".to_string()));
        let orders = state.filter_orders(&|o| o.references_product("prd-1")).unwrap();
        assert_eq!(orders.len(), 1);
        assert!(state.find_customer(&|c| c.id == "nope").unwrap().is_none());
    }
}
