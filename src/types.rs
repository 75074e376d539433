use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{LoyaltyCustomer, Order, OrderStatus, Product};

/// The domain a scan-capable field is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanContext {
    #[default]
    Inventory,
    Pickup,
    PointOfSale,
    Loyalty,
}

impl ScanContext {
    pub const ALL: [ScanContext; 4] = [
        ScanContext::Inventory,
        ScanContext::Pickup,
        ScanContext::PointOfSale,
        ScanContext::Loyalty,
    ];

    /// Pickup fields only ever carry parcel numbers.
    pub fn policy(self) -> CharPolicy {
        match self {
            ScanContext::Pickup => CharPolicy::DigitsOnly,
            ScanContext::Inventory | ScanContext::PointOfSale | ScanContext::Loyalty => {
                CharPolicy::General
            }
        }
    }

    /// Whether an order in `status` can still be attached to a scan in this context.
    pub fn accepts_order(self, status: OrderStatus) -> bool {
        match self {
            ScanContext::Pickup => {
                !matches!(status, OrderStatus::HandedOver | OrderStatus::Cancelled)
            }
            _ => status != OrderStatus::Delivered,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScanContext::Inventory => "Inventaire",
            ScanContext::Pickup => "Retrait colis",
            ScanContext::PointOfSale => "Caisse",
            ScanContext::Loyalty => "Fidélité",
        }
    }
}

impl fmt::Display for ScanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ScanContext::Inventory => "inventory",
            ScanContext::Pickup => "pickup",
            ScanContext::PointOfSale => "point_of_sale",
            ScanContext::Loyalty => "loyalty",
        };
        f.write_str(tag)
    }
}

/// Character classes a cleaned code may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharPolicy {
    /// `[0-9]`, at least one digit.
    DigitsOnly,
    /// `[A-Za-z0-9-_]`, at least one alphanumeric.
    General,
}

impl CharPolicy {
    pub fn from_digits_only(digits_only: bool) -> Self {
        if digits_only {
            CharPolicy::DigitsOnly
        } else {
            CharPolicy::General
        }
    }
}

/// Where a camera capture lands: the context of the targeted field, and
/// whether that field dispatches scans (a plain SKU form field does not).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTarget {
    pub context: ScanContext,
    pub dispatch: bool,
}

impl ScanTarget {
    pub fn dispatching(context: ScanContext) -> Self {
        Self {
            context,
            dispatch: true,
        }
    }

    pub fn fill_only(context: ScanContext) -> Self {
        Self {
            context,
            dispatch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Product {
        product: Product,
        related_order: Option<Order>,
    },
    Order {
        product: Product,
        order: Order,
    },
    LoyaltyCustomer(LoyaltyCustomer),
    NotFound {
        context: ScanContext,
        code: String,
    },
}

impl LookupResult {
    pub fn is_found(&self) -> bool {
        !matches!(self, LookupResult::NotFound { .. })
    }

    pub fn product(&self) -> Option<&Product> {
        match self {
            LookupResult::Product { product, .. } | LookupResult::Order { product, .. } => {
                Some(product)
            }
            _ => None,
        }
    }

    pub fn order(&self) -> Option<&Order> {
        match self {
            LookupResult::Product { related_order, .. } => related_order.as_ref(),
            LookupResult::Order { order, .. } => Some(order),
            _ => None,
        }
    }
}

/// Fire-and-forget messages for the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    NotFound { context: ScanContext, code: String },
    Action(String),
    Camera(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NotFound { context, code } => match context {
                ScanContext::PointOfSale => write!(f, "Aucun produit avec le code {}.", code),
                ScanContext::Loyalty => write!(f, "Aucun client trouvé pour le code {}.", code),
                ScanContext::Inventory | ScanContext::Pickup => write!(
                    f,
                    "Aucun produit ou commande trouvé pour le code {}.",
                    code
                ),
            },
            Notice::Action(message) | Notice::Camera(message) => f.write_str(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickup_is_the_only_digits_only_context() {
        for context in ScanContext::ALL {
            let expected = if context == ScanContext::Pickup {
                CharPolicy::DigitsOnly
            } else {
                CharPolicy::General
            };
            assert_eq!(context.policy(), expected);
        }
    }

    #[test]
    fn terminal_sets_differ_between_pickup_and_inventory() {
        assert!(!ScanContext::Pickup.accepts_order(OrderStatus::HandedOver));
        assert!(!ScanContext::Pickup.accepts_order(OrderStatus::Cancelled));
        assert!(ScanContext::Pickup.accepts_order(OrderStatus::Delivered));

        assert!(!ScanContext::Inventory.accepts_order(OrderStatus::Delivered));
        assert!(ScanContext::Inventory.accepts_order(OrderStatus::Cancelled));
    }

    #[test]
    fn not_found_message_depends_on_context() {
        let notice = Notice::NotFound {
            context: ScanContext::PointOfSale,
            code: "AB12".into(),
        };
        assert_eq!(notice.to_string(), "Aucun produit avec le code AB12.");
    }
}
