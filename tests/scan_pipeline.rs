use std::time::Duration;

use caisse::barcode::CodeCleaner;
use caisse::cart::Cart;
use caisse::catalog::{Catalog, ConsoleState, LoyaltyCustomer, Product};
use caisse::config::ScanConfig;
use caisse::db::SqliteCatalog;
use caisse::router::{ScanActions, ScanRouter, search_customers};
use caisse::session::{ScanField, ScanOutcome};
use caisse::timers::{Clock, ManualClock};
use caisse::types::{LookupResult, Notice, ScanContext};

const SNAPSHOT: &str = r#"{
    "products": [
        {"id": "prd-1", "name": "Café moulu", "sku": "9782324025129", "price": 4.5,
         "stock": 2, "description": "", "createdAt": 1700000000000},
        {"id": "prd-2", "name": "Confiture", "sku": "CONF-01", "price": 3.0,
         "stock": 0, "description": "", "createdAt": 1700000000000}
    ],
    "orders": [
        {"id": "ord-1", "reference": "778899", "productId": "prd-1", "quantity": 1,
         "customer": "Jeanne", "status": "Prêt pour retrait", "createdAt": 1700000100000}
    ],
    "loyaltyCustomers": [
        {"id": "loyalty-k2x9", "firstName": "Jeanne", "lastName": "Martin",
         "email": "jeanne@example.fr", "phone": "0600000000", "points": 12,
         "totalSpent": 12.0, "createdAt": 1700000000000}
    ]
}"#;

#[derive(Default)]
struct Till {
    cart: Cart,
    customer: Option<String>,
    shown: Vec<(ScanContext, LookupResult)>,
    messages: Vec<String>,
}

impl ScanActions for Till {
    fn show_result(&mut self, context: ScanContext, result: &LookupResult) {
        self.shown.push((context, result.clone()));
    }

    fn add_to_cart(&mut self, product: &Product, quantity: u32) {
        if let Err(e) = self.cart.add(product, quantity) {
            self.messages.push(e.to_string());
        }
    }

    fn select_customer(&mut self, customer: &LoyaltyCustomer) {
        self.customer = Some(customer.id.clone());
    }

    fn notify(&mut self, notice: Notice) {
        self.messages.push(notice.to_string());
    }
}

/// Types `raw` one character at a time, 5 ms apart, then waits out the
/// quiet period.
fn scan<C: Catalog>(
    field: &mut ScanField,
    raw: &str,
    clock: &ManualClock,
    router: &ScanRouter<C>,
    till: &mut Till,
) -> Option<ScanOutcome> {
    let mut typed = String::new();
    for c in raw.chars() {
        typed.push(c);
        field.input(&typed, typed.chars().count(), clock.now());
        clock.advance(Duration::from_millis(5));
        assert!(field.poll(clock.now(), router, till).unwrap().is_none());
    }
    clock.advance(Duration::from_millis(400));
    field.poll(clock.now(), router, till).unwrap()
}

fn sqlite_catalog() -> SqliteCatalog {
    let mut catalog = SqliteCatalog::open_in_memory().unwrap();
    catalog
        .import_state(&ConsoleState::from_json(SNAPSHOT).unwrap())
        .unwrap();
    catalog
}

#[test]
fn corrupted_point_of_sale_scan_adds_product() {
    let config = ScanConfig::default();
    let router = ScanRouter::new(ConsoleState::from_json(SNAPSHOT).unwrap(), config.cleaner());
    let clock = ManualClock::new();
    let mut till = Till::default();
    let mut field = ScanField::from_config(ScanContext::PointOfSale, &config);

    let outcome = scan(&mut field, "çè_é\"é'àé(&éç", &clock, &router, &mut till);
    match outcome {
        Some(ScanOutcome::Routed { code, result }) => {
            assert_eq!(code.as_str(), "9782324025129");
            assert!(result.is_found());
        }
        other => panic!("expected a routed scan, got {:?}", other),
    }
    assert_eq!(till.cart.quantity_of("prd-1"), 1);
    assert_eq!(field.value(), "");

    scan(&mut field, "9782324025129", &clock, &router, &mut till);
    scan(&mut field, "9782324025129", &clock, &router, &mut till);
    assert_eq!(till.cart.quantity_of("prd-1"), 2);
    assert_eq!(
        till.messages,
        vec!["Quantité maximale atteinte par rapport au stock disponible.".to_string()]
    );
}

#[test]
fn out_of_stock_product_is_reported_not_added() {
    let router = ScanRouter::new(sqlite_catalog(), CodeCleaner::default());
    let clock = ManualClock::new();
    let mut till = Till::default();
    let mut field = ScanField::new(ScanContext::PointOfSale, Duration::from_millis(400));
    scan(&mut field, "CONF-01", &clock, &router, &mut till);
    assert!(till.cart.is_empty());
    assert_eq!(till.messages, vec!["\"Confiture\" est en rupture de stock.".to_string()]);
}

#[test]
fn pickup_scan_finds_order_by_reference_in_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("caisse.db");
    SqliteCatalog::open(&path)
        .unwrap()
        .import_state(&ConsoleState::from_json(SNAPSHOT).unwrap())
        .unwrap();

    let config = ScanConfig::default();
    let router = ScanRouter::new(SqliteCatalog::open(&path).unwrap(), config.cleaner());
    let clock = ManualClock::new();
    let mut till = Till::default();
    let mut field = ScanField::from_config(ScanContext::Pickup, &config);

    // AZERTY scanner: "778899" arrives as "èè__çç".
    let outcome = scan(&mut field, "èè__çç", &clock, &router, &mut till);
    assert!(matches!(outcome, Some(ScanOutcome::Routed { .. })));
    assert_eq!(till.shown.len(), 1);
    let (context, result) = &till.shown[0];
    assert_eq!(*context, ScanContext::Pickup);
    assert_eq!(result.order().map(|o| o.id.as_str()), Some("ord-1"));
}

#[test]
fn loyalty_card_qr_payload_selects_customer() {
    let router = ScanRouter::new(sqlite_catalog(), CodeCleaner::default());
    let clock = ManualClock::new();
    let mut till = Till::default();
    let mut field = ScanField::new(ScanContext::Loyalty, Duration::from_millis(400));
    scan(&mut field, "LOYALTY:loyalty-k2x9", &clock, &router, &mut till);
    assert_eq!(till.customer.as_deref(), Some("loyalty-k2x9"));
}

#[test]
fn unknown_inventory_code_notifies_once() {
    let router = ScanRouter::new(sqlite_catalog(), CodeCleaner::default());
    let clock = ManualClock::new();
    let mut till = Till::default();
    let mut field = ScanField::new(ScanContext::Inventory, Duration::from_millis(400));
    scan(&mut field, "ZZ99", &clock, &router, &mut till);
    assert_eq!(
        till.messages,
        vec!["Aucun produit ou commande trouvé pour le code ZZ99.".to_string()]
    );
    clock.advance(Duration::from_secs(5));
    assert!(field.poll(clock.now(), &router, &mut till).unwrap().is_none());
    assert_eq!(till.messages.len(), 1);
}

#[test]
fn rescan_sees_restocked_product() {
    let mut router = ScanRouter::new(sqlite_catalog(), CodeCleaner::default());
    let clock = ManualClock::new();
    let mut till = Till::default();
    let mut field = ScanField::new(ScanContext::Inventory, Duration::from_millis(400));
    scan(&mut field, "9782324025129", &clock, &router, &mut till);
    assert_eq!(till.shown[0].1.product().map(|p| p.stock), Some(2));

    assert!(router.catalog_mut().set_stock("prd-1", 40).unwrap());
    let again = field.rescan(&router, &mut till).unwrap().unwrap();
    assert_eq!(again.product().map(|p| p.stock), Some(40));
}

#[test]
fn manual_customer_search_runs_against_sqlite() {
    let router = ScanRouter::new(sqlite_catalog(), CodeCleaner::default());
    let found = search_customers(router.catalog(), "martin").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "loyalty-k2x9");
    assert!(search_customers(router.catalog(), "dupont").unwrap().is_empty());
}

#[test]
fn pickup_preview_routes_the_typed_code() {
    let config = ScanConfig::default();
    assert!(config.pickup_preview);
    let router = ScanRouter::new(sqlite_catalog(), config.cleaner());
    let clock = ManualClock::new();
    let mut till = Till::default();
    let mut field = ScanField::from_config(ScanContext::Pickup, &config);

    // the console writes the preview back, so each keystroke arrives
    // appended to the previewed text
    for c in "7788-99".chars() {
        let text = format!("{}{}", field.value(), c);
        field.input(&text, text.chars().count(), clock.now());
        clock.advance(Duration::from_millis(5));
    }
    assert_eq!(field.value(), "7788699");
    clock.advance(Duration::from_millis(400));
    match field.poll(clock.now(), &router, &mut till).unwrap() {
        Some(ScanOutcome::Routed { code, result }) => {
            assert_eq!(code.as_str(), "778899");
            assert_eq!(result.order().map(|o| o.id.as_str()), Some("ord-1"));
        }
        other => panic!("expected a routed scan, got {:?}", other),
    }
}
