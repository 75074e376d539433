use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use slint::{ComponentHandle, SharedString, Timer, TimerMode};

use crate::cart::Cart;
use crate::catalog::{LoyaltyCustomer, Product};
use crate::config::ScanConfig;
use crate::db::SqliteCatalog;
use crate::error::CatalogError;
use crate::router::{ScanActions, ScanRouter, search_customers};
use crate::scan_display::{ScanCard, customer_summary};
use crate::session::{ScanField, ScanOutcome};
use crate::types::{LookupResult, Notice, ScanContext};
use crate::ui::MainWindow;
use crate::utils::format_currency;

/// Where routed scans land: the cart, the selected loyalty customer and the
/// result panel.
#[derive(Default)]
pub struct Desk {
    cart: Cart,
    customer: Option<LoyaltyCustomer>,
    result_title: String,
    result_detail: String,
    status: String,
}

impl ScanActions for Desk {
    fn show_result(&mut self, context: ScanContext, result: &LookupResult) {
        if let Some(card) = ScanCard::build(result, context) {
            self.result_title = card.title.clone();
            self.result_detail = card.detail_lines().join("\n");
        }
        self.status.clear();
    }

    fn add_to_cart(&mut self, product: &Product, quantity: u32) {
        self.status = match self.cart.add(product, quantity) {
            Ok(_) => format!("{} ajouté au panier.", product.name),
            Err(e) => e.to_string(),
        };
    }

    fn select_customer(&mut self, customer: &LoyaltyCustomer) {
        self.status = format!("Client sélectionné : {}", customer.full_name());
        self.customer = Some(customer.clone());
    }

    fn notify(&mut self, notice: Notice) {
        self.status = notice.to_string();
    }
}

pub struct Console {
    router: ScanRouter<SqliteCatalog>,
    fields: Vec<ScanField>,
    desk: Desk,
}

impl Console {
    pub fn new(catalog: SqliteCatalog, config: &ScanConfig) -> Self {
        Self {
            router: ScanRouter::new(catalog, config.cleaner()),
            fields: ScanContext::ALL
                .iter()
                .map(|&context| ScanField::from_config(context, config))
                .collect(),
            desk: Desk::default(),
        }
    }
}

fn set_field_text(ui: &MainWindow, context: ScanContext, text: &str) {
    let text = SharedString::from(text);
    match context {
        ScanContext::Inventory => ui.set_inventory_text(text),
        ScanContext::Pickup => ui.set_pickup_text(text),
        ScanContext::PointOfSale => ui.set_pos_text(text),
        ScanContext::Loyalty => ui.set_loyalty_text(text),
    }
}

fn show_error(ui: &MainWindow, message: String) {
    ui.set_error_dialog_message(message.into());
    ui.set_show_error_dialog(true);
}

fn render(ui: &MainWindow, desk: &Desk) {
    ui.set_result_title(desk.result_title.as_str().into());
    ui.set_result_detail(desk.result_detail.as_str().into());
    ui.set_status_message(desk.status.as_str().into());

    let lines: Vec<String> = desk
        .cart
        .lines()
        .iter()
        .map(|l| {
            format!(
                "{} × {}  {}",
                l.quantity,
                l.product.name,
                format_currency(l.amount())
            )
        })
        .collect();
    ui.set_cart_summary(lines.join("\n").into());

    let totals = desk.cart.totals();
    ui.set_cart_total(
        format!(
            "Sous-total {} • Remise - {} • Total {}",
            format_currency(totals.subtotal),
            format_currency(totals.discount_value),
            format_currency(totals.total)
        )
        .into(),
    );
    let customer = match &desk.customer {
        Some(c) => format!(
            "{} (+{} pts)",
            customer_summary(c),
            totals.points_earned()
        ),
        None => String::new(),
    };
    ui.set_customer_summary(customer.into());
}

/// Applies a committed scan to the window.
fn apply(
    ui: &MainWindow,
    console: &Console,
    context: ScanContext,
    outcome: Result<Option<ScanOutcome>, CatalogError>,
) {
    match outcome {
        Ok(Some(ScanOutcome::Routed { .. })) => set_field_text(ui, context, ""),
        Ok(Some(ScanOutcome::Rejected { .. })) | Ok(None) => {}
        Err(e) => {
            tracing::warn!(%context, error = %e, "scan lookup failed");
            show_error(ui, format!("Erreur de lecture du catalogue : {}", e));
        }
    }
    render(ui, &console.desk);
}

pub fn setup_event_handlers(console: Rc<RefCell<Console>>, ui: &MainWindow) -> Rc<Vec<Timer>> {
    let timers: Rc<Vec<Timer>> = Rc::new(ScanContext::ALL.iter().map(|_| Timer::default()).collect());

    let ui_handle = ui.as_weak();
    let console_edit = console.clone();
    let timers_edit = timers.clone();
    ui.on_scan_edited(move |index, text| {
        let Some(ui) = ui_handle.upgrade() else {
            return;
        };
        let index = index as usize;
        let Some(timer) = timers_edit.get(index) else {
            return;
        };
        let mut state = console_edit.borrow_mut();
        let Some(field) = state.fields.get_mut(index) else {
            return;
        };
        let context = field.context();
        if text.is_empty() {
            field.clear();
            timer.stop();
            return;
        }

        let cursor = field.input(&text, text.chars().count(), Instant::now());
        if field.value() != text.as_str() {
            set_field_text(&ui, context, field.value());
        }
        tracing::trace!(%context, cursor, "keystroke");

        let Some(deadline) = field.deadline() else {
            return;
        };
        let ui_timer = ui.as_weak();
        let console_timer = console_edit.clone();
        timer.start(
            TimerMode::SingleShot,
            deadline.saturating_duration_since(Instant::now()),
            move || {
                let Some(ui) = ui_timer.upgrade() else {
                    return;
                };
                let mut state = console_timer.borrow_mut();
                let Console {
                    router,
                    fields,
                    desk,
                } = &mut *state;
                let Some(field) = fields.get_mut(index) else {
                    return;
                };
                let outcome = field.poll(Instant::now(), router, desk);
                apply(&ui, &state, context, outcome);
            },
        );
    });

    let ui_handle = ui.as_weak();
    let console_accept = console.clone();
    let timers_accept = timers.clone();
    ui.on_scan_accepted(move |index, _text| {
        let Some(ui) = ui_handle.upgrade() else {
            return;
        };
        let index = index as usize;
        if let Some(timer) = timers_accept.get(index) {
            timer.stop();
        }
        let mut state = console_accept.borrow_mut();
        let Console {
            router,
            fields,
            desk,
        } = &mut *state;
        let Some(field) = fields.get_mut(index) else {
            return;
        };
        let context = field.context();
        let outcome = field.submit(router, desk).map(Some);
        apply(&ui, &state, context, outcome);
    });

    let ui_handle = ui.as_weak();
    let console_rescan = console.clone();
    ui.on_rescan(move |index| {
        let Some(ui) = ui_handle.upgrade() else {
            return;
        };
        let mut state = console_rescan.borrow_mut();
        let Console {
            router,
            fields,
            desk,
        } = &mut *state;
        let Some(field) = fields.get(index as usize) else {
            return;
        };
        if let Err(e) = field.rescan(router, desk) {
            tracing::warn!(context = %field.context(), error = %e, "rescan failed");
            show_error(&ui, format!("Erreur de lecture du catalogue : {}", e));
        }
        render(&ui, desk);
    });

    // Enter selects the customer when the query leaves a single match.
    let ui_handle = ui.as_weak();
    let console_search = console.clone();
    ui.on_customer_search(move |query, select| {
        let Some(ui) = ui_handle.upgrade() else {
            return;
        };
        let mut state = console_search.borrow_mut();
        let Console { router, desk, .. } = &mut *state;
        match search_customers(router.catalog(), &query) {
            Ok(matches) => {
                if let [customer] = matches.as_slice() {
                    if select {
                        desk.select_customer(customer);
                    }
                }
                let lines: Vec<String> = matches.iter().map(customer_summary).collect();
                ui.set_customer_matches(lines.join("\n").into());
            }
            Err(e) => {
                tracing::warn!(error = %e, "customer search failed");
                show_error(&ui, format!("Erreur de lecture du catalogue : {}", e));
            }
        }
        render(&ui, desk);
    });

    let ui_handle = ui.as_weak();
    let console_discount = console.clone();
    ui.on_discount_changed(move |text| {
        let Some(ui) = ui_handle.upgrade() else {
            return;
        };
        let rate = text.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0);
        let mut state = console_discount.borrow_mut();
        state.desk.cart.set_discount(rate);
        render(&ui, &state.desk);
    });

    let ui_handle = ui.as_weak();
    let console_clear = console.clone();
    ui.on_clear_cart(move || {
        let Some(ui) = ui_handle.upgrade() else {
            return;
        };
        let mut state = console_clear.borrow_mut();
        state.desk.cart.clear();
        state.desk.customer = None;
        state.desk.status = "Panier vidé.".to_string();
        render(&ui, &state.desk);
    });

    let ui_handle = ui.as_weak();
    ui.on_close_error_dialog(move || {
        if let Some(ui) = ui_handle.upgrade() {
            ui.set_show_error_dialog(false);
        }
    });

    render(ui, &console.borrow().desk);
    timers
}
