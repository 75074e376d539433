pub mod barcode;
pub mod camera;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod layout;
pub mod router;
pub mod scan_display;
pub mod session;
pub mod timers;
pub mod types;
pub mod utils;

#[cfg(feature = "gui")]
pub mod event_handlers;

#[cfg(feature = "gui")]
pub mod ui {
    slint::include_modules!();
}
