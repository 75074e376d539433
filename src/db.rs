// Line items and status history are stored as JSON columns.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Params, Row, params};

use crate::catalog::{Catalog, ConsoleState, LoyaltyCustomer, Order, Product};
use crate::error::CatalogError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        sku TEXT NOT NULL,
        price REAL NOT NULL DEFAULT 0,
        stock INTEGER NOT NULL DEFAULT 0,
        description TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        reference TEXT NOT NULL,
        product_id TEXT NOT NULL,
        product_sku TEXT,
        product_name TEXT,
        quantity INTEGER NOT NULL DEFAULT 0,
        customer TEXT NOT NULL DEFAULT '',
        email TEXT,
        notes TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        total REAL,
        items TEXT NOT NULL DEFAULT '[]',
        history TEXT NOT NULL DEFAULT '[]'
    );
    CREATE TABLE IF NOT EXISTS loyalty_customers (
        id TEXT PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL DEFAULT '',
        phone TEXT NOT NULL DEFAULT '',
        points INTEGER NOT NULL DEFAULT 0,
        total_spent REAL NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        last_purchase INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_orders_reference ON orders(reference);
";

pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "catalog database opened");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CatalogError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Replaces every record with the snapshot's, atomically.
    pub fn import_state(&mut self, state: &ConsoleState) -> Result<(), CatalogError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM products; DELETE FROM orders; DELETE FROM loyalty_customers;",
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO products (id, name, sku, price, stock, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for p in &state.products {
                stmt.execute(params![
                    p.id,
                    p.name,
                    p.sku,
                    p.price,
                    p.stock,
                    p.description,
                    p.created_at.timestamp_millis()
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO orders (id, reference, product_id, product_sku, product_name,
                    quantity, customer, email, notes, status, created_at, total, items, history)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for o in &state.orders {
                stmt.execute(params![
                    o.id,
                    o.reference,
                    o.product_id,
                    o.product_sku,
                    o.product_name,
                    o.quantity,
                    o.customer,
                    o.email,
                    o.notes,
                    o.status.label(),
                    o.created_at.timestamp_millis(),
                    o.total,
                    serde_json::to_string(&o.items)?,
                    serde_json::to_string(&o.history)?
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO loyalty_customers (id, first_name, last_name, email, phone,
                    points, total_spent, created_at, last_purchase)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for c in &state.loyalty_customers {
                stmt.execute(params![
                    c.id,
                    c.first_name,
                    c.last_name,
                    c.email,
                    c.phone,
                    c.points,
                    c.total_spent,
                    c.created_at.timestamp_millis(),
                    c.last_purchase.map(|d| d.timestamp_millis())
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(
            products = state.products.len(),
            orders = state.orders.len(),
            customers = state.loyalty_customers.len(),
            "snapshot imported"
        );
        Ok(())
    }

    pub fn export_state(&self) -> Result<ConsoleState, CatalogError> {
        Ok(ConsoleState {
            products: self.products()?,
            orders: self.orders()?,
            loyalty_customers: self.customers()?,
        })
    }

    /// Returns false when no product has this id.
    pub fn set_stock(&self, product_id: &str, stock: i64) -> Result<bool, CatalogError> {
        let changed = self.conn.execute(
            "UPDATE products SET stock = ?1 WHERE id = ?2",
            params![stock, product_id],
        )?;
        Ok(changed > 0)
    }

    pub fn products(&self) -> Result<Vec<Product>, CatalogError> {
        self.select(PRODUCTS, "", params![], product_row, &|_| true, false)
    }

    pub fn orders(&self) -> Result<Vec<Order>, CatalogError> {
        self.select(ORDERS, "", params![], order_row, &|_| true, false)
    }

    pub fn customers(&self) -> Result<Vec<LoyaltyCustomer>, CatalogError> {
        self.select(CUSTOMERS, "", params![], customer_row, &|_| true, false)
    }

    // Rows are decoded one at a time; `first` stops at the first kept row.
    fn select<T, P: Params>(
        &self,
        query: &str,
        filter: &str,
        params: P,
        decode: fn(&Row<'_>) -> Result<T, CatalogError>,
        keep: &dyn Fn(&T) -> bool,
        first: bool,
    ) -> Result<Vec<T>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} {} ORDER BY rowid", query, filter))?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let record = decode(row)?;
            if keep(&record) {
                out.push(record);
                if first {
                    break;
                }
            }
        }
        Ok(out)
    }
}

const PRODUCTS: &str = "SELECT id, name, sku, price, stock, description, created_at FROM products";

const ORDERS: &str = "SELECT id, reference, product_id, product_sku, product_name, quantity,
        customer, email, notes, status, created_at, total, items, history
    FROM orders";

const CUSTOMERS: &str = "SELECT id, first_name, last_name, email, phone, points, total_spent,
        created_at, last_purchase
    FROM loyalty_customers";

fn product_row(row: &Row<'_>) -> Result<Product, CatalogError> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        sku: row.get(2)?,
        price: row.get(3)?,
        stock: row.get(4)?,
        description: row.get(5)?,
        created_at: millis(row, 6)?,
    })
}

fn order_row(row: &Row<'_>) -> Result<Order, CatalogError> {
    let status: String = row.get(9)?;
    let items: String = row.get(12)?;
    let history: String = row.get(13)?;
    Ok(Order {
        id: row.get(0)?,
        reference: row.get(1)?,
        product_id: row.get(2)?,
        product_sku: row.get(3)?,
        product_name: row.get(4)?,
        quantity: row.get(5)?,
        customer: row.get(6)?,
        email: row.get(7)?,
        notes: row.get(8)?,
        status: status.parse()?,
        created_at: millis(row, 10)?,
        total: row.get(11)?,
        items: serde_json::from_str(&items)?,
        history: serde_json::from_str(&history)?,
    })
}

fn customer_row(row: &Row<'_>) -> Result<LoyaltyCustomer, CatalogError> {
    let last_purchase = match row.get::<_, Option<i64>>(8)? {
        Some(ms) => Some(from_millis(ms, 8)?),
        None => None,
    };
    Ok(LoyaltyCustomer {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        points: row.get(5)?,
        total_spent: row.get(6)?,
        created_at: millis(row, 7)?,
        last_purchase,
    })
}

fn millis(row: &Row<'_>, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    from_millis(row.get(column)?, column)
}

fn from_millis(ms: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}

impl Catalog for SqliteCatalog {
    fn find_product(
        &self,
        predicate: &dyn Fn(&Product) -> bool,
    ) -> Result<Option<Product>, CatalogError> {
        let found = self.select(PRODUCTS, "", params![], product_row, predicate, true)?;
        Ok(found.into_iter().next())
    }

    fn find_order(
        &self,
        predicate: &dyn Fn(&Order) -> bool,
    ) -> Result<Option<Order>, CatalogError> {
        let found = self.select(ORDERS, "", params![], order_row, predicate, true)?;
        Ok(found.into_iter().next())
    }

    fn filter_orders(
        &self,
        predicate: &dyn Fn(&Order) -> bool,
    ) -> Result<Vec<Order>, CatalogError> {
        self.select(ORDERS, "", params![], order_row, predicate, false)
    }

    fn find_customer(
        &self,
        predicate: &dyn Fn(&LoyaltyCustomer) -> bool,
    ) -> Result<Option<LoyaltyCustomer>, CatalogError> {
        let found = self.select(CUSTOMERS, "", params![], customer_row, predicate, true)?;
        Ok(found.into_iter().next())
    }

    fn filter_customers(
        &self,
        predicate: &dyn Fn(&LoyaltyCustomer) -> bool,
    ) -> Result<Vec<LoyaltyCustomer>, CatalogError> {
        self.select(CUSTOMERS, "", params![], customer_row, predicate, false)
    }

    fn product_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        let found = self.select(
            PRODUCTS,
            "WHERE id = ?1",
            params![id],
            product_row,
            &|_| true,
            true,
        )?;
        Ok(found.into_iter().next())
    }

    fn order_by_reference(&self, reference: &str) -> Result<Option<Order>, CatalogError> {
        let found = self.select(
            ORDERS,
            "WHERE reference = ?1",
            params![reference],
            order_row,
            &|_| true,
            true,
        )?;
        Ok(found.into_iter().next())
    }

    fn orders_for_product(&self, product_id: &str) -> Result<Vec<Order>, CatalogError> {
        // items is JSON; instr only narrows, the predicate decides.
        self.select(
            ORDERS,
            "WHERE product_id = ?1 OR instr(items, ?1) > 0",
            params![product_id],
            order_row,
            &|o: &Order| o.references_product(product_id),
            false,
        )
    }
}
