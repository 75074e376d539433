use crate::catalog::Product;
use crate::error::CartError;

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    pub fn amount(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartTotals {
    pub subtotal: f64,
    pub discount_value: f64,
    pub total: f64,
    pub quantity: u32,
}

impl CartTotals {
    /// One loyalty point per euro, rounded.
    pub fn points_earned(&self) -> i64 {
        self.total.round() as i64
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
    discount_rate: f64,
}

fn max_stock(product: &Product) -> u32 {
    u32::try_from(product.stock.max(0)).unwrap_or(u32::MAX)
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn quantity_of(&self, product_id: &str) -> u32 {
        self.lines
            .iter()
            .find(|l| l.product.id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Adds `quantity` units, clamped to stock. Returns the line's new
    /// quantity.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<u32, CartError> {
        let max = max_stock(product);
        if max == 0 {
            return Err(CartError::OutOfStock(product.name.clone()));
        }
        match self.lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => {
                let next = line.quantity.saturating_add(quantity).min(max);
                if next == line.quantity {
                    return Err(CartError::MaxQuantityReached);
                }
                line.quantity = next;
                line.product = product.clone();
                Ok(next)
            }
            None => {
                let quantity = quantity.min(max);
                self.lines.push(CartLine {
                    product: product.clone(),
                    quantity,
                });
                Ok(quantity)
            }
        }
    }

    /// Sets a line's quantity, clamped to `0..=stock`. Zero removes it.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> Result<u32, CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product.id == product_id)
            .ok_or(CartError::UnknownProduct)?;
        let max = i64::from(max_stock(&self.lines[index].product));
        let safe = quantity.clamp(0, max) as u32;
        if safe == 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = safe;
        }
        Ok(safe)
    }

    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product.id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    /// Percentage in `0..=100`. Anything unparsable counts as no discount.
    pub fn set_discount(&mut self, rate: f64) -> f64 {
        self.discount_rate = if rate.is_finite() {
            rate.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.discount_rate
    }

    pub fn totals(&self) -> CartTotals {
        let subtotal: f64 = self.lines.iter().map(CartLine::amount).sum();
        let quantity = self.lines.iter().map(|l| l.quantity).sum();
        let discount_value = (subtotal * self.discount_rate / 100.0).min(subtotal);
        CartTotals {
            subtotal,
            discount_value,
            total: (subtotal - discount_value).max(0.0),
            quantity,
        }
    }
}
