use crate::barcode::{CleanedCode, CodeCleaner};
use crate::catalog::{Catalog, LoyaltyCustomer, Order, Product};
use crate::error::CatalogError;
use crate::types::{LookupResult, Notice, ScanContext};

/// Prefix of the QR payload printed on loyalty cards.
pub const LOYALTY_PREFIX: &str = "LOYALTY:";

/// Side effects the router triggers. Implemented by the UI layer; the
/// router itself never mutates records.
pub trait ScanActions {
    fn show_result(&mut self, context: ScanContext, result: &LookupResult);

    fn add_to_cart(&mut self, product: &Product, quantity: u32);

    fn select_customer(&mut self, customer: &LoyaltyCustomer);

    fn notify(&mut self, notice: Notice);
}

pub struct ScanRouter<C> {
    catalog: C,
    cleaner: CodeCleaner,
}

impl<C: Catalog> ScanRouter<C> {
    pub fn new(catalog: C, cleaner: CodeCleaner) -> Self {
        Self { catalog, cleaner }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut C {
        &mut self.catalog
    }

    pub fn cleaner(&self) -> &CodeCleaner {
        &self.cleaner
    }

    /// Pure lookup. Absence is `LookupResult::NotFound`, never an error.
    pub fn lookup(&self, code: &CleanedCode) -> Result<LookupResult, CatalogError> {
        let found = match code.context() {
            ScanContext::Inventory | ScanContext::PointOfSale => self.lookup_product(code)?,
            ScanContext::Pickup => self.lookup_pickup(code)?,
            ScanContext::Loyalty => self
                .lookup_customer(code)?
                .map(LookupResult::LoyaltyCustomer),
        };
        Ok(found.unwrap_or_else(|| LookupResult::NotFound {
            context: code.context(),
            code: code.as_str().to_string(),
        }))
    }

    /// Lookup, then the action for the context. Not-found results are
    /// notified once and never retried.
    pub fn dispatch(
        &self,
        code: &CleanedCode,
        actions: &mut dyn ScanActions,
    ) -> Result<LookupResult, CatalogError> {
        let result = self.lookup(code)?;
        match &result {
            LookupResult::NotFound { context, code } => {
                tracing::info!(%context, code = %code, "scan matched nothing");
                actions.notify(Notice::NotFound {
                    context: *context,
                    code: code.clone(),
                });
            }
            LookupResult::Product { product, .. } if code.context() == ScanContext::PointOfSale => {
                tracing::info!(sku = %product.sku, "scan added to cart");
                actions.add_to_cart(product, 1);
            }
            LookupResult::LoyaltyCustomer(customer) => {
                tracing::info!(customer = %customer.id, "loyalty customer scanned");
                actions.select_customer(customer);
            }
            LookupResult::Product { product, .. } | LookupResult::Order { product, .. } => {
                tracing::info!(context = %code.context(), sku = %product.sku, "scan resolved");
                actions.show_result(code.context(), &result);
            }
        }
        Ok(result)
    }

    fn product_by_sku(&self, code: &str) -> Result<Option<Product>, CatalogError> {
        let cleaner = self.cleaner;
        self.catalog
            .find_product(&|p: &Product| cleaner.sku_matches(&p.sku, code))
    }

    /// Most recently created order for `product` still open in `context`.
    fn related_order(
        &self,
        product: &Product,
        context: ScanContext,
    ) -> Result<Option<Order>, CatalogError> {
        let mut candidates: Vec<Order> = self
            .catalog
            .orders_for_product(&product.id)?
            .into_iter()
            .filter(|o| context.accepts_order(o.status))
            .collect();
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(candidates.into_iter().next())
    }

    fn lookup_product(&self, code: &CleanedCode) -> Result<Option<LookupResult>, CatalogError> {
        let Some(product) = self.product_by_sku(code.as_str())? else {
            return Ok(None);
        };
        let related_order = match code.context() {
            ScanContext::Inventory => self.related_order(&product, ScanContext::Inventory)?,
            _ => None,
        };
        Ok(Some(LookupResult::Product {
            product,
            related_order,
        }))
    }

    /// Order reference first, then product SKU. Pickup codes are digits
    /// only, so references such as `CMD-...` can never match here.
    fn lookup_pickup(&self, code: &CleanedCode) -> Result<Option<LookupResult>, CatalogError> {
        if let Some(order) = self.catalog.order_by_reference(code.as_str())? {
            if let Some(product) = self.catalog.product_by_id(&order.product_id)? {
                return Ok(Some(LookupResult::Order { product, order }));
            }
            tracing::warn!(reference = %order.reference, "order references a missing product");
        }

        let Some(product) = self.product_by_sku(code.as_str())? else {
            return Ok(None);
        };
        let related_order = self.related_order(&product, ScanContext::Pickup)?;
        Ok(Some(LookupResult::Product {
            product,
            related_order,
        }))
    }

    // card id, or the id in a `LOYALTY:<id>` QR payload
    fn lookup_customer(&self, code: &CleanedCode) -> Result<Option<LoyaltyCustomer>, CatalogError> {
        let cleaned = code.as_str();
        let raw = code.raw();
        if let Some(customer) = self
            .catalog
            .find_customer(&|c: &LoyaltyCustomer| c.id == cleaned || c.id == raw)?
        {
            return Ok(Some(customer));
        }

        let Some(segment) = raw.split(LOYALTY_PREFIX).nth(1).map(str::trim) else {
            return Ok(None);
        };
        if segment.is_empty() {
            return Ok(None);
        }
        let segment_cleaned = self
            .cleaner
            .clean_str(segment, ScanContext::Loyalty.policy());
        self.catalog.find_customer(&|c: &LoyaltyCustomer| {
            c.id == segment || (!segment_cleaned.is_empty() && c.id == segment_cleaned)
        })
    }
}

/// Free-text customer search over name, email, phone and id. Queries
/// shorter than two characters match nothing.
pub fn search_customers<C: Catalog>(
    catalog: &C,
    query: &str,
) -> Result<Vec<LoyaltyCustomer>, CatalogError> {
    let term = query.trim().to_lowercase();
    if term.chars().count() < 2 {
        return Ok(Vec::new());
    }
    catalog.filter_customers(&|c: &LoyaltyCustomer| {
        c.full_name().to_lowercase().contains(&term)
            || c.email.to_lowercase().contains(&term)
            || c.phone.to_lowercase().contains(&term)
            || c.id.to_lowercase().contains(&term)
    })
}
