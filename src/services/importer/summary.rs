use serde::Serialize;
use std::fmt;

/// Line item dropped because its article is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedArticle {
    pub order_number: i32,
    pub article: String,
}

/// Counts reported at the end of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub products: u64,
    pub categories: u64,
    pub manufacturers: u64,
    pub suppliers: u64,
    pub delivery_points: u64,
    pub users: u64,
    pub orders: u64,
    pub order_items: u64,
    pub skipped_products: u64,
    pub skipped_users: u64,
    pub skipped_orders: u64,
    /// Pairs whose quantity was not an integer
    pub skipped_line_items: u64,
    pub unresolved_articles: Vec<UnresolvedArticle>,
}

impl ImportSummary {
    /// Entity counts only, for comparing two runs.
    pub fn entity_counts(&self) -> [u64; 8] {
        [
            self.products,
            self.categories,
            self.manufacturers,
            self.suppliers,
            self.delivery_points,
            self.users,
            self.orders,
            self.order_items,
        ]
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Products:        {}", self.products)?;
        writeln!(f, "Categories:      {}", self.categories)?;
        writeln!(f, "Manufacturers:   {}", self.manufacturers)?;
        writeln!(f, "Suppliers:       {}", self.suppliers)?;
        writeln!(f, "Delivery points: {}", self.delivery_points)?;
        writeln!(f, "Users:           {}", self.users)?;
        writeln!(f, "Orders:          {}", self.orders)?;
        write!(f, "Order items:     {}", self.order_items)?;

        let skipped = self.skipped_products + self.skipped_users + self.skipped_orders;
        if skipped > 0 || self.skipped_line_items > 0 {
            write!(
                f,
                "\nSkipped rows:    {} products, {} users, {} orders, {} line items",
                self.skipped_products,
                self.skipped_users,
                self.skipped_orders,
                self.skipped_line_items
            )?;
        }
        if !self.unresolved_articles.is_empty() {
            write!(f, "\nUnknown articles: {}", self.unresolved_articles.len())?;
        }
        Ok(())
    }
}
