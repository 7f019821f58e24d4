//! Collection wrapper types for displaying groups of domain objects.
//!
//! Each wrapper owns its items, renders an explicit message when empty and
//! otherwise formats every item in a shared markdown layout.

use std::{fmt, ops::Index};

use super::datetime::LocalDateTime;
use crate::fields::FieldDefinition;
use crate::models::{Order, StockMovement, StockRecord};

macro_rules! collection {
    ($(#[$meta:meta])* $name:ident, $item:ty) => {
        $(#[$meta])*
        pub struct $name(pub Vec<$item>);

        impl $name {
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn get(&self, index: usize) -> Option<&$item> {
                self.0.get(index)
            }

            pub fn iter(&self) -> std::slice::Iter<'_, $item> {
                self.0.iter()
            }
        }

        impl Index<usize> for $name {
            type Output = $item;

            fn index(&self, index: usize) -> &Self::Output {
                &self.0[index]
            }
        }

        impl IntoIterator for $name {
            type Item = $item;
            type IntoIter = std::vec::IntoIter<Self::Item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = &'a $item;
            type IntoIter = std::slice::Iter<'a, $item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }
    };
}

collection!(
    /// Orders as a one-line-per-order overview.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jiff::Timestamp;
    /// use stitch_core::{display::Orders, models::Order};
    ///
    /// let orders = Orders(vec![Order::new("000001", Timestamp::UNIX_EPOCH)]);
    /// assert!(orders.to_string().contains("000001"));
    /// assert_eq!(Orders(vec![]).to_string(), "No orders found.\n");
    /// ```
    Orders,
    Order
);

collection!(
    /// One inventory's records as a markdown table.
    StockListing,
    StockRecord
);

collection!(
    /// Registered fields, or the columns of one stage.
    Fields,
    FieldDefinition
);

collection!(StockMovements, StockMovement);

impl fmt::Display for Orders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No orders found.");
        }
        for order in &self.0 {
            write!(f, "- **{}** {}", order.id, order.stage_label)?;
            if order.amounts.pending > 0.0 {
                write!(f, ", owes {:.2}", order.amounts.pending)?;
            }
            if !order.size_detail.trim().is_empty() {
                write!(f, ", {}", order.size_detail.lines().next().unwrap_or_default())?;
            }
            writeln!(f, " ({})", LocalDateTime::new(&order.created_at))?;
        }
        Ok(())
    }
}

impl fmt::Display for StockListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No stock records found.");
        }
        writeln!(f, "| Type | Color | Size | Quantity | Exits |")?;
        writeln!(f, "|---|---|---|---:|---:|")?;
        for record in &self.0 {
            writeln!(f, "{record}")?;
        }
        let units: i64 = self.0.iter().map(|r| r.quantity).sum();
        writeln!(f)?;
        writeln!(f, "{} records, {units} units.", self.0.len())
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No fields found.");
        }
        for field in &self.0 {
            write!(f, "- `{}` {} → `{}`", field.id, field.label, field.path)?;
            let mut flags = Vec::new();
            if field.is_system {
                flags.push("system");
            }
            if field.is_formula() {
                flags.push("formula");
            } else if field.editable {
                flags.push("editable");
            }
            if !flags.is_empty() {
                write!(f, " ({})", flags.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for StockMovements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No stock movements recorded.");
        }
        for movement in &self.0 {
            writeln!(f, "- {movement}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldRegistry;

    #[test]
    fn test_stock_listing_table() {
        let listing = StockListing(vec![
            StockRecord::new("Polo", "Negro", "M", 4),
            StockRecord::new("Polo", "Blanco", "L", 1),
        ]);
        let output = listing.to_string();
        assert!(output.contains("| Polo | Negro | M | 4 | 0 |"));
        assert!(output.ends_with("2 records, 5 units.\n"));
        assert_eq!(StockListing(vec![]).to_string(), "No stock records found.\n");
    }

    #[test]
    fn test_fields_flags() {
        let registry = FieldRegistry::default();
        let fields = Fields(registry.fields().to_vec());
        let output = fields.to_string();
        assert!(output.contains("- `id` N° → `id` (system)"));
        assert!(output.contains("`amountPending` Debe → `amounts.pending` (system, formula)"));
        assert_eq!(fields.len(), registry.len());
    }
}
