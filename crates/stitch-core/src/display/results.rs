//! Result wrapper types for displaying operation outcomes.

use std::fmt;

use crate::inventory::csv::StockMerge;
use crate::inventory::StockVerdict;
use crate::mapping::HeaderMapping;
use crate::models::Order;
use crate::pipeline::AdvanceOutcome;

/// Wrapper type for displaying the result of create operations.
///
/// # Examples
///
/// ```rust
/// use jiff::Timestamp;
/// use stitch_core::{display::CreateResult, models::Order};
///
/// let result = CreateResult::new(Order::new("000001", Timestamp::UNIX_EPOCH));
/// assert!(result.to_string().starts_with("Created order 000001"));
/// ```
pub struct CreateResult<T> {
    pub resource: T,
}

impl<T> CreateResult<T> {
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

impl fmt::Display for CreateResult<Order> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created order {}", self.resource.id)?;
        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

/// Wrapper type for displaying the result of update operations, with an
/// optional list of the changes made.
pub struct UpdateResult<T> {
    pub resource: T,
    pub changes: Vec<String>,
}

impl<T> UpdateResult<T> {
    pub fn new(resource: T) -> Self {
        Self {
            resource,
            changes: Vec::new(),
        }
    }

    pub fn with_changes(resource: T, changes: Vec<String>) -> Self {
        Self { resource, changes }
    }
}

impl fmt::Display for UpdateResult<Order> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Updated order {}", self.resource.id)?;

        if !self.changes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Changes made:")?;
            for change in &self.changes {
                writeln!(f, "- {change}")?;
            }
        }

        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

impl fmt::Display for AdvanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvanceOutcome::Advanced { order, from, to } => {
                writeln!(
                    f,
                    "Order {} moved from {} to {} ({})",
                    order.id,
                    from.name(),
                    to.name(),
                    order.stage_label
                )?;
                if let Some(hold) = &order.hold {
                    writeln!(f)?;
                    writeln!(f, "Paused: {}", hold.reason)?;
                }
                Ok(())
            }
            AdvanceOutcome::Rejected { missing } => {
                writeln!(f, "The order cannot advance yet. Missing:")?;
                writeln!(f)?;
                for label in missing {
                    writeln!(f, "- {label}")?;
                }
                Ok(())
            }
            AdvanceOutcome::StockConflict { shortfall } => {
                writeln!(f, "Stock changed before the order could leave preparation: {shortfall}")
            }
        }
    }
}

impl fmt::Display for StockVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockVerdict::Sufficient => writeln!(f, "Stock is sufficient."),
            StockVerdict::Short(shortfall) => writeln!(f, "Stock is short: {shortfall}"),
        }
    }
}

impl fmt::Display for HeaderMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.mapping.is_empty() {
            writeln!(f, "| Header | Field | Path | Score |")?;
            writeln!(f, "|---|---|---|---:|")?;
            for (header, mapped) in &self.mapping {
                let score = if mapped.manual {
                    "manual".to_string()
                } else {
                    format!("{:.0}", mapped.score)
                };
                writeln!(f, "| {header} | {} | `{}` | {score} |", mapped.label, mapped.path)?;
            }
        }
        for (title, headers) in [
            ("Unmapped", &self.unmapped),
            ("Skipped", &self.skipped),
            ("Duplicated", &self.duplicates),
        ] {
            if !headers.is_empty() {
                writeln!(f)?;
                writeln!(f, "{title}: {}", headers.join(", "))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for StockMerge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Imported {} rows ({} units) into {} records.",
            self.rows,
            self.units,
            self.records.len()
        )
    }
}

/// Ids of the orders released by a paused-order recheck.
pub struct Released(pub Vec<String>);

impl fmt::Display for Released {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No paused orders could be released.")
        } else {
            writeln!(f, "Released {} orders: {}", self.0.len(), self.0.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Shortfall;

    #[test]
    fn test_rejected_outcome_lists_missing() {
        let outcome = AdvanceOutcome::Rejected {
            missing: vec!["URL Agregado".to_string(), "Tallas Agregadas".to_string()],
        };
        let output = outcome.to_string();
        assert!(output.contains("- URL Agregado\n"));
        assert!(output.contains("- Tallas Agregadas\n"));
    }

    #[test]
    fn test_conflict_outcome_names_shortfall() {
        let outcome = AdvanceOutcome::StockConflict {
            shortfall: Shortfall::InventoryEmpty {
                inventory: "garmentStock".to_string(),
            },
        };
        assert!(outcome.to_string().contains("garmentStock"));
    }

    #[test]
    fn test_mapping_lists_unmapped() {
        let mapping = HeaderMapping {
            unmapped: vec!["Misterio".to_string()],
            ..HeaderMapping::default()
        };
        assert_eq!(mapping.to_string(), "\nUnmapped: Misterio\n");
        assert_eq!(Released(vec![]).to_string(), "No paused orders could be released.\n");
    }
}
