//! Display implementations for domain models.
//!
//! Kept apart from the model definitions. Everything renders as markdown so
//! the CLI can pass it straight to its terminal renderer.

use std::fmt;

use super::datetime::{Hours, LocalDateTime};
use crate::conditions::Condition;
use crate::flows::Flow;
use crate::inventory::Shortfall;
use crate::models::{
    ChangeLogEntry, Garment, MovementKind, Order, Stage, StockHold, StockMovement, StockRecord,
};

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Garment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.color, self.size)?;
        if self.quantity > 1 {
            write!(f, " x{}", self.quantity)?;
        }
        Ok(())
    }
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortfall::InventoryEmpty { inventory } => {
                write!(f, "inventory '{inventory}' has no stock records")
            }
            Shortfall::NoItemsParsed => f.write_str("no garments could be read from the order"),
            Shortfall::NotFound { item } => write!(f, "{item} is not stocked"),
            Shortfall::Insufficient {
                item,
                requested,
                available,
            } => write!(
                f,
                "{} {} ({}): {requested} requested, {available} available",
                item.kind, item.color, item.size
            ),
        }
    }
}

impl fmt::Display for StockHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "waiting on {} since {}: {}",
            self.inventory,
            LocalDateTime::new(&self.since),
            self.reason
        )
    }
}

impl fmt::Display for ChangeLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} **{}**: {}",
            LocalDateTime::new(&self.timestamp),
            self.action,
            self.detail
        )
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Order {}", self.id)?;
        writeln!(f)?;
        writeln!(f, "- Stage: {} ({})", self.stage.name(), self.stage_label)?;
        if self.flow_id != crate::models::DEFAULT_FLOW_ID {
            writeln!(f, "- Flow: {}", self.flow_id)?;
        }
        if let Some(hold) = &self.hold {
            writeln!(f, "- Hold: {hold}")?;
        }
        writeln!(
            f,
            "- Amounts: total {:.2}, advance {:.2}, pending {:.2}",
            self.amounts.total, self.amounts.advance, self.amounts.pending
        )?;
        writeln!(f, "- Created: {}", LocalDateTime::new(&self.created_at))?;
        if let Some(updated) = &self.updated_at {
            writeln!(f, "- Updated: {}", LocalDateTime::new(updated))?;
        }
        if let Some(finalized) = &self.finalized_at {
            writeln!(f, "- Finalized: {}", LocalDateTime::new(finalized))?;
        }
        if self.imported {
            writeln!(f, "- Imported")?;
        }

        if !self.line_items.is_empty() {
            writeln!(f, "\n## Products")?;
            writeln!(f)?;
            for item in &self.line_items {
                writeln!(f, "- {} x{}", item.product, item.quantity)?;
            }
        }
        if !self.size_detail.trim().is_empty() {
            writeln!(f, "\n## Sizes")?;
            writeln!(f)?;
            writeln!(f, "{}", self.size_detail)?;
        }

        let visited: Vec<_> = Stage::WORKING
            .iter()
            .filter_map(|stage| self.record(*stage).map(|r| (*stage, r)))
            .collect();
        if !visited.is_empty() {
            writeln!(f, "\n## Stages")?;
            writeln!(f)?;
            for (stage, record) in visited {
                write!(f, "- {}", stage.name())?;
                if let Some(status) = &record.status {
                    write!(f, " [{status}]")?;
                }
                if let Some(name) = record.assignee_name.as_ref().or(record.assignee.as_ref()) {
                    write!(f, " by {name}")?;
                }
                if let Some(hours) = self.elapsed.stages.get(&stage) {
                    write!(f, ", {}", Hours(*hours))?;
                }
                writeln!(f)?;
            }
        }

        if !self.change_log.is_empty() {
            writeln!(f, "\n## Change Log")?;
            writeln!(f)?;
            for entry in &self.change_log {
                writeln!(f, "- {entry}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for StockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "| {} | {} | {} | {} | {} |",
            self.kind, self.color, self.size, self.quantity, self.exits
        )
    }
}

impl fmt::Display for StockMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}) {}: {}",
            LocalDateTime::new(&self.timestamp),
            self.action,
            self.quantity,
            self.user,
            self.detail
        )
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (`{}`)", self.label(), self.kind)?;
        if !self.required {
            f.write_str(", optional")?;
        }
        if self.kind.reads_stock() {
            write!(f, ", inventory {}", self.inventory())?;
        }
        if self.params.auto_skip {
            if let Some(target) = self.params.target_stage_id {
                write!(f, ", skips to {}", target.name())?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {} ({})", self.name, self.id)?;
        for def in &self.stages {
            writeln!(f, "\n## {}", def.stage.name())?;
            writeln!(f)?;
            let exit = def.effective_exit_conditions();
            if exit.is_empty() {
                writeln!(f, "No exit conditions.")?;
            }
            for condition in &exit {
                writeln!(f, "- Exit: {condition}")?;
            }
            for condition in &def.entry_conditions {
                writeln!(f, "- Entry: {condition}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::conditions::ConditionKind;

    #[test]
    fn test_shortfall_messages() {
        let item = Garment::new("Polo", "Negro", "M", 2);
        let short = Shortfall::Insufficient {
            item: item.clone(),
            requested: 2,
            available: 1,
        };
        assert_eq!(short.to_string(), "Polo Negro (M): 2 requested, 1 available");
        assert_eq!(
            Shortfall::NotFound { item }.to_string(),
            "Polo Negro (M) x2 is not stocked"
        );
    }

    #[test]
    fn test_order_display_lists_sections() {
        let mut order = Order::new("000007", Timestamp::UNIX_EPOCH);
        order.size_detail = "Polo Negro (M)".to_string();
        let text = order.to_string();
        assert!(text.starts_with("# Order 000007"));
        assert!(text.contains("- Stage: Diseño (En Diseño)"));
        assert!(text.contains("## Sizes"));
        assert!(text.contains("## Stages"));
        assert!(!text.contains("## Change Log"));
    }

    #[test]
    fn test_condition_display() {
        let condition = Condition::new(ConditionKind::StockAvailable).optional();
        let text = condition.to_string();
        assert!(text.starts_with("Hay Stock (`stock_available`)"));
        assert!(text.contains("optional"));
        assert!(text.contains("inventory-garments"));
    }
}
