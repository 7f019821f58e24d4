//! Stage/flow registry.
//!
//! A [`Flow`] is the ordered list of stages a business process uses, each
//! with its exit and entry conditions. The registry is plain data: the
//! transition controller only reads it, and configuration writes replace it
//! wholesale.

use serde::{Deserialize, Serialize};

use crate::conditions::{builtin_exit_conditions, Condition};
use crate::error::{PipelineError, Result};
use crate::inventory::DEFAULT_INVENTORY;
use crate::models::{Stage, DEFAULT_FLOW_ID};

/// Conditions configured for one stage of a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDefinition {
    #[serde(rename = "stageId")]
    pub stage: Stage,

    #[serde(default)]
    pub exit_conditions: Vec<Condition>,

    #[serde(default)]
    pub entry_conditions: Vec<Condition>,
}

impl StageDefinition {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            exit_conditions: Vec::new(),
            entry_conditions: Vec::new(),
        }
    }

    /// Configured exit conditions, or the built-in fallback when none are.
    pub fn effective_exit_conditions(&self) -> Vec<Condition> {
        if self.exit_conditions.is_empty() {
            builtin_exit_conditions(self.stage)
        } else {
            self.exit_conditions.clone()
        }
    }
}

/// An ordered set of stages and their conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub stages: Vec<StageDefinition>,
}

impl Flow {
    /// A flow with every stage in pipeline order and no conditions.
    pub fn standard(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stages: Stage::ALL.into_iter().map(StageDefinition::new).collect(),
        }
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.iter().any(|s| s.stage == stage)
    }

    fn position(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|s| s.stage == stage)
    }

    /// True when an entry auto-skip on `entered` that lands on `target`
    /// would carry the order past preparation without ever leaving it, and
    /// so without drawing its garments from stock.
    pub fn bypasses_preparation(&self, entered: Stage, target: Stage) -> bool {
        let (Some(prep), Some(entered), Some(target)) = (
            self.position(Stage::Preparation),
            self.position(entered),
            self.position(target),
        ) else {
            return false;
        };
        entered <= prep && prep < target
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    fn stage_mut(&mut self, stage: Stage) -> Result<&mut StageDefinition> {
        let flow_id = self.id.clone();
        self.stages
            .iter_mut()
            .find(|s| s.stage == stage)
            .ok_or_else(|| {
                PipelineError::invalid_input("stage")
                    .with_reason(format!("stage '{}' is not part of flow '{flow_id}'", stage.as_str()))
            })
    }

    /// Next non-cancelled stage after `stage` in this flow's order.
    pub fn next_after(&self, stage: Stage) -> Option<Stage> {
        self.stages
            .iter()
            .map(|s| s.stage)
            .filter(|s| *s != Stage::Cancelled)
            .skip_while(|s| *s != stage)
            .nth(1)
    }

    /// Exit conditions in effect for `stage`, with the built-in fallback.
    pub fn exit_conditions(&self, stage: Stage) -> Vec<Condition> {
        self.stage(stage)
            .map(StageDefinition::effective_exit_conditions)
            .unwrap_or_else(|| builtin_exit_conditions(stage))
    }

    /// Inventory consulted when routing into preparation: the first stock
    /// condition on billing or preparation, else the default.
    pub fn preparation_inventory(&self) -> &str {
        [Stage::Billing, Stage::Preparation]
            .into_iter()
            .filter_map(|stage| self.stage(stage))
            .flat_map(|def| def.exit_conditions.iter().chain(&def.entry_conditions))
            .find(|c| c.kind.reads_stock() && c.params.inventory_ref.is_some())
            .map_or(DEFAULT_INVENTORY, Condition::inventory)
    }

    /// Every inventory reference any condition of this flow names.
    pub fn inventory_refs(&self) -> Vec<&str> {
        let mut refs = vec![DEFAULT_INVENTORY];
        for def in &self.stages {
            for condition in def.exit_conditions.iter().chain(&def.entry_conditions) {
                let inventory = condition.inventory();
                if condition.kind.reads_stock() && !refs.contains(&inventory) {
                    refs.push(inventory);
                }
            }
        }
        refs
    }

    fn validate(&self) -> Result<()> {
        for def in &self.stages {
            for condition in &def.entry_conditions {
                if !condition.params.auto_skip {
                    continue;
                }
                match condition.params.target_stage_id {
                    Some(target) if self.bypasses_preparation(def.stage, target) => {
                        return Err(PipelineError::invalid_input("targetStageId").with_reason(format!(
                            "auto-skip from '{}' to '{}' would bypass preparation and its stock draw",
                            def.stage.as_str(),
                            target.as_str()
                        )))
                    }
                    Some(target) if self.contains(target) => {}
                    Some(target) => {
                        return Err(PipelineError::invalid_input("targetStageId").with_reason(format!(
                            "auto-skip target '{}' is not part of flow '{}'",
                            target.as_str(),
                            self.id
                        )))
                    }
                    None => {
                        return Err(PipelineError::invalid_input("targetStageId")
                            .with_reason("auto-skip conditions need a target stage"))
                    }
                }
            }
        }
        Ok(())
    }
}

/// Every flow known to the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRegistry {
    pub flows: Vec<Flow>,
}

impl Default for FlowRegistry {
    fn default() -> Self {
        Self {
            flows: vec![Flow::standard(DEFAULT_FLOW_ID, "Pedidos")],
        }
    }
}

impl FlowRegistry {
    pub fn flow(&self, id: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.id == id)
    }

    /// Looks up a flow, failing when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Configuration` for an unknown flow id.
    pub fn require(&self, id: &str) -> Result<&Flow> {
        self.flow(id)
            .ok_or_else(|| PipelineError::configuration(format!("Unknown flow '{id}'")))
    }

    pub fn stage(&self, flow_id: &str, stage: Stage) -> Option<&StageDefinition> {
        self.flow(flow_id).and_then(|f| f.stage(stage))
    }

    /// Adds a flow or replaces the one with the same id.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidInput` when an auto-skip condition
    /// targets a stage outside the flow or jumps over preparation.
    pub fn upsert_flow(&mut self, flow: Flow) -> Result<()> {
        flow.validate()?;
        match self.flows.iter_mut().find(|f| f.id == flow.id) {
            Some(existing) => *existing = flow,
            None => self.flows.push(flow),
        }
        Ok(())
    }

    /// Replaces the exit conditions of one stage.
    pub fn set_exit_conditions(&mut self, flow_id: &str, stage: Stage, conditions: Vec<Condition>) -> Result<()> {
        let mut flow = self.require(flow_id)?.clone();
        flow.stage_mut(stage)?.exit_conditions = conditions;
        self.upsert_flow(flow)
    }

    /// Replaces the entry conditions of one stage.
    pub fn set_entry_conditions(&mut self, flow_id: &str, stage: Stage, conditions: Vec<Condition>) -> Result<()> {
        let mut flow = self.require(flow_id)?.clone();
        flow.stage_mut(stage)?.entry_conditions = conditions;
        self.upsert_flow(flow)
    }

    /// Writes the built-in fallback exit conditions into every stage that
    /// has none, making them visible and editable.
    pub fn with_default_exit_conditions(mut self) -> Self {
        for flow in &mut self.flows {
            for def in &mut flow.stages {
                if def.exit_conditions.is_empty() {
                    def.exit_conditions = builtin_exit_conditions(def.stage);
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::ConditionKind;

    #[test]
    fn test_next_after_follows_flow_order_and_skips_cancelled() {
        let flow = Flow::standard("orders", "Pedidos");
        assert_eq!(flow.next_after(Stage::Design), Some(Stage::Billing));
        assert_eq!(flow.next_after(Stage::Delivery), Some(Stage::Finalized));
        assert_eq!(flow.next_after(Stage::Finalized), None);

        let mut short = flow.clone();
        short.stages.retain(|s| s.stage != Stage::Stamping);
        assert_eq!(short.next_after(Stage::Preparation), Some(Stage::Packaging));
    }

    #[test]
    fn test_exit_conditions_fall_back_when_empty() {
        let mut registry = FlowRegistry::default();
        let flow = registry.require(DEFAULT_FLOW_ID).unwrap();
        assert_eq!(flow.exit_conditions(Stage::Billing)[0].kind, ConditionKind::NoBalanceDue);

        registry
            .set_exit_conditions(
                DEFAULT_FLOW_ID,
                Stage::Billing,
                vec![Condition::new(ConditionKind::CommentAdded).on_stage(Stage::Billing)],
            )
            .unwrap();
        let flow = registry.require(DEFAULT_FLOW_ID).unwrap();
        assert_eq!(flow.exit_conditions(Stage::Billing).len(), 1);
        assert_eq!(flow.exit_conditions(Stage::Billing)[0].kind, ConditionKind::CommentAdded);
    }

    #[test]
    fn test_auto_skip_target_must_be_in_flow() {
        let mut registry = FlowRegistry::default();
        let mut flow = Flow::standard("express", "Express");
        flow.stages.retain(|s| s.stage != Stage::Packaging);
        registry.upsert_flow(flow).unwrap();

        let err = registry
            .set_entry_conditions(
                "express",
                Stage::Stamping,
                vec![Condition::new(ConditionKind::StockAvailable).auto_skip_to(Stage::Packaging)],
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput { .. }));
    }

    #[test]
    fn test_auto_skip_may_not_jump_over_preparation() {
        let mut registry = FlowRegistry::default();
        for (entered, target) in [
            (Stage::Preparation, Stage::Stamping),
            (Stage::Billing, Stage::Packaging),
        ] {
            let err = registry
                .set_entry_conditions(
                    DEFAULT_FLOW_ID,
                    entered,
                    vec![Condition::new(ConditionKind::StockAvailable).auto_skip_to(target)],
                )
                .unwrap_err();
            assert!(matches!(err, PipelineError::InvalidInput { .. }));
        }

        registry
            .set_entry_conditions(
                DEFAULT_FLOW_ID,
                Stage::Billing,
                vec![Condition::new(ConditionKind::NoBalanceDue).auto_skip_to(Stage::Preparation)],
            )
            .unwrap();
        let flow = registry.require(DEFAULT_FLOW_ID).unwrap();
        assert!(!flow.bypasses_preparation(Stage::Stamping, Stage::Delivery));
    }

    #[test]
    fn test_preparation_inventory_prefers_configured_stock_condition() {
        let mut registry = FlowRegistry::default();
        let flow = registry.require(DEFAULT_FLOW_ID).unwrap();
        assert_eq!(flow.preparation_inventory(), DEFAULT_INVENTORY);

        registry
            .set_exit_conditions(
                DEFAULT_FLOW_ID,
                Stage::Preparation,
                vec![Condition::new(ConditionKind::StockReduced).with_inventory("inventory-products")],
            )
            .unwrap();
        let flow = registry.require(DEFAULT_FLOW_ID).unwrap();
        assert_eq!(flow.preparation_inventory(), "inventory-products");
        assert_eq!(flow.inventory_refs(), vec![DEFAULT_INVENTORY, "inventory-products"]);
    }

    #[test]
    fn test_with_default_exit_conditions_fills_only_empty_stages() {
        let mut registry = FlowRegistry::default();
        registry
            .set_exit_conditions(
                DEFAULT_FLOW_ID,
                Stage::Design,
                vec![Condition::new(ConditionKind::AssigneeSet)],
            )
            .unwrap();
        let registry = registry.with_default_exit_conditions();
        let flow = registry.require(DEFAULT_FLOW_ID).unwrap();
        assert_eq!(flow.stage(Stage::Design).unwrap().exit_conditions.len(), 1);
        assert_eq!(flow.stage(Stage::Design).unwrap().exit_conditions[0].kind, ConditionKind::AssigneeSet);
        assert_eq!(flow.stage(Stage::Delivery).unwrap().exit_conditions.len(), 1);
        assert!(flow.stage(Stage::Finalized).unwrap().exit_conditions.is_empty());
    }
}
