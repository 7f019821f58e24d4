//! Pipeline stages and their fixed per-stage vocabulary.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label shown while a preparation order is waiting for stock.
pub const PAUSED_LABEL: &str = "En Pausa por Stock";

/// Label shown while a preparation order has its stock secured.
pub const READY_LABEL: &str = "Listo para Preparar";

/// One station of the fulfillment pipeline.
///
/// The declaration order is the nominal pipeline order; `Cancelled` sits
/// outside the sequence and is only reached through cancellation.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Design,
    Billing,
    Preparation,
    Stamping,
    Packaging,
    Delivery,
    Finalized,
    Cancelled,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 8] = [
        Stage::Design,
        Stage::Billing,
        Stage::Preparation,
        Stage::Stamping,
        Stage::Packaging,
        Stage::Delivery,
        Stage::Finalized,
        Stage::Cancelled,
    ];

    /// Stages that carry a stage record and can be exited by `advance`.
    pub const WORKING: [Stage; 6] = [
        Stage::Design,
        Stage::Billing,
        Stage::Preparation,
        Stage::Stamping,
        Stage::Packaging,
        Stage::Delivery,
    ];

    /// Stages whose assignee is an operator.
    pub const OPERATOR_STAGES: [Stage; 3] =
        [Stage::Preparation, Stage::Stamping, Stage::Packaging];

    /// Storage key, also used as the field-path segment under `stageRecord`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Design => "design",
            Stage::Billing => "billing",
            Stage::Preparation => "preparation",
            Stage::Stamping => "stamping",
            Stage::Packaging => "packaging",
            Stage::Delivery => "delivery",
            Stage::Finalized => "finalized",
            Stage::Cancelled => "cancelled",
        }
    }

    /// Human status string stored in `stageLabel`.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Design => "En Diseño",
            Stage::Billing => "En Cobranza",
            Stage::Preparation => READY_LABEL,
            Stage::Stamping => "En Estampado",
            Stage::Packaging => "En Empaquetado",
            Stage::Delivery => "En Reparto",
            Stage::Finalized => "Finalizado",
            Stage::Cancelled => "Anulado",
        }
    }

    /// Short display name of the stage itself.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Design => "Diseño",
            Stage::Billing => "Cobranza",
            Stage::Preparation => "Preparación",
            Stage::Stamping => "Estampado",
            Stage::Packaging => "Empaquetado",
            Stage::Delivery => "Reparto",
            Stage::Finalized => "Finalizado",
            Stage::Cancelled => "Anulado",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Finalized | Stage::Cancelled)
    }

    /// Change-log action recorded when an order leaves this stage.
    pub fn exit_action(&self) -> &'static str {
        match self {
            Stage::Design => "Diseño Completado",
            Stage::Billing => "Avanzado a Preparación",
            Stage::Preparation => "Avanzado a Estampado",
            Stage::Stamping => "Avanzado a Empaquetado",
            Stage::Packaging => "Avanzado a Reparto",
            Stage::Delivery => "Pedido Finalizado",
            Stage::Finalized | Stage::Cancelled => "Sin Cambios",
        }
    }

    /// Stage-local status stamped on the record when the order leaves.
    pub fn exit_status(&self) -> Option<&'static str> {
        match self {
            Stage::Design => Some("TERMINADO"),
            Stage::Billing => Some("PAGADO"),
            Stage::Preparation | Stage::Stamping | Stage::Packaging => Some("LISTO"),
            Stage::Delivery => Some("ENTREGADO"),
            Stage::Finalized | Stage::Cancelled => None,
        }
    }

    /// Resolves a canonical stage label (or any label keyword) to its stage.
    pub fn from_label(label: &str) -> Option<Stage> {
        if label == PAUSED_LABEL {
            return Some(Stage::Preparation);
        }
        Stage::ALL.into_iter().find(|stage| stage.label() == label)
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "design" | "diseño" | "diseno" => Ok(Stage::Design),
            "billing" | "cobranza" => Ok(Stage::Billing),
            "preparation" | "preparacion" | "preparación" => Ok(Stage::Preparation),
            "stamping" | "estampado" => Ok(Stage::Stamping),
            "packaging" | "empaquetado" => Ok(Stage::Packaging),
            "delivery" | "reparto" => Ok(Stage::Delivery),
            "finalized" | "finalizado" => Ok(Stage::Finalized),
            "cancelled" | "anulado" => Ok(Stage::Cancelled),
            _ => Err(format!("Invalid stage: {s}")),
        }
    }
}
