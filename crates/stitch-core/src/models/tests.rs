#[cfg(test)]
mod model_tests {
    use jiff::Timestamp;
    use serde_json::json;

    use crate::models::{
        Actor, Garment, MovementKind, Order, Stage, StageRecord, StockRecord, PAUSED_LABEL,
    };

    fn create_test_order() -> Order {
        let mut order = Order::new("000042", Timestamp::from_second(1_700_000_000).unwrap());
        order.amounts.total = 150.0;
        order.amounts.advance = 30.0;
        order.size_detail = "Polo Negro (M)".to_string();
        order
            .extra
            .insert("clientContact".to_string(), json!("999 888 777"));
        order
    }

    #[test]
    fn test_new_order_starts_in_design() {
        let order = create_test_order();
        assert_eq!(order.stage, Stage::Design);
        assert_eq!(order.stage_label, "En Diseño");
        let design = order.record(Stage::Design).unwrap();
        assert_eq!(design.entered_at, Some(order.created_at));
        assert!(design.exited_at.is_none());
    }

    #[test]
    fn test_order_serializes_with_camel_case_paths() {
        let order = create_test_order();
        let value = serde_json::to_value(&order).unwrap();

        assert_eq!(value["stageLabel"], "En Diseño");
        assert_eq!(value["sizeDetail"], "Polo Negro (M)");
        assert_eq!(value["amounts"]["total"], 150.0);
        assert!(value["stageRecord"]["design"]["enteredAt"].is_string());
        // Registry-defined fields sit at the top level of the document.
        assert_eq!(value["clientContact"], "999 888 777");
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn test_order_json_round_trip() {
        let mut order = create_test_order();
        order.elapsed.record(Stage::Design, 2.5);
        order.garments.push(Garment::new("Polo", "Negro", "M", 2));

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["elapsed"]["design"], 2.5);
        assert_eq!(value["elapsed"]["total"], 2.5);
        assert_eq!(value["garments"][0]["type"], "Polo");

        let back: Order = serde_json::from_value(value).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_pending_never_negative() {
        let mut order = create_test_order();
        order.stage_record.insert(
            Stage::Billing,
            StageRecord {
                pay1: Some(100.0),
                pay2: Some(50.0),
                ..StageRecord::default()
            },
        );
        order.recompute_pending();
        assert_eq!(order.balance(), -30.0);
        assert_eq!(order.amounts.pending, 0.0);
    }

    #[test]
    fn test_stage_parsing_accepts_spanish_keys() {
        assert_eq!("diseño".parse::<Stage>().unwrap(), Stage::Design);
        assert_eq!("Cobranza".parse::<Stage>().unwrap(), Stage::Billing);
        assert_eq!("delivery".parse::<Stage>().unwrap(), Stage::Delivery);
        assert!("warehouse".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_from_label() {
        assert_eq!(Stage::from_label("En Reparto"), Some(Stage::Delivery));
        assert_eq!(Stage::from_label(PAUSED_LABEL), Some(Stage::Preparation));
        assert_eq!(Stage::from_label("Desconocido"), None);
    }

    #[test]
    fn test_stage_record_assignee_name_counts() {
        let record = StageRecord {
            assignee_name: Some("Rosa".to_string()),
            ..StageRecord::default()
        };
        assert!(record.has_assignee());
        assert!(!StageRecord::default().has_assignee());
    }

    #[test]
    fn test_stock_key_is_case_insensitive() {
        let a = StockRecord::new("Polo", "NEGRO", "m", 3);
        let b = StockRecord::new("polo ", "negro", "M", 1);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_movement_kind_labels_parse_back() {
        for kind in [
            MovementKind::Entry,
            MovementKind::Exit,
            MovementKind::Adjustment,
        ] {
            assert_eq!(kind.label().parse::<MovementKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_system_actor_default() {
        let actor = Actor::or_system(None);
        assert_eq!(actor.id, "system");
    }
}
