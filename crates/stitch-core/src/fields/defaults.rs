//! Catalog seeded into an empty configuration.

use super::{FieldDefinition, FieldFormat, Formula, ValueType, BASIC_CATEGORY};
use crate::models::Stage;

/// Number of repeating product and comment groups in the catalog.
pub const REPEATED_GROUPS: usize = 4;

const STAGE_STATUSES: [&str; 4] = ["PENDIENTE", "EN PROCESO", "LISTO", "OBSERVADO"];

struct Catalog {
    fields: Vec<FieldDefinition>,
}

impl Catalog {
    fn push(&mut self, mut field: FieldDefinition) {
        field.order = u32::try_from(self.fields.len() + 1).unwrap_or(u32::MAX);
        self.fields.push(field);
    }

    fn text(&mut self, id: &str, label: &str, path: &str, category: &str) -> &mut FieldDefinition {
        self.push(FieldDefinition::new(id, label, path, ValueType::Text, category).editable());
        self.last()
    }

    fn number(&mut self, id: &str, label: &str, path: &str, category: &str) -> &mut FieldDefinition {
        self.push(FieldDefinition::new(id, label, path, ValueType::Number, category).editable());
        self.last()
    }

    fn date(&mut self, id: &str, label: &str, path: &str, category: &str) -> &mut FieldDefinition {
        self.push(
            FieldDefinition::new(id, label, path, ValueType::Date, category)
                .editable()
                .with_format(FieldFormat::Date),
        );
        self.last()
    }

    fn last(&mut self) -> &mut FieldDefinition {
        let pos = self.fields.len() - 1;
        &mut self.fields[pos]
    }
}

fn stage_path(stage: Stage, leaf: &str) -> String {
    format!("stageRecord.{}.{leaf}", stage.as_str())
}

fn stage_id(stage: Stage, suffix: &str) -> String {
    format!("{}{suffix}", stage.as_str())
}

/// Pending balance: `max(0, total - advance - (pay1 + pay2))`.
pub fn pending_formula() -> Formula {
    Formula::max(vec![
        Formula::constant(0.0),
        Formula::sub(
            Formula::sub(Formula::field("amounts.total"), Formula::field("amounts.advance")),
            Formula::sum(vec![
                Formula::field(stage_path(Stage::Billing, "pay1")),
                Formula::field(stage_path(Stage::Billing, "pay2")),
            ]),
        ),
    ])
}

fn stage_hours(stage: Stage) -> Formula {
    Formula::hours(stage_path(stage, "enteredAt"), stage_path(stage, "exitedAt"))
}

/// The default field catalog in intrinsic order.
pub fn default_fields() -> Vec<FieldDefinition> {
    let mut c = Catalog { fields: Vec::new() };

    // basic
    c.push(FieldDefinition::new("id", "N°", "id", ValueType::Text, BASIC_CATEGORY).system().visible());
    c.push(
        FieldDefinition::new("createdAt", "Fecha", "createdAt", ValueType::Date, BASIC_CATEGORY)
            .system()
            .visible()
            .with_format(FieldFormat::Date),
    );
    c.push(
        FieldDefinition::new("activator", "ACT", "activator", ValueType::Enum, BASIC_CATEGORY)
            .editable()
            .with_options(["S", "E", "L", "G", "O"]),
    );
    c.text("salesChannel", "Canal de Venta", "salesChannel", BASIC_CATEGORY);
    c.text("whatsappOrigin", "Origen WhatsApp", "whatsappOrigin", BASIC_CATEGORY);
    c.text("seller", "Vendedor", "seller", BASIC_CATEGORY).visible = true;
    c.number("quantity", "Cantidad", "quantity", BASIC_CATEGORY);
    c.text("lineItems", "Productos", "lineItems", BASIC_CATEGORY).visible = true;
    c.text("sizeDetail", "Talla", "sizeDetail", BASIC_CATEGORY).visible = true;
    c.text("observation", "Observación", "observation", BASIC_CATEGORY);
    c.push(
        FieldDefinition::new("stageLabel", "Estado General", "stageLabel", ValueType::Text, BASIC_CATEGORY)
            .system()
            .visible(),
    );

    // client
    c.text("clientContact", "Teléfono", "clientContact", "client").visible = true;
    c.text("clientName", "Nombre", "clientName", "client").visible = true;
    c.text("clientSurname", "Apellido", "clientSurname", "client");
    c.text("clientEmail", "Correo", "clientEmail", "client");
    c.text("clientDistrict", "Distrito", "clientDistrict", "client");
    c.text("clientDepartment", "Departamento", "clientDepartment", "client");
    c.text("clientProvince", "Provincia", "clientProvince", "client");
    c.text("clientDocType", "Tipo Documento", "clientDocType", "client");
    c.text("clientDocNumber", "N° Documento", "clientDocNumber", "client");

    // shipping
    c.date("shippingDate", "Fecha Envío", "shippingDate", "shipping");
    c.text("shippingAddress", "Dirección de Envío", "shippingAddress", "shipping");
    c.text("shippingDistrict", "Distrito de Envío", "shippingDistrict", "shipping");
    c.text("shippingAgency", "Agencia", "shippingAgency", "shipping");
    c.text("shippingContact", "Contacto de Envío", "shippingContact", "shipping");

    // order
    c.text("productLine", "Línea", "productLine", "order");
    c.push(FieldDefinition::new("isCustom", "Personalizado", "isCustom", ValueType::Boolean, "order").editable());
    c.push(FieldDefinition::new("isPriority", "Prioridad", "isPriority", ValueType::Boolean, "order").editable());

    // billing amounts
    let billing = Stage::Billing.as_str();
    c.number("amountTotal", "Total", "amounts.total", billing).format = Some(FieldFormat::Currency);
    c.number("amountAdvance", "Adelanto", "amounts.advance", billing).format = Some(FieldFormat::Currency);
    c.push(
        FieldDefinition::new("amountPending", "Debe", "amounts.pending", ValueType::Number, billing)
            .system()
            .with_formula(pending_formula())
            .with_format(FieldFormat::Currency),
    );

    for stage in Stage::WORKING {
        stage_fields(&mut c, stage);
    }

    c.push(
        FieldDefinition::new("finalizedAt", "Fecha Finalizado", "finalizedAt", ValueType::Date, "times")
            .system()
            .with_format(FieldFormat::Date),
    );

    // times
    let mut hours = Vec::new();
    for stage in Stage::WORKING {
        hours.push(stage_hours(stage));
        c.push(
            FieldDefinition::new(
                stage_id(stage, "Hours"),
                format!("Tiempo {}", stage.name()),
                format!("elapsed.{}", stage.as_str()),
                ValueType::Number,
                "times",
            )
            .system()
            .with_formula(stage_hours(stage))
            .with_format(FieldFormat::Hours),
        );
    }
    c.push(
        FieldDefinition::new("totalHours", "Tiempo Total", "elapsed.total", ValueType::Number, "times")
            .system()
            .with_formula(Formula::sum(hours))
            .with_format(FieldFormat::Hours),
    );

    // products
    for n in 1..=REPEATED_GROUPS {
        let i = n - 1;
        c.text(&format!("product{n}"), &format!("Producto {n}"), &format!("lineItems[{i}].product"), "products");
        c.number(&format!("productQuantity{n}"), &format!("Cantidad {n}"), &format!("lineItems[{i}].quantity"), "products");
    }

    // comments
    for n in 1..=REPEATED_GROUPS {
        let i = n - 1;
        c.text(&format!("commentAuthor{n}"), &format!("Autor C{n}"), &format!("comments[{i}].author"), "comments");
        c.text(&format!("commentDate{n}"), &format!("Fecha C{n}"), &format!("comments[{i}].date"), "comments");
        c.text(&format!("commentText{n}"), &format!("Texto C{n}"), &format!("comments[{i}].text"), "comments");
    }

    c.fields
}

fn stage_fields(c: &mut Catalog, stage: Stage) {
    let category = stage.as_str();

    c.push(
        FieldDefinition::new(
            stage_id(stage, "EnteredAt"),
            format!("Ingreso {}", stage.name()),
            stage_path(stage, "enteredAt"),
            ValueType::Date,
            category,
        )
        .system()
        .visible()
        .with_format(FieldFormat::Date),
    );

    let assignee = match stage {
        Stage::Design => Some("Diseñador".to_string()),
        Stage::Delivery => Some("Repartidor Asignado".to_string()),
        Stage::Preparation | Stage::Stamping | Stage::Packaging => Some(format!("Operador {}", stage.name())),
        _ => None,
    };
    if let Some(label) = assignee {
        c.text(&stage_id(stage, "Assignee"), &label, &stage_path(stage, "assigneeName"), category)
            .visible = true;
    }

    let mut statuses: Vec<&str> = STAGE_STATUSES.to_vec();
    if let Some(exit) = stage.exit_status() {
        if !statuses.contains(&exit) {
            statuses.push(exit);
        }
    }
    c.push(
        FieldDefinition::new(
            stage_id(stage, "Status"),
            format!("Estado {}", stage.name()),
            stage_path(stage, "status"),
            ValueType::Enum,
            category,
        )
        .editable()
        .visible()
        .with_options(statuses),
    );

    match stage {
        Stage::Design => {
            c.text("designLink", "URL Diseño", &stage_path(stage, "link"), category).visible = true;
        }
        Stage::Billing => {
            c.number("billingPay1", "Pago 1", &stage_path(stage, "pay1"), category).format = Some(FieldFormat::Currency);
            c.number("billingPay2", "Pago 2", &stage_path(stage, "pay2"), category).format = Some(FieldFormat::Currency);
        }
        Stage::Delivery => {
            c.date("deliveryDate", "Fecha Entrega", &stage_path(stage, "deliveryDate"), category);
        }
        _ => {}
    }

    c.text(&stage_id(stage, "Notes"), &format!("Notas {}", stage.name()), &stage_path(stage, "notes"), category);

    c.push(
        FieldDefinition::new(
            stage_id(stage, "ExitedAt"),
            format!("Salida {}", stage.name()),
            stage_path(stage, "exitedAt"),
            ValueType::Date,
            category,
        )
        .system()
        .with_format(FieldFormat::Date),
    );
}
