//! Static synonym table for spreadsheet headers.
//!
//! Keys are squashed headers (see [`crate::text::squash`]); values are
//! field paths.

pub(crate) const SYNONYMS: &[(&str, &str)] = &[
    ("fecha", "createdAt"),
    ("estadogeneral", "stageLabel"),
    ("estado", "stageLabel"),
    ("estadodelpedido", "stageLabel"),
    ("situacion", "stageLabel"),
    ("clientenombre", "clientName"),
    ("nombrecliente", "clientName"),
    ("nombre", "clientName"),
    ("clienteapellidos", "clientSurname"),
    ("apellidos", "clientSurname"),
    ("telefono", "clientContact"),
    ("celular", "clientContact"),
    ("contacto", "clientContact"),
    ("clientetelefono", "clientContact"),
    ("cliente", "clientContact"),
    ("whatsapp", "whatsappOrigin"),
    ("whatsapporigen", "whatsappOrigin"),
    ("clientecorreo", "clientEmail"),
    ("email", "clientEmail"),
    ("correo", "clientEmail"),
    ("correoelectronico", "clientEmail"),
    ("fechaentrega", "stageRecord.delivery.deliveryDate"),
    ("entrega", "stageRecord.delivery.deliveryDate"),
    ("fechareparto", "stageRecord.delivery.deliveryDate"),
    ("direccion", "shippingAddress"),
    ("direccionentrega", "shippingAddress"),
    ("ubicacion", "shippingAddress"),
    ("distrito", "clientDistrict"),
    ("clientedistrito", "clientDistrict"),
    ("clientedepartamento", "clientDepartment"),
    ("departamento", "clientDepartment"),
    ("pago1", "stageRecord.billing.pay1"),
    ("pago2", "stageRecord.billing.pay2"),
    ("montototal", "amounts.total"),
    ("total", "amounts.total"),
    ("monto", "amounts.total"),
    ("montos", "amounts.total"),
    ("totales", "amounts.total"),
    ("importe", "amounts.total"),
    ("soles", "amounts.total"),
    ("precio", "amounts.total"),
    ("preciototal", "amounts.total"),
    ("montoapagar", "amounts.total"),
    ("cobrar", "amounts.total"),
    ("vendido", "amounts.total"),
    ("adelanto", "amounts.advance"),
    ("anticipo", "amounts.advance"),
    ("pago", "amounts.advance"),
    ("pagado", "amounts.advance"),
    ("montoadelanto", "amounts.advance"),
    ("debe", "amounts.pending"),
    ("pendiente", "amounts.pending"),
    ("montopendiente", "amounts.pending"),
    ("saldo", "amounts.pending"),
    ("saldopendiente", "amounts.pending"),
    ("operadorpreparacion", "stageRecord.preparation.assigneeName"),
    ("operadorestampado", "stageRecord.stamping.assigneeName"),
    ("operadorempaquetado", "stageRecord.packaging.assigneeName"),
    ("repartidor", "stageRecord.delivery.assigneeName"),
    ("npedido", "id"),
    ("numeropedido", "id"),
    ("act", "activator"),
    ("canaldeventa", "salesChannel"),
    ("urlimagendiseno", "stageRecord.design.link"),
    ("urldiseno", "stageRecord.design.link"),
    ("imagendiseno", "stageRecord.design.link"),
    ("linkdiseno", "stageRecord.design.link"),
    ("disenador", "stageRecord.design.assigneeName"),
    ("disenadorasignado", "stageRecord.design.assigneeName"),
    ("autorc1", "comments[0].author"),
    ("fechac1", "comments[0].date"),
    ("comentario1", "comments[0].text"),
    ("textoc1", "comments[0].text"),
    ("autorc2", "comments[1].author"),
    ("fechac2", "comments[1].date"),
    ("comentario2", "comments[1].text"),
    ("textoc2", "comments[1].text"),
    ("cantidad", "quantity"),
    ("cant", "quantity"),
    ("producto", "lineItems"),
];

/// Path a squashed header is a synonym of.
pub(crate) fn lookup(squashed: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == squashed)
        .map(|(_, path)| *path)
}
