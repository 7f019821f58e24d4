//! Raw value coercion and display formatting.
//!
//! Imported spreadsheet cells and edited values arrive as text. These
//! helpers turn them into typed JSON values according to a field's
//! [`ValueType`], and format typed values back for display.

use std::sync::OnceLock;

use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp};
use regex::Regex;
use serde_json::{json, Value};

use super::{FieldDefinition, FieldFormat, ValueType};
use crate::models::{LineItem, Stage, PAUSED_LABEL};
use crate::text::{cached_regex, fold, squash};

/// Strings read as `true` by boolean fields.
const TRUTHY: [&str; 7] = ["si", "sí", "yes", "1", "true", "verdadero", "mostacero"];

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const SERIAL_EPOCH_OFFSET: i64 = 25_569;

/// Parses an amount written with either decimal convention.
///
/// Currency symbols and other noise are dropped. With both separators the
/// last one is the decimal point; a lone comma followed by one or two digits
/// is decimal; a dot followed by exactly three trailing digits is a
/// thousands separator.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut text: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = text.rfind('.');
    let last_comma = text.rfind(',');
    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if dot > comma => text = text.replace(',', ""),
        (Some(_), Some(_)) => text = text.replace('.', "").replace(',', "."),
        (None, Some(comma)) => {
            let decimals = &text[comma + 1..];
            let decimal = text.matches(',').count() == 1
                && (1..=2).contains(&decimals.len())
                && decimals.chars().all(|c| c.is_ascii_digit());
            text = if decimal {
                text.replace(',', ".")
            } else {
                text.replace(',', "")
            };
        }
        (Some(dot), None) => {
            let trailing = &text[dot + 1..];
            if trailing.len() == 3 && trailing.chars().all(|c| c.is_ascii_digit()) {
                text = text.replace('.', "");
            }
        }
        (None, None) => {}
    }
    text.parse().ok()
}

/// Parses a date in any of the formats spreadsheets produce.
///
/// Accepts `d/m/yyyy` and `d-m-yy` (two-digit years are 20xx),
/// `yyyy-mm-dd`, RFC 3339 timestamps and five-digit spreadsheet serial
/// day numbers. Calendar dates are midnight in `tz`.
pub fn parse_date(raw: &str, tz: &TimeZone) -> Option<Timestamp> {
    static DMY: OnceLock<Option<Regex>> = OnceLock::new();
    static YMD: OnceLock<Option<Regex>> = OnceLock::new();
    static SERIAL: OnceLock<Option<Regex>> = OnceLock::new();

    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = cached_regex(&DMY, r"^(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})$").and_then(|re| re.captures(text)) {
        let day: i8 = caps[1].parse().ok()?;
        let month: i8 = caps[2].parse().ok()?;
        let mut year: i16 = caps[3].parse().ok()?;
        if year < 100 {
            year += 2000;
        }
        return midnight(year, month, day, tz);
    }

    if let Some(caps) = cached_regex(&YMD, r"^(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})$").and_then(|re| re.captures(text)) {
        let year: i16 = caps[1].parse().ok()?;
        let month: i8 = caps[2].parse().ok()?;
        let day: i8 = caps[3].parse().ok()?;
        return midnight(year, month, day, tz);
    }

    if cached_regex(&SERIAL, r"^\d{5}(\.\d+)?$").is_some_and(|re| re.is_match(text)) {
        let serial: f64 = text.parse().ok()?;
        let seconds = (serial - SERIAL_EPOCH_OFFSET as f64) * 86_400.0;
        let offset = SignedDuration::try_from_secs_f64(seconds).ok()?;
        return Timestamp::UNIX_EPOCH.checked_add(offset).ok();
    }

    text.parse::<Timestamp>().ok()
}

fn midnight(year: i16, month: i8, day: i8, tz: &TimeZone) -> Option<Timestamp> {
    let date = Date::new(year, month, day).ok()?;
    date.to_zoned(tz.clone()).ok().map(|z| z.timestamp())
}

/// JSON number, integral when the value has no fractional part.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

/// Coerces a raw cell into the JSON value stored for a field type.
///
/// Empty numbers read as zero; empty or unparseable dates as null.
pub fn coerce_value(raw: &str, value_type: ValueType, tz: &TimeZone) -> Value {
    let text = raw.trim();
    match value_type {
        ValueType::Number => number_value(parse_amount(text).unwrap_or(0.0)),
        ValueType::Date => parse_date(text, tz).map_or(Value::Null, |ts| Value::String(ts.to_string())),
        ValueType::Boolean => {
            let folded = text.to_lowercase();
            Value::Bool(TRUTHY.contains(&folded.as_str()) || TRUTHY.contains(&fold(text).as_str()))
        }
        ValueType::Text | ValueType::Enum => Value::String(text.to_string()),
    }
}

/// Coerces a raw cell for a specific path.
///
/// Line-item text becomes a list, stage labels are normalized and item
/// quantities are whole non-negative numbers. Everything else follows
/// [`coerce_value`].
pub fn coerce_for_path(field_path: &str, raw: &str, value_type: ValueType, tz: &TimeZone) -> Value {
    if field_path == "lineItems" {
        return Value::Array(
            parse_line_items_text(raw)
                .into_iter()
                .map(|item| json!({ "product": item.product, "quantity": item.quantity }))
                .collect(),
        );
    }
    if field_path == "stageLabel" {
        let text = raw.trim();
        return Value::String(normalize_stage_label(text).unwrap_or(text).to_string());
    }
    let value = coerce_value(raw, value_type, tz);
    if value_type == ValueType::Number && crate::path::leaf(field_path) == "quantity" {
        let n = value.as_f64().unwrap_or(0.0).max(0.0).round();
        return number_value(n);
    }
    value
}

/// Splits `"Polera x2, Gorra; Polo 3"` into line items.
///
/// A trailing `x<n>` or bare number is the quantity (at least 1).
pub fn parse_line_items_text(raw: &str) -> Vec<LineItem> {
    static WITH_X: OnceLock<Option<Regex>> = OnceLock::new();
    static BARE: OnceLock<Option<Regex>> = OnceLock::new();

    raw.split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let caps = cached_regex(&WITH_X, r"(?i)^(.+?)\s*x\s*(\d+)\s*$")
                .and_then(|re| re.captures(part))
                .or_else(|| cached_regex(&BARE, r"^(.+?)\s*(\d+)\s*$").and_then(|re| re.captures(part)));
            let (name, quantity) = match caps {
                Some(caps) => (caps[1].trim().to_string(), caps[2].parse::<u32>().unwrap_or(1).max(1)),
                None => (part.to_string(), 1),
            };
            (!name.is_empty()).then(|| LineItem::new(name, quantity))
        })
        .collect()
}

const LABEL_VARIATIONS: &[(&str, &str)] = &[
    ("pendiente", "En Diseño"),
    ("diseñando", "En Diseño"),
    ("pendiente pago", "En Cobranza"),
    ("por cobrar", "En Cobranza"),
    ("pago pendiente", "En Cobranza"),
    ("preparar", "Listo para Preparar"),
    ("preparación", "Listo para Preparar"),
    ("sin stock", PAUSED_LABEL),
    ("falta stock", PAUSED_LABEL),
    ("en pausa", PAUSED_LABEL),
    ("pausa", PAUSED_LABEL),
    ("estampando", "En Estampado"),
    ("empaquetando", "En Empaquetado"),
    ("repartiendo", "En Reparto"),
    ("enviado", "En Reparto"),
    ("enviando", "En Reparto"),
    ("completado", "Finalizado"),
    ("terminado", "Finalizado"),
    ("entregado", "Finalizado"),
    ("completo", "Finalizado"),
    ("final", "Finalizado"),
    ("cancelado", "Anulado"),
    ("eliminado", "Anulado"),
];

const LABEL_KEYWORDS: &[(&str, &str)] = &[
    ("diseno", "En Diseño"),
    ("cobranza", "En Cobranza"),
    ("listo", "Listo para Preparar"),
    ("stock", PAUSED_LABEL),
    ("estampado", "En Estampado"),
    ("empaquetado", "En Empaquetado"),
    ("reparto", "En Reparto"),
    ("finalizado", "Finalizado"),
    ("anulado", "Anulado"),
];

/// Maps a free-form status text to its canonical stage label.
///
/// Exact canonical labels and known variations win; otherwise the first
/// stage keyword contained in the text decides.
pub fn normalize_stage_label(raw: &str) -> Option<&'static str> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(stage) = Stage::from_label(text) {
        return Some(if text == PAUSED_LABEL { PAUSED_LABEL } else { stage.label() });
    }
    let wanted = squash(text);
    if let Some((_, label)) = LABEL_VARIATIONS.iter().find(|(v, _)| squash(v) == wanted) {
        return Some(label);
    }
    LABEL_KEYWORDS
        .iter()
        .find(|(keyword, _)| wanted.contains(keyword))
        .map(|(_, label)| *label)
}

/// Formats a field value for display in the system time zone.
pub fn format_value(field: &FieldDefinition, value: Option<&Value>) -> String {
    format_value_in(field, value, &TimeZone::system())
}

/// Formats a field value for display; missing values render as `-`.
pub fn format_value_in(field: &FieldDefinition, value: Option<&Value>, tz: &TimeZone) -> String {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return "-".to_string();
    };

    match (field.format, value) {
        (Some(FieldFormat::Currency), v) => number_of(v).map_or_else(|| plain(v), |n| format!("S/ {}", group_thousands(n))),
        (Some(FieldFormat::Percentage), v) => number_of(v).map_or_else(|| plain(v), |n| format!("{}%", trim_number(n))),
        (Some(FieldFormat::Hours), v) => number_of(v).map_or_else(|| plain(v), |n| format!("{} h", trim_number(n))),
        (Some(FieldFormat::Date), Value::String(s)) => match s.parse::<Timestamp>() {
            Ok(ts) => ts.to_zoned(tz.clone()).strftime("%-d/%-m/%Y").to_string(),
            Err(_) => s.clone(),
        },
        (_, Value::Bool(b)) => (if *b { "Sí" } else { "No" }).to_string(),
        _ if field.value_type == ValueType::Boolean => {
            if value.as_str().is_some_and(|s| TRUTHY.contains(&s.trim().to_lowercase().as_str())) {
                "Sí".to_string()
            } else {
                "No".to_string()
            }
        }
        (_, v) => plain(v),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Two decimals with comma thousands grouping: `1234.5` → `1,234.50`.
fn group_thousands(n: f64) -> String {
    let fixed = format!("{:.2}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (pos, c) in int_part.chars().enumerate() {
        if pos > 0 && (int_part.len() - pos) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if n < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Up to two decimals without trailing zeros: `3.50` → `3.5`.
fn trim_number(n: f64) -> String {
    let fixed = format!("{n:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => {
                    let name = map
                        .get("product")
                        .or_else(|| map.get("text"))
                        .map(plain)
                        .unwrap_or_default();
                    match map.get("quantity").and_then(Value::as_u64) {
                        Some(q) if q > 1 => format!("{name} x{q}"),
                        _ => name,
                    }
                }
                other => plain(other),
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
        Value::Null => "-".to_string(),
    }
}
