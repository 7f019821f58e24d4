//! Header mapper.
//!
//! Maps external spreadsheet headers onto registered fields. Each header is
//! tried against a fixed rule ladder, first match wins:
//!
//! 1. a manual override (or the [`DO_NOT_MAP`] sentinel)
//! 2. structural matches: `#`/`N` → id, `fecha`/`fecha_<n>` positionally,
//!    `ACT` → activator
//! 3. the static synonym table (score 95)
//! 4. indexed repeating groups: `Producto N`, `Cantidad N`, comment
//!    author/date/text N (score 100)
//! 5. fuzzy scoring against every field's label and path, floor 50
//!
//! Mapping is deterministic for a fixed header list and registry. Headers no
//! rule accepts are returned in [`HeaderMapping::unmapped`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fields::{FieldDefinition, FieldRegistry, ValueType};
use crate::path;
use crate::text::{cached_regex, squash};

mod synonyms;


/// Override value that keeps a header out of the mapping.
pub const DO_NOT_MAP: &str = "no-mapear";

/// Lowest fuzzy score accepted.
pub const FUZZY_FLOOR: f64 = 50.0;

const EXACT_SCORE: f64 = 100.0;
const SYNONYM_SCORE: f64 = 95.0;
const LEAF_SCORE: f64 = 95.0;
const LABEL_WEIGHT: f64 = 80.0;
const PATH_WEIGHT: f64 = 75.0;

/// Where a header's values will be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedField {
    pub path: String,
    /// Registered field, when the path has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    pub value_type: ValueType,
    pub label: String,
    pub score: f64,
    #[serde(default)]
    pub manual: bool,
}

impl MappedField {
    fn from_field(field: &FieldDefinition, score: f64) -> Self {
        Self {
            path: field.path.clone(),
            field_id: Some(field.id.clone()),
            value_type: field.value_type,
            label: field.label.clone(),
            score,
            manual: false,
        }
    }

    fn unregistered(path: &str, value_type: ValueType, label: impl Into<String>, score: f64) -> Self {
        Self {
            path: path::canonical(path),
            field_id: None,
            value_type,
            label: label.into(),
            score,
            manual: false,
        }
    }
}

/// Result of mapping a header list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMapping {
    pub mapping: BTreeMap<String, MappedField>,
    /// Headers no rule could map, in input order
    pub unmapped: Vec<String>,
    /// Headers excluded by a [`DO_NOT_MAP`] override
    pub skipped: Vec<String>,
    /// Repeated headers; only the first occurrence is mapped
    pub duplicates: Vec<String>,
}

impl HeaderMapping {
    /// True when every header was mapped or deliberately skipped.
    pub fn is_complete(&self) -> bool {
        self.unmapped.is_empty()
    }

    pub fn get(&self, header: &str) -> Option<&MappedField> {
        self.mapping.get(header)
    }
}

/// Maps `headers` onto `registry`, honoring `overrides` (header → field path
/// or field id, or [`DO_NOT_MAP`]).
pub fn map_headers(
    headers: &[String],
    registry: &FieldRegistry,
    overrides: &HashMap<String, String>,
) -> HeaderMapping {
    let mut result = HeaderMapping::default();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut date_count = 0usize;

    for header in headers {
        if !seen.insert(header.as_str()) {
            result.duplicates.push(header.clone());
            continue;
        }

        if let Some(target) = overrides.get(header) {
            if target.trim() == DO_NOT_MAP {
                result.skipped.push(header.clone());
                continue;
            }
            match manual_target(target, registry) {
                Some(mapped) => {
                    result.mapping.insert(header.clone(), mapped);
                    continue;
                }
                None => log::warn!("Override for '{header}' names unknown target '{target}'; mapping automatically"),
            }
        }

        match map_header(header, registry, &mut date_count) {
            Some(mapped) => {
                log::debug!("Header '{header}' → {} ({:.0})", mapped.path, mapped.score);
                result.mapping.insert(header.clone(), mapped);
            }
            None => {
                log::warn!("Header '{header}' could not be mapped");
                result.unmapped.push(header.clone());
            }
        }
    }
    result
}

fn manual_target(target: &str, registry: &FieldRegistry) -> Option<MappedField> {
    let target = target.trim();
    let mut mapped = match registry.by_path(target).or_else(|| registry.by_id(target)) {
        Some(field) => MappedField::from_field(field, EXACT_SCORE),
        None => {
            let segments = path::parse(target).ok()?;
            if segments
                .iter()
                .any(|s| matches!(s, path::Segment::Index(i) if *i > path::MAX_LIST_INDEX))
            {
                return None;
            }
            MappedField::unregistered(target, ValueType::Text, target, EXACT_SCORE)
        }
    };
    mapped.manual = true;
    Some(mapped)
}

/// Runs the automatic rule ladder for one header.
fn map_header(header: &str, registry: &FieldRegistry, date_count: &mut usize) -> Option<MappedField> {
    static DATE_HEADER: OnceLock<Option<Regex>> = OnceLock::new();

    let trimmed = header.trim();
    let squashed = squash(header);
    if squashed.is_empty() && trimmed != "#" {
        return None;
    }

    // structural
    if trimmed == "#" || trimmed.eq_ignore_ascii_case("n") {
        return Some(registered_or(registry, "id", ValueType::Text, "N°", EXACT_SCORE));
    }
    if cached_regex(&DATE_HEADER, r"^fecha(?:_\d+)?$").is_some_and(|re| re.is_match(&squashed)) {
        *date_count += 1;
        let target = if *date_count == 1 { "createdAt" } else { "shippingDate" };
        if let Some(field) = registry.by_path(target) {
            return Some(MappedField::from_field(field, EXACT_SCORE));
        }
    }
    if trimmed.eq_ignore_ascii_case("act") {
        return Some(registered_or(registry, "activator", ValueType::Text, "ACT", EXACT_SCORE));
    }

    // synonyms
    if let Some(target) = synonyms::lookup(&squashed) {
        if let Some(field) = registry.by_path(target) {
            return Some(MappedField::from_field(field, SYNONYM_SCORE));
        }
        if target.contains('.') || target.contains('[') {
            return Some(MappedField::unregistered(target, ValueType::Text, trimmed, SYNONYM_SCORE));
        }
    }

    match indexed_match(header, &squashed, registry) {
        Some(Ok(mapped)) => return Some(mapped),
        Some(Err(group)) => {
            log::warn!("Header '{header}' names group {group}, past the limit of {}", path::MAX_LIST_INDEX + 1);
            return None;
        }
        None => {}
    }

    fuzzy_match(&squashed, registry)
}

fn registered_or(registry: &FieldRegistry, path: &str, value_type: ValueType, label: &str, score: f64) -> MappedField {
    registry
        .by_path(path)
        .map(|field| MappedField::from_field(field, score))
        .unwrap_or_else(|| MappedField::unregistered(path, value_type, label, score))
}

/// Path family produced by a repeating-group header.
#[derive(Clone, Copy)]
enum GroupTarget {
    Product,
    Quantity,
    Author,
    Date,
    Text,
}

impl GroupTarget {
    fn path(self, index: usize) -> String {
        match self {
            GroupTarget::Product => format!("lineItems[{index}].product"),
            GroupTarget::Quantity => format!("lineItems[{index}].quantity"),
            GroupTarget::Author => format!("comments[{index}].author"),
            GroupTarget::Date => format!("comments[{index}].date"),
            GroupTarget::Text => format!("comments[{index}].text"),
        }
    }

    fn value_type(self) -> ValueType {
        match self {
            GroupTarget::Quantity => ValueType::Number,
            GroupTarget::Date => ValueType::Date,
            GroupTarget::Product | GroupTarget::Author | GroupTarget::Text => ValueType::Text,
        }
    }

    fn label(self) -> &'static str {
        match self {
            GroupTarget::Product => "Producto",
            GroupTarget::Quantity => "Cantidad",
            GroupTarget::Author => "Autor Comentario",
            GroupTarget::Date => "Fecha Comentario",
            GroupTarget::Text => "Comentario",
        }
    }
}

/// One repeating-group rule. Product and quantity rules read the squashed
/// header; comment rules read the raw header first, then the squashed one.
struct IndexedRule {
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &'static str,
    on_raw: bool,
    target: GroupTarget,
}

static PRODUCT: OnceLock<Option<Regex>> = OnceLock::new();
static QUANTITY: OnceLock<Option<Regex>> = OnceLock::new();
static AUTHOR: OnceLock<Option<Regex>> = OnceLock::new();
static AUTHOR_SQUASHED: OnceLock<Option<Regex>> = OnceLock::new();
static COMMENT_DATE: OnceLock<Option<Regex>> = OnceLock::new();
static COMMENT_DATE_SQUASHED: OnceLock<Option<Regex>> = OnceLock::new();
static COMMENT_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
static COMMENT_TEXT_SQUASHED: OnceLock<Option<Regex>> = OnceLock::new();

static INDEXED_RULES: [IndexedRule; 8] = [
    IndexedRule {
        cell: &PRODUCT,
        pattern: r"(?:producto|prod)[\s_.:]*(\d+)",
        on_raw: false,
        target: GroupTarget::Product,
    },
    IndexedRule {
        cell: &QUANTITY,
        pattern: r"(?:cantidad|cant)[\s_.:]*(\d+)",
        on_raw: false,
        target: GroupTarget::Quantity,
    },
    IndexedRule {
        cell: &AUTHOR,
        pattern: r"(?i)(?:autor|usuario)[\s_]*(?:comentario|c|msg)?[\s_]*(\d+)",
        on_raw: true,
        target: GroupTarget::Author,
    },
    IndexedRule {
        cell: &AUTHOR_SQUASHED,
        pattern: r"autor(\d+)",
        on_raw: false,
        target: GroupTarget::Author,
    },
    IndexedRule {
        cell: &COMMENT_DATE,
        pattern: r"(?i)(?:fecha|date)[\s_]*(?:comentario|c|msg)?[\s_]*(\d+)",
        on_raw: true,
        target: GroupTarget::Date,
    },
    IndexedRule {
        cell: &COMMENT_DATE_SQUASHED,
        pattern: r"fecha(\d+)",
        on_raw: false,
        target: GroupTarget::Date,
    },
    IndexedRule {
        cell: &COMMENT_TEXT,
        pattern: r"(?i)(?:texto|comentario|mensaje|c|msg)[\s_]*(?:comentario|c|msg)?[\s_]*(\d+)",
        on_raw: true,
        target: GroupTarget::Text,
    },
    IndexedRule {
        cell: &COMMENT_TEXT_SQUASHED,
        pattern: r"texto(\d+)",
        on_raw: false,
        target: GroupTarget::Text,
    },
];

/// Repeating-group headers; `N` is one-based and `0` never matches.
///
/// `Err` carries the group number of a header whose `N` is past
/// [`path::MAX_LIST_INDEX`]; such headers are left unmapped.
fn indexed_match(
    raw: &str,
    squashed: &str,
    registry: &FieldRegistry,
) -> Option<std::result::Result<MappedField, String>> {
    INDEXED_RULES.iter().find_map(|rule| {
        let subject = if rule.on_raw { raw } else { squashed };
        let caps = cached_regex(rule.cell, rule.pattern)?.captures(subject)?;
        let digits = &caps[1];
        let index = match digits.parse::<usize>() {
            Ok(n) => n.checked_sub(1)?,
            Err(_) => return Some(Err(digits.to_string())),
        };
        if index > path::MAX_LIST_INDEX {
            return Some(Err(digits.to_string()));
        }
        let n = index + 1;
        let target = rule.target.path(index);
        Some(Ok(registry
            .by_path(&target)
            .map(|field| MappedField::from_field(field, EXACT_SCORE))
            .unwrap_or_else(|| {
                let label = format!("{} {n}", rule.target.label());
                MappedField::unregistered(&target, rule.target.value_type(), label, EXACT_SCORE)
            })))
    })
}

/// Overlap score of two squashed strings when one contains the other.
fn overlap(a: &str, b: &str, weight: f64) -> f64 {
    if a.is_empty() || b.is_empty() || !(a.contains(b) || b.contains(a)) {
        return 0.0;
    }
    let shared = a.len().min(b.len()) as f64;
    let longest = a.len().max(b.len()) as f64;
    shared / longest * weight
}

/// Best fuzzy candidate over the registry. An exact label match ends the
/// search; otherwise the strictly highest score wins, ties keep the earlier
/// field.
fn fuzzy_match(squashed: &str, registry: &FieldRegistry) -> Option<MappedField> {
    let mut best: Option<(&FieldDefinition, f64)> = None;

    for field in registry.fields() {
        let label = squash(&field.label);
        if label == squashed {
            return Some(MappedField::from_field(field, EXACT_SCORE));
        }

        let score = if squash(field.leaf()) == squashed {
            LEAF_SCORE
        } else {
            overlap(&label, squashed, LABEL_WEIGHT).max(overlap(&squash(&field.path), squashed, PATH_WEIGHT))
        };

        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((field, score));
        }
    }

    best.filter(|(_, score)| *score >= FUZZY_FLOOR)
        .map(|(field, score)| MappedField::from_field(field, score))
}
