//! Consumable garments of an order.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{stock::stock_key, Garment, Order};
use crate::text::cached_regex;

/// Separator between garments in the free-text size detail.
const ITEM_SEPARATOR: &str = " - ";

static DETAILED: OnceLock<Option<Regex>> = OnceLock::new();
static QUANTITY_SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();

/// Garments to draw from stock, aggregated by type, color and size.
///
/// The structured garment list wins when present; otherwise the size detail
/// text is parsed.
pub fn consumable_items(order: &Order) -> Vec<Garment> {
    if order.garments.is_empty() {
        aggregate(parse_size_detail(&order.size_detail))
    } else {
        aggregate(order.garments.clone())
    }
}

/// Parses `"Polo Negro (M) - Hoodie Gris (L) x2"` into garments.
///
/// Each entry reads `<type> <color> (<size>)`; without parentheses the last
/// token is the size, the one before it the color and the rest the type.
/// A trailing `x<n>` sets the quantity. Unparseable entries are skipped.
pub fn parse_size_detail(text: &str) -> Vec<Garment> {
    text.lines()
        .flat_map(|line| line.split(ITEM_SEPARATOR))
        .filter_map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Option<Garment> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }

    let suffix = cached_regex(&QUANTITY_SUFFIX, r"^(.*?)\s*[xX]\s*(\d+)$");
    let (body, quantity) = match suffix.and_then(|re| re.captures(entry)) {
        Some(caps) if !caps[1].trim().is_empty() => (
            caps.get(1).map_or(entry, |m| m.as_str()),
            caps[2].parse::<u32>().ok().filter(|q| *q > 0).unwrap_or(1),
        ),
        _ => (entry, 1),
    };

    let detailed = cached_regex(&DETAILED, r"^(.+?)\s+([^(]+?)\s*\(([^)]+)\)$");
    if let Some(caps) = detailed.and_then(|re| re.captures(body)) {
        return Some(Garment::new(
            caps[1].trim(),
            caps[2].trim(),
            caps[3].trim(),
            quantity,
        ));
    }

    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }
    let size = tokens[tokens.len() - 1];
    let color = tokens[tokens.len() - 2];
    let kind = tokens[..tokens.len() - 2].join(" ");
    Some(Garment::new(kind, color, size, quantity))
}

/// Merges garments sharing a case-insensitive key, keeping first-seen order.
fn aggregate(items: Vec<Garment>) -> Vec<Garment> {
    let mut merged: Vec<(String, Garment)> = Vec::new();
    for item in items {
        let key = stock_key(&item.kind, &item.color, &item.size);
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.quantity += item.quantity,
            None => merged.push((key, item)),
        }
    }
    merged.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;

    #[test]
    fn test_parse_parenthesized_sizes() {
        let items = parse_size_detail("Polo Negro (M) - Hoodie Gris Oscuro (XL)");
        assert_eq!(
            items,
            vec![
                Garment::new("Polo", "Negro", "M", 1),
                Garment::new("Hoodie", "Gris Oscuro", "XL", 1),
            ]
        );
    }

    #[test]
    fn test_parse_token_fallback() {
        let items = parse_size_detail("Polo Oversize Blanco L");
        assert_eq!(items, vec![Garment::new("Polo Oversize", "Blanco", "L", 1)]);
    }

    #[test]
    fn test_parse_quantity_suffix() {
        let items = parse_size_detail("Polo Negro (M) x3");
        assert_eq!(items, vec![Garment::new("Polo", "Negro", "M", 3)]);
    }

    #[test]
    fn test_parse_skips_unparseable_entries() {
        assert!(parse_size_detail("").is_empty());
        assert!(parse_size_detail("Polo M").is_empty());
        assert_eq!(parse_size_detail("Polo M - Polo Rojo (S)").len(), 1);
    }

    #[test]
    fn test_structured_list_wins_and_aggregates() {
        let mut order = Order::new("1", Timestamp::UNIX_EPOCH);
        order.size_detail = "Gorra Azul (U)".to_string();
        order.garments = vec![
            Garment::new("Polo", "Negro", "M", 1),
            Garment::new("polo", "NEGRO", "m", 2),
        ];
        let items = consumable_items(&order);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
    }
}
