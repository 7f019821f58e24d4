//! Stock and stock-history CSV import/export.
//!
//! Stock sheets are written as `Type,Color,Size,Quantity`. On import the
//! header row may name the columns in English or Spanish (`TIPO`, `COLOR`,
//! `TALLA`, `CANTIDAD`) and in any order, with the color optional and
//! defaulting to `Unico`. History sheets are written as
//! `Date,Time,Action,User,Detail,Quantity` with `d/m/yyyy` dates and
//! `HH:MM:SS` times in a configurable time zone; on import the header row is
//! skipped whatever its language.

use jiff::civil::{Date, Time};
use jiff::tz::TimeZone;
use jiff::Timestamp;

use crate::error::{PipelineError, Result};
use crate::models::{stock::stock_key, MovementKind, StockMovement, StockRecord};
use crate::text::fold;

/// Header row written by [`export_history`].
pub const HISTORY_HEADER: &str = "Date,Time,Action,User,Detail,Quantity";

/// Header row written by [`export_stock`].
pub const STOCK_HEADER: &str = "Type,Color,Size,Quantity";

/// Color assumed when a stock sheet has no color column.
pub const DEFAULT_COLOR: &str = "Unico";

/// Splits CSV text into rows of fields.
///
/// Handles quoted fields with `""` escapes and embedded newlines, CRLF line
/// endings and a leading byte-order mark. Blank lines are dropped.
///
/// # Errors
///
/// Returns `PipelineError::Csv` when a quoted field is never closed.
pub fn parse_rows(text: &str) -> Result<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                line += 1;
                row.push(std::mem::take(&mut field));
                push_row(&mut rows, std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(PipelineError::Csv {
            line: quote_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    row.push(field);
    push_row(&mut rows, row);
    Ok(rows)
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    if row.iter().any(|f| !f.trim().is_empty()) {
        rows.push(row);
    }
}

/// Quotes a field when it contains a separator, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn quote_always(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

const TYPE_NAMES: &[&str] = &["tipo", "type"];
const SIZE_NAMES: &[&str] = &["talla", "size"];
const QUANTITY_NAMES: &[&str] = &["cantidad", "quantity"];

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.as_str()))
}

/// One usable line of a stock sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub kind: String,
    pub color: String,
    pub size: String,
    pub quantity: i64,
}

/// Reads a stock sheet.
///
/// The header row is the first one naming both a type and a quantity
/// column (`Type`/`TIPO`, `Quantity`/`CANTIDAD`); rows
/// above it are ignored. Rows with a missing type, size or quantity, or a
/// non-integer quantity, are skipped.
///
/// # Errors
///
/// Returns `PipelineError::Csv` when no header row is found or it lacks
/// the type, size or quantity column.
pub fn parse_stock(text: &str) -> Result<Vec<StockRow>> {
    let rows = parse_rows(text)?;
    let header_pos = rows
        .iter()
        .position(|row| {
            let names: Vec<String> = row.iter().map(|h| fold(h)).collect();
            find_column(&names, TYPE_NAMES).is_some() && find_column(&names, QUANTITY_NAMES).is_some()
        })
        .ok_or_else(|| PipelineError::Csv {
            line: 1,
            reason: "no header row with Type and Quantity columns".to_string(),
        })?;

    let headers: Vec<String> = rows[header_pos].iter().map(|h| fold(h)).collect();
    let (Some(idx_type), Some(idx_size), Some(idx_qty)) = (
        find_column(&headers, TYPE_NAMES),
        find_column(&headers, SIZE_NAMES),
        find_column(&headers, QUANTITY_NAMES),
    ) else {
        return Err(PipelineError::Csv {
            line: header_pos + 1,
            reason: "missing Type, Size or Quantity column".to_string(),
        });
    };
    let idx_color = find_column(&headers, &["color"]);

    let cell = |row: &[String], idx: usize| row.get(idx).map(|v| v.trim().to_string()).unwrap_or_default();

    let mut parsed = Vec::new();
    for row in &rows[header_pos + 1..] {
        let kind = cell(row, idx_type);
        let size = cell(row, idx_size);
        let quantity = cell(row, idx_qty);
        if kind.is_empty() || size.is_empty() || quantity.is_empty() {
            continue;
        }
        let Ok(quantity) = quantity.parse::<i64>() else {
            log::warn!("Skipping stock row for {kind} {size}: quantity '{quantity}' is not an integer");
            continue;
        };
        let color = idx_color
            .map(|idx| cell(row, idx))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string());
        parsed.push(StockRow {
            kind,
            color,
            size,
            quantity,
        });
    }
    Ok(parsed)
}

/// Result of merging imported rows into a stock collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockMerge {
    /// Records to write; new records have an empty id
    pub records: Vec<StockRecord>,
    pub rows: usize,
    pub units: i64,
}

/// Adds imported quantities onto existing records, keyed by type, color and
/// size. Unknown keys become new records.
pub fn merge_stock(existing: &[StockRecord], rows: &[StockRow]) -> StockMerge {
    let mut merge = StockMerge::default();
    for row in rows {
        let key = stock_key(&row.kind, &row.color, &row.size);
        let position = merge.records.iter().position(|r| r.key() == key);
        match position {
            Some(pos) => merge.records[pos].quantity += row.quantity,
            None => match existing.iter().find(|r| r.key() == key) {
                Some(record) => {
                    let mut record = record.clone();
                    record.quantity += row.quantity;
                    merge.records.push(record);
                }
                None => merge.records.push(StockRecord::new(
                    &row.kind,
                    &row.color,
                    &row.size,
                    row.quantity,
                )),
            },
        }
        merge.rows += 1;
        merge.units += row.quantity;
    }
    merge
}

/// Writes a stock collection in the layout [`parse_stock`] reads back,
/// sorted by type, color and size.
pub fn export_stock(records: &[StockRecord]) -> String {
    let mut sorted: Vec<&StockRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.key());

    let mut out = String::from(STOCK_HEADER);
    out.push('\n');
    for record in sorted {
        let fields = [
            escape_field(&record.kind),
            escape_field(&record.color),
            escape_field(&record.size),
            record.quantity.to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Writes movements with dates and times rendered in `tz`.
pub fn export_history(movements: &[StockMovement], tz: &TimeZone) -> String {
    let mut out = String::from(HISTORY_HEADER);
    out.push('\n');
    for movement in movements {
        let zoned = movement.timestamp.to_zoned(tz.clone());
        let fields = [
            zoned.strftime("%-d/%-m/%Y").to_string(),
            zoned.strftime("%H:%M:%S").to_string(),
            movement.action.label().to_string(),
            escape_field(&movement.user),
            quote_always(&movement.detail),
            movement.quantity.to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Reads a history sheet written by [`export_history`].
///
/// The first row is the header. Rows with fewer than five fields, an
/// unreadable date or an unknown movement type are skipped with a warning.
/// A missing or unreadable quantity reads as 1.
///
/// # Errors
///
/// Returns `PipelineError::Csv` for malformed quoting.
pub fn parse_history(text: &str, tz: &TimeZone) -> Result<Vec<StockMovement>> {
    let rows = parse_rows(text)?;
    let mut movements = Vec::new();
    for (pos, row) in rows.iter().enumerate().skip(1) {
        if row.len() < 5 {
            log::warn!("Skipping history row {}: expected at least 5 fields", pos + 1);
            continue;
        }
        let Some(timestamp) = parse_local_timestamp(row[0].trim(), row[1].trim(), tz) else {
            log::warn!("Skipping history row {}: unreadable date '{} {}'", pos + 1, row[0], row[1]);
            continue;
        };
        let action = match row[2].parse::<MovementKind>() {
            Ok(action) => action,
            Err(e) => {
                log::warn!("Skipping history row {}: {e}", pos + 1);
                continue;
            }
        };
        let quantity = row
            .get(5)
            .and_then(|q| q.trim().parse::<i64>().ok())
            .unwrap_or(1);
        movements.push(StockMovement {
            timestamp,
            user: row[3].trim().to_string(),
            action,
            detail: row[4].trim().to_string(),
            quantity,
        });
    }
    Ok(movements)
}

/// Reads `d/m/yyyy` plus `H:M[:S]` as a wall-clock time in `tz`. Dates
/// without slashes are tried as RFC 3339 timestamps.
fn parse_local_timestamp(date: &str, time: &str, tz: &TimeZone) -> Option<Timestamp> {
    if !date.contains('/') {
        return date.parse::<Timestamp>().ok();
    }
    let mut parts = date.split('/').map(|p| p.trim().parse::<i32>());
    let (Some(Ok(day)), Some(Ok(month)), Some(Ok(year))) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    let mut clock = time.split(':').map(|p| p.trim().parse::<i8>().unwrap_or(0));
    let hour = clock.next().unwrap_or(0);
    let minute = clock.next().unwrap_or(0);
    let second = clock.next().unwrap_or(0);

    let date = Date::new(
        i16::try_from(year).ok()?,
        i8::try_from(month).ok()?,
        i8::try_from(day).ok()?,
    )
    .ok()?;
    let time = Time::new(hour, minute, second, 0).ok()?;
    date.to_datetime(time)
        .to_zoned(tz.clone())
        .ok()
        .map(|zoned| zoned.timestamp())
}
