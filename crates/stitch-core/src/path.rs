//! Dotted field paths over JSON documents.
//!
//! A path is a sequence of object keys and list indices. Both
//! `lineItems[2].product` and `lineItems.2.product` address the same value;
//! [`canonical`] turns either form into the bracketed one.

use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};

/// Highest list index a write may pad up to.
pub const MAX_LIST_INDEX: usize = 500;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Splits a path into segments.
///
/// Purely numeric dotted segments are read as list indices.
pub fn parse(path: &str) -> Result<Vec<Segment>> {
    let invalid = |reason: &str| PipelineError::invalid_input("path").with_reason(format!("{reason} in '{path}'"));

    if path.trim().is_empty() {
        return Err(invalid("empty path"));
    }

    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return Err(invalid("empty segment"));
        }
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !key.is_empty() {
            match key.parse::<usize>() {
                Ok(index) if rest.is_empty() => segments.push(Segment::Index(index)),
                _ => segments.push(Segment::Key(key.to_string())),
            }
        } else if rest.is_empty() {
            return Err(invalid("empty segment"));
        }
        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(|| invalid("unclosed bracket"))?;
            let index = rest[1..close]
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid("non-numeric index"))?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(invalid("unexpected text after index"));
            }
        }
    }
    Ok(segments)
}

/// Renders segments back into the bracketed path form.
pub fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}

/// Canonical bracketed form of a path; invalid paths are returned unchanged.
pub fn canonical(path: &str) -> String {
    parse(path).map(|s| render(&s)).unwrap_or_else(|_| path.to_string())
}

/// Last key of a path, e.g. `product` for `lineItems[2].product`.
pub fn leaf(path: &str) -> &str {
    let last = path.rsplit('.').next().unwrap_or(path);
    last.split('[').next().unwrap_or(last)
}

/// Reads the value at `path`, if every segment resolves.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse(path).ok()?;
    let mut current = root;
    for segment in &segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
            (Segment::Index(index), Value::Object(map)) => map.get(&index.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Reads a string at `path`, treating numbers as their decimal text.
pub fn get_str(root: &Value, path: &str) -> Option<String> {
    match get(root, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads a number at `path`, parsing numeric strings.
pub fn get_f64(root: &Value, path: &str) -> Option<f64> {
    match get(root, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Writes `value` at `path`, creating intermediate objects and lists.
///
/// Scalars found along the way are replaced by the container the next
/// segment needs; lists are padded up to the requested index.
pub fn set(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments = parse(path)?;
    let slot = slot_mut(root, &segments)?;
    *slot = value;
    Ok(())
}

/// Appends `item` to the list at `path`, creating the list if needed.
pub fn append(root: &mut Value, path: &str, item: Value) -> Result<()> {
    let segments = parse(path)?;
    let slot = slot_mut(root, &segments)?;
    match slot {
        Value::Array(items) => items.push(item),
        other => *other = Value::Array(vec![item]),
    }
    Ok(())
}

/// Removes the value at `path`. Missing paths are not an error.
pub fn remove(root: &mut Value, path: &str) -> Result<Option<Value>> {
    let mut segments = parse(path)?;
    let Some(last) = segments.pop() else {
        return Ok(None);
    };
    let mut current = root;
    for segment in &segments {
        let next = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key),
            (Segment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(match (last, current) {
        (Segment::Key(key), Value::Object(map)) => map.remove(&key),
        (Segment::Index(index), Value::Array(items)) if index < items.len() => {
            Some(std::mem::replace(&mut items[index], Value::Null))
        }
        _ => None,
    })
}

fn slot_mut<'a>(root: &'a mut Value, segments: &[Segment]) -> Result<&'a mut Value> {
    if let Some(index) = segments.iter().find_map(|s| match s {
        Segment::Index(index) if *index > MAX_LIST_INDEX => Some(*index),
        _ => None,
    }) {
        return Err(PipelineError::invalid_input("path")
            .with_reason(format!("index {index} is above the limit of {MAX_LIST_INDEX}")));
    }

    let mut current = root;
    for (pos, segment) in segments.iter().enumerate() {
        let filler = match segments.get(pos + 1) {
            Some(Segment::Key(_)) => Value::Object(Map::new()),
            Some(Segment::Index(_)) => Value::Array(Vec::new()),
            None => Value::Null,
        };
        current = match segment {
            Segment::Key(key) => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                let Value::Object(map) = current else {
                    return Err(PipelineError::configuration("path container is not an object"));
                };
                let entry = map.entry(key.clone()).or_insert_with(|| filler.clone());
                if entry.is_null() && !filler.is_null() {
                    *entry = filler;
                }
                entry
            }
            Segment::Index(index) => {
                if !current.is_array() {
                    *current = Value::Array(Vec::new());
                }
                let Value::Array(items) = current else {
                    return Err(PipelineError::configuration("path container is not a list"));
                };
                let pad = if filler.is_null() {
                    Value::Null
                } else {
                    Value::Object(Map::new())
                };
                while items.len() <= *index {
                    items.push(pad.clone());
                }
                let entry = &mut items[*index];
                if entry.is_null() && !filler.is_null() {
                    *entry = filler;
                }
                entry
            }
        };
    }
    Ok(current)
}
