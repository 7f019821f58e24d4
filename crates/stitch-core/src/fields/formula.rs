//! Declarative formulas over order field paths.
//!
//! Formulas are data, not code: a small tree of arithmetic operators whose
//! leaves read numbers (or timestamps, for [`Formula::Hours`]) from an order
//! document. They are evaluated on read and never stored as values.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path;

/// A formula node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Formula {
    /// Numeric value at a path; missing or non-numeric reads as none
    Field { path: String },
    Const { value: f64 },
    Add { left: Box<Formula>, right: Box<Formula> },
    Sub { left: Box<Formula>, right: Box<Formula> },
    Mul { left: Box<Formula>, right: Box<Formula> },
    /// Division; a zero divisor yields none
    Div { left: Box<Formula>, right: Box<Formula> },
    /// Sum of the terms that have a value; zero when none do
    Sum { terms: Vec<Formula> },
    /// Largest of the terms that have a value
    Max { terms: Vec<Formula> },
    /// Hours between two timestamps; none when either is missing
    Hours { from: String, to: String },
    /// `then` when every path holds a non-empty value, else none
    IfPresent { paths: Vec<String>, then: Box<Formula> },
}

impl Formula {
    pub fn field(path: impl Into<String>) -> Self {
        Formula::Field { path: path.into() }
    }

    pub fn constant(value: f64) -> Self {
        Formula::Const { value }
    }

    pub fn sub(left: Formula, right: Formula) -> Self {
        Formula::Sub {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn sum(terms: Vec<Formula>) -> Self {
        Formula::Sum { terms }
    }

    pub fn max(terms: Vec<Formula>) -> Self {
        Formula::Max { terms }
    }

    pub fn hours(from: impl Into<String>, to: impl Into<String>) -> Self {
        Formula::Hours {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Evaluates against an order document.
    pub fn evaluate(&self, doc: &Value) -> Option<f64> {
        match self {
            Formula::Field { path } => path::get(doc, path).and_then(number),
            Formula::Const { value } => Some(*value),
            Formula::Add { left, right } => Some(left.evaluate(doc)? + right.evaluate(doc)?),
            Formula::Sub { left, right } => Some(left.evaluate(doc)? - right.evaluate(doc)?),
            Formula::Mul { left, right } => Some(left.evaluate(doc)? * right.evaluate(doc)?),
            Formula::Div { left, right } => {
                let divisor = right.evaluate(doc)?;
                if divisor == 0.0 {
                    None
                } else {
                    Some(left.evaluate(doc)? / divisor)
                }
            }
            Formula::Sum { terms } => Some(terms.iter().filter_map(|t| t.evaluate(doc)).sum()),
            Formula::Max { terms } => terms
                .iter()
                .filter_map(|t| t.evaluate(doc))
                .reduce(f64::max),
            Formula::Hours { from, to } => {
                let from = timestamp(doc, from)?;
                let to = timestamp(doc, to)?;
                Some(hours_between(from, to))
            }
            Formula::IfPresent { paths, then } => {
                if paths.iter().all(|p| path::get(doc, p).is_some_and(is_present)) {
                    then.evaluate(doc)
                } else {
                    None
                }
            }
        }
    }

    /// Every path the formula reads.
    pub fn paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Formula::Field { path } => out.push(path),
            Formula::Const { .. } => {}
            Formula::Add { left, right }
            | Formula::Sub { left, right }
            | Formula::Mul { left, right }
            | Formula::Div { left, right } => {
                left.collect_paths(out);
                right.collect_paths(out);
            }
            Formula::Sum { terms } | Formula::Max { terms } => {
                for term in terms {
                    term.collect_paths(out);
                }
            }
            Formula::Hours { from, to } => {
                out.push(from);
                out.push(to);
            }
            Formula::IfPresent { paths, then } => {
                out.extend(paths.iter().map(String::as_str));
                then.collect_paths(out);
            }
        }
    }
}

/// Non-negative hours from `from` to `to`.
pub fn hours_between(from: Timestamp, to: Timestamp) -> f64 {
    let millis = (to.as_millisecond() - from.as_millisecond()).max(0);
    millis as f64 / 3_600_000.0
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp(doc: &Value, path: &str) -> Option<Timestamp> {
    path::get(doc, path)?.as_str()?.parse().ok()
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
