//! Field-path partial updates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::Result, path};

/// A single field-path mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    /// Overwrite the value at `path`, creating intermediate containers
    Set { path: String, value: Value },
    /// Drop the value at `path`
    Remove { path: String },
    /// Push `value` onto the list at `path`
    Append { path: String, value: Value },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Set { path, .. } | PatchOp::Remove { path } | PatchOp::Append { path, .. } => {
                path
            }
        }
    }
}

/// Ordered list of field-path mutations applied as one update.
///
/// Only the touched paths change. Two patches that touch unrelated paths of
/// the same document both survive regardless of commit order, and `Append`
/// never rewrites the list it extends.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_set(path, value);
        self
    }

    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.ops.push(PatchOp::Remove { path: path.into() });
        self
    }

    pub fn append(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Append {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn push_set(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.ops.push(PatchOp::Set {
            path: path.into(),
            value: value.into(),
        });
    }

    pub fn push(&mut self, op: PatchOp) {
        self.ops.push(op);
    }

    /// Appends every operation of `other` after this patch's own.
    pub fn extend(&mut self, other: Patch) {
        self.ops.extend(other.ops);
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when any operation writes at or below `prefix`.
    pub fn touches(&self, prefix: &str) -> bool {
        let prefix = path::canonical(prefix);
        self.ops.iter().any(|op| {
            let target = path::canonical(op.path());
            target == prefix
                || target.starts_with(&format!("{prefix}."))
                || target.starts_with(&format!("{prefix}["))
        })
    }

    /// Applies every operation in order to `doc`.
    pub fn apply(&self, doc: &mut Value) -> Result<()> {
        for op in &self.ops {
            match op {
                PatchOp::Set { path, value } => path::set(doc, path, value.clone())?,
                PatchOp::Remove { path } => {
                    path::remove(doc, path)?;
                }
                PatchOp::Append { path, value } => path::append(doc, path, value.clone())?,
            }
        }
        Ok(())
    }
}
