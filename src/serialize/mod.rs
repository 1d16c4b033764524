//! # Workspace persistence
//!
//! A workspace is stored as a JSON array of its root blocks in the editor's
//! block JSON shape. Reading also accepts the editor's full export, which
//! wraps the same array in `{"blocks": {"languageVersion": 0, "blocks": [...]}}`.
//!
//! Restoring validates every block against the registry; a document naming
//! an unregistered kind is rejected as a whole, never loaded partially.

use crate::error::{GraphError, ParseError};
use crate::grammar::Registry;
use crate::graph::Workspace;
use serde_json::Value;

mod document;

pub use document::{RawBlock, RawInput, RawNext};

/// Serializes the roots of `workspace`, without any envelope.
pub fn to_text(workspace: &Workspace) -> Result<String, ParseError> {
    let raws: Vec<RawBlock> = workspace.roots().iter().map(RawBlock::from).collect();
    serde_json::to_string(&raws).map_err(|e| ParseError::Encode(e.to_string()))
}

/// Restores a workspace. Empty text is an empty workspace.
pub fn from_text(registry: &Registry, text: &str) -> Result<Workspace, ParseError> {
    let mut workspace = Workspace::new();
    if text.trim().is_empty() {
        return Ok(workspace);
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseError::Syntax(e.to_string()))?;
    let roots = strip_envelope(value)?;
    let raws: Vec<RawBlock> =
        serde_json::from_value(roots).map_err(|e| ParseError::Syntax(e.to_string()))?;

    for block in document::into_blocks(raws) {
        workspace.add_root(registry, block).map_err(|e| match e {
            GraphError::Grammar(grammar) => ParseError::Grammar(grammar),
            other => ParseError::Structure(other),
        })?;
    }
    tracing::debug!(roots = workspace.roots().len(), "workspace restored");
    Ok(workspace)
}

fn strip_envelope(value: Value) -> Result<Value, ParseError> {
    match value {
        Value::Array(_) => Ok(value),
        Value::Object(mut map) => match map.remove("blocks") {
            Some(Value::Object(mut inner)) => {
                Ok(inner.remove("blocks").unwrap_or(Value::Array(Vec::new())))
            }
            Some(array @ Value::Array(_)) => Ok(array),
            None if map.is_empty() => Ok(Value::Array(Vec::new())),
            _ => Err(ParseError::Syntax(
                "expected an array of blocks or a {\"blocks\": ...} envelope".to_string(),
            )),
        },
        _ => Err(ParseError::Syntax(
            "expected an array of blocks or a {\"blocks\": ...} envelope".to_string(),
        )),
    }
}
