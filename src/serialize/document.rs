//! The persisted JSON shape of a block, one-to-one with the editor's block JSON.

use crate::graph::{Block, BlockId, FieldValue, Input, Position};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, RawInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<RawNext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_state: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<RawBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Box<RawBlock>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNext {
    pub block: Box<RawBlock>,
}

impl From<&Block> for RawBlock {
    fn from(block: &Block) -> Self {
        let inputs = block
            .inputs
            .iter()
            .filter(|(_, input)| !input.is_empty())
            .map(|(name, input)| {
                let raw = RawInput {
                    block: input.block.as_deref().map(|b| Box::new(RawBlock::from(b))),
                    shadow: input.shadow.as_deref().map(|b| Box::new(RawBlock::from(b))),
                };
                (name.clone(), raw)
            })
            .collect();

        RawBlock {
            kind: block.kind.clone(),
            id: Some(block.id.to_string()),
            x: block.position.map(|p| p.x),
            y: block.position.map(|p| p.y),
            fields: block.fields.clone(),
            inputs,
            next: block.next.as_deref().map(|next| RawNext {
                block: Box::new(RawBlock::from(next)),
            }),
            extra_state: block.extra_state.clone(),
        }
    }
}

impl RawBlock {
    fn collect_ids<'a>(&'a self, ids: &mut AHashSet<&'a str>) {
        if let Some(id) = self.id.as_deref() {
            ids.insert(id);
        }
        for input in self.inputs.values() {
            for child in [input.block.as_deref(), input.shadow.as_deref()]
                .into_iter()
                .flatten()
            {
                child.collect_ids(ids);
            }
        }
        if let Some(next) = &self.next {
            next.block.collect_ids(ids);
        }
    }

    fn into_block(self, ids: &mut IdAllocator<'_>) -> Block {
        let id = match self.id {
            Some(id) => BlockId::new(id),
            None => ids.next(),
        };
        let position = match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            (Some(x), None) => Some(Position { x, y: 0.0 }),
            (None, Some(y)) => Some(Position { x: 0.0, y }),
            (None, None) => None,
        };
        let inputs = self
            .inputs
            .into_iter()
            .map(|(name, raw)| {
                let input = Input {
                    block: raw.block.map(|b| Box::new(b.into_block(ids))),
                    shadow: raw.shadow.map(|b| Box::new(b.into_block(ids))),
                };
                (name, input)
            })
            .collect();

        Block {
            id,
            kind: self.kind,
            position,
            fields: self.fields,
            inputs,
            next: self.next.map(|next| Box::new(next.block.into_block(ids))),
            extra_state: self.extra_state,
        }
    }
}

/// Hands out `b<n>` ids for blocks stored without one, skipping every stored id.
struct IdAllocator<'a> {
    taken: AHashSet<&'a str>,
    counter: u64,
}

impl IdAllocator<'_> {
    fn next(&mut self) -> BlockId {
        loop {
            self.counter += 1;
            let candidate = format!("b{}", self.counter);
            if !self.taken.contains(candidate.as_str()) {
                return BlockId::new(candidate);
            }
        }
    }
}

/// Turns stored roots into blocks, giving every block without an id a fresh one.
pub(super) fn into_blocks(raws: Vec<RawBlock>) -> Vec<Block> {
    let stored: Vec<String> = {
        let mut ids = AHashSet::new();
        for raw in &raws {
            raw.collect_ids(&mut ids);
        }
        ids.into_iter().map(str::to_string).collect()
    };
    let mut allocator = IdAllocator {
        taken: stored.iter().map(String::as_str).collect(),
        counter: 0,
    };
    raws.into_iter()
        .map(|raw| raw.into_block(&mut allocator))
        .collect()
}
