use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of a block, used for persistence and UI anchoring.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Canvas coordinates of a root block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// The literal stored in a field socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(t) => t.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(t: &str) -> Self {
        FieldValue::Text(t.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(t: String) -> Self {
        FieldValue::Text(t)
    }
}

/// What is plugged into one value or statement socket.
///
/// `block` is the user connection (a subtree, or the head of a chain);
/// `shadow` is the placeholder literal used while the socket is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Input {
    pub block: Option<Box<Block>>,
    pub shadow: Option<Box<Block>>,
}

impl Input {
    pub fn is_empty(&self) -> bool {
        self.block.is_none() && self.shadow.is_none()
    }
}

/// One instantiated node. A block exclusively owns everything plugged into
/// its sockets and the chain linked after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub kind: String,
    pub position: Option<Position>,
    pub fields: BTreeMap<String, FieldValue>,
    pub inputs: BTreeMap<String, Input>,
    pub next: Option<Box<Block>>,
    pub extra_state: Option<serde_json::Value>,
}

impl Block {
    pub fn new(id: impl Into<BlockId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            position: None,
            fields: BTreeMap::new(),
            inputs: BTreeMap::new(),
            next: None,
            extra_state: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Connects `child` into value socket `name`.
    pub fn with_input(mut self, name: &str, child: Block) -> Self {
        self.inputs.entry(name.to_string()).or_default().block = Some(Box::new(child));
        self
    }

    pub fn with_shadow(mut self, name: &str, shadow: Block) -> Self {
        self.inputs.entry(name.to_string()).or_default().shadow = Some(Box::new(shadow));
        self
    }

    /// Connects the chain starting at `head` into statement socket `name`.
    pub fn with_statement(self, name: &str, head: Block) -> Self {
        self.with_input(name, head)
    }

    pub fn with_next(mut self, next: Block) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    pub fn with_extra_state(mut self, state: serde_json::Value) -> Self {
        self.extra_state = Some(state);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.get(name)
    }

    /// The block connected to socket `name`, ignoring its shadow.
    pub fn connected(&self, name: &str) -> Option<&Block> {
        self.inputs.get(name).and_then(|i| i.block.as_deref())
    }

    pub fn shadow(&self, name: &str) -> Option<&Block> {
        self.inputs.get(name).and_then(|i| i.shadow.as_deref())
    }

    /// The last block of the chain starting here.
    pub fn tail(&self) -> &Block {
        let mut current = self;
        while let Some(next) = current.next.as_deref() {
            current = next;
        }
        current
    }

    pub fn tail_mut(&mut self) -> &mut Block {
        match self.next {
            Some(ref mut next) => next.tail_mut(),
            None => self,
        }
    }

    /// Visits this block and every block it owns, shadows included, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Block)) {
        visit(self);
        for input in self.inputs.values() {
            if let Some(shadow) = input.shadow.as_deref() {
                shadow.walk(visit);
            }
            if let Some(block) = input.block.as_deref() {
                block.walk(visit);
            }
        }
        if let Some(next) = self.next.as_deref() {
            next.walk(visit);
        }
    }

    pub fn find(&self, id: &BlockId) -> Option<&Block> {
        if &self.id == id {
            return Some(self);
        }
        for input in self.inputs.values() {
            for child in [input.block.as_deref(), input.shadow.as_deref()].into_iter().flatten() {
                if let Some(found) = child.find(id) {
                    return Some(found);
                }
            }
        }
        self.next.as_deref().and_then(|next| next.find(id))
    }

    pub fn find_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        if &self.id == id {
            return Some(self);
        }
        for input in self.inputs.values_mut() {
            if let Some(found) = input.block.as_deref_mut().and_then(|b| b.find_mut(id)) {
                return Some(found);
            }
            if let Some(found) = input.shadow.as_deref_mut().and_then(|b| b.find_mut(id)) {
                return Some(found);
            }
        }
        self.next.as_deref_mut().and_then(|next| next.find_mut(id))
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.find(id).is_some()
    }

    /// Whether `id` is a shadow held below this block, or a block inside one.
    pub fn in_shadow(&self, id: &BlockId) -> bool {
        self.inputs.values().any(|input| {
            input.shadow.as_ref().is_some_and(|shadow| shadow.contains(id))
                || input.block.as_ref().is_some_and(|block| block.in_shadow(id))
        }) || self.next.as_ref().is_some_and(|next| next.in_shadow(id))
    }

    /// Unplugs the descendant `id` from wherever it is connected below this block.
    ///
    /// With `heal`, the blocks linked after the removed one take its place and
    /// the removed block is returned without a `next` link. Without it, the
    /// removed block keeps the rest of its chain.
    pub fn take_descendant(&mut self, id: &BlockId, heal: bool) -> Option<Block> {
        for input in self.inputs.values_mut() {
            if input.block.as_ref().is_some_and(|b| &b.id == id) {
                return input.block.take().map(|boxed| unlink(*boxed, &mut input.block, heal));
            }
            if input.shadow.as_ref().is_some_and(|b| &b.id == id) {
                return input.shadow.take().map(|boxed| *boxed);
            }
            for child in [input.block.as_deref_mut(), input.shadow.as_deref_mut()]
                .into_iter()
                .flatten()
            {
                if let Some(found) = child.take_descendant(id, heal) {
                    return Some(found);
                }
            }
        }

        if self.next.as_ref().is_some_and(|b| &b.id == id) {
            return self.next.take().map(|boxed| unlink(*boxed, &mut self.next, heal));
        }
        self.next
            .as_deref_mut()
            .and_then(|next| next.take_descendant(id, heal))
    }
}

fn unlink(mut block: Block, slot: &mut Option<Box<Block>>, heal: bool) -> Block {
    if heal {
        *slot = block.next.take();
    }
    block
}
