use super::block::{Block, BlockId, FieldValue, Position};
use crate::error::{GrammarError, GraphError, TypeMismatchError};
use crate::grammar::{FieldKind, PaletteEntry, Registry, Socket, TypeTag};
use crate::options::RenderPass;
use ahash::AHashSet;

/// The forest of root blocks on one editor canvas.
///
/// Every edit checks the whole request before touching the graph, so a
/// rejected edit leaves the workspace exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    roots: Vec<Block>,
    next_id: u64,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[Block] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of blocks on the canvas, shadows included.
    pub fn block_count(&self) -> usize {
        let mut count = 0;
        for root in &self.roots {
            root.walk(&mut |_| count += 1);
        }
        count
    }

    pub fn find(&self, id: &BlockId) -> Option<&Block> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.find(id).is_some()
    }

    pub fn is_root(&self, id: &BlockId) -> bool {
        self.root_index(id).is_some()
    }

    fn root_index(&self, id: &BlockId) -> Option<usize> {
        self.roots.iter().position(|root| &root.id == id)
    }

    fn find_mut(&mut self, id: &BlockId) -> Result<&mut Block, GraphError> {
        self.roots
            .iter_mut()
            .find_map(|root| root.find_mut(id))
            .ok_or_else(|| GraphError::BlockNotFound(id.clone()))
    }

    /// An id not used by any block on the canvas.
    pub fn fresh_id(&mut self) -> BlockId {
        loop {
            self.next_id += 1;
            let id = BlockId::new(format!("b{}", self.next_id));
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Places a new block of `kind` on the canvas with every field at its default.
    pub fn create_block(&mut self, registry: &Registry, kind: &str) -> Result<BlockId, GraphError> {
        self.instantiate(registry, &PaletteEntry::new(kind), None)
    }

    /// Places a new block as dragged from a palette entry: preset extra state
    /// and shadows applied, dynamic dropdowns set to their first resolved option.
    pub fn instantiate(
        &mut self,
        registry: &Registry,
        entry: &PaletteEntry,
        mut render: Option<&mut RenderPass<'_>>,
    ) -> Result<BlockId, GraphError> {
        let mut block = Block::new(self.fresh_id(), entry.kind.as_str());
        block.extra_state = entry.extra_state.clone();
        let ty = registry.require(&block)?;

        for socket in ty.sockets_for(&block).iter() {
            if let Socket::Field { name, kind } = socket {
                let value = match (kind, render.as_deref_mut()) {
                    (FieldKind::Dynamic(options), Some(pass)) => pass
                        .options(*options)
                        .first()
                        .map(|o| FieldValue::Text(o.value.clone()))
                        .unwrap_or_else(|| kind.default_value()),
                    _ => kind.default_value(),
                };
                block.fields.insert(name.clone(), value);
            }
        }

        for preset in &entry.shadows {
            let mut shadow = Block::new(self.fresh_id(), preset.kind.as_str());
            for (name, value) in &preset.fields {
                shadow.fields.insert(name.clone(), value.clone());
            }
            block = block.with_shadow(&preset.socket, shadow);
        }

        tracing::debug!(block_id = %block.id, kind = %block.kind, "block instantiated");
        self.add_root(registry, block)
    }

    /// Adds a whole subtree as a new root after validating it against the grammar.
    /// Field values are stored as their field kind normalizes them.
    pub fn add_root(&mut self, registry: &Registry, mut block: Block) -> Result<BlockId, GraphError> {
        validate_block(registry, &mut block)?;
        if let Some(id) = self.first_duplicate(&block, None) {
            return Err(GraphError::DuplicateId(id));
        }
        let id = block.id.clone();
        self.roots.push(block);
        Ok(id)
    }

    /// The first id in `block` that repeats inside it or is already on the
    /// canvas. Ids owned by `replaced` are free to reuse.
    fn first_duplicate(&self, block: &Block, replaced: Option<&Block>) -> Option<BlockId> {
        let mut seen = AHashSet::new();
        let mut duplicate = None;
        block.walk(&mut |b| {
            let taken = self.contains(&b.id) && !replaced.is_some_and(|old| old.contains(&b.id));
            if duplicate.is_none() && (!seen.insert(b.id.clone()) || taken) {
                duplicate = Some(b.id.clone());
            }
        });
        duplicate
    }

    /// Plugs root `child` into value socket `socket` of `parent`.
    ///
    /// A block already connected there is unplugged and becomes a root; its id is returned.
    pub fn connect_value(
        &mut self,
        registry: &Registry,
        parent: &BlockId,
        socket: &str,
        child: &BlockId,
    ) -> Result<Option<BlockId>, GraphError> {
        let child_idx = self.detachable_root(parent, child)?;
        let parent_block = self.get(parent)?;
        let check = match socket_of(registry, parent_block, socket)? {
            Socket::Value { check, .. } => check,
            _ => return Err(socket_kind(parent, socket, "value")),
        };
        check_value(registry, parent, socket, check, &self.roots[child_idx])?;

        let mut child_block = self.roots.remove(child_idx);
        child_block.position = None;
        let input = self
            .find_mut(parent)?
            .inputs
            .entry(socket.to_string())
            .or_default();
        let displaced = input.block.replace(Box::new(child_block));

        Ok(displaced.map(|old| {
            let id = old.id.clone();
            self.roots.push(*old);
            id
        }))
    }

    /// Plugs the chain starting at root `child` into statement socket `socket` of `parent`.
    ///
    /// A chain already connected there is re-attached after the new chain when
    /// its tail accepts a `next` link, otherwise it becomes a root.
    pub fn connect_statement(
        &mut self,
        registry: &Registry,
        parent: &BlockId,
        socket: &str,
        child: &BlockId,
    ) -> Result<Option<BlockId>, GraphError> {
        let child_idx = self.detachable_root(parent, child)?;
        let parent_block = self.get(parent)?;
        match socket_of(registry, parent_block, socket)? {
            Socket::Statement { .. } => {}
            _ => return Err(socket_kind(parent, socket, "statement")),
        }
        let head = &self.roots[child_idx];
        check_statement(registry, head)?;
        let tail_links = registry.require(head.tail())?.allows_next();

        let mut head = self.roots.remove(child_idx);
        head.position = None;
        let input = self
            .find_mut(parent)?
            .inputs
            .entry(socket.to_string())
            .or_default();
        let displaced = input.block.replace(Box::new(head));
        Ok(self.reattach(parent, socket, displaced, tail_links))
    }

    /// Links root `child` (and its chain) directly after `previous`.
    pub fn connect_next(
        &mut self,
        registry: &Registry,
        previous: &BlockId,
        child: &BlockId,
    ) -> Result<Option<BlockId>, GraphError> {
        let child_idx = self.detachable_root(previous, child)?;
        let previous_block = self.get(previous)?;
        if !registry.require(previous_block)?.allows_next() {
            return Err(GraphError::Link {
                block_id: previous.clone(),
                kind: previous_block.kind.clone(),
                link: "next",
            });
        }
        let head = &self.roots[child_idx];
        check_statement(registry, head)?;
        let tail_links = registry.require(head.tail())?.allows_next();

        let mut head = self.roots.remove(child_idx);
        head.position = None;
        let previous_block = self.find_mut(previous)?;
        let displaced = previous_block.next.replace(Box::new(head));
        Ok(self.reattach(previous, "next", displaced, tail_links))
    }

    /// Sets or clears the placeholder literal of value socket `socket`.
    pub fn set_shadow(
        &mut self,
        registry: &Registry,
        parent: &BlockId,
        socket: &str,
        mut shadow: Option<Block>,
    ) -> Result<(), GraphError> {
        let parent_block = self.get(parent)?;
        let check = match socket_of(registry, parent_block, socket)? {
            Socket::Value { check, .. } => check,
            _ => return Err(socket_kind(parent, socket, "value")),
        };
        if let Some(shadow) = shadow.as_mut() {
            check_value(registry, parent, socket, check, shadow)?;
            validate_block(registry, shadow)?;
            if let Some(id) = self.first_duplicate(shadow, parent_block.shadow(socket)) {
                return Err(GraphError::DuplicateId(id));
            }
        }

        let input = self
            .find_mut(parent)?
            .inputs
            .entry(socket.to_string())
            .or_default();
        input.shadow = shadow.map(Box::new);
        Ok(())
    }

    /// Stores a new value in field `name`, clamped or rejected by the field's rules.
    pub fn set_field(
        &mut self,
        registry: &Registry,
        id: &BlockId,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), GraphError> {
        let block = self.get(id)?;
        let kind = match socket_of(registry, block, name)? {
            Socket::Field { kind, .. } => kind,
            _ => return Err(socket_kind(id, name, "field")),
        };
        let value = value.into();
        let stored = kind
            .coerce(value.clone())
            .map_err(|message| GraphError::InvalidField {
                block_id: id.clone(),
                field: name.to_string(),
                value: value.to_string(),
                message,
            })?;
        self.find_mut(id)?.fields.insert(name.to_string(), stored);
        Ok(())
    }

    /// Replaces the extra state of a block. Blocks plugged into sockets that
    /// no longer exist become roots; their ids are returned.
    pub fn set_extra_state(
        &mut self,
        registry: &Registry,
        id: &BlockId,
        state: Option<serde_json::Value>,
    ) -> Result<Vec<BlockId>, GraphError> {
        let block = self.get(id)?;
        let ty = registry.require(block)?;
        let mut probe = Block::new(id.clone(), block.kind.as_str());
        probe.extra_state = state.clone();
        ty.check_extra_state(&probe)
            .map_err(|message| GraphError::InvalidExtraState {
                block_id: id.clone(),
                message,
            })?;
        let sockets = ty.sockets_for(&probe);
        let keeps = |name: &str| sockets.iter().any(|s| s.name() == name);

        let block = self.find_mut(id)?;
        block.extra_state = state;
        let removed: Vec<String> = block
            .inputs
            .keys()
            .filter(|name| !keeps(name.as_str()))
            .cloned()
            .collect();
        let mut orphans = Vec::new();
        for name in removed {
            if let Some(child) = block.inputs.remove(&name).and_then(|input| input.block) {
                orphans.push(*child);
            }
        }
        block.fields.retain(|name, _| keeps(name.as_str()));

        let ids = orphans.iter().map(|b| b.id.clone()).collect();
        self.roots.extend(orphans);
        Ok(ids)
    }

    pub fn move_root(&mut self, id: &BlockId, x: f64, y: f64) -> Result<(), GraphError> {
        let idx = self.root_or_err(id)?;
        self.roots[idx].position = Some(Position { x, y });
        Ok(())
    }

    /// Unplugs `id` together with the blocks linked after it and makes it a root.
    ///
    /// Shadows stay with their socket; use [`Workspace::set_shadow`] to replace one.
    pub fn detach(&mut self, id: &BlockId) -> Result<(), GraphError> {
        if self.is_root(id) {
            return Ok(());
        }
        if self.roots.iter().any(|root| root.in_shadow(id)) {
            return Err(GraphError::ShadowNotDetachable(id.clone()));
        }
        let block = self
            .roots
            .iter_mut()
            .find_map(|root| root.take_descendant(id, false))
            .ok_or_else(|| GraphError::BlockNotFound(id.clone()))?;
        self.roots.push(block);
        Ok(())
    }

    /// Removes one block. The chain after it closes the gap, and the blocks
    /// plugged into its sockets become roots. Returns the removed block, emptied.
    pub fn delete(&mut self, id: &BlockId) -> Result<Block, GraphError> {
        let mut removed = match self.root_index(id) {
            Some(idx) => {
                let mut root = self.roots.remove(idx);
                if let Some(mut next) = root.next.take() {
                    next.position = root.position;
                    self.roots.insert(idx, *next);
                }
                root
            }
            None => self
                .roots
                .iter_mut()
                .find_map(|root| root.take_descendant(id, true))
                .ok_or_else(|| GraphError::BlockNotFound(id.clone()))?,
        };

        for input in removed.inputs.values_mut() {
            if let Some(child) = input.block.take() {
                self.roots.push(*child);
            }
        }
        tracing::debug!(block_id = %id, "block deleted");
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    fn get(&self, id: &BlockId) -> Result<&Block, GraphError> {
        self.find(id)
            .ok_or_else(|| GraphError::BlockNotFound(id.clone()))
    }

    fn root_or_err(&self, id: &BlockId) -> Result<usize, GraphError> {
        match self.root_index(id) {
            Some(idx) => Ok(idx),
            None if self.contains(id) => Err(GraphError::NotARoot(id.clone())),
            None => Err(GraphError::BlockNotFound(id.clone())),
        }
    }

    /// Index of root `child`, refusing a connection under one of its own descendants.
    fn detachable_root(&self, parent: &BlockId, child: &BlockId) -> Result<usize, GraphError> {
        let idx = self.root_or_err(child)?;
        if !self.contains(parent) {
            return Err(GraphError::BlockNotFound(parent.clone()));
        }
        if self.roots[idx].contains(parent) {
            return Err(GraphError::WouldCycle {
                parent_id: parent.clone(),
                child_id: child.clone(),
            });
        }
        Ok(idx)
    }

    fn reattach(
        &mut self,
        anchor: &BlockId,
        slot: &str,
        displaced: Option<Box<Block>>,
        tail_links: bool,
    ) -> Option<BlockId> {
        let displaced = displaced?;
        if tail_links {
            let target = match self.find_mut(anchor) {
                Ok(block) if slot == "next" => block.next.as_deref_mut(),
                Ok(block) => block.inputs.get_mut(slot).and_then(|i| i.block.as_deref_mut()),
                Err(_) => None,
            };
            if let Some(head) = target {
                head.tail_mut().next = Some(displaced);
                return None;
            }
        }
        let id = displaced.id.clone();
        self.roots.push(*displaced);
        Some(id)
    }
}

/// Checks a subtree against the grammar: known kinds, existing sockets,
/// compatible connections, usable extra state and valid field values.
///
/// Accepted field values are replaced by their normalized form, so a loaded
/// block holds the same values `set_field` would have stored.
pub fn validate_block(registry: &Registry, block: &mut Block) -> Result<(), GraphError> {
    let ty = registry.require(block)?;
    ty.check_extra_state(block)
        .map_err(|message| GraphError::InvalidExtraState {
            block_id: block.id.clone(),
            message,
        })?;
    let sockets = ty.sockets_for(block);
    let find = |name: &str| sockets.iter().find(|s| s.name() == name);

    for (name, value) in block.fields.iter_mut() {
        match find(name.as_str()) {
            Some(Socket::Field { kind, .. }) => {
                let stored = kind
                    .coerce(value.clone())
                    .map_err(|message| GraphError::InvalidField {
                        block_id: block.id.clone(),
                        field: name.clone(),
                        value: value.to_string(),
                        message,
                    })?;
                *value = stored;
            }
            Some(_) => return Err(socket_kind(&block.id, name, "field")),
            None => return Err(unknown_socket(&block.id, &block.kind, name).into()),
        }
    }

    for (name, input) in block.inputs.iter_mut() {
        match find(name.as_str()) {
            Some(Socket::Value { check, .. }) => {
                for child in [input.block.as_deref_mut(), input.shadow.as_deref_mut()]
                    .into_iter()
                    .flatten()
                {
                    check_value(registry, &block.id, name, *check, child)?;
                    validate_block(registry, child)?;
                }
            }
            Some(Socket::Statement { .. }) => {
                if input.shadow.is_some() {
                    return Err(socket_kind(&block.id, name, "value"));
                }
                if let Some(head) = input.block.as_deref_mut() {
                    check_statement(registry, head)?;
                    validate_block(registry, head)?;
                }
            }
            Some(Socket::Field { .. }) => {
                return Err(socket_kind(&block.id, name, "value or statement"));
            }
            None => return Err(unknown_socket(&block.id, &block.kind, name).into()),
        }
    }

    if block.next.is_some() && !ty.allows_next() {
        return Err(GraphError::Link {
            block_id: block.id.clone(),
            kind: block.kind.clone(),
            link: "next",
        });
    }
    if let Some(next) = block.next.as_deref_mut() {
        check_statement(registry, next)?;
        validate_block(registry, next)?;
    }
    Ok(())
}

fn socket_of(registry: &Registry, block: &Block, name: &str) -> Result<Socket, GraphError> {
    registry
        .require(block)?
        .socket_for(block, name)
        .ok_or_else(|| unknown_socket(&block.id, &block.kind, name).into())
}

fn check_value(
    registry: &Registry,
    parent: &BlockId,
    socket: &str,
    check: TypeTag,
    child: &Block,
) -> Result<(), GraphError> {
    let found = registry
        .require(child)?
        .output()
        .ok_or_else(|| GrammarError::RoleMismatch {
            block_id: child.id.clone(),
            kind: child.kind.clone(),
            expected: "value",
        })?;
    if !check.accepts(found) {
        return Err(TypeMismatchError {
            block_id: parent.clone(),
            socket: socket.to_string(),
            expected: check,
            child_id: child.id.clone(),
            child_kind: child.kind.clone(),
            found,
        }
        .into());
    }
    Ok(())
}

fn check_statement(registry: &Registry, head: &Block) -> Result<(), GraphError> {
    let ty = registry.require(head)?;
    if ty.output().is_some() {
        return Err(GrammarError::RoleMismatch {
            block_id: head.id.clone(),
            kind: head.kind.clone(),
            expected: "statement",
        }
        .into());
    }
    if !ty.allows_previous() {
        return Err(GraphError::Link {
            block_id: head.id.clone(),
            kind: head.kind.clone(),
            link: "previous",
        });
    }
    Ok(())
}

fn socket_kind(block_id: &BlockId, socket: &str, expected: &'static str) -> GraphError {
    GraphError::SocketKind {
        block_id: block_id.clone(),
        socket: socket.to_string(),
        expected,
    }
}

fn unknown_socket(block_id: &BlockId, kind: &str, socket: &str) -> GrammarError {
    GrammarError::UnknownSocket {
        block_id: block_id.clone(),
        kind: kind.to_string(),
        socket: socket.to_string(),
    }
}
