use super::library;
use super::palette::{PaletteCategory, default_palette};
use super::{BlockType, Role};
use crate::error::GrammarError;
use crate::graph::Block;
use ahash::AHashMap;
use std::sync::Arc;

/// The set of block kinds a workspace may contain.
///
/// Populated once through a [`RegistryBuilder`] and read-only afterwards;
/// share it between sessions behind an `Arc`.
#[derive(Debug, Default)]
pub struct Registry {
    types: AHashMap<String, Arc<BlockType>>,
    palette: Vec<PaletteCategory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The full automation grammar: the general-purpose library overridden by
    /// the device, system and notification blocks, with the editor palette.
    pub fn standard() -> Self {
        Self::builder()
            .with_standard_library()
            .with_device_library()
            .with_system_library()
            .with_palette(default_palette())
            .build()
    }

    /// Adds a rule, replacing any rule already registered under the same kind.
    pub fn register(&mut self, ty: BlockType) -> Option<Arc<BlockType>> {
        let kind = ty.kind().to_string();
        let replaced = self.types.insert(kind.clone(), Arc::new(ty));
        if replaced.is_some() {
            tracing::debug!(kind = %kind, "block kind re-registered");
        }
        replaced
    }

    pub fn lookup(&self, kind: &str) -> Option<&BlockType> {
        self.types.get(kind).map(Arc::as_ref)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.types.contains_key(kind)
    }

    /// Looks up the rule for an instantiated block, naming the block when its kind is unknown.
    pub fn require(&self, block: &Block) -> Result<&BlockType, GrammarError> {
        self.lookup(&block.kind)
            .ok_or_else(|| GrammarError::UnknownBlockKind {
                block_id: block.id.clone(),
                kind: block.kind.clone(),
            })
    }

    /// Like [`Registry::require`], also checking the rule's role.
    pub fn require_role(&self, block: &Block, statement: bool) -> Result<&BlockType, GrammarError> {
        let ty = self.require(block)?;
        match (ty.role(), statement) {
            (Role::Statement { .. }, true) | (Role::Value(_), false) => Ok(ty),
            _ => Err(GrammarError::RoleMismatch {
                block_id: block.id.clone(),
                kind: block.kind.clone(),
                expected: if statement { "statement" } else { "value" },
            }),
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn palette(&self) -> &[PaletteCategory] {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Vec<PaletteCategory>) {
        self.palette = palette;
    }
}

/// Assembles a [`Registry`]. Later registrations override earlier ones, so
/// libraries are layered from the most general to the most specific.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Control flow, logic, math, text and variable blocks.
    pub fn with_standard_library(mut self) -> Self {
        library::standard::register(&mut self.registry);
        self
    }

    /// Zigbee triggers, actions and values. Also unifies `controls_ifelse`
    /// onto the `controls_if` generator.
    pub fn with_device_library(mut self) -> Self {
        library::device::register(&mut self.registry);
        self
    }

    /// Date/time, logging, command execution and Telegram blocks.
    pub fn with_system_library(mut self) -> Self {
        library::system::register(&mut self.registry);
        self
    }

    pub fn with_type(mut self, ty: BlockType) -> Self {
        self.registry.register(ty);
        self
    }

    pub fn with_palette(mut self, palette: Vec<PaletteCategory>) -> Self {
        self.registry.set_palette(palette);
        self
    }

    pub fn build(self) -> Registry {
        tracing::debug!(kinds = self.registry.len(), "block registry built");
        self.registry
    }
}
