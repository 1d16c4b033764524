//! # Lua code generator
//!
//! Lowers a [`Workspace`] to the source of one automation script. Generation
//! is a pure function of the graph and the registry: the same workspace
//! always yields byte-identical output.
//!
//! Each statement root is a chain head and is emitted top to bottom, in
//! canvas order. Blocks delegate to the [`Generatable`] of their rule, which
//! pulls the code of its sockets back through the [`Emitter`].

use crate::error::GrammarError;
use crate::grammar::{Registry, Socket};
use crate::graph::{Block, Workspace};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub mod lua;
pub mod precedence;

pub use precedence::{Operator, Slot, Strength};

/// Lowers one block kind. Implemented once per rule and looked up through the [`Registry`].
pub trait Generatable: Send + Sync {
    fn emit(&self, block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError>;

    /// Sockets that exist only because of the block's extra state
    /// (for example the `IF1`/`DO1` pairs of an `else if` chain).
    fn extra_sockets(&self, _state: Option<&serde_json::Value>) -> Vec<Socket> {
        Vec::new()
    }

    /// Rejects extra state the rule cannot shape a block from.
    fn check_extra_state(&self, _state: Option<&serde_json::Value>) -> Result<(), String> {
        Ok(())
    }
}

impl<F> Generatable for F
where
    F: Fn(&Block, &mut Emitter<'_>) -> Result<Emitted, GrammarError> + Send + Sync,
{
    fn emit(&self, block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
        self(block, cx)
    }
}

/// An expression together with how tightly it binds.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub code: String,
    pub strength: Strength,
}

impl Expr {
    pub fn new(code: impl Into<String>, strength: Strength) -> Self {
        Self {
            code: code.into(),
            strength,
        }
    }

    /// The code as it must appear in `slot`.
    pub fn in_slot(self, slot: Slot) -> String {
        if slot.needs_parens(self.strength) {
            format!("({})", self.code)
        } else {
            self.code
        }
    }
}

/// What a generator produced for one block.
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted {
    /// One or more lines, each terminated by a newline.
    Statement(String),
    Expression(Expr),
}

impl Emitted {
    pub fn statement(code: impl Into<String>) -> Self {
        Emitted::Statement(code.into())
    }

    pub fn expression(code: impl Into<String>, strength: Strength) -> Self {
        Emitted::Expression(Expr::new(code, strength))
    }

    /// A literal, variable reference or call.
    pub fn atom(code: impl Into<String>) -> Self {
        Self::expression(code, Strength::Atomic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodegenOptions {
    /// One nesting level of generated code.
    #[serde(default = "default_indent")]
    pub indent: String,
}

fn default_indent() -> String {
    "  ".to_string()
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            indent: default_indent(),
        }
    }
}

/// Generates the script for `workspace` with the default options.
pub fn generate(registry: &Registry, workspace: &Workspace) -> Result<String, GrammarError> {
    generate_with(registry, workspace, &CodegenOptions::default())
}

pub fn generate_with(
    registry: &Registry,
    workspace: &Workspace,
    options: &CodegenOptions,
) -> Result<String, GrammarError> {
    Emitter::new(registry, options).workspace(workspace)
}

/// Generation context handed to every [`Generatable`].
pub struct Emitter<'a> {
    registry: &'a Registry,
    options: &'a CodegenOptions,
}

impl<'a> Emitter<'a> {
    pub fn new(registry: &'a Registry, options: &'a CodegenOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Emits every statement root in canvas order, one chunk per chain,
    /// separated by a blank line.
    pub fn workspace(&mut self, workspace: &Workspace) -> Result<String, GrammarError> {
        let mut roots: Vec<&Block> = workspace.roots().iter().collect();
        roots.sort_by(|a, b| canvas_order(a, b));

        let mut chunks = Vec::new();
        for root in roots {
            let ty = self.registry.require(root)?;
            if ty.output().is_some() {
                tracing::debug!(block_id = %root.id, kind = %root.kind, "skipping detached value block");
                continue;
            }
            chunks.push(self.chain(root)?);
        }
        tracing::debug!(chunks = chunks.len(), "workspace generated");
        Ok(chunks.join("\n"))
    }

    /// Emits `head` and every block linked after it, in link order.
    pub fn chain(&mut self, head: &Block) -> Result<String, GrammarError> {
        let mut out = String::new();
        let mut current = Some(head);
        while let Some(block) = current {
            out.push_str(&self.statement(block)?);
            current = block.next.as_deref();
        }
        Ok(out)
    }

    pub fn statement(&mut self, block: &Block) -> Result<String, GrammarError> {
        let registry = self.registry;
        let ty = registry.require_role(block, true)?;
        match ty.generator().emit(block, self)? {
            Emitted::Statement(mut code) => {
                if !code.is_empty() && !code.ends_with('\n') {
                    code.push('\n');
                }
                Ok(code)
            }
            Emitted::Expression(_) => Err(role_mismatch(block, "statement")),
        }
    }

    pub fn expression(&mut self, block: &Block) -> Result<Expr, GrammarError> {
        let registry = self.registry;
        let ty = registry.require_role(block, false)?;
        match ty.generator().emit(block, self)? {
            Emitted::Expression(expr) => Ok(expr),
            Emitted::Statement(_) => Err(role_mismatch(block, "value")),
        }
    }

    /// The code for value socket `socket`, grouped for `slot`.
    ///
    /// An empty socket falls back to its shadow, then to the socket's declared
    /// default, then to the default literal of its type.
    pub fn value(&mut self, block: &Block, socket: &str, slot: Slot) -> Result<String, GrammarError> {
        self.value_with(block, socket, slot, None)
    }

    /// Like [`Emitter::value`], with an explicit literal for an empty, unshadowed socket.
    pub fn value_or(
        &mut self,
        block: &Block,
        socket: &str,
        slot: Slot,
        fallback: &str,
    ) -> Result<String, GrammarError> {
        self.value_with(block, socket, slot, Some(fallback))
    }

    fn value_with(
        &mut self,
        block: &Block,
        socket: &str,
        slot: Slot,
        fallback: Option<&str>,
    ) -> Result<String, GrammarError> {
        let (check, default) = match self.socket(block, socket)? {
            Socket::Value { check, default, .. } => (check, default),
            _ => return Err(unknown_socket(block, socket)),
        };

        if let Some(child) = block.connected(socket).or_else(|| block.shadow(socket)) {
            return Ok(self.expression(child)?.in_slot(slot));
        }

        let literal = fallback
            .map(str::to_string)
            .or(default)
            .unwrap_or_else(|| check.default_literal().to_string());
        tracing::debug!(
            block_id = %block.id,
            socket,
            fallback = %literal,
            "empty socket, substituting default"
        );
        Ok(literal)
    }

    /// The chain plugged into statement socket `socket`, indented one level.
    /// Empty when nothing is connected.
    pub fn statements(&mut self, block: &Block, socket: &str) -> Result<String, GrammarError> {
        if !matches!(self.socket(block, socket)?, Socket::Statement { .. }) {
            return Err(unknown_socket(block, socket));
        }
        match block.connected(socket) {
            Some(head) => {
                let body = self.chain(head)?;
                Ok(self.indent(&body))
            }
            None => Ok(String::new()),
        }
    }

    pub fn indent(&self, text: &str) -> String {
        lua::indent(text, &self.options.indent)
    }

    /// The raw value of field `name`, or the field's default when the block does not set it.
    pub fn field(&self, block: &Block, name: &str) -> String {
        if let Some(value) = block.field(name) {
            return value.to_string();
        }
        self.registry
            .lookup(&block.kind)
            .and_then(|ty| ty.socket_for(block, name))
            .and_then(|socket| match socket {
                Socket::Field { kind, .. } => Some(kind.default_value().to_string()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Field `name` as a Lua string literal.
    pub fn quoted_field(&self, block: &Block, name: &str) -> String {
        lua::quote(&self.field(block, name))
    }

    fn socket(&self, block: &Block, name: &str) -> Result<Socket, GrammarError> {
        self.registry
            .require(block)?
            .socket_for(block, name)
            .ok_or_else(|| unknown_socket(block, name))
    }
}

fn canvas_order(a: &Block, b: &Block) -> Ordering {
    match (a.position, b.position) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(pa), Some(pb)) => pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x)),
    }
}

fn role_mismatch(block: &Block, expected: &'static str) -> GrammarError {
    GrammarError::RoleMismatch {
        block_id: block.id.clone(),
        kind: block.kind.clone(),
        expected,
    }
}

fn unknown_socket(block: &Block, socket: &str) -> GrammarError {
    GrammarError::UnknownSocket {
        block_id: block.id.clone(),
        kind: block.kind.clone(),
        socket: socket.to_string(),
    }
}
