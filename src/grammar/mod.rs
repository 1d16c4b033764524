//! # Block grammar
//!
//! Every block kind the editor can place is described by a [`BlockType`]: its
//! sockets, its role (statement or value), the statement links it accepts and
//! the generator that lowers it to Lua. The [`Registry`] is the single source
//! of truth for which graphs are constructible and for what the palette shows.

use crate::codegen::Generatable;
use crate::graph::{Block, FieldValue};
use crate::options::{DropdownOption, OptionKind};
use itertools::Itertools;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

pub mod library;
pub mod palette;
pub mod registry;

pub use palette::{Category, PaletteCategory, PaletteEntry, ShadowPreset, default_palette};
pub use registry::{Registry, RegistryBuilder};

/// The output type a value block produces, or the type a value socket accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Any,
    Boolean,
    Number,
    String,
}

impl TypeTag {
    /// Whether a socket constrained to `self` accepts an output tagged `offered`.
    pub fn accepts(self, offered: TypeTag) -> bool {
        self == TypeTag::Any || offered == TypeTag::Any || self == offered
    }

    /// The literal substituted for an empty, unshadowed socket of this type.
    pub fn default_literal(self) -> &'static str {
        match self {
            TypeTag::Any => "nil",
            TypeTag::Boolean => "true",
            TypeTag::Number => "0",
            TypeTag::String => "\"\"",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Any => write!(f, "any value"),
            TypeTag::Boolean => write!(f, "a Boolean"),
            TypeTag::Number => write!(f, "a Number"),
            TypeTag::String => write!(f, "a String"),
        }
    }
}

/// Whether a block is a statement in a chain or an expression plugged into a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `previous`/`next` say which statement links the block exposes.
    /// Trigger blocks expose neither and can only sit at the top of the canvas.
    Statement { previous: bool, next: bool },
    Value(TypeTag),
}

/// Inline, non-connectable field content.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A fixed list of choices; the first one is the default.
    Dropdown(Vec<DropdownOption>),
    Number {
        default: f64,
        min: Option<f64>,
        max: Option<f64>,
        precision: Option<f64>,
    },
    Text {
        default: String,
    },
    /// A variable name, lowered to a sanitized Lua identifier.
    Variable {
        default: String,
    },
    /// Choices resolved through the option provider when the field is presented.
    Dynamic(OptionKind),
}

impl FieldKind {
    pub fn dropdown<const N: usize>(options: [(&str, &str); N]) -> Self {
        FieldKind::Dropdown(
            options
                .into_iter()
                .map(|(label, value)| DropdownOption::new(label, value))
                .collect(),
        )
    }

    pub fn number(default: f64) -> Self {
        FieldKind::Number {
            default,
            min: None,
            max: None,
            precision: None,
        }
    }

    pub fn bounded(default: f64, min: f64, max: f64, precision: f64) -> Self {
        FieldKind::Number {
            default,
            min: Some(min),
            max: Some(max),
            precision: Some(precision),
        }
    }

    pub fn default_value(&self) -> FieldValue {
        match self {
            FieldKind::Dropdown(options) => FieldValue::Text(
                options
                    .first()
                    .map(|o| o.value.clone())
                    .unwrap_or_default(),
            ),
            FieldKind::Number { default, .. } => FieldValue::Number(*default),
            FieldKind::Text { default } | FieldKind::Variable { default } => {
                FieldValue::Text(default.clone())
            }
            FieldKind::Dynamic(_) => FieldValue::Text(String::new()),
        }
    }

    /// Validates a proposed value, returning the value as it will be stored.
    ///
    /// Numbers are clamped into range and rounded to the field precision.
    pub fn coerce(&self, value: FieldValue) -> Result<FieldValue, String> {
        match self {
            FieldKind::Dropdown(options) => {
                let text = value.to_string();
                if options.iter().any(|o| o.value == text) {
                    Ok(FieldValue::Text(text))
                } else {
                    Err(format!(
                        "expected one of [{}]",
                        options.iter().map(|o| o.value.as_str()).join(", ")
                    ))
                }
            }
            FieldKind::Number {
                min,
                max,
                precision,
                ..
            } => {
                let mut number = match value {
                    FieldValue::Number(n) => n,
                    FieldValue::Text(ref t) => t
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| "expected a number".to_string())?,
                };
                if number.is_nan() {
                    return Err("expected a number".to_string());
                }
                if let Some(min) = min {
                    number = number.max(*min);
                }
                if let Some(max) = max {
                    number = number.min(*max);
                }
                if let Some(step) = precision.filter(|p| *p > 0.0) {
                    number = (number / step).round() * step;
                }
                // Checked after clamping: a bounded field pulls infinities back into range.
                if !number.is_finite() {
                    return Err("expected a finite number".to_string());
                }
                Ok(FieldValue::Number(number))
            }
            FieldKind::Text { .. } | FieldKind::Dynamic(_) => Ok(FieldValue::Text(value.to_string())),
            FieldKind::Variable { .. } => {
                let name = value.to_string();
                if name.trim().is_empty() {
                    Err("variable name cannot be empty".to_string())
                } else {
                    Ok(FieldValue::Text(name))
                }
            }
        }
    }
}

/// One connection point on a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Socket {
    /// Accepts one expression subtree. `default` overrides the type default
    /// when the socket is empty and has no shadow.
    Value {
        name: String,
        check: TypeTag,
        default: Option<String>,
    },
    /// Accepts one statement chain.
    Statement { name: String },
    Field { name: String, kind: FieldKind },
}

impl Socket {
    pub fn name(&self) -> &str {
        match self {
            Socket::Value { name, .. } | Socket::Statement { name } | Socket::Field { name, .. } => {
                name
            }
        }
    }

    pub fn value(name: impl Into<String>, check: TypeTag) -> Self {
        Socket::Value {
            name: name.into(),
            check,
            default: None,
        }
    }

    pub fn value_or(name: impl Into<String>, check: TypeTag, default: impl Into<String>) -> Self {
        Socket::Value {
            name: name.into(),
            check,
            default: Some(default.into()),
        }
    }

    pub fn statement(name: impl Into<String>) -> Self {
        Socket::Statement { name: name.into() }
    }
}

/// An immutable grammar rule.
#[derive(Clone)]
pub struct BlockType {
    kind: String,
    role: Role,
    sockets: Vec<Socket>,
    label: String,
    tooltip: String,
    category: Option<Category>,
    generator: Arc<dyn Generatable>,
}

impl fmt::Debug for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockType")
            .field("kind", &self.kind)
            .field("role", &self.role)
            .field("sockets", &self.sockets)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl BlockType {
    /// A statement block with both `previous` and `next` links.
    pub fn statement(kind: impl Into<String>, generator: impl Generatable + 'static) -> Self {
        Self::with_role(
            kind,
            Role::Statement {
                previous: true,
                next: true,
            },
            Arc::new(generator),
        )
    }

    /// A statement block with no links, placed only at the top of the canvas.
    pub fn trigger(kind: impl Into<String>, generator: impl Generatable + 'static) -> Self {
        Self::with_role(
            kind,
            Role::Statement {
                previous: false,
                next: false,
            },
            Arc::new(generator),
        )
    }

    pub fn value(
        kind: impl Into<String>,
        output: TypeTag,
        generator: impl Generatable + 'static,
    ) -> Self {
        Self::with_role(kind, Role::Value(output), Arc::new(generator))
    }

    fn with_role(kind: impl Into<String>, role: Role, generator: Arc<dyn Generatable>) -> Self {
        let kind = kind.into();
        Self {
            label: format!("block.{kind}"),
            kind,
            role,
            sockets: Vec::new(),
            tooltip: String::new(),
            category: None,
            generator,
        }
    }

    /// Registers `kind` against an already-built rule, sharing its generator.
    pub fn alias(kind: impl Into<String>, of: &BlockType) -> Self {
        let mut ty = of.clone();
        ty.kind = kind.into();
        ty
    }

    pub fn with_generator(mut self, generator: impl Generatable + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn label(mut self, key: impl Into<String>) -> Self {
        self.label = key.into();
        self
    }

    pub fn tooltip(mut self, text: impl Into<String>) -> Self {
        self.tooltip = text.into();
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn socket(mut self, socket: Socket) -> Self {
        self.sockets.push(socket);
        self
    }

    pub fn field(self, name: &str, kind: FieldKind) -> Self {
        self.socket(Socket::Field {
            name: name.to_string(),
            kind,
        })
    }

    pub fn input(self, name: &str, check: TypeTag) -> Self {
        self.socket(Socket::value(name, check))
    }

    pub fn input_or(self, name: &str, check: TypeTag, default: &str) -> Self {
        self.socket(Socket::value_or(name, check, default))
    }

    pub fn statements(self, name: &str) -> Self {
        self.socket(Socket::statement(name))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn label_key(&self) -> &str {
        &self.label
    }

    pub fn tooltip_text(&self) -> &str {
        &self.tooltip
    }

    pub fn palette_category(&self) -> Option<Category> {
        self.category
    }

    pub fn generator(&self) -> &dyn Generatable {
        self.generator.as_ref()
    }

    pub fn output(&self) -> Option<TypeTag> {
        match self.role {
            Role::Value(tag) => Some(tag),
            Role::Statement { .. } => None,
        }
    }

    pub fn allows_previous(&self) -> bool {
        matches!(self.role, Role::Statement { previous: true, .. })
    }

    pub fn allows_next(&self) -> bool {
        matches!(self.role, Role::Statement { next: true, .. })
    }

    /// The declared sockets. Blocks whose shape depends on their extra state
    /// (`controls_if`, `text_join`) expose more through [`BlockType::sockets_for`].
    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    /// The sockets of one concrete block, including those added by its extra state.
    pub fn sockets_for(&self, block: &Block) -> Cow<'_, [Socket]> {
        let extra = self.generator.extra_sockets(block.extra_state.as_ref());
        if extra.is_empty() {
            Cow::Borrowed(&self.sockets)
        } else {
            let mut all = self.sockets.clone();
            all.extend(extra);
            Cow::Owned(all)
        }
    }

    pub fn check_extra_state(&self, block: &Block) -> Result<(), String> {
        self.generator.check_extra_state(block.extra_state.as_ref())
    }

    pub fn socket_for(&self, block: &Block, name: &str) -> Option<Socket> {
        self.sockets_for(block)
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }
}
