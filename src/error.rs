use crate::grammar::TypeTag;
use crate::graph::BlockId;
use thiserror::Error;

/// A block graph referenced something the registered grammar does not know.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    #[error("Block '{block_id}' has an unregistered block kind: '{kind}'")]
    UnknownBlockKind { block_id: BlockId, kind: String },

    #[error("Block '{block_id}' of kind '{kind}' has no socket named '{socket}'")]
    UnknownSocket {
        block_id: BlockId,
        kind: String,
        socket: String,
    },

    #[error("Block '{block_id}' of kind '{kind}' was used where a {expected} block is required")]
    RoleMismatch {
        block_id: BlockId,
        kind: String,
        expected: &'static str,
    },
}

/// A connection was refused because the child's output type does not satisfy the socket.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "Socket '{socket}' on block '{block_id}' expects {expected}, but block '{child_id}' ({child_kind}) produces {found}"
)]
pub struct TypeMismatchError {
    pub block_id: BlockId,
    pub socket: String,
    pub expected: TypeTag,
    pub child_id: BlockId,
    pub child_kind: String,
    pub found: TypeTag,
}

/// Errors raised by structural edits on a workspace.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Block '{0}' not found in the workspace")]
    BlockNotFound(BlockId),

    #[error("Block '{0}' is already connected; detach it before connecting it elsewhere")]
    NotARoot(BlockId),

    #[error("A block with id '{0}' already exists in the workspace")]
    DuplicateId(BlockId),

    #[error("Socket '{socket}' on block '{block_id}' is not a {expected} socket")]
    SocketKind {
        block_id: BlockId,
        socket: String,
        expected: &'static str,
    },

    #[error("Connecting block '{child_id}' under '{parent_id}' would create a cycle")]
    WouldCycle { parent_id: BlockId, child_id: BlockId },

    #[error("Block '{block_id}' ({kind}) cannot take a {link} statement link")]
    Link {
        block_id: BlockId,
        kind: String,
        link: &'static str,
    },

    #[error("Field '{field}' on block '{block_id}' rejected value '{value}': {message}")]
    InvalidField {
        block_id: BlockId,
        field: String,
        value: String,
        message: String,
    },

    #[error("Block '{block_id}' has unusable extra state: {message}")]
    InvalidExtraState { block_id: BlockId, message: String },

    #[error("Block '{0}' is a shadow and cannot be detached from its socket")]
    ShadowNotDetachable(BlockId),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),
}

/// Errors raised while restoring a workspace from its persisted text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Failed to parse serialized graph: {0}")]
    Syntax(String),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("Serialized graph is structurally invalid: {0}")]
    Structure(#[from] GraphError),

    #[error("Failed to encode graph: {0}")]
    Encode(String),
}

/// An external collaborator (catalog, persistence, runtime) failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Automation '{0}' not found")]
    NotFound(String),

    #[error("Backend error: {0}")]
    Generic(String),
}

/// Errors surfaced by an editor session operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("An automation needs a name before it can be saved")]
    MissingName,

    #[error("Generated script is empty, nothing to run")]
    EmptyScript,

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
