//! Prelude module for convenient imports
//!
//! Re-exports the types most code needs to build, generate and edit a workspace.
//!
//! ```rust,no_run
//! use kumitate::prelude::*;
//!
//! let registry = Registry::standard();
//! let workspace = Workspace::new();
//! assert_eq!(kumitate::codegen::generate(&registry, &workspace).unwrap(), "");
//! ```

// Grammar
pub use crate::grammar::{
    BlockType, Category, FieldKind, PaletteEntry, Registry, RegistryBuilder, Role, Socket, TypeTag,
};

// Graph
pub use crate::graph::{Block, BlockId, FieldValue, Workspace};

// Generation
pub use crate::codegen::{CodegenOptions, Emitted, Emitter, Generatable, Slot, Strength};

// Dropdown choices
pub use crate::options::{DropdownOption, OptionKind, OptionProvider};

// Host services
pub use crate::backend::{AutomationBackend, AutomationDocument, DeviceCatalog, RunOutcome};

// Live editing
pub use crate::session::{EditorSession, Preview, SessionConfig};

// Error types
pub use crate::error::{
    BackendError, GrammarError, GraphError, ParseError, SessionError, TypeMismatchError,
};
