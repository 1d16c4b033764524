//! # Kumitate - Block Grammar and Lua Generator for Home Automations
//!
//! **Kumitate** lets an automation be assembled from typed visual blocks and
//! lowers the resulting block graph into a Lua script for the home-automation
//! runtime. The crate is the core of the editor: it owns the grammar, the
//! graph, the generator, the persisted text format and the live editing loop.
//! Rendering and the runtime that executes scripts live outside of it.
//!
//! ## Core Workflow
//!
//! 1.  **Describe the grammar**: A [`grammar::Registry`] maps every block kind to its
//!     sockets, its role and its generator. `Registry::standard()` carries the general
//!     library (logic, loops, math, text, variables) plus the device and system blocks.
//! 2.  **Build a graph**: A [`graph::Workspace`] holds the root blocks of one canvas.
//!     Every connection is checked against the registry when it is made.
//! 3.  **Generate**: [`codegen::generate`] turns the workspace into Lua source.
//! 4.  **Persist**: [`serialize::to_text`] and [`serialize::from_text`] round-trip the graph.
//! 5.  **Edit live**: An [`session::EditorSession`] wraps all of the above and keeps a
//!     debounced preview of the generated source up to date while the graph changes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kumitate::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::standard();
//!
//!     let mut workspace = Workspace::new();
//!     let trigger = workspace.create_block(&registry, "zigbee_on_property")?;
//!     let action = workspace.create_block(&registry, "zigbee_turn_on")?;
//!     workspace.set_field(&registry, &trigger, "DEVICE", "0x00158d0001a2b3c4")?;
//!     workspace.set_field(&registry, &trigger, "PROPERTY", "contact")?;
//!     workspace.connect_statement(&registry, &trigger, "DO", &action)?;
//!
//!     let source = kumitate::codegen::generate(&registry, &workspace)?;
//!     println!("{source}");
//!
//!     let text = kumitate::serialize::to_text(&workspace)?;
//!     let restored = kumitate::serialize::from_text(&registry, &text)?;
//!     assert_eq!(restored.roots(), workspace.roots());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod codegen;
pub mod error;
pub mod grammar;
pub mod graph;
pub mod options;
pub mod prelude;
pub mod serialize;
pub mod session;
