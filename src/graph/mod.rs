//! The block graph edited on the canvas.
//!
//! A [`Workspace`] is a forest: each [`Block`] owns its socket bindings and
//! the chain linked after it, so a block can never have two parents. Blocks
//! are referred to from outside by their [`BlockId`].

mod block;
mod workspace;

pub use block::{Block, BlockId, FieldValue, Input, Position};
pub use workspace::{Workspace, validate_block};
