//! Built-in grammar rules.
//!
//! [`standard`] holds the general-purpose blocks (control flow, logic, math,
//! text, variables); [`device`] and [`system`] add the automation blocks and
//! override standard rules where the editor needs different behavior.

use super::FieldKind;
use crate::options::OptionKind;

pub mod device;
pub mod standard;
pub mod system;

fn device_field() -> FieldKind {
    FieldKind::Dynamic(OptionKind::Device)
}

fn property_field() -> FieldKind {
    FieldKind::Dynamic(OptionKind::Property)
}
