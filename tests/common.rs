//! Common test utilities for building registries, blocks and workspaces.
use kumitate::backend::{DeviceSummary, MemoryBackend, MemoryCatalog};
use kumitate::prelude::*;
use std::sync::Arc;

/// Expected script for [`contact_trigger`].
#[allow(dead_code)]
pub const CONTACT_SCRIPT: &str = "\
zigbee.on(\"property_update\", {ieee=\"D1\", property=\"contact\"}, function(event)
  if event.value == false then
    zigbee.turn_on(\"D2\")
  end
end)
";

#[allow(dead_code)]
pub fn shared_registry() -> Arc<Registry> {
    Arc::new(Registry::standard())
}

/// When device `D1`'s `contact` becomes `false`, turn on `D2`.
#[allow(dead_code)]
pub fn contact_trigger() -> Block {
    Block::new("t1", "zigbee_on_property")
        .at(20.0, 20.0)
        .with_field("DEVICE", "D1")
        .with_field("PROPERTY", "contact")
        .with_input(
            "VALUE",
            Block::new("v1", "logic_boolean").with_field("BOOL", "FALSE"),
        )
        .with_statement("DO", device_action("a1", "zigbee_turn_on", "D2"))
}

#[allow(dead_code)]
pub fn device_action(id: &str, kind: &str, device: &str) -> Block {
    Block::new(id, kind).with_field("DEVICE", device)
}

#[allow(dead_code)]
pub fn number(id: &str, value: f64) -> Block {
    Block::new(id, "math_number").with_field("NUM", value)
}

#[allow(dead_code)]
pub fn text(id: &str, value: &str) -> Block {
    Block::new(id, "text").with_field("TEXT", value)
}

#[allow(dead_code)]
pub fn arithmetic(id: &str, op: &str, a: Block, b: Block) -> Block {
    Block::new(id, "math_arithmetic")
        .with_field("OP", op)
        .with_input("A", a)
        .with_input("B", b)
}

/// `x = <value>`, the simplest statement that renders one expression.
#[allow(dead_code)]
pub fn assign(id: &str, value: Block) -> Block {
    Block::new(id, "variables_set")
        .with_field("VAR", "x")
        .with_input("VALUE", value)
}

/// Builds a workspace from validated roots, panicking on invalid fixtures.
#[allow(dead_code)]
pub fn workspace_with(registry: &Registry, roots: Vec<Block>) -> Workspace {
    let mut workspace = Workspace::new();
    for root in roots {
        workspace
            .add_root(registry, root)
            .expect("fixture block should be valid");
    }
    workspace
}

/// Generates the script of a single root.
#[allow(dead_code)]
pub fn generate_one(registry: &Registry, root: Block) -> String {
    let workspace = workspace_with(registry, vec![root]);
    kumitate::codegen::generate(registry, &workspace).expect("generation should succeed")
}

#[allow(dead_code)]
pub fn devices() -> Vec<DeviceSummary> {
    vec![
        DeviceSummary {
            friendly_name: Some("Hallway lamp".to_string()),
            ..DeviceSummary::new("0x00158d0001a2b3c4")
        },
        DeviceSummary {
            manufacturer: Some("IKEA".to_string()),
            model: Some("TRADFRI bulb".to_string()),
            ..DeviceSummary::new("0x000d6ffffe1e2f3a")
        },
        DeviceSummary::new("0x00124b0022a1b2c3"),
    ]
}

#[allow(dead_code)]
pub fn host() -> (Arc<MemoryBackend>, MemoryCatalog) {
    (Arc::new(MemoryBackend::new()), MemoryCatalog::new(devices()))
}
