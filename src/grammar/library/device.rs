//! Zigbee triggers, actions and values.
//!
//! Triggers register a callback with the runtime and never block: a
//! `zigbee_wait` schedules its body as a deferred continuation instead of
//! sleeping, since each automation runs cooperatively on a single thread.

use super::standard::{ControlsIf, if_block};
use super::{device_field, property_field};
use crate::codegen::{Emitted, Emitter, Operator, Slot, lua};
use crate::error::GrammarError;
use crate::grammar::{BlockType, Category, FieldKind, Registry, TypeTag};
use crate::graph::Block;

/// A statement calling `$call("<device>")`.
macro_rules! device_actions {
    ( $( ($fn_name:ident, $kind:literal, $call:literal) ),* $(,)? ) => {
        $(
            fn $fn_name(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
                let device = cx.quoted_field(block, "DEVICE");
                Ok(Emitted::statement(format!(concat!($call, "({})\n"), device)))
            }
        )*

        fn register_device_actions(registry: &mut Registry) {
            $(
                registry.register(
                    BlockType::statement($kind, $fn_name)
                        .field("DEVICE", device_field())
                        .category(Category::DeviceActions),
                );
            )*
        }
    };
}

device_actions! {
    (turn_on, "zigbee_turn_on", "zigbee.turn_on"),
    (turn_off, "zigbee_turn_off", "zigbee.turn_off"),
    (toggle, "zigbee_toggle", "zigbee.toggle"),
}

pub fn register(registry: &mut Registry) {
    registry.register(
        BlockType::trigger("zigbee_on_property", on_property)
            .field("DEVICE", device_field())
            .field("PROPERTY", property_field())
            .input_or("VALUE", TypeTag::Any, "true")
            .statements("DO")
            .tooltip("Run actions when a device property becomes a specific value")
            .category(Category::Triggers),
    );
    registry.register(
        BlockType::trigger("zigbee_on_any_property", on_any_property)
            .field("DEVICE", device_field())
            .field("PROPERTY", property_field())
            .statements("DO")
            .tooltip("Run actions whenever a device property changes")
            .category(Category::Triggers),
    );

    register_device_actions(registry);

    registry.register(
        BlockType::statement("zigbee_set_brightness", set_brightness)
            .field("DEVICE", device_field())
            .input_or("LEVEL", TypeTag::Number, "100")
            .tooltip("Set brightness in percent")
            .category(Category::DeviceActions),
    );
    registry.register(
        BlockType::statement("zigbee_set_color", set_color)
            .field("DEVICE", device_field())
            .input("HUE", TypeTag::Number)
            .input_or("SAT", TypeTag::Number, "254")
            .category(Category::DeviceActions),
    );
    registry.register(
        BlockType::statement("zigbee_send_raw", send_raw)
            .field("DEVICE", device_field())
            .input_or("ENDPOINT", TypeTag::Number, "1")
            .input("CLUSTER", TypeTag::Number)
            .input("COMMAND", TypeTag::Number)
            .tooltip("Send a raw ZCL command")
            .category(Category::DeviceActions),
    );
    registry.register(
        BlockType::statement("zigbee_wait", wait)
            .input_or("SECONDS", TypeTag::Number, "1")
            .statements("DO")
            .tooltip("Run the nested actions after a delay without blocking")
            .category(Category::DeviceActions),
    );
    registry.register(
        BlockType::statement("zigbee_log", log)
            .input("MSG", TypeTag::String)
            .category(Category::DeviceActions),
    );

    registry.register(
        BlockType::value("zigbee_event_value", TypeTag::Any, event_value)
            .tooltip("The value carried by the triggering event")
            .category(Category::DeviceValues),
    );
    registry.register(
        BlockType::value("zigbee_boolean", TypeTag::Any, boolean)
            .field("BOOL", FieldKind::dropdown([("true", "true"), ("false", "false")]))
            .category(Category::DeviceValues),
    );
    registry.register(
        BlockType::value("zigbee_get_property", TypeTag::Any, get_property)
            .field("DEVICE", device_field())
            .field("PROPERTY", property_field())
            .tooltip("Current value of a device property")
            .category(Category::DeviceValues),
    );

    // `controls_ifelse` is `controls_if` with an else branch; both share one generator.
    let base = registry
        .lookup("controls_if")
        .cloned()
        .unwrap_or_else(|| if_block(false));
    registry.register(
        BlockType::alias("controls_ifelse", &base)
            .with_generator(ControlsIf {
                else_by_default: true,
            })
            .label("block.controls_ifelse"),
    );
}

fn trigger_header(block: &Block, cx: &Emitter<'_>) -> String {
    format!(
        "zigbee.on(\"property_update\", {{ieee={}, property={}}}, function(event)\n",
        cx.quoted_field(block, "DEVICE"),
        cx.quoted_field(block, "PROPERTY"),
    )
}

fn on_property(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let header = trigger_header(block, cx);
    let value = cx.value(block, "VALUE", Slot::Right(Operator::Eq))?;
    let body = cx.statements(block, "DO")?;
    let guard = cx.indent(&format!("if event.value == {value} then\n{body}end\n"));
    Ok(Emitted::statement(format!("{header}{guard}end)\n")))
}

fn on_any_property(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let header = trigger_header(block, cx);
    let body = cx.statements(block, "DO")?;
    Ok(Emitted::statement(format!("{header}{body}end)\n")))
}

fn set_brightness(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let device = cx.quoted_field(block, "DEVICE");
    let level = cx.value(block, "LEVEL", Slot::Left(Operator::Div))?;
    Ok(Emitted::statement(format!(
        "zigbee.set_brightness({device}, math.floor({level} / 100 * 254))\n"
    )))
}

fn set_color(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let device = cx.quoted_field(block, "DEVICE");
    let hue = cx.value(block, "HUE", Slot::Free)?;
    let sat = cx.value(block, "SAT", Slot::Free)?;
    Ok(Emitted::statement(format!(
        "zigbee.set_color({device}, {hue}, {sat})\n"
    )))
}

fn send_raw(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let device = cx.quoted_field(block, "DEVICE");
    let endpoint = cx.value(block, "ENDPOINT", Slot::Free)?;
    let cluster = cx.value(block, "CLUSTER", Slot::Free)?;
    let command = cx.value(block, "COMMAND", Slot::Free)?;
    Ok(Emitted::statement(format!(
        "zigbee.send_command({device}, {endpoint}, {cluster}, {command})\n"
    )))
}

fn wait(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let seconds = cx.value(block, "SECONDS", Slot::Free)?;
    let body = cx.statements(block, "DO")?;
    Ok(Emitted::statement(format!(
        "zigbee.after({seconds}, function()\n{body}end)\n"
    )))
}

fn log(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let message = cx.value(block, "MSG", Slot::Free)?;
    Ok(Emitted::statement(format!("zigbee.log({message})\n")))
}

fn event_value(_block: &Block, _cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    Ok(Emitted::atom("event.value"))
}

fn boolean(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let literal = if cx.field(block, "BOOL") == "false" {
        "false"
    } else {
        "true"
    };
    Ok(Emitted::atom(literal))
}

fn get_property(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    Ok(Emitted::atom(format!(
        "zigbee.get_property({}, {})",
        cx.quoted_field(block, "DEVICE"),
        lua::quote(&cx.field(block, "PROPERTY")),
    )))
}
