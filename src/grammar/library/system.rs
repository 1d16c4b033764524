use crate::codegen::{Emitted, Emitter, Slot, lua};
use crate::error::GrammarError;
use crate::grammar::{BlockType, Category, FieldKind, Registry, TypeTag};
use crate::graph::Block;

pub fn register(registry: &mut Registry) {
    registry.register(
        BlockType::value("system_datetime", TypeTag::Any, datetime)
            .field(
                "COMPONENT",
                FieldKind::dropdown([
                    ("hour", "hour"),
                    ("minute", "minute"),
                    ("second", "second"),
                    ("weekday", "weekday"),
                    ("day", "day"),
                    ("month", "month"),
                    ("year", "year"),
                    ("timestamp", "timestamp"),
                    ("time string", "time_str"),
                    ("date string", "date_str"),
                ]),
            )
            .tooltip("Get a component of the current date/time")
            .category(Category::DateTime),
    );
    registry.register(
        BlockType::value("system_time_between", TypeTag::Boolean, time_between)
            .field("FROM", FieldKind::bounded(8.0, 0.0, 23.0, 1.0))
            .field("TO", FieldKind::bounded(22.0, 0.0, 23.0, 1.0))
            .tooltip("Check if the current hour is between two hours, wrapping past midnight")
            .category(Category::DateTime),
    );

    registry.register(
        BlockType::statement("telegram_send", telegram_send)
            .input("MSG", TypeTag::String)
            .tooltip("Send a message via Telegram")
            .category(Category::Notifications),
    );
    registry.register(
        BlockType::statement("system_log", log)
            .field(
                "LEVEL",
                FieldKind::dropdown([
                    ("info", "info"),
                    ("warn", "warn"),
                    ("error", "error"),
                    ("debug", "debug"),
                ]),
            )
            .input("MSG", TypeTag::String)
            .tooltip("Log a message at the chosen level")
            .category(Category::Notifications),
    );

    // Whether a command may run at all is decided by the runtime's allowlist.
    registry.register(
        BlockType::value("system_exec", TypeTag::String, exec)
            .input("CMD", TypeTag::String)
            .tooltip("Execute an external command and return its output")
            .category(Category::System),
    );
    registry.register(
        BlockType::statement("system_exec_no_output", exec_no_output)
            .input("CMD", TypeTag::String)
            .tooltip("Execute an external command")
            .category(Category::System),
    );
}

fn datetime(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    Ok(Emitted::atom(format!(
        "system.datetime({})",
        cx.quoted_field(block, "COMPONENT")
    )))
}

fn time_between(block: &Block, _cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let hour = |name: &str, default: f64| {
        lua::number(block.field(name).and_then(|v| v.as_number()).unwrap_or(default))
    };
    Ok(Emitted::atom(format!(
        "system.time_between({}, {})",
        hour("FROM", 8.0),
        hour("TO", 22.0)
    )))
}

fn telegram_send(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let message = cx.value(block, "MSG", Slot::Free)?;
    Ok(Emitted::statement(format!("telegram.send({message})\n")))
}

fn log(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let level = cx.quoted_field(block, "LEVEL");
    let message = cx.value(block, "MSG", Slot::Free)?;
    Ok(Emitted::statement(format!("system.log({level}, {message})\n")))
}

fn exec(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let command = cx.value(block, "CMD", Slot::Free)?;
    Ok(Emitted::atom(format!("system.exec({command})")))
}

fn exec_no_output(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let command = cx.value(block, "CMD", Slot::Free)?;
    Ok(Emitted::statement(format!("system.exec({command})\n")))
}
