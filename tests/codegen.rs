//! Tests for Lua generation: precedence, default substitution, statement
//! ordering and nesting.
mod common;
use common::*;
use kumitate::codegen::{self, Operator, lua};
use kumitate::prelude::*;
use serde_json::json;

#[test]
fn test_contact_trigger_scenario() {
    let registry = Registry::standard();
    assert_eq!(generate_one(&registry, contact_trigger()), CONTACT_SCRIPT);
}

#[test]
fn test_generation_is_idempotent() {
    let registry = Registry::standard();
    let ws = workspace_with(
        &registry,
        vec![
            contact_trigger(),
            device_action("a9", "zigbee_toggle", "D3").at(0.0, 200.0),
        ],
    );
    let first = codegen::generate(&registry, &ws).unwrap();
    let second = codegen::generate(&registry, &ws).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_chain_order_is_link_order() {
    let registry = Registry::standard();
    let trigger = Block::new("t1", "zigbee_on_any_property")
        .with_field("DEVICE", "D1")
        .with_field("PROPERTY", "occupancy")
        .with_statement(
            "DO",
            device_action("a1", "zigbee_turn_on", "L1").with_next(
                device_action("a2", "zigbee_set_brightness", "L2").with_next(
                    Block::new("a3", "telegram_send").with_input("MSG", text("m1", "done")),
                ),
            ),
        );

    let source = generate_one(&registry, trigger);
    assert_eq!(
        source,
        "zigbee.on(\"property_update\", {ieee=\"D1\", property=\"occupancy\"}, function(event)\n\
         \x20 zigbee.turn_on(\"L1\")\n\
         \x20 zigbee.set_brightness(\"L2\", math.floor(100 / 100 * 254))\n\
         \x20 telegram.send(\"done\")\n\
         end)\n"
    );
    let on = source.find("turn_on").unwrap();
    let brightness = source.find("set_brightness").unwrap();
    let send = source.find("telegram.send").unwrap();
    assert!(on < brightness && brightness < send);
}

#[test]
fn test_nested_body_does_not_leak_into_siblings() {
    let registry = Registry::standard();
    let head = Block::new("r1", "controls_repeat_ext")
        .with_statement("DO", device_action("a1", "zigbee_turn_on", "A"))
        .with_next(device_action("a2", "zigbee_turn_off", "B"));
    assert_eq!(
        generate_one(&registry, head),
        "for count = 1, 10 do\n  zigbee.turn_on(\"A\")\nend\nzigbee.turn_off(\"B\")\n"
    );
}

#[test]
fn test_wait_schedules_a_continuation() {
    let registry = Registry::standard();
    let wait = Block::new("w1", "zigbee_wait")
        .with_input("SECONDS", number("n1", 5.0))
        .with_statement("DO", device_action("a1", "zigbee_turn_off", "L1"))
        .with_next(Block::new("l1", "zigbee_log").with_input("MSG", text("m1", "scheduled")));
    assert_eq!(
        generate_one(&registry, wait),
        "zigbee.after(5, function()\n  zigbee.turn_off(\"L1\")\nend)\nzigbee.log(\"scheduled\")\n"
    );
}

#[test]
fn test_shadow_then_type_default() {
    let registry = Registry::standard();
    let mut ws = workspace_with(&registry, vec![device_action("c1", "zigbee_set_color", "L1")]);
    let c1 = BlockId::from("c1");

    ws.set_shadow(&registry, &c1, "HUE", Some(number("s1", 100.0))).unwrap();
    assert_eq!(
        codegen::generate(&registry, &ws).unwrap(),
        "zigbee.set_color(\"L1\", 100, 254)\n"
    );

    ws.add_root(&registry, number("n1", 7.0)).unwrap();
    ws.connect_value(&registry, &c1, "HUE", &BlockId::from("n1")).unwrap();
    assert_eq!(
        codegen::generate(&registry, &ws).unwrap(),
        "zigbee.set_color(\"L1\", 7, 254)\n"
    );

    ws.delete(&BlockId::from("n1")).unwrap();
    ws.set_shadow(&registry, &c1, "HUE", None).unwrap();
    assert_eq!(
        codegen::generate(&registry, &ws).unwrap(),
        "zigbee.set_color(\"L1\", 0, 254)\n"
    );
}

#[test]
fn test_type_defaults_for_empty_sockets() {
    let registry = Registry::standard();
    assert_eq!(
        generate_one(&registry, Block::new("s1", "telegram_send")),
        "telegram.send(\"\")\n"
    );
    assert_eq!(
        generate_one(&registry, Block::new("v1", "variables_set").with_field("VAR", "x")),
        "x = nil\n"
    );
    assert_eq!(
        generate_one(&registry, assign("v1", Block::new("n1", "logic_negate"))),
        "x = not true\n"
    );
    assert_eq!(
        generate_one(&registry, assign("v1", Block::new("c1", "math_constrain"))),
        "x = math.min(math.max(0, 0), math.huge)\n"
    );
}

#[test]
fn test_logic_operation_fallbacks_keep_the_other_side() {
    let registry = Registry::standard();
    let and = Block::new("o1", "logic_operation")
        .with_field("OP", "AND")
        .with_input("A", Block::new("h1", "system_time_between"));
    let or = Block::new("o2", "logic_operation")
        .with_field("OP", "OR")
        .with_input("B", Block::new("e1", "zigbee_event_value"));
    assert_eq!(
        generate_one(&registry, assign("v1", and)),
        "x = system.time_between(8, 22) and true\n"
    );
    assert_eq!(
        generate_one(&registry, assign("v1", or)),
        "x = false or event.value\n"
    );
}

#[test]
fn test_slots_parenthesize_weaker_children() {
    assert!(Slot::Left(Operator::Mul).needs_parens(Strength::Additive));
    assert!(!Slot::Left(Operator::Sub).needs_parens(Strength::Additive));
    assert!(Slot::Right(Operator::Sub).needs_parens(Strength::Additive));
    assert!(!Slot::Right(Operator::Add).needs_parens(Strength::Multiplicative));

    // Right-associative operators mirror the rule.
    assert!(!Slot::Right(Operator::Pow).needs_parens(Strength::Power));
    assert!(Slot::Left(Operator::Pow).needs_parens(Strength::Power));
    assert!(Slot::Left(Operator::Pow).needs_parens(Strength::Unary));
    assert!(!Slot::Right(Operator::Concat).needs_parens(Strength::Concat));
    assert!(Slot::Left(Operator::Concat).needs_parens(Strength::Concat));

    assert!(Slot::Operand(Operator::Not).needs_parens(Strength::And));
    assert!(!Slot::Operand(Operator::Neg).needs_parens(Strength::Power));
    assert!(Slot::Callee.needs_parens(Strength::Unary));
    assert!(!Slot::Free.needs_parens(Strength::Or));
    assert_eq!(Strength::Call.tighter(), Strength::Atomic);
}

#[test]
fn test_arithmetic_grouping() {
    let registry = Registry::standard();
    let cases = [
        (
            arithmetic("m", "MULTIPLY", arithmetic("a", "ADD", number("n1", 1.0), number("n2", 2.0)), number("n3", 3.0)),
            "x = (1 + 2) * 3\n",
        ),
        (
            arithmetic("m", "ADD", number("n1", 1.0), arithmetic("a", "MULTIPLY", number("n2", 2.0), number("n3", 3.0))),
            "x = 1 + 2 * 3\n",
        ),
        (
            arithmetic("m", "MINUS", number("n1", 1.0), arithmetic("a", "MINUS", number("n2", 2.0), number("n3", 3.0))),
            "x = 1 - (2 - 3)\n",
        ),
        (
            arithmetic("m", "MINUS", arithmetic("a", "MINUS", number("n1", 1.0), number("n2", 2.0)), number("n3", 3.0)),
            "x = 1 - 2 - 3\n",
        ),
        (
            arithmetic("m", "POWER", number("n1", 2.0), arithmetic("a", "POWER", number("n2", 3.0), number("n3", 2.0))),
            "x = 2 ^ 3 ^ 2\n",
        ),
        (
            arithmetic("m", "POWER", arithmetic("a", "POWER", number("n1", 2.0), number("n2", 3.0)), number("n3", 2.0)),
            "x = (2 ^ 3) ^ 2\n",
        ),
        (
            arithmetic("m", "POWER", number("n1", -2.0), number("n2", 2.0)),
            "x = (-2) ^ 2\n",
        ),
        (
            arithmetic("m", "DIVIDE", number("n1", 1.5), number("n2", -4.0)),
            "x = 1.5 / -4\n",
        ),
    ];
    for (expression, expected) in cases {
        assert_eq!(generate_one(&registry, assign("v1", expression)), expected);
    }
}

#[test]
fn test_logic_grouping() {
    let registry = Registry::standard();
    let negated_and = Block::new("n1", "logic_negate").with_input(
        "BOOL",
        Block::new("o1", "logic_operation")
            .with_field("OP", "AND")
            .with_input("A", Block::new("b1", "logic_boolean"))
            .with_input("B", Block::new("b2", "logic_boolean").with_field("BOOL", "FALSE")),
    );
    assert_eq!(
        generate_one(&registry, assign("v1", negated_and)),
        "x = not (true and false)\n"
    );

    let compare = Block::new("c1", "logic_compare")
        .with_field("OP", "GT")
        .with_input("A", arithmetic("a", "ADD", number("n1", 1.0), number("n2", 2.0)))
        .with_input("B", number("n3", 3.0));
    assert_eq!(
        generate_one(&registry, assign("v1", compare)),
        "x = 1 + 2 > 3\n"
    );

    let or_in_and = Block::new("o1", "logic_operation")
        .with_field("OP", "AND")
        .with_input(
            "A",
            Block::new("o2", "logic_operation")
                .with_field("OP", "OR")
                .with_input("A", Block::new("b1", "logic_boolean"))
                .with_input("B", Block::new("b2", "logic_boolean")),
        )
        .with_input("B", Block::new("b3", "logic_boolean"));
    assert_eq!(
        generate_one(&registry, assign("v1", or_in_and)),
        "x = (true or true) and true\n"
    );
}

#[test]
fn test_text_blocks() {
    let registry = Registry::standard();
    let join = Block::new("j1", "text_join")
        .with_input("ADD0", text("t1", "temp: "))
        .with_input("ADD1", Block::new("g1", "variables_get").with_field("VAR", "t"));
    let log = Block::new("l1", "system_log")
        .with_field("LEVEL", "warn")
        .with_input("MSG", join);
    assert_eq!(
        generate_one(&registry, log),
        "system.log(\"warn\", \"temp: \" .. t)\n"
    );

    let three = Block::new("j2", "text_join")
        .with_extra_state(json!({ "itemCount": 3 }))
        .with_input("ADD0", text("t1", "a"))
        .with_input("ADD2", text("t2", "c"));
    assert_eq!(
        generate_one(&registry, assign("v1", three)),
        "x = table.concat({\"a\", \"\", \"c\"})\n"
    );

    let length = Block::new("len", "text_length").with_input("VALUE", text("t1", "say \"hi\""));
    assert_eq!(
        generate_one(&registry, assign("v1", length)),
        "x = #\"say \\\"hi\\\"\"\n"
    );
}

#[test]
fn test_if_elseif_else() {
    let registry = Registry::standard();
    let block = Block::new("if1", "controls_if")
        .with_extra_state(json!({ "elseIfCount": 1, "hasElse": true }))
        .with_input("IF0", Block::new("h1", "system_time_between"))
        .with_statement("DO0", device_action("a1", "zigbee_turn_on", "A"))
        .with_statement("ELSE", device_action("a2", "zigbee_turn_off", "B"));
    assert_eq!(
        generate_one(&registry, block),
        "if system.time_between(8, 22) then\n  zigbee.turn_on(\"A\")\nelseif false then\nelse\n  zigbee.turn_off(\"B\")\nend\n"
    );

    assert_eq!(
        generate_one(&registry, Block::new("if2", "controls_ifelse")),
        "if false then\nelse\nend\n"
    );
}

#[test]
fn test_loops() {
    let registry = Registry::standard();
    let count = Block::new("f1", "controls_for")
        .with_field("VAR", "end")
        .with_input("BY", number("n1", 2.0))
        .with_statement(
            "DO",
            Block::new("l1", "zigbee_log")
                .with_input("MSG", Block::new("g1", "variables_get").with_field("VAR", "end")),
        );
    assert_eq!(
        generate_one(&registry, count),
        "for end_ = 1, 10, 2 do\n  zigbee.log(end_)\nend\n"
    );

    let until = Block::new("w1", "controls_whileUntil")
        .with_field("MODE", "UNTIL")
        .with_input(
            "BOOL",
            Block::new("c1", "logic_compare")
                .with_input("A", Block::new("e1", "zigbee_event_value"))
                .with_input("B", Block::new("b1", "zigbee_boolean").with_field("BOOL", "true")),
        );
    assert_eq!(
        generate_one(&registry, until),
        "while not (event.value == true) do\nend\n"
    );
}

#[test]
fn test_for_each_over_a_list() {
    let registry = Registry::standard();
    let each = Block::new("f1", "controls_forEach")
        .with_field("VAR", "lamp")
        .with_input("LIST", Block::new("g1", "variables_get").with_field("VAR", "lamps"))
        .with_statement(
            "DO",
            Block::new("l1", "zigbee_log")
                .with_input("MSG", Block::new("g2", "variables_get").with_field("VAR", "lamp")),
        );
    assert_eq!(
        generate_one(&registry, each),
        "for _, lamp in ipairs(lamps) do\n  zigbee.log(lamp)\nend\n"
    );

    assert_eq!(
        generate_one(&registry, Block::new("f2", "controls_forEach")),
        "for _, j in ipairs({}) do\nend\n"
    );
}

#[test]
fn test_text_index_of() {
    let registry = Registry::standard();
    let index_of = |end: &str| {
        Block::new("i1", "text_indexOf")
            .with_field("END", end)
            .with_input("VALUE", text("t1", "hello"))
            .with_input("FIND", text("t2", "l"))
    };

    assert_eq!(
        generate_one(&registry, assign("v1", index_of("FIRST"))),
        "x = string.find(\"hello\", \"l\", 1, true) or 0\n"
    );
    assert_eq!(
        generate_one(
            &registry,
            assign("v1", arithmetic("m1", "ADD", index_of("FIRST"), number("n1", 1.0)))
        ),
        "x = (string.find(\"hello\", \"l\", 1, true) or 0) + 1\n"
    );

    let last = generate_one(&registry, assign("v1", index_of("LAST")));
    assert!(last.starts_with("x = (function(s, f) local last, i = 0, 0 repeat"));
    assert!(last.contains("string.find(s, f, i + 1, true)"));
    assert!(last.ends_with("return last end)(\"hello\", \"l\")\n"));
}

#[test]
fn test_text_char_at() {
    let registry = Registry::standard();
    let char_at = |at: &str, index: Option<Block>| {
        let block = Block::new("c1", "text_charAt")
            .with_field("WHERE", at)
            .with_input("VALUE", text("t1", "abc"));
        match index {
            Some(index) => block.with_input("AT", index),
            None => block,
        }
    };
    let cases = [
        (char_at("FROM_START", Some(number("n1", 2.0))), "string.sub(\"abc\", 2, 2)"),
        (char_at("FROM_START", None), "string.sub(\"abc\", 1, 1)"),
        (char_at("FROM_END", Some(number("n1", 2.0))), "string.sub(\"abc\", -2, -2)"),
        (char_at("FROM_END", Some(number("n1", -2.0))), "string.sub(\"abc\", -(-2), -(-2))"),
        (char_at("FIRST", None), "string.sub(\"abc\", 1, 1)"),
        (char_at("LAST", None), "string.sub(\"abc\", -1, -1)"),
    ];
    for (block, expected) in cases {
        assert_eq!(
            generate_one(&registry, assign("v1", block)),
            format!("x = {expected}\n")
        );
    }
}

#[test]
fn test_time_between_uses_normalized_hours() {
    let registry = Registry::standard();
    let hours = Block::new("h1", "system_time_between")
        .with_field("FROM", 100.0)
        .with_field("TO", "-inf");
    assert_eq!(
        generate_one(&registry, assign("v1", hours)),
        "x = system.time_between(23, 0)\n"
    );
}

#[test]
fn test_roots_in_canvas_order_with_blank_lines() {
    let registry = Registry::standard();
    let ws = workspace_with(
        &registry,
        vec![
            device_action("a1", "zigbee_turn_on", "A").at(0.0, 100.0),
            device_action("a2", "zigbee_turn_off", "B").at(50.0, 10.0),
            number("n1", 4.0).at(0.0, 0.0),
            device_action("a3", "zigbee_toggle", "C").at(0.0, 10.0),
        ],
    );
    assert_eq!(
        codegen::generate(&registry, &ws).unwrap(),
        "zigbee.toggle(\"C\")\n\nzigbee.turn_off(\"B\")\n\nzigbee.turn_on(\"A\")\n"
    );
}

#[test]
fn test_empty_workspace_generates_nothing() {
    let registry = Registry::standard();
    assert_eq!(codegen::generate(&registry, &Workspace::new()).unwrap(), "");
}

#[test]
fn test_unknown_kind_fails_with_block_id() {
    let full = Registry::standard();
    let ws = workspace_with(
        &full,
        vec![
            Block::new("r1", "controls_repeat_ext")
                .with_statement("DO", device_action("a7", "zigbee_turn_on", "A")),
        ],
    );
    let general = Registry::builder().with_standard_library().build();
    let err = codegen::generate(&general, &ws).unwrap_err();
    assert_eq!(
        err,
        GrammarError::UnknownBlockKind {
            block_id: BlockId::from("a7"),
            kind: "zigbee_turn_on".to_string(),
        }
    );
}

#[test]
fn test_custom_indent() {
    let registry = Registry::standard();
    let ws = workspace_with(&registry, vec![contact_trigger()]);
    let options = CodegenOptions {
        indent: "\t".to_string(),
    };
    let source = codegen::generate_with(&registry, &ws, &options).unwrap();
    assert!(source.contains("\n\tif event.value == false then\n\t\tzigbee.turn_on(\"D2\")\n\tend\n"));
}

#[test]
fn test_datetime_and_exec() {
    let registry = Registry::standard();
    let exec = Block::new("x1", "system_exec").with_input("CMD", text("t1", "uptime"));
    let message = Block::new("j1", "text_join")
        .with_input("ADD0", Block::new("d1", "system_datetime").with_field("COMPONENT", "time_str"))
        .with_input("ADD1", exec);
    let send = Block::new("s1", "telegram_send").with_input("MSG", message);
    assert_eq!(
        generate_one(&registry, send),
        "telegram.send(system.datetime(\"time_str\") .. system.exec(\"uptime\"))\n"
    );

    let property = Block::new("p1", "zigbee_get_property")
        .with_field("DEVICE", "D1")
        .with_field("PROPERTY", "temperature");
    assert_eq!(
        generate_one(&registry, assign("v1", property)),
        "x = zigbee.get_property(\"D1\", \"temperature\")\n"
    );
}

#[test]
fn test_lua_lexical_helpers() {
    assert_eq!(lua::quote("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
    assert_eq!(lua::identifier("2 lamps"), "_2_lamps");
    assert_eq!(lua::identifier("zigbee"), "zigbee_");
    assert_eq!(lua::identifier("until"), "until_");
    assert_eq!(lua::identifier(""), "unnamed");
    assert_eq!(lua::number(3.0), "3");
    assert_eq!(lua::number(0.25), "0.25");
    assert_eq!(lua::number(f64::NEG_INFINITY), "-math.huge");
    assert_eq!(lua::indent("a\n\nb\n", "  "), "  a\n\n  b\n");
}
