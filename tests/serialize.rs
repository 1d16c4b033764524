//! Tests for workspace persistence and the stored automation document.
mod common;
use common::*;
use kumitate::backend::AutomationDocument;
use kumitate::codegen;
use kumitate::prelude::*;
use kumitate::serialize::{from_text, to_text};
use serde_json::{Value, json};

fn contact_workspace(registry: &Registry) -> Workspace {
    workspace_with(
        registry,
        vec![
            contact_trigger(),
            Block::new("w1", "zigbee_wait")
                .at(20.0, 240.0)
                .with_shadow("SECONDS", number("s1", 5.0))
                .with_statement("DO", device_action("a2", "zigbee_turn_off", "D2"))
                .with_next(Block::new("l1", "zigbee_log").with_input(
                    "MSG",
                    Block::new("j1", "text_join").with_extra_state(json!({ "itemCount": 3 })),
                )),
        ],
    )
}

#[test]
fn test_round_trip_preserves_blocks() {
    let registry = Registry::standard();
    let workspace = contact_workspace(&registry);

    let text = to_text(&workspace).unwrap();
    let restored = from_text(&registry, &text).unwrap();

    assert_eq!(restored.roots(), workspace.roots());
    assert_eq!(restored.block_count(), workspace.block_count());
}

#[test]
fn test_round_trip_preserves_generated_source() {
    let registry = Registry::standard();
    let workspace = contact_workspace(&registry);
    let restored = from_text(&registry, &to_text(&workspace).unwrap()).unwrap();
    assert_eq!(
        codegen::generate(&registry, &restored).unwrap(),
        codegen::generate(&registry, &workspace).unwrap()
    );
}

#[test]
fn test_text_is_stable_across_round_trips() {
    let registry = Registry::standard();
    let first = to_text(&contact_workspace(&registry)).unwrap();
    let second = to_text(&from_text(&registry, &first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_json_shape() {
    let registry = Registry::standard();
    let workspace = workspace_with(&registry, vec![contact_trigger()]);
    let value: Value = serde_json::from_str(&to_text(&workspace).unwrap()).unwrap();

    let root = &value[0];
    assert_eq!(root["type"], "zigbee_on_property");
    assert_eq!(root["id"], "t1");
    assert_eq!(root["x"], 20.0);
    assert_eq!(root["fields"]["DEVICE"], "D1");
    assert_eq!(root["inputs"]["VALUE"]["block"]["type"], "logic_boolean");
    assert_eq!(root["inputs"]["DO"]["block"]["fields"]["DEVICE"], "D2");
    assert!(root.get("next").is_none());
    assert!(root["inputs"]["DO"]["block"].get("x").is_none());
}

#[test]
fn test_extra_state_and_next_are_camel_case() {
    let registry = Registry::standard();
    let workspace = workspace_with(
        &registry,
        vec![
            Block::new("if1", "controls_if")
                .with_extra_state(json!({ "hasElse": true }))
                .with_next(device_action("a1", "zigbee_toggle", "L1")),
        ],
    );
    let value: Value = serde_json::from_str(&to_text(&workspace).unwrap()).unwrap();
    assert_eq!(value[0]["extraState"]["hasElse"], true);
    assert_eq!(value[0]["next"]["block"]["type"], "zigbee_toggle");
}

#[test]
fn test_editor_envelope_is_accepted() {
    let registry = Registry::standard();
    let text = r#"{
        "blocks": {
            "languageVersion": 0,
            "blocks": [
                {"type": "zigbee_turn_on", "id": "a1", "x": 10, "y": 10, "fields": {"DEVICE": "L1"}}
            ]
        }
    }"#;
    let workspace = from_text(&registry, text).unwrap();
    assert_eq!(workspace.roots().len(), 1);
    assert_eq!(
        codegen::generate(&registry, &workspace).unwrap(),
        "zigbee.turn_on(\"L1\")\n"
    );
}

#[test]
fn test_empty_inputs_restore_an_empty_workspace() {
    let registry = Registry::standard();
    for text in ["", "   \n", "[]", "{}", r#"{"blocks": {"languageVersion": 0}}"#] {
        let workspace = from_text(&registry, text).unwrap();
        assert!(workspace.is_empty(), "'{}' should restore nothing", text);
    }
}

#[test]
fn test_unknown_kind_rejects_the_whole_document() {
    let registry = Registry::standard();
    let text = r#"[
        {"type": "zigbee_turn_on", "id": "a1", "fields": {"DEVICE": "L1"}},
        {"type": "controls_repeat_ext", "id": "r1", "inputs": {
            "DO": {"block": {"type": "zigbee_teleport", "id": "x9"}}
        }}
    ]"#;
    match from_text(&registry, text) {
        Err(ParseError::Grammar(GrammarError::UnknownBlockKind { block_id, kind })) => {
            assert_eq!(block_id, BlockId::from("x9"));
            assert_eq!(kind, "zigbee_teleport");
        }
        other => panic!("expected an unknown kind error, got {:?}", other.map(|w| w.block_count())),
    }
}

#[test]
fn test_malformed_text_is_a_syntax_error() {
    let registry = Registry::standard();
    for text in ["{not json", "42", r#"[{"id": "a1"}]"#, r#"{"blocks": 3}"#] {
        assert!(
            matches!(from_text(&registry, text), Err(ParseError::Syntax(_))),
            "'{}' should fail to parse",
            text
        );
    }
}

#[test]
fn test_incompatible_connection_is_a_structure_error() {
    let registry = Registry::standard();
    let text = r#"[{"type": "math_arithmetic", "id": "m1", "inputs": {
        "A": {"block": {"type": "text", "id": "t1", "fields": {"TEXT": "seven"}}}
    }}]"#;
    assert!(matches!(
        from_text(&registry, text),
        Err(ParseError::Structure(GraphError::TypeMismatch(_)))
    ));
}

#[test]
fn test_missing_ids_are_assigned_without_collisions() {
    let registry = Registry::standard();
    let text = r#"[{
        "type": "zigbee_turn_on", "id": "b1", "fields": {"DEVICE": "A"},
        "next": {"block": {"type": "zigbee_turn_off", "fields": {"DEVICE": "B"}}}
    }]"#;
    let workspace = from_text(&registry, text).unwrap();
    let root = &workspace.roots()[0];
    assert_eq!(root.id, BlockId::from("b1"));
    assert_eq!(root.next.as_ref().unwrap().id, BlockId::from("b2"));
}

#[test]
fn test_numeric_fields_survive_as_numbers() {
    let registry = Registry::standard();
    let text = r#"[{"type": "variables_set", "id": "v1", "fields": {"VAR": "x"}, "inputs": {
        "VALUE": {"shadow": {"type": "math_number", "id": "n1", "fields": {"NUM": 2.5}}}
    }}]"#;
    let workspace = from_text(&registry, text).unwrap();
    let shadow = workspace.roots()[0].shadow("VALUE").unwrap();
    assert_eq!(shadow.field("NUM"), Some(&FieldValue::Number(2.5)));
    assert_eq!(codegen::generate(&registry, &workspace).unwrap(), "x = 2.5\n");
}

#[test]
fn test_non_finite_numbers_never_reach_the_saved_text() {
    let registry = Registry::standard();
    let mut workspace = workspace_with(&registry, vec![assign("v1", number("n1", 1.0))]);
    let n1 = BlockId::from("n1");

    for value in ["inf", "-infinity", "1e400"] {
        let err = workspace.set_field(&registry, &n1, "NUM", value).unwrap_err();
        assert!(matches!(err, GraphError::InvalidField { ref field, .. } if field == "NUM"));
    }
    assert!(matches!(
        workspace.add_root(&registry, number("n2", f64::INFINITY)),
        Err(GraphError::InvalidField { .. })
    ));

    // A bounded field pulls an infinity back into range instead.
    let hours = workspace.create_block(&registry, "system_time_between").unwrap();
    workspace.set_field(&registry, &hours, "TO", "inf").unwrap();

    let text = to_text(&workspace).unwrap();
    assert!(!text.contains("null"));
    let restored = from_text(&registry, &text).unwrap();
    assert_eq!(restored.roots(), workspace.roots());
    assert_eq!(
        restored.find(&hours).unwrap().field("TO"),
        Some(&FieldValue::Number(23.0))
    );
}

#[test]
fn test_stored_infinity_is_a_structure_error() {
    let registry = Registry::standard();
    let text = r#"[{"type": "math_number", "id": "n1", "fields": {"NUM": "inf"}}]"#;
    match from_text(&registry, text) {
        Err(ParseError::Structure(GraphError::InvalidField { block_id, field, .. })) => {
            assert_eq!(block_id, BlockId::from("n1"));
            assert_eq!(field, "NUM");
        }
        other => panic!("expected an invalid field, got {:?}", other.map(|w| w.block_count())),
    }
}

#[test]
fn test_oversized_repeat_counts_are_rejected() {
    let registry = Registry::standard();
    let documents = [
        ("if1", json!([{"type": "controls_if", "id": "if1", "extraState": {"elseIfCount": u64::MAX}}])),
        ("j1", json!([{"type": "text_join", "id": "j1", "extraState": {"itemCount": 1_000_000_000_000u64}}])),
    ];
    for (id, document) in documents {
        match from_text(&registry, &document.to_string()) {
            Err(ParseError::Structure(GraphError::InvalidExtraState { block_id, .. })) => {
                assert_eq!(block_id, BlockId::from(id));
            }
            other => panic!("expected invalid extra state, got {:?}", other.map(|w| w.block_count())),
        }
    }

    let bounded = json!([{"type": "text_join", "id": "j1", "extraState": {"itemCount": 4}}]);
    let workspace = from_text(&registry, &bounded.to_string()).unwrap();
    assert_eq!(workspace.roots()[0].extra_state, Some(json!({ "itemCount": 4 })));
}

#[test]
fn test_restored_fields_are_normalized() {
    let registry = Registry::standard();
    let text = r#"[{"type": "variables_set", "id": "v1", "fields": {"VAR": "x"}, "inputs": {
        "VALUE": {"block": {"type": "system_time_between", "id": "h1",
                            "fields": {"FROM": 100, "TO": "-inf"}}}
    }}]"#;
    let workspace = from_text(&registry, text).unwrap();
    let hours = workspace.find(&BlockId::from("h1")).unwrap();
    assert_eq!(hours.field("FROM"), Some(&FieldValue::Number(23.0)));
    assert_eq!(hours.field("TO"), Some(&FieldValue::Number(0.0)));
    assert_eq!(
        codegen::generate(&registry, &workspace).unwrap(),
        "x = system.time_between(23, 0)\n"
    );
}

#[test]
fn test_document_accepts_legacy_field_names() {
    let document: AutomationDocument = serde_json::from_value(json!({
        "name": "Hall light",
        "lua_code": "zigbee.turn_on(\"L1\")\n",
        "blockly_xml": "[]"
    }))
    .unwrap();
    assert_eq!(document.generated_source, "zigbee.turn_on(\"L1\")\n");
    assert_eq!(document.serialized_graph, "[]");
    assert!(document.enabled);
    assert_eq!(document.description, "");

    let written = serde_json::to_value(&document).unwrap();
    assert_eq!(written["generatedSource"], "zigbee.turn_on(\"L1\")\n");
    assert_eq!(written["serializedGraph"], "[]");
}
