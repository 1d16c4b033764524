//! Tests for catalog-backed dropdown options.
mod common;
use common::*;
use kumitate::backend::{DeviceSummary, KNOWN_PROPERTIES, MemoryCatalog};
use kumitate::options::NO_ITEMS_LABEL;
use kumitate::prelude::*;

#[test]
fn test_device_options_use_display_names() {
    let (_, catalog) = host();
    let provider = tokio_test::block_on(OptionProvider::load(&catalog));
    let devices = provider.resolve(OptionKind::Device);

    assert_eq!(
        devices,
        vec![
            DropdownOption::new("Hallway lamp", "0x00158d0001a2b3c4"),
            DropdownOption::new("IKEA TRADFRI bulb", "0x000d6ffffe1e2f3a"),
            DropdownOption::new("0x00124b0022a1b2c3", "0x00124b0022a1b2c3"),
        ]
    );
}

#[test]
fn test_display_name_fallbacks() {
    let blank_name = DeviceSummary {
        friendly_name: Some(String::new()),
        manufacturer: Some("Aqara".to_string()),
        model: Some("MCCGQ11LM".to_string()),
        ..DeviceSummary::new("0x01")
    };
    assert_eq!(blank_name.display_name(), "Aqara MCCGQ11LM");

    let model_only = DeviceSummary {
        model: Some("MCCGQ11LM".to_string()),
        ..DeviceSummary::new("0x02")
    };
    assert_eq!(model_only.display_name(), "0x02");
}

#[test]
fn test_empty_catalog_offers_the_placeholder() {
    let provider = tokio_test::block_on(OptionProvider::load(&MemoryCatalog::new(Vec::new())));
    let devices = provider.resolve(OptionKind::Device);
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].label, NO_ITEMS_LABEL);
    assert_eq!(devices[0].value, "");
}

#[test]
fn test_unavailable_catalog_degrades_to_the_placeholder() {
    let provider = tokio_test::block_on(OptionProvider::load(&MemoryCatalog::unavailable()));
    assert_eq!(
        provider.resolve(OptionKind::Device),
        vec![DropdownOption::placeholder()]
    );

    // Property keys come from the built-in list and do not need the catalog.
    let properties = provider.resolve(OptionKind::Property);
    let values: Vec<&str> = properties.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, KNOWN_PROPERTIES);
}

#[test]
fn test_render_pass_resolves_each_kind_once() {
    let (_, catalog) = host();
    let provider = tokio_test::block_on(OptionProvider::load(&catalog));

    {
        let mut pass = provider.render_pass();
        for _ in 0..5 {
            assert_eq!(pass.options(OptionKind::Device).len(), 3);
            assert_eq!(pass.options(OptionKind::Property).len(), 8);
        }
    }
    assert_eq!(provider.resolutions(), 2);

    let _ = provider.render_pass().options(OptionKind::Device).len();
    assert_eq!(provider.resolutions(), 3);
}

#[test]
fn test_field_options_by_field_kind() {
    let registry = Registry::standard();
    let provider = OptionProvider::from_options(
        vec![DropdownOption::new("Kitchen", "0xAA")],
        Vec::new(),
    );
    let mut pass = provider.render_pass();
    let probe = |kind: &str, field: &str| match registry
        .lookup(kind)
        .and_then(|ty| ty.socket_for(&Block::new("probe", kind), field))
    {
        Some(Socket::Field { kind, .. }) => kind,
        other => panic!("{}.{} is not a field: {:?}", kind, field, other.is_some()),
    };

    let device = pass.field_options(&probe("zigbee_turn_on", "DEVICE"));
    assert_eq!(device, vec![DropdownOption::new("Kitchen", "0xAA")]);

    let property = pass.field_options(&probe("zigbee_on_property", "PROPERTY"));
    assert_eq!(property, vec![DropdownOption::placeholder()]);

    let level = pass.field_options(&probe("system_log", "LEVEL"));
    assert_eq!(level.len(), 4);
    assert_eq!(level[0], DropdownOption::new("info", "info"));

    assert!(pass.field_options(&probe("text", "TEXT")).is_empty());
}

#[test]
fn test_instantiate_picks_the_first_device() {
    let registry = Registry::standard();
    let (_, catalog) = host();
    let provider = tokio_test::block_on(OptionProvider::load(&catalog));
    let mut pass = provider.render_pass();

    let mut workspace = Workspace::new();
    let id = workspace
        .instantiate(&registry, &PaletteEntry::new("zigbee_get_property"), Some(&mut pass))
        .unwrap();
    let block = workspace.find(&id).unwrap();
    assert_eq!(
        block.field("DEVICE"),
        Some(&FieldValue::from("0x00158d0001a2b3c4"))
    );
    assert_eq!(block.field("PROPERTY"), Some(&FieldValue::from("contact")));
}
