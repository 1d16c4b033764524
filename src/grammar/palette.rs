use crate::graph::FieldValue;
use serde_json::json;

/// Palette category a block kind is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Triggers,
    DeviceActions,
    DeviceValues,
    DateTime,
    Notifications,
    System,
    Logic,
    Loops,
    Math,
    Text,
    Variables,
}

impl Category {
    /// Hue used by the canvas to tint blocks of this category.
    pub fn colour(self) -> u16 {
        match self {
            Category::Triggers | Category::DeviceValues | Category::Logic => 210,
            Category::DeviceActions | Category::Loops => 120,
            Category::DateTime => 65,
            Category::Notifications | Category::Variables => 330,
            Category::System => 0,
            Category::Math => 230,
            Category::Text => 160,
        }
    }

    /// Localization key for the category name.
    pub fn label_key(self) -> &'static str {
        match self {
            Category::Triggers => "blockly.triggers",
            Category::DeviceActions => "blockly.device_actions",
            Category::DeviceValues => "blockly.device_values",
            Category::DateTime => "blockly.datetime",
            Category::Notifications => "blockly.notifications",
            Category::System => "blockly.system",
            Category::Logic => "blockly.logic",
            Category::Loops => "blockly.loops",
            Category::Math => "blockly.math",
            Category::Text => "blockly.text",
            Category::Variables => "blockly.variables",
        }
    }
}

/// A default literal block plugged into a socket when a palette entry is dragged out.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowPreset {
    pub socket: String,
    pub kind: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl ShadowPreset {
    pub fn number(socket: &str, value: f64) -> Self {
        Self {
            socket: socket.to_string(),
            kind: "math_number".to_string(),
            fields: vec![("NUM".to_string(), FieldValue::Number(value))],
        }
    }

    pub fn text(socket: &str, value: &str) -> Self {
        Self {
            socket: socket.to_string(),
            kind: "text".to_string(),
            fields: vec![("TEXT".to_string(), FieldValue::Text(value.to_string()))],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub kind: String,
    pub extra_state: Option<serde_json::Value>,
    pub shadows: Vec<ShadowPreset>,
}

impl PaletteEntry {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            extra_state: None,
            shadows: Vec::new(),
        }
    }

    pub fn with_shadow(mut self, shadow: ShadowPreset) -> Self {
        self.shadows.push(shadow);
        self
    }

    pub fn with_extra_state(mut self, state: serde_json::Value) -> Self {
        self.extra_state = Some(state);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteCategory {
    pub category: Category,
    pub entries: Vec<PaletteEntry>,
}

impl PaletteCategory {
    pub fn new(category: Category, entries: Vec<PaletteEntry>) -> Self {
        Self { category, entries }
    }
}

/// The toolbox shown by the automation editor.
pub fn default_palette() -> Vec<PaletteCategory> {
    use ShadowPreset as S;
    let entry = PaletteEntry::new;

    vec![
        PaletteCategory::new(
            Category::Triggers,
            vec![entry("zigbee_on_property"), entry("zigbee_on_any_property")],
        ),
        PaletteCategory::new(
            Category::DeviceActions,
            vec![
                entry("zigbee_turn_on"),
                entry("zigbee_turn_off"),
                entry("zigbee_toggle"),
                entry("zigbee_set_brightness").with_shadow(S::number("LEVEL", 100.0)),
                entry("zigbee_set_color")
                    .with_shadow(S::number("HUE", 0.0))
                    .with_shadow(S::number("SAT", 254.0)),
                entry("zigbee_send_raw")
                    .with_shadow(S::number("ENDPOINT", 1.0))
                    .with_shadow(S::number("CLUSTER", 6.0))
                    .with_shadow(S::number("COMMAND", 0.0)),
                entry("zigbee_wait").with_shadow(S::number("SECONDS", 5.0)),
                entry("zigbee_log").with_shadow(S::text("MSG", "hello")),
            ],
        ),
        PaletteCategory::new(
            Category::DeviceValues,
            vec![
                entry("zigbee_event_value"),
                entry("zigbee_boolean"),
                entry("zigbee_get_property"),
            ],
        ),
        PaletteCategory::new(
            Category::DateTime,
            vec![entry("system_datetime"), entry("system_time_between")],
        ),
        PaletteCategory::new(
            Category::Notifications,
            vec![
                entry("telegram_send").with_shadow(S::text("MSG", "Alert!")),
                entry("system_log").with_shadow(S::text("MSG", "something happened")),
            ],
        ),
        PaletteCategory::new(
            Category::System,
            vec![
                entry("system_exec").with_shadow(S::text("CMD", "/usr/bin/curl")),
                entry("system_exec_no_output").with_shadow(S::text("CMD", "/usr/bin/curl")),
            ],
        ),
        PaletteCategory::new(
            Category::Logic,
            vec![
                entry("controls_if"),
                entry("controls_if").with_extra_state(json!({ "hasElse": true })),
                entry("logic_compare"),
                entry("logic_operation"),
                entry("logic_negate"),
                entry("logic_boolean"),
            ],
        ),
        PaletteCategory::new(
            Category::Loops,
            vec![
                entry("controls_repeat_ext").with_shadow(S::number("TIMES", 10.0)),
                entry("controls_whileUntil"),
                entry("controls_for")
                    .with_shadow(S::number("FROM", 1.0))
                    .with_shadow(S::number("TO", 10.0))
                    .with_shadow(S::number("BY", 1.0)),
                entry("controls_forEach"),
            ],
        ),
        PaletteCategory::new(
            Category::Math,
            vec![
                entry("math_number"),
                entry("math_arithmetic")
                    .with_shadow(S::number("A", 1.0))
                    .with_shadow(S::number("B", 1.0)),
                entry("math_modulo")
                    .with_shadow(S::number("DIVIDEND", 64.0))
                    .with_shadow(S::number("DIVISOR", 10.0)),
                entry("math_constrain")
                    .with_shadow(S::number("VALUE", 50.0))
                    .with_shadow(S::number("LOW", 1.0))
                    .with_shadow(S::number("HIGH", 100.0)),
                entry("math_random_int")
                    .with_shadow(S::number("FROM", 1.0))
                    .with_shadow(S::number("TO", 100.0)),
            ],
        ),
        PaletteCategory::new(
            Category::Text,
            vec![
                entry("text"),
                entry("text_join"),
                entry("text_length").with_shadow(S::text("VALUE", "abc")),
                entry("text_indexOf")
                    .with_shadow(S::text("VALUE", "abc"))
                    .with_shadow(S::text("FIND", "b")),
                entry("text_charAt")
                    .with_shadow(S::text("VALUE", "abc"))
                    .with_shadow(S::number("AT", 1.0)),
            ],
        ),
        PaletteCategory::new(
            Category::Variables,
            vec![entry("variables_get"), entry("variables_set")],
        ),
    ]
}
