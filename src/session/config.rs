use crate::codegen::CodegenOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_DEBOUNCE_MS: u64 = 300;

fn default_debounce() -> Duration {
    Duration::from_millis(DEFAULT_DEBOUNCE_MS)
}

/// Settings of one editor session.
///
/// ```json
/// { "debounceMs": 300, "codegen": { "indent": "  " } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Quiet period after the last edit before the preview is regenerated.
    #[serde(default = "default_debounce", rename = "debounceMs", with = "millis")]
    pub debounce: Duration,
    #[serde(default)]
    pub codegen: CodegenOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            codegen: CodegenOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.codegen.indent = indent.into();
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
