//! Interfaces to the host services an editor session talks to.
//!
//! The core never executes generated code itself: it hands the script to an
//! [`AutomationBackend`] and passes the runtime's answer through unchanged.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod memory;

pub use memory::{MemoryBackend, MemoryCatalog};

/// Property keys offered by the property dropdown.
pub const KNOWN_PROPERTIES: [&str; 8] = [
    "contact",
    "battery",
    "temperature",
    "humidity",
    "illuminance",
    "occupancy",
    "power",
    "on_off",
];

/// A paired device as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub ieee_address: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl DeviceSummary {
    pub fn new(ieee_address: impl Into<String>) -> Self {
        Self {
            ieee_address: ieee_address.into(),
            ..Default::default()
        }
    }

    /// Friendly name, else `manufacturer model`, else the IEEE address.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.friendly_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match (self.manufacturer.as_deref(), self.model.as_deref()) {
            (Some(manufacturer), Some(model)) if !manufacturer.is_empty() && !model.is_empty() => {
                format!("{manufacturer} {model}")
            }
            _ => self.ieee_address.clone(),
        }
    }
}

/// Read-only source of the devices and properties dropdowns offer.
#[async_trait]
pub trait DeviceCatalog: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<DeviceSummary>, BackendError>;

    async fn list_properties(&self) -> Result<Vec<String>, BackendError> {
        Ok(KNOWN_PROPERTIES.iter().map(|p| p.to_string()).collect())
    }
}

fn default_enabled() -> bool {
    true
}

/// A persisted automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "lua_code")]
    pub generated_source: String,
    #[serde(default, alias = "blockly_xml")]
    pub serialized_graph: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl AutomationDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            generated_source: String::new(),
            serialized_graph: String::new(),
            enabled: default_enabled(),
        }
    }
}

/// What to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum RunTarget {
    /// A saved automation, by id.
    Saved(String),
    /// Unsaved source, run once.
    Inline(String),
}

/// The runtime's report. `error` is the runtime's own message, uninterpreted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Persistence and execution of automations.
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    async fn load_automation(&self, id: &str) -> Result<AutomationDocument, BackendError>;

    /// Creates (`id == None`) or overwrites an automation and returns its id.
    /// Concurrent saves are last-writer-wins.
    async fn save_automation(
        &self,
        id: Option<&str>,
        document: &AutomationDocument,
    ) -> Result<String, BackendError>;

    async fn run_automation(&self, target: RunTarget) -> Result<RunOutcome, BackendError>;
}
