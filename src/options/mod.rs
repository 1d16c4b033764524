//! Choices for dropdown fields whose content depends on the host system.
//!
//! An [`OptionProvider`] is loaded once per editor open from a
//! [`DeviceCatalog`]; fields then resolve against it synchronously. A
//! [`RenderPass`] memoizes resolutions while several fields of the same kind
//! are drawn.

use crate::backend::{DeviceCatalog, DeviceSummary};
use crate::grammar::FieldKind;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Label of the placeholder entry returned for an empty catalog.
pub const NO_ITEMS_LABEL: &str = "no items";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Device,
    Property,
}

/// One `(label, value)` choice of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

impl DropdownOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// The entry offered when there is nothing to choose from. Its empty value
    /// keeps generated code from referencing an undefined device.
    pub fn placeholder() -> Self {
        Self::new(NO_ITEMS_LABEL, "")
    }
}

#[derive(Debug, Default)]
pub struct OptionProvider {
    devices: Vec<DropdownOption>,
    properties: Vec<DropdownOption>,
    resolutions: AtomicUsize,
}

impl OptionProvider {
    /// A provider backed by fixed lists, for hosts without a catalog.
    pub fn from_options(devices: Vec<DropdownOption>, properties: Vec<DropdownOption>) -> Self {
        Self {
            devices,
            properties,
            resolutions: AtomicUsize::new(0),
        }
    }

    /// Fetches the current catalog. A failing catalog is treated as empty.
    pub async fn load(catalog: &dyn DeviceCatalog) -> Self {
        let devices = match catalog.list_devices().await {
            Ok(devices) => devices.iter().map(device_option).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load device list");
                Vec::new()
            }
        };
        let properties = match catalog.list_properties().await {
            Ok(keys) => keys.into_iter().map(|k| DropdownOption::new(k.clone(), k)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load property list");
                Vec::new()
            }
        };
        tracing::debug!(
            devices = devices.len(),
            properties = properties.len(),
            "option catalog loaded"
        );
        Self::from_options(devices, properties)
    }

    /// The choices for `kind`, never empty.
    pub fn resolve(&self, kind: OptionKind) -> Vec<DropdownOption> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let options = match kind {
            OptionKind::Device => &self.devices,
            OptionKind::Property => &self.properties,
        };
        if options.is_empty() {
            vec![DropdownOption::placeholder()]
        } else {
            options.clone()
        }
    }

    /// Starts a render pass; each kind is resolved at most once during it.
    pub fn render_pass(&self) -> RenderPass<'_> {
        RenderPass {
            provider: self,
            cache: AHashMap::new(),
        }
    }

    /// How many times the catalog data has been resolved.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }
}

fn device_option(device: &DeviceSummary) -> DropdownOption {
    DropdownOption::new(device.display_name(), device.ieee_address.clone())
}

pub struct RenderPass<'a> {
    provider: &'a OptionProvider,
    cache: AHashMap<OptionKind, Vec<DropdownOption>>,
}

impl RenderPass<'_> {
    pub fn options(&mut self, kind: OptionKind) -> &[DropdownOption] {
        let provider = self.provider;
        self.cache.entry(kind).or_insert_with(|| provider.resolve(kind))
    }

    /// The choices a field presents: static for plain dropdowns, resolved for
    /// dynamic ones, none for other field kinds.
    pub fn field_options(&mut self, kind: &FieldKind) -> Vec<DropdownOption> {
        match kind {
            FieldKind::Dropdown(options) => options.clone(),
            FieldKind::Dynamic(dynamic) => self.options(*dynamic).to_vec(),
            _ => Vec::new(),
        }
    }
}
