use super::{AutomationBackend, AutomationDocument, DeviceCatalog, DeviceSummary, RunOutcome, RunTarget};
use crate::error::BackendError;
use ahash::AHashMap;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed device list. With `failing` set every call errors, as an
/// unreachable catalog service would.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    devices: Vec<DeviceSummary>,
    failing: bool,
}

impl MemoryCatalog {
    pub fn new(devices: Vec<DeviceSummary>) -> Self {
        Self {
            devices,
            failing: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            devices: Vec::new(),
            failing: true,
        }
    }
}

#[async_trait]
impl DeviceCatalog for MemoryCatalog {
    async fn list_devices(&self) -> Result<Vec<DeviceSummary>, BackendError> {
        if self.failing {
            return Err(BackendError::Generic("catalog unavailable".to_string()));
        }
        Ok(self.devices.clone())
    }
}

#[derive(Debug, Default)]
struct Store {
    documents: AHashMap<String, AutomationDocument>,
    runs: Vec<RunTarget>,
}

/// Keeps automations in memory and records run requests. Runs succeed
/// without executing anything, reporting the script's line count in the logs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: Mutex<Store>,
    next_id: AtomicU64,
    saves: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document under a known id.
    pub fn insert(&self, id: &str, document: AutomationDocument) {
        self.lock().documents.insert(id.to_string(), document);
    }

    pub fn document(&self, id: &str) -> Option<AutomationDocument> {
        self.lock().documents.get(id).cloned()
    }

    pub fn runs(&self) -> Vec<RunTarget> {
        self.lock().runs.clone()
    }

    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AutomationBackend for MemoryBackend {
    async fn load_automation(&self, id: &str) -> Result<AutomationDocument, BackendError> {
        self.document(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    async fn save_automation(
        &self,
        id: Option<&str>,
        document: &AutomationDocument,
    ) -> Result<String, BackendError> {
        let id = match id {
            Some(id) => id.to_string(),
            None => format!("auto-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
        };
        self.lock().documents.insert(id.clone(), document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn run_automation(&self, target: RunTarget) -> Result<RunOutcome, BackendError> {
        let source = match &target {
            RunTarget::Saved(id) => self
                .document(id)
                .map(|doc| doc.generated_source)
                .ok_or_else(|| BackendError::NotFound(id.clone()))?,
            RunTarget::Inline(source) => source.clone(),
        };
        self.lock().runs.push(target);
        Ok(RunOutcome {
            ok: true,
            error: None,
            logs: vec![format!("loaded {} lines", source.lines().count())],
            duration_ms: 0,
        })
    }
}
