//! # Editor session
//!
//! One [`EditorSession`] owns the workspace of one open editor. Edits are
//! applied synchronously; the preview source is regenerated in the background
//! once edits have been quiet for the configured debounce window.
//!
//! Every edit bumps a generation counter and aborts the pending regeneration
//! before scheduling a new one, so at most one pass is pending and a result
//! computed for an older generation is never published.

use crate::backend::{AutomationBackend, AutomationDocument, DeviceCatalog, RunOutcome, RunTarget};
use crate::codegen::{self, CodegenOptions};
use crate::error::{GrammarError, GraphError, SessionError};
use crate::grammar::{PaletteEntry, Registry};
use crate::graph::{BlockId, Workspace};
use crate::options::OptionProvider;
use crate::serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

mod config;

pub use config::SessionConfig;

/// The generated source as last published, tagged with the edit generation it reflects.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub generation: u64,
    /// The script, or the message of the error that stopped generation.
    pub source: Result<String, String>,
}

/// Descriptive fields stored alongside the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMeta {
    /// Backend id, once the automation has been saved or was opened from storage.
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub enabled: bool,
}

impl Default for SessionMeta {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            enabled: true,
        }
    }
}

struct Shared {
    workspace: Mutex<Workspace>,
    registry: Arc<Registry>,
    codegen: CodegenOptions,
    generation: AtomicU64,
    recompiles: AtomicU64,
    preview: watch::Sender<Preview>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Workspace> {
        self.workspace
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn generate(&self) -> Result<String, GrammarError> {
        let workspace = self.lock();
        codegen::generate_with(&self.registry, &workspace, &self.codegen)
    }

    fn recompile(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "regeneration superseded before start");
            return;
        }
        let source = self.generate().map_err(|e| e.to_string());
        self.recompiles.fetch_add(1, Ordering::SeqCst);
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "regeneration superseded, result discarded");
            return;
        }
        if let Err(e) = &source {
            tracing::warn!(generation, error = %e, "preview generation failed");
        }
        self.preview.send_if_modified(|current| {
            if generation > current.generation {
                *current = Preview { generation, source };
                true
            } else {
                false
            }
        });
    }
}

pub struct EditorSession {
    backend: Arc<dyn AutomationBackend>,
    options: OptionProvider,
    config: SessionConfig,
    meta: SessionMeta,
    shared: Arc<Shared>,
    pending: Option<JoinHandle<()>>,
    runtime: Handle,
}

impl EditorSession {
    /// Opens an editor, either empty or on the stored automation `existing`.
    ///
    /// Must be called from within a tokio runtime; debounced regeneration
    /// runs on that runtime.
    pub async fn open(
        registry: Arc<Registry>,
        backend: Arc<dyn AutomationBackend>,
        catalog: &dyn DeviceCatalog,
        existing: Option<&str>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let options = OptionProvider::load(catalog).await;

        let (workspace, meta) = match existing {
            Some(id) => {
                let document = backend.load_automation(id).await?;
                let workspace = serialize::from_text(&registry, &document.serialized_graph)?;
                let meta = SessionMeta {
                    id: Some(id.to_string()),
                    name: document.name,
                    description: document.description,
                    enabled: document.enabled,
                };
                (workspace, meta)
            }
            None => (Workspace::new(), SessionMeta::default()),
        };

        let source = codegen::generate_with(&registry, &workspace, &config.codegen)
            .map_err(|e| e.to_string());
        let (preview, _) = watch::channel(Preview {
            generation: 0,
            source,
        });

        tracing::info!(
            automation_id = ?meta.id,
            roots = workspace.roots().len(),
            "editor session opened"
        );

        Ok(Self {
            backend,
            options,
            meta,
            shared: Arc::new(Shared {
                workspace: Mutex::new(workspace),
                registry,
                codegen: config.codegen.clone(),
                generation: AtomicU64::new(0),
                recompiles: AtomicU64::new(0),
                preview,
            }),
            config,
            pending: None,
            runtime: Handle::current(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub fn options(&self) -> &OptionProvider {
        &self.options
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.meta.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.meta.description = description.into();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.meta.enabled = enabled;
    }

    /// Applies one structural or field edit. Successful edits schedule a
    /// regeneration; a rejected edit changes nothing.
    pub fn edit<T>(
        &mut self,
        f: impl FnOnce(&mut Workspace, &Registry) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        let result = {
            let mut workspace = self.shared.lock();
            f(&mut *workspace, self.shared.registry.as_ref())
        };
        if result.is_ok() {
            self.on_mutate();
        }
        result
    }

    /// Drops a palette entry on the canvas, resolving its dynamic dropdowns.
    pub fn instantiate(&mut self, entry: &PaletteEntry) -> Result<BlockId, GraphError> {
        let result = {
            let mut render = self.options.render_pass();
            let mut workspace = self.shared.lock();
            workspace.instantiate(&self.shared.registry, entry, Some(&mut render))
        };
        if result.is_ok() {
            self.on_mutate();
        }
        result
    }

    /// Replaces the whole canvas with a serialized graph.
    pub fn load_text(&mut self, text: &str) -> Result<(), SessionError> {
        let workspace = serialize::from_text(&self.shared.registry, text)?;
        *self.shared.lock() = workspace;
        self.on_mutate();
        Ok(())
    }

    /// Records a change and restarts the debounce window.
    pub fn on_mutate(&mut self) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        let shared = Arc::clone(&self.shared);
        let debounce = self.config.debounce;
        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            shared.recompile(generation);
        }));
    }

    /// Regenerates the preview now instead of waiting for the debounce window.
    pub fn flush(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.shared.recompile(generation);
    }

    /// Generates the script from the current graph.
    pub fn current_source(&self) -> Result<String, GrammarError> {
        self.shared.generate()
    }

    pub fn preview(&self) -> Preview {
        self.shared.preview.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Preview> {
        self.shared.preview.subscribe()
    }

    /// Number of background regenerations that ran to completion.
    pub fn recompile_count(&self) -> u64 {
        self.shared.recompiles.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Workspace {
        self.shared.lock().clone()
    }

    pub fn to_text(&self) -> Result<String, SessionError> {
        Ok(serialize::to_text(&self.shared.lock())?)
    }

    /// Persists the graph and its generated source. The first save assigns the id.
    pub async fn save(&mut self) -> Result<String, SessionError> {
        let name = self.meta.name.trim().to_string();
        if name.is_empty() {
            return Err(SessionError::MissingName);
        }
        let (serialized_graph, generated_source) = {
            let workspace = self.shared.lock();
            let graph = serialize::to_text(&workspace)?;
            let source =
                codegen::generate_with(&self.shared.registry, &workspace, &self.shared.codegen)?;
            (graph, source)
        };
        let document = AutomationDocument {
            name,
            description: self.meta.description.clone(),
            generated_source,
            serialized_graph,
            enabled: self.meta.enabled,
        };

        let id = self
            .backend
            .save_automation(self.meta.id.as_deref(), &document)
            .await?;
        tracing::info!(automation_id = %id, name = %document.name, "automation saved");
        self.meta.id = Some(id.clone());
        Ok(id)
    }

    /// Runs the current script once through the backend without saving it.
    pub async fn run(&self) -> Result<RunOutcome, SessionError> {
        let source = self.current_source()?;
        if source.trim().is_empty() {
            return Err(SessionError::EmptyScript);
        }
        let outcome = self.backend.run_automation(RunTarget::Inline(source)).await?;
        tracing::info!(
            ok = outcome.ok,
            duration_ms = outcome.duration_ms,
            "inline run finished"
        );
        Ok(outcome)
    }

    /// Discards the session. Nothing is persisted unless [`EditorSession::save`] was called.
    pub fn close(self) {
        tracing::debug!(automation_id = ?self.meta.id, "editor session closed");
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}
