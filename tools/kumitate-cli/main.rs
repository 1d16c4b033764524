use clap::{Parser, Subcommand};
use kumitate::backend::{AutomationDocument, DeviceSummary, MemoryBackend, MemoryCatalog};
use kumitate::prelude::*;
use kumitate::{codegen, serialize};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Compile, inspect and dry-run block workspaces
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log grammar and generator decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the Lua script of a serialized workspace
    Compile {
        /// Path to a saved automation document, or to a bare workspace JSON
        path: String,
        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
        /// One indentation level of the generated code
        #[arg(long, default_value = "  ")]
        indent: String,
        /// Validate instead of printing; fails when a document's stored script is stale
        #[arg(long)]
        check: bool,
    },
    /// List the palette categories and the block kinds they offer
    Palette,
    /// Open the workspace in an editor session and run it against an in-memory runtime
    Run {
        path: String,
        /// Automation name used when the input is a bare workspace
        #[arg(short, long, default_value = "cli")]
        name: String,
        /// Device addresses to offer in device dropdowns
        #[arg(short, long)]
        device: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to initialize logging: {}", e)));

    match cli.command {
        Command::Compile {
            path,
            output,
            indent,
            check,
        } => run_compile(&path, output.as_deref(), indent, check),
        Command::Palette => run_palette(),
        Command::Run { path, name, device } => run_session(&path, name, device),
    }
}

/// The graph text and, for a persisted document, its stored script.
fn load_input(path: &str) -> (String, Option<AutomationDocument>) {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read file '{}': {}", path, e))
    });
    match serde_json::from_str::<AutomationDocument>(&text) {
        Ok(document) => (document.serialized_graph.clone(), Some(document)),
        Err(_) => (text, None),
    }
}

fn run_compile(path: &str, output: Option<&str>, indent: String, check: bool) {
    let total_start = Instant::now();
    let registry = Registry::standard();

    let load_start = Instant::now();
    let (graph, document) = load_input(path);
    let workspace = serialize::from_text(&registry, &graph)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load workspace: {}", e)));
    let load_duration = load_start.elapsed();

    let options = CodegenOptions { indent };
    let generate_start = Instant::now();
    let source = codegen::generate_with(&registry, &workspace, &options)
        .unwrap_or_else(|e| exit_with_error(&format!("Code generation failed: {}", e)));
    let generate_duration = generate_start.elapsed();

    if check {
        if let Some(document) = &document {
            if document.generated_source != source {
                exit_with_error(&format!(
                    "Stored script of '{}' is stale; regenerate and save it again",
                    document.name
                ));
            }
        }
        println!("Workspace OK: {}", path);
        println!("  Roots:            {}", workspace.roots().len());
        println!("  Blocks:           {}", workspace.block_count());
        println!("  Generated lines:  {}", source.lines().count());
        println!("\n--- Performance Summary ---");
        println!("Load + Validate:  {:?}", load_duration);
        println!("Generation:       {:?}", generate_duration);
        println!("Total:            {:?}", total_start.elapsed());
        return;
    }

    match output {
        Some(out) => {
            fs::write(out, &source).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to write script to '{}': {}", out, e))
            });
            eprintln!("Wrote {} lines to {}", source.lines().count(), out);
        }
        None => print!("{}", source),
    }
}

fn run_palette() {
    let registry = Registry::standard();
    for category in registry.palette() {
        println!("{} ({})", category.category.label_key(), category.category.colour());
        for entry in &category.entries {
            let role = match registry.lookup(&entry.kind).map(|ty| ty.role()) {
                Some(Role::Value(tag)) => format!("value: {}", tag),
                Some(Role::Statement { .. }) => "statement".to_string(),
                None => "unregistered".to_string(),
            };
            println!("  {:<28} {}", entry.kind, role);
        }
    }
    println!("\n{} block kinds registered", registry.len());
}

fn run_session(path: &str, name: String, devices: Vec<String>) {
    let (graph, document) = load_input(path);
    let name = document.map(|d| d.name).unwrap_or(name);
    let runtime = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to start runtime: {}", e)));

    runtime.block_on(async move {
        let registry = Arc::new(Registry::standard());
        let backend = Arc::new(MemoryBackend::new());
        backend.insert(
            "cli",
            AutomationDocument {
                serialized_graph: graph,
                ..AutomationDocument::new(name.as_str())
            },
        );
        let catalog = MemoryCatalog::new(devices.into_iter().map(DeviceSummary::new).collect());

        let mut session = EditorSession::open(
            registry,
            backend.clone(),
            &catalog,
            Some("cli"),
            SessionConfig::default(),
        )
        .await
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to open workspace: {}", e)));

        let id = session
            .save()
            .await
            .unwrap_or_else(|e| exit_with_error(&format!("Save failed: {}", e)));
        println!("Saved automation '{}' as {}", session.meta().name, id);

        let outcome = session
            .run()
            .await
            .unwrap_or_else(|e| exit_with_error(&format!("Run failed: {}", e)));
        let status = if outcome.ok { "ok" } else { "failed" };
        println!("\nRun finished in {} ms: {}", outcome.duration_ms, status);
        if let Some(error) = outcome.error {
            println!("  -> Error: {}", error);
        }
        for line in outcome.logs {
            println!("  | {}", line);
        }
        session.close();
    });
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
