use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;
use std::path::PathBuf;
use workflow_graph_editor::{
    demo,
    logging::{self, LogFormat},
    EditorConfig, GraphModel, LocalHost, Workflow, WorkflowEditorApp, WorkflowStore,
};

/// Visual editor for workflow graphs
#[derive(Parser, Debug)]
#[command(name = "workflow_editor_gui", version, about)]
struct Args {
    /// Workflow directory or JSON file; a missing directory is created on first save
    path: Option<PathBuf>,

    /// Configuration file (defaults to workflow_editor.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EditorConfig::load_from(path),
        None => EditorConfig::load(),
    }
    .context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    logging::init_from_config(&config, LogFormat::Pretty)?;

    let (graph, host) = open_workflow(args.path, &config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Workflow Graph Editor"),
        ..Default::default()
    };

    eframe::run_native(
        "Workflow Graph Editor",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(WorkflowEditorApp::with_graph(
                graph,
                &config,
                Box::new(host),
            )))
        }),
    )
    .map_err(|e| anyhow!("Editor window failed: {}", e))
}

/// Pick the graph to edit and where saves go
fn open_workflow(path: Option<PathBuf>, config: &EditorConfig) -> Result<(GraphModel, LocalHost)> {
    let mode = config.simulation_mode();

    let Some(path) = path else {
        return Ok((demo::sample_pipeline()?, LocalHost::detached(mode)));
    };

    if path.is_file() {
        let graph = Workflow::load(&path)?.into_graph()?;
        return Ok((graph, LocalHost::with_file(path, mode)));
    }

    if path.extension().is_some_and(|ext| ext == "json") {
        return Ok((GraphModel::new(), LocalHost::with_file(path, mode)));
    }

    let store = if path.join("workflow.json").exists() {
        WorkflowStore::open(&path)?
    } else {
        WorkflowStore::create(&path)?
    };
    let graph = store.load()?;
    Ok((graph, LocalHost::with_store(store, mode)))
}
