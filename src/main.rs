use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use workflow_graph_editor::{
    demo, load_graph,
    logging::{self, LogFormat},
    EditorConfig, ExecutionSimulator, GraphModel, SimulationMode, StatusChange, ValidatedGraph,
    ValidationSeverity, Workflow,
};

/// Headless tools for workflow graphs
#[derive(Parser, Debug)]
#[command(name = "workflow_editor", version, about)]
struct Cli {
    /// Configuration file (defaults to workflow_editor.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a workflow for structural problems
    Validate {
        /// Workflow directory or JSON file
        path: PathBuf,
    },
    /// Walk a workflow's statuses to completion and print each transition
    Simulate {
        /// Workflow directory or JSON file
        path: PathBuf,

        /// Time each node stays running
        #[arg(long, default_value_t = 500)]
        step_ms: u64,
    },
    /// Print or write the sample translation pipeline
    Demo {
        /// Where to write the workflow JSON; stdout when omitted
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EditorConfig::load_from(path),
        None => EditorConfig::load(),
    }
    .context("Failed to load configuration")?;
    if let Err(e) = config.validate() {
        bail!("Invalid configuration: {}", e);
    }
    logging::init_from_config(&config, LogFormat::Compact)?;

    match cli.command {
        Command::Validate { path } => validate(&path),
        Command::Simulate { path, step_ms } => simulate(&path, Duration::from_millis(step_ms)),
        Command::Demo { output } => write_demo(output),
    }
}

fn validate(path: &Path) -> Result<()> {
    let graph = load_graph(path)?;
    let result = graph.validate();

    println!(
        "{}: {} nodes, {} connections",
        path.display(),
        graph.node_count(),
        graph.connection_count()
    );

    for issue in &result.issues {
        let label = match issue.severity {
            ValidationSeverity::Error => "error",
            ValidationSeverity::Warning => "warning",
            ValidationSeverity::Info => "info",
        };
        println!("  {:<7} {}", label, issue.message);
    }

    if result.has_errors() {
        bail!("{} validation errors", result.errors().len());
    }
    println!("✓ Valid ({} warnings)", result.warnings().len());
    Ok(())
}

fn simulate(path: &Path, step: Duration) -> Result<()> {
    let mut graph = load_graph(path)?;
    if graph.start_nodes().is_empty() {
        bail!("Workflow has no start node");
    }

    let mut simulator = ExecutionSimulator::new(SimulationMode::Timed(step));
    let mut elapsed = Duration::ZERO;

    let changes = simulator.start(&mut graph);
    print_changes(elapsed, &changes, &graph);

    // Every node runs at most once, so the walk ends after a bounded number of steps
    let tick = step.min(Duration::from_millis(100)).max(Duration::from_millis(1));
    while simulator.is_running() {
        elapsed += tick;
        let changes = simulator.tick(&mut graph, tick);
        print_changes(elapsed, &changes, &graph);
    }

    println!("✓ Finished after {}ms", elapsed.as_millis());
    Ok(())
}

fn print_changes(at: Duration, changes: &[StatusChange], graph: &GraphModel) {
    for change in changes {
        let name = graph
            .node(&change.node_id)
            .map_or(change.node_id.as_str(), |n| n.name.as_str());
        println!(
            "{:>7}ms  {:<24} {:?} -> {:?}",
            at.as_millis(),
            name,
            change.from,
            change.to
        );
    }
}

fn write_demo(output: Option<PathBuf>) -> Result<()> {
    let workflow: Workflow = demo::sample_pipeline()?.to_workflow();

    match output {
        Some(path) => {
            workflow.save(&path)?;
            println!("✓ Wrote {}", path.display());
        }
        None => println!("{}", workflow.to_json()?),
    }
    Ok(())
}
