use crate::connection::WorkflowConnection;
use crate::event::GraphEvent;
use crate::graph::GraphModel;
use crate::node::WorkflowNode;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const WORKFLOW_FILE: &str = "workflow.json";
const EVENTS_FILE: &str = "events.jsonl";

/// Serialized workflow shape, shared with hosts and external executors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub connections: Vec<WorkflowConnection>,
}

impl Workflow {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse workflow JSON")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize workflow")
    }

    /// Write to a standalone JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create workflow file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("Failed to write workflow to: {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush workflow file: {}", path.display()))?;
        Ok(())
    }

    /// Read from a standalone JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open workflow file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse workflow from: {}", path.display()))
    }

    /// Build a graph, enforcing every graph invariant
    pub fn into_graph(self) -> Result<GraphModel> {
        GraphModel::from_workflow(self).context("Workflow violates graph invariants")
    }
}

/// Load a graph from either a workflow directory or a standalone JSON file
pub fn load_graph(path: &Path) -> Result<GraphModel> {
    if path.is_dir() {
        WorkflowStore::open(path)?.load()
    } else {
        Workflow::load(path)?.into_graph()
    }
}

/// On-disk workflow directory: `workflow.json` plus an append-only
/// `events.jsonl` history
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    root_dir: PathBuf,
}

impl WorkflowStore {
    /// Create a store with an empty workflow and empty history
    pub fn create(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create workflow directory: {}", path.display()))?;

        let store = Self {
            root_dir: path.to_path_buf(),
        };
        store.save_workflow(&Workflow::default())?;

        File::create(store.events_path()).with_context(|| {
            format!("Failed to create {}: {}", EVENTS_FILE, store.events_path().display())
        })?;

        Ok(store)
    }

    /// Open an existing store
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("Workflow directory does not exist: {}", path.display()));
        }
        if !path.join(WORKFLOW_FILE).exists() {
            return Err(anyhow!("{} not found in {}", WORKFLOW_FILE, path.display()));
        }

        Ok(Self {
            root_dir: path.to_path_buf(),
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn workflow_path(&self) -> PathBuf {
        self.root_dir.join(WORKFLOW_FILE)
    }

    pub fn events_path(&self) -> PathBuf {
        self.root_dir.join(EVENTS_FILE)
    }

    pub fn save_workflow(&self, workflow: &Workflow) -> Result<()> {
        workflow.save(&self.workflow_path())
    }

    pub fn load_workflow(&self) -> Result<Workflow> {
        Workflow::load(&self.workflow_path())
    }

    /// Write the graph snapshot and flush its pending events to the history
    pub fn save(&self, graph: &mut GraphModel) -> Result<()> {
        self.save_workflow(&graph.to_workflow())?;
        self.append_events(graph.events())?;
        graph.clear_events();

        info!(
            path = %self.root_dir.display(),
            nodes = graph.node_count(),
            connections = graph.connection_count(),
            "workflow saved"
        );
        Ok(())
    }

    /// Load the graph; statuses come back idle
    pub fn load(&self) -> Result<GraphModel> {
        let graph = self.load_workflow()?.into_graph()?;
        info!(
            path = %self.root_dir.display(),
            nodes = graph.node_count(),
            connections = graph.connection_count(),
            "workflow loaded"
        );
        Ok(graph)
    }

    /// Append events to events.jsonl
    pub fn append_events(&self, events: &[GraphEvent]) -> Result<()> {
        let events_path = self.events_path();

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_path)
            .with_context(|| format!("Failed to open {}: {}", EVENTS_FILE, events_path.display()))?;

        let mut writer = BufWriter::new(file);

        for event in events {
            let json = serde_json::to_string(event).context("Failed to serialize event")?;
            writeln!(writer, "{}", json).with_context(|| {
                format!("Failed to write event to: {}", events_path.display())
            })?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to flush {}: {}", EVENTS_FILE, events_path.display()))?;

        Ok(())
    }

    /// Load all events from events.jsonl
    pub fn load_events(&self) -> Result<Vec<GraphEvent>> {
        let events_path = self.events_path();

        if !events_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&events_path)
            .with_context(|| format!("Failed to open {}: {}", EVENTS_FILE, events_path.display()))?;
        let reader = BufReader::new(file);

        let mut events = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| {
                format!(
                    "Failed to read line {} from: {}",
                    line_num + 1,
                    events_path.display()
                )
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let event: GraphEvent = serde_json::from_str(&line).with_context(|| {
                format!(
                    "Failed to parse event on line {} from: {}",
                    line_num + 1,
                    events_path.display()
                )
            })?;

            events.push(event);
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::geometry::Point;
    use crate::node::{NodeKind, NodeStatus, INPUT_PORT_ID, OUTPUT_PORT_ID};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tempfile::TempDir;

    fn pipeline() -> GraphModel {
        let mut graph = GraphModel::new();
        graph
            .add_node(WorkflowNode::with_id("s", NodeKind::Start, "Start", Point::new(0.0, 0.0)))
            .unwrap();
        graph
            .add_node(WorkflowNode::with_id("a", NodeKind::Agent, "Translate", Point::new(250.0, 0.0)))
            .unwrap();
        graph.connect("s", OUTPUT_PORT_ID, "a", INPUT_PORT_ID).unwrap();
        graph
    }

    #[test]
    fn test_store_create() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::create(&temp_dir.path().join("wf")).unwrap();

        assert!(store.workflow_path().exists());
        assert!(store.events_path().exists());
        assert_eq!(store.load().unwrap().node_count(), 0);
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(WorkflowStore::open(&temp_dir.path().join("missing")).is_err());
        assert!(WorkflowStore::open(temp_dir.path()).is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::create(&temp_dir.path().join("wf")).unwrap();
        let mut graph = pipeline();
        graph.set_status("s", NodeStatus::Completed).unwrap();

        store.save(&mut graph).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.connection_count(), 1);
        assert_eq!(loaded.node("a").unwrap().name, "Translate");
        assert_eq!(loaded.node("s").unwrap().status, NodeStatus::Idle);
        assert_eq!(loaded.connections(), graph.connections());
    }

    #[test]
    fn test_save_flushes_events() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::create(&temp_dir.path().join("wf")).unwrap();
        let mut graph = pipeline();

        store.save(&mut graph).unwrap();
        assert!(graph.events().is_empty());

        let connection_id = graph.connections()[0].id.clone();
        graph.disconnect(&connection_id);
        store.save(&mut graph).unwrap();

        let events = store.load_events().unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[3].event, EventType::Disconnected { .. }));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = pipeline().to_workflow().to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        let connection = &value["connections"][0];
        assert_eq!(connection["fromNodeId"], "s");
        assert_eq!(connection["toPortId"], INPUT_PORT_ID);
        assert_eq!(value["nodes"][1]["outputs"][0]["dataType"], "string");
        assert_eq!(value["nodes"][1]["config"]["type"], "agent");
    }

    #[test]
    fn test_load_rejects_invalid_connection() {
        let mut workflow = pipeline().to_workflow();
        workflow.connections.push(WorkflowConnection::new("a", OUTPUT_PORT_ID, "ghost", INPUT_PORT_ID));

        assert!(workflow.into_graph().is_err());
    }

    #[test]
    fn test_load_graph_accepts_file_or_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("pipeline.json");
        pipeline().to_workflow().save(&file).unwrap();

        let dir = temp_dir.path().join("wf");
        let store = WorkflowStore::create(&dir).unwrap();
        store.save(&mut pipeline()).unwrap();

        assert_eq!(load_graph(&file).unwrap().node_count(), 2);
        assert_eq!(load_graph(&dir).unwrap().node_count(), 2);
    }

    #[test]
    fn test_corrupted_workflow() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::create(&temp_dir.path().join("wf")).unwrap();

        fs::write(store.workflow_path(), "{ invalid json }").unwrap();

        assert!(store.load().is_err());
    }
}
