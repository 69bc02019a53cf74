//! Contract between the editor and the application embedding it.

use crate::event::GraphEvent;
use crate::message::MessageSender;
use crate::serialization::{Workflow, WorkflowStore};
use crate::simulator::SimulationMode;
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Callbacks the editor fires at its host
pub trait WorkflowHost {
    /// A snapshot the user asked to save. The editor only logs failures.
    fn on_save(&mut self, workflow: &Workflow) -> Result<()>;

    /// Graph history accumulated since the previous save
    fn on_history(&mut self, _events: &[GraphEvent]) -> Result<()> {
        Ok(())
    }

    /// Request a real run of `workflow`.
    ///
    /// The host may push `{nodeId, status}` updates through `sender` from any
    /// thread. The returned mode tells the editor whether to animate on its
    /// own clock or wait for those updates.
    fn on_test(&mut self, workflow: &Workflow, sender: MessageSender) -> Result<SimulationMode>;
}

/// Where [`LocalHost`] writes snapshots
#[derive(Debug)]
enum SaveTarget {
    Store(WorkflowStore),
    File(PathBuf),
}

/// Host for the standalone editor: saves to disk, simulates test runs locally
#[derive(Debug)]
pub struct LocalHost {
    target: Option<SaveTarget>,
    test_mode: SimulationMode,
}

impl LocalHost {
    /// A host that keeps nothing on save
    pub fn detached(test_mode: SimulationMode) -> Self {
        Self {
            target: None,
            test_mode,
        }
    }

    pub fn with_store(store: WorkflowStore, test_mode: SimulationMode) -> Self {
        Self {
            target: Some(SaveTarget::Store(store)),
            test_mode,
        }
    }

    /// Save to a standalone JSON file; history is not kept
    pub fn with_file(path: impl Into<PathBuf>, test_mode: SimulationMode) -> Self {
        Self {
            target: Some(SaveTarget::File(path.into())),
            test_mode,
        }
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }
}

impl WorkflowHost for LocalHost {
    fn on_save(&mut self, workflow: &Workflow) -> Result<()> {
        match &self.target {
            Some(SaveTarget::Store(store)) => store.save_workflow(workflow)?,
            Some(SaveTarget::File(path)) => workflow.save(path)?,
            None => {
                info!("no save location; snapshot discarded");
                return Ok(());
            }
        }
        info!(nodes = workflow.nodes.len(), "workflow snapshot saved");
        Ok(())
    }

    fn on_history(&mut self, events: &[GraphEvent]) -> Result<()> {
        match &self.target {
            Some(SaveTarget::Store(store)) => store.append_events(events),
            _ => Ok(()),
        }
    }

    fn on_test(&mut self, workflow: &Workflow, _sender: MessageSender) -> Result<SimulationMode> {
        info!(nodes = workflow.nodes.len(), "local test run simulated");
        Ok(self.test_mode)
    }
}
