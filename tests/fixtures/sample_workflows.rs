// Helper functions to build test workflows with various shapes

use workflow_graph_editor::node::{INPUT_PORT_ID, OUTPUT_PORT_ID};
use workflow_graph_editor::{GraphModel, NodeKind, Point, WorkflowNode};

/// Add a node with a fixed id at `(x, y)`
pub fn add(graph: &mut GraphModel, id: &str, kind: NodeKind, x: f32, y: f32) {
    graph
        .add_node(WorkflowNode::with_id(id, kind, id, Point::new(x, y)))
        .unwrap();
}

/// Connect the default output of `from` to the default input of `to`
pub fn link(graph: &mut GraphModel, from: &str, to: &str) -> String {
    graph
        .connect(from, OUTPUT_PORT_ID, to, INPUT_PORT_ID)
        .unwrap()
}

/// start -> work -> end, laid out left to right
pub fn create_linear_workflow() -> GraphModel {
    let mut graph = GraphModel::new();
    add(&mut graph, "start", NodeKind::Start, 0.0, 0.0);
    add(&mut graph, "work", NodeKind::Delay, 300.0, 0.0);
    add(&mut graph, "end", NodeKind::End, 600.0, 0.0);
    link(&mut graph, "start", "work");
    link(&mut graph, "work", "end");
    graph.clear_events();
    graph
}

/// Two disconnected nodes side by side; `a` has an output, `b` an input
pub fn create_unconnected_pair() -> GraphModel {
    let mut graph = GraphModel::new();
    add(&mut graph, "a", NodeKind::Start, 0.0, 0.0);
    add(&mut graph, "b", NodeKind::End, 400.0, 0.0);
    graph.clear_events();
    graph
}

/// A chain of `len` delay nodes, each feeding the next
pub fn create_delay_chain(len: usize) -> GraphModel {
    let mut graph = GraphModel::new();
    for i in 0..len {
        add(&mut graph, &format!("n{i}"), NodeKind::Delay, i as f32 * 250.0, 0.0);
    }
    for i in 1..len {
        link(&mut graph, &format!("n{}", i - 1), &format!("n{i}"));
    }
    graph.clear_events();
    graph
}
