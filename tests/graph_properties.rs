// Property tests for graph and viewport invariants

mod fixtures;

use fixtures::sample_workflows::{add, create_delay_chain};
use proptest::prelude::*;
use workflow_graph_editor::node::{INPUT_PORT_ID, OUTPUT_PORT_ID};
use workflow_graph_editor::viewport::{MAX_ZOOM, MIN_ZOOM};
use workflow_graph_editor::{GraphModel, NodeKind, Point, Size, ViewportTransform};

const NODE_COUNT: usize = 6;

#[derive(Debug, Clone)]
enum Edit {
    Connect(usize, usize),
    /// Index into the current connection list, wrapped
    Disconnect(usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (0..NODE_COUNT, 0..NODE_COUNT).prop_map(|(from, to)| Edit::Connect(from, to)),
        1 => (0usize..16).prop_map(Edit::Disconnect),
    ]
}

fn fan_in_at_most_one(graph: &GraphModel) -> bool {
    (0..NODE_COUNT).all(|i| graph.incoming(&format!("n{i}")).len() <= 1)
}

/// Six delay nodes with no connections
fn delay_nodes() -> GraphModel {
    let mut graph = GraphModel::new();
    for i in 0..NODE_COUNT {
        add(&mut graph, &format!("n{i}"), NodeKind::Delay, i as f32 * 250.0, 0.0);
    }
    graph
}

/// Whether any node can reach itself along connections
fn has_cycle(graph: &GraphModel) -> bool {
    (0..NODE_COUNT).any(|i| {
        let id = format!("n{i}");
        graph
            .outgoing(&id)
            .iter()
            .any(|c| c.to_node_id == id || graph.reaches(&c.to_node_id, &id))
    })
}

proptest! {
    #[test]
    fn random_connects_never_form_cycles_or_fan_in(
        edges in prop::collection::vec((0..NODE_COUNT, 0..NODE_COUNT), 0..30)
    ) {
        let mut graph = delay_nodes();
        for (from, to) in edges {
            let _ = graph.connect(&format!("n{from}"), OUTPUT_PORT_ID, &format!("n{to}"), INPUT_PORT_ID);
        }

        prop_assert!(!has_cycle(&graph));
        prop_assert!(fan_in_at_most_one(&graph));
    }

    #[test]
    fn connect_disconnect_sequences_keep_invariants(
        edits in prop::collection::vec(edit(), 0..60)
    ) {
        let mut graph = delay_nodes();
        for edit in edits {
            match edit {
                Edit::Connect(from, to) => {
                    let _ = graph.connect(&format!("n{from}"), OUTPUT_PORT_ID, &format!("n{to}"), INPUT_PORT_ID);
                }
                Edit::Disconnect(index) => {
                    let count = graph.connection_count();
                    if count > 0 {
                        let id = graph.connections()[index % count].id.clone();
                        prop_assert!(graph.disconnect(&id).is_some());
                        prop_assert!(graph.disconnect(&id).is_none());
                    }
                }
            }

            prop_assert!(!has_cycle(&graph));
            prop_assert!(fan_in_at_most_one(&graph));
        }
    }

    #[test]
    fn removing_a_node_drops_every_touching_connection(
        len in 2usize..8,
        victim in 0usize..8,
    ) {
        let mut graph = create_delay_chain(len);
        let id = format!("n{}", victim % len);

        prop_assert!(graph.remove_node(&id).is_some());
        prop_assert!(graph.remove_node(&id).is_none());
        prop_assert!(graph
            .connections()
            .iter()
            .all(|c| c.from_node_id != id && c.to_node_id != id));
        prop_assert_eq!(graph.node_count(), len - 1);
    }

    #[test]
    fn screen_world_round_trip(
        zoom in 0.1f32..3.0,
        pan_x in -5000.0f32..5000.0,
        pan_y in -5000.0f32..5000.0,
        x in -2000.0f32..2000.0,
        y in -2000.0f32..2000.0,
    ) {
        let mut viewport = ViewportTransform::new(Size::new(1280.0, 800.0));
        viewport.set_zoom(zoom);
        viewport.set_pan(workflow_graph_editor::Vector::new(pan_x, pan_y));

        let screen = Point::new(x, y);
        let back = viewport.world_to_screen(viewport.screen_to_world(screen));
        prop_assert!((back.x - screen.x).abs() < 0.05);
        prop_assert!((back.y - screen.y).abs() < 0.05);
    }

    #[test]
    fn zoom_stays_clamped(factors in prop::collection::vec(0.01f32..50.0, 1..20)) {
        let mut viewport = ViewportTransform::new(Size::new(800.0, 600.0));
        for factor in factors {
            viewport.zoom_by(factor, Some(Point::new(120.0, 80.0)));
            prop_assert!(viewport.zoom() >= MIN_ZOOM && viewport.zoom() <= MAX_ZOOM);
        }
    }
}
