// End-to-end editor flows driven through the public API

mod fixtures;

use fixtures::sample_workflows::{create_linear_workflow, create_unconnected_pair};
use pretty_assertions::assert_eq;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use workflow_graph_editor::render::{self, DrawCommand, Layer, RenderStyle, Scene};
use workflow_graph_editor::{
    EditorMessage, ExecutionSimulator, GraphModel, InteractionController, InteractionOutcome,
    MessageChannel, NodeKind, NodeStatus, Point, SimulationMode, ToolMode, ValidatedGraph,
    ViewportTransform, WorkflowStore,
};

fn draw(graph: &GraphModel, viewport: &ViewportTransform, controller: &InteractionController) -> render::DrawList {
    let style = RenderStyle {
        show_grid: false,
        ..RenderStyle::default()
    };
    render::render(&Scene {
        graph,
        viewport,
        selection: controller.selection(),
        draft: controller.draft(),
        style: &style,
    })
}

#[test]
fn drag_from_output_to_input_creates_connection() {
    let mut graph = create_unconnected_pair();
    let mut viewport = ViewportTransform::default();
    let mut controller = InteractionController::default();

    // Output port of `a` sits on its right edge, input of `b` on its left edge
    let down = controller.pointer_down(&graph, &viewport, Point::new(180.0, 36.0));
    assert_eq!(down, InteractionOutcome::DraftChanged);

    controller.pointer_move(&mut graph, &mut viewport, Point::new(300.0, 40.0));
    let drafts = draw(&graph, &viewport, &controller);
    assert_eq!(drafts.layer(Layer::Draft).count(), 2);

    let up = controller.pointer_up(&mut graph, &viewport, Point::new(401.0, 37.0));
    assert!(matches!(up, InteractionOutcome::Connected(_)));
    assert_eq!(graph.connection_count(), 1);
    assert!(controller.draft().is_none());

    let after = draw(&graph, &viewport, &controller);
    assert_eq!(after.layer(Layer::Draft).count(), 0);
    assert!(after
        .layer(Layer::Connections)
        .any(|command| matches!(command, DrawCommand::CubicBezier { .. })));
}

#[test]
fn releasing_on_empty_canvas_discards_draft() {
    let mut graph = create_unconnected_pair();
    let mut viewport = ViewportTransform::default();
    let mut controller = InteractionController::default();

    controller.pointer_down(&graph, &viewport, Point::new(180.0, 36.0));
    controller.pointer_move(&mut graph, &mut viewport, Point::new(250.0, 300.0));
    let up = controller.pointer_up(&mut graph, &viewport, Point::new(250.0, 300.0));

    assert_eq!(up, InteractionOutcome::DraftDiscarded(None));
    assert_eq!(graph.connection_count(), 0);
    assert!(controller.is_idle());
}

#[test]
fn dragging_a_node_moves_its_connections() {
    let mut graph = create_linear_workflow();
    let mut viewport = ViewportTransform::default();
    let mut controller = InteractionController::default();

    let before = draw(&graph, &viewport, &controller);
    let curves = |list: &render::DrawList| -> Vec<[Point; 4]> {
        list.layer(Layer::Connections)
            .filter_map(|command| match command {
                DrawCommand::CubicBezier { points, .. } => Some(*points),
                _ => None,
            })
            .collect()
    };

    // Grab the middle of `work` and move it down by 100
    controller.pointer_down(&graph, &viewport, Point::new(390.0, 30.0));
    controller.pointer_move(&mut graph, &mut viewport, Point::new(390.0, 130.0));
    controller.pointer_up(&mut graph, &viewport, Point::new(390.0, 130.0));

    assert_eq!(graph.node("work").unwrap().position, Point::new(300.0, 100.0));

    let after = draw(&graph, &viewport, &controller);
    let (old, new) = (curves(&before), curves(&after));
    assert_eq!(old.len(), 2);
    assert_eq!(new.len(), 2);
    assert_eq!(new[0][3].y, old[0][3].y + 100.0);
    assert_eq!(new[1][0].y, old[1][0].y + 100.0);
}

#[test]
fn palette_drop_through_channel_lands_under_pointer() {
    let mut graph = GraphModel::new();
    let mut viewport = ViewportTransform::default();
    viewport.zoom_by(2.0, Some(Point::new(0.0, 0.0)));
    let mut controller = InteractionController::default();
    let channel = MessageChannel::new();

    let screen = Point::new(400.0, 200.0);
    let world = viewport.screen_to_world(screen);
    assert_eq!(world, Point::new(200.0, 100.0));

    assert!(channel.sender().send(EditorMessage::PaletteDrop {
        node_kind: NodeKind::Agent,
        world_position: world,
    }));

    let mut added = None;
    for message in channel.drain() {
        if let InteractionOutcome::NodeAdded(id) = controller.handle_message(&mut graph, &message) {
            added = Some(id);
        }
    }

    let id = added.expect("node added");
    let node = graph.node(&id).unwrap();
    assert_eq!(node.kind, NodeKind::Agent);
    assert_eq!(node.bounds().center(), world);
    assert!(controller.selection().contains(&id));
}

#[test]
fn deleting_selection_cascades_connections() {
    let mut graph = create_linear_workflow();
    let viewport = ViewportTransform::default();
    let mut controller = InteractionController::default();

    controller.pointer_down(&graph, &viewport, Point::new(390.0, 30.0));
    controller.pointer_up(&mut graph, &viewport, Point::new(390.0, 30.0));
    assert!(controller.selection().contains("work"));

    let outcome = controller.delete_selection(&mut graph);

    assert_eq!(outcome, InteractionOutcome::NodesDeleted(vec!["work".to_string()]));
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.connection_count(), 0);
    assert!(controller.selection().is_empty());
}

#[test]
fn pan_mode_moves_the_view_not_the_nodes() {
    let mut graph = create_linear_workflow();
    let mut viewport = ViewportTransform::default();
    let mut controller = InteractionController::default();
    controller.set_mode(ToolMode::Pan);

    controller.pointer_down(&graph, &viewport, Point::new(390.0, 30.0));
    let outcome = controller.pointer_move(&mut graph, &mut viewport, Point::new(440.0, 10.0));
    controller.pointer_up(&mut graph, &viewport, Point::new(440.0, 10.0));

    assert_eq!(outcome, InteractionOutcome::ViewChanged);
    assert_eq!(graph.node("work").unwrap().position, Point::new(300.0, 0.0));
    assert_eq!(viewport.world_to_screen(Point::new(0.0, 0.0)), Point::new(50.0, -20.0));
}

#[test]
fn saved_workflow_reloads_with_history() {
    let temp_dir = TempDir::new().unwrap();
    let store = WorkflowStore::create(&temp_dir.path().join("pipeline")).unwrap();

    let mut graph = create_linear_workflow();
    let viewport = ViewportTransform::default();
    let mut controller = InteractionController::default();
    controller.palette_drop(&mut graph, NodeKind::Webhook, Point::new(300.0, 300.0));
    assert_eq!(graph.events().len(), 1);

    store.save(&mut graph).unwrap();
    assert!(graph.events().is_empty());

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.to_workflow(), graph.to_workflow());
    assert_eq!(store.load_events().unwrap().len(), 1);

    // A node's hit area survives the round trip
    let id = graph.nodes_back_to_front().last().unwrap().id.clone();
    let mut reloaded_controller = InteractionController::default();
    reloaded_controller.pointer_down(&reloaded, &viewport, Point::new(300.0, 300.0));
    assert!(reloaded_controller.selection().contains(&id));
}

#[test]
fn external_statuses_from_another_thread_drive_the_run() {
    let mut graph = create_linear_workflow();
    let mut simulator = ExecutionSimulator::new(SimulationMode::External);
    let channel = MessageChannel::new();

    simulator.start(&mut graph);
    assert_eq!(graph.node("start").unwrap().status, NodeStatus::Running);

    let sender = channel.sender();
    let executor = thread::spawn(move || {
        for id in ["start", "work", "end"] {
            sender.status_update(id, NodeStatus::Completed);
        }
    });
    executor.join().unwrap();

    for message in channel.drain() {
        simulator.handle_message(&mut graph, &message);
    }

    assert!(simulator.is_finished());
    for id in ["start", "work", "end"] {
        assert_eq!(graph.node(id).unwrap().status, NodeStatus::Completed, "{id}");
    }
}

#[test]
fn timed_run_walks_linear_workflow_in_order() {
    let mut graph = create_linear_workflow();
    let mut simulator = ExecutionSimulator::new(SimulationMode::Timed(Duration::from_millis(100)));

    simulator.start(&mut graph);
    for _ in 0..100 {
        if !simulator.is_running() {
            break;
        }
        simulator.tick(&mut graph, Duration::from_millis(50));
    }

    assert!(simulator.is_finished());
    let started: Vec<&str> = simulator
        .history()
        .iter()
        .filter(|change| change.to == NodeStatus::Running)
        .map(|change| change.node_id.as_str())
        .collect();
    assert_eq!(started, vec!["start", "work", "end"]);
}

#[test]
fn validation_flags_disconnected_nodes() {
    let graph = create_unconnected_pair();
    let result = graph.validate();

    assert!(result.is_valid());
    assert!(result.has_warnings());
    let flagged = graph.nodes_with_issues(&result);
    assert!(flagged.contains_key("b"));
}
