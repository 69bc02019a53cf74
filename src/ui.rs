use crate::{
    config::EditorConfig,
    demo,
    geometry::{Point, Size},
    graph::GraphModel,
    host::{LocalHost, WorkflowHost},
    interaction::{InteractionController, InteractionOutcome, ToolMode},
    message::{EditorMessage, MessageChannel},
    node::{HttpMethod, NodeConfig, NodeId, NodeKind, NodePatch, Trigger},
    render::{self, DrawCommand, RedrawThrottle, RenderStyle, Scene},
    simulator::{ExecutionSimulator, SimulationMode},
    validation::{ValidatedGraph, ValidationSeverity},
    viewport::ViewportTransform,
};
use egui::{
    epaint::{CubicBezierShape, PathShape},
    pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke,
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Main application state
pub struct WorkflowEditorApp {
    /// The workflow being edited
    graph: GraphModel,

    /// Pan/zoom of the canvas
    viewport: ViewportTransform,

    /// Tool mode, selection and the active gesture
    controller: InteractionController,

    /// Status animation for test runs
    simulator: ExecutionSimulator,

    /// Where saves and test runs go
    host: Box<dyn WorkflowHost>,

    /// Inbound palette drops and host status updates
    channel: MessageChannel,

    style: RenderStyle,
    throttle: RedrawThrottle,

    /// Time of the previous simulator tick
    last_tick: Option<Instant>,

    /// Validation issues per node
    validation_issues: HashMap<NodeId, ValidationSeverity>,

    /// Whether validation panel is visible
    show_validation_panel: bool,

    /// Status message
    status_message: String,
}

impl Default for WorkflowEditorApp {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowEditorApp {
    /// Editor preloaded with the sample pipeline and no save location
    pub fn new() -> Self {
        let config = EditorConfig::default();
        let graph = demo::sample_pipeline().unwrap_or_default();
        let host = LocalHost::detached(config.simulation_mode());
        Self::with_graph(graph, &config, Box::new(host))
    }

    pub fn with_graph(graph: GraphModel, config: &EditorConfig, host: Box<dyn WorkflowHost>) -> Self {
        Self {
            graph,
            viewport: ViewportTransform::default(),
            controller: config.controller(),
            simulator: ExecutionSimulator::new(config.simulation_mode()),
            host,
            channel: MessageChannel::new(),
            style: config.render_style(),
            throttle: RedrawThrottle::new(config.redraw_interval()),
            last_tick: None,
            validation_issues: HashMap::new(),
            show_validation_panel: true,
            status_message: "Drag nodes from the palette onto the canvas".to_string(),
        }
    }

    /// Send the snapshot and pending history to the host
    fn save_workflow(&mut self) {
        let workflow = self.graph.to_workflow();
        let saved = self
            .host
            .on_save(&workflow)
            .and_then(|()| self.host.on_history(self.graph.events()));

        match saved {
            Ok(()) => {
                self.graph.clear_events();
                self.status_message = "✓ Workflow saved".to_string();
            }
            Err(e) => {
                warn!(error = %e, "save failed");
                self.status_message = format!("❌ Save failed: {:#}", e);
            }
        }
    }

    fn validate_graph(&mut self) {
        let result = self.graph.validate();
        self.validation_issues = self.graph.nodes_with_issues(&result);

        let error_count = result.errors().len();
        let warning_count = result.warnings().len();
        let info_count = result.info().len();

        self.status_message = if error_count > 0 {
            format!("❌ Validation: {} errors, {} warnings", error_count, warning_count)
        } else if warning_count > 0 {
            format!("⚠ Validation: {} warnings, {} info", warning_count, info_count)
        } else {
            format!("✓ Validation passed ({} info)", info_count)
        };
    }

    /// Ask the host to run the workflow and start animating statuses
    fn start_test_run(&mut self) {
        let result = self.graph.validate();
        if !result.is_valid() {
            self.validation_issues = self.graph.nodes_with_issues(&result);
            self.status_message = format!(
                "❌ Cannot test: {} validation errors",
                result.errors().len()
            );
            return;
        }

        let workflow = self.graph.to_workflow();
        match self.host.on_test(&workflow, self.channel.sender()) {
            Ok(mode) => {
                self.simulator.set_mode(mode);
                self.simulator.start(&mut self.graph);
                self.last_tick = Some(Instant::now());
                self.status_message = match mode {
                    SimulationMode::Timed(_) => "▶ Simulating test run".to_string(),
                    SimulationMode::External => "▶ Test run started, waiting for status".to_string(),
                };
            }
            Err(e) => {
                self.status_message = format!("❌ Test run failed to start: {:#}", e);
            }
        }
    }

    fn stop_test_run(&mut self) {
        self.simulator.stop(&mut self.graph);
        self.last_tick = None;
        self.status_message = "⏹ Test run stopped".to_string();
    }

    /// Apply queued messages and advance the simulator clock
    fn pump(&mut self, now: Instant) {
        for message in self.channel.drain() {
            match &message {
                EditorMessage::StatusUpdate { .. } => {
                    self.simulator.handle_message(&mut self.graph, &message);
                }
                EditorMessage::PaletteDrop { .. } => {
                    let outcome = self.controller.handle_message(&mut self.graph, &message);
                    self.apply_outcome(&outcome);
                }
            }
            self.throttle.request();
        }

        if self.simulator.is_running() {
            let dt = self
                .last_tick
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or_default();
            self.last_tick = Some(now);
            self.simulator.tick(&mut self.graph, dt);
            self.throttle.request();

            if self.simulator.is_finished() {
                self.status_message = "✓ Test run finished".to_string();
            }
        }
    }

    fn apply_outcome(&mut self, outcome: &InteractionOutcome) {
        match outcome {
            InteractionOutcome::Connected(_) => {
                self.status_message = "✓ Connected".to_string();
            }
            InteractionOutcome::DraftDiscarded(Some(e)) => {
                self.status_message = format!("Connection dropped: {}", e);
            }
            InteractionOutcome::NodeAdded(id) => {
                if let Some(node) = self.graph.node(id) {
                    self.status_message = format!("Added {}", node.name);
                }
            }
            InteractionOutcome::NodesDeleted(ids) => {
                self.status_message = format!("Deleted {} node(s)", ids.len());
            }
            _ => {}
        }
        if outcome.needs_redraw() {
            self.throttle.request();
        }
    }

    /// Render the entire UI
    fn render_ui(&mut self, ctx: &egui::Context) {
        if self.show_validation_panel {
            let result = self.graph.validate();
            self.validation_issues = self.graph.nodes_with_issues(&result);
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Save").clicked() {
                        self.save_workflow();
                        ui.close_menu();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("View", |ui| {
                    ui.checkbox(&mut self.style.show_grid, "Show Grid");
                    ui.checkbox(&mut self.show_validation_panel, "Show Validation Panel");
                    if ui.button("Reset View").clicked() {
                        self.viewport.reset();
                        ui.close_menu();
                    }
                });

                ui.menu_button("Help", |ui| {
                    ui.label("Drag a node type from the palette onto the canvas");
                    ui.label("Drag from an output port to an input port to connect");
                    ui.label("Scroll to zoom, use the hand tool to pan");
                    ui.label("Delete removes the selection, Escape cancels a drag");
                });
            });
        });

        // Toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let mut mode = self.controller.mode();
                ui.selectable_value(&mut mode, ToolMode::Select, "⬉ Select");
                ui.selectable_value(&mut mode, ToolMode::Pan, "✋ Pan");
                ui.selectable_value(&mut mode, ToolMode::Connect, "🔗 Connect");
                if mode != self.controller.mode() {
                    self.controller.set_mode(mode);
                }

                ui.separator();

                if ui.button("🔍+").clicked() {
                    self.viewport.zoom_by(1.2, None);
                }
                if ui.button("🔍-").clicked() {
                    self.viewport.zoom_by(1.0 / 1.2, None);
                }
                ui.label(format!("Zoom: {:.0}%", self.viewport.zoom() * 100.0));

                ui.separator();

                if ui.button("🗑 Delete").clicked() {
                    let outcome = self.controller.delete_selection(&mut self.graph);
                    self.apply_outcome(&outcome);
                }
                if ui.button("✓ Validate").clicked() {
                    self.validate_graph();
                }
                if self.simulator.is_running() {
                    if ui.button("⏹ Stop").clicked() {
                        self.stop_test_run();
                    }
                } else if ui.button("▶ Test").clicked() {
                    self.start_test_run();
                }
                if ui.button("💾 Save").clicked() {
                    self.save_workflow();
                }

                ui.separator();

                ui.label(format!("Nodes: {}", self.graph.node_count()));
                ui.label(format!("Connections: {}", self.graph.connection_count()));
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
            });
        });

        if self.show_validation_panel {
            egui::TopBottomPanel::bottom("validation_panel")
                .default_height(160.0)
                .show(ctx, |ui| {
                    self.render_validation_panel(ui);
                });
        }

        egui::SidePanel::left("palette")
            .default_width(170.0)
            .show(ctx, |ui| {
                self.render_palette(ui);
            });

        egui::SidePanel::right("properties_panel")
            .default_width(280.0)
            .show(ctx, |ui| {
                self.render_properties_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_canvas(ui);
        });
    }

    /// Node templates; drag onto the canvas or click to drop at the center
    fn render_palette(&mut self, ui: &mut egui::Ui) {
        ui.heading("Nodes");
        ui.separator();

        for kind in NodeKind::ALL {
            let id = egui::Id::new(("palette", kind.display_name()));
            let mut add_clicked = false;
            ui.horizontal(|ui| {
                add_clicked = ui
                    .small_button("+")
                    .on_hover_text("Add at the center of the view")
                    .clicked();
                ui.dnd_drag_source(id, kind, |ui| {
                    egui::Frame::none()
                        .fill(to_color(render::kind_color(kind)))
                        .rounding(4.0)
                        .inner_margin(6.0)
                        .show(ui, |ui| {
                            ui.set_min_width(ui.available_width());
                            ui.label(egui::RichText::new(kind.display_name()).strong());
                            ui.small(kind.description());
                        });
                });
            });

            if add_clicked {
                let center = self.viewport.screen_to_world(self.viewport.viewport_center());
                self.channel.sender().send(EditorMessage::PaletteDrop {
                    node_kind: kind,
                    world_position: center,
                });
            }
            ui.add_space(4.0);
        }
    }

    /// Render the properties panel
    fn render_properties_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Properties");
        ui.separator();

        let selection = self.controller.selection();
        let node = match selection.len() {
            1 => selection
                .iter()
                .next()
                .and_then(|id| self.graph.node(id))
                .cloned(),
            _ => None,
        };

        let Some(node) = node else {
            if selection.len() > 1 {
                ui.label(format!("{} nodes selected", selection.len()));
            } else {
                ui.label("No node selected");
            }
            return;
        };

        ui.label(format!("Kind: {}", node.kind.display_name()));
        ui.label(format!("Status: {:?}", node.status));
        ui.label(format!(
            "Position: ({:.0}, {:.0})",
            node.position.x, node.position.y
        ));
        ui.separator();

        let mut patch = NodePatch::default();

        ui.label("Name:");
        let mut name = node.name.clone();
        if ui.text_edit_singleline(&mut name).changed() {
            patch.name = Some(name);
        }

        ui.label("Description:");
        let mut description = node.description.clone();
        if ui.text_edit_multiline(&mut description).changed() {
            patch.description = Some(description);
        }

        ui.separator();
        ui.label(egui::RichText::new("Settings").strong());
        let mut config = node.config.clone();
        if edit_config(ui, &mut config) {
            patch.config = Some(config);
        }

        if patch != NodePatch::default() {
            apply_node_patch(&mut self.graph, &node.id, patch);
        }

        ui.separator();
        ui.label(egui::RichText::new("Connections").strong());

        let mut listed: Vec<(String, String)> = Vec::new();
        for connection in self.graph.incoming(&node.id) {
            let from = self
                .graph
                .node(&connection.from_node_id)
                .map_or(connection.from_node_id.as_str(), |n| n.name.as_str());
            listed.push((connection.id.clone(), format!("← {}", from)));
        }
        for connection in self.graph.outgoing(&node.id) {
            let to = self
                .graph
                .node(&connection.to_node_id)
                .map_or(connection.to_node_id.as_str(), |n| n.name.as_str());
            listed.push((connection.id.clone(), format!("→ {}", to)));
        }

        if listed.is_empty() {
            ui.label("None");
        }
        for (connection_id, label) in listed {
            ui.horizontal(|ui| {
                ui.label(label);
                if ui.small_button("✕").on_hover_text("Disconnect").clicked() {
                    self.graph.disconnect(&connection_id);
                }
            });
        }

        ui.separator();
        ui.label(egui::RichText::new("ID").weak());
        ui.label(egui::RichText::new(&node.id).monospace().weak());
    }

    fn render_validation_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Validation");
        ui.separator();

        let result = self.graph.validate();

        egui::ScrollArea::vertical().show(ui, |ui| {
            if result.issues.is_empty() {
                ui.colored_label(Color32::from_rgb(34, 139, 34), "✓ All checks passed");
            }

            for issue in &result.issues {
                let (icon, color) = severity_style(issue.severity);
                ui.horizontal(|ui| {
                    ui.colored_label(color, icon);
                    ui.label(&issue.message);
                    if let Some(node_id) = issue.affected_nodes.first() {
                        if ui.small_button("Go to").clicked() {
                            self.controller.select(&self.graph, node_id);
                        }
                    }
                });
            }
        });
    }

    /// Render the canvas and feed pointer input to the controller
    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());

        let canvas_rect = response.rect;
        let origin = canvas_rect.min;
        self.viewport
            .set_viewport_size(Size::new(canvas_rect.width(), canvas_rect.height()));

        let local = |pos: Pos2| Point::new(pos.x - origin.x, pos.y - origin.y);

        // Zoom towards the cursor
        if response.hovered() {
            let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 {
                let anchor = response.hover_pos().map(local);
                self.viewport.zoom_by((scroll_delta * 0.0015).exp(), anchor);
                self.throttle.request();
            }
        }

        // Palette drop
        if let Some(kind) = response.dnd_release_payload::<NodeKind>() {
            if let Some(pos) = ui.input(|i| i.pointer.interact_pos()) {
                let world = self.viewport.screen_to_world(local(pos));
                self.channel.sender().send(EditorMessage::PaletteDrop {
                    node_kind: *kind,
                    world_position: world,
                });
            }
        }

        if response.drag_started() {
            if let Some(pos) = ui.input(|i| i.pointer.press_origin()) {
                let outcome = self.controller.pointer_down(&self.graph, &self.viewport, local(pos));
                self.apply_outcome(&outcome);
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                let outcome =
                    self.controller
                        .pointer_move(&mut self.graph, &mut self.viewport, local(pos));
                self.apply_outcome(&outcome);
            }
        }
        if response.drag_stopped() {
            let pos = response
                .interact_pointer_pos()
                .or_else(|| ui.input(|i| i.pointer.latest_pos()));
            if let Some(pos) = pos {
                let outcome = self.controller.pointer_up(&mut self.graph, &self.viewport, local(pos));
                self.apply_outcome(&outcome);
            }
        }
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let point = local(pos);
                let outcome = self.controller.pointer_down(&self.graph, &self.viewport, point);
                self.apply_outcome(&outcome);
                let outcome = self.controller.pointer_up(&mut self.graph, &self.viewport, point);
                self.apply_outcome(&outcome);
            }
        }

        // Keyboard shortcuts, unless a text field has focus
        if !ui.ctx().wants_keyboard_input() {
            let (delete, escape) = ui.input(|i| {
                (
                    i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                    i.key_pressed(egui::Key::Escape),
                )
            });
            if delete {
                let outcome = self.controller.delete_selection(&mut self.graph);
                self.apply_outcome(&outcome);
            }
            if escape {
                let outcome = self.controller.cancel();
                self.apply_outcome(&outcome);
            }
        }

        let scene = Scene {
            graph: &self.graph,
            viewport: &self.viewport,
            selection: self.controller.selection(),
            draft: self.controller.draft(),
            style: &self.style,
        };
        let list = render::render(&scene);
        for item in &list.items {
            paint(&painter, origin, &item.command);
        }

        self.draw_issue_badges(&painter, origin);
    }

    /// Small severity badge on nodes with validation warnings or errors
    fn draw_issue_badges(&self, painter: &egui::Painter, origin: Pos2) {
        let zoom = self.viewport.zoom();
        for node in self.graph.nodes_back_to_front() {
            let Some(severity) = self.validation_issues.get(&node.id) else {
                continue;
            };
            if *severity == ValidationSeverity::Info {
                continue;
            }
            let (icon, color) = severity_style(*severity);
            let corner = self.viewport.world_to_screen(Point::new(
                node.position.x + node.size.width,
                node.position.y + node.size.height,
            ));
            let center = to_pos(origin, corner) - vec2(10.0, 10.0) * zoom;
            painter.circle_filled(center, 7.0 * zoom, color);
            painter.text(
                center,
                Align2::CENTER_CENTER,
                icon,
                FontId::proportional(9.0 * zoom),
                Color32::WHITE,
            );
        }
    }
}

/// Apply an edit from the properties panel; stale ids and mismatched
/// configs leave the node as it was
fn apply_node_patch(graph: &mut GraphModel, id: &str, patch: NodePatch) -> bool {
    match graph.update_node(id, patch) {
        Ok(()) => true,
        Err(err) => {
            debug!(node_id = id, error = %err, "node edit rejected");
            false
        }
    }
}

/// Settings editor per node kind; returns true when anything changed
fn edit_config(ui: &mut egui::Ui, config: &mut NodeConfig) -> bool {
    let mut changed = false;

    match config {
        NodeConfig::Start(start) => {
            egui::ComboBox::from_label("Trigger")
                .selected_text(format!("{:?}", start.trigger))
                .show_ui(ui, |ui| {
                    for trigger in [Trigger::Manual, Trigger::Schedule, Trigger::Webhook] {
                        changed |= ui
                            .selectable_value(&mut start.trigger, trigger, format!("{:?}", trigger))
                            .changed();
                    }
                });
        }
        NodeConfig::End(end) => {
            ui.label("Output key:");
            changed |= edit_optional(ui, &mut end.output_key);
        }
        NodeConfig::Agent(agent) => {
            ui.label("Agent:");
            changed |= edit_optional(ui, &mut agent.agent_id);
            ui.label("Model:");
            changed |= edit_optional(ui, &mut agent.model);
            ui.label("Prompt:");
            changed |= ui.text_edit_multiline(&mut agent.prompt).changed();
        }
        NodeConfig::Condition(condition) => {
            ui.label("Expression:");
            changed |= ui.text_edit_singleline(&mut condition.expression).changed();
        }
        NodeConfig::Action(action) => {
            ui.label("Action:");
            changed |= ui.text_edit_singleline(&mut action.action).changed();
            ui.label(format!("{} parameter(s)", action.parameters.len()));
        }
        NodeConfig::Delay(delay) => {
            changed |= ui
                .add(
                    egui::DragValue::new(&mut delay.duration_ms)
                        .range(0..=3_600_000)
                        .suffix(" ms"),
                )
                .changed();
        }
        NodeConfig::Webhook(webhook) => {
            ui.label("URL:");
            changed |= ui.text_edit_singleline(&mut webhook.url).changed();
            egui::ComboBox::from_label("Method")
                .selected_text(format!("{:?}", webhook.method))
                .show_ui(ui, |ui| {
                    for method in [HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
                        changed |= ui
                            .selectable_value(&mut webhook.method, method, format!("{:?}", method))
                            .changed();
                    }
                });
        }
        NodeConfig::Loop(lp) => {
            ui.label("Max iterations:");
            changed |= ui
                .add(egui::DragValue::new(&mut lp.max_iterations).range(1..=10_000))
                .changed();
        }
    }

    changed
}

/// Text field for an optional string; empty means unset
fn edit_optional(ui: &mut egui::Ui, value: &mut Option<String>) -> bool {
    let mut text = value.clone().unwrap_or_default();
    if ui.text_edit_singleline(&mut text).changed() {
        *value = (!text.is_empty()).then_some(text);
        true
    } else {
        false
    }
}

fn severity_style(severity: ValidationSeverity) -> (&'static str, Color32) {
    match severity {
        ValidationSeverity::Error => ("❌", Color32::RED),
        ValidationSeverity::Warning => ("⚠", Color32::from_rgb(255, 165, 0)),
        ValidationSeverity::Info => ("ℹ", Color32::from_rgb(59, 130, 246)),
    }
}

/// Replay one draw command onto the egui painter
fn paint(painter: &egui::Painter, origin: Pos2, command: &DrawCommand) {
    match command {
        DrawCommand::Line { from, to, stroke } => {
            painter.line_segment([to_pos(origin, *from), to_pos(origin, *to)], to_stroke(*stroke));
        }
        DrawCommand::CubicBezier { points, stroke } => {
            let points = points.map(|p| to_pos(origin, p));
            painter.add(CubicBezierShape::from_points_stroke(
                points,
                false,
                Color32::TRANSPARENT,
                to_stroke(*stroke),
            ));
        }
        DrawCommand::Polygon { points, fill } => {
            let points = points.iter().map(|p| to_pos(origin, *p)).collect();
            painter.add(PathShape::convex_polygon(points, to_color(*fill), Stroke::NONE));
        }
        DrawCommand::Rect {
            rect,
            rounding,
            fill,
            stroke,
        } => {
            let rect = Rect::from_min_size(to_pos(origin, rect.origin()), vec2(rect.width, rect.height));
            painter.rect(rect, *rounding, to_color(*fill), to_stroke(*stroke));
        }
        DrawCommand::Text {
            position,
            text,
            size,
            color,
        } => {
            painter.text(
                to_pos(origin, *position),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(*size),
                to_color(*color),
            );
        }
        DrawCommand::Circle {
            center,
            radius,
            fill,
            stroke,
        } => {
            let stroke = stroke.map_or(Stroke::NONE, to_stroke);
            painter.circle(to_pos(origin, *center), *radius, to_color(*fill), stroke);
        }
    }
}

fn to_pos(origin: Pos2, point: Point) -> Pos2 {
    pos2(origin.x + point.x, origin.y + point.y)
}

fn to_color(color: render::Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

fn to_stroke(stroke: render::Stroke) -> Stroke {
    Stroke::new(stroke.width, to_color(stroke.color))
}

impl eframe::App for WorkflowEditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.pump(now);
        self.render_ui(ctx);

        if self.throttle.should_redraw(now) {
            ctx.request_repaint();
        } else if let Some(wait) = self.throttle.time_until_due(now) {
            ctx.request_repaint_after(wait);
        }
    }
}
