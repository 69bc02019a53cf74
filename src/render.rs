//! Immediate-mode draw list for the workflow canvas.
//!
//! [`render`] is a pure function of the graph, viewport, selection and the
//! in-progress connection draft. It emits backend-neutral [`DrawCommand`]s in
//! screen space; the egui front end replays them onto a painter.

use crate::geometry::{Point, Rectangle, Vector};
use crate::graph::GraphModel;
use crate::interaction::ConnectionDraft;
use crate::node::{NodeId, NodeKind, NodeStatus, PortDirection, WorkflowNode};
use crate::viewport::ViewportTransform;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Minimum horizontal control-point offset for connection curves, world units
pub const MIN_CONTROL_OFFSET: f32 = 50.0;

/// Grid lines closer than this on screen are not drawn
pub const MIN_GRID_SPACING_PX: f32 = 4.0;

const ARROW_SIZE: f32 = 8.0;
const STATUS_DOT_RADIUS: f32 = 5.0;
const LABEL_PADDING: f32 = 10.0;

/// RGBA color, backend-neutral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const GRID: Color = Color::rgb(228, 228, 232);
    pub const CONNECTION: Color = Color::rgb(100, 116, 139);
    pub const DRAFT: Color = Color::rgb(59, 130, 246);
    pub const BORDER: Color = Color::rgb(148, 163, 184);
    pub const SELECTED_BORDER: Color = Color::rgb(37, 99, 235);
    pub const TEXT: Color = Color::rgb(15, 23, 42);
    pub const SUBTLE_TEXT: Color = Color::rgb(100, 116, 139);
    pub const INPUT_PORT: Color = Color::rgb(16, 185, 129);
    pub const OUTPUT_PORT: Color = Color::rgb(249, 115, 22);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: Color,
}

impl Stroke {
    pub const fn new(width: f32, color: Color) -> Self {
        Self { width, color }
    }
}

/// Draw layers, back to front
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Grid,
    Connections,
    Draft,
    NodeBodies,
    Labels,
    StatusDots,
    Ports,
}

/// One primitive in screen space
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    CubicBezier {
        points: [Point; 4],
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Point>,
        fill: Color,
    },
    Rect {
        rect: Rectangle,
        rounding: f32,
        fill: Color,
        stroke: Stroke,
    },
    Text {
        position: Point,
        text: String,
        size: f32,
        color: Color,
    },
    Circle {
        center: Point,
        radius: f32,
        fill: Color,
        stroke: Option<Stroke>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub layer: Layer,
    pub command: DrawCommand,
}

/// Ordered output of one render pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub items: Vec<DrawItem>,
}

impl DrawList {
    fn push(&mut self, layer: Layer, command: DrawCommand) {
        self.items.push(DrawItem { layer, command });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Commands belonging to a single layer, in emission order
    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &DrawCommand> {
        self.items
            .iter()
            .filter(move |item| item.layer == layer)
            .map(|item| &item.command)
    }
}

/// Tunables for a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    /// Grid interval in world units
    pub grid_spacing: f32,
    pub show_grid: bool,
    /// Port radius in world units
    pub port_radius: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            grid_spacing: 20.0,
            show_grid: true,
            port_radius: 6.0,
        }
    }
}

/// Everything a render pass reads
pub struct Scene<'a> {
    pub graph: &'a GraphModel,
    pub viewport: &'a ViewportTransform,
    pub selection: &'a BTreeSet<NodeId>,
    pub draft: Option<&'a ConnectionDraft>,
    pub style: &'a RenderStyle,
}

/// Produce the full draw list for one frame
pub fn render(scene: &Scene<'_>) -> DrawList {
    let mut list = DrawList::default();
    let viewport = scene.viewport;
    let zoom = viewport.zoom();

    if scene.style.show_grid {
        draw_grid(&mut list, viewport, scene.style.grid_spacing);
    }

    for connection in scene.graph.connections() {
        let endpoints = scene
            .graph
            .node(&connection.from_node_id)
            .zip(scene.graph.node(&connection.to_node_id))
            .and_then(|(from, to)| {
                let out = from.port(&connection.from_port_id)?;
                let inp = to.port(&connection.to_port_id)?;
                Some((from.port_position(out), to.port_position(inp)))
            });
        if let Some((from, to)) = endpoints {
            draw_connection(
                &mut list,
                Layer::Connections,
                viewport.world_to_screen(from),
                viewport.world_to_screen(to),
                zoom,
                Stroke::new(2.0, Color::CONNECTION),
            );
        }
    }

    if let Some(draft) = scene.draft {
        if let Some(anchor) = draft.anchor(scene.graph) {
            draw_connection(
                &mut list,
                Layer::Draft,
                viewport.world_to_screen(anchor),
                viewport.world_to_screen(draft.pointer),
                zoom,
                Stroke::new(2.0, Color::DRAFT),
            );
        }
    }

    let nodes: Vec<&WorkflowNode> = scene.graph.nodes_back_to_front().collect();

    for node in &nodes {
        let selected = scene.selection.contains(&node.id);
        let border = if selected {
            Stroke::new(3.0, Color::SELECTED_BORDER)
        } else {
            Stroke::new(1.5, Color::BORDER)
        };
        list.push(
            Layer::NodeBodies,
            DrawCommand::Rect {
                rect: viewport.world_rect_to_screen(&node.bounds()),
                rounding: 6.0 * zoom,
                fill: kind_color(node.kind),
                stroke: border,
            },
        );
    }

    for node in &nodes {
        let origin = viewport.world_to_screen(node.position);
        let padding = Vector::new(LABEL_PADDING, LABEL_PADDING) * zoom;
        list.push(
            Layer::Labels,
            DrawCommand::Text {
                position: origin + padding,
                text: node.name.clone(),
                size: 14.0 * zoom,
                color: Color::TEXT,
            },
        );
        list.push(
            Layer::Labels,
            DrawCommand::Text {
                position: origin + padding + Vector::new(0.0, 20.0 * zoom),
                text: node.kind.display_name().to_string(),
                size: 11.0 * zoom,
                color: Color::SUBTLE_TEXT,
            },
        );
    }

    for node in &nodes {
        let corner = Point::new(node.position.x + node.size.width, node.position.y);
        let center = viewport.world_to_screen(corner) + Vector::new(-LABEL_PADDING, LABEL_PADDING) * zoom;
        list.push(
            Layer::StatusDots,
            DrawCommand::Circle {
                center,
                radius: STATUS_DOT_RADIUS * zoom,
                fill: status_color(node.status),
                stroke: None,
            },
        );
    }

    for node in &nodes {
        for port in node.ports() {
            let fill = match port.direction {
                PortDirection::Input => Color::INPUT_PORT,
                PortDirection::Output => Color::OUTPUT_PORT,
            };
            list.push(
                Layer::Ports,
                DrawCommand::Circle {
                    center: viewport.world_to_screen(node.port_position(port)),
                    radius: scene.style.port_radius * zoom,
                    fill,
                    stroke: Some(Stroke::new(1.5, Color::WHITE)),
                },
            );
        }
    }

    list
}

fn draw_grid(list: &mut DrawList, viewport: &ViewportTransform, spacing: f32) {
    let step = spacing * viewport.zoom();
    if !(step >= MIN_GRID_SPACING_PX) {
        return;
    }

    let size = viewport.viewport_size();
    let pan = viewport.pan();
    let stroke = Stroke::new(1.0, Color::GRID);

    let mut x = pan.x.rem_euclid(step);
    while x <= size.width {
        list.push(
            Layer::Grid,
            DrawCommand::Line {
                from: Point::new(x, 0.0),
                to: Point::new(x, size.height),
                stroke,
            },
        );
        x += step;
    }

    let mut y = pan.y.rem_euclid(step);
    while y <= size.height {
        list.push(
            Layer::Grid,
            DrawCommand::Line {
                from: Point::new(0.0, y),
                to: Point::new(size.width, y),
                stroke,
            },
        );
        y += step;
    }
}

/// Control points for a connection that leaves and enters horizontally
pub fn connection_curve(from: Point, to: Point, zoom: f32) -> [Point; 4] {
    let offset = ((to.x - from.x).abs() / 2.0).max(MIN_CONTROL_OFFSET * zoom);
    [
        from,
        from + Vector::new(offset, 0.0),
        to - Vector::new(offset, 0.0),
        to,
    ]
}

/// Arrowhead pointing right with its tip on `tip`
pub fn arrowhead(tip: Point, zoom: f32) -> Vec<Point> {
    let size = ARROW_SIZE * zoom;
    vec![
        tip,
        tip + Vector::new(-size, -size / 2.0),
        tip + Vector::new(-size, size / 2.0),
    ]
}

fn draw_connection(
    list: &mut DrawList,
    layer: Layer,
    from: Point,
    to: Point,
    zoom: f32,
    stroke: Stroke,
) {
    list.push(
        layer,
        DrawCommand::CubicBezier {
            points: connection_curve(from, to, zoom),
            stroke,
        },
    );
    list.push(
        layer,
        DrawCommand::Polygon {
            points: arrowhead(to, zoom),
            fill: stroke.color,
        },
    );
}

/// Body fill per node kind
pub fn kind_color(kind: NodeKind) -> Color {
    match kind {
        NodeKind::Start => Color::rgb(220, 252, 231),
        NodeKind::End => Color::rgb(254, 226, 226),
        NodeKind::Agent => Color::rgb(237, 233, 254),
        NodeKind::Condition => Color::rgb(254, 249, 195),
        NodeKind::Action => Color::rgb(219, 234, 254),
        NodeKind::Delay => Color::rgb(243, 244, 246),
        NodeKind::Webhook => Color::rgb(207, 250, 254),
        NodeKind::Loop => Color::rgb(255, 237, 213),
    }
}

/// Status dot color: idle grey, running blue, completed green, error red
pub fn status_color(status: NodeStatus) -> Color {
    match status {
        NodeStatus::Idle => Color::rgb(156, 163, 175),
        NodeStatus::Running => Color::rgb(59, 130, 246),
        NodeStatus::Completed => Color::rgb(34, 197, 94),
        NodeStatus::Error => Color::rgb(239, 68, 68),
    }
}

/// Coalesces redraw requests to at most one per interval
#[derive(Debug, Clone)]
pub struct RedrawThrottle {
    interval: Duration,
    last_frame: Option<Instant>,
    pending: bool,
}

impl RedrawThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_frame: None,
            pending: false,
        }
    }

    /// Ask for a redraw; repeated requests before the next frame merge
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns true when a pending redraw may run now, and consumes it
    pub fn should_redraw(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        let due = self
            .last_frame
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.pending = false;
            self.last_frame = Some(now);
        }
        due
    }

    /// How long until a pending redraw becomes due
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        if !self.pending {
            return None;
        }
        Some(match self.last_frame {
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        })
    }
}

impl Default for RedrawThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::node::{INPUT_PORT_ID, OUTPUT_PORT_ID};

    fn sample_graph() -> GraphModel {
        let mut graph = GraphModel::new();
        graph
            .add_node(WorkflowNode::with_id("s", NodeKind::Start, "Start", Point::new(0.0, 0.0)))
            .unwrap();
        graph
            .add_node(WorkflowNode::with_id("a", NodeKind::Agent, "Agent", Point::new(300.0, 0.0)))
            .unwrap();
        graph.connect("s", OUTPUT_PORT_ID, "a", INPUT_PORT_ID).unwrap();
        graph
    }

    fn render_with(
        graph: &GraphModel,
        viewport: &ViewportTransform,
        selection: &BTreeSet<NodeId>,
        draft: Option<&ConnectionDraft>,
    ) -> DrawList {
        let style = RenderStyle::default();
        render(&Scene {
            graph,
            viewport,
            selection,
            draft,
            style: &style,
        })
    }

    #[test]
    fn test_layers_are_emitted_in_order() {
        let graph = sample_graph();
        let viewport = ViewportTransform::new(Size::new(400.0, 300.0));
        let draft = ConnectionDraft {
            from_node_id: "a".to_string(),
            from_port_id: OUTPUT_PORT_ID.to_string(),
            pointer: Point::new(600.0, 50.0),
        };
        let list = render_with(&graph, &viewport, &BTreeSet::new(), Some(&draft));

        let layers: Vec<Layer> = list.items.iter().map(|i| i.layer).collect();
        assert!(layers.windows(2).all(|w| w[0] <= w[1]));
        for layer in [
            Layer::Grid,
            Layer::Connections,
            Layer::Draft,
            Layer::NodeBodies,
            Layer::Labels,
            Layer::StatusDots,
            Layer::Ports,
        ] {
            assert!(layers.contains(&layer), "missing {layer:?}");
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let graph = sample_graph();
        let viewport = ViewportTransform::new(Size::new(400.0, 300.0));
        let selection = BTreeSet::new();

        assert_eq!(
            render_with(&graph, &viewport, &selection, None),
            render_with(&graph, &viewport, &selection, None)
        );
    }

    #[test]
    fn test_connection_leaves_and_enters_horizontally() {
        let [p0, p1, p2, p3] = connection_curve(Point::new(100.0, 0.0), Point::new(0.0, 200.0), 1.0);

        assert_eq!(p1.y, p0.y);
        assert!(p1.x > p0.x);
        assert_eq!(p2.y, p3.y);
        assert!(p2.x < p3.x);
        assert_eq!(p1.x - p0.x, MIN_CONTROL_OFFSET);
    }

    #[test]
    fn test_connection_uses_port_positions() {
        let graph = sample_graph();
        let viewport = ViewportTransform::new(Size::new(800.0, 300.0));
        let list = render_with(&graph, &viewport, &BTreeSet::new(), None);

        let curve = list
            .layer(Layer::Connections)
            .find_map(|c| match c {
                DrawCommand::CubicBezier { points, .. } => Some(*points),
                _ => None,
            })
            .unwrap();
        assert_eq!(curve[0], Point::new(180.0, 36.0));
        assert_eq!(curve[3], Point::new(300.0, 36.0));
    }

    #[test]
    fn test_selected_node_has_highlighted_border() {
        let graph = sample_graph();
        let viewport = ViewportTransform::new(Size::new(400.0, 300.0));
        let selection = BTreeSet::from(["a".to_string()]);
        let list = render_with(&graph, &viewport, &selection, None);

        let borders: Vec<Color> = list
            .layer(Layer::NodeBodies)
            .filter_map(|c| match c {
                DrawCommand::Rect { stroke, .. } => Some(stroke.color),
                _ => None,
            })
            .collect();
        assert_eq!(borders, vec![Color::BORDER, Color::SELECTED_BORDER]);
    }

    #[test]
    fn test_status_dot_tracks_status() {
        let mut graph = sample_graph();
        graph.set_status("s", NodeStatus::Completed).unwrap();
        graph.set_status("a", NodeStatus::Running).unwrap();
        let viewport = ViewportTransform::new(Size::new(400.0, 300.0));
        let list = render_with(&graph, &viewport, &BTreeSet::new(), None);

        let dots: Vec<Color> = list
            .layer(Layer::StatusDots)
            .filter_map(|c| match c {
                DrawCommand::Circle { fill, .. } => Some(*fill),
                _ => None,
            })
            .collect();
        assert_eq!(
            dots,
            vec![
                status_color(NodeStatus::Completed),
                status_color(NodeStatus::Running)
            ]
        );
    }

    #[test]
    fn test_grid_skipped_when_too_dense() {
        let graph = GraphModel::new();
        let mut viewport = ViewportTransform::new(Size::new(400.0, 300.0));
        viewport.set_zoom(0.1);
        let list = render_with(&graph, &viewport, &BTreeSet::new(), None);

        assert_eq!(list.layer(Layer::Grid).count(), 0);
    }

    #[test]
    fn test_grid_spacing_scales_with_zoom() {
        let graph = GraphModel::new();
        let viewport = ViewportTransform::new(Size::new(100.0, 0.0));
        let list = render_with(&graph, &viewport, &BTreeSet::new(), None);

        // Vertical lines at 0, 20, ... 100 and one horizontal line at y = 0
        assert_eq!(list.layer(Layer::Grid).count(), 7);
    }

    #[test]
    fn test_redraw_throttle_coalesces() {
        let start = Instant::now();
        let mut throttle = RedrawThrottle::new(Duration::from_millis(16));

        assert!(!throttle.should_redraw(start));

        throttle.request();
        throttle.request();
        assert!(throttle.should_redraw(start));
        assert!(!throttle.should_redraw(start));

        throttle.request();
        assert!(!throttle.should_redraw(start + Duration::from_millis(5)));
        assert_eq!(
            throttle.time_until_due(start + Duration::from_millis(5)),
            Some(Duration::from_millis(11))
        );
        assert!(throttle.should_redraw(start + Duration::from_millis(16)));
        assert!(!throttle.is_pending());
    }
}
