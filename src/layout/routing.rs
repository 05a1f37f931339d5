use crate::config::LayoutConfig;

use super::graph::{LayoutEdge, LayoutGraph};
use super::types::{LayerAssignment, Placement, Point, PortSide, Rect, WireRoute};

// Extra horizontal stagger between consecutive feedback corridors, as a
// fraction of the detour offset.
const FEEDBACK_STAGGER_RATIO: f32 = 0.5;

// Coordinates closer than this are treated as the same line.
const SEGMENT_EPSILON: f32 = 1e-3;

type Segment = (Point, Point);

/// Position of a port slot. Slots are spread evenly along the right edge
/// (outputs) or left edge (inputs): `port * height / (count + 1)`.
pub fn port_position(rect: &Rect, side: PortSide, port: usize, count: usize) -> Point {
    let slots = count.max(port).max(1);
    let y = rect.y + port as f32 * rect.height / (slots + 1) as f32;
    let x = match side {
        PortSide::Output => rect.right(),
        PortSide::Input => rect.x,
    };
    (x, y)
}

/// Computes an orthogonal route for every edge, in edge order.
///
/// Forward edges are routed first. Edges whose destination layer is at or
/// before the source layer then detour below the whole diagram, each in its
/// own corridor, with their vertical legs shifted off any segment already
/// placed. A detour leaving or entering a port that a forward wire also uses
/// shares that wire's stub.
pub fn route_wires(
    graph: &LayoutGraph,
    assignment: &LayerAssignment,
    placement: &Placement,
    config: &LayoutConfig,
) -> Vec<WireRoute> {
    let offset = config.feedback_offset();
    let bottom = placement.bottom();
    let is_feedback =
        |edge: &LayoutEdge| assignment.layer[edge.source] >= assignment.layer[edge.target];
    let feedback_total = graph.edges.iter().filter(|edge| is_feedback(*edge)).count();
    let lane_step = if feedback_total == 0 {
        0.0
    } else {
        offset * FEEDBACK_STAGGER_RATIO / feedback_total as f32
    };

    let anchors: Vec<(Point, Point)> = graph
        .edges
        .iter()
        .map(|edge| edge_anchors(graph, placement, edge))
        .collect();

    let mut paths: Vec<Vec<Point>> = Vec::with_capacity(graph.edge_count());
    let mut taken: Vec<Segment> = Vec::new();
    for (edge, &(start, end)) in graph.edges.iter().zip(&anchors) {
        if is_feedback(edge) {
            paths.push(Vec::new());
            continue;
        }
        let points = route_forward(start, end, config.straight_tolerance);
        taken.extend(segments(&points));
        paths.push(points);
    }

    let mut lane = 0usize;
    for (edge, &(start, end)) in graph.edges.iter().zip(&anchors) {
        if !is_feedback(edge) {
            continue;
        }
        let stagger = 1.0 + FEEDBACK_STAGGER_RATIO * lane as f32 / feedback_total as f32;
        lane += 1;
        let corridor_y = bottom + offset * lane as f32;
        let reach = offset * stagger;
        let exit_x = clear_leg(start, start.0 + reach, corridor_y, lane_step, &taken);
        let entry_x = clear_leg(end, end.0 - reach, corridor_y, lane_step, &taken);
        let points = detour(start, end, exit_x, entry_x, corridor_y);
        taken.extend(segments(&points));
        paths[edge.index] = points;
    }

    let routes: Vec<WireRoute> = graph
        .edges
        .iter()
        .zip(paths)
        .map(|(edge, points)| WireRoute {
            edge: edge.index,
            feedback: is_feedback(edge),
            points,
        })
        .collect();

    log::debug!(
        "routed {} wires ({} feedback detours)",
        routes.len(),
        feedback_total
    );
    routes
}

fn edge_anchors(graph: &LayoutGraph, placement: &Placement, edge: &LayoutEdge) -> (Point, Point) {
    let start = port_position(
        &placement.rects[edge.source],
        PortSide::Output,
        edge.source_port,
        graph.nodes[edge.source].output_ports.len(),
    );
    let end = port_position(
        &placement.rects[edge.target],
        PortSide::Input,
        edge.target_port,
        graph.nodes[edge.target].input_ports.len(),
    );
    (start, end)
}

fn segments(points: &[Point]) -> impl Iterator<Item = Segment> + '_ {
    points.windows(2).map(|pair| (pair[0], pair[1]))
}

/// Picks the x of one vertical leg of a detour. The leg runs from the port's
/// height to `corridor_y` and is joined to the port by a horizontal stub.
///
/// Candidates alternate away from and towards the port in `step` increments
/// and must stay beyond the port. The first whose stub and leg share no
/// length with a taken segment wins; `preferred` is kept if none does.
fn clear_leg(port: Point, preferred: f32, corridor_y: f32, step: f32, taken: &[Segment]) -> f32 {
    let outward = if preferred >= port.0 { 1.0 } else { -1.0 };
    let is_free = |x: f32| {
        let stub = (port, (x, port.1));
        let leg = ((x, port.1), (x, corridor_y));
        !taken.iter().any(|&(a, b)| {
            segment_overlap(stub.0, stub.1, a, b) > SEGMENT_EPSILON
                || segment_overlap(leg.0, leg.1, a, b) > SEGMENT_EPSILON
        })
    };
    if step <= 0.0 {
        return preferred;
    }
    for ring in 0..=taken.len() {
        let shift = step * ring as f32;
        for x in [preferred + outward * shift, preferred - outward * shift] {
            if (x - port.0) * outward > SEGMENT_EPSILON && is_free(x) {
                return x;
            }
        }
    }
    preferred
}

/// Straight segment when the ports line up within `tolerance`, otherwise a
/// Z through the horizontal midpoint.
///
/// A straight wire keeps the source port's height, so its last point can sit
/// up to `tolerance` above or below the destination port.
pub fn route_forward(start: Point, end: Point, tolerance: f32) -> Vec<Point> {
    let dy = (end.1 - start.1).abs();
    if dy == 0.0 || dy < tolerance {
        return vec![start, (end.0, start.1)];
    }
    let mid_x = (start.0 + end.0) / 2.0;
    vec![start, (mid_x, start.1), (mid_x, end.1), end]
}

/// Six-point detour: out to the right, down to the corridor, back left past
/// the destination, then into the input port.
pub fn route_feedback(start: Point, end: Point, offset: f32, corridor_y: f32) -> Vec<Point> {
    detour(start, end, start.0 + offset, end.0 - offset, corridor_y)
}

fn detour(start: Point, end: Point, exit_x: f32, entry_x: f32, corridor_y: f32) -> Vec<Point> {
    vec![
        start,
        (exit_x, start.1),
        (exit_x, corridor_y),
        (entry_x, corridor_y),
        (entry_x, end.1),
        end,
    ]
}

/// Every consecutive pair shares exactly one axis.
pub fn is_orthogonal(points: &[Point]) -> bool {
    points.windows(2).all(|pair| {
        let same_x = pair[0].0 == pair[1].0;
        let same_y = pair[0].1 == pair[1].1;
        same_x != same_y
    })
}

pub fn path_length(points: &[Point]) -> f32 {
    segments(points)
        .map(|(a, b)| ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt())
        .sum()
}

/// Number of turns between horizontal and vertical runs. Zero-length steps
/// are ignored.
pub fn path_bend_count(points: &[Point]) -> usize {
    let mut bends = 0usize;
    let mut horizontal: Option<bool> = None;
    for (a, b) in segments(points) {
        let dx = (b.0 - a.0).abs();
        let dy = (b.1 - a.1).abs();
        if dx <= SEGMENT_EPSILON && dy <= SEGMENT_EPSILON {
            continue;
        }
        let run = dx > dy;
        if horizontal.is_some_and(|prev| prev != run) {
            bends += 1;
        }
        horizontal = Some(run);
    }
    bends
}

/// Length along which two axis-aligned segments lie on the same line.
fn segment_overlap(a: Point, b: Point, c: Point, d: Point) -> f32 {
    let near = |u: f32, v: f32| (u - v).abs() <= SEGMENT_EPSILON;
    let span = |p: f32, q: f32, r: f32, s: f32| {
        let lo = p.min(q).max(r.min(s));
        let hi = p.max(q).min(r.max(s));
        (hi - lo).max(0.0)
    };
    if near(a.1, b.1) && near(c.1, d.1) && near(a.1, c.1) {
        return span(a.0, b.0, c.0, d.0);
    }
    if near(a.0, b.0) && near(c.0, d.0) && near(a.0, c.0) {
        return span(a.1, b.1, c.1, d.1);
    }
    0.0
}

/// Total length two orthogonal routes run on top of each other.
pub fn shared_length(a: &[Point], b: &[Point]) -> f32 {
    segments(a)
        .flat_map(|(p, q)| segments(b).map(move |(r, s)| segment_overlap(p, q, r, s)))
        .sum()
}
