use serde::Serialize;

use super::error::{ExtractionError, FailedEntity};
use super::graph::LayoutGraph;

pub type NodeIndex = usize;
pub type EdgeIndex = usize;
pub type Point = (f32, f32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutStage {
    Idle,
    Extracted,
    Layered,
    CrossingsMinimized,
    Coordinated,
    Routed,
    Applied,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PortSide {
    Input,
    Output,
}

/// Identifies one connection point on a block. Numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PortId {
    pub side: PortSide,
    pub number: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// Node indices grouped by layer; order within a layer is top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Layers(pub Vec<Vec<NodeIndex>>);

impl Layers {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<NodeIndex>> {
        self.0.iter()
    }

    pub fn layer(&self, index: usize) -> &[NodeIndex] {
        self.0.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of every node within its layer, indexed by node.
    pub fn positions(&self, node_count: usize) -> Vec<usize> {
        let mut positions = vec![0; node_count];
        for bucket in &self.0 {
            for (idx, &node) in bucket.iter().enumerate() {
                positions[node] = idx;
            }
        }
        positions
    }
}

/// Output of the layer assigner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerAssignment {
    pub layer: Vec<usize>,
    pub layers: Layers,
    /// Edges removed by cycle breaking (self-loops included).
    pub feedback_edges: Vec<EdgeIndex>,
    pub relaxation_steps: usize,
}

/// Output of the crossing minimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossingReduction {
    pub layers: Layers,
    pub crossings: usize,
    pub initial_crossings: usize,
    pub iterations: usize,
}

/// Output of the coordinate assigner.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub rects: Vec<Rect>,
    pub layer_x: Vec<f32>,
    pub layer_widths: Vec<f32>,
    pub layer_heights: Vec<f32>,
    /// Height of the tallest layer stack; every layer is centred within it.
    pub content_height: f32,
}

impl Placement {
    pub fn bottom(&self) -> f32 {
        self.rects.iter().map(Rect::bottom).fold(0.0, f32::max)
    }
}

/// Orthogonal waypoints of one edge, source port first.
///
/// The last point is the destination port, except on a straight wire between
/// ports less than `straight_tolerance` apart vertically: that wire keeps the
/// source height and ends level with it at the destination's x.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireRoute {
    pub edge: EdgeIndex,
    pub feedback: bool,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedNode {
    pub index: NodeIndex,
    pub id: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedEdge {
    pub index: EdgeIndex,
    pub id: String,
    pub points: Vec<Point>,
}

/// Everything handed to the host in one application, in index order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutPlan {
    pub nodes: Vec<PlannedNode>,
    pub edges: Vec<PlannedEdge>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub failed: Vec<FailedEntity>,
}

impl ApplyReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Computed layout of one snapshot, before application.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub graph: LayoutGraph,
    pub warnings: Vec<ExtractionError>,
    pub assignment: LayerAssignment,
    pub ordering: CrossingReduction,
    pub placement: Placement,
    pub routes: Vec<WireRoute>,
    pub plan: LayoutPlan,
}

impl Layout {
    /// `(min_x, min_y, max_x, max_y)` over placed blocks and wires.
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        let mut include = |x0: f32, y0: f32, x1: f32, y1: f32| {
            bounds = Some(match bounds {
                Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
                None => (x0, y0, x1, y1),
            });
        };
        for rect in &self.placement.rects {
            include(rect.x, rect.y, rect.right(), rect.bottom());
        }
        for route in &self.routes {
            for &(x, y) in &route.points {
                include(x, y, x, y);
            }
        }
        bounds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub success: bool,
    pub message: String,
    pub crossing_count: usize,
    pub initial_crossing_count: usize,
    pub blocks_processed: usize,
    pub edges_processed: usize,
    pub layer_count: usize,
    pub failed_entities: Vec<FailedEntity>,
    pub warnings: Vec<ExtractionError>,
}
