use serde::{Deserialize, Serialize};

/// A block as reported by the host diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub input_port_count: usize,
    #[serde(default)]
    pub output_port_count: usize,
    /// Current `[x, y, w, h]` in the host, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 4]>,
}

/// A signal line between an output port and an input port.
///
/// Port numbers are 1-based, matching the host's own numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDescriptor {
    pub id: String,
    pub source_node_id: String,
    #[serde(default = "first_port")]
    pub source_port_index: usize,
    pub dest_node_id: String,
    #[serde(default = "first_port")]
    pub dest_port_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Waypoints last applied to this line, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<[f32; 2]>,
}

fn first_port() -> usize {
    1
}

/// Immutable copy of the host model taken once per layout request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
    #[serde(default)]
    pub edges: Vec<EdgeDescriptor>,
}

impl NodeDescriptor {
    pub fn new(id: &str, width: f32, height: f32, inputs: usize, outputs: usize) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            width,
            height,
            input_port_count: inputs,
            output_port_count: outputs,
            position: None,
        }
    }
}

impl EdgeDescriptor {
    pub fn new(id: &str, from: (&str, usize), to: (&str, usize)) -> Self {
        Self {
            id: id.to_string(),
            source_node_id: from.0.to_string(),
            source_port_index: from.1,
            dest_node_id: to.0.to_string(),
            dest_port_index: to.1,
            label: None,
            points: Vec::new(),
        }
    }
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    pub fn node(&self, id: &str) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeDescriptor> {
        self.edges.iter().find(|edge| edge.id == id)
    }
}

/// Summary of a diagram's current extent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramInfo {
    pub blocks: usize,
    pub signal_lines: usize,
    /// `(min_x, min_y, max_x, max_y)` over blocks that report a position.
    pub bounds: Option<(f32, f32, f32, f32)>,
}

impl DiagramInfo {
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        for node in &snapshot.nodes {
            let Some([x, y, w, h]) = node.position else {
                continue;
            };
            bounds = Some(match bounds {
                Some((min_x, min_y, max_x, max_y)) => (
                    min_x.min(x),
                    min_y.min(y),
                    max_x.max(x + w),
                    max_y.max(y + h),
                ),
                None => (x, y, x + w, y + h),
            });
        }
        Self {
            blocks: snapshot.nodes.len(),
            signal_lines: snapshot.edges.len(),
            bounds,
        }
    }

    pub fn size(&self) -> Option<(f32, f32)> {
        self.bounds
            .map(|(min_x, min_y, max_x, max_y)| (max_x - min_x, max_y - min_y))
    }
}
