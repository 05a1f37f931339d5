use crate::layout::{Layout, LayoutResult, path_bend_count, path_length};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub layers: usize,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub result: Option<ResultDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub name: String,
    pub layer: usize,
    pub order: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub feedback: bool,
    pub bends: usize,
    pub length: f32,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDump {
    pub success: bool,
    pub message: String,
    pub crossing_count: usize,
    pub initial_crossing_count: usize,
    pub blocks_processed: usize,
    pub edges_processed: usize,
    pub failed_entities: Vec<crate::layout::FailedEntity>,
    pub warnings: Vec<String>,
}

impl From<&LayoutResult> for ResultDump {
    fn from(result: &LayoutResult) -> Self {
        Self {
            success: result.success,
            message: result.message.clone(),
            crossing_count: result.crossing_count,
            initial_crossing_count: result.initial_crossing_count,
            blocks_processed: result.blocks_processed,
            edges_processed: result.edges_processed,
            failed_entities: result.failed_entities.clone(),
            warnings: result.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, result: Option<&LayoutResult>) -> Self {
        let order = layout.ordering.layers.positions(layout.graph.node_count());
        let nodes = layout
            .graph
            .nodes
            .iter()
            .map(|node| {
                let rect = layout.placement.rects[node.index];
                NodeDump {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    layer: layout.assignment.layer[node.index],
                    order: order[node.index],
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                }
            })
            .collect();

        let edges = layout
            .routes
            .iter()
            .map(|route| {
                let edge = &layout.graph.edges[route.edge];
                EdgeDump {
                    id: edge.id.clone(),
                    from: layout.graph.nodes[edge.source].id.clone(),
                    to: layout.graph.nodes[edge.target].id.clone(),
                    label: edge.label.clone(),
                    feedback: route.feedback,
                    bends: path_bend_count(&route.points),
                    length: path_length(&route.points),
                    points: route.points.iter().map(|(x, y)| [*x, *y]).collect(),
                }
            })
            .collect();

        let (width, height) = layout
            .bounds()
            .map(|(_, _, max_x, max_y)| (max_x, max_y))
            .unwrap_or((0.0, 0.0));

        LayoutDump {
            width,
            height,
            layers: layout.ordering.layers.len(),
            nodes,
            edges,
            result: result.map(ResultDump::from),
        }
    }
}

pub fn write_layout_dump(
    path: Option<&Path>,
    layout: &Layout,
    result: Option<&LayoutResult>,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, result);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &dump)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{EdgeDescriptor, GraphSnapshot, NodeDescriptor};
    use crate::layout::compute_layout;

    #[test]
    fn dump_lists_nodes_with_layer_and_order() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes.push(NodeDescriptor::new("In", 30.0, 30.0, 0, 1));
        snapshot.nodes.push(NodeDescriptor::new("Out", 30.0, 30.0, 1, 0));
        let mut edge = EdgeDescriptor::new("sig", ("In", 1), ("Out", 1));
        edge.label = Some("u".to_string());
        snapshot.edges.push(edge);
        let layout = compute_layout(&snapshot, &LayoutConfig::default()).unwrap();
        let dump = LayoutDump::from_layout(&layout, None);
        assert_eq!(dump.layers, 2);
        assert_eq!(dump.nodes[1].layer, 1);
        assert_eq!(dump.nodes[1].order, 0);
        assert_eq!(dump.edges[0].label.as_deref(), Some("u"));
        assert_eq!(dump.edges[0].bends, 0);
        let json = serde_json::to_value(&dump).unwrap();
        assert!(json["edges"][0]["points"].is_array());
        assert!(json["result"].is_null());
    }
}
