//! Indexed graph built once from a host snapshot.

use std::collections::HashMap;

use crate::ir::{EdgeDescriptor, GraphSnapshot, NodeDescriptor};

use super::error::ExtractionError;
use super::types::{EdgeIndex, NodeIndex, PortId, PortSide};

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub index: NodeIndex,
    pub id: String,
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub input_ports: Vec<PortId>,
    pub output_ports: Vec<PortId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    pub index: EdgeIndex,
    pub id: String,
    pub source: NodeIndex,
    pub source_port: usize,
    pub target: NodeIndex,
    pub target_port: usize,
    pub label: Option<String>,
}

impl LayoutEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Nodes and edges with forward/reverse adjacency. Never mutated once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutGraph {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    successors: Vec<Vec<NodeIndex>>,
    predecessors: Vec<Vec<NodeIndex>>,
    outgoing: Vec<Vec<EdgeIndex>>,
    incoming: Vec<Vec<EdgeIndex>>,
    lookup: HashMap<String, NodeIndex>,
}

impl LayoutGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn successors(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.successors[node]
    }

    pub fn predecessors(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.predecessors[node]
    }

    pub fn outgoing(&self, node: NodeIndex) -> &[EdgeIndex] {
        &self.outgoing[node]
    }

    pub fn incoming(&self, node: NodeIndex) -> &[EdgeIndex] {
        &self.incoming[node]
    }

    pub fn in_degree(&self, node: NodeIndex) -> usize {
        self.predecessors[node].len()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.lookup.get(id).copied()
    }
}

/// Result of graph extraction; warnings describe skipped entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub graph: LayoutGraph,
    pub warnings: Vec<ExtractionError>,
}

pub fn extract_graph(snapshot: &GraphSnapshot) -> Extraction {
    let mut warnings = Vec::new();
    let mut nodes: Vec<LayoutNode> = Vec::with_capacity(snapshot.nodes.len());
    let mut lookup: HashMap<String, NodeIndex> = HashMap::new();

    for (position, desc) in snapshot.nodes.iter().enumerate() {
        match check_node(desc, position, &lookup) {
            Ok(()) => {
                let index = nodes.len();
                lookup.insert(desc.id.clone(), index);
                nodes.push(build_node(index, desc));
            }
            Err(warning) => warnings.push(warning),
        }
    }

    let mut edges: Vec<LayoutEdge> = Vec::with_capacity(snapshot.edges.len());
    for desc in &snapshot.edges {
        match resolve_edge(desc, &nodes, &lookup) {
            Ok((source, target)) => edges.push(LayoutEdge {
                index: edges.len(),
                id: desc.id.clone(),
                source,
                source_port: desc.source_port_index,
                target,
                target_port: desc.dest_port_index,
                label: desc.label.clone(),
            }),
            Err(warning) => warnings.push(warning),
        }
    }

    for warning in &warnings {
        log::warn!("extraction: {warning}");
    }

    let node_count = nodes.len();
    let mut successors = vec![Vec::new(); node_count];
    let mut predecessors = vec![Vec::new(); node_count];
    let mut outgoing = vec![Vec::new(); node_count];
    let mut incoming = vec![Vec::new(); node_count];
    for edge in &edges {
        successors[edge.source].push(edge.target);
        predecessors[edge.target].push(edge.source);
        outgoing[edge.source].push(edge.index);
        incoming[edge.target].push(edge.index);
    }

    log::debug!(
        "extracted {} blocks and {} lines ({} skipped)",
        node_count,
        edges.len(),
        warnings.len()
    );

    Extraction {
        graph: LayoutGraph {
            nodes,
            edges,
            successors,
            predecessors,
            outgoing,
            incoming,
            lookup,
        },
        warnings,
    }
}

fn check_node(
    desc: &NodeDescriptor,
    position: usize,
    lookup: &HashMap<String, NodeIndex>,
) -> Result<(), ExtractionError> {
    if desc.id.is_empty() {
        return Err(ExtractionError::EmptyNodeId { position });
    }
    if lookup.contains_key(&desc.id) {
        return Err(ExtractionError::DuplicateNode {
            id: desc.id.clone(),
        });
    }
    let valid = |v: f32| v.is_finite() && v >= 0.0;
    if !valid(desc.width) || !valid(desc.height) {
        return Err(ExtractionError::InvalidNodeSize {
            id: desc.id.clone(),
            width: desc.width,
            height: desc.height,
        });
    }
    Ok(())
}

fn build_node(index: NodeIndex, desc: &NodeDescriptor) -> LayoutNode {
    let ports = |side: PortSide, count: usize| -> Vec<PortId> {
        (1..=count).map(|number| PortId { side, number }).collect()
    };
    LayoutNode {
        index,
        id: desc.id.clone(),
        name: if desc.name.is_empty() {
            desc.id.clone()
        } else {
            desc.name.clone()
        },
        width: desc.width,
        height: desc.height,
        input_ports: ports(PortSide::Input, desc.input_port_count),
        output_ports: ports(PortSide::Output, desc.output_port_count),
    }
}

fn resolve_edge(
    desc: &EdgeDescriptor,
    nodes: &[LayoutNode],
    lookup: &HashMap<String, NodeIndex>,
) -> Result<(NodeIndex, NodeIndex), ExtractionError> {
    let find = |id: &str| {
        lookup
            .get(id)
            .copied()
            .ok_or_else(|| ExtractionError::UnknownEndpoint {
                edge: desc.id.clone(),
                node: id.to_string(),
            })
    };
    let source = find(&desc.source_node_id)?;
    let target = find(&desc.dest_node_id)?;

    let check_port = |node: &LayoutNode, port: usize, available: usize| {
        if port == 0 || port > available {
            Err(ExtractionError::PortOutOfRange {
                edge: desc.id.clone(),
                node: node.id.clone(),
                port,
                available,
            })
        } else {
            Ok(())
        }
    };
    let src = &nodes[source];
    let dst = &nodes[target];
    check_port(src, desc.source_port_index, src.output_ports.len())?;
    check_port(dst, desc.dest_port_index, dst.input_ports.len())?;
    Ok((source, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EdgeDescriptor, NodeDescriptor};

    fn block(id: &str, inputs: usize, outputs: usize) -> NodeDescriptor {
        NodeDescriptor::new(id, 30.0, 30.0, inputs, outputs)
    }

    #[test]
    fn indices_follow_input_order() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes.push(block("C", 1, 0));
        snapshot.nodes.push(block("A", 0, 1));
        snapshot.nodes.push(block("B", 1, 1));
        let graph = extract_graph(&snapshot).graph;
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert_eq!(graph.index_of("A"), Some(1));
        assert_eq!(graph.nodes[2].input_ports.len(), 1);
        assert_eq!(
            graph.nodes[2].output_ports[0],
            PortId {
                side: PortSide::Output,
                number: 1
            }
        );
    }

    #[test]
    fn adjacency_is_built_both_ways() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes.push(block("A", 0, 2));
        snapshot.nodes.push(block("B", 1, 0));
        snapshot.nodes.push(block("C", 1, 0));
        snapshot
            .edges
            .push(EdgeDescriptor::new("ab", ("A", 1), ("B", 1)));
        snapshot
            .edges
            .push(EdgeDescriptor::new("ac", ("A", 2), ("C", 1)));
        let graph = extract_graph(&snapshot).graph;
        assert_eq!(graph.successors(0), &[1, 2]);
        assert_eq!(graph.predecessors(2), &[0]);
        assert_eq!(graph.outgoing(0), &[0, 1]);
        assert_eq!(graph.incoming(1), &[0]);
        assert_eq!(graph.in_degree(0), 0);
    }

    #[test]
    fn unknown_endpoints_are_skipped_with_warning() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes.push(block("A", 0, 1));
        snapshot.nodes.push(block("B", 1, 0));
        snapshot
            .edges
            .push(EdgeDescriptor::new("ghost", ("A", 1), ("Z", 1)));
        snapshot
            .edges
            .push(EdgeDescriptor::new("ok", ("A", 1), ("B", 1)));
        let extraction = extract_graph(&snapshot);
        assert_eq!(extraction.graph.edge_count(), 1);
        assert_eq!(extraction.graph.edges[0].id, "ok");
        assert_eq!(extraction.graph.edges[0].index, 0);
        assert_eq!(
            extraction.warnings,
            vec![ExtractionError::UnknownEndpoint {
                edge: "ghost".to_string(),
                node: "Z".to_string()
            }]
        );
    }

    #[test]
    fn malformed_blocks_and_ports_are_skipped() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes.push(block("A", 0, 1));
        snapshot.nodes.push(block("A", 0, 1));
        snapshot.nodes.push(NodeDescriptor::new("Bad", f32::NAN, 10.0, 1, 1));
        snapshot.nodes.push(block("", 0, 0));
        snapshot.nodes.push(block("B", 1, 0));
        snapshot
            .edges
            .push(EdgeDescriptor::new("p0", ("A", 0), ("B", 1)));
        snapshot
            .edges
            .push(EdgeDescriptor::new("p2", ("A", 1), ("B", 2)));
        snapshot
            .edges
            .push(EdgeDescriptor::new("bad", ("Bad", 1), ("B", 1)));
        let extraction = extract_graph(&snapshot);
        assert_eq!(extraction.graph.node_count(), 2);
        assert_eq!(extraction.graph.edge_count(), 0);
        assert_eq!(extraction.warnings.len(), 6);
        assert!(matches!(
            extraction.warnings[0],
            ExtractionError::DuplicateNode { .. }
        ));
        assert!(matches!(
            extraction.warnings[1],
            ExtractionError::InvalidNodeSize { .. }
        ));
        assert!(matches!(
            extraction.warnings[2],
            ExtractionError::EmptyNodeId { position: 3 }
        ));
        assert!(matches!(
            extraction.warnings[4],
            ExtractionError::PortOutOfRange {
                port: 2,
                available: 1,
                ..
            }
        ));
    }

    #[test]
    fn blank_name_falls_back_to_id() {
        let mut desc = block("Gain1", 1, 1);
        desc.name.clear();
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes.push(desc);
        let graph = extract_graph(&snapshot).graph;
        assert_eq!(graph.nodes[0].name, "Gain1");
    }
}
