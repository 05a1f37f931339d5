use std::collections::VecDeque;

use crate::config::LayoutConfig;

use super::error::LayoutError;
use super::graph::LayoutGraph;
use super::types::{EdgeIndex, LayerAssignment, Layers, NodeIndex};

/// Longest-path layering from source nodes.
///
/// Cycles are broken first by a depth-first pass that marks back edges; those
/// edges do not constrain layering and come back as `feedback_edges`. The
/// relaxation queue is still capped so a missed cycle surfaces as an error
/// instead of a hang.
pub fn assign_layers(
    graph: &LayoutGraph,
    config: &LayoutConfig,
) -> Result<LayerAssignment, LayoutError> {
    let node_count = graph.node_count();
    let feedback_edges = find_feedback_edges(graph);
    let mut is_feedback = vec![false; graph.edge_count()];
    for &edge in &feedback_edges {
        is_feedback[edge] = true;
    }

    let mut indeg = vec![0usize; node_count];
    for edge in &graph.edges {
        if !is_feedback[edge.index] {
            indeg[edge.target] += 1;
        }
    }

    let mut layer = vec![0usize; node_count];
    let mut queued = vec![false; node_count];
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();
    for node in 0..node_count {
        if indeg[node] == 0 {
            queue.push_back(node);
            queued[node] = true;
        }
    }

    let limit = node_count
        .saturating_mul(node_count.max(1))
        .saturating_mul(config.relaxation_factor)
        .saturating_add(node_count);
    let mut steps = queue.len();
    while let Some(node) = queue.pop_front() {
        queued[node] = false;
        for &edge_idx in graph.outgoing(node) {
            if is_feedback[edge_idx] {
                continue;
            }
            let next = graph.edges[edge_idx].target;
            if layer[node] + 1 <= layer[next] {
                continue;
            }
            layer[next] = layer[node] + 1;
            if !queued[next] {
                steps += 1;
                if steps > limit {
                    return Err(LayoutError::RelaxationLimit { limit });
                }
                queue.push_back(next);
                queued[next] = true;
            }
        }
    }

    for edge in &graph.edges {
        if !is_feedback[edge.index] && layer[edge.target] <= layer[edge.source] {
            return Err(LayoutError::UnbrokenCycle { edge: edge.index });
        }
    }

    let layers = group_by_layer(&layer);
    log::debug!(
        "assigned {} layers ({} feedback edges, {} relaxation steps)",
        layers.len(),
        feedback_edges.len(),
        steps
    );

    Ok(LayerAssignment {
        layer,
        layers,
        feedback_edges,
        relaxation_steps: steps,
    })
}

/// Groups nodes by layer, ascending node index within each layer.
pub fn group_by_layer(layer: &[usize]) -> Layers {
    let Some(&max_layer) = layer.iter().max() else {
        return Layers::default();
    };
    let mut buckets: Vec<Vec<NodeIndex>> = vec![Vec::new(); max_layer + 1];
    for (node, &rank) in layer.iter().enumerate() {
        buckets[rank].push(node);
    }
    Layers(buckets)
}

/// Depth-first back-edge detection.
///
/// Roots are taken from the true sources in index order; when every remaining
/// node has incoming edges the unvisited node with the smallest in-degree
/// (lowest index on ties) becomes a pseudo-source.
pub fn find_feedback_edges(graph: &LayoutGraph) -> Vec<EdgeIndex> {
    const WHITE: u8 = 0;
    const ACTIVE: u8 = 1;
    const DONE: u8 = 2;

    let node_count = graph.node_count();
    let mut state = vec![WHITE; node_count];
    let mut back = Vec::new();
    let mut stack: Vec<(NodeIndex, usize)> = Vec::new();

    let mut visit = |root: NodeIndex, state: &mut Vec<u8>, back: &mut Vec<EdgeIndex>| {
        state[root] = ACTIVE;
        stack.push((root, 0));
        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            let outgoing = graph.outgoing(node);
            if cursor == outgoing.len() {
                state[node] = DONE;
                stack.pop();
                continue;
            }
            top.1 += 1;
            let edge_idx = outgoing[cursor];
            let next = graph.edges[edge_idx].target;
            match state[next] {
                ACTIVE => back.push(edge_idx),
                WHITE => {
                    state[next] = ACTIVE;
                    stack.push((next, 0));
                }
                _ => {}
            }
        }
    };

    for node in 0..node_count {
        if graph.in_degree(node) == 0 && state[node] == WHITE {
            visit(node, &mut state, &mut back);
        }
    }
    loop {
        let pseudo_source = (0..node_count)
            .filter(|&node| state[node] == WHITE)
            .min_by_key(|&node| (graph.in_degree(node), node));
        let Some(root) = pseudo_source else {
            break;
        };
        visit(root, &mut state, &mut back);
    }

    back.sort_unstable();
    back
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EdgeDescriptor, GraphSnapshot, NodeDescriptor};
    use crate::layout::graph::extract_graph;

    fn graph_of(nodes: &[&str], edges: &[(&str, &str)]) -> LayoutGraph {
        let mut snapshot = GraphSnapshot::new();
        for id in nodes {
            snapshot
                .nodes
                .push(NodeDescriptor::new(id, 30.0, 30.0, 4, 4));
        }
        for (idx, (from, to)) in edges.iter().enumerate() {
            snapshot.edges.push(EdgeDescriptor::new(
                &format!("e{idx}"),
                (*from, 1),
                (*to, 1),
            ));
        }
        extract_graph(&snapshot).graph
    }

    #[test]
    fn chain_gets_consecutive_layers() {
        let graph = graph_of(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let result = assign_layers(&graph, &LayoutConfig::default()).unwrap();
        assert_eq!(result.layer, vec![0, 1, 2]);
        assert_eq!(result.layers.len(), 3);
        assert!(result.feedback_edges.is_empty());
    }

    #[test]
    fn longest_path_wins_over_shortcut() {
        let graph = graph_of(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("B", "C"), ("C", "D"), ("A", "D")],
        );
        let result = assign_layers(&graph, &LayoutConfig::default()).unwrap();
        assert_eq!(result.layer, vec![0, 1, 2, 3]);
    }

    #[test]
    fn disconnected_nodes_sit_in_layer_zero() {
        let graph = graph_of(&["A", "B", "Lonely"], &[("A", "B")]);
        let result = assign_layers(&graph, &LayoutConfig::default()).unwrap();
        assert_eq!(result.layer, vec![0, 1, 0]);
        assert_eq!(result.layers.layer(0), &[0, 2]);
    }

    #[test]
    fn fully_cyclic_graph_uses_pseudo_source() {
        let graph = graph_of(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let result = assign_layers(&graph, &LayoutConfig::default()).unwrap();
        assert_eq!(result.layer, vec![0, 1, 2]);
        assert_eq!(result.feedback_edges, vec![2]);
    }

    #[test]
    fn pseudo_source_prefers_minimum_in_degree() {
        // B has in-degree 1, A and C have in-degree 2.
        let graph = graph_of(
            &["A", "B", "C"],
            &[("A", "B"), ("B", "C"), ("C", "A"), ("C", "C"), ("B", "A")],
        );
        let result = assign_layers(&graph, &LayoutConfig::default()).unwrap();
        assert_eq!(result.layer[1], 0);
        assert!(result.feedback_edges.contains(&3));
    }

    #[test]
    fn self_loop_is_feedback() {
        let graph = graph_of(&["A", "B"], &[("A", "A"), ("A", "B")]);
        let result = assign_layers(&graph, &LayoutConfig::default()).unwrap();
        assert_eq!(result.feedback_edges, vec![0]);
        assert_eq!(result.layer, vec![0, 1]);
    }

    #[test]
    fn every_node_lands_in_exactly_one_layer() {
        let graph = graph_of(
            &["A", "B", "C", "D", "E"],
            &[("A", "C"), ("B", "C"), ("C", "D"), ("D", "B"), ("E", "D")],
        );
        let result = assign_layers(&graph, &LayoutConfig::default()).unwrap();
        let mut seen: Vec<usize> = result.layers.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        let max = *result.layer.iter().max().unwrap();
        assert_eq!(result.layers.len(), max + 1);
        for edge in &graph.edges {
            if !result.feedback_edges.contains(&edge.index) {
                assert!(result.layer[edge.target] > result.layer[edge.source]);
            }
        }
    }

    #[test]
    fn empty_graph_has_no_layers() {
        let graph = graph_of(&[], &[]);
        let result = assign_layers(&graph, &LayoutConfig::default()).unwrap();
        assert!(result.layers.is_empty());
        assert_eq!(result.relaxation_steps, 0);
    }
}
