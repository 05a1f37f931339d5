//! Barycentric crossing reduction between adjacent layers.

use crate::config::LayoutConfig;

use super::graph::LayoutGraph;
use super::types::{CrossingReduction, LayerAssignment, Layers, NodeIndex};

/// Reorders nodes within layers to reduce crossings.
///
/// Runs up to `max_crossing_iterations` forward+backward sweeps and returns
/// the best ordering seen, stopping at the first pass that does not improve
/// on it. Layer membership is never changed.
pub fn minimize_crossings(
    graph: &LayoutGraph,
    assignment: &LayerAssignment,
    config: &LayoutConfig,
) -> CrossingReduction {
    let layer_of = &assignment.layer;
    let (upper, lower) = adjacent_neighbors(graph, layer_of);

    let mut current = assignment.layers.clone();
    let initial_crossings = count_crossings(graph, layer_of, &current);
    let mut best = current.clone();
    let mut best_crossings = initial_crossings;
    let mut iterations = 0usize;

    for _ in 0..config.max_crossing_iterations {
        if best_crossings == 0 || current.len() < 2 {
            break;
        }
        iterations += 1;
        let mut positions = current.positions(graph.node_count());
        for rank in 1..current.len() {
            sort_by_barycenter(&mut current.0[rank], &upper, &mut positions);
        }
        for rank in (0..current.len() - 1).rev() {
            sort_by_barycenter(&mut current.0[rank], &lower, &mut positions);
        }

        let crossings = count_crossings(graph, layer_of, &current);
        log::trace!("crossing pass {iterations}: {crossings} (best {best_crossings})");
        if crossings < best_crossings {
            best = current.clone();
            best_crossings = crossings;
        } else {
            break;
        }
    }

    log::debug!(
        "crossings reduced from {} to {} in {} passes",
        initial_crossings,
        best_crossings,
        iterations
    );

    CrossingReduction {
        layers: best,
        crossings: best_crossings,
        initial_crossings,
        iterations,
    }
}

/// Neighbours of every node restricted to the layer directly before
/// (`upper`) and directly after (`lower`) it.
fn adjacent_neighbors(
    graph: &LayoutGraph,
    layer_of: &[usize],
) -> (Vec<Vec<NodeIndex>>, Vec<Vec<NodeIndex>>) {
    let mut upper = vec![Vec::new(); graph.node_count()];
    let mut lower = vec![Vec::new(); graph.node_count()];
    for edge in &graph.edges {
        if layer_of[edge.target] == layer_of[edge.source] + 1 {
            upper[edge.target].push(edge.source);
            lower[edge.source].push(edge.target);
        }
    }
    (upper, lower)
}

/// Stable barycenter sort of one layer.
///
/// Nodes without neighbours in the reference layer keep their slot; the rest
/// are sorted by the mean position of their neighbours and fill the remaining
/// slots in order.
fn sort_by_barycenter(
    bucket: &mut [NodeIndex],
    neighbors: &[Vec<NodeIndex>],
    positions: &mut [usize],
) {
    if bucket.len() <= 1 {
        return;
    }
    let mut free_slots: Vec<usize> = Vec::with_capacity(bucket.len());
    let mut movable: Vec<(f64, NodeIndex)> = Vec::with_capacity(bucket.len());
    for (slot, &node) in bucket.iter().enumerate() {
        let adjacent = &neighbors[node];
        if adjacent.is_empty() {
            continue;
        }
        let sum: usize = adjacent.iter().map(|&n| positions[n]).sum();
        movable.push((sum as f64 / adjacent.len() as f64, node));
        free_slots.push(slot);
    }
    movable.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (slot, (_, node)) in free_slots.into_iter().zip(movable) {
        bucket[slot] = node;
    }
    for (idx, &node) in bucket.iter().enumerate() {
        positions[node] = idx;
    }
}

/// Total number of crossing edge pairs between every pair of adjacent layers.
pub fn count_crossings(graph: &LayoutGraph, layer_of: &[usize], layers: &Layers) -> usize {
    if layers.len() < 2 {
        return 0;
    }
    let positions = layers.positions(graph.node_count());
    let mut per_gap: Vec<Vec<(usize, usize)>> = vec![Vec::new(); layers.len() - 1];
    for edge in &graph.edges {
        let from = layer_of[edge.source];
        if layer_of[edge.target] == from + 1 {
            per_gap[from].push((positions[edge.source], positions[edge.target]));
        }
    }
    per_gap.iter().map(|pairs| count_inversions(pairs)).sum()
}

fn count_inversions(pairs: &[(usize, usize)]) -> usize {
    let mut crossings = 0usize;
    for (idx, &(a1, b1)) in pairs.iter().enumerate() {
        for &(a2, b2) in &pairs[idx + 1..] {
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}
