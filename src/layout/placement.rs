//! Layer/order to pixel coordinates.

use crate::config::LayoutConfig;

use super::graph::LayoutGraph;
use super::types::{Layers, Placement, Rect};

/// Places layers as left-to-right columns and stacks each layer's blocks
/// top to bottom, then centres every stack within the tallest one.
pub fn assign_coordinates(graph: &LayoutGraph, layers: &Layers, config: &LayoutConfig) -> Placement {
    let sizes: Vec<(f32, f32)> = graph
        .nodes
        .iter()
        .map(|node| {
            (
                node.width.max(config.min_node_width),
                node.height.max(config.min_node_height),
            )
        })
        .collect();

    let mut rects = vec![Rect::default(); graph.node_count()];
    let mut layer_x = Vec::with_capacity(layers.len());
    let mut layer_widths = Vec::with_capacity(layers.len());
    let mut layer_heights = Vec::with_capacity(layers.len());

    let mut x = config.margin;
    for bucket in layers.iter() {
        let width = bucket
            .iter()
            .map(|&node| sizes[node].0)
            .fold(0.0f32, f32::max);
        let mut y = config.margin;
        for (slot, &node) in bucket.iter().enumerate() {
            if slot > 0 {
                y += config.block_spacing;
            }
            let (w, h) = sizes[node];
            rects[node] = Rect::new(x + (width - w) / 2.0, y, w, h);
            y += h;
        }
        layer_x.push(x);
        layer_widths.push(width);
        layer_heights.push(y - config.margin);
        x += width + config.layer_spacing;
    }

    let content_height = layer_heights.iter().copied().fold(0.0f32, f32::max);
    for (rank, bucket) in layers.iter().enumerate() {
        let pad = (content_height - layer_heights[rank]) / 2.0;
        if pad <= 0.0 {
            continue;
        }
        for &node in bucket {
            rects[node].y += pad;
        }
    }

    log::debug!(
        "placed {} blocks in {} columns, content height {}",
        rects.len(),
        layer_x.len(),
        content_height
    );

    Placement {
        rects,
        layer_x,
        layer_widths,
        layer_heights,
        content_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{GraphSnapshot, NodeDescriptor};
    use crate::layout::graph::extract_graph;

    fn graph_with_sizes(sizes: &[(f32, f32)]) -> LayoutGraph {
        let mut snapshot = GraphSnapshot::new();
        for (idx, &(w, h)) in sizes.iter().enumerate() {
            snapshot
                .nodes
                .push(NodeDescriptor::new(&format!("N{idx}"), w, h, 1, 1));
        }
        extract_graph(&snapshot).graph
    }

    #[test]
    fn columns_accumulate_widths_and_spacing() {
        let graph = graph_with_sizes(&[(100.0, 40.0), (80.0, 40.0), (60.0, 40.0)]);
        let layers = Layers(vec![vec![0], vec![1], vec![2]]);
        let config = LayoutConfig::default();
        let placement = assign_coordinates(&graph, &layers, &config);
        assert_eq!(placement.layer_x, vec![50.0, 300.0, 530.0]);
        assert!(placement.rects[0].x < placement.rects[1].x);
        assert!(placement.rects[1].x < placement.rects[2].x);
    }

    #[test]
    fn small_blocks_are_raised_to_minimum_size() {
        let graph = graph_with_sizes(&[(10.0, 10.0)]);
        let layers = Layers(vec![vec![0]]);
        let placement = assign_coordinates(&graph, &layers, &LayoutConfig::default());
        assert_eq!(placement.rects[0].width, 60.0);
        assert_eq!(placement.rects[0].height, 40.0);
    }

    #[test]
    fn stacked_blocks_keep_block_spacing() {
        let graph = graph_with_sizes(&[(60.0, 40.0), (60.0, 70.0), (60.0, 40.0)]);
        let layers = Layers(vec![vec![2, 0, 1]]);
        let config = LayoutConfig::default();
        let placement = assign_coordinates(&graph, &layers, &config);
        let order = [2usize, 0, 1];
        for pair in order.windows(2) {
            let upper = placement.rects[pair[0]];
            let lower = placement.rects[pair[1]];
            assert!(lower.y - upper.bottom() >= config.block_spacing - 1e-3);
        }
        assert_eq!(placement.rects[2].y, config.margin);
    }

    #[test]
    fn shorter_layers_are_centred_in_tallest() {
        let graph = graph_with_sizes(&[(60.0, 40.0), (60.0, 40.0), (60.0, 40.0)]);
        let layers = Layers(vec![vec![0, 1], vec![2]]);
        let config = LayoutConfig::default();
        let placement = assign_coordinates(&graph, &layers, &config);
        assert_eq!(placement.content_height, 130.0);
        let top_pad = placement.rects[2].y - config.margin;
        let bottom_pad = config.margin + placement.content_height - placement.rects[2].bottom();
        assert!((top_pad - bottom_pad).abs() < 1e-3);
        assert_eq!(placement.rects[2].y, 95.0);
    }

    #[test]
    fn narrow_blocks_are_centred_in_their_column() {
        let graph = graph_with_sizes(&[(120.0, 40.0), (60.0, 40.0)]);
        let layers = Layers(vec![vec![0, 1]]);
        let placement = assign_coordinates(&graph, &layers, &LayoutConfig::default());
        assert_eq!(placement.layer_widths, vec![120.0]);
        assert_eq!(placement.rects[1].x, 80.0);
    }
}
