//! Layered left-to-right layout of block diagrams.
//!
//! Stages run strictly in order: graph extraction, layer assignment, crossing
//! reduction, coordinate assignment, wire routing. Only the final application
//! step talks to the host's mutable model.

mod error;
mod graph;
mod ordering;
mod placement;
mod ranking;
mod routing;
pub(crate) mod types;
pub use error::*;
pub use graph::{Extraction, LayoutEdge, LayoutGraph, LayoutNode, extract_graph};
pub use ordering::{count_crossings, minimize_crossings};
pub use placement::assign_coordinates;
pub use ranking::{assign_layers, find_feedback_edges, group_by_layer};
pub use routing::{
    is_orthogonal, path_bend_count, path_length, port_position, route_feedback, route_forward,
    route_wires, shared_length,
};
pub use types::*;

use crate::config::{LayoutConfig, SpacingOptions};
use crate::host::DiagramHost;
use crate::ir::GraphSnapshot;

/// State of one layout request. Outputs of completed stages stay readable
/// after a later stage fails.
#[derive(Debug, Clone)]
pub struct LayoutPipeline {
    config: LayoutConfig,
    stage: LayoutStage,
    extraction: Option<Extraction>,
    assignment: Option<LayerAssignment>,
    ordering: Option<CrossingReduction>,
    placement: Option<Placement>,
    routes: Option<Vec<WireRoute>>,
}

impl LayoutPipeline {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            stage: LayoutStage::Idle,
            extraction: None,
            assignment: None,
            ordering: None,
            placement: None,
            routes: None,
        }
    }

    pub fn stage(&self) -> LayoutStage {
        self.stage
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn extraction(&self) -> Option<&Extraction> {
        self.extraction.as_ref()
    }

    pub fn assignment(&self) -> Option<&LayerAssignment> {
        self.assignment.as_ref()
    }

    pub fn ordering(&self) -> Option<&CrossingReduction> {
        self.ordering.as_ref()
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub fn routes(&self) -> Option<&[WireRoute]> {
        self.routes.as_deref()
    }

    fn require(&self, requested: LayoutStage, required: LayoutStage) -> Result<(), LayoutError> {
        if self.stage == required {
            Ok(())
        } else {
            Err(self.out_of_order(requested))
        }
    }

    fn out_of_order(&self, requested: LayoutStage) -> LayoutError {
        LayoutError::StageOrder {
            requested,
            current: self.stage,
        }
    }

    pub fn extract(&mut self, snapshot: &GraphSnapshot) -> Result<&Extraction, LayoutError> {
        self.require(LayoutStage::Extracted, LayoutStage::Idle)?;
        if let Err(err) = self.config.validate() {
            self.stage = LayoutStage::Failed;
            return Err(err);
        }
        let extraction = extract_graph(snapshot);
        self.stage = LayoutStage::Extracted;
        Ok(&*self.extraction.insert(extraction))
    }

    pub fn assign_layers(&mut self) -> Result<&LayerAssignment, LayoutError> {
        self.require(LayoutStage::Layered, LayoutStage::Extracted)?;
        let Some(extraction) = self.extraction.as_ref() else {
            return Err(self.out_of_order(LayoutStage::Layered));
        };
        match assign_layers(&extraction.graph, &self.config) {
            Ok(assignment) => {
                self.stage = LayoutStage::Layered;
                Ok(&*self.assignment.insert(assignment))
            }
            Err(err) => {
                self.stage = LayoutStage::Failed;
                Err(err)
            }
        }
    }

    pub fn minimize_crossings(&mut self) -> Result<&CrossingReduction, LayoutError> {
        self.require(LayoutStage::CrossingsMinimized, LayoutStage::Layered)?;
        let (Some(extraction), Some(assignment)) = (&self.extraction, &self.assignment) else {
            return Err(self.out_of_order(LayoutStage::CrossingsMinimized));
        };
        let ordering = minimize_crossings(&extraction.graph, assignment, &self.config);
        self.stage = LayoutStage::CrossingsMinimized;
        Ok(&*self.ordering.insert(ordering))
    }

    pub fn assign_coordinates(&mut self) -> Result<&Placement, LayoutError> {
        self.require(LayoutStage::Coordinated, LayoutStage::CrossingsMinimized)?;
        let (Some(extraction), Some(ordering)) = (&self.extraction, &self.ordering) else {
            return Err(self.out_of_order(LayoutStage::Coordinated));
        };
        let placement = assign_coordinates(&extraction.graph, &ordering.layers, &self.config);
        self.stage = LayoutStage::Coordinated;
        Ok(&*self.placement.insert(placement))
    }

    pub fn route_wires(&mut self) -> Result<&[WireRoute], LayoutError> {
        self.require(LayoutStage::Routed, LayoutStage::Coordinated)?;
        let (Some(extraction), Some(assignment), Some(placement)) =
            (&self.extraction, &self.assignment, &self.placement)
        else {
            return Err(self.out_of_order(LayoutStage::Routed));
        };
        let routes = route_wires(&extraction.graph, assignment, placement, &self.config);
        self.stage = LayoutStage::Routed;
        Ok(self.routes.insert(routes).as_slice())
    }

    /// Runs every stage up to routing and returns the computed layout.
    pub fn run(&mut self, snapshot: &GraphSnapshot) -> Result<Layout, LayoutError> {
        self.extract(snapshot)?;
        self.assign_layers()?;
        self.minimize_crossings()?;
        self.assign_coordinates()?;
        self.route_wires()?;
        self.layout()
            .ok_or_else(|| self.out_of_order(LayoutStage::Routed))
    }

    /// The computed layout, once routing has completed.
    pub fn layout(&self) -> Option<Layout> {
        if !matches!(self.stage, LayoutStage::Routed | LayoutStage::Applied) {
            return None;
        }
        let extraction = self.extraction.as_ref()?;
        let assignment = self.assignment.as_ref()?;
        let ordering = self.ordering.as_ref()?;
        let placement = self.placement.as_ref()?;
        let routes = self.routes.as_ref()?;
        Some(Layout {
            graph: extraction.graph.clone(),
            warnings: extraction.warnings.clone(),
            assignment: assignment.clone(),
            ordering: ordering.clone(),
            placement: placement.clone(),
            routes: routes.clone(),
            plan: build_plan(&extraction.graph, placement, routes),
        })
    }

    /// Hands the routed layout to the host. Never called with partial data.
    pub fn apply<H: DiagramHost + ?Sized>(&mut self, host: &mut H) -> Result<ApplyReport, LayoutError> {
        self.require(LayoutStage::Applied, LayoutStage::Routed)?;
        let (Some(extraction), Some(placement), Some(routes)) =
            (&self.extraction, &self.placement, &self.routes)
        else {
            return Err(self.out_of_order(LayoutStage::Applied));
        };
        let plan = build_plan(&extraction.graph, placement, routes);
        let report = apply_layout(host, &plan);
        self.stage = LayoutStage::Applied;
        Ok(report)
    }
}

/// Positions and routes keyed by node/edge index, in index order.
pub fn build_plan(graph: &LayoutGraph, placement: &Placement, routes: &[WireRoute]) -> LayoutPlan {
    let nodes = graph
        .nodes
        .iter()
        .map(|node| PlannedNode {
            index: node.index,
            id: node.id.clone(),
            rect: placement.rects[node.index],
        })
        .collect();
    let edges = routes
        .iter()
        .map(|route| PlannedEdge {
            index: route.edge,
            id: graph.edges[route.edge].id.clone(),
            points: route.points.clone(),
        })
        .collect();
    LayoutPlan { nodes, edges }
}

/// Computes a layout without touching any host.
pub fn compute_layout(snapshot: &GraphSnapshot, config: &LayoutConfig) -> Result<Layout, LayoutError> {
    LayoutPipeline::new(config.clone()).run(snapshot)
}

/// Commits a plan to the host. Per-entity failures are reported, not retried.
pub fn apply_layout<H: DiagramHost + ?Sized>(host: &mut H, plan: &LayoutPlan) -> ApplyReport {
    let report = host.apply_layout(plan);
    for failed in &report.failed {
        log::warn!("apply: {failed}");
    }
    report
}

/// Reads the host diagram, lays it out and applies the result.
///
/// Any stage error aborts before the host is modified. Entities the host
/// rejects are listed in `failed_entities`; `success` is false if any were.
pub fn optimize<H: DiagramHost + ?Sized>(
    host: &mut H,
    config: &LayoutConfig,
    spacing: Option<&SpacingOptions>,
) -> Result<LayoutResult, LayoutError> {
    optimize_with_layout(host, config, spacing).map(|(_, result)| result)
}

/// Same as [`optimize`], also returning the layout that was applied.
pub fn optimize_with_layout<H: DiagramHost + ?Sized>(
    host: &mut H,
    config: &LayoutConfig,
    spacing: Option<&SpacingOptions>,
) -> Result<(Layout, LayoutResult), LayoutError> {
    let config = match spacing {
        Some(spacing) => config.with_spacing(spacing),
        None => config.clone(),
    };
    let snapshot = host.read_graph()?;

    let mut pipeline = LayoutPipeline::new(config);
    let layout = match pipeline.run(&snapshot) {
        Ok(layout) => layout,
        Err(err) => {
            log::error!("layout aborted (stage {:?}): {err}", pipeline.stage());
            return Err(err);
        }
    };
    let report = pipeline.apply(host)?;
    let result = summarize(&layout, report);
    log::info!("{}", result.message);
    Ok((layout, result))
}

fn summarize(layout: &Layout, report: ApplyReport) -> LayoutResult {
    let success = report.is_complete();
    let mut message = format!(
        "Laid out {} blocks and {} lines in {} layers with {} crossings",
        layout.graph.node_count(),
        layout.graph.edge_count(),
        layout.ordering.layers.len(),
        layout.ordering.crossings
    );
    if !layout.warnings.is_empty() {
        message.push_str(&format!(", {} entities skipped", layout.warnings.len()));
    }
    if !success {
        message.push_str(&format!(", {} entities not applied", report.failed.len()));
    }
    LayoutResult {
        success,
        message,
        crossing_count: layout.ordering.crossings,
        initial_crossing_count: layout.ordering.initial_crossings,
        blocks_processed: layout.graph.node_count(),
        edges_processed: layout.graph.edge_count(),
        layer_count: layout.ordering.layers.len(),
        failed_entities: report.failed,
        warnings: layout.warnings.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::ir::{EdgeDescriptor, NodeDescriptor};

    fn chain() -> GraphSnapshot {
        let mut snapshot = GraphSnapshot::new();
        snapshot.nodes.push(NodeDescriptor::new("A", 60.0, 40.0, 0, 1));
        snapshot.nodes.push(NodeDescriptor::new("B", 60.0, 40.0, 1, 1));
        snapshot.nodes.push(NodeDescriptor::new("C", 60.0, 40.0, 1, 0));
        snapshot
            .edges
            .push(EdgeDescriptor::new("ab", ("A", 1), ("B", 1)));
        snapshot
            .edges
            .push(EdgeDescriptor::new("bc", ("B", 1), ("C", 1)));
        snapshot
    }

    #[test]
    fn pipeline_walks_through_every_stage() {
        let mut pipeline = LayoutPipeline::new(LayoutConfig::default());
        assert_eq!(pipeline.stage(), LayoutStage::Idle);
        pipeline.extract(&chain()).unwrap();
        assert_eq!(pipeline.stage(), LayoutStage::Extracted);
        pipeline.assign_layers().unwrap();
        pipeline.minimize_crossings().unwrap();
        pipeline.assign_coordinates().unwrap();
        assert_eq!(pipeline.route_wires().unwrap().len(), 2);
        assert_eq!(pipeline.stage(), LayoutStage::Routed);

        let mut host = MemoryHost::new(chain());
        let report = pipeline.apply(&mut host).unwrap();
        assert!(report.is_complete());
        assert_eq!(pipeline.stage(), LayoutStage::Applied);
    }

    #[test]
    fn stages_cannot_be_skipped() {
        let mut pipeline = LayoutPipeline::new(LayoutConfig::default());
        let err = pipeline.assign_coordinates().unwrap_err();
        assert_eq!(
            err,
            LayoutError::StageOrder {
                requested: LayoutStage::Coordinated,
                current: LayoutStage::Idle
            }
        );
        let mut host = MemoryHost::new(chain());
        assert!(pipeline.apply(&mut host).is_err());
        assert!(host.snapshot().nodes.iter().all(|n| n.position.is_none()));
    }

    #[test]
    fn invalid_config_fails_before_extraction_output() {
        let config = LayoutConfig {
            layer_spacing: -1.0,
            ..Default::default()
        };
        let mut pipeline = LayoutPipeline::new(config);
        assert!(pipeline.extract(&chain()).is_err());
        assert_eq!(pipeline.stage(), LayoutStage::Failed);
        assert!(pipeline.extraction().is_none());
        assert!(pipeline.assign_layers().is_err());
    }

    #[test]
    fn optimize_reports_summary() {
        let mut host = MemoryHost::new(chain());
        let result = optimize(&mut host, &LayoutConfig::default(), None).unwrap();
        assert!(result.success);
        assert_eq!(result.blocks_processed, 3);
        assert_eq!(result.edges_processed, 2);
        assert_eq!(result.layer_count, 3);
        assert_eq!(result.crossing_count, 0);
        assert!(result.message.starts_with("Laid out 3 blocks and 2 lines"));
        let applied = host.snapshot();
        assert!(applied.nodes.iter().all(|n| n.position.is_some()));
        assert!(applied.edges.iter().all(|e| e.points.len() >= 2));
    }

    #[test]
    fn optimize_applies_spacing_overrides() {
        let mut host = MemoryHost::new(chain());
        let spacing = SpacingOptions {
            layer_spacing: Some(300.0),
            ..Default::default()
        };
        optimize(&mut host, &LayoutConfig::default(), Some(&spacing)).unwrap();
        let a = host.snapshot().node("A").and_then(|n| n.position).unwrap();
        let b = host.snapshot().node("B").and_then(|n| n.position).unwrap();
        assert_eq!(b[0] - (a[0] + a[2]), 300.0);
    }

    #[test]
    fn host_read_failure_aborts() {
        let mut host = MemoryHost::new(chain());
        host.set_offline(true);
        let err = optimize(&mut host, &LayoutConfig::default(), None).unwrap_err();
        assert!(matches!(err, LayoutError::Host(HostError::Unavailable(_))));
    }

    #[test]
    fn optimize_with_layout_returns_the_applied_layout() {
        let mut host = MemoryHost::new(chain());
        let (layout, result) =
            optimize_with_layout(&mut host, &LayoutConfig::default(), None).unwrap();
        assert_eq!(result.layer_count, layout.ordering.layers.len());
        for planned in &layout.plan.nodes {
            let applied = host.snapshot().node(&planned.id).and_then(|n| n.position);
            assert_eq!(applied, Some(planned.rect.as_array()));
        }
    }
}
