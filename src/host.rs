//! Boundary to the diagram environment that owns the live model.

use std::collections::HashSet;

use crate::ir::GraphSnapshot;
use crate::layout::{ApplyReport, FailedEntity, HostError, LayoutPlan};

/// The host diagram: read once at the start of a request, written once at
/// the end. Implementations may reject individual entities on apply.
pub trait DiagramHost {
    fn read_graph(&self) -> Result<GraphSnapshot, HostError>;

    fn apply_layout(&mut self, plan: &LayoutPlan) -> ApplyReport;
}

/// Host backed by an owned snapshot.
///
/// Applied positions and routes are written back into the snapshot. Ids
/// marked stale behave like entities deleted after extraction.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    snapshot: GraphSnapshot,
    stale: HashSet<String>,
    offline: bool,
}

impl MemoryHost {
    pub fn new(snapshot: GraphSnapshot) -> Self {
        Self {
            snapshot,
            stale: HashSet::new(),
            offline: false,
        }
    }

    /// Builds a host from snapshot JSON.
    pub fn from_json(input: &str) -> Result<Self, HostError> {
        GraphSnapshot::from_json(input)
            .map(Self::new)
            .map_err(|err| HostError::Malformed(err.to_string()))
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> GraphSnapshot {
        self.snapshot
    }

    pub fn mark_stale(&mut self, id: &str) {
        self.stale.insert(id.to_string());
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }
}

impl DiagramHost for MemoryHost {
    fn read_graph(&self) -> Result<GraphSnapshot, HostError> {
        if self.offline {
            return Err(HostError::Unavailable("memory host is offline".to_string()));
        }
        Ok(self.snapshot.clone())
    }

    fn apply_layout(&mut self, plan: &LayoutPlan) -> ApplyReport {
        let mut report = ApplyReport::default();
        for planned in &plan.nodes {
            let target = self
                .snapshot
                .nodes
                .iter_mut()
                .find(|node| node.id == planned.id);
            match target {
                Some(node) if !self.stale.contains(&planned.id) => {
                    node.position = Some(planned.rect.as_array());
                }
                _ => report
                    .failed
                    .push(FailedEntity::block(&planned.id, "block no longer in diagram")),
            }
        }
        for planned in &plan.edges {
            let target = self
                .snapshot
                .edges
                .iter_mut()
                .find(|edge| edge.id == planned.id);
            match target {
                Some(edge) if !self.stale.contains(&planned.id) => {
                    edge.points = planned.points.iter().map(|&(x, y)| [x, y]).collect();
                }
                _ => report
                    .failed
                    .push(FailedEntity::line(&planned.id, "line no longer in diagram")),
            }
        }
        report
    }
}
