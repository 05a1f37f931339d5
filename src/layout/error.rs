use thiserror::Error;

use super::types::{EdgeIndex, LayoutStage};

/// A node or edge that could not be read from the snapshot.
///
/// These are recovered locally: the entity is skipped and the rest of the
/// graph is laid out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("block with empty id at position {position} skipped")]
    EmptyNodeId { position: usize },
    #[error("duplicate block id `{id}` skipped")]
    DuplicateNode { id: String },
    #[error("block `{id}` has invalid size {width}x{height}")]
    InvalidNodeSize { id: String, width: f32, height: f32 },
    #[error("line `{edge}` references unknown block `{node}`")]
    UnknownEndpoint { edge: String, node: String },
    #[error("line `{edge}` uses port {port} of block `{node}` which has {available} ports")]
    PortOutOfRange {
        edge: String,
        node: String,
        port: usize,
        available: usize,
    },
}

/// Failure reported by the host while producing a snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("diagram host unavailable: {0}")]
    Unavailable(String),
    #[error("diagram host returned malformed data: {0}")]
    Malformed(String),
}

/// Fatal for the current request; the applier is never reached.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("invalid layout setting `{field}`: {value}")]
    InvalidConfig { field: &'static str, value: f32 },
    #[error("layer relaxation exceeded {limit} steps (cycle left unbroken?)")]
    RelaxationLimit { limit: usize },
    #[error("edge {edge} still points backwards after cycle breaking")]
    UnbrokenCycle { edge: EdgeIndex },
    #[error("stage {requested:?} cannot run while pipeline is {current:?}")]
    StageOrder {
        requested: LayoutStage,
        current: LayoutStage,
    },
    #[error(transparent)]
    Host(#[from] HostError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Block,
    Line,
}

/// An entity the host refused to update.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{kind:?} `{id}` not applied: {reason}")]
pub struct FailedEntity {
    pub kind: EntityKind,
    pub id: String,
    pub reason: String,
}

impl FailedEntity {
    pub fn block(id: &str, reason: &str) -> Self {
        Self {
            kind: EntityKind::Block,
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn line(id: &str, reason: &str) -> Self {
        Self {
            kind: EntityKind::Line,
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}
