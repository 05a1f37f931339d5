#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod host;
pub mod ir;
pub mod layout;
pub mod layout_dump;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LayoutConfig, SpacingOptions, load_config};
pub use host::{DiagramHost, MemoryHost};
pub use ir::{DiagramInfo, EdgeDescriptor, GraphSnapshot, NodeDescriptor};
pub use layout::{
    Layout, LayoutError, LayoutPipeline, LayoutResult, apply_layout, assign_coordinates,
    assign_layers, compute_layout, extract_graph, minimize_crossings, optimize,
    optimize_with_layout, route_wires,
};
