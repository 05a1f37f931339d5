use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::layout::LayoutError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Horizontal gap between the columns of adjacent layers.
    pub layer_spacing: f32,
    /// Vertical gap between stacked blocks of one layer.
    pub block_spacing: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    pub max_crossing_iterations: usize,
    /// Top and left margin of the diagram.
    pub margin: f32,
    /// Forward wires whose port delta is below this are drawn straight.
    pub straight_tolerance: f32,
    /// Feedback detour offset, as a fraction of `layer_spacing`.
    pub feedback_offset_ratio: f32,
    /// Scales the cap on layer relaxation steps (`nodes * nodes * factor`).
    pub relaxation_factor: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layer_spacing: 150.0,
            block_spacing: 50.0,
            min_node_width: 60.0,
            min_node_height: 40.0,
            max_crossing_iterations: 10,
            margin: 50.0,
            straight_tolerance: 5.0,
            feedback_offset_ratio: 0.25,
            relaxation_factor: 1,
        }
    }
}

impl LayoutConfig {
    pub fn with_spacing(&self, spacing: &SpacingOptions) -> Self {
        let mut config = self.clone();
        if let Some(v) = spacing.layer_spacing {
            config.layer_spacing = v;
        }
        if let Some(v) = spacing.block_spacing {
            config.block_spacing = v;
        }
        if let Some(v) = spacing.min_width {
            config.min_node_width = v;
        }
        if let Some(v) = spacing.min_height {
            config.min_node_height = v;
        }
        if let Some(v) = spacing.max_crossing_iterations {
            config.max_crossing_iterations = v;
        }
        config
    }

    pub fn feedback_offset(&self) -> f32 {
        self.layer_spacing * self.feedback_offset_ratio
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let non_negative = [
            ("blockSpacing", self.block_spacing),
            ("minNodeWidth", self.min_node_width),
            ("minNodeHeight", self.min_node_height),
            ("margin", self.margin),
            ("straightTolerance", self.straight_tolerance),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::InvalidConfig { field, value });
            }
        }
        if !self.layer_spacing.is_finite() || self.layer_spacing <= 0.0 {
            return Err(LayoutError::InvalidConfig {
                field: "layerSpacing",
                value: self.layer_spacing,
            });
        }
        // The detour corridor must stay inside the gap between layers.
        if !self.feedback_offset_ratio.is_finite()
            || self.feedback_offset_ratio <= 0.0
            || self.feedback_offset_ratio >= 0.5
        {
            return Err(LayoutError::InvalidConfig {
                field: "feedbackOffsetRatio",
                value: self.feedback_offset_ratio,
            });
        }
        if self.relaxation_factor == 0 {
            return Err(LayoutError::InvalidConfig {
                field: "relaxationFactor",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Per-invocation overrides, the optional `spacing` argument of `optimize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacingOptions {
    pub layer_spacing: Option<f32>,
    pub block_spacing: Option<f32>,
    pub min_width: Option<f32>,
    pub min_height: Option<f32>,
    pub max_crossing_iterations: Option<usize>,
}

impl SpacingOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layer_spacing: Option<f32>,
    block_spacing: Option<f32>,
    min_node_width: Option<f32>,
    min_node_height: Option<f32>,
    max_crossing_iterations: Option<usize>,
    margin: Option<f32>,
    straight_tolerance: Option<f32>,
    feedback_offset_ratio: Option<f32>,
    relaxation_factor: Option<usize>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<LayoutConfig> {
    let mut config = LayoutConfig::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(v) = parsed.layer_spacing {
        config.layer_spacing = v;
    }
    if let Some(v) = parsed.block_spacing {
        config.block_spacing = v;
    }
    if let Some(v) = parsed.min_node_width {
        config.min_node_width = v;
    }
    if let Some(v) = parsed.min_node_height {
        config.min_node_height = v;
    }
    if let Some(v) = parsed.max_crossing_iterations {
        config.max_crossing_iterations = v;
    }
    if let Some(v) = parsed.margin {
        config.margin = v;
    }
    if let Some(v) = parsed.straight_tolerance {
        config.straight_tolerance = v;
    }
    if let Some(v) = parsed.feedback_offset_ratio {
        config.feedback_offset_ratio = v;
    }
    if let Some(v) = parsed.relaxation_factor {
        config.relaxation_factor = v;
    }

    config.validate()?;
    Ok(config)
}
