//! Editor configuration using Figment
//!
//! Settings are layered from, lowest to highest priority:
//! 1. built-in defaults
//! 2. an optional TOML file (`workflow_editor.toml` unless a path is given)
//! 3. environment variables prefixed with `WORKFLOW_EDITOR_`, with `__`
//!    separating nested keys
//!
//! # Example
//! ```no_run
//! use workflow_graph_editor::config::EditorConfig;
//!
//! // WORKFLOW_EDITOR_RENDER__PORT_RADIUS=8 overrides render.port_radius
//! let config = EditorConfig::load()?;
//! println!("grid every {} units", config.canvas.grid_spacing);
//! # Ok::<(), figment::Error>(())
//! ```

use crate::geometry::Size;
use crate::interaction::InteractionController;
use crate::render::RenderStyle;
use crate::simulator::SimulationMode;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "workflow_editor.toml";
pub const ENV_PREFIX: &str = "WORKFLOW_EDITOR_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas: CanvasConfig,
    pub render: RenderConfig,
    pub simulation: SimulationConfig,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Grid interval in world units
    pub grid_spacing: f32,
    pub show_grid: bool,
    /// Size of nodes dropped from the palette
    pub node_width: f32,
    pub node_height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Minimum time between repaints
    pub redraw_interval_ms: u64,
    /// Port radius in world units
    pub port_radius: f32,
    /// Extra pick tolerance around ports in screen pixels
    pub hit_slop_px: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// How long a node stays running in timed mode
    pub step_duration_ms: u64,
    pub mode: SimulationModeSetting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationModeSetting {
    #[default]
    Timed,
    External,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            render: RenderConfig::default(),
            simulation: SimulationConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_spacing: 20.0,
            show_grid: true,
            node_width: 180.0,
            node_height: 72.0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            redraw_interval_ms: 16,
            port_radius: 6.0,
            hit_slop_px: 4.0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_duration_ms: 500,
            mode: SimulationModeSetting::Timed,
        }
    }
}

impl EditorConfig {
    /// Load from `workflow_editor.toml` (if present) and the environment
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file path; a missing file leaves the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(EditorConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        let positive = [
            ("canvas.grid_spacing", self.canvas.grid_spacing),
            ("canvas.node_width", self.canvas.node_width),
            ("canvas.node_height", self.canvas.node_height),
            ("render.port_radius", self.render.port_radius),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("Invalid {key} {value}. Must be a positive number"));
            }
        }

        if !(self.render.hit_slop_px.is_finite() && self.render.hit_slop_px >= 0.0) {
            return Err(format!(
                "Invalid render.hit_slop_px {}. Must not be negative",
                self.render.hit_slop_px
            ));
        }
        if self.render.redraw_interval_ms == 0 {
            return Err("Invalid render.redraw_interval_ms 0. Must be at least 1".to_string());
        }
        if self.simulation.step_duration_ms == 0 {
            return Err("Invalid simulation.step_duration_ms 0. Must be at least 1".to_string());
        }

        Ok(())
    }

    pub fn node_size(&self) -> Size {
        Size::new(self.canvas.node_width, self.canvas.node_height)
    }

    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.render.redraw_interval_ms)
    }

    pub fn simulation_mode(&self) -> SimulationMode {
        match self.simulation.mode {
            SimulationModeSetting::Timed => {
                SimulationMode::Timed(Duration::from_millis(self.simulation.step_duration_ms))
            }
            SimulationModeSetting::External => SimulationMode::External,
        }
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            grid_spacing: self.canvas.grid_spacing,
            show_grid: self.canvas.show_grid,
            port_radius: self.render.port_radius,
        }
    }

    /// Interaction controller tuned to these settings
    pub fn controller(&self) -> InteractionController {
        InteractionController::new(self.render.port_radius, self.render.hit_slop_px)
            .with_node_size(self.node_size())
    }
}
