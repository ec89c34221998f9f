//! Configuration types for loading simulation settings from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of the
//! settings a run starts from. A settings file consists of:
//!
//! - [`SimulationConfig`] – scenario mode, population size and seed
//! - [`ParametersConfig`] – time stepping, gravity and tree parameters
//! - [`CollisionConfig`]  – collision switch and response
//! - [`ToolConfig`]       – interactive tool state
//! - [`SettingsConfig`]   – top-level wrapper
//!
//! Every section and field is optional; anything left out keeps the value
//! from [`SimulationSettings::default`].
//!
//! # YAML format
//!
//! ```yaml
//! simulation:
//!   mode: "accretion_disk"   # galaxy | accretion_disk | burst | cloud
//!   particle_count: 20000
//!   seed: 7
//!
//! parameters:
//!   time_step: 0.005
//!   damping: 0.0
//!   gravity_g: 1.0
//!   softening: 0.01
//!   theta: 0.7
//!   rebuild_every_n: 2
//!   max_leaf_size: 8
//!
//! collisions:
//!   enabled: true
//!   restitution: 0.9
//!   cell_scale: 2.5
//!
//! tool:
//!   kind: "attract"          # none | attract | repel | drag
//!   center: [0.0, 0.0, 0.0]
//!   radius: 50.0
//!   strength: 1000.0
//!   engaged: false
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::simulation::settings::{InteractionTool, SimulationMode, SimulationSettings};
use crate::simulation::states::NVec3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    pub mode: Option<SimulationMode>,
    pub particle_count: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ParametersConfig {
    pub time_step: Option<f64>,
    pub damping: Option<f64>,
    pub gravity_g: Option<f64>,
    pub softening: Option<f64>,
    pub theta: Option<f64>,
    pub rebuild_every_n: Option<usize>,
    pub max_leaf_size: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct CollisionConfig {
    pub enabled: Option<bool>,
    pub restitution: Option<f64>,
    pub cell_scale: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    pub kind: Option<InteractionTool>,
    pub center: Option<[f64; 3]>,
    pub radius: Option<f64>,
    pub strength: Option<f64>,
    pub engaged: Option<bool>,
}

/// Top-level settings file
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct SettingsConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub collisions: CollisionConfig,
    #[serde(default)]
    pub tool: ToolConfig,
}

impl SettingsConfig {
    /// Parse a YAML document
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overlay the given fields on the defaults and validate the result
    pub fn into_settings(self) -> Result<SimulationSettings, ConfigError> {
        let mut s = SimulationSettings::default();

        let sim = self.simulation;
        if let Some(mode) = sim.mode { s.mode = mode; }
        if let Some(n) = sim.particle_count { s.particle_count = n; }
        if let Some(seed) = sim.seed { s.seed = seed; }

        let p = self.parameters;
        if let Some(dt) = p.time_step { s.time_step = dt; }
        if let Some(d) = p.damping { s.damping = d; }
        if let Some(g) = p.gravity_g { s.gravity_g = g; }
        if let Some(eps) = p.softening { s.softening = eps; }
        if let Some(theta) = p.theta { s.theta = theta; }
        if let Some(n) = p.rebuild_every_n { s.rebuild_every_n = n; }
        if let Some(n) = p.max_leaf_size { s.max_leaf_size = n; }

        let c = self.collisions;
        if let Some(on) = c.enabled { s.collisions = on; }
        if let Some(e) = c.restitution { s.restitution = e; }
        if let Some(scale) = c.cell_scale { s.collision_cell_scale = scale; }

        let t = self.tool;
        if let Some(kind) = t.kind { s.tool.kind = kind; }
        if let Some([x, y, z]) = t.center { s.tool.center = NVec3::new(x, y, z); }
        if let Some(r) = t.radius { s.tool.radius = r; }
        if let Some(k) = t.strength { s.tool.strength = k; }
        if let Some(on) = t.engaged { s.tool.engaged = on; }

        validate(&s)?;
        Ok(s)
    }
}

/// Read, parse and validate a settings file
pub fn load_settings(path: impl AsRef<Path>) -> Result<SimulationSettings, ConfigError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: SettingsConfig = serde_yaml::from_reader(BufReader::new(file))?;
    cfg.into_settings()
}

/// Reject settings that describe no meaningful simulation
pub fn validate(s: &SimulationSettings) -> Result<(), ConfigError> {
    let finite = [
        ("time_step", s.time_step),
        ("damping", s.damping),
        ("gravity_g", s.gravity_g),
        ("softening", s.softening),
        ("theta", s.theta),
        ("restitution", s.restitution),
        ("cell_scale", s.collision_cell_scale),
        ("tool.radius", s.tool.radius),
        ("tool.strength", s.tool.strength),
        ("tool.center.x", s.tool.center.x),
        ("tool.center.y", s.tool.center.y),
        ("tool.center.z", s.tool.center.z),
    ];
    for (field, value) in finite {
        if !value.is_finite() {
            return Err(invalid(field, format!("must be finite, got {value}")));
        }
    }

    if s.time_step < 0.0 {
        return Err(invalid("time_step", "must not be negative".into()));
    }
    if !(0.0..=1.0).contains(&s.damping) {
        return Err(invalid("damping", format!("must be within [0, 1], got {}", s.damping)));
    }
    if s.softening < 0.0 {
        return Err(invalid("softening", "must not be negative".into()));
    }
    if s.theta < 0.0 {
        return Err(invalid("theta", "must not be negative".into()));
    }
    if !(0.0..=1.0).contains(&s.restitution) {
        return Err(invalid("restitution", format!("must be within [0, 1], got {}", s.restitution)));
    }
    if s.collision_cell_scale <= 0.0 {
        return Err(invalid("cell_scale", "must be positive".into()));
    }
    if s.rebuild_every_n == 0 {
        return Err(invalid("rebuild_every_n", "must be at least 1".into()));
    }
    if s.max_leaf_size == 0 {
        return Err(invalid("max_leaf_size", "must be at least 1".into()));
    }
    if s.tool.radius < 0.0 {
        return Err(invalid("tool.radius", "must not be negative".into()));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let s = SettingsConfig::from_yaml("{}").and_then(SettingsConfig::into_settings).unwrap();
        assert_eq!(s, SimulationSettings::default());
    }

    #[test]
    fn sections_override_defaults() {
        let yaml = r#"
simulation:
  mode: "accretion_disk"
  particle_count: 500
  seed: 9
parameters:
  theta: 0.5
  rebuild_every_n: 3
collisions:
  enabled: true
  restitution: 0.25
tool:
  kind: "drag"
  center: [1.0, 2.0, 3.0]
  engaged: true
"#;
        let s = SettingsConfig::from_yaml(yaml).and_then(SettingsConfig::into_settings).unwrap();
        assert_eq!(s.mode, SimulationMode::AccretionDisk);
        assert_eq!(s.particle_count, 500);
        assert_eq!(s.seed, 9);
        assert_eq!(s.theta, 0.5);
        assert_eq!(s.rebuild_every_n, 3);
        assert!(s.collisions);
        assert_eq!(s.restitution, 0.25);
        assert_eq!(s.tool.kind, InteractionTool::Drag);
        assert_eq!(s.tool.center, NVec3::new(1.0, 2.0, 3.0));
        assert!(s.tool.engaged);
        assert_eq!(s.time_step, SimulationSettings::default().time_step);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = SettingsConfig::from_yaml("simulation:\n  mode: \"nebula\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let err = SettingsConfig::from_yaml("parameters:\n  thetta: 0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for yaml in [
            "parameters:\n  rebuild_every_n: 0\n",
            "parameters:\n  damping: 1.5\n",
            "parameters:\n  time_step: -0.1\n",
            "parameters:\n  theta: .nan\n",
            "collisions:\n  restitution: 2.0\n",
            "collisions:\n  cell_scale: 0.0\n",
        ] {
            let err = SettingsConfig::from_yaml(yaml).and_then(SettingsConfig::into_settings).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{yaml}");
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_settings("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("not/here.yaml"));
    }
}
