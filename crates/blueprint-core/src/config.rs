//! Pipeline configuration.
//!
//! Defaults are fixed constants; [`PipelineConfig::from_env`] overlays the
//! `BLUEPRINT_*` environment variables on top of them.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sampling temperature per stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageTemperatures {
    pub overview: f32,
    pub primary: f32,
    pub relationship: f32,
    pub recommendation: f32,
    pub specialized: f32,
    pub repair: f32,
}

impl Default for StageTemperatures {
    fn default() -> Self {
        Self {
            overview: 0.2,
            primary: 0.2,
            relationship: 0.2,
            recommendation: 0.2,
            specialized: 0.3,
            repair: 0.1,
        }
    }
}

/// Configuration shared by every run of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Mermaid renderer executable
    pub renderer_command: String,
    pub renderer_timeout_secs: u64,
    /// Upper bound for a single generation call
    pub generation_timeout_secs: u64,
    /// Route stage calls through grounded generation
    pub use_grounding: bool,
    /// Max specialized diagrams generated at once (1 = sequential)
    pub specialized_concurrency: usize,
    /// Where design documents are written
    pub output_dir: PathBuf,
    /// Where markdown execution logs are written
    pub log_dir: PathBuf,
    pub temperatures: StageTemperatures,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            renderer_command: "mmdc".to_string(),
            renderer_timeout_secs: 30,
            generation_timeout_secs: 180,
            use_grounding: true,
            specialized_concurrency: 1,
            output_dir: PathBuf::from("architectures"),
            log_dir: PathBuf::from("execution_plans"),
            temperatures: StageTemperatures::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            renderer_command: lookup("BLUEPRINT_RENDERER")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.renderer_command),
            renderer_timeout_secs: parsed("BLUEPRINT_RENDERER_TIMEOUT_SECS")
                .unwrap_or(defaults.renderer_timeout_secs),
            generation_timeout_secs: parsed("BLUEPRINT_GENERATION_TIMEOUT_SECS")
                .unwrap_or(defaults.generation_timeout_secs),
            use_grounding: lookup("BLUEPRINT_USE_GROUNDING")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.use_grounding),
            specialized_concurrency: parsed("BLUEPRINT_SPECIALIZED_CONCURRENCY")
                .map(|n| n.max(1) as usize)
                .unwrap_or(defaults.specialized_concurrency),
            output_dir: lookup("BLUEPRINT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            log_dir: lookup("BLUEPRINT_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            temperatures: defaults.temperatures,
        }
    }

    pub fn renderer_timeout(&self) -> Duration {
        Duration::from_secs(self.renderer_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.renderer_command, "mmdc");
        assert_eq!(config.renderer_timeout_secs, 30);
        assert_eq!(config.generation_timeout_secs, 180);
        assert!(config.use_grounding);
        assert_eq!(config.specialized_concurrency, 1);
        assert_eq!(config.temperatures.repair, 0.1);
        assert_eq!(config.temperatures.specialized, 0.3);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BLUEPRINT_RENDERER", "/opt/mmdc"),
            ("BLUEPRINT_GENERATION_TIMEOUT_SECS", "5"),
            ("BLUEPRINT_USE_GROUNDING", "off"),
            ("BLUEPRINT_SPECIALIZED_CONCURRENCY", "0"),
            ("BLUEPRINT_OUTPUT_DIR", "out"),
        ]
        .into_iter()
        .collect();
        let config = PipelineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.renderer_command, "/opt/mmdc");
        assert_eq!(config.generation_timeout_secs, 5);
        assert!(!config.use_grounding);
        assert_eq!(config.specialized_concurrency, 1);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.log_dir, PathBuf::from("execution_plans"));
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let config = PipelineConfig::from_lookup(|k| match k {
            "BLUEPRINT_RENDERER_TIMEOUT_SECS" => Some("soon".to_string()),
            "BLUEPRINT_USE_GROUNDING" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.renderer_timeout_secs, 30);
        assert!(config.use_grounding);
    }
}
