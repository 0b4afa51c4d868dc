//! Scheduler configuration: capacities, pacing, initial batch and generator.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::source::GeneratorConfig;
use crate::core::{AppResult, TaskSpec};
use crate::util::serde::{Quantity, ResourceKind, Resources, TaskKind};

/// Environment variable naming a JSON config file.
pub const ENV_CONFIG_PATH: &str = "STARSHIP_CONFIG";
/// Environment override for the energy capacity.
pub const ENV_ENERGY: &str = "STARSHIP_ENERGY";
/// Environment override for the fuel capacity.
pub const ENV_FUEL: &str = "STARSHIP_FUEL";
/// Environment override for the oxygen capacity.
pub const ENV_OXYGEN: &str = "STARSHIP_OXYGEN";
/// Environment override for the tick interval in milliseconds.
pub const ENV_TICK_MS: &str = "STARSHIP_TICK_MS";

const fn default_tick_interval_ms() -> u64 {
    1_000
}

const fn default_max_queue_depth() -> usize {
    10_000
}

const fn default_audit_capacity() -> usize {
    1_024
}

const fn default_registry_capacity() -> usize {
    10_000
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fixed capacity of each resource.
    pub capacity: Resources,
    /// Starting levels; defaults to full capacity.
    #[serde(default)]
    pub initial_levels: Option<Resources>,
    /// Wall-clock length of one tick in milliseconds. Zero means no sleeping.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Maximum queued tasks before submissions are refused.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// Number of audit events retained for observers.
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
    /// Number of tasks kept for lookup; the oldest finished tasks are
    /// forgotten first.
    #[serde(default = "default_registry_capacity")]
    pub registry_capacity: usize,
    /// Tasks queued when the scheduler starts.
    #[serde(default)]
    pub initial_tasks: Vec<TaskSpec>,
    /// Optional synthetic traffic.
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity: Resources::units(200, 100, 80),
            initial_levels: None,
            tick_interval_ms: default_tick_interval_ms(),
            max_queue_depth: default_max_queue_depth(),
            audit_capacity: default_audit_capacity(),
            registry_capacity: default_registry_capacity(),
            initial_tasks: Vec::new(),
            generator: None,
        }
    }
}

impl SchedulerConfig {
    /// Default capacities with the stock seven-task mission batch.
    #[must_use]
    pub fn sample_mission() -> Self {
        let spec = |kind, priority, e, f, o, duration| {
            TaskSpec::new(kind, priority, Resources::units(e, f, o), duration)
        };
        Self {
            initial_tasks: vec![
                spec(TaskKind::Communication, 3, 10, 20, 30, 6),
                spec(TaskKind::LifeResearch, 5, 15, 10, 5, 3),
                spec(TaskKind::SampleCollection, 4, 20, 30, 40, 9),
                spec(TaskKind::Communication, 2, 50, 20, 40, 4),
                spec(TaskKind::SampleCollection, 4, 20, 30, 40, 6),
                spec(TaskKind::SampleCollection, 4, 20, 30, 5, 9),
                spec(TaskKind::LifeResearch, 5, 15, 10, 5, 3),
            ],
            ..Self::default()
        }
    }

    /// Validate values and cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.initial_tasks.len() > self.max_queue_depth {
            return Err(format!(
                "{} initial tasks exceed max_queue_depth {}",
                self.initial_tasks.len(),
                self.max_queue_depth
            ));
        }
        if self.registry_capacity == 0 {
            return Err("registry_capacity must be greater than 0".into());
        }
        if let Some(levels) = &self.initial_levels {
            for kind in ResourceKind::ALL {
                if levels.get(kind) > self.capacity.get(kind) {
                    return Err(format!("initial {kind} level exceeds capacity"));
                }
            }
        }
        for (idx, task) in self.initial_tasks.iter().enumerate() {
            task.validate()
                .map_err(|e| format!("initial task #{idx} invalid: {e}"))?;
        }
        if let Some(generator) = &self.generator {
            generator
                .validate()
                .map_err(|e| format!("generator invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, parsed or validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&raw).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file is honoured if present. `STARSHIP_CONFIG` selects a JSON
    /// file, otherwise [`SchedulerConfig::sample_mission`] is used; the
    /// capacity and tick variables then override individual fields.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files, malformed overrides or invalid results.
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => Self::from_json_file(path)?,
            Err(_) => Self::sample_mission(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(cfg)
    }

    /// Apply capacity and tick overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Fails if an override value does not parse or is not a valid amount.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, kind) in [
            (ENV_ENERGY, ResourceKind::Energy),
            (ENV_FUEL, ResourceKind::Fuel),
            (ENV_OXYGEN, ResourceKind::Oxygen),
        ] {
            if let Some(raw) = lookup(key) {
                let units: f64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{key}={raw} is not a number"))?;
                *self.capacity.get_mut(kind) = Quantity::try_from(units)
                    .with_context(|| format!("{key}={raw} is not a valid capacity"))?;
            }
        }
        if let Some(raw) = lookup(ENV_TICK_MS) {
            self.tick_interval_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TICK_MS}={raw} is not an integer"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_sample_mission_is_valid() {
        let cfg = SchedulerConfig::sample_mission();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.initial_tasks.len(), 7);
        assert_eq!(cfg.capacity, Resources::units(200, 100, 80));
    }

    #[test]
    fn test_overrides_apply() {
        let vars: HashMap<&str, &str> =
            [(ENV_ENERGY, "50"), (ENV_OXYGEN, "12.5"), (ENV_TICK_MS, "0")].into();
        let mut cfg = SchedulerConfig::default();
        cfg.apply_overrides(|k| vars.get(k).map(ToString::to_string))
            .unwrap();
        assert_eq!(cfg.capacity.energy, Quantity::units(50));
        assert_eq!(cfg.capacity.fuel, Quantity::units(100));
        assert_eq!(cfg.capacity.oxygen, Quantity::from_millis(12_500));
        assert_eq!(cfg.tick_interval_ms, 0);
    }

    #[test]
    fn test_bad_override_is_error() {
        let mut cfg = SchedulerConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == ENV_FUEL).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_FUEL));
    }

    #[test]
    fn test_negative_override_rejected() {
        let mut cfg = SchedulerConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == ENV_ENERGY).then(|| "-5".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_ENERGY));
        assert_eq!(cfg.capacity.energy, Quantity::units(200));
    }

    #[test]
    fn test_negative_amounts_in_json_rejected() {
        let capacity = r#"{ "capacity": { "energy": -100, "fuel": 1, "oxygen": 1 } }"#;
        assert!(SchedulerConfig::from_json_str(capacity).is_err());

        let requirement = r#"{
            "capacity": { "energy": 100, "fuel": 100, "oxygen": 100 },
            "initial_tasks": [
                { "kind": "navigation", "priority": 1,
                  "requirements": { "energy": -50, "fuel": 1, "oxygen": 1 }, "duration": 2 }
            ]
        }"#;
        let err = SchedulerConfig::from_json_str(requirement).unwrap_err();
        assert!(err.contains("invalid quantity"));
    }

    #[test]
    fn test_initial_batch_larger_than_queue_rejected() {
        let cfg = SchedulerConfig {
            max_queue_depth: 1,
            ..SchedulerConfig::sample_mission()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("max_queue_depth"));
    }

    #[test]
    fn test_initial_levels_over_capacity_rejected() {
        let cfg = SchedulerConfig {
            initial_levels: Some(Resources::units(500, 0, 0)),
            ..SchedulerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
