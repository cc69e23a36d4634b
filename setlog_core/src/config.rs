//! Configuration file support for setlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/setlog/config.toml`.

use crate::ledger::{DecayModel, VolumePolicy};
use crate::suggest::SuggestionLimits;
use crate::{Error, Result, TrainingInterval};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub suggestions: SuggestionLimits,

    #[serde(default)]
    pub steps: StepsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Volume accounting configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Used for new libraries; an existing library keeps its own interval
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,

    #[serde(default)]
    pub policy: VolumePolicy,

    #[serde(default = "default_decay_start_fraction")]
    pub decay_start_fraction: f64,

    #[serde(default = "default_decay_length_fraction")]
    pub decay_length_fraction: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            interval_days: default_interval_days(),
            policy: VolumePolicy::default(),
            decay_start_fraction: default_decay_start_fraction(),
            decay_length_fraction: default_decay_length_fraction(),
        }
    }
}

impl TrainingConfig {
    pub fn interval(&self) -> Result<TrainingInterval> {
        TrainingInterval::new(self.interval_days)
            .map_err(|e| Error::Config(format!("[training] interval_days: {}", e)))
    }

    pub fn decay(&self) -> DecayModel {
        DecayModel {
            start_fraction: self.decay_start_fraction,
            length_fraction: self.decay_length_fraction,
        }
    }
}

/// Step goal configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepsConfig {
    #[serde(default = "default_daily_goal")]
    pub daily_goal: u32,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            daily_goal: default_daily_goal(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("setlog")
}

fn default_interval_days() -> u32 {
    7
}

fn default_decay_start_fraction() -> f64 {
    0.75
}

fn default_decay_length_fraction() -> f64 {
    0.5
}

fn default_daily_goal() -> u32 {
    10_000
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the engines cannot work with
    pub fn validate(&self) -> Result<()> {
        self.training.interval()?;

        let decay = self.training.decay();
        if !decay.start_fraction.is_finite()
            || decay.start_fraction < 0.0
            || !decay.length_fraction.is_finite()
            || decay.length_fraction <= 0.0
        {
            return Err(Error::Config(format!(
                "[training] decay fractions must be non-negative with a positive length, got {} and {}",
                decay.start_fraction, decay.length_fraction
            )));
        }

        let s = &self.suggestions;
        if !(s.strength_sets.is_finite() && s.strength_sets > 0.0)
            || !(s.mobility_sets.is_finite() && s.mobility_sets > 0.0)
            || !(s.endurance_min_distance.is_finite() && s.endurance_min_distance >= 0.0)
        {
            return Err(Error::Config(
                "[suggestions] per-session amounts must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("setlog").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
