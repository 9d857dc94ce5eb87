//! Configuration management for the lore CLI.

use anyhow::{Context, Result};
use lore::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "lore.toml";
pub const DATA_DIR: &str = ".lore";

/// Lore project configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub seeding: SeedingConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    #[serde(default = "default_max_level")]
    pub max_level: usize,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default = "default_seed_from_folders")]
    pub seed_from_folders: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedingConfig {
    #[serde(default = "default_seed_kinds")]
    pub seed_kinds: Vec<String>,
    #[serde(default = "default_leader_keywords")]
    pub leader_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_kinship_relations")]
    pub kinship_relations: Vec<String>,
    #[serde(default = "default_family_edge_ratio")]
    pub family_edge_ratio: f64,
    #[serde(default = "default_profession_ratio")]
    pub profession_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_min_size() -> usize { LouvainConfig::default().min_size }
fn default_max_level() -> usize { LouvainConfig::default().max_level }
fn default_resolution() -> f64 { LouvainConfig::default().resolution }
fn default_seed_from_folders() -> bool { true }
fn default_seed_kinds() -> Vec<String> { SeederConfig::default().seed_kinds }
fn default_leader_keywords() -> Vec<String> { SeederConfig::default().leader_keywords }
fn default_kinship_relations() -> Vec<String> { ClassifierRules::default().kinship_relations }
fn default_family_edge_ratio() -> f64 { ClassifierRules::default().family_edge_ratio }
fn default_profession_ratio() -> f64 { ClassifierRules::default().profession_ratio }
fn default_log_level() -> String { "warn".to_string() }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            max_level: default_max_level(),
            resolution: default_resolution(),
            seed_from_folders: default_seed_from_folders(),
            seed: None,
        }
    }
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            seed_kinds: default_seed_kinds(),
            leader_keywords: default_leader_keywords(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            kinship_relations: default_kinship_relations(),
            family_edge_ratio: default_family_edge_ratio(),
            profession_ratio: default_profession_ratio(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load config from lore.toml in the current or parent directories.
    pub fn load() -> Result<Self> {
        match find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Detection options as configured; command-line flags override them later.
    pub fn detect_options(&self) -> DetectOptions {
        let mut options = DetectOptions::default()
            .with_min_size(self.detection.min_size)
            .with_max_level(self.detection.max_level)
            .with_resolution(self.detection.resolution)
            .with_seed_from_folders(self.detection.seed_from_folders)
            .with_seeding(
                SeederConfig::default()
                    .with_seed_kinds(self.seeding.seed_kinds.iter().cloned())
                    .with_leader_keywords(self.seeding.leader_keywords.iter().cloned()),
            )
            .with_classification(ClassifierRules {
                kinship_relations: self.classification.kinship_relations.clone(),
                family_edge_ratio: self.classification.family_edge_ratio,
                profession_ratio: self.classification.profession_ratio,
            });
        options.seed = self.detection.seed;
        options
    }
}

/// Find lore.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Get the lore data directory (.lore/).
pub fn data_dir() -> Result<PathBuf> {
    let dir = std::env::current_dir()?.join(DATA_DIR);
    Ok(dir)
}

/// Get the community snapshot path.
pub fn communities_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("communities.json"))
}
