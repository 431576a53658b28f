use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{geometry::Rect, zones::Zone};

fn default_map_w() -> i32 {
    760
}

fn default_map_h() -> i32 {
    520
}

fn default_spawn_interval_ms() -> u64 {
    1_700
}

fn default_trash_ttl_ms() -> u64 {
    20_000
}

fn default_trash_per_brick() -> u32 {
    5
}

fn default_min_trash_per_brick() -> u32 {
    2
}

fn default_brick_price() -> u64 {
    2
}

fn default_hire_cost() -> u64 {
    10
}

fn default_upgrade_cost() -> u64 {
    25
}

fn default_upgrade_effect() -> u32 {
    1
}

fn default_helper_rate_ms() -> u64 {
    1_600
}

fn default_autosave_interval_ms() -> u64 {
    60_000
}

fn default_collision_sweep_ms() -> u64 {
    200
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_victory_delay_ms() -> u64 {
    600
}

fn default_move_speed() -> i32 {
    6
}

fn default_map_margin() -> i32 {
    4
}

fn default_trash_size() -> i32 {
    28
}

fn default_spawn_margin() -> i32 {
    40
}

fn default_player_box() -> Rect {
    Rect::new(60, 60, 44, 56)
}

fn default_start_zone() -> String {
    "Centro".to_string()
}

fn default_seed() -> u64 {
    7
}

fn default_log_capacity() -> usize {
    8
}

fn default_zones() -> Vec<Zone> {
    vec![
        Zone::new("Centro", Rect::new(20, 20, 340, 180), 0, true),
        Zone::new("Plaza", Rect::new(400, 20, 340, 180), 10, false),
        Zone::new("Lago", Rect::new(20, 240, 340, 260), 25, false),
        Zone::new("Mirador", Rect::new(400, 240, 340, 260), 50, false),
    ]
}

fn default_level_titles() -> Vec<String> {
    ["Founder", "Administrator", "Executive", "Director", "Eco Leader"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_level_thresholds() -> Vec<u64> {
    vec![0, 10, 25, 50, 100]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_save_key() -> String {
    "qumara_save".to_string()
}

fn default_winners_key() -> String {
    "qumara_winners".to_string()
}

/// Every tunable of a game session. Missing YAML keys fall back to the stock
/// values of the shipped game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_map_w")]
    pub map_w: i32,
    #[serde(default = "default_map_h")]
    pub map_h: i32,
    #[serde(default = "default_spawn_interval_ms")]
    pub spawn_interval_ms: u64,
    #[serde(default = "default_trash_ttl_ms")]
    pub trash_ttl_ms: u64,
    #[serde(default = "default_trash_per_brick")]
    pub trash_per_brick: u32,
    #[serde(default = "default_min_trash_per_brick")]
    pub min_trash_per_brick: u32,
    #[serde(default = "default_brick_price")]
    pub brick_price: u64,
    #[serde(default = "default_hire_cost")]
    pub hire_cost: u64,
    #[serde(default = "default_upgrade_cost")]
    pub upgrade_cost: u64,
    #[serde(default = "default_upgrade_effect")]
    pub upgrade_effect: u32,
    #[serde(default = "default_helper_rate_ms")]
    pub helper_rate_ms: u64,
    #[serde(default = "default_autosave_interval_ms")]
    pub autosave_interval_ms: u64,
    #[serde(default = "default_collision_sweep_ms")]
    pub collision_sweep_ms: u64,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_victory_delay_ms")]
    pub victory_delay_ms: u64,
    #[serde(default = "default_move_speed")]
    pub move_speed: i32,
    #[serde(default = "default_map_margin")]
    pub map_margin: i32,
    #[serde(default = "default_trash_size")]
    pub trash_size: i32,
    #[serde(default = "default_spawn_margin")]
    pub spawn_margin: i32,
    #[serde(default = "default_player_box")]
    pub player: Rect,
    #[serde(default = "default_start_zone")]
    pub start_zone: String,
    #[serde(default = "default_zones")]
    pub zones: Vec<Zone>,
    #[serde(default = "default_level_titles")]
    pub level_titles: Vec<String>,
    #[serde(default = "default_level_thresholds")]
    pub level_thresholds: Vec<u64>,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_save_key")]
    pub save_key: String,
    #[serde(default = "default_winners_key")]
    pub winners_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            save_key: default_save_key(),
            winners_key: default_winners_key(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            map_w: default_map_w(),
            map_h: default_map_h(),
            spawn_interval_ms: default_spawn_interval_ms(),
            trash_ttl_ms: default_trash_ttl_ms(),
            trash_per_brick: default_trash_per_brick(),
            min_trash_per_brick: default_min_trash_per_brick(),
            brick_price: default_brick_price(),
            hire_cost: default_hire_cost(),
            upgrade_cost: default_upgrade_cost(),
            upgrade_effect: default_upgrade_effect(),
            helper_rate_ms: default_helper_rate_ms(),
            autosave_interval_ms: default_autosave_interval_ms(),
            collision_sweep_ms: default_collision_sweep_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            victory_delay_ms: default_victory_delay_ms(),
            move_speed: default_move_speed(),
            map_margin: default_map_margin(),
            trash_size: default_trash_size(),
            spawn_margin: default_spawn_margin(),
            player: default_player_box(),
            start_zone: default_start_zone(),
            zones: default_zones(),
            level_titles: default_level_titles(),
            level_thresholds: default_level_thresholds(),
            log_capacity: default_log_capacity(),
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config must define at least one zone")]
    NoZones,
    #[error("zone id '{0}' defined more than once")]
    DuplicateZone(String),
    #[error("start zone '{0}' is not a configured zone")]
    UnknownStartZone(String),
    #[error("zone '{zone}' is smaller than the spawn margin {margin}")]
    ZoneTooSmall { zone: String, margin: i32 },
    #[error("efficiency floor must be at least 2, got {0}")]
    FloorTooLow(u32),
    #[error("trash per brick {value} is below the efficiency floor {floor}")]
    RateBelowFloor { value: u32, floor: u32 },
    #[error("level title table must not be empty")]
    NoLevelTitles,
    #[error("level thresholds must be non-empty and ascending")]
    UnorderedLevelThresholds,
    #[error("period '{0}' must be greater than zero")]
    ZeroPeriod(&'static str),
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zones.is_empty() {
            return Err(ConfigError::NoZones);
        }

        let mut seen = HashSet::new();
        for zone in &self.zones {
            if !seen.insert(zone.id.as_str()) {
                return Err(ConfigError::DuplicateZone(zone.id.clone()));
            }
            if zone.rect.w <= self.spawn_margin || zone.rect.h <= self.spawn_margin {
                return Err(ConfigError::ZoneTooSmall {
                    zone: zone.id.clone(),
                    margin: self.spawn_margin,
                });
            }
        }

        if !seen.contains(self.start_zone.as_str()) {
            return Err(ConfigError::UnknownStartZone(self.start_zone.clone()));
        }

        if self.min_trash_per_brick < 2 {
            return Err(ConfigError::FloorTooLow(self.min_trash_per_brick));
        }
        if self.trash_per_brick < self.min_trash_per_brick {
            return Err(ConfigError::RateBelowFloor {
                value: self.trash_per_brick,
                floor: self.min_trash_per_brick,
            });
        }

        if self.level_titles.is_empty() {
            return Err(ConfigError::NoLevelTitles);
        }
        if self.level_thresholds.is_empty()
            || self.level_thresholds.windows(2).any(|pair| pair[0] > pair[1])
        {
            return Err(ConfigError::UnorderedLevelThresholds);
        }

        for (name, period) in [
            ("spawn_interval_ms", self.spawn_interval_ms),
            ("helper_rate_ms", self.helper_rate_ms),
            ("autosave_interval_ms", self.autosave_interval_ms),
            ("collision_sweep_ms", self.collision_sweep_ms),
            ("frame_interval_ms", self.frame_interval_ms),
        ] {
            if period == 0 {
                return Err(ConfigError::ZeroPeriod(name));
            }
        }

        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: GameConfig = serde_yaml::from_str(text).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<GameConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: GameConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }
}
