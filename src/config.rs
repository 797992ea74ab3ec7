use crate::types::BiasRule;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub sampling: SamplingConfig,
    pub temporal: TemporalConfig,
    pub projection: ProjectionConfig,
    pub density: DensityConfig,
    pub playback: PlaybackConfig,
    pub declutter: DeclutterConfig,
    pub hover: HoverConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub boundaries: PathBuf, // .geojson / .json / .shp
    pub name_property: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            boundaries: PathBuf::from("new-york-city-boroughs.geojson"),
            name_property: "name".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingConfig {
    pub quota: usize,
    /// Rejection budget per accepted point; a region gets `quota * max_attempts_per_point` draws.
    pub max_attempts_per_point: usize,
    pub seed: Option<u64>,
    pub bias: HashMap<String, BiasRule>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        let bias = [
            ("Manhattan", BiasRule::SouthWeighted),
            ("Brooklyn", BiasRule::NorthWeighted),
            ("Queens", BiasRule::WestNorthWeighted),
        ]
        .into_iter()
        .map(|(name, rule)| (name.to_string(), rule))
        .collect();

        Self {
            quota: 400,
            max_attempts_per_point: 1000,
            seed: None,
            bias,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TemporalConfig {
    /// When false every point is visible whatever the cursor says.
    pub enabled: bool,
    /// Day the synthetic timestamps fall on. Defaults to today.
    pub day: Option<NaiveDate>,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            day: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProjectionConfig {
    pub center: [f64; 2], // lon, lat
    pub scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            center: [-73.98, 40.75],
            scale: 250_000.0,
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DensityConfig {
    pub bandwidth: f64,
    pub thresholds: usize,
    pub cell_size: f64,
    pub weighted: bool,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            bandwidth: 80.0,
            thresholds: 25,
            cell_size: 2.0,
            weighted: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlaybackConfig {
    pub step_minutes: u16,
    pub tick_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            step_minutes: 10,
            tick_interval_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeclutterConfig {
    pub iterations: usize,
    pub anchor_strength: f64,
    pub collide_radius: f64,
    pub collide_strength: f64,
    pub charge_strength: f64,
}

impl Default for DeclutterConfig {
    fn default() -> Self {
        Self {
            iterations: 20,
            anchor_strength: 0.1,
            collide_radius: 12.0,
            collide_strength: 0.3,
            charge_strength: 3.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HoverConfig {
    pub radius: f64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self { radius: 12.0 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
