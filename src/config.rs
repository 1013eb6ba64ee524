//! Engine configuration: defaults, optional JSON file, `SHELFWISE_*` env overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub text_matrix_ttl_secs: u64,
    pub similarity_ttl_secs: u64,
    pub homepage_ttl_secs: u64,
    pub product_page_ttl_secs: u64,
    /// Candidates drawn from each source by `hybrid`; also the CBF rank denominator.
    pub candidate_pool: usize,
    /// Recent purchases used as content seeds.
    pub seed_count: usize,
    pub default_alpha: f64,
    /// 0 disables the background sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            text_matrix_ttl_secs: 3600,
            similarity_ttl_secs: 1800,
            homepage_ttl_secs: 900,
            product_page_ttl_secs: 1800,
            candidate_pool: 50,
            seed_count: 5,
            default_alpha: 0.5,
            sweep_interval_secs: 300,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults, then `path` (or `SHELFWISE_CONFIG`) if given, then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = env::var_os("SHELFWISE_CONFIG").map(PathBuf::from);
        let mut cfg = match path.map(Path::to_path_buf).or(from_env) {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from `lookup` (env in production, a map in tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        fn parse<T: std::str::FromStr>(field: &'static str, raw: String) -> Result<T, ConfigError> {
            raw.trim().parse().map_err(|_| ConfigError::Invalid { field, reason: format!("can't parse {raw:?}") })
        }
        if let Some(v) = lookup("SHELFWISE_TEXT_TTL") { self.text_matrix_ttl_secs = parse("text_matrix_ttl_secs", v)?; }
        if let Some(v) = lookup("SHELFWISE_SIMILARITY_TTL") { self.similarity_ttl_secs = parse("similarity_ttl_secs", v)?; }
        if let Some(v) = lookup("SHELFWISE_HOMEPAGE_TTL") { self.homepage_ttl_secs = parse("homepage_ttl_secs", v)?; }
        if let Some(v) = lookup("SHELFWISE_PRODUCT_PAGE_TTL") { self.product_page_ttl_secs = parse("product_page_ttl_secs", v)?; }
        if let Some(v) = lookup("SHELFWISE_ALPHA") { self.default_alpha = parse("default_alpha", v)?; }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.default_alpha) {
            return Err(ConfigError::Invalid { field: "default_alpha", reason: format!("{} not in [0, 1]", self.default_alpha) });
        }
        if self.candidate_pool == 0 {
            return Err(ConfigError::Invalid { field: "candidate_pool", reason: "must be positive".into() });
        }
        if self.seed_count == 0 {
            return Err(ConfigError::Invalid { field: "seed_count", reason: "must be positive".into() });
        }
        Ok(())
    }

    pub fn text_matrix_ttl(&self) -> Duration { Duration::from_secs(self.text_matrix_ttl_secs) }
    pub fn similarity_ttl(&self) -> Duration { Duration::from_secs(self.similarity_ttl_secs) }
    pub fn homepage_ttl(&self) -> Duration { Duration::from_secs(self.homepage_ttl_secs) }
    pub fn product_page_ttl(&self) -> Duration { Duration::from_secs(self.product_page_ttl_secs) }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Dataset location: explicit, then `SHELFWISE_DATA`, then `~/.shelfwise/dataset.json`.
pub fn resolve_data_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(p) = explicit { return p; }
    if let Some(p) = env::var_os("SHELFWISE_DATA") { return PathBuf::from(p); }
    let home = env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".shelfwise").join("dataset.json")
}
