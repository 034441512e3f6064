//! Configuration document (`spec.md` §6.3) and home-directory
//! resolution (`spec.md` §6.2), modeled on the teacher's
//! `directories`-based cache-path resolution in `embeddings::local`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::retrieval::SignalWeights;

/// Top-level configuration document. Every section has field-level
/// defaults via `#[serde(default)]` so partial / unknown-key documents
/// deserialize without error.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    pub vector_store: VectorStoreConfig,
    pub graph_store: GraphStoreConfig,
    pub temporal_decay: TemporalDecayConfig,
    pub retrieval: RetrievalConfig,
    pub health: HealthConfig,
    pub proactive: ProactiveConfig,
}

impl Config {
    /// Parse a configuration document from a JSON string. Unknown keys
    /// are ignored; missing keys take documented defaults.
    pub fn from_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Load configuration from `<home_dir>/config.json`, falling back
    /// to defaults if the file doesn't exist.
    pub fn load(home: &std::path::Path) -> std::io::Result<Self> {
        let path = home.join("config.json");
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_str(&contents)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct VectorStoreConfig {
    pub persist_directory: Option<String>,
    pub collection_name: String,
    pub embedding_dim: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            persist_directory: None,
            collection_name: "memories".to_string(),
            embedding_dim: crate::embeddings::EMBEDDING_DIMENSIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct GraphStoreConfig {
    pub database_path: Option<String>,
    /// e.g. `"64MB"`, parsed by [`parse_byte_size`].
    pub buffer_pool_size: String,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self { database_path: None, buffer_pool_size: "64MB".to_string() }
    }
}

impl GraphStoreConfig {
    #[must_use]
    pub fn buffer_pool_bytes(&self) -> Option<u64> {
        parse_byte_size(&self.buffer_pool_size)
    }
}

/// Parse a `<int><B|KB|MB|GB>` byte-size string (case-insensitive unit).
#[must_use]
pub fn parse_byte_size(s: &str) -> Option<u64> {
    let s = s.trim();
    let split_at = s.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = s.split_at(split_at);
    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        _ => return None,
    };
    Some(value * multiplier)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct TemporalDecayConfig {
    pub enabled: bool,
    pub default_decay_rate: f64,
    pub default_reinforcement_factor: f64,
}

impl Default for TemporalDecayConfig {
    fn default() -> Self {
        Self { enabled: true, default_decay_rate: 0.05, default_reinforcement_factor: 1.1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", default)]
pub struct RetrievalConfig {
    /// Overrides the default six-signal composite weights; renormalized
    /// to sum to 1.0 if present (`spec.md` §4.3, §8 P3).
    pub weights: Option<SignalWeights>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct HealthConfig {
    pub stale_days: f64,
    pub conflict_threshold: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { stale_days: 90.0, conflict_threshold: 0.60 }
    }
}

impl From<HealthConfig> for crate::health::HealthConfig {
    fn from(config: HealthConfig) -> Self {
        Self { stale_days: config.stale_days, conflict_threshold: config.conflict_threshold }
    }
}

impl From<ProactiveConfig> for crate::proactive::ProactiveConfig {
    fn from(config: ProactiveConfig) -> Self {
        Self { temporal_confidence: config.temporal_confidence, domain_confidence: config.domain_confidence, concept_confidence: config.concept_confidence }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ProactiveConfig {
    pub temporal_confidence: f64,
    pub domain_confidence: f64,
    pub concept_confidence: f64,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self { temporal_confidence: 0.7, domain_confidence: 0.6, concept_confidence: 0.5 }
    }
}

/// Resolve the configurable home directory: `ELEFANTE_HOME` env var,
/// else `directories::ProjectDirs`, else `~/.elefante`.
#[must_use]
pub fn home_dir() -> PathBuf {
    if let Ok(path) = std::env::var("ELEFANTE_HOME") {
        return PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "elefante", "elefante") {
        return proj_dirs.data_dir().to_path_buf();
    }
    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".elefante");
    }
    PathBuf::from(".elefante")
}

/// Ensure `dir` exists as a directory, tolerating a pre-created but
/// empty mount point by removing and recreating it (`spec.md` §6.2).
pub fn ensure_data_dir(dir: &std::path::Path) -> std::io::Result<()> {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_none() {
                std::fs::remove_dir(dir)?;
                std::fs::create_dir_all(dir)?;
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => std::fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_str(&json).unwrap();
        assert_eq!(parsed.health.stale_days, config.health.stale_days);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = Config::from_str(r#"{"mystery_section": {"a": 1}}"#).unwrap();
        assert_eq!(config.health.conflict_threshold, 0.60);
    }

    #[test]
    fn parses_byte_sizes() {
        assert_eq!(parse_byte_size("64MB"), Some(64 * 1024 * 1024));
        assert_eq!(parse_byte_size("512KB"), Some(512 * 1024));
        assert_eq!(parse_byte_size("1GB"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_byte_size("garbage"), None);
    }
}
