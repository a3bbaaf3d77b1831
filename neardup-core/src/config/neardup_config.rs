//! Top-level neardup configuration with 4-layer resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{
    IngestConfig, LshConfig, MinHashConfig, PipelineConfig, ShingleConfig, StorageBackend,
    StorageConfig, VerifyConfig, VerifyMode,
};
use crate::errors::ConfigError;

/// Project config file name, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "neardup.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`NEARDUP_*`)
/// 3. Project config (`neardup.toml` in project root)
/// 4. User config (`~/.neardup/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct NeardupConfig {
    pub shingle: ShingleConfig,
    pub minhash: MinHashConfig,
    pub lsh: LshConfig,
    pub verify: VerifyConfig,
    pub ingest: IngestConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub threshold: Option<f64>,
    pub num_perm: Option<usize>,
    pub workers: Option<usize>,
    pub max_docs: Option<usize>,
    pub verify_mode: Option<VerifyMode>,
    pub storage_backend: Option<StorageBackend>,
    pub storage_path: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
}

impl NeardupConfig {
    /// Load configuration with 4-layer resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(path = %user_config_path.display(), error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        // Layer 3: project config
        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(config: &NeardupConfig) -> Result<(), ConfigError> {
        if config.shingle.effective_width() == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "shingle.width".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        let num_perm = config.minhash.effective_num_perm();
        if num_perm == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "minhash.num_perm".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        let threshold = config.lsh.effective_threshold();
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::ValidationFailed {
                field: "lsh.threshold".to_string(),
                message: "must be in (0.0, 1.0]".to_string(),
            });
        }

        match (config.lsh.bands, config.lsh.rows) {
            (Some(b), Some(r)) => {
                if b == 0 || r == 0 {
                    return Err(ConfigError::ValidationFailed {
                        field: "lsh.bands".to_string(),
                        message: "bands and rows must be greater than 0".to_string(),
                    });
                }
                if b * r != num_perm {
                    return Err(ConfigError::ValidationFailed {
                        field: "lsh.bands".to_string(),
                        message: format!("bands ({b}) * rows ({r}) must equal minhash.num_perm ({num_perm})"),
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::ValidationFailed {
                    field: "lsh.bands".to_string(),
                    message: "bands and rows must be set together".to_string(),
                });
            }
        }

        for (field, weight) in [
            ("lsh.false_positive_weight", config.lsh.effective_false_positive_weight()),
            ("lsh.false_negative_weight", config.lsh.effective_false_negative_weight()),
        ] {
            if !(weight >= 0.0 && weight.is_finite()) {
                return Err(ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: "must be a finite, non-negative number".to_string(),
                });
            }
        }

        if config.pipeline.effective_queue_capacity() == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "pipeline.queue_capacity".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if config.ingest.effective_id_field().is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "ingest.id_field".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if config.ingest.text_fields.iter().any(|f| f.is_empty()) {
            return Err(ConfigError::ValidationFailed {
                field: "ingest.text_fields".to_string(),
                message: "field names must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the user config path: `~/.neardup/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        dirs_path().map(|d| d.join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut NeardupConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: NeardupConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`, where `other` values override `base` values
    /// only when `other` has a `Some` value.
    fn merge(base: &mut NeardupConfig, other: &NeardupConfig) {
        // Shingle
        if other.shingle.width.is_some() {
            base.shingle.width = other.shingle.width;
        }
        if other.shingle.seed.is_some() {
            base.shingle.seed = other.shingle.seed;
        }
        if other.shingle.lowercase.is_some() {
            base.shingle.lowercase = other.shingle.lowercase;
        }
        if other.shingle.strip_punctuation.is_some() {
            base.shingle.strip_punctuation = other.shingle.strip_punctuation;
        }

        // MinHash
        if other.minhash.num_perm.is_some() {
            base.minhash.num_perm = other.minhash.num_perm;
        }
        if other.minhash.seed.is_some() {
            base.minhash.seed = other.minhash.seed;
        }

        // LSH
        if other.lsh.threshold.is_some() {
            base.lsh.threshold = other.lsh.threshold;
        }
        if other.lsh.bands.is_some() {
            base.lsh.bands = other.lsh.bands;
        }
        if other.lsh.rows.is_some() {
            base.lsh.rows = other.lsh.rows;
        }
        if other.lsh.false_positive_weight.is_some() {
            base.lsh.false_positive_weight = other.lsh.false_positive_weight;
        }
        if other.lsh.false_negative_weight.is_some() {
            base.lsh.false_negative_weight = other.lsh.false_negative_weight;
        }

        // Verify
        if other.verify.mode.is_some() {
            base.verify.mode = other.verify.mode;
        }

        // Ingest
        if other.ingest.id_field.is_some() {
            base.ingest.id_field = other.ingest.id_field.clone();
        }
        if !other.ingest.text_fields.is_empty() {
            base.ingest.text_fields = other.ingest.text_fields.clone();
        }
        if other.ingest.max_docs.is_some() {
            base.ingest.max_docs = other.ingest.max_docs;
        }

        // Pipeline
        if other.pipeline.workers.is_some() {
            base.pipeline.workers = other.pipeline.workers;
        }
        if other.pipeline.queue_capacity.is_some() {
            base.pipeline.queue_capacity = other.pipeline.queue_capacity;
        }

        // Storage
        if other.storage.backend.is_some() {
            base.storage.backend = other.storage.backend;
        }
        if other.storage.path.is_some() {
            base.storage.path = other.storage.path.clone();
        }
        if other.storage.snapshot_path.is_some() {
            base.storage.snapshot_path = other.storage.snapshot_path.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `NEARDUP_LSH_THRESHOLD`, `NEARDUP_MINHASH_NUM_PERM`, etc.
    /// Unparseable values are ignored.
    fn apply_env_overrides(config: &mut NeardupConfig) {
        if let Some(v) = env_parse::<usize>("NEARDUP_SHINGLE_WIDTH") {
            config.shingle.width = Some(v);
        }
        if let Some(v) = env_parse::<usize>("NEARDUP_MINHASH_NUM_PERM") {
            config.minhash.num_perm = Some(v);
        }
        if let Some(v) = env_parse::<u64>("NEARDUP_MINHASH_SEED") {
            config.minhash.seed = Some(v);
        }
        if let Some(v) = env_parse::<f64>("NEARDUP_LSH_THRESHOLD") {
            config.lsh.threshold = Some(v);
        }
        if let Some(v) = env_parse::<VerifyMode>("NEARDUP_VERIFY_MODE") {
            config.verify.mode = Some(v);
        }
        if let Some(v) = env_parse::<usize>("NEARDUP_PIPELINE_WORKERS") {
            config.pipeline.workers = Some(v);
        }
        if let Some(v) = env_parse::<StorageBackend>("NEARDUP_STORAGE_BACKEND") {
            config.storage.backend = Some(v);
        }
        if let Ok(val) = std::env::var("NEARDUP_STORAGE_PATH") {
            config.storage.path = Some(PathBuf::from(val));
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut NeardupConfig, cli: &CliOverrides) {
        if let Some(v) = cli.threshold {
            config.lsh.threshold = Some(v);
        }
        if let Some(v) = cli.num_perm {
            config.minhash.num_perm = Some(v);
            // Explicit bands/rows were sized for the old k.
            if config.lsh.bands.zip(config.lsh.rows).map(|(b, r)| b * r) != Some(v) {
                config.lsh.bands = None;
                config.lsh.rows = None;
            }
        }
        if let Some(v) = cli.workers {
            config.pipeline.workers = Some(v);
        }
        if let Some(v) = cli.max_docs {
            config.ingest.max_docs = Some(v);
        }
        if let Some(v) = cli.verify_mode {
            config.verify.mode = Some(v);
        }
        if let Some(v) = cli.storage_backend {
            config.storage.backend = Some(v);
        }
        if let Some(ref v) = cli.storage_path {
            config.storage.path = Some(v.clone());
        }
        if let Some(ref v) = cli.snapshot_path {
            config.storage.snapshot_path = Some(v.clone());
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Returns the user-level config directory: `~/.neardup/`.
fn dirs_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".neardup"))
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
