//! Configuration system for neardup.
//! TOML-based, 4-layer resolution: CLI > env > project > user > defaults.

pub mod ingest_config;
pub mod lsh_config;
pub mod minhash_config;
pub mod neardup_config;
pub mod pipeline_config;
pub mod shingle_config;
pub mod storage_config;
pub mod verify_config;

pub use ingest_config::IngestConfig;
pub use lsh_config::LshConfig;
pub use minhash_config::MinHashConfig;
pub use neardup_config::{CliOverrides, NeardupConfig};
pub use pipeline_config::PipelineConfig;
pub use shingle_config::ShingleConfig;
pub use storage_config::{StorageBackend, StorageConfig};
pub use verify_config::{VerifyConfig, VerifyMode};
