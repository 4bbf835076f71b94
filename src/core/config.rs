//! Stream configuration, persisted as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::streaming::lod::LodConfig;

/// Default number of points carried by one chunk
pub const DEFAULT_POINTS_PER_MESH: usize = 4096;

/// Default number of points read per fill step
pub const DEFAULT_POINTS_PER_STEP: usize = 1024;

/// Configuration for streaming a dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Chunk capacity in points
    pub points_per_mesh: usize,
    /// Upper bound on points read by a single fill step
    pub points_per_step: usize,
    /// Points at the front of a dataset reserved for the minimal preview mesh.
    /// Free-running playback starts after them.
    pub preview_points: usize,
    /// Directories searched, in order, when resolving a dataset name
    pub search_paths: Vec<PathBuf>,
    /// Extension of point files, without the dot
    pub bin_extension: String,
    /// Extension that terminates slice source paths in slice lists
    pub slice_id_extension: String,
    /// Distance to detail mapping
    pub lod: LodConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            points_per_mesh: DEFAULT_POINTS_PER_MESH,
            points_per_step: DEFAULT_POINTS_PER_STEP,
            preview_points: 0,
            search_paths: Vec::new(),
            bin_extension: "bin".to_string(),
            slice_id_extension: ".ply".to_string(),
            lod: LodConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Check invariants the streaming components rely on
    pub fn validate(&self) -> Result<()> {
        if self.points_per_mesh == 0 {
            return Err(Error::Config("points_per_mesh must be positive".into()));
        }
        if self.points_per_step == 0 {
            return Err(Error::Config("points_per_step must be positive".into()));
        }
        self.lod.validate()
    }

    /// Load and validate a config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: StreamConfig = serde_json::from_str(&json)?;
        config.validate()?;
        log::debug!("Loaded stream config from {}", path.display());
        Ok(config)
    }

    /// Save to a JSON file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        let config = StreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.points_per_mesh, 4096);
        assert_eq!(config.lod.breakpoints, vec![100.0, 15.0, 7.0]);
    }

    #[test]
    fn test_save_load_persistence() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("conf").join("stream.json");

        let config = StreamConfig {
            points_per_mesh: 2048,
            preview_points: 1000,
            search_paths: vec![PathBuf::from("/data/bin")],
            ..Default::default()
        };
        config.save(&path).expect("save failed");

        let loaded = StreamConfig::load(&path).expect("load failed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StreamConfig = serde_json::from_str(r#"{ "points_per_mesh": 512 }"#).unwrap();
        assert_eq!(config.points_per_mesh, 512);
        assert_eq!(config.points_per_step, DEFAULT_POINTS_PER_STEP);
        assert_eq!(config.bin_extension, "bin");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "points_per_mesh": 0 }"#).unwrap();

        assert!(matches!(StreamConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(StreamConfig::load(&path), Err(Error::Json(_))));
    }
}
