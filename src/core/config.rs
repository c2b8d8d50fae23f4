//! Editor configuration loaded from JSON.
//!
//! Every section carries `#[serde(default)]`, so a file only needs to name the
//! values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::{Result, Vec3};
use crate::voxel::resolution::Resolution;
use crate::voxel::workspace::DEFAULT_WORKSPACE_SIZE;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Full editor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Workspace bounds.
    pub workspace: WorkspaceConfig,
    /// Undo/redo limits.
    pub history: HistoryConfig,
    /// Placement and fill guards.
    pub placement: PlacementConfig,
    /// Resolution selected when the store is created.
    pub active_resolution: Resolution,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig::default(),
            history: HistoryConfig::default(),
            placement: PlacementConfig::default(),
            active_resolution: Resolution::Cm1,
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Save as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Workspace size in meters. Clamped into the library limits when applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub size: Vec3,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            size: Vec3::splat(DEFAULT_WORKSPACE_SIZE),
        }
    }
}

/// History ceilings and snapshot cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo entries.
    pub max_entries: usize,
    /// Maximum aggregate memory estimate of both stacks (bytes).
    pub max_memory_bytes: usize,
    /// Capture a full-state snapshot every N executed commands.
    pub snapshot_interval: usize,
    /// Compress bulk commands when `optimize_memory` runs.
    pub compression_enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_memory_bytes: 256 * 1024 * 1024,
            snapshot_interval: 25,
            compression_enabled: true,
        }
    }
}

/// Guards on placement-driven commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Largest number of cells a single fill may touch.
    pub max_fill_cells: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_fill_cells: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.workspace.size, Vec3::splat(5.0));
        assert_eq!(config.history.max_entries, 100);
        assert_eq!(config.active_resolution, Resolution::Cm1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("editor.json");

        let mut config = EditorConfig::default();
        config.workspace.size = Vec3::new(4.0, 3.0, 4.0);
        config.history.max_entries = 12;
        config.active_resolution = Resolution::Cm16;
        config.save(&path).unwrap();

        let loaded = EditorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "history": { "max_entries": 7 } }"#).unwrap();

        let loaded = EditorConfig::load(&path).unwrap();
        assert_eq!(loaded.history.max_entries, 7);
        assert_eq!(loaded.history.snapshot_interval, 25);
        assert_eq!(loaded.workspace, WorkspaceConfig::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = EditorConfig::load(&path).unwrap_err();
        assert!(matches!(err, crate::core::Error::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EditorConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, crate::core::Error::Io(_)));
    }
}
