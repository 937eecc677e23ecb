
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{CinemateError, Result};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Sidecar describing how an index artifact was built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Embedding model the vectors came from
    pub model: String,
    pub dimension: usize,
    pub rows: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    #[inline]
    pub fn new(model: impl Into<String>, dimension: usize, rows: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
            rows,
            built_at: Utc::now(),
        }
    }

    #[inline]
    pub fn path_in(artifact_dir: &Path) -> PathBuf {
        artifact_dir.join(MANIFEST_FILE_NAME)
    }

    #[inline]
    pub fn write(&self, artifact_dir: &Path) -> Result<()> {
        let path = Self::path_in(artifact_dir);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CinemateError::Index(format!("Failed to serialize manifest: {e}")))?;
        fs::write(&path, content)?;
        debug!("Wrote index manifest to {}", path.display());
        Ok(())
    }

    /// Delete the manifest next to an artifact, if there is one
    #[inline]
    pub fn remove(artifact_dir: &Path) -> Result<()> {
        let path = Self::path_in(artifact_dir);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed index manifest {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the manifest next to an artifact. `None` when there is none.
    #[inline]
    pub fn read(artifact_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(artifact_dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&content).map_err(|e| {
            CinemateError::Index(format!("Invalid manifest {}: {e}", path.display()))
        })?;
        Ok(Some(manifest))
    }
}
