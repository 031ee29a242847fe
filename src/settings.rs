//! Build configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::IndexKind;

fn default_location_record_size() -> usize {
    8
}

/// How the source byte offset of a geocode row is derived.
///
/// `RowMajor` reads row `j` at `j * GEOCODE_RECORD_SIZE`, the only mode
/// under which packed buckets round-trip to the source rows. `BucketScaled`
/// reproduces, bit for bit, an earlier encoder that scaled the
/// bucket-relative output position by the payload width instead; it exists
/// so output can be diffed against archives produced by that encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOffsetMode {
    #[default]
    RowMajor,
    BucketScaled,
}

/// Settings for an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Directory holding the source tables
    pub data_dir: PathBuf,

    /// Width of one location table record in bytes
    #[serde(default = "default_location_record_size")]
    pub location_record_size: usize,

    /// Override for the packed payload width; defaults to the kind's width
    #[serde(default)]
    pub main_record_size: Option<usize>,

    /// Geocode source offset derivation
    #[serde(default)]
    pub source_offset_mode: SourceOffsetMode,
}

impl BuildSettings {
    /// Create settings with defaults for the given source directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            location_record_size: default_location_record_size(),
            main_record_size: None,
            source_offset_mode: SourceOffsetMode::default(),
        }
    }

    /// Load settings from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let settings: Self = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Packed payload width for `kind`.
    pub fn payload_size(&self, kind: IndexKind) -> usize {
        self.main_record_size.unwrap_or_else(|| kind.payload_size())
    }

    fn validate(&self) -> Result<()> {
        if self.location_record_size < 2 {
            return Err(Error::Config(format!(
                "location_record_size must be at least 2, got {}",
                self.location_record_size
            )));
        }
        if let Some(size) = self.main_record_size {
            if size == 0 {
                return Err(Error::Config("main_record_size must be non-zero".into()));
            }
        }
        Ok(())
    }
}
