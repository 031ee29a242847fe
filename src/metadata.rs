//! Build metadata sidecar written next to each family's artifacts.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Metadata describing one family's build.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildMetadata {
    /// Index kind name ("country" or "geocode")
    pub kind: String,
    /// Address family name ("4" or "6")
    pub family: String,
    /// Number of source rows packed
    pub row_count: usize,
    /// Number of buckets written
    pub bucket_count: usize,
    /// Hex SHA-256 of the boundary index file
    pub index_checksum: String,
    #[serde(with = "system_time_serde")]
    pub built_at: Option<SystemTime>,
}

mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => {
                let duration = t.duration_since(UNIX_EPOCH).unwrap_or_default();
                Some(duration.as_secs()).serialize(serializer)
            }
            None => None::<u64>.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(|s| UNIX_EPOCH + Duration::from_secs(s)))
    }
}

impl BuildMetadata {
    /// Create metadata for a build finishing now.
    pub fn now(
        kind: &str,
        family: &str,
        row_count: usize,
        bucket_count: usize,
        index_checksum: String,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            family: family.to_string(),
            row_count,
            bucket_count,
            index_checksum,
            built_at: Some(SystemTime::now()),
        }
    }

    /// Load metadata from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save metadata to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content).map_err(|e| Error::io(path, e))
    }
}

/// Hex SHA-256 of a byte buffer.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
