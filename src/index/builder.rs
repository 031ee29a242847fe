//! Orchestration of a full index build.
//!
//! Every build is a complete regeneration: a family's artifacts are
//! written into a staging directory inside the output root and only
//! replace the previous output once the whole family has succeeded, so a
//! failed run never leaves consumers without a usable index.

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::format::{AddressFamily, IndexKind};
use super::packer::BucketPacker;
use super::partition::partition;
use super::source::SourceTables;
use crate::error::{Error, Result};
use crate::metadata::{sha256_hex, BuildMetadata};
use crate::naming::bucket_file_name;
use crate::settings::BuildSettings;

/// Builds the two-level index for both address families.
pub struct IndexBuilder {
    kind: IndexKind,
    settings: BuildSettings,
}

impl IndexBuilder {
    /// Create a builder for `kind` over the configured source tables.
    pub fn new(kind: IndexKind, settings: BuildSettings) -> Self {
        Self { kind, settings }
    }

    /// Build both families into `out_dir`, v4 then v6.
    ///
    /// Families are independent; a failure in v6 leaves the freshly built
    /// v4 artifacts and the previous v6 artifacts in place.
    pub fn build(&self, out_dir: &Path) -> Result<()> {
        for family in AddressFamily::ALL {
            self.build_family(family, out_dir)?;
        }
        Ok(())
    }

    /// Build one family's boundary index and bucket files.
    pub fn build_family(&self, family: AddressFamily, out_dir: &Path) -> Result<()> {
        let stem = family.file_stem();
        info!("building {} index for family v{stem}", self.kind.name());

        let tables = SourceTables::load(&self.settings, self.kind, family)?;
        let rows = tables.row_count();
        let bucket_count = self.kind.bucket_count();
        debug!("{rows} rows over {bucket_count} buckets");

        fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".stage-")
            .tempdir_in(out_dir)
            .map_err(|e| Error::io(out_dir, e))?;
        let bucket_dir = staging.path().join(stem);
        fs::create_dir_all(&bucket_dir).map_err(|e| Error::io(&bucket_dir, e))?;

        let mut packer = BucketPacker::new(
            family,
            self.kind,
            &tables.starts,
            &tables.ends,
            &tables.payload,
        )
        .with_payload_size(self.settings.payload_size(self.kind))
        .with_offset_mode(self.settings.source_offset_mode);
        if let Some(location) = &tables.location {
            packer = packer.with_location(location, self.settings.location_record_size);
        }

        let buckets = partition(rows, bucket_count);
        for (i, &(lo, hi)) in buckets.iter().enumerate() {
            let data = packer.pack(lo, hi)?;
            let path = bucket_dir.join(bucket_file_name(i));
            fs::write(&path, &data).map_err(|e| Error::io(&path, e))?;
        }

        let entries = boundary_entries(family, &tables.starts, &buckets);
        let index = encode_boundary_index(family, &entries);
        let index_path = staging.path().join(format!("{stem}.idx"));
        fs::write(&index_path, &index).map_err(|e| Error::io(&index_path, e))?;

        let meta = BuildMetadata::now(
            self.kind.name(),
            stem,
            rows,
            bucket_count,
            sha256_hex(&index),
        );
        meta.save(staging.path().join(format!("{stem}.meta.json")))?;

        promote(staging.path(), out_dir, family)?;
        info!("family v{stem} done: {rows} rows, {bucket_count} buckets");
        Ok(())
    }
}

/// Boundary index entries: each bucket's first start address. An empty
/// bucket repeats the previous entry rather than advancing.
fn boundary_entries(
    family: AddressFamily,
    starts: &[u8],
    buckets: &[(usize, usize)],
) -> Vec<u64> {
    let width = family.width();
    let mut entries = Vec::with_capacity(buckets.len());
    let mut previous = 0;
    for &(lo, hi) in buckets {
        if hi > lo {
            previous = family.read(starts, lo * width);
        }
        entries.push(previous);
    }
    entries
}

fn encode_boundary_index(family: AddressFamily, entries: &[u64]) -> Vec<u8> {
    let width = family.width();
    let mut buf = vec![0u8; entries.len() * width];
    for (i, &value) in entries.iter().enumerate() {
        family.write(&mut buf, i * width, value);
    }
    buf
}

/// Swap the staged family artifacts into place. The previous output is
/// removed only after the staged build is complete.
fn promote(staging: &Path, out_dir: &Path, family: AddressFamily) -> Result<()> {
    let stem = family.file_stem();
    let idx_name = format!("{stem}.idx");
    let meta_name = format!("{stem}.meta.json");
    for name in [stem, idx_name.as_str(), meta_name.as_str()] {
        let old = out_dir.join(name);
        if old.is_dir() {
            fs::remove_dir_all(&old).map_err(|e| Error::io(&old, e))?;
        } else if old.exists() {
            fs::remove_file(&old).map_err(|e| Error::io(&old, e))?;
        }
        let staged = staging.join(name);
        fs::rename(&staged, &old).map_err(|e| Error::io(&staged, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_table(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_boundary_entries_ten_rows_four_buckets() {
        let starts = u32_table(&[0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
        let buckets = partition(10, 4);
        assert_eq!(
            boundary_entries(AddressFamily::V4, &starts, &buckets),
            vec![0, 20, 50, 70]
        );
    }

    #[test]
    fn test_boundary_entries_empty_bucket_does_not_advance() {
        let starts = u32_table(&[5, 9]);
        let buckets = partition(2, 4);
        // buckets (0,0) (0,1) (1,1) (1,2): empties repeat the prior entry
        assert_eq!(
            boundary_entries(AddressFamily::V4, &starts, &buckets),
            vec![0, 5, 5, 9]
        );
    }

    #[test]
    fn test_boundary_entries_no_rows() {
        let buckets = partition(0, 4);
        assert_eq!(
            boundary_entries(AddressFamily::V4, &[], &buckets),
            vec![0, 0, 0, 0]
        );
    }

    #[test]
    fn test_encode_boundary_index_layout() {
        let buf = encode_boundary_index(AddressFamily::V4, &[1, 0x0102]);
        assert_eq!(buf, vec![1, 0, 0, 0, 2, 1, 0, 0]);

        let buf = encode_boundary_index(AddressFamily::V6, &[1]);
        assert_eq!(buf.len(), 8);
        assert_eq!(AddressFamily::V6.read(&buf, 0), 1);
    }
}
