//! Loading source tables into memory for one family's build.
//!
//! Per family the builder consumes a start-address table (`{4|6}-1.dat`),
//! an end-address table (`{4|6}-2.dat`), a payload table (`{4|6}-3.dat`)
//! and, for geocode builds, the shared location table (`location.dat`).
//! Each file may instead be present as a gzipped `.gz` sibling.

use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;

use flate2::read::GzDecoder;
use log::debug;
use memmap2::Mmap;

use super::format::{
    record_count, AddressFamily, IndexKind, COUNTRY_PAYLOAD_SIZE, GEOCODE_RECORD_SIZE,
};
use crate::error::{Error, Result};
use crate::settings::{BuildSettings, SourceOffsetMode};

/// Bytes of one source table, mapped from disk or decompressed into memory.
pub enum TableData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for TableData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            TableData::Mapped(map) => map,
            TableData::Owned(vec) => vec,
        }
    }
}

/// All source tables for one family, held for the duration of a build.
pub struct SourceTables {
    pub family: AddressFamily,
    pub starts: TableData,
    pub ends: TableData,
    pub payload: TableData,
    pub location: Option<TableData>,
    row_count: usize,
}

impl SourceTables {
    /// Load and structurally validate the family's tables.
    pub fn load(
        settings: &BuildSettings,
        kind: IndexKind,
        family: AddressFamily,
    ) -> Result<Self> {
        let dir = &settings.data_dir;
        let stem = family.file_stem();

        let starts = read_table(dir, &format!("{stem}-1.dat"))?;
        let ends = read_table(dir, &format!("{stem}-2.dat"))?;
        let payload = read_table(dir, &format!("{stem}-3.dat"))?;

        let width = family.width();
        let rows = record_count("starts", starts.len(), width)?;
        let end_rows = record_count("ends", ends.len(), width)?;
        if end_rows != rows {
            return Err(Error::TableLengthMismatch {
                table: "ends",
                expected: rows,
                actual: end_rows,
            });
        }

        // one payload record per row; not checked for the bucket-scaled
        // mode, whose reads do not line up with row-major records
        let payload_record_size = match kind {
            IndexKind::Country => Some(COUNTRY_PAYLOAD_SIZE),
            IndexKind::Geocode
                if settings.source_offset_mode == SourceOffsetMode::RowMajor =>
            {
                Some(GEOCODE_RECORD_SIZE)
            }
            IndexKind::Geocode => None,
        };
        if let Some(record_size) = payload_record_size {
            let payload_rows = record_count("payload", payload.len(), record_size)?;
            if payload_rows != rows {
                return Err(Error::TableLengthMismatch {
                    table: "payload",
                    expected: rows,
                    actual: payload_rows,
                });
            }
        }

        let location = match kind {
            IndexKind::Geocode => {
                let table = read_table(dir, "location.dat")?;
                record_count("location", table.len(), settings.location_record_size)?;
                Some(table)
            }
            IndexKind::Country => None,
        };

        debug!("loaded {rows} rows for family v{stem}");
        Ok(Self {
            family,
            starts,
            ends,
            payload,
            location,
            row_count: rows,
        })
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Start address of `row`.
    pub fn start(&self, row: usize) -> u64 {
        self.family.read(&self.starts, row * self.family.width())
    }
}

fn read_table(dir: &Path, name: &str) -> Result<TableData> {
    let path = dir.join(name);
    let gz_path = dir.join(format!("{name}.gz"));

    if !path.exists() && gz_path.exists() {
        let file = File::open(&gz_path).map_err(|e| Error::io(&gz_path, e))?;
        let mut data = Vec::new();
        GzDecoder::new(file)
            .read_to_end(&mut data)
            .map_err(|e| Error::io(&gz_path, e))?;
        return Ok(TableData::Owned(data));
    }

    let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
    let len = file.metadata().map_err(|e| Error::io(&path, e))?.len();
    if len == 0 {
        // zero-length files cannot be mapped
        return Ok(TableData::Owned(Vec::new()));
    }
    let map = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(&path, e))?;
    Ok(TableData::Mapped(map))
}
