//! Index format constants and core types.
//!
//! A family's index is two levels: a boundary index of `bucket_count`
//! address-width integers, and one columnar bucket file per bucket. A
//! bucket file holds all start addresses, then all end addresses, then all
//! payload records, every field little-endian:
//!
//! ```text
//! +---------------------------+
//! | start[0] .. start[n-1]    |  n * address_width bytes
//! +---------------------------+
//! | end[0] .. end[n-1]        |  n * address_width bytes
//! +---------------------------+
//! | payload[0] .. payload[n-1]|  n * payload_size bytes
//! +---------------------------+
//! ```

use crate::error::{Error, Result};

/// Buckets in a country index.
pub const COUNTRY_BUCKET_COUNT: usize = 1024;

/// Buckets in a geocode index. Larger than the country count because
/// payload cardinality is higher and range density less uniform.
pub const GEOCODE_BUCKET_COUNT: usize = 2048;

/// Packed payload bytes per row in a country index (one `u16` country id).
pub const COUNTRY_PAYLOAD_SIZE: usize = 2;

/// Packed payload bytes per row in a geocode index (packed latitude plus
/// longitude, both `i32`).
pub const GEOCODE_PAYLOAD_SIZE: usize = 8;

/// Source geocode record width: location id (`u32`), raw latitude (`i32`),
/// raw longitude (`i32`).
pub const GEOCODE_RECORD_SIZE: usize = 12;

/// Which per-range metadata an index carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Country id per range
    Country,
    /// Geocoordinates plus country per range
    Geocode,
}

impl IndexKind {
    /// Number of buckets a table of this kind is split into.
    pub fn bucket_count(&self) -> usize {
        match self {
            IndexKind::Country => COUNTRY_BUCKET_COUNT,
            IndexKind::Geocode => GEOCODE_BUCKET_COUNT,
        }
    }

    /// Packed payload bytes per row.
    pub fn payload_size(&self) -> usize {
        match self {
            IndexKind::Country => COUNTRY_PAYLOAD_SIZE,
            IndexKind::Geocode => GEOCODE_PAYLOAD_SIZE,
        }
    }

    /// Internal name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Country => "country",
            IndexKind::Geocode => "geocode",
        }
    }

    /// Parse a kind from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "country" => Some(IndexKind::Country),
            "geocode" => Some(IndexKind::Geocode),
            _ => None,
        }
    }
}

/// IPv4 or IPv6 processing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Both families in build order.
    pub const ALL: [AddressFamily; 2] = [AddressFamily::V4, AddressFamily::V6];

    /// Stored address width in bytes.
    pub fn width(&self) -> usize {
        match self {
            AddressFamily::V4 => 4,
            AddressFamily::V6 => 8,
        }
    }

    /// File stem used for this family's source and output artifacts.
    pub fn file_stem(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "4",
            AddressFamily::V6 => "6",
        }
    }

    /// Parse a family from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "4" | "v4" | "ipv4" => Some(AddressFamily::V4),
            "6" | "v6" | "ipv6" => Some(AddressFamily::V6),
            _ => None,
        }
    }

    /// Read one address at `offset`, little-endian at this family's width.
    pub fn read(&self, buf: &[u8], offset: usize) -> u64 {
        match self {
            AddressFamily::V4 => {
                u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()) as u64
            }
            AddressFamily::V6 => u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap()),
        }
    }

    /// Write one address at `offset`, little-endian at this family's width.
    pub fn write(&self, buf: &mut [u8], offset: usize, value: u64) {
        match self {
            AddressFamily::V4 => {
                buf[offset..offset + 4].copy_from_slice(&(value as u32).to_le_bytes())
            }
            AddressFamily::V6 => buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes()),
        }
    }
}

/// Check that `table` is a whole number of `record_size`-byte records and
/// return the record count.
pub fn record_count(table: &'static str, len: usize, record_size: usize) -> Result<usize> {
    if record_size == 0 {
        return Err(Error::Config(format!("{table}: record size must be non-zero")));
    }
    if len % record_size != 0 {
        return Err(Error::TruncatedTable {
            table,
            len,
            record_size,
        });
    }
    Ok(len / record_size)
}
