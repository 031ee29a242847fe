//! ipidx - a two-level binary search index builder for IP location data.
//!
//! This crate turns sorted, non-overlapping IP range tables into a compact
//! binary index that can be searched offline, without a database engine,
//! e.g. from a browser fetching one bucket file at a time.
//!
//! # How the index is shaped
//!
//! - **Bucket files**: the sorted row table is split into a fixed number of
//!   contiguous buckets (1024 for country data, 2048 for geocode data).
//!   Each bucket is packed into one columnar binary file: all start
//!   addresses, then all end addresses, then all payload records, every
//!   field little-endian.
//! - **Boundary index**: one address per bucket (the first row's start),
//!   letting a first-stage binary search pick the right bucket before
//!   scanning it.
//!
//! Geocode payloads fold the 2-letter country code into the low 10 bits of
//! the latitude field; rows whose location record carries the two-zero-byte
//! sentinel inherit the code from the previous row in the same bucket.
//!
//! # Quick Start
//!
//! ```ignore
//! use ipidx::{BuildSettings, IndexBuilder, IndexKind};
//! use std::path::Path;
//!
//! let settings = BuildSettings::new("/var/lib/ipidx/fields");
//! let builder = IndexBuilder::new(IndexKind::Country, settings);
//!
//! // Builds v4 then v6; artifacts are staged and swapped in atomically.
//! builder.build(Path::new("/var/www/ipdb"))?;
//! ```
//!
//! This crate only builds index artifacts. Runtime lookup is a separate
//! consumer of the format; the [`index::unpack`] helper exists for
//! verification tooling and tests.

mod country;
mod error;
mod metadata;
mod naming;
mod settings;

pub mod index;

// Re-export core types
pub use error::{Error, Result};
pub use settings::{BuildSettings, SourceOffsetMode};

// Re-export index construction types
pub use index::{AddressFamily, IndexBuilder, IndexKind};

// Re-export the country code codec
pub use country::{
    country_code_to_number, number_to_country_code, pack_latitude, split_packed_latitude,
    COUNTRY_CODE_BITS, COUNTRY_CODE_MASK, EMPTY_COUNTRY_CODE,
};

// Re-export artifact naming and metadata
pub use metadata::{sha256_hex, BuildMetadata};
pub use naming::bucket_file_name;
