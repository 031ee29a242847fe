//! Two-level index construction: partitioning, packing, orchestration.

mod builder;
mod format;
mod packer;
mod partition;
mod source;

pub use builder::IndexBuilder;
pub use format::{
    record_count, AddressFamily, IndexKind, COUNTRY_BUCKET_COUNT, COUNTRY_PAYLOAD_SIZE,
    GEOCODE_BUCKET_COUNT, GEOCODE_PAYLOAD_SIZE, GEOCODE_RECORD_SIZE,
};
pub use packer::{unpack, BucketPacker, PackedPayload, PackedRow};
pub use partition::{boundary, partition};
pub use source::{SourceTables, TableData};
