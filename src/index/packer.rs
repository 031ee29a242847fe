//! Packing one bucket into its columnar buffer, and decoding it back.

use super::format::{record_count, AddressFamily, IndexKind, GEOCODE_RECORD_SIZE};
use crate::country::{
    country_code_to_number, pack_latitude, EMPTY_COUNTRY_CODE,
};
use crate::error::{Error, Result};
use crate::settings::SourceOffsetMode;

/// Packs buckets of one family's source tables.
///
/// Row order within a bucket must be preserved: the country-code
/// carry-forward rule makes each geocode row depend on the one before it.
/// The carry resets to the empty code at every bucket start, so buckets
/// themselves are independent of each other.
pub struct BucketPacker<'a> {
    family: AddressFamily,
    kind: IndexKind,
    starts: &'a [u8],
    ends: &'a [u8],
    payload: &'a [u8],
    location: Option<&'a [u8]>,
    payload_size: usize,
    location_record_size: usize,
    offset_mode: SourceOffsetMode,
}

impl<'a> BucketPacker<'a> {
    /// Create a packer over validated source tables.
    pub fn new(
        family: AddressFamily,
        kind: IndexKind,
        starts: &'a [u8],
        ends: &'a [u8],
        payload: &'a [u8],
    ) -> Self {
        Self {
            family,
            kind,
            starts,
            ends,
            payload,
            location: None,
            payload_size: kind.payload_size(),
            location_record_size: 8,
            offset_mode: SourceOffsetMode::default(),
        }
    }

    /// Attach the location lookup table (required for geocode packing).
    pub fn with_location(mut self, location: &'a [u8], record_size: usize) -> Self {
        self.location = Some(location);
        self.location_record_size = record_size;
        self
    }

    /// Override the packed payload width.
    pub fn with_payload_size(mut self, payload_size: usize) -> Self {
        self.payload_size = payload_size;
        self
    }

    /// Select the geocode source offset derivation.
    pub fn with_offset_mode(mut self, mode: SourceOffsetMode) -> Self {
        self.offset_mode = mode;
        self
    }

    /// Pack rows `[lo, hi)` into one columnar buffer.
    ///
    /// An empty bucket yields an empty buffer.
    pub fn pack(&self, lo: usize, hi: usize) -> Result<Vec<u8>> {
        debug_assert!(lo <= hi);
        if self.payload_size < self.kind.payload_size() {
            return Err(Error::Config(format!(
                "payload width {} below the {} minimum {}",
                self.payload_size,
                self.kind.name(),
                self.kind.payload_size()
            )));
        }

        let width = self.family.width();
        let count = hi - lo;
        let mut buf = vec![0u8; count * (2 * width + self.payload_size)];

        // carry starts empty: no inheritance across bucket boundaries
        let mut carry = EMPTY_COUNTRY_CODE;

        for (k, j) in (lo..hi).enumerate() {
            self.family
                .write(&mut buf, k * width, self.family.read(self.starts, j * width));
            self.family.write(
                &mut buf,
                width * count + k * width,
                self.family.read(self.ends, j * width),
            );

            let line = 2 * width * count + k * self.payload_size;
            match self.kind {
                IndexKind::Country => {
                    let id = self.read_u16("payload", self.payload, j * 2)?;
                    buf[line..line + 2].copy_from_slice(&id.to_le_bytes());
                }
                IndexKind::Geocode => {
                    let src = match self.offset_mode {
                        SourceOffsetMode::RowMajor => j * GEOCODE_RECORD_SIZE,
                        SourceOffsetMode::BucketScaled => line * self.payload_size,
                    };
                    let location_id = self.read_u32("payload", self.payload, src)?;
                    let latitude = self.read_i32("payload", self.payload, src + 4)?;
                    let longitude = self.read_i32("payload", self.payload, src + 8)?;

                    let code = self.location_code(location_id)?;
                    let effective = if code == EMPTY_COUNTRY_CODE { carry } else { code };
                    carry = effective;

                    let packed = pack_latitude(latitude, country_code_to_number(effective)?);
                    buf[line..line + 4].copy_from_slice(&packed.to_le_bytes());
                    buf[line + 4..line + 8].copy_from_slice(&longitude.to_le_bytes());
                }
            }
        }
        Ok(buf)
    }

    /// Country code field of the location record for `location_id`.
    fn location_code(&self, location_id: u32) -> Result<[u8; 2]> {
        let table = self.location.ok_or(Error::MissingLocationTable)?;
        let record = (location_id as usize)
            .checked_sub(1)
            .ok_or(Error::InvalidLocationId)?;
        let offset = record.saturating_mul(self.location_record_size);
        self.read_bytes::<2>("location", table, offset)
    }

    fn read_bytes<const N: usize>(
        &self,
        table: &'static str,
        buf: &[u8],
        offset: usize,
    ) -> Result<[u8; N]> {
        let end = offset.saturating_add(N);
        buf.get(offset..end)
            .and_then(|s| s.try_into().ok())
            .ok_or(Error::OffsetOutOfBounds {
                table,
                offset,
                end,
                len: buf.len(),
            })
    }

    fn read_u16(&self, table: &'static str, buf: &[u8], offset: usize) -> Result<u16> {
        self.read_bytes::<2>(table, buf, offset).map(u16::from_le_bytes)
    }

    fn read_u32(&self, table: &'static str, buf: &[u8], offset: usize) -> Result<u32> {
        self.read_bytes::<4>(table, buf, offset).map(u32::from_le_bytes)
    }

    fn read_i32(&self, table: &'static str, buf: &[u8], offset: usize) -> Result<i32> {
        self.read_bytes::<4>(table, buf, offset).map(i32::from_le_bytes)
    }
}

/// One decoded row of a packed bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedRow {
    pub start: u64,
    pub end: u64,
    pub payload: PackedPayload,
}

/// Decoded payload of a packed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedPayload {
    Country(u16),
    Geocode { packed_latitude: i32, longitude: i32 },
}

/// Decode a packed bucket buffer back into rows.
///
/// Assumes the kind's default payload width. Used by the `check` tooling
/// and tests; runtime lookup lives outside this crate.
pub fn unpack(family: AddressFamily, kind: IndexKind, data: &[u8]) -> Result<Vec<PackedRow>> {
    let width = family.width();
    let payload_size = kind.payload_size();
    let count = record_count("bucket", data.len(), 2 * width + payload_size)?;

    let mut rows = Vec::with_capacity(count);
    for k in 0..count {
        let start = family.read(data, k * width);
        let end = family.read(data, width * count + k * width);
        let line = 2 * width * count + k * payload_size;
        let payload = match kind {
            IndexKind::Country => PackedPayload::Country(u16::from_le_bytes(
                data[line..line + 2].try_into().unwrap(),
            )),
            IndexKind::Geocode => PackedPayload::Geocode {
                packed_latitude: i32::from_le_bytes(data[line..line + 4].try_into().unwrap()),
                longitude: i32::from_le_bytes(data[line + 4..line + 8].try_into().unwrap()),
            },
        };
        rows.push(PackedRow { start, end, payload });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::split_packed_latitude;

    fn u32_table(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn u16_table(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn geocode_table(rows: &[(u32, i32, i32)]) -> Vec<u8> {
        let mut out = Vec::with_capacity(rows.len() * GEOCODE_RECORD_SIZE);
        for (location_id, latitude, longitude) in rows {
            out.extend_from_slice(&location_id.to_le_bytes());
            out.extend_from_slice(&latitude.to_le_bytes());
            out.extend_from_slice(&longitude.to_le_bytes());
        }
        out
    }

    fn location_table(codes: &[[u8; 2]], record_size: usize) -> Vec<u8> {
        let mut out = vec![0u8; codes.len() * record_size];
        for (i, code) in codes.iter().enumerate() {
            out[i * record_size..i * record_size + 2].copy_from_slice(code);
        }
        out
    }

    #[test]
    fn test_country_layout_is_columnar() {
        let starts = u32_table(&[10, 20]);
        let ends = u32_table(&[19, 29]);
        let payload = u16_table(&[7, 0x0102]);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Country, &starts, &ends, &payload);
        let buf = packer.pack(0, 2).unwrap();

        assert_eq!(
            buf,
            vec![
                10, 0, 0, 0, 20, 0, 0, 0, // starts
                19, 0, 0, 0, 29, 0, 0, 0, // ends
                7, 0, 2, 1, // country ids
            ]
        );
    }

    #[test]
    fn test_empty_bucket_packs_empty() {
        let starts = u32_table(&[10]);
        let ends = u32_table(&[19]);
        let payload = u16_table(&[7]);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Country, &starts, &ends, &payload);
        assert!(packer.pack(1, 1).unwrap().is_empty());
    }

    #[test]
    fn test_v6_addresses_are_eight_bytes() {
        let starts: Vec<u8> = 0x1122334455667788u64.to_le_bytes().to_vec();
        let ends: Vec<u8> = 0x1122334455667789u64.to_le_bytes().to_vec();
        let payload = u16_table(&[1]);

        let packer =
            BucketPacker::new(AddressFamily::V6, IndexKind::Country, &starts, &ends, &payload);
        let buf = packer.pack(0, 1).unwrap();
        assert_eq!(buf.len(), 8 + 8 + 2);

        let rows = unpack(AddressFamily::V6, IndexKind::Country, &buf).unwrap();
        assert_eq!(rows[0].start, 0x1122334455667788);
        assert_eq!(rows[0].end, 0x1122334455667789);
    }

    #[test]
    fn test_geocode_carry_within_bucket() {
        let starts = u32_table(&[1, 2, 3]);
        let ends = u32_table(&[1, 2, 3]);
        let payload = geocode_table(&[(1, 100, 200), (2, 101, 201), (3, 102, 202)]);
        // record 1 is the sentinel, record 2 is US, record 3 is the sentinel
        let location = location_table(&[[0, 0], *b"US", [0, 0]], 8);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Geocode, &starts, &ends, &payload)
                .with_location(&location, 8);
        let buf = packer.pack(0, 3).unwrap();
        let rows = unpack(AddressFamily::V4, IndexKind::Geocode, &buf).unwrap();

        let us = country_code_to_number(*b"US").unwrap();
        let codes: Vec<u16> = rows
            .iter()
            .map(|r| match r.payload {
                PackedPayload::Geocode { packed_latitude, .. } => {
                    split_packed_latitude(packed_latitude).1
                }
                _ => unreachable!(),
            })
            .collect();

        // sentinel at bucket start inherits nothing; the next sentinel
        // inherits US from the row before it
        assert_eq!(codes, vec![0, us, us]);
    }

    #[test]
    fn test_geocode_carry_resets_per_bucket() {
        let starts = u32_table(&[1, 2, 3]);
        let ends = u32_table(&[1, 2, 3]);
        let payload = geocode_table(&[(1, 100, 200), (2, 101, 201), (3, 102, 202)]);
        let location = location_table(&[[0, 0], *b"US", [0, 0]], 8);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Geocode, &starts, &ends, &payload)
                .with_location(&location, 8);

        // row 2 packed alone: its sentinel must not see row 1's US
        let buf = packer.pack(2, 3).unwrap();
        let rows = unpack(AddressFamily::V4, IndexKind::Geocode, &buf).unwrap();
        match rows[0].payload {
            PackedPayload::Geocode { packed_latitude, .. } => {
                let (latitude, code) = split_packed_latitude(packed_latitude);
                assert_eq!(latitude, 102);
                assert_eq!(code, 0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_geocode_latitude_longitude_preserved() {
        let starts = u32_table(&[1]);
        let ends = u32_table(&[1]);
        let payload = geocode_table(&[(1, -345678, 1234567)]);
        let location = location_table(&[*b"AR"], 8);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Geocode, &starts, &ends, &payload)
                .with_location(&location, 8);
        let buf = packer.pack(0, 1).unwrap();
        let rows = unpack(AddressFamily::V4, IndexKind::Geocode, &buf).unwrap();

        match rows[0].payload {
            PackedPayload::Geocode {
                packed_latitude,
                longitude,
            } => {
                let (latitude, code) = split_packed_latitude(packed_latitude);
                assert_eq!(latitude, -345678);
                assert_eq!(code, country_code_to_number(*b"AR").unwrap());
                assert_eq!(longitude, 1234567);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_bucket_scaled_offsets_pinned() {
        // One-row bucket: the payload slot sits at byte 8 of the output,
        // so the scaled derivation reads the source record at 8 * 8 = 64.
        let starts = u32_table(&[100]);
        let ends = u32_table(&[200]);
        let mut payload = vec![0u8; 80];
        payload[64..68].copy_from_slice(&1u32.to_le_bytes());
        payload[68..72].copy_from_slice(&5i32.to_le_bytes());
        payload[72..76].copy_from_slice(&7i32.to_le_bytes());
        let location = location_table(&[*b"US"], 8);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Geocode, &starts, &ends, &payload)
                .with_location(&location, 8)
                .with_offset_mode(SourceOffsetMode::BucketScaled);
        let buf = packer.pack(0, 1).unwrap();

        let us = country_code_to_number(*b"US").unwrap() as i32;
        let packed = (5 << 10) | us;
        let mut expected = Vec::new();
        expected.extend_from_slice(&100u32.to_le_bytes());
        expected.extend_from_slice(&200u32.to_le_bytes());
        expected.extend_from_slice(&packed.to_le_bytes());
        expected.extend_from_slice(&7i32.to_le_bytes());
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_bucket_scaled_out_of_bounds_is_fatal() {
        let starts = u32_table(&[100]);
        let ends = u32_table(&[200]);
        // row-major sized table is far too short for the scaled offset
        let payload = geocode_table(&[(1, 5, 7)]);
        let location = location_table(&[*b"US"], 8);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Geocode, &starts, &ends, &payload)
                .with_location(&location, 8)
                .with_offset_mode(SourceOffsetMode::BucketScaled);
        match packer.pack(0, 1) {
            Err(Error::OffsetOutOfBounds { table, .. }) => assert_eq!(table, "payload"),
            other => panic!("expected bounds error, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_location_table_is_fatal() {
        let starts = u32_table(&[1]);
        let ends = u32_table(&[1]);
        let payload = geocode_table(&[(5, 100, 200)]);
        // only two records, but the row points at record 5
        let location = location_table(&[*b"US", *b"JP"], 8);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Geocode, &starts, &ends, &payload)
                .with_location(&location, 8);
        match packer.pack(0, 1) {
            Err(Error::OffsetOutOfBounds { table, .. }) => assert_eq!(table, "location"),
            other => panic!("expected bounds error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_location_id_is_fatal() {
        let starts = u32_table(&[1]);
        let ends = u32_table(&[1]);
        let payload = geocode_table(&[(0, 100, 200)]);
        let location = location_table(&[*b"US"], 8);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Geocode, &starts, &ends, &payload)
                .with_location(&location, 8);
        assert!(matches!(packer.pack(0, 1), Err(Error::InvalidLocationId)));
    }

    #[test]
    fn test_missing_location_table_is_fatal() {
        let starts = u32_table(&[1]);
        let ends = u32_table(&[1]);
        let payload = geocode_table(&[(1, 100, 200)]);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Geocode, &starts, &ends, &payload);
        assert!(matches!(
            packer.pack(0, 1),
            Err(Error::MissingLocationTable)
        ));
    }

    #[test]
    fn test_unpack_rejects_ragged_buffer() {
        assert!(unpack(AddressFamily::V4, IndexKind::Country, &[0u8; 11]).is_err());
    }

    #[test]
    fn test_country_roundtrip() {
        let starts = u32_table(&[0, 10, 20, 30]);
        let ends = u32_table(&[9, 19, 29, 39]);
        let ids = [840u16, 392, 76, 36];
        let payload = u16_table(&ids);

        let packer =
            BucketPacker::new(AddressFamily::V4, IndexKind::Country, &starts, &ends, &payload);
        let buf = packer.pack(1, 4).unwrap();
        let rows = unpack(AddressFamily::V4, IndexKind::Country, &buf).unwrap();

        assert_eq!(rows.len(), 3);
        for (k, row) in rows.iter().enumerate() {
            let j = k + 1;
            assert_eq!(row.start, (j * 10) as u64);
            assert_eq!(row.end, (j * 10 + 9) as u64);
            assert_eq!(row.payload, PackedPayload::Country(ids[j]));
        }
    }
}
