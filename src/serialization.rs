//! Compact binary snapshots of histogram contents.
//!
//! The encoding is built for transport: a small fixed header followed by
//! the counts array as sign-folded (zig-zag) LEB128 varints, where a
//! negative number stands for a run of that many empty slots and trailing
//! empty slots are omitted entirely. Sparse histograms - the common case -
//! encode to a few dozen bytes regardless of their configured range.
//!
//! ```text
//! +----------+---------+---------+--------------------------------------+
//! | "isto"   | version | figures | lowest, highest, total, min, max     |
//! | 4 bytes  | 1 byte  | 1 byte  | LEB128 varints                       |
//! +----------+---------+---------+--------------------------------------+
//! | counts: zig-zag LEB128; n > 0 slot count, n < 0 run of -n zeros     |
//! +---------------------------------------------------------------------+
//! ```
//!
//! [`decode`] validates everything before constructing the histogram:
//! truncated input, an alien cookie, an unsupported version, counts
//! overrunning the array and a total that disagrees with the bucket sum
//! are all rejected without returning a partially populated histogram.
//!
//! ```rust
//! use istogrammi::serialization::{decode, encode};
//! use istogrammi::Histogram;
//!
//! let hist = Histogram::new(1, 3_600_000_000, 3).unwrap();
//! hist.record(42).unwrap();
//!
//! let payload = encode(&hist);
//! let restored = decode(&payload).unwrap();
//! assert_eq!(restored, hist);
//! ```
//!
//! Auto-ranging histograms wrap the same payload with their window state
//! under a distinct cookie; see [`encode_double`] / [`decode_double`].

use crate::double::DoubleHistogram;
use crate::errors::DecodeError;
use crate::histogram::Histogram;

/// Cookie opening an integer histogram payload (`"isto"` on the wire).
const COOKIE: u32 = u32::from_le_bytes(*b"isto");
/// Cookie opening an auto-ranging histogram payload (`"istd"` on the wire).
const DOUBLE_COOKIE: u32 = u32::from_le_bytes(*b"istd");
/// Current format version.
const VERSION: u8 = 1;

/// Encodes `histogram` into a self-contained binary snapshot.
pub fn encode(histogram: &Histogram) -> Vec<u8> {
    let layout = histogram.layout();
    let mut payload = Vec::with_capacity(64);
    payload.extend_from_slice(&COOKIE.to_le_bytes());
    payload.push(VERSION);
    payload.push(layout.significant_figures());
    write_varint(&mut payload, layout.lowest_trackable_value());
    write_varint(&mut payload, layout.highest_trackable_value());
    write_varint(&mut payload, histogram.total_count());
    write_varint(&mut payload, histogram.min_non_zero_raw());
    write_varint(&mut payload, histogram.max_raw());
    write_counts(&mut payload, histogram);
    payload
}

/// Decodes a snapshot produced by [`encode`].
pub fn decode(payload: &[u8]) -> Result<Histogram, DecodeError> {
    let mut reader = Reader::new(payload);
    let cookie = reader.read_u32()?;
    if cookie != COOKIE {
        return Err(DecodeError::UnknownCookie(cookie));
    }
    let version = reader.read_u8()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    decode_body(&mut reader)
}

/// Encodes an auto-ranging histogram, window state included.
pub fn encode_double(histogram: &DoubleHistogram) -> Vec<u8> {
    let mut payload = Vec::with_capacity(80);
    payload.extend_from_slice(&DOUBLE_COOKIE.to_le_bytes());
    payload.push(VERSION);
    write_varint(&mut payload, histogram.highest_to_lowest_value_ratio());
    payload.extend_from_slice(&histogram.current_lowest_value().to_le_bytes());
    payload.extend_from_slice(&encode(histogram.integer_values()));
    payload
}

/// Decodes a snapshot produced by [`encode_double`].
pub fn decode_double(payload: &[u8]) -> Result<DoubleHistogram, DecodeError> {
    let mut reader = Reader::new(payload);
    let cookie = reader.read_u32()?;
    if cookie != DOUBLE_COOKIE {
        return Err(DecodeError::UnknownCookie(cookie));
    }
    let version = reader.read_u8()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let ratio = reader.read_varint()?;
    let floor = f64::from_le_bytes(reader.read_array()?);
    let values = decode(reader.rest())?;
    let significant_figures = values.layout().significant_figures();
    DoubleHistogram::from_parts(ratio, significant_figures, floor, values)
}

/// Shared body of [`decode`], after cookie and version checks.
fn decode_body(reader: &mut Reader<'_>) -> Result<Histogram, DecodeError> {
    let significant_figures = reader.read_u8()?;
    let lowest = reader.read_varint()?;
    let highest = reader.read_varint()?;
    let total = reader.read_varint()?;
    let min_raw = reader.read_varint()?;
    let max_raw = reader.read_varint()?;

    let histogram = Histogram::new(lowest, highest, significant_figures)?;

    let mut index = 0usize;
    let mut summed = 0u64;
    while !reader.is_empty() {
        let entry = zigzag_decode(reader.read_varint()?);
        if entry > 0 {
            let count = entry as u64;
            histogram
                .set_count_at_index(index, count)
                .ok_or(DecodeError::CountsOverrun)?;
            summed = summed.checked_add(count).ok_or(DecodeError::Malformed)?;
            index += 1;
        } else if entry < 0 {
            // A run of -entry empty slots.
            let run = entry
                .checked_neg()
                .ok_or(DecodeError::Malformed)? as usize;
            index = index.checked_add(run).ok_or(DecodeError::CountsOverrun)?;
            if index > histogram.len() {
                return Err(DecodeError::CountsOverrun);
            }
        } else {
            return Err(DecodeError::Malformed);
        }
    }
    if index > histogram.len() {
        return Err(DecodeError::CountsOverrun);
    }
    if summed != total {
        return Err(DecodeError::TotalCountMismatch);
    }

    histogram.set_aggregates(total, min_raw, max_raw);
    Ok(histogram)
}

/// Appends the counts stream: zig-zag varints with zero-run folding.
fn write_counts(payload: &mut Vec<u8>, histogram: &Histogram) {
    let mut zero_run = 0i64;
    for index in 0..histogram.len() {
        let count = histogram.count_at_index(index).unwrap_or(0);
        if count == 0 {
            zero_run += 1;
            continue;
        }
        if zero_run > 0 {
            write_varint(payload, zigzag_encode(-zero_run));
            zero_run = 0;
        }
        write_varint(payload, zigzag_encode(count as i64));
    }
    // Trailing zeros are implicit.
}

#[inline]
fn zigzag_encode(value: i64) -> u64 {
    (value.wrapping_shl(1) ^ (value >> 63)) as u64
}

#[inline]
fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

fn write_varint(payload: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        payload.push((value as u8) | 0x80);
        value >>= 7;
    }
    payload.push(value as u8);
}

/// Bounds-checked cursor over a payload; every read fails with
/// [`DecodeError::Truncated`] instead of slicing past the end.
struct Reader<'a> {
    payload: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Reader {
            payload,
            position: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.position >= self.payload.len()
    }

    fn rest(&self) -> &'a [u8] {
        &self.payload[self.position.min(self.payload.len())..]
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .payload
            .get(self.position)
            .ok_or(DecodeError::Truncated)?;
        self.position += 1;
        Ok(byte)
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.position.checked_add(N).ok_or(DecodeError::Truncated)?;
        let bytes = self
            .payload
            .get(self.position..end)
            .ok_or(DecodeError::Truncated)?;
        self.position = end;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift >= 63 && byte > 1 {
                return Err(DecodeError::Malformed);
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(DecodeError::Malformed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_histogram() -> Histogram {
        let hist = Histogram::new(1, 3_600_000_000, 3).unwrap();
        hist.record(1).unwrap();
        hist.record_n(500, 42).unwrap();
        hist.record(1_000_000).unwrap();
        hist.record(3_600_000_000).unwrap();
        hist
    }

    #[test]
    fn round_trip_reproduces_everything() {
        let hist = sample_histogram();
        let restored = decode(&encode(&hist)).unwrap();

        assert_eq!(restored, hist);
        assert_eq!(restored.total_count(), hist.total_count());
        assert_eq!(restored.min(), hist.min());
        assert_eq!(restored.max(), hist.max());
        for index in 0..hist.len() {
            assert_eq!(restored.count_at_index(index), hist.count_at_index(index));
        }
    }

    #[test]
    fn round_trip_of_an_empty_histogram() {
        let hist = Histogram::new(1, 1000, 2).unwrap();
        let restored = decode(&encode(&hist)).unwrap();
        assert_eq!(restored, hist);
        assert_eq!(restored.max(), 0);
        assert_eq!(restored.min_non_zero(), u64::MAX);
    }

    #[test]
    fn zero_runs_keep_sparse_payloads_small() {
        let hist = Histogram::new(1, 3_600_000_000, 3).unwrap();
        hist.record(1).unwrap();
        hist.record(3_000_000_000).unwrap();

        // Two occupied slots out of ~23k encode to a handful of bytes.
        let payload = encode(&hist);
        assert!(payload.len() < 40, "payload was {} bytes", payload.len());
    }

    #[test]
    fn truncated_payloads_are_rejected() {
        let payload = encode(&sample_histogram());
        assert_eq!(decode(&[]).unwrap_err(), DecodeError::Truncated);
        assert_eq!(decode(&payload[..3]).unwrap_err(), DecodeError::Truncated);
        assert_eq!(decode(&payload[..5]).unwrap_err(), DecodeError::Truncated);
        for cut in 6..payload.len() {
            assert!(
                decode(&payload[..cut]).is_err(),
                "prefix of {cut} bytes decoded"
            );
        }
    }

    #[test]
    fn alien_cookie_is_rejected() {
        let mut payload = encode(&sample_histogram());
        payload[0] = b'x';
        assert!(matches!(
            decode(&payload).unwrap_err(),
            DecodeError::UnknownCookie(_)
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut payload = encode(&sample_histogram());
        payload[4] = 99;
        assert_eq!(
            decode(&payload).unwrap_err(),
            DecodeError::UnsupportedVersion(99)
        );
    }

    #[test]
    fn tampered_count_is_caught_by_the_total() {
        let hist = Histogram::new(1, 1000, 2).unwrap();
        hist.record(10).unwrap();
        let mut payload = encode(&hist);
        // The final byte is the varint for the single slot count (1);
        // bump it to 2 and the bucket sum no longer matches the total.
        *payload.last_mut().unwrap() = zigzag_encode(2) as u8;
        assert_eq!(decode(&payload).unwrap_err(), DecodeError::TotalCountMismatch);
    }

    #[test]
    fn counts_overrun_is_rejected() {
        let hist = Histogram::new(1, 1000, 2).unwrap();
        hist.record(10).unwrap();
        let mut payload = encode(&hist);
        // Append a zero run that jumps far past the counts array.
        write_varint(&mut payload, zigzag_encode(-10_000_000));
        assert_eq!(decode(&payload).unwrap_err(), DecodeError::CountsOverrun);
    }

    #[test]
    fn zero_entry_is_malformed() {
        let hist = Histogram::new(1, 1000, 2).unwrap();
        let mut payload = encode(&hist);
        write_varint(&mut payload, zigzag_encode(0));
        assert_eq!(decode(&payload).unwrap_err(), DecodeError::Malformed);
    }

    #[test]
    fn zigzag_folds_signs() {
        for value in [0i64, 1, -1, 2, -2, 1000, -1000, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(value)), value);
        }
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
    }

    #[test]
    fn varints_round_trip() {
        let values = [0u64, 1, 127, 128, 300, 16_383, 16_384, u64::MAX];
        let mut payload = Vec::new();
        for &value in &values {
            write_varint(&mut payload, value);
        }
        let mut reader = Reader::new(&payload);
        for &value in &values {
            assert_eq!(reader.read_varint().unwrap(), value);
        }
        assert!(reader.is_empty());
    }

    #[test]
    fn double_round_trip_keeps_the_window() {
        let mut hist = DoubleHistogram::new(3_600_000_000, 3).unwrap();
        hist.record(1.0).unwrap();
        hist.record(0.125).unwrap();
        hist.record(2048.5).unwrap();

        let restored = decode_double(&encode_double(&hist)).unwrap();
        assert_eq!(
            restored.highest_to_lowest_value_ratio(),
            hist.highest_to_lowest_value_ratio()
        );
        assert_eq!(restored.current_lowest_value(), hist.current_lowest_value());
        assert_eq!(restored.total_count(), 3);
        for value in [1.0, 0.125, 2048.5] {
            assert_eq!(restored.count_at_value(value), hist.count_at_value(value));
        }
    }

    #[test]
    fn double_decode_rejects_integer_payloads() {
        let payload = encode(&sample_histogram());
        assert!(matches!(
            decode_double(&payload).unwrap_err(),
            DecodeError::UnknownCookie(_)
        ));
    }
}
