//! Record wire format.
//!
//! ```text
//! +-----------+----------------+-----------------+
//! | kind: u32 | timestamp: u64 | value: [u8]     |
//! +-----------+----------------+-----------------+
//! ```
//!
//! Both integers are big-endian. Only `Value` records carry trailing bytes;
//! trailing bytes after an `Empty` or `Tombstone` header are ignored.

use bytes::{BufMut, Bytes, BytesMut};

use super::types::{RecordKind, TimestampedRecord};
use crate::error::StoreError;

pub const HEADER_LEN: usize = 4 + 8;

impl TimestampedRecord {
    pub fn encode(&self) -> Bytes {
        let payload_len = self.payload().map_or(0, |v| v.len());
        let mut buf = BytesMut::with_capacity(HEADER_LEN + payload_len);
        buf.put_u32(self.kind().tag());
        buf.put_u64(self.timestamp());
        if let Some(value) = self.payload() {
            buf.put_slice(value);
        }
        buf.freeze()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < HEADER_LEN {
            return Err(StoreError::Codec(format!(
                "record is {} bytes, header needs {}",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let (tag, rest) = bytes.split_at(4);
        let (timestamp, value) = rest.split_at(8);
        let tag = u32::from_be_bytes([tag[0], tag[1], tag[2], tag[3]]);
        let mut ts = [0u8; 8];
        ts.copy_from_slice(timestamp);
        let timestamp = u64::from_be_bytes(ts);

        match RecordKind::from_tag(tag) {
            Some(RecordKind::Value) => Ok(TimestampedRecord::value(
                Bytes::copy_from_slice(value),
                timestamp,
            )),
            Some(RecordKind::Empty) => Ok(TimestampedRecord::value(Bytes::new(), timestamp)),
            Some(RecordKind::Tombstone) => Ok(TimestampedRecord::tombstone(timestamp)),
            None => Err(StoreError::Codec(format!("unknown record kind {}", tag))),
        }
    }
}
