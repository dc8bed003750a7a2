//! Minimal molecule serialization, just the pieces witness/script hashing
//! needs. Layout rules follow the Nervos molecule spec (fixvec = u32 size +
//! items, dynvec = u32 full size + u32 offsets + items).

pub struct Serializer;

impl Serializer {
    pub fn serialize_u32(value: u32) -> Vec<u8> {
        value.to_le_bytes().to_vec()
    }

    pub fn serialize_u64(value: u64) -> Vec<u8> {
        value.to_le_bytes().to_vec()
    }

    /// Concatenation, for fixed-size structs.
    pub fn serialize_struct(fields: &[&[u8]]) -> Vec<u8> {
        let mut out = vec![];
        for field in fields {
            out.extend_from_slice(field);
        }
        out
    }

    /// fixvec: total byte size then the raw items.
    pub fn serialize_fixed_vec(items: &[&[u8]]) -> Vec<u8> {
        let total: usize = items.iter().map(|i| i.len()).sum();
        let mut out = Self::serialize_u32(total as u32);
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }

    /// dynvec: full size, per-item offsets, then the items.
    pub fn serialize_dynamic_vec(items: &[&[u8]]) -> Vec<u8> {
        const HEADER_UNIT: u32 = 4;
        let header_len = HEADER_UNIT + HEADER_UNIT * items.len() as u32;

        let mut offsets = Vec::with_capacity(items.len());
        let mut cursor = header_len;
        for item in items {
            offsets.push(cursor);
            cursor += item.len() as u32;
        }

        let mut out = Self::serialize_u32(cursor);
        for offset in offsets {
            out.extend_from_slice(&Self::serialize_u32(offset));
        }
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }
}
