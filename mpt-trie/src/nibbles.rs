//! # Nibbles
//!
//! Keys in the MPT are represented as nibbles (half-bytes / 4 bits).
//! This allows branching on 16 possible values at each node.

use std::fmt;

/// Flag nibble bit marking a leaf path (bit 5 of the first encoded byte)
const LEAF_FLAG: u8 = 2;

/// Flag nibble bit marking an odd-length path
const ODD_FLAG: u8 = 1;

/// A sequence of nibbles (4-bit values)
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Nibbles {
    /// The nibble data
    data: Vec<u8>,
}

impl Nibbles {
    /// Create empty nibbles
    pub fn new() -> Self {
        Nibbles { data: Vec::new() }
    }

    /// Create from bytes (each byte becomes 2 nibbles)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() * 2);
        for byte in bytes {
            data.push(byte >> 4); // High nibble
            data.push(byte & 0x0f); // Low nibble
        }
        Nibbles { data }
    }

    /// Create from raw nibbles
    pub fn from_raw(nibbles: Vec<u8>) -> Self {
        debug_assert!(nibbles.iter().all(|n| *n < 16));
        Nibbles { data: nibbles }
    }

    /// Decode a hex prefix encoded path.
    ///
    /// Returns the path and whether the flag marks a leaf. The first nibble is
    /// the flag; for even-length paths the second nibble is padding and is
    /// dropped. Returns `None` for an empty input or an unknown flag nibble.
    pub fn from_hex_prefix(encoded: &[u8]) -> Option<(Self, bool)> {
        let first = *encoded.first()?;
        let flag = first >> 4;
        if flag > (LEAF_FLAG | ODD_FLAG) {
            return None;
        }

        let is_leaf = flag & LEAF_FLAG != 0;
        let odd = flag & ODD_FLAG != 0;

        let mut nibbles = Vec::with_capacity(encoded.len() * 2);
        if odd {
            // First byte carries the first real nibble
            nibbles.push(first & 0x0f);
        }
        for byte in &encoded[1..] {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0f);
        }

        Some((Nibbles { data: nibbles }, is_leaf))
    }

    /// Encode to hex prefix format
    ///
    /// Flag nibble is `2` for a leaf, `0` for an extension, plus `1` when the
    /// path length is odd. Even paths get a zero padding nibble after the flag.
    pub fn to_hex_prefix(&self, is_leaf: bool) -> Vec<u8> {
        let base = if is_leaf { LEAF_FLAG } else { 0 };
        let odd = self.len() % 2 == 1;

        let mut encoded = Vec::with_capacity(self.len() / 2 + 1);

        let rest = if odd {
            // First byte: flag | first nibble
            encoded.push((base + ODD_FLAG) << 4 | self.data[0]);
            &self.data[1..]
        } else {
            // First byte: flag << 4 | padding
            encoded.push(base << 4);
            &self.data[..]
        };

        for chunk in rest.chunks(2) {
            encoded.push(chunk[0] << 4 | chunk[1]);
        }

        encoded
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get nibble at index
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    /// Get first nibble
    pub fn first(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Get slice from index
    pub fn slice(&self, start: usize) -> Self {
        Nibbles {
            data: self.data[start..].to_vec(),
        }
    }

    /// Get slice range
    pub fn slice_range(&self, start: usize, end: usize) -> Self {
        Nibbles {
            data: self.data[start..end].to_vec(),
        }
    }

    /// Count of matching leading nibbles with another nibble sequence
    pub fn common_prefix_len(&self, other: &Nibbles) -> usize {
        self.data
            .iter()
            .zip(other.data.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Get as slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Default for Nibbles {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibbles(")?;
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let nibbles = Nibbles::from_bytes(&[0xab, 0xcd]);
        assert_eq!(nibbles.len(), 4);
        assert_eq!(nibbles.get(0), Some(0xa));
        assert_eq!(nibbles.get(1), Some(0xb));
        assert_eq!(nibbles.get(2), Some(0xc));
        assert_eq!(nibbles.get(3), Some(0xd));
        assert_eq!(nibbles.get(4), None);
    }

    #[test]
    fn test_hex_prefix_leaf_odd() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3]);
        let encoded = nibbles.to_hex_prefix(true);
        // Odd leaf: flag = 3, first byte = 0x31
        assert_eq!(encoded, vec![0x31, 0x23]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_leaf_even() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3, 4]);
        let encoded = nibbles.to_hex_prefix(true);
        // Even leaf: flag = 2, padded, first byte = 0x20
        assert_eq!(encoded, vec![0x20, 0x12, 0x34]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_extension_odd() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3]);
        let encoded = nibbles.to_hex_prefix(false);
        assert_eq!(encoded, vec![0x11, 0x23]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(!is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_extension_even() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3, 4]);
        let encoded = nibbles.to_hex_prefix(false);
        assert_eq!(encoded, vec![0x00, 0x12, 0x34]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(!is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_empty_path() {
        let encoded = Nibbles::new().to_hex_prefix(true);
        assert_eq!(encoded, vec![0x20]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(is_leaf);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_hex_prefix_rejects_bad_flag() {
        assert!(Nibbles::from_hex_prefix(&[]).is_none());
        assert!(Nibbles::from_hex_prefix(&[0x41, 0x23]).is_none());
    }

    #[test]
    fn test_common_prefix() {
        let a = Nibbles::from_raw(vec![1, 2, 3, 4, 5]);
        let b = Nibbles::from_raw(vec![1, 2, 3, 6, 7]);
        assert_eq!(a.common_prefix_len(&b), 3);

        let c = Nibbles::from_raw(vec![9]);
        assert_eq!(a.common_prefix_len(&c), 0);
        assert_eq!(a.common_prefix_len(&Nibbles::new()), 0);
        assert_eq!(a.common_prefix_len(&a.slice_range(0, 2)), 2);
    }

    #[test]
    fn test_slice() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3, 4, 5]);

        let sliced = nibbles.slice(2);
        assert_eq!(sliced, Nibbles::from_raw(vec![3, 4, 5]));

        let range = nibbles.slice_range(1, 4);
        assert_eq!(range, Nibbles::from_raw(vec![2, 3, 4]));

        assert!(nibbles.slice(5).is_empty());
    }

    #[test]
    fn test_display() {
        let nibbles = Nibbles::from_bytes(b"a");
        assert_eq!(nibbles.to_string(), "61");
        assert_eq!(format!("{:?}", nibbles), "Nibbles(61)");
    }
}
