//! Identity hashing for fixed-point keys.
//!
//! [`Fixed`](crate::Fixed) hashes by feeding its raw value, reinterpreted as
//! the unsigned integer of the same width, to the hasher. [`IdentityHasher`]
//! returns that integer unchanged, so a `HashMap` built with
//! [`BuildIdentityHasher`] hashes fixed-point keys with the identity function.

use core::hash::{BuildHasherDefault, Hasher};

/// A [`Hasher`] whose output is the last integer written to it.
///
/// Byte slices are folded in little-endian order, keeping the low 64 bits.
/// Integers wider than 64 bits are truncated.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher {
    hash: u64,
}

/// Builds [`IdentityHasher`]s for hash containers.
pub type BuildIdentityHasher = BuildHasherDefault<IdentityHasher>;

impl Hasher for IdentityHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes.iter().rev() {
            self.hash = (self.hash << 8) | byte as u64;
        }
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.hash = i as u64;
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.hash = i as u64;
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.hash = i as u64;
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }

    #[inline]
    fn write_u128(&mut self, i: u128) {
        self.hash = i as u64;
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.hash = i as u64;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::Fixed16;

    #[test]
    fn test_integers_hash_to_themselves() {
        let mut hasher = IdentityHasher::default();
        hasher.write_u32(0xdead_beef);
        assert_eq!(hasher.finish(), 0xdead_beef);

        let mut hasher = IdentityHasher::default();
        hasher.write_u8(7);
        assert_eq!(hasher.finish(), 7);
    }

    #[test]
    fn test_bytes_fold_little_endian() {
        let mut hasher = IdentityHasher::default();
        hasher.write(&0x0102_0304u32.to_le_bytes());
        assert_eq!(hasher.finish(), 0x0102_0304);
    }

    #[test]
    fn test_fixed_keys_in_hash_map() {
        let mut map: HashMap<Fixed16, &str, BuildIdentityHasher> = HashMap::default();
        map.insert(Fixed16::from(25), "twenty-five");
        map.insert(Fixed16::from(2.5f64), "two and a half");

        assert_eq!(map.get(&Fixed16::from(25.0f32)), Some(&"twenty-five"));
        assert_eq!(map.get(&Fixed16::from_raw(163_840)), Some(&"two and a half"));
        assert_eq!(map.get(&Fixed16::from(3)), None);
    }
}
