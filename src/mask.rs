//! Bit masks over a storage integer.
//!
//! Both helpers are defined for `0 <= n <= S::BITS`. Larger `n` behaves like
//! an out-of-range native shift and must not be relied upon.

use crate::storage::Storage;

/// Mask with the low `n` bits set.
///
/// ```
/// use fixpoint::mask_low;
///
/// assert_eq!(mask_low::<u8>(3), 0b0000_0111);
/// assert_eq!(mask_low::<i16>(16), -1);
/// ```
#[inline(always)]
pub fn mask_low<S: Storage>(n: u32) -> S {
    if n == 0 {
        return S::ZERO;
    }
    (!S::ZERO).unsigned_shr(S::BITS - n)
}

/// Mask with the high `n` bits set.
///
/// ```
/// use fixpoint::mask_high;
///
/// assert_eq!(mask_high::<u8>(3), 0b1110_0000);
/// assert_eq!(mask_high::<i32>(0), 0);
/// ```
#[inline(always)]
pub fn mask_high<S: Storage>(n: u32) -> S {
    if n == 0 {
        return S::ZERO;
    }
    (!S::ZERO).unsigned_shl(S::BITS - n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_low_edges() {
        assert_eq!(mask_low::<u32>(0), 0);
        assert_eq!(mask_low::<u32>(1), 1);
        assert_eq!(mask_low::<u32>(16), 0xffff);
        assert_eq!(mask_low::<u32>(32), u32::MAX);
        assert_eq!(mask_low::<u128>(128), u128::MAX);
    }

    #[test]
    fn test_mask_low_signed_is_logical() {
        // the fill must not sign-extend
        assert_eq!(mask_low::<i8>(7), 0x7f);
        assert_eq!(mask_low::<i32>(16), 0xffff);
        assert_eq!(mask_low::<i64>(63), i64::MAX);
        assert_eq!(mask_low::<i8>(8), -1);
    }

    #[test]
    fn test_mask_high_edges() {
        assert_eq!(mask_high::<u16>(0), 0);
        assert_eq!(mask_high::<u16>(1), 0x8000);
        assert_eq!(mask_high::<u16>(16), u16::MAX);
        assert_eq!(mask_high::<i32>(1), i32::MIN);
        assert_eq!(mask_high::<i64>(64), -1);
    }

    #[test]
    fn test_masks_partition_the_width() {
        for n in 0..=32u32 {
            let low = mask_low::<u32>(n);
            let high = mask_high::<u32>(32 - n);
            assert_eq!(low & high, 0, "overlap at n = {n}");
            assert_eq!(low | high, u32::MAX, "gap at n = {n}");
            assert_eq!(low.count_ones(), n);
        }
    }
}
