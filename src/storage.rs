use core::fmt::Debug;
use core::hash::{Hash, Hasher};

use num_traits::{
    CheckedDiv, PrimInt, WrappingAdd, WrappingMul, WrappingShl, WrappingShr, WrappingSub, Zero,
};

/// Serde bounds carried by every storage integer when the `serde` feature is on.
#[cfg(feature = "serde")]
pub trait RawSerde: serde::Serialize + for<'de> serde::Deserialize<'de> {}

#[cfg(feature = "serde")]
impl<T> RawSerde for T where T: serde::Serialize + for<'de> serde::Deserialize<'de> {}

/// Serde bounds carried by every storage integer when the `serde` feature is on.
#[cfg(not(feature = "serde"))]
pub trait RawSerde {}

#[cfg(not(feature = "serde"))]
impl<T> RawSerde for T {}

/// A native integer that can hold the raw value of a [`Fixed`](crate::Fixed).
///
/// Implemented for every primitive integer. All arithmetic that goes through
/// this trait wraps on overflow.
pub trait Storage:
    PrimInt
    + WrappingAdd
    + WrappingSub
    + WrappingMul
    + WrappingShl
    + WrappingShr
    + Hash
    + Debug
    + Default
    + RawSerde
    + 'static
{
    /// Bit width of the integer.
    const BITS: u32;

    /// Whether the integer is two's-complement signed.
    const SIGNED: bool;

    const ZERO: Self;

    /// Sign-extends (or zero-extends, for unsigned types) to 128 bits.
    fn to_bits(self) -> u128;

    /// Keeps the low `Self::BITS` bits of `bits`, like an `as` cast.
    fn from_bits(bits: u128) -> Self;

    /// Reinterprets as the unsigned integer of the same width, then zero-extends.
    fn zero_extend(self) -> u128;

    /// Truncating division. Panics on a zero divisor, wraps `MIN / -1`.
    fn wrapping_div(self, rhs: Self) -> Self;

    /// Float to integer, truncating toward zero and saturating at the bounds.
    fn from_f32_trunc(value: f32) -> Self;

    /// Float to integer, truncating toward zero and saturating at the bounds.
    fn from_f64_trunc(value: f64) -> Self;

    fn as_f32(self) -> f32;

    fn as_f64(self) -> f64;

    /// `(self * rhs) >> shift` through the [`Widen`] intermediate, or `None`
    /// when this integer has no wider counterpart.
    fn widening_mul_shr(self, rhs: Self, shift: u32) -> Option<Self>;

    /// Feeds the value, reinterpreted as unsigned, to `state`.
    fn hash_unsigned<H: Hasher>(self, state: &mut H);

    /// Converts with `as` semantics: sign-extend or zero-extend, then truncate.
    #[inline(always)]
    fn cast<T: Storage>(self) -> T {
        T::from_bits(self.to_bits())
    }
}

/// Maps a storage integer to a strictly wider integer of the same signedness.
///
/// Only implemented where the wider type exists: 8, 16, 32 and 64 bit
/// integers widen to 16, 32, 64 and 128 bits, and pointer-sized integers
/// widen to twice the target's pointer width. 128-bit integers have no
/// mapping.
pub trait Widen: Storage {
    type Wide: PrimInt + WrappingShl + WrappingShr;

    fn widen(self) -> Self::Wide;

    /// Truncates back to the storage width.
    fn narrow(wide: Self::Wide) -> Self;

    /// Full-width product shifted right by `shift`, then narrowed.
    #[inline(always)]
    fn widened_mul_shr(self, rhs: Self, shift: u32) -> Self {
        Self::narrow((self.widen() * rhs.widen()).wrapping_shr(shift))
    }

    /// Dividend shifted left by `shift` before the division, then narrowed.
    /// Panics on a zero divisor; `MIN / -1` in the wide type wraps to `MIN`.
    #[inline(always)]
    fn widened_div_shl(self, rhs: Self, shift: u32) -> Self {
        let dividend = self.widen().wrapping_shl(shift);
        let divisor = rhs.widen();
        match dividend.checked_div(&divisor) {
            Some(quotient) => Self::narrow(quotient),
            None if divisor.is_zero() => Self::narrow(dividend / divisor),
            None => Self::narrow(dividend),
        }
    }
}

macro_rules! impl_storage {
    ($t:ty, $unsigned:ty, $signed:literal, $wide:ty) => {
        impl_storage!(@storage $t, $unsigned, $signed, wide);

        impl Widen for $t {
            type Wide = $wide;

            #[inline(always)]
            fn widen(self) -> $wide {
                self as $wide
            }

            #[inline(always)]
            fn narrow(wide: $wide) -> Self {
                wide as $t
            }
        }
    };
    ($t:ty, $unsigned:ty, $signed:literal) => {
        impl_storage!(@storage $t, $unsigned, $signed, none);
    };
    (@storage $t:ty, $unsigned:ty, $signed:literal, $widening:ident) => {
        impl Storage for $t {
            const BITS: u32 = <$t>::BITS;
            const SIGNED: bool = $signed;
            const ZERO: Self = 0;

            #[inline(always)]
            fn to_bits(self) -> u128 {
                self as i128 as u128
            }

            #[inline(always)]
            fn from_bits(bits: u128) -> Self {
                bits as $t
            }

            #[inline(always)]
            fn zero_extend(self) -> u128 {
                self as $unsigned as u128
            }

            #[inline(always)]
            fn wrapping_div(self, rhs: Self) -> Self {
                <$t>::wrapping_div(self, rhs)
            }

            #[inline(always)]
            fn from_f32_trunc(value: f32) -> Self {
                value as $t
            }

            #[inline(always)]
            fn from_f64_trunc(value: f64) -> Self {
                value as $t
            }

            #[inline(always)]
            fn as_f32(self) -> f32 {
                self as f32
            }

            #[inline(always)]
            fn as_f64(self) -> f64 {
                self as f64
            }

            impl_storage!(@widening_mul $widening);

            #[inline(always)]
            fn hash_unsigned<H: Hasher>(self, state: &mut H) {
                (self as $unsigned).hash(state)
            }
        }
    };
    (@widening_mul wide) => {
        #[inline(always)]
        fn widening_mul_shr(self, rhs: Self, shift: u32) -> Option<Self> {
            Some(Widen::widened_mul_shr(self, rhs, shift))
        }
    };
    (@widening_mul none) => {
        #[inline(always)]
        fn widening_mul_shr(self, _rhs: Self, _shift: u32) -> Option<Self> {
            None
        }
    };
}

impl_storage!(i8, u8, true, i16);
impl_storage!(i16, u16, true, i32);
impl_storage!(i32, u32, true, i64);
impl_storage!(i64, u64, true, i128);
impl_storage!(i128, u128, true);
#[cfg(target_pointer_width = "64")]
impl_storage!(isize, usize, true, i128);
#[cfg(target_pointer_width = "32")]
impl_storage!(isize, usize, true, i64);
#[cfg(target_pointer_width = "16")]
impl_storage!(isize, usize, true, i32);

impl_storage!(u8, u8, false, u16);
impl_storage!(u16, u16, false, u32);
impl_storage!(u32, u32, false, u64);
impl_storage!(u64, u64, false, u128);
impl_storage!(u128, u128, false);
#[cfg(target_pointer_width = "64")]
impl_storage!(usize, usize, false, u128);
#[cfg(target_pointer_width = "32")]
impl_storage!(usize, usize, false, u64);
#[cfg(target_pointer_width = "16")]
impl_storage!(usize, usize, false, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_and_signedness() {
        assert_eq!(<i8 as Storage>::BITS, 8);
        assert_eq!(<u64 as Storage>::BITS, 64);
        assert_eq!(<i128 as Storage>::BITS, 128);
        assert!(<i32 as Storage>::SIGNED);
        assert!(!<u32 as Storage>::SIGNED);
        assert_eq!(<usize as Storage>::BITS, usize::BITS);
    }

    #[test]
    fn test_to_bits_sign_extends() {
        assert_eq!((-1i8).to_bits(), u128::MAX);
        assert_eq!(255u8.to_bits(), 255);
        assert_eq!(i32::MIN.to_bits(), (i32::MIN as i128) as u128);
    }

    #[test]
    fn test_zero_extend() {
        assert_eq!((-1i8).zero_extend(), 0xff);
        assert_eq!((-1i64).zero_extend(), u64::MAX as u128);
        assert_eq!(7u16.zero_extend(), 7);
    }

    #[test]
    fn test_cast_matches_as() {
        assert_eq!((-1i8).cast::<u8>(), 255u8);
        assert_eq!(255u8.cast::<i16>(), 255i16);
        assert_eq!((-1i8).cast::<i64>(), -1i64);
        assert_eq!(0x1_2345i32.cast::<u16>(), 0x2345u16);
        assert_eq!(u128::MAX.cast::<i32>(), -1i32);
    }

    #[test]
    fn test_float_truncates_toward_zero() {
        assert_eq!(<i32 as Storage>::from_f64_trunc(2.9), 2);
        assert_eq!(<i32 as Storage>::from_f64_trunc(-2.9), -2);
        assert_eq!(<u8 as Storage>::from_f32_trunc(300.0), u8::MAX);
        assert_eq!(<i16 as Storage>::from_f64_trunc(f64::NAN), 0);
    }

    #[test]
    fn test_wrapping_div() {
        assert_eq!(Storage::wrapping_div(7i32, 2), 3);
        assert_eq!(Storage::wrapping_div(-7i32, 2), -3);
        assert_eq!(Storage::wrapping_div(i8::MIN, -1), i8::MIN);
    }

    #[test]
    #[should_panic]
    fn test_wrapping_div_by_zero_traps() {
        let _ = Storage::wrapping_div(1u32, 0);
    }

    #[test]
    fn test_widen_narrow() {
        assert_eq!(100i8.widen(), 100i16);
        assert_eq!(<i8 as Widen>::narrow(0x180), -128i8);
        assert_eq!(u64::MAX.widen(), u64::MAX as u128);
        assert_eq!(<u32 as Widen>::narrow(0x1_0000_0001), 1u32);
    }

    #[test]
    fn test_widened_mul_shr() {
        // 10.0 * 3.0 at 16 fractional bits
        let ten = 10i32 << 16;
        let three = 3i32 << 16;
        assert_eq!(ten.widened_mul_shr(three, 16), 30 << 16);

        // product exceeds i32 before the shift but not after
        let big = 30_000i32 << 16;
        let half = 1i32 << 15;
        assert_eq!(big.widened_mul_shr(half, 16), 15_000 << 16);
    }

    #[test]
    fn test_widened_div_shl() {
        let seven = 7i32 << 16;
        let two = 2i32 << 16;
        assert_eq!(seven.widened_div_shl(two, 16), (7 << 16) / 2);

        let one = 1u8 << 4;
        let four = 4u8 << 4;
        assert_eq!(one.widened_div_shl(four, 4), 4u8);
    }

    #[test]
    fn test_widening_mul_availability() {
        assert_eq!(4i16.widening_mul_shr(8, 2), Some(8));
        assert_eq!(4u64.widening_mul_shr(8, 2), Some(8));
        assert_eq!(4i128.widening_mul_shr(8, 2), None);
        assert_eq!(4u128.widening_mul_shr(8, 2), None);
        assert_eq!(4usize.widening_mul_shr(8, 2), Some(8));
        assert_eq!(4isize.widening_mul_shr(-8, 2), Some(-8));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_pointer_sized_matches_fixed_width() {
        let a = 3isize << 39;
        let b = 5isize << 38;
        assert_eq!(
            a.widened_mul_shr(b, 40) as i64,
            (a as i64).widened_mul_shr(b as i64, 40)
        );
        assert_eq!(<isize as Widen>::narrow(isize::MAX.widen()), isize::MAX);
        assert_eq!(usize::MAX.widen() >> usize::BITS, 0);
    }

    #[test]
    fn test_widened_div_shl_overflow_wraps() {
        // i64::MIN << 64 is i128::MIN, and i128::MIN / -1 wraps to itself
        assert_eq!(i64::MIN.widened_div_shl(-1, 64), 0);
        assert_eq!(i8::MIN.widened_div_shl(-1, 8), 0);
        assert_eq!((-4i32).widened_div_shl(-2, 0), 2);
    }

    #[test]
    #[should_panic]
    fn test_widened_div_shl_by_zero_traps() {
        let _ = 1i32.widened_div_shl(0, 16);
    }
}
