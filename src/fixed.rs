use core::cmp::Ordering;
use core::fmt::{self, Write as _};
use core::hash::{Hash, Hasher};
use core::iter::{Product, Sum};
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};
use core::str::FromStr;

#[cfg(feature = "serde")]
use core::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::ParseFixedError;
use crate::mask::mask_low;
use crate::storage::{Storage, Widen};

/// Binary fixed-point number with `P` fractional bits stored in `S`.
///
/// The raw value is the real value scaled by `2^P`. Every bit pattern of `S`
/// is a valid value. All arithmetic wraps on overflow; nothing is checked.
///
/// Right-hand operands of `==`, `<`, `+`, `-`, `*` and `/` (and the
/// assigning forms) can be a native integer, a native float, or any other
/// `Fixed` instantiation, which is first converted to `Fixed<P, S>`.
///
/// ```
/// use fixpoint::Fixed;
///
/// let a: Fixed<16, i32> = Fixed::from(2.5);
/// let b = a * 4i32 + Fixed::<8, i16>::from(1);
/// assert_eq!(b, 11);
/// assert_eq!(f64::from(b / 2i32), 5.5);
/// ```
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Fixed<const P: u32, S: Storage = i32> {
    raw: S,
}

/// 16 fractional bits in a 32-bit signed integer.
pub type Fixed16 = Fixed<16, i32>;

mod sealed {
    pub trait Sealed {}
}

impl<const P: u32, S: Storage> sealed::Sealed for Fixed<P, S> {}

/// Implemented by every [`Fixed`] instantiation and by nothing else.
pub trait FixedPoint: sealed::Sealed + Copy {
    type Raw: Storage;

    const FRAC_BITS: u32;

    const INTEGER_BITS: u32;

    fn from_raw(raw: Self::Raw) -> Self;

    fn to_raw(self) -> Self::Raw;
}

impl<const P: u32, S: Storage> FixedPoint for Fixed<P, S> {
    type Raw = S;

    const FRAC_BITS: u32 = P;
    const INTEGER_BITS: u32 = S::BITS.wrapping_sub(P);

    #[inline(always)]
    fn from_raw(raw: S) -> Self {
        Self { raw }
    }

    #[inline(always)]
    fn to_raw(self) -> S {
        self.raw
    }
}

// ============================================================================
// Constants and Raw Access
// ============================================================================

impl<const P: u32, S: Storage> Fixed<P, S> {
    /// Number of fractional bits.
    pub const FRAC_BITS: u32 = P;

    /// Storage width minus the fractional bits. Informational only.
    pub const INTEGER_BITS: u32 = S::BITS.wrapping_sub(P);

    pub const ZERO: Self = Self { raw: S::ZERO };

    /// Creates a value from a raw scaled integer.
    #[inline(always)]
    pub const fn from_raw(raw: S) -> Self {
        Self { raw }
    }

    /// Returns the raw scaled integer.
    #[inline(always)]
    pub const fn to_raw(self) -> S {
        self.raw
    }

    /// One (1.0). Wraps if `S` has no integer bits left.
    #[inline(always)]
    pub fn one() -> Self {
        Self {
            raw: S::one().wrapping_shl(P),
        }
    }

    /// The hash this value produces under [`IdentityHasher`](crate::IdentityHasher):
    /// the raw value reinterpreted as unsigned.
    #[inline(always)]
    pub fn identity_hash(self) -> usize {
        self.raw.zero_extend() as usize
    }
}

impl<const P: u32, S: Storage> Default for Fixed<P, S> {
    fn default() -> Self {
        Self::ZERO
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl<const P: u32, S: Storage> Fixed<P, S> {
    /// `raw = value << P`, computed in `S`. No overflow check.
    #[inline(always)]
    pub fn from_int<I: Storage>(value: I) -> Self {
        Self {
            raw: value.cast::<S>().wrapping_shl(P),
        }
    }

    /// `raw >> P` cast to `I`.
    ///
    /// The shift is arithmetic, so negative values round toward negative
    /// infinity: `-0.5` becomes `-1`.
    #[inline(always)]
    pub fn to_int<I: Storage>(self) -> I {
        self.raw.wrapping_shr(P).cast()
    }

    /// `raw = value * 2^P`, truncated toward zero.
    ///
    /// Out-of-range values saturate at the storage bounds and NaN becomes zero.
    #[inline(always)]
    pub fn from_f32(value: f32) -> Self {
        Self {
            raw: S::from_f32_trunc(value * pow2_f32(P)),
        }
    }

    /// `raw = value * 2^P`, truncated toward zero.
    ///
    /// Out-of-range values saturate at the storage bounds and NaN becomes zero.
    #[inline(always)]
    pub fn from_f64(value: f64) -> Self {
        Self {
            raw: S::from_f64_trunc(value * pow2_f64(P)),
        }
    }

    #[inline(always)]
    pub fn to_f32(self) -> f32 {
        self.raw.as_f32() / pow2_f32(P)
    }

    #[inline(always)]
    pub fn to_f64(self) -> f64 {
        self.raw.as_f64() / pow2_f64(P)
    }

    /// Re-expresses any fixed-point value with `P` fractional bits in `S`.
    ///
    /// Gaining precision shifts left after the cast to `S`; losing precision
    /// shifts right before it, truncating. The integer range is not checked.
    #[inline(always)]
    pub fn from_fixed<F: FixedPoint>(value: F) -> Self {
        Self {
            raw: rescale(value.to_raw(), F::FRAC_BITS, P),
        }
    }

    /// Converts to another instantiation. See [`Fixed::from_fixed`].
    ///
    /// ```
    /// use fixpoint::Fixed;
    ///
    /// let fine = Fixed::<16, i32>::from(1.75);
    /// let coarse = fine.convert::<1, i8>();
    /// assert_eq!(coarse.to_raw(), 3); // 1.5, the quarter is truncated
    /// ```
    #[inline(always)]
    pub fn convert<const P2: u32, S2: Storage>(self) -> Fixed<P2, S2> {
        Fixed::from_fixed(self)
    }
}

// ============================================================================
// Multiplication Paths
// ============================================================================

impl<const P: u32, S: Storage> Fixed<P, S> {
    /// Multiplies through the wider intermediate type of `S`.
    ///
    /// Exact apart from truncating the final shift. This is the path `*`
    /// takes for two values of the same instantiation when `S` widens.
    #[inline(always)]
    pub fn mul_widened(self, rhs: Self) -> Self
    where
        S: Widen,
    {
        Self {
            raw: self.raw.widened_mul_shr(rhs.raw, P),
        }
    }

    /// Multiplies without a wider intermediate by splitting both operands
    /// into integer and fractional parts.
    ///
    /// Agrees with [`Fixed::mul_widened`] whenever `2 * P <= S::BITS`. With
    /// more fractional bits the fraction-by-fraction term wraps.
    #[inline(always)]
    pub fn mul_decomposed(self, rhs: Self) -> Self {
        Self {
            raw: decomposed_mul(self.raw, rhs.raw, P),
        }
    }
}

// ============================================================================
// Fixed-Point Operands
// ============================================================================

impl<const P: u32, S: Storage, const P2: u32, S2: Storage> AddAssign<Fixed<P2, S2>>
    for Fixed<P, S>
{
    #[inline(always)]
    fn add_assign(&mut self, rhs: Fixed<P2, S2>) {
        self.raw = self.raw.wrapping_add(&rhs.convert::<P, S>().raw);
    }
}

impl<const P: u32, S: Storage, const P2: u32, S2: Storage> SubAssign<Fixed<P2, S2>>
    for Fixed<P, S>
{
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Fixed<P2, S2>) {
        self.raw = self.raw.wrapping_sub(&rhs.convert::<P, S>().raw);
    }
}

/// Two values of one instantiation whose storage implements [`Widen`] take
/// the widened path. Everything else converts `rhs` to `Fixed<P, S>` and
/// takes the decomposition path of [`Fixed::mul_decomposed`], which is exact
/// up to the final truncation only while `2 * P <= S::BITS`. With more
/// fractional bits the fraction-by-fraction product wraps, so
/// `Fixed<24, i32>` times a `Fixed<16, i32>` loses more than its low bits.
impl<const P: u32, S: Storage, const P2: u32, S2: Storage> MulAssign<Fixed<P2, S2>>
    for Fixed<P, S>
{
    #[inline(always)]
    fn mul_assign(&mut self, rhs: Fixed<P2, S2>) {
        let rhs = rhs.convert::<P, S>();
        if same_instantiation::<P, S, P2, S2>() {
            if let Some(raw) = self.raw.widening_mul_shr(rhs.raw, P) {
                self.raw = raw;
                return;
            }
        }
        self.raw = decomposed_mul(self.raw, rhs.raw, P);
    }
}

/// Fixed-point divisors need a wider intermediate for `S`.
///
/// ```compile_fail
/// use fixpoint::Fixed;
///
/// let mut x = Fixed::<64, i128>::from(3);
/// x /= Fixed::<64, i128>::from(2);
/// ```
impl<const P: u32, S: Widen, const P2: u32, S2: Storage> DivAssign<Fixed<P2, S2>>
    for Fixed<P, S>
{
    /// Panics if the divisor is zero.
    #[inline(always)]
    fn div_assign(&mut self, rhs: Fixed<P2, S2>) {
        self.raw = self.raw.widened_div_shl(rhs.convert::<P, S>().raw, P);
    }
}

impl<const P: u32, S: Storage, const P2: u32, S2: Storage> Add<Fixed<P2, S2>> for Fixed<P, S> {
    type Output = Self;

    #[inline(always)]
    fn add(mut self, rhs: Fixed<P2, S2>) -> Self {
        self += rhs;
        self
    }
}

impl<const P: u32, S: Storage, const P2: u32, S2: Storage> Sub<Fixed<P2, S2>> for Fixed<P, S> {
    type Output = Self;

    #[inline(always)]
    fn sub(mut self, rhs: Fixed<P2, S2>) -> Self {
        self -= rhs;
        self
    }
}

impl<const P: u32, S: Storage, const P2: u32, S2: Storage> Mul<Fixed<P2, S2>> for Fixed<P, S> {
    type Output = Self;

    #[inline(always)]
    fn mul(mut self, rhs: Fixed<P2, S2>) -> Self {
        self *= rhs;
        self
    }
}

impl<const P: u32, S: Widen, const P2: u32, S2: Storage> Div<Fixed<P2, S2>> for Fixed<P, S> {
    type Output = Self;

    #[inline(always)]
    fn div(mut self, rhs: Fixed<P2, S2>) -> Self {
        self /= rhs;
        self
    }
}

// ============================================================================
// Comparison and Hashing
// ============================================================================

impl<const P: u32, S: Storage, const P2: u32, S2: Storage> PartialEq<Fixed<P2, S2>>
    for Fixed<P, S>
{
    #[inline(always)]
    fn eq(&self, other: &Fixed<P2, S2>) -> bool {
        self.raw == other.convert::<P, S>().raw
    }
}

impl<const P: u32, S: Storage> Eq for Fixed<P, S> {}

impl<const P: u32, S: Storage, const P2: u32, S2: Storage> PartialOrd<Fixed<P2, S2>>
    for Fixed<P, S>
{
    #[inline(always)]
    fn partial_cmp(&self, other: &Fixed<P2, S2>) -> Option<Ordering> {
        Some(self.raw.cmp(&other.convert::<P, S>().raw))
    }
}

impl<const P: u32, S: Storage> Ord for Fixed<P, S> {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<const P: u32, S: Storage> Hash for Fixed<P, S> {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash_unsigned(state);
    }
}

// ============================================================================
// Native Operands
// ============================================================================

macro_rules! forward_binops {
    ($rhs:ty) => {
        forward_binops!(@op $rhs, Add, add, add_assign);
        forward_binops!(@op $rhs, Sub, sub, sub_assign);
        forward_binops!(@op $rhs, Mul, mul, mul_assign);
        forward_binops!(@op $rhs, Div, div, div_assign);
    };
    (@op $rhs:ty, $imp:ident, $method:ident, $assign:ident) => {
        impl<const P: u32, S: Storage> $imp<$rhs> for Fixed<P, S> {
            type Output = Self;

            #[inline(always)]
            fn $method(mut self, rhs: $rhs) -> Self {
                self.$assign(rhs);
                self
            }
        }
    };
}

macro_rules! impl_int_operand {
    ($($t:ty),*) => {$(
        impl<const P: u32, S: Storage> From<$t> for Fixed<P, S> {
            #[inline(always)]
            fn from(value: $t) -> Self {
                Self::from_int(value)
            }
        }

        impl<const P: u32, S: Storage> From<Fixed<P, S>> for $t {
            #[inline(always)]
            fn from(value: Fixed<P, S>) -> Self {
                value.to_int()
            }
        }

        impl<const P: u32, S: Storage> AddAssign<$t> for Fixed<P, S> {
            #[inline(always)]
            fn add_assign(&mut self, rhs: $t) {
                self.raw = self.raw.wrapping_add(&Self::from_int(rhs).raw);
            }
        }

        impl<const P: u32, S: Storage> SubAssign<$t> for Fixed<P, S> {
            #[inline(always)]
            fn sub_assign(&mut self, rhs: $t) {
                self.raw = self.raw.wrapping_sub(&Self::from_int(rhs).raw);
            }
        }

        impl<const P: u32, S: Storage> MulAssign<$t> for Fixed<P, S> {
            #[inline(always)]
            fn mul_assign(&mut self, rhs: $t) {
                self.raw = self.raw.wrapping_mul(&rhs.cast::<S>());
            }
        }

        impl<const P: u32, S: Storage> DivAssign<$t> for Fixed<P, S> {
            /// Panics if `rhs` is zero.
            #[inline(always)]
            fn div_assign(&mut self, rhs: $t) {
                self.raw = div_by_int(self.raw, rhs);
            }
        }

        impl<const P: u32, S: Storage> PartialEq<$t> for Fixed<P, S> {
            #[inline(always)]
            fn eq(&self, other: &$t) -> bool {
                self.raw == Self::from_int(*other).raw
            }
        }

        impl<const P: u32, S: Storage> PartialOrd<$t> for Fixed<P, S> {
            #[inline(always)]
            fn partial_cmp(&self, other: &$t) -> Option<Ordering> {
                Some(self.raw.cmp(&Self::from_int(*other).raw))
            }
        }

        forward_binops!($t);
    )*};
}

macro_rules! impl_float_operand {
    ($t:ty, $from:ident, $to:ident, $trunc:ident, $as_float:ident) => {
        impl<const P: u32, S: Storage> From<$t> for Fixed<P, S> {
            #[inline(always)]
            fn from(value: $t) -> Self {
                Self::$from(value)
            }
        }

        impl<const P: u32, S: Storage> From<Fixed<P, S>> for $t {
            #[inline(always)]
            fn from(value: Fixed<P, S>) -> Self {
                value.$to()
            }
        }

        impl<const P: u32, S: Storage> AddAssign<$t> for Fixed<P, S> {
            #[inline(always)]
            fn add_assign(&mut self, rhs: $t) {
                self.raw = self.raw.wrapping_add(&Self::$from(rhs).raw);
            }
        }

        impl<const P: u32, S: Storage> SubAssign<$t> for Fixed<P, S> {
            #[inline(always)]
            fn sub_assign(&mut self, rhs: $t) {
                self.raw = self.raw.wrapping_sub(&Self::$from(rhs).raw);
            }
        }

        impl<const P: u32, S: Storage> MulAssign<$t> for Fixed<P, S> {
            #[inline(always)]
            fn mul_assign(&mut self, rhs: $t) {
                self.raw = S::$trunc(self.raw.$as_float() * rhs);
            }
        }

        impl<const P: u32, S: Storage> DivAssign<$t> for Fixed<P, S> {
            #[inline(always)]
            fn div_assign(&mut self, rhs: $t) {
                self.raw = S::$trunc(self.raw.$as_float() / rhs);
            }
        }

        impl<const P: u32, S: Storage> PartialEq<$t> for Fixed<P, S> {
            #[inline(always)]
            fn eq(&self, other: &$t) -> bool {
                self.raw == Self::$from(*other).raw
            }
        }

        impl<const P: u32, S: Storage> PartialOrd<$t> for Fixed<P, S> {
            #[inline(always)]
            fn partial_cmp(&self, other: &$t) -> Option<Ordering> {
                Some(self.raw.cmp(&Self::$from(*other).raw))
            }
        }

        forward_binops!($t);
    };
}

impl_int_operand!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_float_operand!(f32, from_f32, to_f32, from_f32_trunc, as_f32);
impl_float_operand!(f64, from_f64, to_f64, from_f64_trunc, as_f64);

// ============================================================================
// Formatting and Parsing
// ============================================================================

impl<const P: u32, S: Storage> fmt::Display for Fixed<P, S> {
    /// Writes the exact decimal expansion. `{:.N}` truncates to `N` digits.
    /// Width, fill, alignment, `+` and `0` behave as for integers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (negative, magnitude) = sign_magnitude(self.raw);

        let integer = magnitude.checked_shr(P).unwrap_or(0);
        let mut fraction = low_bits(magnitude, P);
        let mut frac_bits = P;
        if frac_bits > MAX_DIGIT_BITS {
            fraction >>= frac_bits - MAX_DIGIT_BITS;
            frac_bits = MAX_DIGIT_BITS;
        }

        let digits = match f.precision() {
            Some(precision) => precision,
            None if fraction != 0 => (frac_bits - fraction.trailing_zeros()) as usize,
            None => 0,
        };
        let buffered = digits.min(MAX_DIGIT_BITS as usize);

        // Sign-less digits on the stack, integer part first
        let mut buffer = [0u8; DISPLAY_BUFFER_LEN];
        let mut pos = 0;
        let mut n = integer;
        loop {
            buffer[pos] = b'0' + (n % 10) as u8;
            n /= 10;
            pos += 1;
            if n == 0 {
                break;
            }
        }
        buffer[..pos].reverse();

        if digits > 0 {
            buffer[pos] = b'.';
            pos += 1;
        }
        for _ in 0..buffered {
            buffer[pos] = next_decimal_digit(&mut fraction, frac_bits);
            pos += 1;
        }

        let text = core::str::from_utf8(&buffer[..pos]).map_err(|_| fmt::Error)?;
        if digits == buffered {
            return f.pad_integral(!negative, "", text);
        }

        // only zeros remain past the exact expansion; written unpadded
        if negative {
            f.write_char('-')?;
        }
        f.write_str(text)?;
        for _ in buffered..digits {
            f.write_char('0')?;
        }
        Ok(())
    }
}

impl<const P: u32, S: Storage> fmt::Debug for Fixed<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            // {:#?} shows raw internals
            f.debug_struct("Fixed")
                .field("raw", &self.raw)
                .field("frac_bits", &P)
                .finish()
        } else {
            // {:?} shows `integer + numerator/2^P (float)`
            let integer = self.raw.wrapping_shr(P);
            let numerator = self.raw & mask_low::<S>(P);
            write!(f, "{integer:?} + {numerator:?}/")?;
            match 1u128.checked_shl(P) {
                Some(denominator) => write!(f, "{denominator}")?,
                None => write!(f, "2^{P}")?,
            }
            write!(f, " ({})", self.to_f64())
        }
    }
}

impl<const P: u32, S: Storage> FromStr for Fixed<P, S> {
    type Err = ParseFixedError;

    /// Parses `[+-]digits[.digits]` exactly, truncating toward zero.
    ///
    /// Integer digits beyond the storage range wrap like [`Fixed::from_int`].
    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        let (negative, digits) = match s.as_bytes().first() {
            None => return Err(ParseFixedError::Empty),
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            Some(_) => (false, s),
        };

        let (integer_digits, fraction_digits) = digits.split_once('.').unwrap_or((digits, ""));
        if integer_digits.is_empty() && fraction_digits.is_empty() {
            return Err(ParseFixedError::Empty);
        }

        let mut integer = 0u128;
        for byte in integer_digits.bytes() {
            integer = integer
                .wrapping_mul(10)
                .wrapping_add(decimal_digit(byte)? as u128);
        }
        let fraction = binary_fraction(fraction_digits, P)?;

        let magnitude = S::from_bits(integer)
            .wrapping_shl(P)
            .wrapping_add(&S::from_bits(fraction));

        if !negative || magnitude == S::ZERO {
            return Ok(Self::from_raw(magnitude));
        }
        if !S::SIGNED {
            return Err(ParseFixedError::NegativeUnsigned);
        }
        Ok(Self::from_raw(S::ZERO.wrapping_sub(&magnitude)))
    }
}

// ============================================================================
// Iterator Trait Implementations
// ============================================================================

impl<const P: u32, S: Storage> Sum for Fixed<P, S> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl<'a, const P: u32, S: Storage> Sum<&'a Fixed<P, S>> for Fixed<P, S> {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + *x)
    }
}

impl<const P: u32, S: Storage> Product for Fixed<P, S> {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::one(), |acc, x| acc * x)
    }
}

impl<'a, const P: u32, S: Storage> Product<&'a Fixed<P, S>> for Fixed<P, S> {
    fn product<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::one(), |acc, x| acc * *x)
    }
}

// ============================================================================
// Serde Support
// ============================================================================

#[cfg(feature = "serde")]
impl<const P: u32, S: Storage> Serialize for Fixed<P, S> {
    fn serialize<Z>(&self, serializer: Z) -> core::result::Result<Z::Ok, Z::Error>
    where
        Z: Serializer,
    {
        if serializer.is_human_readable() {
            // JSON, TOML, etc. - exact decimal string
            serializer.collect_str(self)
        } else {
            // Bincode, MessagePack, etc. - raw storage integer
            self.raw.serialize(serializer)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, const P: u32, S: Storage> Deserialize<'de> for Fixed<P, S> {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(FixedVisitor::<P, S>(PhantomData))
        } else {
            S::deserialize(deserializer).map(Self::from_raw)
        }
    }
}

#[cfg(feature = "serde")]
struct FixedVisitor<const P: u32, S>(PhantomData<S>);

#[cfg(feature = "serde")]
impl<'de, const P: u32, S: Storage> de::Visitor<'de> for FixedVisitor<P, S> {
    type Value = Fixed<P, S>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> core::result::Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> core::result::Result<Self::Value, E> {
        Ok(Fixed::from_int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> core::result::Result<Self::Value, E> {
        Ok(Fixed::from_int(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> core::result::Result<Self::Value, E> {
        Ok(Fixed::from_f64(v))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Fraction bits kept when printing, so `fraction * 10` fits in a `u128`.
const MAX_DIGIT_BITS: u32 = 124;

/// 39 integer digits of a `u128`, the point and `MAX_DIGIT_BITS` fraction digits.
const DISPLAY_BUFFER_LEN: usize = 40 + MAX_DIGIT_BITS as usize;

/// Decimal digits of a parsed fraction that take part in the conversion.
/// `10^38` is the largest power of ten below `u128::MAX / 2`.
const MAX_FRACTION_DIGITS: usize = 38;

#[inline(always)]
const fn same_instantiation<const P: u32, S: Storage, const P2: u32, S2: Storage>() -> bool {
    P == P2 && S::BITS == S2::BITS && S::SIGNED == S2::SIGNED
}

/// `2^p` as an `f32`, exact for `p <= 127`.
#[inline(always)]
const fn pow2_f32(p: u32) -> f32 {
    f32::from_bits((127 + p) << 23)
}

/// `2^p` as an `f64`, exact for `p <= 1023`.
#[inline(always)]
const fn pow2_f64(p: u32) -> f64 {
    f64::from_bits((1023 + p as u64) << 52)
}

#[inline(always)]
fn rescale<S1: Storage, S2: Storage>(raw: S1, from: u32, to: u32) -> S2 {
    if to > from {
        raw.cast::<S2>().wrapping_shl(to - from)
    } else {
        raw.wrapping_shr(from - to).cast()
    }
}

/// `(lhs * rhs) >> frac_bits` from four partial products of the integer
/// and fractional parts, none wider than `S`.
///
/// The fractional parts are non-negative, so their product is shifted
/// logically. It loses its low `frac_bits` bits, as the final shift of the
/// widened product would.
#[inline(always)]
fn decomposed_mul<S: Storage>(lhs: S, rhs: S, frac_bits: u32) -> S {
    let frac_mask = mask_low::<S>(frac_bits);

    let lhs_int = lhs.wrapping_shr(frac_bits);
    let lhs_frac = lhs & frac_mask;
    let rhs_int = rhs.wrapping_shr(frac_bits);
    let rhs_frac = rhs & frac_mask;

    let int_int = lhs_int.wrapping_mul(&rhs_int);
    let int_frac = lhs_int.wrapping_mul(&rhs_frac);
    let frac_int = lhs_frac.wrapping_mul(&rhs_int);
    let frac_frac = lhs_frac.wrapping_mul(&rhs_frac);

    int_int
        .wrapping_shl(frac_bits)
        .wrapping_add(&int_frac.wrapping_add(&frac_int))
        .wrapping_add(&frac_frac.unsigned_shr(frac_bits))
}

/// Divides in `S` when the divisor is representable there. Otherwise the
/// quotient is taken on 128-bit magnitudes, truncated toward zero, and
/// wrapped into `S`.
#[inline(always)]
fn div_by_int<S: Storage, I: Storage>(raw: S, divisor: I) -> S {
    if let Some(divisor) = <S as num_traits::NumCast>::from(divisor) {
        return raw.wrapping_div(divisor);
    }
    let (raw_negative, raw_magnitude) = sign_magnitude(raw);
    let (divisor_negative, divisor_magnitude) = sign_magnitude(divisor);
    let quotient = raw_magnitude / divisor_magnitude;
    if raw_negative != divisor_negative {
        S::from_bits(quotient.wrapping_neg())
    } else {
        S::from_bits(quotient)
    }
}

/// Splits into a sign and the magnitude as a `u128`. `MIN` of a signed
/// 128-bit integer has magnitude `2^127`, which still fits.
#[inline(always)]
fn sign_magnitude<T: Storage>(value: T) -> (bool, u128) {
    if T::SIGNED && value < T::ZERO {
        (true, value.to_bits().wrapping_neg())
    } else {
        (false, value.to_bits())
    }
}

#[inline(always)]
fn low_bits(value: u128, n: u32) -> u128 {
    match 1u128.checked_shl(n) {
        Some(bit) => value & (bit - 1),
        None => value,
    }
}

/// Multiplies the binary fraction by ten and takes the integer part as a digit.
#[inline(always)]
fn next_decimal_digit(fraction: &mut u128, frac_bits: u32) -> u8 {
    let scaled = *fraction * 10;
    *fraction = low_bits(scaled, frac_bits);
    b'0' + (scaled >> frac_bits) as u8
}

#[inline(always)]
fn decimal_digit(byte: u8) -> crate::Result<u8> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        _ => Err(ParseFixedError::InvalidDigit),
    }
}

/// Converts decimal fraction digits to `frac_bits` binary digits by long
/// division, truncating.
fn binary_fraction(digits: &str, frac_bits: u32) -> crate::Result<u128> {
    let mut numerator = 0u128;
    let mut denominator = 1u128;
    for (i, byte) in digits.bytes().enumerate() {
        let digit = decimal_digit(byte)?;
        if i < MAX_FRACTION_DIGITS {
            numerator = numerator * 10 + digit as u128;
            denominator *= 10;
        }
    }

    let mut fraction = 0u128;
    for _ in 0..frac_bits.min(u128::BITS) {
        numerator <<= 1;
        fraction <<= 1;
        if numerator >= denominator {
            numerator -= denominator;
            fraction |= 1;
        }
    }
    Ok(fraction)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_int_round_trip(n in -32_768i32..32_768i32) {
            prop_assert_eq!(i32::from(Fixed16::from(n)), n);
        }

        #[test]
        fn prop_int_round_trip_unsigned(n in 0u64..(1u64 << 40)) {
            prop_assert_eq!(u64::from(Fixed::<24, u64>::from(n)), n);
        }

        #[test]
        fn prop_additive_identity(raw in any::<i32>()) {
            let x = Fixed16::from_raw(raw);
            prop_assert_eq!(x + Fixed16::ZERO, x);
            prop_assert_eq!(x + 0, x);
            prop_assert_eq!((x - x).to_raw(), 0);
        }

        #[test]
        fn prop_mul_paths_agree_i32(a in any::<i32>(), b in any::<i32>()) {
            let a = Fixed::<8, i32>::from_raw(a);
            let b = Fixed::<8, i32>::from_raw(b);
            prop_assert_eq!(a.mul_widened(b).to_raw(), a.mul_decomposed(b).to_raw());
        }

        #[test]
        fn prop_mul_paths_agree_u16(a in any::<u16>(), b in any::<u16>()) {
            let a = Fixed::<8, u16>::from_raw(a);
            let b = Fixed::<8, u16>::from_raw(b);
            prop_assert_eq!(a.mul_widened(b).to_raw(), a.mul_decomposed(b).to_raw());
        }

        #[test]
        fn prop_mul_paths_agree_i64(a in any::<i64>(), b in any::<i64>()) {
            let a = Fixed::<32, i64>::from_raw(a);
            let b = Fixed::<32, i64>::from_raw(b);
            prop_assert_eq!(a.mul_widened(b).to_raw(), a.mul_decomposed(b).to_raw());
        }

        #[test]
        fn prop_mixed_mul_matches_converted_decomposition(a in any::<i32>(), b in any::<i16>()) {
            let a = Fixed16::from_raw(a);
            let b = Fixed::<8, i16>::from_raw(b);
            prop_assert_eq!(a * b, a.mul_decomposed(b.convert()));
        }

        #[test]
        fn prop_precision_up_then_down_is_lossless(raw in -(1i32 << 23)..(1i32 << 23)) {
            let x = Fixed::<8, i32>::from_raw(raw);
            let back = x.convert::<16, i32>().convert::<8, i32>();
            prop_assert_eq!(back.to_raw(), raw);
        }

        #[test]
        fn prop_precision_down_then_up_drops_low_bits(raw in any::<i32>()) {
            let x = Fixed16::from_raw(raw);
            let back = x.convert::<8, i32>().convert::<16, i32>();
            prop_assert_eq!(back.to_raw(), raw & !0xff);
        }

        #[test]
        fn prop_division_inverts_multiplication(a in -100i32..100, b in 1i32..300) {
            let a = Fixed16::from(a);
            let b = Fixed16::from(b);
            prop_assert_eq!((a * b) / b, a);
        }

        #[test]
        fn prop_ordering_matches_raw(a in any::<i32>(), b in any::<i32>()) {
            let x = Fixed16::from_raw(a);
            let y = Fixed16::from_raw(b);
            prop_assert_eq!(x.cmp(&y), a.cmp(&b));
            prop_assert_eq!(x == y, a == b);
        }
    }
}
