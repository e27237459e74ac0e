//! # Wire Value Types
//!
//! Small value types with a fixed wire representation:
//!
//! - [`Guid`]: 16 opaque bytes, written with a one-byte marker.
//! - [`Fixed32`]: Q16.16 fixed-point in an `i32`.
//! - [`Fixed64`]: Q32.32 fixed-point in an `i64`.
//!
//! Fixed-point values travel as their raw integer, never re-derived from a
//! float, so every peer sees bit-identical numbers.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use bytemuck::{Pod, Zeroable};

// =============================================================================
// Guid
// =============================================================================

/// A 128-bit globally unique identifier, stored as raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct Guid([u8; 16]);

impl Guid {
    /// The all-zero GUID.
    pub const NIL: Self = Self([0; 16]);

    /// Wraps 16 raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw bytes, in wire order.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Builds a GUID whose wire bytes are `value` in big-endian order.
    #[inline]
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Inverse of [`from_u128`](Self::from_u128).
    #[inline]
    #[must_use]
    pub const fn to_u128(self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    /// Returns true for [`Guid::NIL`].
    #[inline]
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if matches!(index, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

// =============================================================================
// Fixed-point
// =============================================================================

/// Q16.16 fixed-point number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
#[repr(transparent)]
pub struct Fixed32(i32);

impl Fixed32 {
    /// Fractional bits.
    pub const FRACTION_BITS: u32 = 16;

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// One.
    pub const ONE: Self = Self(1 << Self::FRACTION_BITS);

    /// Wraps a raw Q16.16 value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw Q16.16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Converts a whole number (wrapping outside ±32768).
    #[inline]
    #[must_use]
    pub const fn from_int(value: i16) -> Self {
        Self((value as i32) << Self::FRACTION_BITS)
    }

    /// Nearest representable value to `value` (saturating).
    #[inline]
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self((value * f64::from(1u32 << Self::FRACTION_BITS)).round() as i32)
    }

    /// Approximate float value.
    #[inline]
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(1u32 << Self::FRACTION_BITS)
    }
}

impl Add for Fixed32 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed32 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Fixed32 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

/// Q32.32 fixed-point number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
#[repr(transparent)]
pub struct Fixed64(i64);

impl Fixed64 {
    /// Fractional bits.
    pub const FRACTION_BITS: u32 = 32;

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// One.
    pub const ONE: Self = Self(1 << Self::FRACTION_BITS);

    /// Wraps a raw Q32.32 value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw Q32.32 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Converts a whole number.
    #[inline]
    #[must_use]
    pub const fn from_int(value: i32) -> Self {
        Self((value as i64) << Self::FRACTION_BITS)
    }

    /// Nearest representable value to `value` (saturating).
    #[inline]
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self((value * (1u64 << Self::FRACTION_BITS) as f64).round() as i64)
    }

    /// Approximate float value.
    #[inline]
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / (1u64 << Self::FRACTION_BITS) as f64
    }
}

impl Add for Fixed64 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed64 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Fixed64 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_display() {
        let guid = Guid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff);
        assert_eq!(guid.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
        assert_eq!(guid.to_u128(), 0x0011_2233_4455_6677_8899_aabb_ccdd_eeff);
        assert!(Guid::NIL.is_nil());
    }

    #[test]
    fn test_guid_is_pod() {
        let guid = Guid::from_bytes([7; 16]);
        let bytes: &[u8] = bytemuck::bytes_of(&guid);
        assert_eq!(bytes, &[7; 16]);
    }

    #[test]
    fn test_fixed32() {
        assert_eq!(Fixed32::ONE.raw(), 65_536);
        assert_eq!(Fixed32::from_int(3).raw(), 3 << 16);
        assert_eq!(Fixed32::from_f64(1.5).raw(), 0x0001_8000);
        assert!((Fixed32::from_raw(0x0001_8000).to_f64() - 1.5).abs() < f64::EPSILON);
        assert_eq!(Fixed32::ONE + Fixed32::ONE, Fixed32::from_int(2));
        assert_eq!(-Fixed32::ONE, Fixed32::from_int(-1));
    }

    #[test]
    fn test_fixed64() {
        assert_eq!(Fixed64::ONE.raw(), 1i64 << 32);
        assert_eq!(Fixed64::from_f64(-0.25).raw(), -(1i64 << 30));
        assert_eq!(Fixed64::from_int(5) - Fixed64::ONE, Fixed64::from_int(4));
    }
}
