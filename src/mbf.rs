//! Microsoft Binary Format, single precision.
//!
//! The ROM keeps floats as `exponent:8 | sign:1 | mantissa:23` with an
//! implied leading `0.1` and an exponent bias of 128. IEEE-754 single has
//! the sign first, a bias of 127 and an implied `1.`, so converting is a
//! matter of moving the sign bit and adding 2 to the exponent.

use thiserror::Error;

const IEEE_EXPONENT_MASK: u32 = 0xFF;
const MANTISSA_MASK: u32 = 0x7F_FFFF;
const EXPONENT_REBIAS: u32 = 2;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum MbfError {
    #[error("{0} is not a finite number")]
    NotFinite(f32),
    #[error("{0} is too large for a ROM float")]
    Overflow(f32),
}

/// A 32-bit float in the ROM's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mbf32(u32);

impl Mbf32 {
    pub const ZERO: Mbf32 = Mbf32(0);

    pub fn from_bits(bits: u32) -> Self {
        Mbf32(bits)
    }

    pub fn to_bits(self) -> u32 {
        self.0
    }

    /// Exponent and sign/high mantissa, loaded into `BC`.
    pub fn hi(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Low mantissa, loaded into `DE`.
    pub fn lo(self) -> u16 {
        self.0 as u16
    }

    pub fn exponent(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn is_negative(self) -> bool {
        self.0 & 0x80_0000 != 0
    }
}

impl TryFrom<f32> for Mbf32 {
    type Error = MbfError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        let ieee = value.to_bits();
        let exponent = (ieee >> 23) & IEEE_EXPONENT_MASK;
        if exponent == IEEE_EXPONENT_MASK {
            return Err(MbfError::NotFinite(value));
        }
        // covers -0.0 too; subnormals are below the smallest ROM float
        if exponent == 0 {
            return Ok(Mbf32::ZERO);
        }
        let exponent = exponent + EXPONENT_REBIAS;
        if exponent > IEEE_EXPONENT_MASK {
            return Err(MbfError::Overflow(value));
        }
        let sign = ieee >> 31;
        Ok(Mbf32(
            (exponent << 24) | (sign << 23) | (ieee & MANTISSA_MASK),
        ))
    }
}

impl TryFrom<f64> for Mbf32 {
    type Error = MbfError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let single = value as f32;
        if value.is_finite() && single.is_infinite() {
            return Err(MbfError::Overflow(single));
        }
        Mbf32::try_from(single)
    }
}

impl From<Mbf32> for f32 {
    fn from(mbf: Mbf32) -> Self {
        let exponent = mbf.exponent() as i32;
        if exponent == 0 {
            return 0.0;
        }
        // 0.1mmm * 2^(e-128) == 1.mmm * 2^(e-129)
        let mantissa = 1.0 + (mbf.0 & MANTISSA_MASK) as f64 / (1u32 << 23) as f64;
        let magnitude = mantissa * 2f64.powi(exponent - 129);
        let value = if mbf.is_negative() {
            -magnitude
        } else {
            magnitude
        };
        value as f32
    }
}
