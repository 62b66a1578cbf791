//! 16.16 fixed-point arithmetic
//!
//! All texture stepping, plane heights and scale factors use this format
//! so rendering stays bit-exact across machines (no float rounding drift).

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Number of fractional bits
pub const FRACBITS: i32 = 16;

/// One unit (1.0) in fixed-point
pub const FRACUNIT: i32 = 1 << FRACBITS;

/// 16.16 fixed-point value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fixed(pub i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(FRACUNIT);

    pub fn from_int(i: i32) -> Self {
        Fixed(i << FRACBITS)
    }

    /// Integer part (floor)
    pub fn to_int(self) -> i32 {
        self.0 >> FRACBITS
    }

    /// Fractional part in [0, FRACUNIT)
    pub fn frac(self) -> i32 {
        self.0 & (FRACUNIT - 1)
    }

    pub fn from_f32(f: f32) -> Self {
        Fixed((f * FRACUNIT as f32) as i32)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / FRACUNIT as f32
    }

    pub fn abs(self) -> Self {
        Fixed(self.0.abs())
    }

    /// Fixed-point multiply via 64-bit intermediate
    pub fn mul(self, other: Fixed) -> Fixed {
        Fixed(((self.0 as i64 * other.0 as i64) >> FRACBITS) as i32)
    }

    /// Fixed-point divide, saturating when the quotient would overflow
    pub fn div(self, other: Fixed) -> Fixed {
        if (self.0.abs() >> 14) >= other.0.abs() {
            if (self.0 ^ other.0) < 0 {
                Fixed(i32::MIN)
            } else {
                Fixed(i32::MAX)
            }
        } else {
            Fixed(((self.0 as i64) << FRACBITS).wrapping_div(other.0 as i64) as i32)
        }
    }

    /// Multiply by a plain integer
    pub fn scale_int(self, n: i32) -> Fixed {
        Fixed((self.0 as i64 * n as i64) as i32)
    }

    /// Divide by a plain integer
    pub fn div_int(self, n: i32) -> Fixed {
        Fixed(self.0 / n)
    }
}

impl Add for Fixed {
    type Output = Fixed;
    fn add(self, other: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, other: Fixed) {
        self.0 = self.0.wrapping_add(other.0);
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    fn sub(self, other: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(other.0))
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, other: Fixed) {
        self.0 = self.0.wrapping_sub(other.0);
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}
