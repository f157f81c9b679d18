//! Fixed-point math utilities for deterministic geometry.
//!
//! Interception and target scoring use fixed-point arithmetic so that
//! the same projectile, shield and candidate set produce bit-identical
//! results on every platform. Floating-point operations can produce
//! different results on different CPUs.

use fixed::types::{I32F32, I64F64};
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector on the ground plane.
///
/// `y` maps to the world `z` axis; see [`Vec3Fixed::horizontal_2d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate (world z).
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Fixed-point 3D vector. `y` is height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Height.
    #[serde(with = "fixed_serde", default)]
    pub y: Fixed,
    /// Z coordinate.
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Lift onto the ground plane at the given height.
    #[must_use]
    pub const fn to_ground(self, height: Fixed) -> Vec3Fixed {
        Vec3Fixed::new(self.x, height, self.y)
    }
}

impl Vec3Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Create a ground-level vector from whole-number coordinates.
    #[must_use]
    pub fn ground(x: i32, z: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::ZERO, Fixed::from_num(z))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Same vector with the height component zeroed.
    #[must_use]
    pub const fn horizontal(self) -> Self {
        Self::new(self.x, Fixed::ZERO, self.z)
    }

    /// Project onto the ground plane as a 2D vector.
    #[must_use]
    pub const fn horizontal_2d(self) -> Vec2Fixed {
        Vec2Fixed::new(self.x, self.z)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Squared length, saturating at [`Fixed::MAX`].
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        let sq = |v: Fixed| v.saturating_mul(v);
        sq(self.x).saturating_add(sq(self.y)).saturating_add(sq(self.z))
    }

    /// Squared distance in 3D.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        (self - other).length_squared()
    }

    /// Squared distance ignoring height.
    #[must_use]
    pub fn horizontal_distance_squared(self, other: Self) -> Fixed {
        (self - other).horizontal().length_squared()
    }

    /// Distance ignoring height.
    #[must_use]
    pub fn horizontal_distance(self, other: Self) -> Fixed {
        let delta = self - other;
        let sq = |v: Fixed| {
            let w = I64F64::from_num(v);
            w.saturating_mul(w)
        };
        let dist = wide_sqrt(sq(delta.x).saturating_add(sq(delta.z)));
        Fixed::saturating_from_num(dist)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        self + (other - self) * t
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = fixed_sqrt(self.length_squared());
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Returns zero for non-positive input.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    // 64 halvings exhaust the 64-bit representation.
    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::const_from_int(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Square root in the wide type, for squares that overflow [`Fixed`].
///
/// Returns zero for non-positive input.
#[must_use]
pub fn wide_sqrt(value: I64F64) -> I64F64 {
    if value <= I64F64::ZERO {
        return I64F64::ZERO;
    }
    let mut low: i128 = 0;
    let mut high: i128 = value.max(I64F64::ONE).to_bits();
    while low < high {
        let mid = low + (high - low + 1) / 2;
        let m = I64F64::from_bits(mid);
        match m.checked_mul(m) {
            Some(sq) if sq <= value => low = mid,
            _ => high = mid - 1,
        }
    }
    I64F64::from_bits(low)
}

/// Where `value` sits between `a` and `b`, clamped to `[0, 1]`.
///
/// Returns zero when `a == b`.
#[must_use]
pub fn inverse_lerp(a: Fixed, b: Fixed, value: Fixed) -> Fixed {
    if a == b {
        return Fixed::ZERO;
    }
    ((value - a) / (b - a)).clamp(Fixed::ZERO, Fixed::ONE)
}

/// Integer grid cell on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Column.
    pub x: i32,
    /// Row (world z).
    pub z: i32,
}

impl Cell {
    /// Create a new cell.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The cell containing a world position.
    #[must_use]
    pub fn containing(pos: Vec3Fixed) -> Self {
        Self::new(pos.x.floor().to_num::<i32>(), pos.z.floor().to_num::<i32>())
    }

    /// World position of the cell center at ground level.
    #[must_use]
    pub fn center(self) -> Vec3Fixed {
        let half = Fixed::ONE / Fixed::const_from_int(2);
        Vec3Fixed::new(
            Fixed::from_num(self.x) + half,
            Fixed::ZERO,
            Fixed::from_num(self.z) + half,
        )
    }

    /// Offset this cell.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Squared distance between cell coordinates.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dz = i64::from(self.z - other.z);
        dx * dx + dz * dz
    }

    /// Chebyshev (king-move) distance.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Add for Vec3Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<Fixed> for Vec3Fixed {
    type Output = Self;

    fn mul(self, rhs: Fixed) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}
