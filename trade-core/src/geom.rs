// Vector math for way-points and transporter bodies

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use std::ops::{Add, Mul, Sub};

#[derive(Copy, Clone, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[inline]
pub const fn vec3(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3 { x, y, z }
}

impl Debug for Vec3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("V3(")?;
        Debug::fmt(&self.x, f)?;
        f.write_str(", ")?;
        Debug::fmt(&self.y, f)?;
        f.write_str(", ")?;
        Debug::fmt(&self.z, f)?;
        f.write_str(")")
    }
}

impl Serialize for Vec3 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.x, self.y, self.z).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Vec3 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (x, y, z) = Deserialize::deserialize(deserializer)?;
        Ok(Vec3 { x, y, z })
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        vec3(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        vec3(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self::Output {
        vec3(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Vec3 {
    pub const ZERO: Self = vec3(0.0, 0.0, 0.0);

    #[inline]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Length of the projection onto the ground plane.
    #[inline]
    pub fn xy_length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Full 3D distance. Used for the static length of a trade route.
    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Planar distance. Transporters move on the ground, so every
    /// agent-side measurement ignores height.
    #[inline]
    pub fn xy_distance(self, other: Self) -> f32 {
        (self - other).xy_length()
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xy_distance_ignores_height() {
        let a = vec3(0.0, 0.0, 0.0);
        let b = vec3(3.0, 4.0, 100.0);
        assert_eq!(a.xy_distance(b), 5.0);
        assert!(a.distance(b) > 100.0);
    }

    #[test]
    fn serializes_as_tuple() {
        let json = serde_json::to_string(&vec3(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0]");
        let back: Vec3 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec3(1.0, 2.0, 3.0));
    }
}
