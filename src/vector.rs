//! Fixed four-lane vector arithmetic.
//!
//! Several modules process up to four independent signal channels in
//! lock-step. [`Float4`] is an explicit `[f64; 4]` with elementwise
//! operations; [`Mask4`] is the result of lane comparisons, with an `any()`
//! reduction for "did any lane fire" checks. Lane order is significant and
//! preserved by every operation.

use std::ops::{Add, AddAssign, Index, IndexMut, Mul, MulAssign, Neg, Not, Sub, SubAssign};

/// Four `f64` lanes, processed elementwise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Float4([f64; 4]);

impl Float4 {
    pub const ZERO: Float4 = Float4([0.0; 4]);

    #[inline]
    pub const fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self([a, b, c, d])
    }

    /// All four lanes set to the same value.
    #[inline]
    pub const fn splat(v: f64) -> Self {
        Self([v; 4])
    }

    #[inline]
    pub const fn from_array(lanes: [f64; 4]) -> Self {
        Self(lanes)
    }

    #[inline]
    pub const fn to_array(self) -> [f64; 4] {
        self.0
    }

    #[inline]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self([f(self.0[0]), f(self.0[1]), f(self.0[2]), f(self.0[3])])
    }

    #[inline]
    pub fn abs(self) -> Self {
        self.map(f64::abs)
    }

    /// Elementwise `2^x`.
    #[inline]
    pub fn exp2(self) -> Self {
        self.map(f64::exp2)
    }

    #[inline]
    pub fn min(self, other: Self) -> Self {
        self.zip(other, f64::min)
    }

    #[inline]
    pub fn max(self, other: Self) -> Self {
        self.zip(other, f64::max)
    }

    /// Elementwise clamp with vector bounds.
    #[inline]
    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        self.max(lo).min(hi)
    }

    /// Elementwise clamp with the same scalar bounds on every lane.
    #[inline]
    pub fn clamp_scalar(self, lo: f64, hi: f64) -> Self {
        self.clamp(Self::splat(lo), Self::splat(hi))
    }

    #[inline]
    pub fn ge(self, other: Self) -> Mask4 {
        self.cmp(other, |a, b| a >= b)
    }

    #[inline]
    pub fn gt(self, other: Self) -> Mask4 {
        self.cmp(other, |a, b| a > b)
    }

    #[inline]
    pub fn le(self, other: Self) -> Mask4 {
        self.cmp(other, |a, b| a <= b)
    }

    #[inline]
    pub fn lt(self, other: Self) -> Mask4 {
        self.cmp(other, |a, b| a < b)
    }

    /// Lane-wise selection: `mask ? if_true : if_false`.
    #[inline]
    pub fn select(mask: Mask4, if_true: Self, if_false: Self) -> Self {
        let mut out = if_false;
        for i in 0..4 {
            if mask.lane(i) {
                out.0[i] = if_true.0[i];
            }
        }
        out
    }

    #[inline]
    fn zip(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self([
            f(self.0[0], other.0[0]),
            f(self.0[1], other.0[1]),
            f(self.0[2], other.0[2]),
            f(self.0[3], other.0[3]),
        ])
    }

    #[inline]
    fn cmp(self, other: Self, f: impl Fn(f64, f64) -> bool) -> Mask4 {
        Mask4([
            f(self.0[0], other.0[0]),
            f(self.0[1], other.0[1]),
            f(self.0[2], other.0[2]),
            f(self.0[3], other.0[3]),
        ])
    }
}

impl Index<usize> for Float4 {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl IndexMut<usize> for Float4 {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.0[i]
    }
}

impl Add for Float4 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for Float4 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Mul for Float4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a * b)
    }
}

impl Mul<f64> for Float4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.map(|a| a * rhs)
    }
}

impl Neg for Float4 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

impl AddAssign for Float4 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Float4 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Float4 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

/// Result of a lane comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mask4([bool; 4]);

impl Mask4 {
    pub const NONE: Mask4 = Mask4([false; 4]);
    pub const ALL: Mask4 = Mask4([true; 4]);

    #[inline]
    pub const fn new(a: bool, b: bool, c: bool, d: bool) -> Self {
        Self([a, b, c, d])
    }

    #[inline]
    pub fn lane(&self, i: usize) -> bool {
        self.0[i]
    }

    #[inline]
    pub fn set_lane(&mut self, i: usize, v: bool) {
        self.0[i] = v;
    }

    /// True if any lane is set (movemask-style reduction).
    #[inline]
    pub fn any(&self) -> bool {
        self.0.iter().any(|&b| b)
    }

    #[inline]
    pub fn all(&self) -> bool {
        self.0.iter().all(|&b| b)
    }

    #[inline]
    pub fn and(self, rhs: Self) -> Self {
        Self([
            self.0[0] && rhs.0[0],
            self.0[1] && rhs.0[1],
            self.0[2] && rhs.0[2],
            self.0[3] && rhs.0[3],
        ])
    }

    #[inline]
    pub fn or(self, rhs: Self) -> Self {
        Self([
            self.0[0] || rhs.0[0],
            self.0[1] || rhs.0[1],
            self.0[2] || rhs.0[2],
            self.0[3] || rhs.0[3],
        ])
    }

    /// Lanes as 0.0/1.0 multipliers.
    #[inline]
    pub fn to_float(self) -> Float4 {
        Float4([
            self.0[0] as u8 as f64,
            self.0[1] as u8 as f64,
            self.0[2] as u8 as f64,
            self.0[3] as u8 as f64,
        ])
    }
}

impl Not for Mask4 {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self([!self.0[0], !self.0[1], !self.0[2], !self.0[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elementwise_arithmetic() {
        let a = Float4::new(1.0, 2.0, 3.0, 4.0);
        let b = Float4::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(a + b, Float4::new(11.0, 22.0, 33.0, 44.0));
        assert_eq!(b - a, Float4::new(9.0, 18.0, 27.0, 36.0));
        assert_eq!(a * b, Float4::new(10.0, 40.0, 90.0, 160.0));
        assert_eq!(a * 2.0, Float4::new(2.0, 4.0, 6.0, 8.0));
        assert_eq!(-a, Float4::new(-1.0, -2.0, -3.0, -4.0));
    }

    #[test]
    fn clamp_preserves_lane_order() {
        let v = Float4::new(-20.0, 0.5, 7.0, 20.0);
        assert_eq!(
            v.clamp_scalar(-5.0, 5.0),
            Float4::new(-5.0, 0.5, 5.0, 5.0)
        );

        let lo = Float4::new(0.0, 0.0, 8.0, -30.0);
        let hi = Float4::new(1.0, 1.0, 9.0, 30.0);
        assert_eq!(v.clamp(lo, hi), Float4::new(0.0, 0.5, 8.0, 20.0));
    }

    #[test]
    fn comparisons_and_any() {
        let a = Float4::new(1.0, 5.0, 3.0, 0.0);
        let b = Float4::splat(3.0);
        let m = a.ge(b);
        assert!(!m.lane(0));
        assert!(m.lane(1));
        assert!(m.lane(2));
        assert!(!m.lane(3));
        assert!(m.any());
        assert!(!Float4::ZERO.gt(b).any());
    }

    #[test]
    fn select_picks_per_lane() {
        let mask = Mask4::new(true, false, true, false);
        let t = Float4::splat(1.0);
        let f = Float4::splat(-1.0);
        assert_eq!(
            Float4::select(mask, t, f),
            Float4::new(1.0, -1.0, 1.0, -1.0)
        );
    }

    #[test]
    fn exp2_lanes() {
        let v = Float4::new(0.0, 1.0, 2.0, -1.0).exp2();
        assert_eq!(v, Float4::new(1.0, 2.0, 4.0, 0.5));
    }

    #[test]
    fn mask_to_float() {
        let m = Mask4::new(true, false, false, true);
        assert_eq!(m.to_float(), Float4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!((!m).to_float(), Float4::new(0.0, 1.0, 1.0, 0.0));
    }
}
