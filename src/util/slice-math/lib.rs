//! Math utils for variable length contiguous vectors.
//!
//! Everything in the dimer crate is a flat `[f64]` of length `3 * num_particles`,
//! so this is restricted to `f64`.

#[derive(Debug,Copy,Clone,PartialEq,PartialOrd)]
pub struct BadNorm(pub f64);

/// Implements element-wise operations.
///
/// Use the lowercase [`v`] to construct.
#[derive(Debug,Copy,Clone,PartialEq,PartialOrd)]
pub struct V<T: AllowedV>(pub T);
pub type VOwn = V<Vec<f64>>;
pub type VRef<'a> = V<&'a [f64]>;
pub type VMut<'a> = V<&'a mut [f64]>;

/// This exists to give you better errors when you accidentally construct a `V<&Vec<f64>>`.
///
/// Hint: use `v(value)` instead of `V(value)` to construct V.
pub trait AllowedV {}
impl AllowedV for Vec<f64> {}
impl<'a> AllowedV for &'a [f64] {}
impl<'a> AllowedV for &'a mut [f64] {}

//------------------------
// Math ops

use std::ops::{
    Add, Sub, Mul, Div, Neg,
    Deref, DerefMut,
};

macro_rules! impl_binary {
    ($Op:ident::$op:ident) => {
        // scalar . vector
        impl $Op<VOwn> for f64 {
            type Output = VOwn;
            fn $op(self, mut u: VOwn) -> VOwn {
                for x in &mut u.0 { *x = self.$op(*x); }
                u
            }
        }

        impl<'a> $Op<VRef<'a>> for f64 {
            type Output = VOwn;
            fn $op(self, u: VRef<'a>) -> VOwn {
                V(u.0.iter().map(|&x| self.$op(x)).collect())
            }
        }

        // vector . scalar
        impl $Op<f64> for VOwn {
            type Output = VOwn;
            fn $op(mut self, s: f64) -> VOwn {
                for x in &mut self.0 { *x = x.$op(s); }
                self
            }
        }

        impl<'a> $Op<f64> for VRef<'a> {
            type Output = VOwn;
            fn $op(self, s: f64) -> VOwn {
                V(self.0.iter().map(|&x| x.$op(s)).collect())
            }
        }

        // vector . vector
        impl $Op<VOwn> for VOwn {
            type Output = VOwn;
            fn $op(mut self, u: VOwn) -> VOwn {
                assert_eq!(self.len(), u.len());
                for (x, y) in self.0.iter_mut().zip(u.0) { *x = x.$op(y); }
                self
            }
        }

        impl<'b> $Op<VRef<'b>> for VOwn {
            type Output = VOwn;
            fn $op(mut self, u: VRef<'b>) -> VOwn {
                assert_eq!(self.len(), u.len());
                for (x, &y) in self.0.iter_mut().zip(u.0) { *x = x.$op(y); }
                self
            }
        }

        impl<'a> $Op<VOwn> for VRef<'a> {
            type Output = VOwn;
            fn $op(self, u: VOwn) -> VOwn { self.$op(v(&u.0[..])) }
        }

        impl<'a, 'b> $Op<VRef<'b>> for VRef<'a> {
            type Output = VOwn;
            fn $op(self, u: VRef<'b>) -> VOwn {
                assert_eq!(self.len(), u.len());
                V(self.0.iter().zip(u.0).map(|(&a, &b)| a.$op(b)).collect())
            }
        }
    }
}

impl_binary!(Add::add);
impl_binary!(Sub::sub);
impl_binary!(Mul::mul);
impl_binary!(Div::div);

impl Neg for VOwn {
    type Output = VOwn;
    fn neg(self) -> VOwn { -1.0 * self }
}

impl<'a> Neg for VRef<'a> {
    type Output = VOwn;
    fn neg(self) -> VOwn { -1.0 * self }
}

//------------------------
// Let &V coerce to &[f64] for the sake of `vdot` and `vnorm` below

impl Deref for VOwn {
    type Target = [f64];
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<'a> Deref for VRef<'a> {
    type Target = [f64];
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<'a> Deref for VMut<'a> {
    type Target = [f64];
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<'a> DerefMut for VMut<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target { self.0 }
}

// behave more like Vec than slices
impl IntoIterator for VOwn {
    type IntoIter = std::vec::IntoIter<f64>;
    type Item = f64;
    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

//------------------------
// v() function.
//
// This is all so you can write `v(&some_vec)` instead of `V(&some_vec[..])`
// (`V(&some_vec)` doesn't make the right type since the generic type
//  parameter in `V` inhibits reference coercions.)

pub fn v<W: MakeV>(w: W) -> W::Output { w.make_v() }

/// Implementation detail of [`v`].
pub trait MakeV {
    type Output;
    fn make_v(self) -> Self::Output;
}

impl MakeV for Vec<f64> {
    type Output = VOwn;
    fn make_v(self) -> VOwn { V(self) }
}

impl<'a> MakeV for &'a [f64] {
    type Output = VRef<'a>;
    fn make_v(self) -> VRef<'a> { V(self) }
}

impl<'a> MakeV for &'a Vec<f64> {
    type Output = VRef<'a>;
    fn make_v(self) -> VRef<'a> { V(self) }
}

impl<'a> MakeV for &'a mut [f64] {
    type Output = VMut<'a>;
    fn make_v(self) -> VMut<'a> { V(self) }
}

impl<'a> MakeV for &'a mut Vec<f64> {
    type Output = VMut<'a>;
    fn make_v(self) -> VMut<'a> { V(self) }
}

//------------------------
// Reductions

pub fn vdot(u: &[f64], w: &[f64]) -> f64 {
    assert_eq!(u.len(), w.len());
    u.iter().zip(w).map(|(a, b)| a * b).sum()
}

pub fn vsqnorm(u: &[f64]) -> f64 { vdot(u, u) }
pub fn vnorm(u: &[f64]) -> f64 { vsqnorm(u).sqrt() }

/// Largest absolute value of any element. (zero for an empty slice)
pub fn vmax_abs(u: &[f64]) -> f64 {
    u.iter().fold(0.0, |acc, x| f64::max(acc, x.abs()))
}

pub fn vnormalize(u: &[f64]) -> Result<VOwn, BadNorm> {
    let norm = vnorm(u);
    let recip = norm.recip();
    if !recip.is_normal() {
        return Err(BadNorm(norm));
    }

    Ok(recip * v(u))
}

//------------------------
// Projections against a unit vector.
//
// None of these check that `unit` is actually normalized.

/// `(u.n) n`
pub fn vproject(u: &[f64], unit: &[f64]) -> VOwn {
    vdot(u, unit) * v(unit)
}

/// `u - (u.n) n`, the part of `u` perpendicular to `n`.
pub fn vreject(u: &[f64], unit: &[f64]) -> VOwn {
    let V(along) = vproject(u, unit);
    v(u) - v(along)
}

/// `u - 2 (u.n) n`, the mirror image of `u` through the plane normal to `n`.
pub fn vreflect(u: &[f64], unit: &[f64]) -> VOwn {
    let dot = vdot(u, unit);
    v(u) - (2.0 * dot) * v(unit)
}

//------------------------
// In-place updates, for buffers that are reused between iterations.

/// `y += alpha * x`
pub fn vaxpy(y: &mut [f64], alpha: f64, x: &[f64]) {
    assert_eq!(y.len(), x.len());
    for (y, &x) in y.iter_mut().zip(x) {
        *y += alpha * x;
    }
}

/// `y = x + alpha * dir`
pub fn vset_offset(y: &mut [f64], x: &[f64], alpha: f64, dir: &[f64]) {
    assert_eq!(y.len(), x.len());
    assert_eq!(y.len(), dir.len());
    for ((y, &x), &d) in y.iter_mut().zip(x).zip(dir) {
        *y = x + alpha * d;
    }
}

//---------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vdot_works() {
        assert_eq!(7.0, vdot(&[4.0, 2.0, 1.0], &[2.0, -1.0, 1.0]));
    }

    #[test]
    #[should_panic]
    fn vdot_length_mismatch() {
        vdot(&[1.0, 2.0], &[1.0]);
    }

    #[test]
    fn operand_order() {
        // exercise each separate impl with a non-commutative operator
        //  to make sure it puts the operands in the correct order
        let ua = vec![1.0, 2.0, 3.0];
        let ub = vec![4.0, 1.0, 1.0];
        let diff_ua_ub = v(vec![-3.0, 1.0, 2.0]);
        let diff_ua_2 = v(vec![-1.0, 0.0, 1.0]);
        let diff_2_ua = v(vec![1.0, 0.0, -1.0]);

        assert_eq!(diff_2_ua, 2.0 - v(ua.clone()));
        assert_eq!(diff_2_ua, 2.0 - v(&ua));
        assert_eq!(diff_ua_2, v(ua.clone()) - 2.0);
        assert_eq!(diff_ua_2, v(&ua) - 2.0);
        assert_eq!(diff_ua_ub, v(ua.clone()) - v(ub.clone()));
        assert_eq!(diff_ua_ub, v(ua.clone()) - v(&ub));
        assert_eq!(diff_ua_ub, v(&ua) - v(ub.clone()));
        assert_eq!(diff_ua_ub, v(&ua) - v(&ub));
    }

    #[test]
    fn normalize_rejects_zero() {
        assert_eq!(vnormalize(&[0.0; 4]), Err(BadNorm(0.0)));
        assert_eq!(vnormalize(&[0.0, 2.0, 0.0]).unwrap(), v(vec![0.0, 1.0, 0.0]));
    }

    #[test]
    fn normalize_inexact() {
        // 0.6 is not representable, so the result is only within an ulp or so
        let V(unit) = vnormalize(&[3.0, 4.0]).unwrap();
        assert!((unit[0] - 0.6).abs() < 1e-15, "{:?}", unit);
        assert!((unit[1] - 0.8).abs() < 1e-15, "{:?}", unit);
        assert!((vnorm(&unit) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn projections() {
        let n = [0.0, 1.0, 0.0];
        let u = [2.0, 3.0, -1.0];
        assert_eq!(vproject(&u, &n).0, vec![0.0, 3.0, 0.0]);
        assert_eq!(vreject(&u, &n).0, vec![2.0, 0.0, -1.0]);
        assert_eq!(vreflect(&u, &n).0, vec![2.0, -3.0, -1.0]);
        assert_eq!(vmax_abs(&u), 3.0);
    }

    #[test]
    fn in_place() {
        let mut y = vec![1.0, 1.0];
        vaxpy(&mut y, 2.0, &[0.5, -1.0]);
        assert_eq!(y, vec![2.0, -1.0]);

        vset_offset(&mut y, &[1.0, 2.0], -1.0, &[1.0, 1.0]);
        assert_eq!(y, vec![0.0, 1.0]);
    }
}
