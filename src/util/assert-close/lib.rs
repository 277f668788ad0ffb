//! `assert_close!`, for comparing floating point data in tests.
//!
//! ```text
//! assert_close!(a, b);
//! assert_close!(abs=1e-8, a, b);
//! assert_close!(rel=1e-5, abs=1e-10, a, b, "context {}", x);
//! ```
//!
//! Works on anything implementing [`CheckClose`]: `f64`, slices, `Vec`s and
//! fixed-size arrays of those (so `Vec<[f64; 3]>` configurations compare directly).

#[macro_use]
extern crate failure;
use std::fmt;

pub const DEFAULT_NONZERO_TOL: f64 = 1e-9;

#[macro_export]
macro_rules! assert_close {
    ($($t:tt)*) => {
        $crate::assert_close_impl!{@parsing [$($t)*] [[@rel $crate::DEFAULT_NONZERO_TOL] [@abs 0.0]]}
    };
}

#[macro_export]
macro_rules! debug_assert_close {
    ($($t:tt)*) => {{
        #[cfg(debug_assertions)] {
            $crate::assert_close!{$($t)*}
        }
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! assert_close_impl {
    (@parsing [rel=$tol:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        $crate::assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@rel $tol]]);
    };
    (@parsing [abs=$tol:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        $crate::assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@abs $tol]]);
    };
    (@parsing [$a:expr, $b:expr $(,)*] $assignments:tt) => {
        $crate::assert_close_impl!(@expand $assignments [@comp $a, $b] [@fmt "not nearly equal!"])
    };
    (@parsing [$a:expr, $b:expr, $($fmt:tt)+] $assignments:tt) => {
        $crate::assert_close_impl!(@expand $assignments [@comp $a, $b] [@fmt $($fmt)+])
    };
    (@expand [$($assignment:tt)*] [@comp $a:expr, $b:expr] [@fmt $($fmt:tt)+] ) => {
        #[allow(unused_mut)]
        #[allow(unused_assignments)]
        {
            let a = $a;
            let b = $b;

            let mut abs: f64;
            let mut rel: f64;
            $(
                $crate::assert_close_impl!{@stmt::assign [abs, rel] $assignment}
            )*

            let tol = $crate::Tolerances { abs, rel };
            if let Err(e) = $crate::CheckClose::check_close(&a, &b, tol) {
                panic!(
                    "{} (tolerances: rel={}, abs={})\n left: {:?}\nright: {:?}\n{}",
                    format!($($fmt)*), rel, abs, a, b, e,
                );
            }
        }
    };
    (@stmt::assign [$abs:ident, $rel:ident] [@abs $tol:expr]) => { $abs = $tol; };
    (@stmt::assign [$abs:ident, $rel:ident] [@rel $tol:expr]) => { $rel = $tol; };
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Tolerances {
    /// Same semantics as Python's `math.isclose`.
    pub fn is_close(&self, a: f64, b: f64) -> bool {
        assert!(self.rel >= 0.0);
        assert!(self.abs >= 0.0);

        // catch infinities of same sign
        if a == b { return true; }

        // catch infinities of opposite sign, avoiding infinite relative tolerance
        if a.is_infinite() || b.is_infinite() { return false; }

        // NaN falls through and fails here
        (a - b).abs() < self.abs.max(self.rel * a.abs()).max(self.rel * b.abs())
    }
}

/// The first pair of elements that failed to compare close.
#[derive(Debug, Fail)]
pub struct CheckCloseError {
    pub values: (f64, f64),
    /// Flat position of the failing element, for containers.
    pub index: Option<usize>,
    pub tol: Tolerances,
}

impl fmt::Display for CheckCloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (left, right) = self.values;
        if let Some(index) = self.index {
            writeln!(f, "failed at element {}:", index)?;
        } else {
            writeln!(f, "failed at:")?;
        }
        write!(f, "  left: {:?}\n right: {:?}\n   tol: {:?}", left, right, self.tol)
    }
}

pub trait CheckClose<Rhs: ?Sized = Self> {
    /// Test that all values of self and other are close.
    fn check_close(&self, other: &Rhs, tol: Tolerances) -> Result<(), CheckCloseError>;
}

impl CheckClose for f64 {
    fn check_close(&self, other: &f64, tol: Tolerances) -> Result<(), CheckCloseError> {
        match tol.is_close(*self, *other) {
            true => Ok(()),
            false => Err(CheckCloseError { values: (*self, *other), index: None, tol }),
        }
    }
}

impl<'a, T: ?Sized + CheckClose> CheckClose for &'a T {
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError>
    { CheckClose::check_close(*self, *other, tol) }
}

impl<T: CheckClose> CheckClose for [T] {
    fn check_close(&self, other: &[T], tol: Tolerances) -> Result<(), CheckCloseError> {
        assert_eq!(self.len(), other.len(), "length mismatch in assert_close");
        for (i, (a, b)) in self.iter().zip(other).enumerate() {
            a.check_close(b, tol).map_err(|e| CheckCloseError { index: Some(e.index.unwrap_or(i)), ..e })?;
        }
        Ok(())
    }
}

impl<T: CheckClose> CheckClose for Vec<T> {
    fn check_close(&self, other: &Vec<T>, tol: Tolerances) -> Result<(), CheckCloseError>
    { self[..].check_close(&other[..], tol) }
}

impl<T: CheckClose> CheckClose<[T]> for Vec<T> {
    fn check_close(&self, other: &[T], tol: Tolerances) -> Result<(), CheckCloseError>
    { self[..].check_close(other, tol) }
}

impl<T: CheckClose> CheckClose<Vec<T>> for [T] {
    fn check_close(&self, other: &Vec<T>, tol: Tolerances) -> Result<(), CheckCloseError>
    { self.check_close(&other[..], tol) }
}

impl<T: CheckClose, const N: usize> CheckClose for [T; N] {
    fn check_close(&self, other: &[T; N], tol: Tolerances) -> Result<(), CheckCloseError>
    { self[..].check_close(&other[..], tol) }
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    #[test]
    fn macro_output_can_compile() {
        assert_close!(1.0, 1.0);
        assert_close!(abs=1e-8, 1.0, 1.0);
        assert_close!(rel=1e-8, abs=1e-8, 1.0, 1.0);
        assert_close!(1.0, 1.0,);
        assert_close!(abs=1e-8, 1.0, 1.0, "with {}", "context");
    }

    #[test]
    fn nested_configurations() {
        let a = vec![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]];
        let b = vec![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0 + 1e-12]];
        assert_close!(abs=1e-10, a, b);
    }

    #[test]
    fn reports_failing_index() {
        let tol = crate::Tolerances { abs: 0.0, rel: 0.0 };
        let err = crate::CheckClose::check_close(&[1.0, 2.0, 3.0][..], &[1.0, 2.0, 3.5][..], tol).unwrap_err();
        assert_eq!(err.index, Some(2));
        assert_eq!(err.values, (3.0, 3.5));
    }

    #[test]
    #[should_panic]
    fn not_close() {
        assert_close!(abs=0.0, rel=0.0, 1.0, 1.1);
    }

    #[test]
    #[should_panic]
    fn nan_is_never_close() {
        assert_close!(abs=1.0, f64::NAN, f64::NAN);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic)]
    fn debug_not_close() {
        debug_assert_close!(abs=0.0, rel=0.0, 1.0, 1.1);
    }
}
