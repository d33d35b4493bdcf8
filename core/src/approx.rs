//! Approximate comparisons for tests.

macro_rules! assert_approx_eq {
    (@ $lhs:expr, $rhs:expr, $tolerance:expr) => {
        match (&($lhs), &($rhs)) {
            (lhs, rhs) => assert!(
                $crate::approx::ApproxEq::approx_eq(lhs, rhs, $tolerance),
                r#"assertion failed: `({} ≈ {})` with tolerance {:?}
  left: `{:?}`,
 right: `{:?}`"#,
                stringify!($lhs),
                stringify!($rhs),
                $tolerance,
                lhs,
                rhs,
            ),
        }
    };
    ($lhs:expr, $rhs:expr, epsilon = $epsilon:expr) => {
        assert_approx_eq!(@ $lhs, $rhs, $crate::approx::Tolerance::Absolute($epsilon))
    };
    ($lhs:expr, $rhs:expr, relative = $relative:expr) => {
        assert_approx_eq!(@ $lhs, $rhs, $crate::approx::Tolerance::Relative($relative))
    };
}

/// A tolerance for comparing floats.
#[derive(Clone, Copy, Debug)]
pub enum Tolerance {
    /// Values may differ by less than this amount.
    Absolute(f64),
    /// Values may differ by less than this fraction of the larger magnitude.
    Relative(f64),
}

impl Tolerance {
    fn admits(self, lhs: f64, rhs: f64) -> bool {
        if lhs == rhs {
            return true;
        }

        let difference = (lhs - rhs).abs();
        match self {
            Tolerance::Absolute(epsilon) => difference < epsilon,
            Tolerance::Relative(fraction) => difference < fraction * lhs.abs().max(rhs.abs()),
        }
    }
}

pub trait ApproxEq {
    fn approx_eq(&self, other: &Self, tolerance: Tolerance) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self, tolerance: Tolerance) -> bool {
        tolerance.admits(*self, *other)
    }
}

impl<T> ApproxEq for [T]
where
    T: ApproxEq,
{
    fn approx_eq(&self, other: &Self, tolerance: Tolerance) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other)
                .all(|(x, y)| x.approx_eq(y, tolerance))
    }
}

impl<T, const N: usize> ApproxEq for [T; N]
where
    T: ApproxEq,
{
    fn approx_eq(&self, other: &Self, tolerance: Tolerance) -> bool {
        self.as_slice().approx_eq(other.as_slice(), tolerance)
    }
}

impl<T> ApproxEq for Vec<T>
where
    T: ApproxEq,
{
    fn approx_eq(&self, other: &Self, tolerance: Tolerance) -> bool {
        self.as_slice().approx_eq(other.as_slice(), tolerance)
    }
}

impl<T> ApproxEq for Option<T>
where
    T: ApproxEq,
{
    fn approx_eq(&self, other: &Self, tolerance: Tolerance) -> bool {
        match (self, other) {
            (Some(x), Some(y)) => x.approx_eq(y, tolerance),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> ApproxEq for &T
where
    T: ApproxEq + ?Sized,
{
    fn approx_eq(&self, other: &Self, tolerance: Tolerance) -> bool {
        T::approx_eq(*self, *other, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_and_relative() {
        assert!(Tolerance::Absolute(0.1).admits(1.0, 1.05));
        assert!(!Tolerance::Absolute(0.1).admits(100.0, 100.5));
        assert!(Tolerance::Relative(0.01).admits(100.0, 100.5));
        assert!(!Tolerance::Relative(0.01).admits(1.0, 1.05));
        assert!(Tolerance::Relative(0.0).admits(f64::INFINITY, f64::INFINITY));
    }

    #[test]
    fn test_nested() {
        assert_approx_eq!([1.0, 2.0], [1.0, 2.0 + 1e-9], epsilon = 1e-8);
        assert_approx_eq!(Some(vec![1e6]), Some(vec![1e6 + 1.0]), relative = 1e-5);
        assert!(!Some(1.0).approx_eq(&None, Tolerance::Absolute(1.0)));
    }
}
