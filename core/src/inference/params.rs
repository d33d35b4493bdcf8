//! Parameter bounds and perturbation.

use rand::Rng;

use super::InferenceError;

/// Lower and upper bounds on model parameters.
///
/// Parameters with a positive lower bound are optimized on a log scale, other parameters on a
/// linear scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Returns the parameters clamped to the bounds.
    pub fn clamp(&self, params: &[f64]) -> Vec<f64> {
        params
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&p, (&lower, &upper))| p.clamp(lower, upper))
            .collect()
    }

    /// Returns true if all parameters lie within the bounds.
    pub fn contains(&self, params: &[f64]) -> bool {
        params.len() == self.len()
            && params
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(p, (lower, upper))| (lower..=upper).contains(&p))
    }

    /// Returns the parameters corresponding to coordinates used during optimization.
    ///
    /// Parameters are clamped to the bounds.
    pub(crate) fn from_internal(&self, internal: &[f64]) -> Vec<f64> {
        let params = internal
            .iter()
            .enumerate()
            .map(|(i, &x)| if self.is_log(i) { x.exp() } else { x })
            .collect::<Vec<_>>();

        self.clamp(&params)
    }

    /// Returns the initial simplex step of each coordinate used during optimization.
    pub(crate) fn initial_steps(&self, internal: &[f64]) -> Vec<f64> {
        internal
            .iter()
            .enumerate()
            .map(|(i, &x)| match (self.is_log(i), x) {
                (true, _) => 0.1,
                (false, x) if x != 0.0 => 0.05 * x.abs(),
                (false, _) => 0.00025,
            })
            .collect()
    }

    fn is_log(&self, i: usize) -> bool {
        self.lower[i] > 0.0
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Returns the lower bounds.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Creates new bounds.
    ///
    /// Bounds may be infinite.
    ///
    /// # Errors
    ///
    /// If the lower and upper bounds differ in length, or if some lower bound is NaN or exceeds
    /// its upper bound.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, InferenceError> {
        if lower.len() != upper.len() {
            return Err(InferenceError::BoundsLength {
                lower: lower.len(),
                upper: upper.len(),
            });
        }

        let invalid = |i: &usize| lower[*i].is_nan() || upper[*i].is_nan() || lower[*i] > upper[*i];
        if let Some(i) = (0..lower.len()).find(invalid) {
            return Err(InferenceError::InvalidBounds {
                index: i,
                lower: lower[i],
                upper: upper[i],
            });
        }

        Ok(Self { lower, upper })
    }

    /// Returns the coordinates used during optimization for parameters.
    pub(crate) fn to_internal(&self, params: &[f64]) -> Vec<f64> {
        self.clamp(params)
            .into_iter()
            .enumerate()
            .map(|(i, p)| if self.is_log(i) { p.ln() } else { p })
            .collect()
    }

    /// Returns bounds that do not constrain `n` parameters.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    /// Returns the upper bounds.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }
}

/// Returns randomly perturbed parameters.
///
/// Each parameter is multiplied by `2^(fold * (2u - 1))` for `u` uniform on `[0, 1)`, so that
/// a fold of one changes parameters by up to a factor of two in either direction. Perturbed
/// values below their lower bound are set to `1.01` times the bound, and values above their
/// upper bound to `0.99` times the bound.
pub fn perturb_params<R>(params: &[f64], fold: f64, bounds: &Bounds, rng: &mut R) -> Vec<f64>
where
    R: Rng,
{
    params
        .iter()
        .zip(bounds.lower.iter().zip(&bounds.upper))
        .map(|(&p, (&lower, &upper))| {
            let u: f64 = rng.gen();
            let perturbed = p * 2f64.powf(fold * (2.0 * u - 1.0));

            if perturbed < lower {
                lower * 1.01
            } else if perturbed > upper {
                upper * 0.99
            } else {
                perturbed
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_new_errors() {
        assert_eq!(
            Bounds::new(vec![0.0], vec![1.0, 2.0]),
            Err(InferenceError::BoundsLength { lower: 1, upper: 2 })
        );
        assert_eq!(
            Bounds::new(vec![0.0, 3.0], vec![1.0, 2.0]),
            Err(InferenceError::InvalidBounds {
                index: 1,
                lower: 3.0,
                upper: 2.0
            })
        );
    }

    #[test]
    fn test_internal_round_trip_clamps() {
        let bounds = Bounds::new(vec![1e-3, 0.0], vec![100.0, 10.0]).unwrap();

        let internal = bounds.to_internal(&[2.0, 3.0]);
        assert_approx_eq!(internal, vec![2f64.ln(), 3.0], epsilon = 1e-12);
        assert_approx_eq!(bounds.from_internal(&internal), vec![2.0, 3.0], epsilon = 1e-12);

        assert_eq!(bounds.from_internal(&[10.0, -1.0]), vec![100.0, 0.0]);
    }

    #[test]
    fn test_contains() {
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();

        assert!(bounds.contains(&[0.0, 1.0]));
        assert!(!bounds.contains(&[0.0, 1.1]));
        assert!(!bounds.contains(&[0.5]));
    }

    #[test]
    fn test_perturb_params_within_factor_of_fold() {
        let bounds = Bounds::unbounded(3);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..100 {
            let perturbed = perturb_params(&[1.0, 4.0, 0.5], 1.0, &bounds, &mut rng);

            for (p, q) in [1.0, 4.0, 0.5].iter().zip(perturbed) {
                assert!(q / p >= 0.5 && q / p <= 2.0);
            }
        }
    }

    #[test]
    fn test_perturb_params_respects_bounds() {
        let bounds = Bounds::new(vec![0.9, 0.0], vec![1.1, 1.05]).unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..100 {
            let perturbed = perturb_params(&[1.0, 1.0], 3.0, &bounds, &mut rng);

            assert!(perturbed[0] >= 0.9 && perturbed[0] <= 1.1);
            assert!(perturbed[1] <= 1.05);
        }
    }

    #[test]
    fn test_perturb_params_zero_fold() {
        let bounds = Bounds::unbounded(2);
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(
            perturb_params(&[1.5, 2.5], 0.0, &bounds, &mut rng),
            vec![1.5, 2.5]
        );
    }
}
