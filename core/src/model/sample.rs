//! Sampling expected spectra from allele frequency densities.

use crate::{utils::binomial_pmf, Array, Scs};

use super::{Grid, ModelError, Phi};

/// Returns the expected spectrum of samples drawn from a density.
///
/// The sample sizes are the number of sampled chromosomes in each population. If inbreeding
/// coefficients are provided, samples are taken to be diploid individuals whose genotypes
/// deviate from Hardy-Weinberg proportions accordingly; sample sizes must then be even.
///
/// # Errors
///
/// If the number of sample sizes or inbreeding coefficients does not match the number of
/// populations in the density, or if a sample size is odd when inbreeding is used.
pub fn spectrum(
    phi: &Phi,
    grid: &Grid,
    sample_sizes: &[usize],
    inbreeding: Option<&[f64]>,
) -> Result<Scs, ModelError> {
    let dimensions = phi.dimensions();
    if sample_sizes.len() != dimensions {
        return Err(ModelError::Dimensions {
            expected: dimensions,
            found: sample_sizes.len(),
        });
    }
    if let Some(coefficients) = inbreeding {
        if coefficients.len() != dimensions {
            return Err(ModelError::Dimensions {
                expected: dimensions,
                found: coefficients.len(),
            });
        }
    }

    let matrices = sample_sizes
        .iter()
        .enumerate()
        .map(|(i, &n)| sampling_matrix(grid, n, inbreeding.map(|f| f[i])))
        .collect::<Result<Vec<_>, _>>()?;

    let shape = sample_sizes.iter().map(|n| n + 1).collect::<Vec<_>>();

    let data = match phi {
        Phi::OnePop(phi) => matrices[0]
            .iter()
            .map(|row| row.iter().zip(phi).map(|(s, p)| s * p).sum())
            .collect::<Vec<f64>>(),
        Phi::TwoPops(phi) => {
            let (first, second) = (&matrices[0], &matrices[1]);
            let n = grid.len();

            // Contract the first axis, then the second
            let partial = first
                .iter()
                .map(|row| {
                    (0..n)
                        .map(|j| (0..n).map(|i| row[i] * phi.as_slice()[i * n + j]).sum())
                        .collect::<Vec<f64>>()
                })
                .collect::<Vec<_>>();

            partial
                .iter()
                .flat_map(|partial_row| {
                    second.iter().map(move |row| {
                        row.iter().zip(partial_row).map(|(s, p)| s * p).sum::<f64>()
                    })
                })
                .collect()
        }
    };

    Ok(Scs::from(Array::new_unchecked(data, shape)))
}

/// Returns the weighted sampling matrix for a single population.
///
/// The entry in row `k` and column `i` is the probability of observing `k` derived alleles in
/// a sample of `n` at frequency `x[i]`, multiplied by the trapezoid weight of `x[i]`.
fn sampling_matrix(
    grid: &Grid,
    n: usize,
    inbreeding: Option<f64>,
) -> Result<Vec<Vec<f64>>, ModelError> {
    let (x, w) = (grid.points(), grid.widths());

    let columns = match inbreeding {
        Some(f) => {
            if n % 2 != 0 {
                return Err(ModelError::OddSampleSize { sample_size: n });
            }
            x.iter()
                .map(|&x| inbred_probabilities(n, x, f))
                .collect::<Vec<_>>()
        }
        None => x
            .iter()
            .map(|&x| (0..=n).map(|k| binomial_pmf(n as u64, k as u64, x)).collect())
            .collect::<Vec<Vec<f64>>>(),
    };

    Ok((0..=n)
        .map(|k| {
            columns
                .iter()
                .zip(w)
                .map(|(column, w)| column[k] * w)
                .collect()
        })
        .collect())
}

/// Returns the probabilities of observing each number of derived alleles in `n / 2` diploid
/// individuals with inbreeding coefficient `f`, at allele frequency `x`.
fn inbred_probabilities(n: usize, x: f64, f: f64) -> Vec<f64> {
    let heterozygosity = x * (1.0 - x);
    let genotypes = [
        (1.0 - x) * (1.0 - x) + f * heterozygosity,
        2.0 * heterozygosity * (1.0 - f),
        x * x + f * heterozygosity,
    ];

    let mut probabilities = vec![0.0; n + 1];
    probabilities[0] = 1.0;

    for individual in 0..n / 2 {
        for k in (0..=2 * individual + 2).rev() {
            let mut p = probabilities[k] * genotypes[0];
            if k >= 1 {
                p += probabilities[k - 1] * genotypes[1];
            }
            if k >= 2 {
                p += probabilities[k - 2] * genotypes[2];
            }
            probabilities[k] = p;
        }
    }

    probabilities
}
