//! Bootstrap replicates of spectra.
//!
//! Non-parametric replicates resample genomic chunks of a [`SnpTable`] with replacement, which
//! preserves the linkage between nearby sites. Parametric replicates draw Poisson counts around
//! an expected spectrum.

use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::{
    input::snps::{Chunk, SnpTable},
    spectrum::{project::ProjectionError, Count, Counts, Masked},
    Scs,
};

/// The default seed for bootstrapping.
pub const DEFAULT_SEED: u64 = 1762;

/// An iterator over chunk bootstrap replicates of a [`SnpTable`].
///
/// Each replicate draws as many chunks as the table was fragmented into, uniformly with
/// replacement, and builds the spectrum of the sites in the drawn chunks.
#[derive(Debug)]
pub struct Bootstrap<'a, R> {
    table: &'a SnpTable,
    chunks: Vec<Chunk<'a>>,
    sample_sizes: Count,
    polarized: bool,
    rng: R,
}

impl<'a, R> Bootstrap<'a, R>
where
    R: Rng,
{
    /// Returns the chunks that replicates are drawn from.
    pub fn chunks(&self) -> &[Chunk<'a>] {
        &self.chunks
    }

    /// Creates a new bootstrap over windows of `chunk_size` base pairs.
    ///
    /// See [`SnpTable::spectrum`] for the meaning of `sample_sizes` and `polarized`.
    pub fn new(
        table: &'a SnpTable,
        chunk_size: usize,
        sample_sizes: Count,
        polarized: bool,
        rng: R,
    ) -> Self {
        Self {
            table,
            chunks: table.fragment(chunk_size),
            sample_sizes,
            polarized,
            rng,
        }
    }

    /// Returns the next replicate.
    ///
    /// # Errors
    ///
    /// If the sample sizes do not match the dimensions of the table.
    pub fn replicate(&mut self) -> Result<Masked<Counts>, ProjectionError> {
        let n = self.chunks.len();
        let drawn = (0..n)
            .map(|_| &self.chunks[self.rng.gen_range(0..n)])
            .collect::<Vec<_>>();

        self.table
            .spectrum_from_chunks(drawn, &self.sample_sizes, self.polarized)
    }
}

impl<'a, R> Iterator for Bootstrap<'a, R>
where
    R: Rng,
{
    type Item = Result<Masked<Counts>, ProjectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.replicate())
    }
}

/// Returns a spectrum with each entry drawn from a Poisson distribution with mean given by the
/// corresponding entry in `model`.
///
/// Entries where the model is not positive and finite are zero.
pub fn poisson_sample<R>(model: &Scs, rng: &mut R) -> Scs
where
    R: Rng,
{
    let mut sample = Scs::from_zeros(model.shape().clone());

    sample
        .inner_mut()
        .iter_mut()
        .zip(model.inner().iter())
        .filter(|(_, mean)| mean.is_finite())
        .for_each(|(x, &mean)| {
            if let Ok(poisson) = Poisson::new(mean) {
                *x = poisson.sample(rng);
            }
        });

    sample
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{rngs::StdRng, SeedableRng};

    const DADI: &str = "\
Ingroup\tOutgroup\tAllele1\tA\tAllele2\tA\tGene\tPosition
TCA\tTCA\tC\t3\tG\t1\tchr1\t10
TGA\tTCA\tC\t2\tG\t2\tchr1\t250
TTA\tTTA\tT\t1\tG\t3\tchr1\t420
ACT\tACT\tC\t3\tA\t1\tchr2\t5
";

    fn table() -> SnpTable {
        SnpTable::read_dadi(&mut DADI.as_bytes(), None).unwrap()
    }

    #[test]
    fn test_replicates_preserve_number_of_sites() {
        let table = table();
        let mut bootstrap = Bootstrap::new(
            &table,
            100,
            Count::from(vec![4]),
            true,
            StdRng::seed_from_u64(DEFAULT_SEED),
        );

        // Five windows on chr1, of which windows [100, 200) and [300, 400) are empty, and a
        // single window on chr2
        assert_eq!(bootstrap.chunks().len(), 6);
        assert_eq!(bootstrap.chunks()[1].len(), 0);

        for replicate in bootstrap.by_ref().take(10) {
            let replicate = replicate.unwrap();
            let total = replicate.spectrum().sum();
            assert!(total <= 6.0);
            assert_eq!(total.fract(), 0.0);
        }
    }

    #[test]
    fn test_replicates_reproducible() {
        let table = table();
        let replicates = |seed| {
            Bootstrap::new(
                &table,
                100,
                Count::from(vec![4]),
                true,
                StdRng::seed_from_u64(seed),
            )
            .take(5)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
        };

        assert_eq!(replicates(1), replicates(1));
    }

    #[test]
    fn test_single_chunk_replicates_equal_spectrum() {
        let table = table();
        let sample_sizes = Count::from(vec![4]);
        let expected = table.spectrum(&sample_sizes, false).unwrap();

        let mut bootstrap = Bootstrap::new(
            &table,
            usize::MAX,
            sample_sizes,
            false,
            StdRng::seed_from_u64(2),
        );

        // One chunk per contig, so replicates are combinations of the two contigs
        assert_eq!(bootstrap.chunks().len(), 2);
        let replicate = bootstrap.replicate().unwrap();
        assert!(replicate.is_folded());
        assert_eq!(replicate.shape(), expected.shape());
    }

    #[test]
    fn test_replicate_dimension_mismatch() {
        let table = table();
        let mut bootstrap = Bootstrap::new(
            &table,
            100,
            Count::from(vec![4, 4]),
            true,
            StdRng::seed_from_u64(3),
        );

        assert!(bootstrap.replicate().is_err());
    }

    #[test]
    fn test_poisson_sample() {
        let model = Scs::from_vec([0., 1000., 0.5, -1., f64::NAN]);
        let mut rng = StdRng::seed_from_u64(4);

        let sample = poisson_sample(&model, &mut rng);
        let values = sample.inner().as_slice();

        assert_eq!(values[0], 0.0);
        assert!((values[1] - 1000.0).abs() < 200.0);
        assert_eq!(values[3], 0.0);
        assert_eq!(values[4], 0.0);
        assert!(values.iter().all(|x| x.fract() == 0.0));
    }
}
