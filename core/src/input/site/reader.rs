//! Site reader.

use std::io;

pub mod builder;
pub use builder::Builder;

use crate::input::{
    genotype::{self, Call, Genotype, Skipped},
    sample, ReadStatus,
};

use super::Site;

/// A site reader, summarising the genotypes of each record into per-population allele counts.
pub struct Reader {
    reader: genotype::reader::DynReader,
    // Population of each sample column in the genotype reader, if used
    columns: Vec<Option<usize>>,
    populations: Vec<String>,
    site: Site,
}

impl Reader {
    /// Returns the current contig of the reader.
    pub fn current_contig(&self) -> &str {
        self.reader.current_contig()
    }

    /// Returns the current position of the reader within its current contig.
    pub fn current_position(&self) -> usize {
        self.reader.current_position()
    }

    fn new_unchecked(reader: genotype::reader::DynReader, sample_map: &sample::Map) -> Self {
        let columns = reader
            .samples()
            .iter()
            .map(|sample| sample_map.get_population_id(sample).map(usize::from))
            .collect();

        let populations = sample_map
            .populations()
            .map(|population| population.to_string())
            .collect::<Vec<_>>();

        Self {
            reader,
            columns,
            site: Site::from_zeros(populations.len()),
            populations,
        }
    }

    /// Returns the population names in the order of the site dimensions.
    pub fn population_names(&self) -> Vec<String> {
        self.populations.clone()
    }

    /// Reads the next site in the reader.
    ///
    /// A site is skipped if any genotype carries an allele other than the reference or first
    /// alternative allele. Missing genotypes only reduce the totals.
    pub fn read_site(&mut self) -> ReadStatus<Result<&Site, Skipped>> {
        let calls = match self.reader.read_calls() {
            ReadStatus::Read(calls) => calls,
            ReadStatus::Error(e) => return ReadStatus::Error(e),
            ReadStatus::Done => return ReadStatus::Done,
        };

        self.site.counts.set_zero();
        self.site.totals.set_zero();

        let mut multiallelic = false;
        for (call, population) in calls.into_iter().zip(&self.columns) {
            let Some(population) = *population else {
                continue;
            };

            match call {
                Call::Called(genotype) => {
                    self.site.counts[population] += genotype.alternative_alleles();
                    self.site.totals[population] += Genotype::PLOIDY;
                }
                Call::Skipped(Skipped::Missing) => (),
                Call::Skipped(Skipped::Multiallelic) => multiallelic = true,
                Call::Invalid(e) => {
                    return ReadStatus::Error(io::Error::new(io::ErrorKind::InvalidData, e))
                }
            }
        }

        if multiallelic {
            ReadStatus::Read(Err(Skipped::Multiallelic))
        } else {
            ReadStatus::Read(Ok(&self.site))
        }
    }
}
