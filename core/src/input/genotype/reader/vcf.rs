//! Genotype calls from VCF.

use std::io;

use noodles_vcf as vcf;
use vcf::record::{
    genotypes::sample::value::genotype::Genotype as VcfGenotype, Chromosome, Record as VcfRecord,
};

use crate::input::{
    genotype::{Call, Error, Genotype, Skipped},
    ReadStatus, Sample,
};

/// A genotype reader for VCF.
///
/// Only the `GT` field is used. The reference allele is taken as ancestral and the first
/// alternative allele as derived.
pub struct Reader<R> {
    inner: vcf::Reader<R>,
    header: vcf::Header,
    samples: Vec<Sample>,
    record: VcfRecord,
}

impl<R> Reader<R>
where
    R: io::BufRead,
{
    /// Creates a new reader, reading the header from the inner reader.
    pub fn new(inner: R) -> io::Result<Self> {
        let mut inner = vcf::Reader::new(inner);

        let header = inner.read_header()?;
        let samples = header
            .sample_names()
            .iter()
            .map(|name| Sample::from(name.as_str()))
            .collect::<Vec<_>>();

        log::debug!("Read VCF header with {} samples", samples.len());

        Ok(Self {
            inner,
            header,
            samples,
            record: VcfRecord::default(),
        })
    }
}

impl<R> super::Reader for Reader<R>
where
    R: io::BufRead,
{
    fn current_contig(&self) -> &str {
        match self.record.chromosome() {
            Chromosome::Name(s) | Chromosome::Symbol(s) => s,
        }
    }

    fn current_position(&self) -> usize {
        self.record.position().into()
    }

    fn read_calls(&mut self) -> ReadStatus<Vec<Call>> {
        match self.inner.read_record(&self.header, &mut self.record) {
            Ok(0) => ReadStatus::Done,
            Ok(_) => match self.record.genotypes().genotypes() {
                Ok(genotypes) => ReadStatus::Read(genotypes.into_iter().map(Call::from).collect()),
                Err(e) => ReadStatus::Error(io::Error::new(io::ErrorKind::InvalidData, e)),
            },
            Err(e) => ReadStatus::Error(e),
        }
    }

    fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

impl From<Option<VcfGenotype>> for Call {
    fn from(genotype: Option<VcfGenotype>) -> Self {
        let Some(genotype) = genotype else {
            return Call::Skipped(Skipped::Missing);
        };

        let alleles = &genotype[..];
        let [a, b] = alleles else {
            return Call::Invalid(Error::Ploidy {
                found: alleles.len(),
            });
        };

        match (a.position(), b.position()) {
            (Some(a), Some(b)) => Genotype::from_allele_indices(a, b)
                .map(Call::Called)
                .unwrap_or(Call::Skipped(Skipped::Multiallelic)),
            _ => Call::Skipped(Skipped::Missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr;

    use crate::input::genotype::Reader as _;

    fn call(s: &str) -> Call {
        Call::from(Some(VcfGenotype::from_str(s).expect("invalid genotype")))
    }

    #[test]
    fn test_called() {
        assert_eq!(call("0/0"), Call::Called(Genotype::Zero));
        assert_eq!(call("0/1"), Call::Called(Genotype::One));
        assert_eq!(call("1|0"), Call::Called(Genotype::One));
        assert_eq!(call("1|1"), Call::Called(Genotype::Two));
    }

    #[test]
    fn test_missing() {
        for missing in ["./.", "./0", "1|."] {
            assert_eq!(call(missing), Call::Skipped(Skipped::Missing));
        }

        assert_eq!(Call::from(None), Call::Skipped(Skipped::Missing));
    }

    #[test]
    fn test_multiallelic() {
        for multiallelic in ["1/2", "0/2", "2|2"] {
            assert_eq!(call(multiallelic), Call::Skipped(Skipped::Multiallelic));
        }
    }

    #[test]
    fn test_not_diploid() {
        assert_eq!(call("0"), Call::Invalid(Error::Ploidy { found: 1 }));
        assert_eq!(call("0/0/1"), Call::Invalid(Error::Ploidy { found: 3 }));
    }

    #[test]
    fn test_read_calls() -> io::Result<()> {
        let vcf = b"\
##fileformat=VCFv4.3
##contig=<ID=chr1>
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2
chr1\t5\t.\tA\tC\t.\tPASS\t.\tGT\t0/1\t./.
chr1\t9\t.\tA\tC,G\t.\tPASS\t.\tGT\t1/1\t0/2
";
        let mut reader = Reader::new(&vcf[..])?;

        assert_eq!(
            reader.samples(),
            &[Sample::from("s1"), Sample::from("s2")]
        );

        let ReadStatus::Read(calls) = reader.read_calls() else {
            panic!("expected record");
        };
        assert_eq!(
            calls,
            vec![Call::Called(Genotype::One), Call::Skipped(Skipped::Missing)]
        );
        assert_eq!(reader.current_contig(), "chr1");
        assert_eq!(reader.current_position(), 5);

        let ReadStatus::Read(calls) = reader.read_calls() else {
            panic!("expected record");
        };
        assert_eq!(
            calls,
            vec![
                Call::Called(Genotype::Two),
                Call::Skipped(Skipped::Multiallelic)
            ]
        );

        assert!(matches!(reader.read_calls(), ReadStatus::Done));

        Ok(())
    }
}
