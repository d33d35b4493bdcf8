use std::{
    io::{self, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};

use clap::Args;

use demofit_core::{
    inference::{Bounds, Replicate},
    input::{self, site, SnpTable},
    model::{Grid, ModelKind},
    spectrum::{Count, Counts, Masked},
    Input,
};

/// Reads a spectrum from a path, or from stdin if no path is provided.
pub fn read_spectrum(path: Option<PathBuf>) -> Result<Masked<Counts>, Error> {
    let input = Input::new(path)?;

    demofit_core::spectrum::io::read::Builder::default()
        .read_from_path_or_stdin(input.as_path())
        .with_context(|| format!("Failed to read spectrum from {input}"))
}

/// Reads a spectrum from a path.
pub fn read_spectrum_from_path<P>(path: P) -> Result<Masked<Counts>, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();

    demofit_core::spectrum::io::read::Builder::default()
        .read_from_path(path)
        .with_context(|| format!("Failed to read spectrum from '{}'", path.display()))
}

/// Variant data input, shared by commands that build spectra.
#[derive(Args, Debug, PartialEq)]
pub struct TableArgs {
    /// Input VCF.
    ///
    /// If no file is provided, stdin will be used. Input may be BGZF-compressed or uncompressed.
    /// With `--snps`, the input is instead a (possibly gzipped) dadi SNP data file.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Read input in dadi SNP data format.
    ///
    /// In this format, allele counts are given per population, and the derived allele is
    /// determined from the outgroup context.
    #[arg(long, conflicts_with_all = ["samples", "samples_file", "threads"])]
    pub snps: bool,

    /// Sample populations.
    ///
    /// Comma-separated list of `sample=population` pairs. Samples without a population are
    /// assigned to a single unnamed population. By default, all samples in the input are used
    /// as a single population.
    #[arg(
        short = 's',
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_parser = parse_key_val,
        value_name = "SAMPLE[=POPULATION],...",
        conflicts_with = "samples_file"
    )]
    pub samples: Option<Vec<(String, Option<String>)>>,

    /// Sample populations file.
    ///
    /// Alternative to `--samples`. Each line should contain the name of a sample followed by
    /// whitespace and the name of its population. Empty lines and lines starting with `#` are
    /// ignored.
    #[arg(short = 'S', long, value_name = "FILE")]
    pub samples_file: Option<PathBuf>,

    /// Populations to use, in order.
    ///
    /// By default, all populations are used in order of appearance.
    #[arg(
        short = 'P',
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_name = "POPULATION,..."
    )]
    pub populations: Option<Vec<String>>,

    /// Projected sample sizes.
    ///
    /// Comma-separated number of chromosomes to project each population down to. Sites with
    /// fewer called chromosomes in any population are dropped. By default, the largest number
    /// of called chromosomes in each population is used.
    #[arg(
        short = 'p',
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_name = "INT,..."
    )]
    pub projections: Option<Vec<usize>>,

    /// Create unfolded spectra.
    ///
    /// By default, spectra are folded. Use this flag when the derived allele is known: for VCF
    /// input, the alternative allele is taken as derived.
    #[arg(long)]
    pub unfolded: bool,

    /// Number of threads.
    ///
    /// Multi-threading only affects reading BGZF-compressed VCF.
    #[arg(short = 't', long, default_value_t = NonZeroUsize::new(4).unwrap(), value_name = "INT")]
    pub threads: NonZeroUsize,
}

fn parse_key_val(s: &str) -> Result<(String, Option<String>), clap::Error> {
    Ok(s.split_once('=')
        .map(|(key, val)| (key.to_string(), Some(val.to_string())))
        .unwrap_or_else(|| (s.to_string(), None)))
}

impl TableArgs {
    /// Reads the input into a table of sites.
    pub fn read_table(&self) -> Result<SnpTable, Error> {
        let input = Input::new(self.input.clone())?;

        let table = if self.snps {
            let populations = self.populations.as_deref();

            match input.as_path() {
                Some(path) => SnpTable::read_dadi_from_path(path, populations),
                None => SnpTable::read_dadi(&mut io::stdin().lock(), populations),
            }
            .with_context(|| format!("Failed to read dadi SNP data from {input}"))?
        } else {
            let description = input.to_string();
            let reader = input::genotype::reader::Builder::default()
                .set_input(input)
                .set_threads(self.threads)
                .build()
                .with_context(|| format!("Failed to open VCF {description}"))?;

            let samples = match (&self.samples, &self.samples_file) {
                (Some(list), None) => Some(site::reader::builder::Samples::List(
                    list.iter()
                        .map(|(sample, population)| {
                            (
                                input::Sample::from(sample.as_str()),
                                input::sample::Population::from(population.as_deref()),
                            )
                        })
                        .collect(),
                )),
                (None, Some(path)) => Some(site::reader::builder::Samples::Path(path.clone())),
                (None, None) => None,
                (Some(_), Some(_)) => unreachable!("checked by clap"),
            };

            let mut reader = site::reader::Builder::default()
                .set_samples(samples)
                .set_populations(self.populations.clone())
                .build(reader)?;

            SnpTable::from_site_reader(&mut reader)
                .with_context(|| format!("Failed to read VCF {description}"))?
        };

        log::info!(
            "Read {} sites in populations {:?}",
            table.len(),
            table.populations()
        );

        Ok(table)
    }

    /// Returns the projected sample sizes for a table.
    pub fn sample_sizes(&self, table: &SnpTable) -> Count {
        match &self.projections {
            Some(projections) => Count::from(projections.clone()),
            None => table.max_sample_sizes(),
        }
    }
}

/// Model and grid arguments, shared by commands that compute expected spectra.
#[derive(Args, Debug, PartialEq)]
pub struct ModelArgs {
    /// Demographic model.
    ///
    /// One of `snm`, `two_epoch`, `growth`, `bottlegrowth`, `three_epoch` for a single
    /// population, or `snm_2d`, `split_mig`, `sym_mig`, `split_asym_mig`, `split_no_mig`,
    /// `iso_inbreeding` for two populations.
    #[arg(short = 'm', long, value_name = "MODEL")]
    pub model: ModelKind,

    /// Grid sizes.
    ///
    /// Comma-separated number of grid points used when integrating the model. The expected
    /// spectrum is extrapolated from these grids to an infinitely fine grid. By default, grids of
    /// 20, 30, and 40 points more than the largest sample size are used.
    #[arg(
        short = 'g',
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_name = "INT,..."
    )]
    pub grids: Option<Vec<usize>>,
}

impl ModelArgs {
    /// Returns the grid sizes for data.
    pub fn grid_sizes(&self, data: &Masked<Counts>) -> Vec<usize> {
        self.grids
            .clone()
            .unwrap_or_else(|| Grid::default_sizes(&data.shape().sample_sizes()))
    }
}

/// Parameter bounds arguments.
#[derive(Args, Debug, PartialEq)]
pub struct BoundsArgs {
    /// Lower parameter bounds.
    ///
    /// Comma-separated lower bound for each model parameter, zero by default. Parameters with a
    /// positive lower bound are optimized on a log scale.
    #[arg(long, use_value_delimiter = true, value_delimiter = ',', value_name = "FLOAT,...")]
    pub lower: Option<Vec<f64>>,

    /// Upper parameter bounds.
    ///
    /// Comma-separated upper bound for each model parameter, unbounded by default.
    #[arg(long, use_value_delimiter = true, value_delimiter = ',', value_name = "FLOAT,...")]
    pub upper: Option<Vec<f64>>,
}

impl BoundsArgs {
    /// Returns the bounds for a number of parameters.
    pub fn bounds(&self, parameters: usize) -> Result<Bounds, Error> {
        let lower = self
            .lower
            .clone()
            .unwrap_or_else(|| vec![0.0; parameters]);
        let upper = self
            .upper
            .clone()
            .unwrap_or_else(|| vec![f64::INFINITY; parameters]);

        Ok(Bounds::new(lower, upper)?)
    }
}

/// Writes a table of optimization replicates.
pub fn write_replicates<W>(
    writer: &mut W,
    names: &[&str],
    replicates: &[Replicate],
    precision: usize,
) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        writer,
        "ll\t{}\ttheta\tchi_squared\taic\tevaluations",
        names.join("\t")
    )?;

    for replicate in replicates {
        write!(writer, "{:.precision$}", replicate.ll)?;
        for p in replicate.params.iter() {
            write!(writer, "\t{p:.precision$}")?;
        }
        writeln!(
            writer,
            "\t{:.precision$}\t{:.precision$}\t{:.precision$}\t{}",
            replicate.theta, replicate.chi_squared, replicate.aic, replicate.evaluations
        )?;
    }

    Ok(())
}
