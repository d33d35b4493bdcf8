use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Error};

use clap::Parser;

use rand::{rngs::StdRng, Rng, SeedableRng};

use demofit_core::{
    bootstrap::{poisson_sample, DEFAULT_SEED},
    inference::{self, Replicate, Round},
    model::{Grid, Model},
    spectrum::{Counts, Masked, Scs},
};

use crate::utils::{read_spectrum, write_replicates, BoundsArgs, ModelArgs};

const SUMMARY_NAME: &str = "Simulation_Results.txt";

/// Assess goodness of fit by parametric simulation.
///
/// The model is scaled to the data at the given parameters, and spectra are drawn from it by
/// Poisson sampling at the maximum projection sizes. Each simulated spectrum is projected down
/// and folded like the data, and then fitted through successive rounds of optimization
/// replicates. The distribution of fitted log-likelihoods and chi-squared statistics over
/// simulations can be compared to those of the data.
#[derive(Debug, Parser)]
pub struct Simulate {
    /// Input spectrum.
    ///
    /// If no file is provided, stdin will be used. Simulations have the shape, mask, and
    /// folding of the input.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    #[command(flatten)]
    model: ModelArgs,

    #[command(flatten)]
    bounds: BoundsArgs,

    /// Model parameters.
    ///
    /// Comma-separated value for each model parameter. Simulations are drawn at these
    /// parameters, and optimization starts from them. Required unless the model has no
    /// parameters.
    #[arg(
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_name = "FLOAT,..."
    )]
    params: Vec<f64>,

    /// Maximum projection sizes.
    ///
    /// Comma-separated number of chromosomes in each population to simulate at. Simulations are
    /// projected down to the sample sizes of the input before fitting. By default, simulations
    /// are drawn at the sample sizes of the input.
    #[arg(
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_name = "INT,..."
    )]
    max_projections: Option<Vec<usize>>,

    /// Number of simulations.
    #[arg(short = 'n', long, default_value_t = 100, value_name = "INT")]
    simulations: usize,

    /// Number of replicates in each round of optimization.
    #[arg(
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        default_values_t = [20, 30, 50],
        value_name = "INT,..."
    )]
    replicates: Vec<usize>,

    /// Maximum number of optimizer iterations in each round.
    #[arg(
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        default_values_t = [5, 10, 20],
        value_name = "INT,..."
    )]
    max_iterations: Vec<usize>,

    /// Perturbation folds in each round.
    #[arg(
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        default_values_t = [3.0, 2.0, 1.0],
        value_name = "FLOAT,..."
    )]
    folds: Vec<f64>,

    /// Random seed.
    #[arg(long, default_value_t = DEFAULT_SEED, value_name = "INT")]
    seed: u64,

    /// Output directory.
    ///
    /// The replicates of each simulation are written to `<DIR>/simulation_<i>.txt`, and a
    /// summary of the best replicate of each simulation to `<DIR>/Simulation_Results.txt`.
    #[arg(short = 'o', long, value_name = "DIR")]
    output: PathBuf,

    /// Output precision.
    #[arg(long, default_value_t = 6, value_name = "INT")]
    precision: usize,
}

impl Simulate {
    fn rounds(&self) -> Result<Vec<Round>, Error> {
        ensure!(
            self.replicates.len() == self.max_iterations.len()
                && self.replicates.len() == self.folds.len(),
            "Number of rounds differ between replicates ({}), max iterations ({}), and folds ({})",
            self.replicates.len(),
            self.max_iterations.len(),
            self.folds.len(),
        );

        Ok(self
            .replicates
            .iter()
            .zip(&self.max_iterations)
            .zip(&self.folds)
            .map(|((&replicates, &max_iterations), &fold)| {
                Round::new(replicates, max_iterations, fold)
            })
            .collect())
    }

    /// Returns the sample sizes to simulate at.
    fn max_sample_sizes(&self, data: &Masked<Counts>) -> Result<Vec<usize>, Error> {
        let sample_sizes = data.shape().sample_sizes();

        let Some(max) = &self.max_projections else {
            return Ok(sample_sizes);
        };

        ensure!(
            max.len() == sample_sizes.len(),
            "Number of maximum projections ({}) does not match data dimensions ({})",
            max.len(),
            sample_sizes.len(),
        );
        ensure!(
            max.iter().zip(&sample_sizes).all(|(max, n)| max >= n),
            "Maximum projections {max:?} must be at least the data sample sizes {sample_sizes:?}",
        );

        Ok(max.clone())
    }

    pub fn run(self) -> Result<(), Error> {
        let rounds = self.rounds()?;
        let data = read_spectrum(self.input.clone())?;
        let max_sample_sizes = self.max_sample_sizes(&data)?;

        let model = self.model.model;
        let names = model.parameter_names();
        let bounds = self.bounds.bounds(names.len())?;
        let grid_sizes = self.model.grid_sizes(&data);

        let observed = inference::Fit::new(&model, &data, grid_sizes.clone(), bounds.clone())
            .with_context(|| format!("Failed to set up fit of {model} model"))?
            .evaluate(&self.params)
            .context("Failed to evaluate model at parameters")?;
        log::info!(
            "Data log-likelihood {:.4} and chi-squared {:.4} at theta {:.4}",
            observed.ll,
            observed.chi_squared,
            observed.theta
        );

        let max_grid_sizes = self
            .model
            .grids
            .clone()
            .unwrap_or_else(|| Grid::default_sizes(&max_sample_sizes));
        let expected = model
            .expected(&self.params, &max_sample_sizes, &max_grid_sizes)
            .context("Failed to compute model at maximum projections")?
            .scaled(observed.theta);
        log::debug!("Simulating at sample sizes {max_sample_sizes:?}");

        fs::create_dir_all(&self.output).with_context(|| {
            format!("Failed to create directory '{}'", self.output.display())
        })?;

        let summary_path = self.output.join(SUMMARY_NAME);
        let mut summary = BufWriter::new(
            fs::File::create(&summary_path)
                .with_context(|| format!("Failed to create '{}'", summary_path.display()))?,
        );
        write_summary_header(&mut summary, names)?;
        write_summary_row(
            &mut summary,
            &SummaryRow {
                simulation: "data",
                best_replicate: "NA",
                ll: observed.ll,
                theta: observed.theta,
                sfs_sum: data.sum_unmasked(),
                chi_squared: observed.chi_squared,
                params: &observed.params,
            },
            self.precision,
        )?;

        let mut rng = StdRng::seed_from_u64(self.seed);

        for i in 0..self.simulations {
            let simulated = simulate_like(&expected, &data, &mut rng)?;
            let sfs_sum = simulated.sum_unmasked();
            log::info!(
                "Simulation {}/{}: fitting spectrum with {sfs_sum} sites",
                i + 1,
                self.simulations,
            );

            let fit = inference::Fit::new(&model, &simulated, grid_sizes.clone(), bounds.clone())?;
            let replicates = fit
                .rounds(&self.params, &rounds, &mut rng)
                .with_context(|| format!("Failed to optimize simulation {i}"))?;

            let path = self.output.join(format!("simulation_{i}.txt"));
            write_simulation(&path, names, replicates.concat(), self.precision)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;

            match best_of_rounds(&replicates) {
                Some((label, best)) => write_summary_row(
                    &mut summary,
                    &SummaryRow {
                        simulation: &i.to_string(),
                        best_replicate: &label,
                        ll: best.ll,
                        theta: best.theta,
                        sfs_sum,
                        chi_squared: best.chi_squared,
                        params: &best.params,
                    },
                    self.precision,
                )?,
                None => log::warn!("No replicate of simulation {i} reached a finite likelihood"),
            }
        }

        summary.flush()?;
        log::info!("Wrote summary to '{}'", summary_path.display());

        Ok(())
    }
}

/// Draws a spectrum from `expected` and projects and folds it to match `data`.
///
/// The simulated spectrum has the mask, folding, and populations of `data`.
fn simulate_like<R>(
    expected: &Scs,
    data: &Masked<Counts>,
    rng: &mut R,
) -> Result<Masked<Counts>, Error>
where
    R: Rng,
{
    let projected = poisson_sample(expected, rng)
        .into_masked()
        .project(data.shape().clone())
        .context("Failed to project simulated spectrum")?;

    let folded = if data.is_folded() {
        projected.fold()
    } else {
        projected
    };
    let (spectrum, _) = folded.into_parts();

    Ok(data.mask_like(spectrum)?)
}

/// Returns the best replicate with a finite likelihood over all rounds, labelled by round and
/// replicate number.
fn best_of_rounds(rounds: &[Vec<Replicate>]) -> Option<(String, &Replicate)> {
    rounds
        .iter()
        .enumerate()
        .flat_map(|(r, replicates)| {
            replicates
                .iter()
                .enumerate()
                .map(move |(i, replicate)| (r, i, replicate))
        })
        .filter(|(_, _, replicate)| replicate.ll.is_finite())
        .max_by(|(_, _, a), (_, _, b)| a.ll.total_cmp(&b.ll))
        .map(|(r, i, replicate)| (format!("Round_{}_Replicate_{}", r + 1, i + 1), replicate))
}

/// A row of the simulation summary.
struct SummaryRow<'a> {
    simulation: &'a str,
    best_replicate: &'a str,
    ll: f64,
    theta: f64,
    sfs_sum: f64,
    chi_squared: f64,
    params: &'a [f64],
}

fn write_summary_header<W>(writer: &mut W, names: &[&str]) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        writer,
        "Simulation\tBest_Replicate\tll\ttheta\tsfs_sum\tchi_squared\t{}",
        names.join("\t")
    )
}

fn write_summary_row<W>(writer: &mut W, row: &SummaryRow, precision: usize) -> io::Result<()>
where
    W: Write,
{
    write!(
        writer,
        "{}\t{}\t{:.precision$}\t{:.precision$}\t{:.precision$}\t{:.precision$}",
        row.simulation, row.best_replicate, row.ll, row.theta, row.sfs_sum, row.chi_squared
    )?;
    for p in row.params {
        write!(writer, "\t{p:.precision$}")?;
    }
    writeln!(writer)
}

fn write_simulation(
    path: &Path,
    names: &[&str],
    mut replicates: Vec<Replicate>,
    precision: usize,
) -> io::Result<()> {
    replicates.sort_by(|a, b| b.ll.total_cmp(&a.ll));

    let mut writer = BufWriter::new(fs::File::create(path)?);
    write_replicates(&mut writer, names, &replicates, precision)?;
    writer.flush()
}
