use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};

use clap::Parser;

use rand::{rngs::StdRng, SeedableRng};

use demofit_core::{
    bootstrap::DEFAULT_SEED,
    inference::{self, anscombe_residuals, Replicate},
    model::Model,
};

use crate::utils::{read_spectrum, write_replicates, BoundsArgs, ModelArgs};

/// Fit a demographic model to a spectrum.
///
/// The model is optimized from randomly perturbed starting parameters a number of times, and
/// the replicates are written to stdout sorted by decreasing log-likelihood.
#[derive(Debug, Parser)]
pub struct Fit {
    /// Input spectrum.
    ///
    /// If no file is provided, stdin will be used. The spectrum may be in dadi or plain text
    /// format.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    #[command(flatten)]
    model: ModelArgs,

    #[command(flatten)]
    bounds: BoundsArgs,

    /// Starting parameters.
    ///
    /// Comma-separated value for each model parameter. Required unless the model has no
    /// parameters.
    #[arg(
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_name = "FLOAT,..."
    )]
    start: Vec<f64>,

    /// Number of optimization replicates.
    #[arg(short = 'n', long, default_value_t = 100, value_name = "INT")]
    replicates: usize,

    /// Perturbation fold of starting parameters.
    ///
    /// Each replicate starts from parameters multiplied by a random factor between
    /// `2^-FOLD` and `2^FOLD`.
    #[arg(long, default_value_t = 1.0, value_name = "FLOAT")]
    fold: f64,

    /// Maximum number of optimizer iterations in each replicate.
    #[arg(long, default_value_t = 400, value_name = "INT")]
    max_iterations: usize,

    /// Random seed.
    #[arg(long, default_value_t = DEFAULT_SEED, value_name = "INT")]
    seed: u64,

    /// Fits file.
    ///
    /// The log-likelihood, parameters, and theta of the best replicate are appended to this
    /// file as a single tab-separated line.
    #[arg(long, value_name = "FILE")]
    fits: Option<PathBuf>,

    /// Model spectrum output path.
    ///
    /// The expected spectrum at the best parameters, scaled to the data, is written here in
    /// dadi format.
    #[arg(long, value_name = "FILE")]
    model_output: Option<PathBuf>,

    /// Residual spectrum output path.
    ///
    /// The Anscombe residuals of the data given the best model are written here in dadi format.
    #[arg(long, value_name = "FILE")]
    residuals: Option<PathBuf>,

    /// Output precision.
    #[arg(long, default_value_t = 6, value_name = "INT")]
    precision: usize,
}

impl Fit {
    pub fn run(self) -> Result<(), Error> {
        let data = read_spectrum(self.input.clone())?;

        let model = self.model.model;
        let names = model.parameter_names();
        let bounds = self.bounds.bounds(names.len())?;

        let fit = inference::Fit::new(&model, &data, self.model.grid_sizes(&data), bounds)
            .with_context(|| format!("Failed to set up fit of {model} model"))?
            .set_max_iterations(self.max_iterations);

        log::info!(
            "Fitting {model} model on grids {:?} with {} replicates",
            fit.grid_sizes(),
            self.replicates
        );

        if self.start.len() != names.len() {
            anyhow::bail!(
                "{model} model takes {} starting parameters ({}), but {} were provided",
                names.len(),
                names.join(", "),
                self.start.len()
            );
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut replicates = fit
            .replicates(&self.start, self.replicates, self.fold, &mut rng)
            .context("Failed to optimize model")?;
        replicates.sort_by(|a, b| b.ll.total_cmp(&a.ll));

        write_replicates(&mut io::stdout().lock(), names, &replicates, self.precision)?;

        let best = Replicate::best(&replicates)
            .context("No replicate reached a finite log-likelihood")?;
        log::info!("Best log-likelihood {:.4} at {:?}", best.ll, best.params);

        if let Some(path) = &self.fits {
            append_fit(path, best, self.precision)
                .with_context(|| format!("Failed to append fit to '{}'", path.display()))?;
        }

        if self.model_output.is_some() || self.residuals.is_some() {
            let evaluation = fit.evaluate(&best.params)?;

            if let Some(path) = &self.model_output {
                let masked = data.mask_like(evaluation.model.clone())?;

                demofit_core::spectrum::io::write::Builder::default()
                    .set_precision(self.precision)
                    .write_to_path(path, &masked)
                    .with_context(|| format!("Failed to write '{}'", path.display()))?;
            }

            if let Some(path) = &self.residuals {
                let residuals = anscombe_residuals(&evaluation.model, &data);

                demofit_core::spectrum::io::write::Builder::default()
                    .set_precision(self.precision)
                    .write_to_path(path, &residuals)
                    .with_context(|| format!("Failed to write '{}'", path.display()))?;
            }
        }

        Ok(())
    }
}

fn append_fit(path: &Path, replicate: &Replicate, precision: usize) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    write!(file, "{:.precision$}", replicate.ll)?;
    for p in replicate.params.iter() {
        write!(file, "\t{p:.precision$}")?;
    }
    writeln!(file, "\t{:.precision$}", replicate.theta)
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::error::ErrorKind as ClapErrorKind;

    use demofit_core::model::ModelKind;

    use crate::tests::{parse_subcmd, try_parse_subcmd};

    #[test]
    fn test_parse_fit() {
        let args = parse_subcmd::<Fit>(
            "demofit fit -m two_epoch --start 2,0.1 --lower 0.01,0 --upper 100,5 -g 40,50,60 \
             data.fs",
        );

        assert_eq!(args.model.model, ModelKind::TwoEpoch);
        assert_eq!(args.model.grids, Some(vec![40, 50, 60]));
        assert_eq!(args.start, vec![2.0, 0.1]);
        assert_eq!(args.bounds.lower, Some(vec![0.01, 0.0]));
        assert_eq!(args.bounds.upper, Some(vec![100.0, 5.0]));
        assert_eq!(args.replicates, 100);
        assert_eq!(args.input, Some(PathBuf::from("data.fs")));
    }

    #[test]
    fn test_unknown_model() {
        let result = try_parse_subcmd::<Fit>("demofit fit -m island --start 1 data.fs");

        assert_eq!(result.unwrap_err().kind(), ClapErrorKind::ValueValidation);
    }

    #[test]
    fn test_start_defaults_to_empty() {
        let args = parse_subcmd::<Fit>("demofit fit -m snm data.fs");

        assert!(args.start.is_empty());
    }

    #[test]
    fn test_append_fit() {
        let dir = std::env::temp_dir().join("demofit_test_append_fit");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fits.txt");
        let _ = fs::remove_file(&path);

        let replicate = Replicate {
            params: vec![2.0, 0.5],
            ll: -12.5,
            theta: 1000.0,
            chi_squared: 1.0,
            aic: 29.0,
            evaluations: 10,
            converged: true,
        };

        append_fit(&path, &replicate, 1).unwrap();
        append_fit(&path, &replicate, 1).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "-12.5\t2.0\t0.5\t1000.0\n-12.5\t2.0\t0.5\t1000.0\n"
        );

        fs::remove_dir_all(&dir).unwrap();
    }
}
