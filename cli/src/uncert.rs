use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Error};

use clap::Parser;

use demofit_core::{
    spectrum::{Counts, Masked},
    uncert::{Uncertainty, DEFAULT_STEPS},
};

use crate::utils::{read_spectrum, read_spectrum_from_path, ModelArgs};

/// Estimate parameter uncertainties.
///
/// By default, the Godambe information is computed from the data and bootstrap spectra. A report
/// of standard deviations and 95% confidence intervals is written for each step size.
#[derive(Debug, Parser)]
pub struct Uncert {
    /// Input spectrum.
    ///
    /// If no file is provided, stdin will be used.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Bootstrap spectra.
    ///
    /// Required unless `--fim` is set.
    #[arg(
        short = 'b',
        long,
        num_args = 1..,
        value_name = "FILE",
        required_unless_present = "fim",
        conflicts_with = "fim"
    )]
    bootstraps: Vec<PathBuf>,

    #[command(flatten)]
    model: ModelArgs,

    /// Optimized parameters.
    ///
    /// Comma-separated value for each model parameter. Required unless the model has no
    /// parameters.
    #[arg(
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_name = "FLOAT,..."
    )]
    params: Vec<f64>,

    /// Finite difference step sizes.
    ///
    /// Comma-separated relative step sizes. A report is written for each.
    #[arg(
        long,
        use_value_delimiter = true,
        value_delimiter = ',',
        value_name = "FLOAT,..."
    )]
    steps: Option<Vec<f64>>,

    /// Take derivatives with respect to the logarithm of parameters.
    #[arg(long)]
    log: bool,

    /// Use the Fisher information, ignoring linkage between sites.
    #[arg(long)]
    fim: bool,

    /// Output path.
    ///
    /// If no path is given, the reports will be output to stdout.
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl Uncert {
    pub fn run(self) -> Result<(), Error> {
        let data = read_spectrum(self.input.clone())?;

        let bootstraps = self
            .bootstraps
            .iter()
            .map(read_spectrum_from_path)
            .collect::<Result<Vec<Masked<Counts>>, _>>()?;
        if !self.fim {
            log::info!("Read {} bootstrap spectra", bootstraps.len());
        }

        let model = self.model.model;
        let uncertainty = Uncertainty::new(&model, &data, self.model.grid_sizes(&data))
            .with_context(|| format!("Failed to set up uncertainties of {model} model"))?
            .with_log(self.log);

        let steps = self.steps.clone().unwrap_or_else(|| DEFAULT_STEPS.to_vec());
        let reports = uncertainty
            .report(
                &self.params,
                (!self.fim).then_some(bootstraps.as_slice()),
                &steps,
            )
            .context("Failed to estimate uncertainties")?;

        let mut writer: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(io::BufWriter::new(fs::File::create(path).with_context(
                || format!("Failed to create '{}'", path.display()),
            )?)),
            None => Box::new(io::stdout().lock()),
        };

        for report in reports {
            writeln!(writer, "{report}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::error::ErrorKind as ClapErrorKind;

    use crate::tests::{parse_subcmd, try_parse_subcmd};

    #[test]
    fn test_parse_godambe() {
        let args = parse_subcmd::<Uncert>(
            "demofit uncert -m two_epoch --params 2,0.1 -b boot_0.fs boot_1.fs --log -- data.fs",
        );

        assert_eq!(
            args.bootstraps,
            vec![PathBuf::from("boot_0.fs"), PathBuf::from("boot_1.fs")]
        );
        assert_eq!(args.params, vec![2.0, 0.1]);
        assert!(args.log);
        assert!(!args.fim);
        assert_eq!(args.steps, None);
        assert_eq!(args.input, Some(PathBuf::from("data.fs")));
    }

    #[test]
    fn test_bootstraps_required_without_fim() {
        let result = try_parse_subcmd::<Uncert>("demofit uncert -m two_epoch --params 2,0.1 data.fs");

        assert_eq!(
            result.unwrap_err().kind(),
            ClapErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_fim_and_bootstraps_conflict() {
        let result = try_parse_subcmd::<Uncert>(
            "demofit uncert -m two_epoch --params 2,0.1 --fim -b boot_0.fs -- data.fs",
        );

        assert_eq!(result.unwrap_err().kind(), ClapErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_parse_fim_steps() {
        let args = parse_subcmd::<Uncert>(
            "demofit uncert -m growth --params 2,0.1 --fim --steps 0.01,0.001 data.fs",
        );

        assert!(args.fim);
        assert!(args.bootstraps.is_empty());
        assert_eq!(args.steps, Some(vec![0.01, 0.001]));
    }
}
