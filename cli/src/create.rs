use std::path::PathBuf;

use anyhow::{Context, Error};

use clap::Parser;

use crate::utils::TableArgs;

/// Create spectrum from VCF or dadi SNP data.
#[derive(Debug, Parser)]
pub struct Create {
    #[command(flatten)]
    table: TableArgs,

    /// Output spectrum path.
    ///
    /// The spectrum is written in dadi format. If no path is given, the spectrum will be output
    /// to stdout.
    #[arg(short = 'o', long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Output precision.
    #[arg(long, default_value_t = 6, value_name = "INT")]
    precision: usize,
}

impl Create {
    pub fn run(self) -> Result<(), Error> {
        let table = self.table.read_table()?;
        let sample_sizes = self.table.sample_sizes(&table);

        let spectrum = table
            .spectrum(&sample_sizes, self.table.unfolded)
            .context("Failed to create spectrum")?;

        log::info!(
            "Created spectrum with {} unmasked sites",
            spectrum.sum_unmasked()
        );

        demofit_core::spectrum::io::write::Builder::default()
            .set_precision(self.precision)
            .write_to_path_or_stdout(self.output, &spectrum)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::error::ErrorKind as ClapErrorKind;

    use crate::tests::{parse_subcmd, try_parse_subcmd};

    #[test]
    fn test_samples_and_samples_file_conflict() {
        let result =
            try_parse_subcmd::<Create>("demofit create -s sample0 -S samples.file input.vcf");

        assert_eq!(result.unwrap_err().kind(), ClapErrorKind::ArgumentConflict)
    }

    #[test]
    fn test_snps_and_samples_conflict() {
        let result = try_parse_subcmd::<Create>("demofit create --snps -s sample0 input.txt");

        assert_eq!(result.unwrap_err().kind(), ClapErrorKind::ArgumentConflict)
    }

    #[test]
    fn test_parse_samples() {
        let args =
            parse_subcmd::<Create>("demofit create -s sample0=pop0,sample1,sample2=pop2 input.vcf");

        assert_eq!(
            args.table.samples,
            Some(vec![
                (String::from("sample0"), Some(String::from("pop0"))),
                (String::from("sample1"), None),
                (String::from("sample2"), Some(String::from("pop2"))),
            ])
        );
    }

    #[test]
    fn test_parse_projections_and_populations() {
        let args = parse_subcmd::<Create>(
            "demofit create --snps -P YRI,CEU -p 20,18 --unfolded input.txt",
        );

        assert!(args.table.snps);
        assert!(args.table.unfolded);
        assert_eq!(
            args.table.populations,
            Some(vec![String::from("YRI"), String::from("CEU")])
        );
        assert_eq!(args.table.projections, Some(vec![20, 18]));
    }
}
