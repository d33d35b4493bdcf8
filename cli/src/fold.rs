use std::path::PathBuf;

use anyhow::Error;

use clap::Parser;

use crate::utils::read_spectrum;

/// Fold spectrum.
///
/// Entries with a total allele count above half the total sample size are added onto their
/// complement and masked. Folding an already folded spectrum leaves it unchanged.
#[derive(Debug, Parser)]
pub struct Fold {
    /// Input spectrum.
    ///
    /// The input spectrum can be provided here or read from stdin in dadi or plain text format.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Output spectrum path.
    ///
    /// If no path is given, the spectrum will be output to stdout.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Precision to use when printing spectrum.
    #[arg(short = 'p', long, default_value_t = 6, value_name = "INT")]
    pub precision: usize,
}

impl Fold {
    pub fn run(self) -> Result<(), Error> {
        let spectrum = read_spectrum(self.path)?;

        if spectrum.is_folded() {
            log::warn!("Input spectrum is already folded");
        }

        demofit_core::spectrum::io::write::Builder::default()
            .set_precision(self.precision)
            .write_to_path_or_stdout(self.output, &spectrum.fold())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tests::parse_subcmd;

    #[test]
    fn test_parse_fold() {
        let args = parse_subcmd::<Fold>("demofit fold -p 2 -o folded.fs input.fs");

        assert_eq!(args.path, Some(PathBuf::from("input.fs")));
        assert_eq!(args.output, Some(PathBuf::from("folded.fs")));
        assert_eq!(args.precision, 2);
    }

    #[test]
    fn test_parse_fold_stdin() {
        let args = parse_subcmd::<Fold>("demofit fold");

        assert_eq!(args.path, None);
        assert_eq!(args.precision, 6);
    }
}
