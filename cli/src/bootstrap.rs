use std::{fs, path::PathBuf};

use anyhow::{Context, Error};

use clap::Parser;

use rand::{rngs::StdRng, SeedableRng};

use demofit_core::bootstrap::{self, DEFAULT_SEED};

use crate::utils::TableArgs;

/// Create bootstrap spectra by resampling genomic chunks.
#[derive(Debug, Parser)]
pub struct Bootstrap {
    #[command(flatten)]
    table: TableArgs,

    /// Output directory.
    ///
    /// The directory is created if it does not exist.
    #[arg(short = 'o', long, value_name = "DIR")]
    output: PathBuf,

    /// Output file prefix.
    ///
    /// Replicates are written to `<DIR>/<PREFIX><i>.fs` for `i` starting from zero.
    #[arg(long, default_value = "bootstrap_", value_name = "STRING")]
    prefix: String,

    /// Number of bootstrap replicates.
    #[arg(short = 'n', long, default_value_t = 100, value_name = "INT")]
    replicates: usize,

    /// Chunk size in base pairs.
    ///
    /// Each contig is split into windows of this size, which are resampled with replacement.
    #[arg(short = 'c', long, default_value_t = 10_000_000, value_name = "INT")]
    chunk_size: usize,

    /// Random seed.
    #[arg(long, default_value_t = DEFAULT_SEED, value_name = "INT")]
    seed: u64,

    /// Output precision.
    #[arg(long, default_value_t = 6, value_name = "INT")]
    precision: usize,
}

impl Bootstrap {
    pub fn run(self) -> Result<(), Error> {
        let table = self.table.read_table()?;
        let sample_sizes = self.table.sample_sizes(&table);

        fs::create_dir_all(&self.output).with_context(|| {
            format!("Failed to create directory '{}'", self.output.display())
        })?;

        let bootstrap = bootstrap::Bootstrap::new(
            &table,
            self.chunk_size,
            sample_sizes,
            self.table.unfolded,
            StdRng::seed_from_u64(self.seed),
        );

        for (i, replicate) in bootstrap.take(self.replicates).enumerate() {
            let replicate = replicate.context("Failed to create bootstrap spectrum")?;
            let path = self.output.join(format!("{}{i}.fs", self.prefix));

            demofit_core::spectrum::io::write::Builder::default()
                .set_precision(self.precision)
                .write_to_path(&path, &replicate)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;

            log::debug!("Wrote bootstrap replicate to '{}'", path.display());
        }

        log::info!(
            "Wrote {} bootstrap replicates to '{}'",
            self.replicates,
            self.output.display()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::error::ErrorKind as ClapErrorKind;

    use crate::tests::{parse_subcmd, try_parse_subcmd};

    #[test]
    fn test_defaults() {
        let args = parse_subcmd::<Bootstrap>("demofit bootstrap -o boots input.vcf");

        assert_eq!(args.replicates, 100);
        assert_eq!(args.chunk_size, 10_000_000);
        assert_eq!(args.seed, 1762);
        assert_eq!(args.prefix, "bootstrap_");
    }

    #[test]
    fn test_output_required() {
        let result = try_parse_subcmd::<Bootstrap>("demofit bootstrap input.vcf");

        assert_eq!(
            result.unwrap_err().kind(),
            ClapErrorKind::MissingRequiredArgument
        );
    }
}
