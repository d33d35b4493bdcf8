#![deny(unsafe_code)]

use std::io::Write;

use anyhow::Error;

use clap::{ArgAction, Parser, Subcommand};

mod bootstrap;
use bootstrap::Bootstrap;

mod create;
use create::Create;

mod fit;
use fit::Fit;

mod fold;
use fold::Fold;

mod simulate;
use simulate::Simulate;

mod uncert;
use uncert::Uncert;

pub(crate) mod utils;

const NAME: &str = env!("CARGO_BIN_NAME");

/// Demographic inference from allele frequency spectra.
#[derive(Debug, Parser)]
#[command(name = NAME, version, about, long_about = None, subcommand_required = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Suppress log output.
    ///
    /// By default, warnings are logged to stderr. Set this flag to silence all logging.
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log output verbosity.
    ///
    /// Set this flag once to show progress information, twice to show debug information, and
    /// three times to show trace information.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Print CLI arguments for debugging.
    #[arg(long, hide = true, global = true)]
    debug: bool,
}

impl Cli {
    fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Off;
        }

        [
            log::LevelFilter::Warn,
            log::LevelFilter::Info,
            log::LevelFilter::Debug,
        ]
        .get(usize::from(self.verbose))
        .copied()
        .unwrap_or(log::LevelFilter::Trace)
    }

    pub fn run(self) -> Result<(), Error> {
        if self.debug {
            eprintln!("{self:#?}");
        }

        init_logger(self.log_level());

        self.command.run()
    }
}

fn init_logger(level: log::LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let level = record.level().as_str().to_lowercase();
            writeln!(buf, "[{NAME} {level:>5}] {}", record.args())
        })
        .try_init();

    if let Err(e) = result {
        eprintln!("failed to set up logging: {e}");
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Bootstrap(Bootstrap),
    Create(Create),
    Fit(Fit),
    Fold(Fold),
    Simulate(Simulate),
    Uncert(Uncert),
}

impl Command {
    fn run(self) -> Result<(), Error> {
        match self {
            Command::Bootstrap(bootstrap) => bootstrap.run(),
            Command::Create(create) => create.run(),
            Command::Fit(fit) => fit.run(),
            Command::Fold(fold) => fold.run(),
            Command::Simulate(simulate) => simulate.run(),
            Command::Uncert(uncert) => uncert.run(),
        }
    }
}

macro_rules! impl_try_from_command {
    ($($variant:ident),+) => {
        $(
            impl TryFrom<Command> for $variant {
                type Error = Command;

                fn try_from(command: Command) -> Result<Self, Self::Error> {
                    match command {
                        Command::$variant(args) => Ok(args),
                        _ => Err(command),
                    }
                }
            }
        )+
    };
}

impl_try_from_command!(Bootstrap, Create, Fit, Fold, Simulate, Uncert);

fn main() {
    let cli = Cli::parse();

    match cli.run() {
        Ok(()) => (),
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}
