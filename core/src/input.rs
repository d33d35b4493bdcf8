//! Input for creating spectra from variant data.

use std::{
    env, fmt,
    fs::File,
    io::{self, IsTerminal as _},
    path::{Path, PathBuf},
};

pub mod genotype;
pub use genotype::Genotype;

pub mod sample;
pub use sample::Sample;

pub mod site;
pub use site::Site;

pub mod snps;
pub use snps::SnpTable;

/// The outcome of reading a single record.
#[derive(Debug)]
pub enum ReadStatus<T> {
    /// A record was read.
    Read(T),
    /// Reading failed.
    Error(io::Error),
    /// No records remain.
    Done,
}

/// A source of variant data or spectra.
#[derive(Debug)]
pub enum Input {
    /// A file.
    Path(PathBuf),
    /// Stdin.
    Stdin,
}

impl Input {
    /// Environment variable which disables the check that input comes from exactly one of a path
    /// and stdin.
    ///
    /// Without the check, missing input hangs waiting for stdin. Tests that pipe input set this.
    pub const ENV_KEY_DISABLE_CHECK: &'static str = "DEMOFIT_ALLOW_STDIN";

    /// Creates a new input source.
    ///
    /// # Errors
    ///
    /// Unless the check is disabled, if a path is provided while stdin is redirected, or if no
    /// path is provided while stdin is a terminal.
    pub fn new(input: Option<PathBuf>) -> io::Result<Self> {
        if env::var_os(Self::ENV_KEY_DISABLE_CHECK).is_some() {
            return Ok(Self::new_unchecked(input));
        }

        match (input, io::stdin().is_terminal()) {
            (Some(_), false) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "received input both via file and stdin",
            )),
            (None, true) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "received no input via file or stdin",
            )),
            (input, _) => Ok(Self::new_unchecked(input)),
        }
    }

    /// Creates a new input source without checking that any data is available.
    pub fn new_unchecked(input: Option<PathBuf>) -> Self {
        input.map_or(Self::Stdin, Self::Path)
    }

    /// Opens the input for buffered reading.
    pub fn open(&self) -> io::Result<Reader> {
        match self {
            Input::Path(path) => File::open(path).map(io::BufReader::new).map(Reader::File),
            Input::Stdin => Ok(Reader::Stdin(io::stdin().lock())),
        }
    }

    /// Returns the path, or `None` for stdin.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Input::Path(path) => Some(path.as_ref()),
            Input::Stdin => None,
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Path(path) => write!(f, "'{}'", path.display()),
            Input::Stdin => f.write_str("stdin"),
        }
    }
}

/// A buffered reader over an opened [`Input`].
#[derive(Debug)]
pub enum Reader {
    /// An opened file.
    File(io::BufReader<File>),
    /// Locked stdin.
    Stdin(io::StdinLock<'static>),
}
