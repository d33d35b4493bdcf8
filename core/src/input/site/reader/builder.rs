//! Site reader builder.

use std::{collections::HashSet, fmt, io, path::PathBuf};

use crate::input::{
    genotype,
    sample::{self, Population, Sample, SelectError},
};

/// A site reader builder.
#[derive(Debug, Default)]
pub struct Builder {
    samples: Option<Samples>,
    populations: Option<Vec<String>>,
}

impl Builder {
    /// Returns a new reader based on the provided genotype reader.
    ///
    /// # Errors
    ///
    /// If the sample mapping cannot be read, if population selection fails, if no samples remain,
    /// or if the mapping names a sample that the genotype reader does not have.
    pub fn build(self, reader: genotype::reader::DynReader) -> Result<super::Reader, Error> {
        let mut sample_map = match self.samples {
            Some(samples) => samples.into_map()?,
            None => sample::Map::from_all(reader.samples().iter().cloned()),
        };

        if let Some(populations) = &self.populations {
            sample_map = sample_map.select(populations)?;
        }

        if sample_map.is_empty() {
            return Err(Error::NoSamples);
        }

        let available = reader.samples().iter().collect::<HashSet<_>>();
        let unknown = sample_map
            .samples()
            .filter(|sample| !available.contains(sample))
            .map(Sample::to_string)
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(Error::UnknownSamples(unknown));
        }

        for (population, size) in sample_map.populations().zip(sample_map.population_sizes()) {
            log::debug!("Using {size} samples from population {population}");
        }

        Ok(super::Reader::new_unchecked(reader, &sample_map))
    }

    /// Sets the populations to use, in order.
    ///
    /// By default, all populations in the sample mapping are used in the order they appear.
    pub fn set_populations(mut self, populations: Option<Vec<String>>) -> Self {
        self.populations = populations;
        self
    }

    /// Sets the sample mapping used for reading.
    ///
    /// By default, all samples will be mapped to the same, unnamed population.
    pub fn set_samples(mut self, samples: Option<Samples>) -> Self {
        self.samples = samples;
        self
    }
}

/// A source for a sample mapping.
#[derive(Debug)]
pub enum Samples {
    /// A path to a populations file.
    Path(PathBuf),
    /// A list of samples and associated populations.
    List(Vec<(Sample, Population)>),
}

impl Samples {
    fn into_map(self) -> Result<sample::Map, Error> {
        match self {
            Self::List(list) => Ok(list.into_iter().collect()),
            Self::Path(path) => {
                sample::Map::from_path(&path).map_err(|source| Error::SamplesFile { path, source })
            }
        }
    }
}

/// An error associated with building a site reader.
#[derive(Debug)]
pub enum Error {
    /// No samples remain in the sample mapping.
    NoSamples,
    /// The populations file could not be read.
    SamplesFile {
        /// The path of the file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// A population selection error.
    Select(SelectError),
    /// The sample mapping names samples not present in the genotype reader.
    UnknownSamples(Vec<String>),
}

impl From<SelectError> for Error {
    fn from(e: SelectError) -> Self {
        Self::Select(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSamples => f.write_str("no samples selected"),
            Self::SamplesFile { path, source } => {
                write!(f, "failed to read populations file '{}': {source}", path.display())
            }
            Self::Select(e) => write!(f, "{e}"),
            Self::UnknownSamples(samples) => {
                write!(f, "samples not found in input: {}", samples.join(", "))
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SamplesFile { source, .. } => Some(source),
            Self::Select(e) => Some(e),
            Self::NoSamples | Self::UnknownSamples(_) => None,
        }
    }
}
