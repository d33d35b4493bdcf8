//! Samples and their mapping to populations.

use std::{fmt, fs, io, path::Path};

use indexmap::IndexMap;

pub mod population;
pub use population::Population;

/// A sample, identified by name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Sample(String);

impl AsRef<str> for Sample {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Sample {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for Sample {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A mapping from samples to populations.
///
/// Populations are ordered, and the order defines the axes of spectra created using the
/// mapping.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Map {
    samples: IndexMap<Sample, population::Id>,
    populations: population::Map,
}

impl Map {
    /// Creates a mapping where every sample belongs to the same, unnamed population.
    pub fn from_all<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = Sample>,
    {
        Self::from_iter(samples.into_iter().map(|s| (s, Population::Unnamed)))
    }

    /// Creates a mapping from a populations file.
    ///
    /// Each non-empty line not starting with `#` should contain a sample name and a population
    /// name, separated by whitespace. Any further columns are ignored.
    pub fn from_path<P>(path: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        Self::from_reader(&mut io::BufReader::new(fs::File::open(path)?))
    }

    /// Creates a mapping from a reader in the populations file format.
    ///
    /// See [`Map::from_path`] for details on the format.
    pub fn from_reader<R>(reader: &mut R) -> io::Result<Self>
    where
        R: io::BufRead,
    {
        let mut map = Self::default();

        for (i, line) in io::BufRead::lines(&mut *reader).enumerate() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_ascii_whitespace();
            match (fields.next(), fields.next()) {
                (Some(sample), Some(population)) => {
                    map.insert(
                        Sample::from(sample),
                        Population::Named(population.to_string()),
                    );
                }
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "expected sample and population on line {} of populations file",
                            i + 1
                        ),
                    ))
                }
            }
        }

        Ok(map)
    }

    /// Returns the population id of a sample, if the sample is in the mapping.
    pub fn get_population_id(&self, sample: &Sample) -> Option<population::Id> {
        self.samples.get(sample).copied()
    }

    fn insert(&mut self, sample: Sample, population: Population) {
        let id = self.populations.get_or_insert(population);
        self.samples.insert(sample, id);
    }

    /// Returns true if the mapping contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the number of populations.
    pub fn number_of_populations(&self) -> usize {
        self.populations.len()
    }

    /// Returns the populations in order.
    pub fn populations(&self) -> impl Iterator<Item = &Population> {
        self.populations.iter()
    }

    /// Returns the number of samples in each population, in order.
    pub fn population_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.number_of_populations()];
        for id in self.samples.values() {
            sizes[usize::from(*id)] += 1;
        }
        sizes
    }

    /// Returns the samples in the mapping.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.keys()
    }

    /// Returns a new mapping restricted to the named populations.
    ///
    /// Population ids in the new mapping follow the order of `names`, so that the first name
    /// defines the first axis of a spectrum, and so on.
    ///
    /// # Errors
    ///
    /// If a name does not correspond to a population in the mapping, or if a name occurs twice.
    pub fn select<S>(&self, names: &[S]) -> Result<Self, SelectError>
    where
        S: AsRef<str>,
    {
        let mut selected = Self::default();

        for name in names {
            let population = Population::Named(name.as_ref().to_string());

            if self.populations.get(&population).is_none() {
                return Err(SelectError::UnknownPopulation(population));
            }
            if selected.populations.get(&population).is_some() {
                return Err(SelectError::DuplicatePopulation(population));
            }

            selected.populations.insert(population);
        }

        for (sample, id) in self.samples.iter() {
            if let Some(population) = self.populations.get_population(*id) {
                if let Some(new_id) = selected.populations.get(population) {
                    selected.samples.insert(sample.clone(), new_id);
                }
            }
        }

        Ok(selected)
    }
}

impl FromIterator<(Sample, Population)> for Map {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (Sample, Population)>,
    {
        let mut map = Self::default();
        for (sample, population) in iter {
            map.insert(sample, population);
        }
        map
    }
}

/// An error associated with selecting populations from a mapping.
#[derive(Debug, Eq, PartialEq)]
pub enum SelectError {
    /// A population was selected twice.
    DuplicatePopulation(Population),
    /// A selected population does not exist.
    UnknownPopulation(Population),
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::DuplicatePopulation(population) => {
                write!(f, "population '{population}' selected more than once")
            }
            SelectError::UnknownPopulation(population) => {
                write!(f, "population '{population}' not found in sample mapping")
            }
        }
    }
}

impl std::error::Error for SelectError {}
