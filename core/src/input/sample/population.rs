//! Sample populations.

use std::fmt;

use indexmap::IndexSet;

/// A population for a sample.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Population {
    /// Named population.
    Named(String),
    /// Unnamed population.
    Unnamed,
}

impl<S> From<Option<S>> for Population
where
    S: ToString,
{
    fn from(population: Option<S>) -> Self {
        match population {
            Some(population) => Self::Named(population.to_string()),
            None => Self::Unnamed,
        }
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Population::Named(name) => write!(f, "{name}"),
            Population::Unnamed => f.write_str("[unnamed]"),
        }
    }
}

/// A numeric id for a sample population.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Id(pub usize);

impl From<Id> for usize {
    fn from(id: Id) -> Self {
        id.0
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(super) struct Map(IndexSet<Population>);

impl Map {
    pub fn get(&self, population: &Population) -> Option<Id> {
        self.0.get_index_of(population).map(Id)
    }

    pub fn get_or_insert(&mut self, population: Population) -> Id {
        self.get(&population)
            .unwrap_or_else(|| self.insert(population))
    }

    pub fn get_population(&self, id: Id) -> Option<&Population> {
        self.0.get_index(id.0)
    }

    pub fn insert(&mut self, population: Population) -> Id {
        Id(self.0.insert_full(population).0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Population> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert() {
        let mut map = Map::default();

        assert_eq!(map.get_or_insert(Population::from(Some("a"))), Id(0));
        assert_eq!(map.get_or_insert(Population::from(Some("b"))), Id(1));
        assert_eq!(map.get_or_insert(Population::from(Some("a"))), Id(0));
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get_population(Id(1)),
            Some(&Population::Named(String::from("b")))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Population::from(Some("CEU")).to_string(), "CEU");
        assert_eq!(Population::from(None::<&str>).to_string(), "[unnamed]");
    }
}
