//! Readers of genotype calls.

use crate::input::{ReadStatus, Sample};

pub mod builder;
pub use builder::Builder;

pub mod vcf;

use super::Call;

/// A boxed genotype reader.
pub type DynReader = Box<dyn Reader>;

/// A reader of genotype calls for a fixed set of samples, one record at a time.
pub trait Reader {
    /// Returns the contig of the most recently read record.
    fn current_contig(&self) -> &str;

    /// Returns the position of the most recently read record.
    fn current_position(&self) -> usize;

    /// Reads the calls of the next record, in the order of [`Reader::samples`].
    fn read_calls(&mut self) -> ReadStatus<Vec<Call>>;

    /// Returns the samples in the reader.
    fn samples(&self) -> &[Sample];
}
