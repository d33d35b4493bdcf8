//! In-memory tables of sites.
//!
//! A [`SnpTable`] collects the per-population allele counts of every site along with its
//! genomic location. Spectra are built from the table, and the table can be split into
//! genomic windows for bootstrapping.

use std::{
    fmt, fs,
    io::{self, BufRead as _},
    path::Path,
};

use flate2::bufread::MultiGzDecoder;
use indexmap::IndexSet;

use crate::spectrum::{
    project::{PartialProjection, ProjectionError},
    Count, Counts, Masked, Scs,
};

use super::{genotype, site, ReadStatus, Site};

/// A site in a table along with its location.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Entry {
    contig: usize,
    position: usize,
    site: Site,
}

/// A table of sites with allele counts per population.
///
/// Sites are kept sorted by contig (in order of first appearance) and position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnpTable {
    contigs: IndexSet<String>,
    entries: Vec<Entry>,
    populations: Vec<String>,
}

impl SnpTable {
    /// Returns the number of populations.
    pub fn dimensions(&self) -> usize {
        self.populations.len()
    }

    /// Splits the table into fixed-size genomic windows.
    ///
    /// Each contig is split into windows `[k * size, (k + 1) * size)`. Windows without sites
    /// between the first and last occupied window of a contig are kept as empty chunks.
    pub fn fragment(&self, size: usize) -> Vec<Chunk<'_>> {
        let size = size.max(1);
        let mut chunks = Vec::new();

        let mut rest = &self.entries[..];
        while let Some(first) = rest.first() {
            let contig_len = rest
                .iter()
                .position(|entry| entry.contig != first.contig)
                .unwrap_or(rest.len());
            let (mut contig_entries, next) = rest.split_at(contig_len);
            rest = next;

            let contig = self
                .contigs
                .get_index(first.contig)
                .map(String::as_str)
                .unwrap_or_default();

            let mut window = first.position / size;
            while let Some(head) = contig_entries.first() {
                let end = (window + 1) * size;
                let n = if head.position < end {
                    contig_entries
                        .iter()
                        .position(|entry| entry.position >= end)
                        .unwrap_or(contig_entries.len())
                } else {
                    0
                };

                let (sites, next) = contig_entries.split_at(n);
                chunks.push(Chunk {
                    contig,
                    start: window * size,
                    entries: sites,
                });

                contig_entries = next;
                window += 1;
            }
        }

        log::debug!(
            "Split {} sites into {} chunks of size {size}",
            self.entries.len(),
            chunks.len()
        );

        chunks
    }

    /// Collects all sites in a site reader.
    ///
    /// Skipped sites are warned about once per reason, with a summary at the end.
    pub fn from_site_reader(reader: &mut site::Reader) -> io::Result<Self> {
        let mut contigs = IndexSet::new();
        let mut entries = Vec::new();
        let mut warnings = Warnings::default();

        loop {
            match reader.read_site() {
                ReadStatus::Read(Ok(site)) => {
                    let site = site.clone();
                    let contig = match contigs.get_index_of(reader.current_contig()) {
                        Some(i) => i,
                        None => contigs.insert_full(reader.current_contig().to_string()).0,
                    };

                    entries.push(Entry {
                        contig,
                        position: reader.current_position(),
                        site,
                    });
                }
                ReadStatus::Read(Err(skipped)) => warnings.warn_once(reader, skipped),
                ReadStatus::Error(e) => return Err(e),
                ReadStatus::Done => break,
            }
        }

        warnings.summarize();

        Ok(Self::new_sorted(contigs, entries, reader.population_names()))
    }

    /// Returns the number of sites.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no sites.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the largest number of called alleles at any site, per population.
    pub fn max_sample_sizes(&self) -> Count {
        let mut max = Count::from_zeros(self.dimensions());

        for entry in self.entries.iter() {
            max.max_assign(&entry.site.totals);
        }

        max
    }

    fn new_sorted(
        contigs: IndexSet<String>,
        mut entries: Vec<Entry>,
        populations: Vec<String>,
    ) -> Self {
        entries.sort_by_key(|entry| (entry.contig, entry.position));

        Self {
            contigs,
            entries,
            populations,
        }
    }

    /// Returns the population names, in order.
    pub fn populations(&self) -> &[String] {
        &self.populations
    }

    /// Reads a table in the dadi SNP data format.
    ///
    /// The first line is a header of the form
    /// `Ingroup Outgroup Allele1 <pops...> Allele2 <pops...> Gene Position`, and each further
    /// line gives the ingroup and outgroup trinucleotide context, the two alleles with their
    /// counts in each population, followed by the contig and position of the site. Lines
    /// starting with `#` are ignored.
    ///
    /// The derived allele is the one that differs from the middle base of the outgroup context.
    /// If the outgroup base is unknown, the second allele is taken as derived.
    ///
    /// If `populations` is provided, only those populations are used, in the provided order.
    pub fn read_dadi<R>(reader: &mut R, populations: Option<&[String]>) -> io::Result<Self>
    where
        R: io::BufRead,
    {
        let mut lines = io::BufRead::lines(&mut *reader).filter(|line| {
            !matches!(line, Ok(line) if line.trim().is_empty() || line.starts_with('#'))
        });

        let header = lines
            .next()
            .ok_or_else(|| invalid_data(ParseSnpsError::MissingHeader))??;
        let header = DadiHeader::parse(&header, populations).map_err(invalid_data)?;

        let mut contigs = IndexSet::new();
        let mut entries = Vec::new();

        for (i, line) in lines.enumerate() {
            let line = line?;
            let (contig, position, site) = header
                .parse_row(&line)
                .map_err(|e| invalid_data(e.on_row(i + 1)))?;

            let contig = match contigs.get_index_of(contig) {
                Some(i) => i,
                None => contigs.insert_full(contig.to_string()).0,
            };

            entries.push(Entry {
                contig,
                position,
                site,
            });
        }

        Ok(Self::new_sorted(contigs, entries, header.selected_names()))
    }

    /// Reads a table in the dadi SNP data format from a path.
    ///
    /// Gzip-compressed files are decompressed transparently. See [`SnpTable::read_dadi`] for
    /// details on the format.
    pub fn read_dadi_from_path<P>(path: P, populations: Option<&[String]>) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        const GZIP_MAGIC_NUMBER: [u8; 2] = [0x1f, 0x8b];

        let mut reader = io::BufReader::new(fs::File::open(path)?);

        if reader.fill_buf()?.starts_with(&GZIP_MAGIC_NUMBER) {
            Self::read_dadi(
                &mut io::BufReader::new(MultiGzDecoder::new(reader)),
                populations,
            )
        } else {
            Self::read_dadi(&mut reader, populations)
        }
    }

    /// Returns the spectrum of the table.
    ///
    /// Every site with at least `sample_sizes` called alleles in each population contributes the
    /// hypergeometric projection of its counts down to `sample_sizes`, so that the spectrum has
    /// shape `sample_sizes + 1`. Sites with fewer called alleles are dropped. Unpolarized spectra
    /// are folded.
    pub fn spectrum(
        &self,
        sample_sizes: &Count,
        polarized: bool,
    ) -> Result<Masked<Counts>, ProjectionError> {
        self.spectrum_from_sites(
            self.entries.iter().map(|entry| &entry.site),
            sample_sizes,
            polarized,
        )
    }

    /// Returns the spectrum of a collection of chunks from the table.
    ///
    /// Chunks may occur more than once. See [`SnpTable::spectrum`] for details.
    pub fn spectrum_from_chunks<'a, I>(
        &'a self,
        chunks: I,
        sample_sizes: &Count,
        polarized: bool,
    ) -> Result<Masked<Counts>, ProjectionError>
    where
        I: IntoIterator<Item = &'a Chunk<'a>>,
    {
        let sites = chunks
            .into_iter()
            .flat_map(|chunk| chunk.entries.iter().map(|entry| &entry.site));

        self.spectrum_from_sites(sites, sample_sizes, polarized)
    }

    fn spectrum_from_sites<'a, I>(
        &self,
        sites: I,
        sample_sizes: &Count,
        polarized: bool,
    ) -> Result<Masked<Counts>, ProjectionError>
    where
        I: Iterator<Item = &'a Site>,
    {
        if sample_sizes.dimensions() != self.dimensions() {
            return Err(ProjectionError::UnequalDimensions {
                from: self.dimensions(),
                to: sample_sizes.dimensions(),
            });
        }

        let mut projection = PartialProjection::new_unchecked(sample_sizes.clone());
        let mut scs = Scs::from_zeros(sample_sizes.clone().into_shape());

        let (mut used, mut dropped) = (0, 0);
        for site in sites {
            if site.totals == *sample_sizes {
                scs += &site.counts;
            } else if site.is_projectable_to(sample_sizes) {
                projection
                    .project_unchecked(&site.totals, &site.counts)
                    .add_unchecked(&mut scs);
            } else {
                dropped += 1;
                continue;
            }
            used += 1;
        }

        log::debug!(
            "Built spectrum from {used} sites, dropped {dropped} sites with too few called alleles"
        );

        let masked = scs
            .into_masked()
            .with_populations(Some(self.populations.clone()));

        Ok(if polarized { masked } else { masked.fold() })
    }
}

/// A window of sites from a [`SnpTable`].
#[derive(Clone, Copy, Debug)]
pub struct Chunk<'a> {
    contig: &'a str,
    start: usize,
    entries: &'a [Entry],
}

impl<'a> Chunk<'a> {
    /// Returns the contig of the chunk.
    pub fn contig(&self) -> &'a str {
        self.contig
    }

    /// Returns true if the chunk has no sites.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of sites in the chunk.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the start position of the chunk window.
    pub fn start(&self) -> usize {
        self.start
    }
}

#[derive(Debug)]
struct DadiHeader {
    names: Vec<String>,
    allele2_column: usize,
    selected: Vec<usize>,
}

impl DadiHeader {
    fn parse(line: &str, populations: Option<&[String]>) -> Result<Self, ParseSnpsError> {
        let fields = line.split_ascii_whitespace().collect::<Vec<_>>();

        let allele2_column = fields
            .iter()
            .position(|&field| field == "Allele2")
            .filter(|&i| i >= 3)
            .ok_or_else(|| ParseSnpsError::InvalidHeader(line.to_string()))?;

        let names = fields[3..allele2_column]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();

        let selected = match populations {
            Some(populations) => populations
                .iter()
                .map(|population| {
                    names
                        .iter()
                        .position(|name| name == population)
                        .ok_or_else(|| ParseSnpsError::UnknownPopulation(population.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => (0..names.len()).collect(),
        };

        Ok(Self {
            names,
            allele2_column,
            selected,
        })
    }

    fn parse_row<'a>(&self, line: &'a str) -> Result<(&'a str, usize, Site), ParseSnpsError> {
        let fields = line.split_ascii_whitespace().collect::<Vec<_>>();
        let n = self.names.len();
        let invalid = || ParseSnpsError::InvalidRow {
            number: None,
            row: line.to_string(),
        };

        // Context, outgroup context, allele and counts, allele and counts, contig, position
        if fields.len() < 2 * n + 6 {
            return Err(invalid());
        }

        let outgroup_base = fields[1].chars().nth(1).ok_or_else(invalid)?;
        let allele2 = fields[self.allele2_column];

        let parse_count = |s: &str| s.parse::<usize>().map_err(|_| invalid());

        let mut site = Site::from_zeros(self.selected.len());
        for (dim, &i) in self.selected.iter().enumerate() {
            let allele1_count = parse_count(fields[3 + i])?;
            let allele2_count = parse_count(fields[self.allele2_column + 1 + i])?;

            site.counts[dim] = allele2_count;
            site.totals[dim] = allele1_count + allele2_count;
        }

        if allele2.starts_with(outgroup_base) && outgroup_base != '-' {
            site = site.into_swapped();
        }

        let contig = fields[self.allele2_column + 1 + n];
        let position = fields[self.allele2_column + 2 + n]
            .parse::<usize>()
            .map_err(|_| invalid())?;

        Ok((contig, position, site))
    }

    fn selected_names(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|&i| self.names[i].clone())
            .collect()
    }
}

fn invalid_data(e: ParseSnpsError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// An error associated with parsing the dadi SNP data format.
#[derive(Debug)]
pub enum ParseSnpsError {
    /// The header does not have the expected columns.
    InvalidHeader(String),
    /// A row could not be parsed.
    InvalidRow {
        /// The number of the row among data rows, if known.
        number: Option<usize>,
        /// The row.
        row: String,
    },
    /// The file is empty.
    MissingHeader,
    /// A selected population is not in the header.
    UnknownPopulation(String),
}

impl ParseSnpsError {
    fn on_row(self, number: usize) -> Self {
        match self {
            ParseSnpsError::InvalidRow { row, .. } => ParseSnpsError::InvalidRow {
                number: Some(number),
                row,
            },
            e => e,
        }
    }
}

impl fmt::Display for ParseSnpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseSnpsError::InvalidHeader(header) => {
                write!(f, "failed to parse '{header}' as SNP data header")
            }
            ParseSnpsError::InvalidRow {
                number: Some(number),
                row,
            } => write!(f, "failed to parse SNP data row {number}: '{row}'"),
            ParseSnpsError::InvalidRow { number: None, row } => {
                write!(f, "failed to parse SNP data row '{row}'")
            }
            ParseSnpsError::MissingHeader => f.write_str("missing SNP data header"),
            ParseSnpsError::UnknownPopulation(population) => {
                write!(f, "population '{population}' not found in SNP data header")
            }
        }
    }
}

impl std::error::Error for ParseSnpsError {}

#[derive(Clone, Debug, Default)]
struct Warnings {
    multiallelic: usize,
}

impl Warnings {
    fn warn_once(&mut self, reader: &site::Reader, skipped: genotype::Skipped) {
        if self.multiallelic == 0 {
            let position = reader.current_position();
            let contig = reader.current_contig();
            let reason = skipped.reason();

            log::warn!(
                "Skipping record at position '{contig}:{position}' due to {reason} genotype. \
                This warning will be shown only once, with a summary at the end."
            );
        }

        self.multiallelic += 1;
    }

    fn summarize(&self) {
        if self.multiallelic > 0 {
            let count = self.multiallelic;
            log::warn!("Skipped {count} records due to multiallelic genotypes.");
        }
    }
}
