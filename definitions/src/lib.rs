//! Definitions -- the shared data model for methylation-frequency estimation.
//! Upstream tools pass their outputs to the estimator as these plain serde structures,
//! usually encoded as JSON: the reads reduced to their CpG evidence, and the normalized
//! per-position statistics table named [CpgStats](CpgStats).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Genomic coordinate of a CpG site.
/// It is the unique key into every per-position table.
pub type Position = u64;

/// A single CpG touched by a read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CpgOffset {
    /// 1-based offset from the start of the read. The first CpG of a read
    /// starting at position p with offset 1 sits at p itself.
    pub offset: u64,
    /// Whether the read observed this CpG as methylated.
    pub methylated: bool,
}

impl CpgOffset {
    pub fn new(offset: u64, methylated: bool) -> Self {
        Self { offset, methylated }
    }
}

/// A sequencing read, reduced to the CpG evidence it carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethylRead {
    /// Position of the first base of the read.
    pub start: Position,
    /// CpGs the read touches, in read order.
    pub cpgs: Vec<CpgOffset>,
}

impl MethylRead {
    pub fn new(start: Position, cpgs: Vec<CpgOffset>) -> Self {
        Self { start, cpgs }
    }
    /// Absolute positions the read touches, paired with the methylation call.
    pub fn positions(&self) -> impl Iterator<Item = (Position, bool)> + '_ {
        let start = self.start;
        self.cpgs
            .iter()
            .map(move |c| (start + c.offset - 1, c.methylated))
    }
}

impl std::fmt::Display for MethylRead {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.start)?;
        for c in self.cpgs.iter() {
            match c.methylated {
                true => write!(f, "\t{}M", c.offset)?,
                false => write!(f, "\t{}U", c.offset)?,
            }
        }
        Ok(())
    }
}

/// Normalized statistics at one position, produced by the upstream aggregator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CpgEntry {
    /// Normalized read coverage. Non-negative.
    pub coverage: f64,
    /// Normalized methylated-read count. Non-negative.
    pub methylated: f64,
}

impl CpgEntry {
    pub fn new(coverage: f64, methylated: f64) -> Self {
        Self {
            coverage,
            methylated,
        }
    }
}

/// The normalized Position -> [CpgEntry](CpgEntry) table.
/// Enumeration order is ascending position, independent of insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CpgStats {
    entries: BTreeMap<Position, CpgEntry>,
}

impl CpgStats {
    pub fn new() -> Self {
        Self::default()
    }
    /// Register the entry at the position, replacing any previous one.
    pub fn insert(&mut self, pos: Position, entry: CpgEntry) {
        self.entries.insert(pos, entry);
    }
    pub fn get(&self, pos: Position) -> Option<&CpgEntry> {
        self.entries.get(&pos)
    }
    pub fn contains(&self, pos: Position) -> bool {
        self.entries.contains_key(&pos)
    }
    /// Entries in ascending position order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, CpgEntry)> + '_ {
        self.entries.iter().map(|(&pos, &entry)| (pos, entry))
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
