use crate::alignment::ReadAlignment;
use crate::splice_sites::SpliceSiteIndex;
use crate::types::{ClusterId, Side};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Junction {
    pub left: ClusterId,
    pub right: ClusterId,
}

/// Ordered splice-site clusters a read's introns resolve to.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JunctionSignature {
    pub mono_exon: bool,
    pub junctions: Vec<Junction>,
}

impl JunctionSignature {
    pub fn mono() -> Self {
        Self { mono_exon: true, junctions: Vec::new() }
    }
}

impl fmt::Display for JunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mono_exon {
            return write!(f, "mono");
        }
        for (i, j) in self.junctions.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "l{}-r{}", j.left, j.right)?;
        }
        Ok(())
    }
}

/// Outcome of resolving one read against the splice-site index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadChain {
    Mono,
    Spliced(JunctionSignature),
    /// Introns present, none resolvable.
    Unresolved,
}

/// Resolve a read's introns, walking its blocks in genomic order.
///
/// An intron with an unknown flank is dropped; the rest of the read still counts.
pub fn resolve_chain(read: &ReadAlignment, index: &SpliceSiteIndex, min_intron: u32) -> ReadChain {
    let introns = read.introns(min_intron);
    if introns.is_empty() {
        return ReadChain::Mono;
    }
    let junctions: Vec<Junction> = introns
        .into_iter()
        .filter_map(|(l, r)| {
            Some(Junction {
                left: index.lookup(Side::Left, l)?,
                right: index.lookup(Side::Right, r)?,
            })
        })
        .collect();
    if junctions.is_empty() {
        ReadChain::Unresolved
    } else {
        ReadChain::Spliced(JunctionSignature { mono_exon: false, junctions })
    }
}

/// Reads of one locus grouped by junction chain.
#[derive(Debug, Default)]
pub struct ChainGroups {
    pub spliced: BTreeMap<JunctionSignature, Vec<ReadAlignment>>,
    pub mono: Vec<ReadAlignment>,
    pub unresolved: usize,
}

impl ChainGroups {
    pub fn spliced_reads(&self) -> usize {
        self.spliced.values().map(Vec::len).sum()
    }
}

pub fn assign_chains(
    reads: Vec<ReadAlignment>,
    index: &SpliceSiteIndex,
    min_intron: u32,
) -> ChainGroups {
    let mut groups = ChainGroups::default();
    for read in reads {
        if read.chrom != index.chrom() {
            continue;
        }
        match resolve_chain(&read, index, min_intron) {
            ReadChain::Mono => groups.mono.push(read),
            ReadChain::Spliced(sig) => groups.spliced.entry(sig).or_default().push(read),
            ReadChain::Unresolved => groups.unresolved += 1,
        }
    }
    groups
}
