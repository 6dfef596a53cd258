//! Splice-site clustering for one locus.
//!
//! Annotated intron boundaries are binned first; novel boundaries are then
//! called from read evidence as coverage peaks. Every base claimed by a
//! cluster resolves to that cluster's id in O(1).

use crate::alignment::ReadAlignment;
use crate::annotation::ChromBounds;
use crate::config::DefineConfig;
use crate::fasta::FastaDb;
use crate::types::{ClusterId, HashMap, HashSet, HashSetExt, Origin, Side};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryRecord {
    pub chrom: String,
    /// Cluster center: first annotated position, or the strongest novel peak.
    pub position: u32,
    /// First base claimed by the cluster (inclusive).
    pub start: u32,
    /// Last base claimed by the cluster (inclusive).
    pub end: u32,
    pub side: Side,
    pub origin: Origin,
    pub id: ClusterId,
    /// Reads splicing exactly at `position`; zero for annotated sites.
    pub support: usize,
}

impl BoundaryRecord {
    /// Short label such as `Al3` or `Nr12`.
    pub fn label(&self) -> String {
        format!("{}{}{}", self.origin.as_char(), self.side.as_char(), self.id)
    }
}

/// Per-base read depth over the aligned span of a locus.
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    offset: u32,
    depth: Vec<u32>,
}

impl Coverage {
    fn from_spans(spans: &[(u32, u32)]) -> Self {
        let Some(lo) = spans.iter().map(|s| s.0).min() else {
            return Self::default();
        };
        let hi = spans.iter().map(|s| s.1).max().unwrap_or(lo);
        let mut diff = vec![0i64; (hi - lo) as usize + 1];
        for &(s, e) in spans {
            diff[(s - lo) as usize] += 1;
            diff[(e - lo) as usize] -= 1;
        }
        let mut depth = Vec::with_capacity(diff.len());
        let mut running = 0i64;
        for d in diff {
            running += d;
            depth.push(running.max(0) as u32);
        }
        Self { offset: lo, depth }
    }

    pub fn at(&self, pos: u32) -> u32 {
        pos.checked_sub(self.offset)
            .and_then(|i| self.depth.get(i as usize))
            .copied()
            .unwrap_or(0)
    }
}

/// Splice-end histograms and coverage collected from a locus's reads.
#[derive(Debug, Clone, Default)]
pub struct SpliceEvidence {
    pub left: BTreeMap<u32, usize>,
    pub right: BTreeMap<u32, usize>,
    pub coverage: Coverage,
    pub reads: usize,
}

impl SpliceEvidence {
    pub fn collect(reads: &[ReadAlignment], chrom: &str, min_intron: u32) -> Self {
        let mut left: BTreeMap<u32, usize> = BTreeMap::new();
        let mut right: BTreeMap<u32, usize> = BTreeMap::new();
        let mut spans = Vec::with_capacity(reads.len());

        for read in reads.iter().filter(|r| r.chrom == chrom) {
            let Some(span) = read.span() else {
                continue;
            };
            spans.push(span);
            for (l, r) in read.introns(min_intron) {
                *left.entry(l).or_default() += 1;
                *right.entry(r).or_default() += 1;
            }
        }

        Self {
            left,
            right,
            coverage: Coverage::from_spans(&spans),
            reads: spans.len(),
        }
    }

    fn histogram(&self, side: Side) -> &BTreeMap<u32, usize> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpliceSiteIndex {
    chrom: String,
    records: Vec<BoundaryRecord>,
    left: HashMap<u32, ClusterId>,
    right: HashMap<u32, ClusterId>,
}

impl SpliceSiteIndex {
    pub fn build(
        chrom: &str,
        annotated: &ChromBounds,
        evidence: &SpliceEvidence,
        config: &DefineConfig,
        genome: Option<&FastaDb>,
    ) -> Self {
        let mut index = Self {
            chrom: chrom.to_string(),
            ..Self::default()
        };
        // Annotated ids come first on each side so novel ids never collide with them.
        index.add_annotated(Side::Left, &annotated.left, config.half_width());
        index.add_annotated(Side::Right, &annotated.right, config.half_width());
        index.add_novel(Side::Left, evidence, config, genome);
        index.add_novel(Side::Right, evidence, config, genome);
        index
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn lookup(&self, side: Side, pos: u32) -> Option<ClusterId> {
        self.table(side).get(&pos).copied()
    }

    pub fn records(&self) -> &[BoundaryRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, side: Side, origin: Origin) -> usize {
        self.records
            .iter()
            .filter(|r| r.side == side && r.origin == origin)
            .count()
    }

    fn table(&self, side: Side) -> &HashMap<u32, ClusterId> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn table_mut(&mut self, side: Side) -> &mut HashMap<u32, ClusterId> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn next_id(&self, side: Side) -> ClusterId {
        self.records.iter().filter(|r| r.side == side).count() as ClusterId + 1
    }

    fn add_annotated(&mut self, side: Side, positions: &[u32], half: u32) {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        // (center, first base, last base)
        let mut bins: Vec<(u32, u32, u32)> = Vec::new();
        for pos in sorted {
            let lo = pos.saturating_sub(half);
            let hi = pos.saturating_add(half);
            match bins.last_mut() {
                Some(bin) if lo <= bin.2 => bin.2 = bin.2.max(hi),
                _ => bins.push((pos, lo, hi)),
            }
        }

        for (center, lo, hi) in bins {
            let id = self.next_id(side);
            let table = self.table_mut(side);
            for base in lo..=hi {
                table.insert(base, id);
            }
            self.records.push(BoundaryRecord {
                chrom: self.chrom.clone(),
                position: center,
                start: lo,
                end: hi,
                side,
                origin: Origin::Annotated,
                id,
                support: 0,
            });
        }
    }

    /// Call novel clusters from histogram peaks, strongest first.
    ///
    /// A peak already covered by an annotated or stronger novel cluster folds
    /// into it. Otherwise it claims the unclaimed bases of its own window, so
    /// no cluster extends past its center by more than half the width.
    fn add_novel(
        &mut self,
        side: Side,
        evidence: &SpliceEvidence,
        config: &DefineConfig,
        genome: Option<&FastaDb>,
    ) {
        let half = config.half_width();
        let mut peaks: Vec<(u32, usize)> = evidence
            .histogram(side)
            .iter()
            .filter(|&(_, &count)| count >= config.minimum_read_count)
            .map(|(&pos, &count)| (pos, count))
            .collect();
        // Strongest first; equal counts go to the lower coordinate.
        peaks.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        // Novel clusters under construction: (center, support, claimed bases).
        let mut clusters: Vec<(u32, usize, Vec<u32>)> = Vec::new();
        let mut claimed: HashSet<u32> = HashSet::new();

        for (pos, count) in peaks {
            if self.table(side).contains_key(&pos) || claimed.contains(&pos) {
                continue;
            }
            let depth = evidence.coverage.at(pos).max(1) as f64;
            if (count as f64) / depth < config.cutoff {
                continue;
            }
            if let Some(genome) = genome
                && !genome.supports_motif(&self.chrom, pos, side, &config.junction_motifs)
            {
                continue;
            }

            let lo = pos.saturating_sub(half);
            let hi = pos.saturating_add(half);
            let bases: Vec<u32> = (lo..=hi)
                .filter(|b| !self.table(side).contains_key(b) && !claimed.contains(b))
                .collect();
            claimed.extend(bases.iter().copied());
            clusters.push((pos, count, bases));
        }

        clusters.sort_by_key(|c| c.0);
        for (center, support, bases) in clusters {
            let (Some(&lo), Some(&hi)) = (bases.iter().min(), bases.iter().max()) else {
                continue;
            };
            let id = self.next_id(side);
            let table = self.table_mut(side);
            for base in bases {
                table.insert(base, id);
            }
            self.records.push(BoundaryRecord {
                chrom: self.chrom.clone(),
                position: center,
                start: lo,
                end: hi,
                side,
                origin: Origin::Novel,
                id,
                support,
            });
        }
    }
}
