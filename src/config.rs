use std::time::Duration;

pub const DEFAULT_SPLICE_SITE_WIDTH: u32 = 5;
pub const DEFAULT_CUTOFF: f64 = 0.05;
pub const DEFAULT_MINIMUM_READ_COUNT: usize = 3;
pub const DEFAULT_UPSTREAM_BUFFER: u32 = 10;
pub const DEFAULT_DOWNSTREAM_BUFFER: u32 = 50;
pub const DEFAULT_MIN_INTRON: u32 = 50;
pub const DEFAULT_MAX_CONSENSUS_READS: usize = 200;
pub const DEFAULT_DELAY_SECS: u64 = 1200;
pub const DEFAULT_JUNCTIONS: &str = "GTAG,GCAG,ATAC";

/// Immutable run configuration, shared read-only by every locus invocation.
#[derive(Debug, Clone)]
pub struct DefineConfig {
    /// Width of a splice-site cluster; each site claims `width / 2` bases on either side.
    pub splice_site_width: u32,
    /// Minimum share of local coverage a novel splice peak must carry.
    pub cutoff: f64,
    pub minimum_read_count: usize,
    /// Single-linkage distance for 5' endpoints.
    pub upstream_buffer: u32,
    /// Single-linkage distance for 3' endpoints.
    pub downstream_buffer: u32,
    /// Canonical donor+acceptor motifs, e.g. `GTAG`, uppercase.
    pub junction_motifs: Vec<String>,
    /// Shorter gaps between aligned blocks are deletions.
    pub min_intron: u32,
    pub max_consensus_reads: usize,
    pub threads: usize,
    pub poll_interval: Duration,
}

impl DefineConfig {
    pub fn half_width(&self) -> u32 {
        self.splice_site_width / 2
    }

    pub fn with_junctions(mut self, list: &str) -> Self {
        self.junction_motifs = parse_junctions(list);
        self
    }
}

impl Default for DefineConfig {
    fn default() -> Self {
        Self {
            splice_site_width: DEFAULT_SPLICE_SITE_WIDTH,
            cutoff: DEFAULT_CUTOFF,
            minimum_read_count: DEFAULT_MINIMUM_READ_COUNT,
            upstream_buffer: DEFAULT_UPSTREAM_BUFFER,
            downstream_buffer: DEFAULT_DOWNSTREAM_BUFFER,
            junction_motifs: parse_junctions(DEFAULT_JUNCTIONS),
            min_intron: DEFAULT_MIN_INTRON,
            max_consensus_reads: DEFAULT_MAX_CONSENSUS_READS,
            threads: 1,
            poll_interval: Duration::from_secs(DEFAULT_DELAY_SECS),
        }
    }
}

/// Split a comma list of motifs, dropping anything that is not four bases.
pub fn parse_junctions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|m| m.trim().to_ascii_uppercase())
        .filter(|m| m.len() == 4 && m.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T')))
        .collect()
}
