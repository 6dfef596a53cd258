use crate::alignment::ReadAlignment;
use crate::config::DefineConfig;
use crate::junctions::{ChainGroups, JunctionSignature};
use crate::types::Strand;
use std::collections::BTreeMap;

/// Range of merged endpoint coordinates, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointCluster {
    pub start: u32,
    pub end: u32,
}

impl EndpointCluster {
    pub fn contains(&self, pos: u32) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// Single-linkage clustering: sorted neighbours no more than `buffer` apart
/// share a cluster.
pub fn cluster_endpoints(points: &[u32], buffer: u32) -> Vec<EndpointCluster> {
    let mut sorted = points.to_vec();
    sorted.sort_unstable();
    let mut clusters: Vec<EndpointCluster> = Vec::new();
    for p in sorted {
        match clusters.last_mut() {
            Some(c) if p - c.end <= buffer => c.end = p,
            _ => clusters.push(EndpointCluster { start: p, end: p }),
        }
    }
    clusters
}

fn find_cluster(clusters: &[EndpointCluster], pos: u32) -> Option<EndpointCluster> {
    let idx = clusters.partition_point(|c| c.end < pos);
    clusters.get(idx).copied().filter(|c| c.contains(pos))
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateKey {
    pub signature: JunctionSignature,
    pub strand: Strand,
    /// 5' end cluster.
    pub start: EndpointCluster,
    /// 3' end cluster.
    pub end: EndpointCluster,
}

/// Reads sharing a junction chain, strand and endpoint clusters.
#[derive(Debug, Clone)]
pub struct IsoformCandidate {
    pub key: CandidateKey,
    pub reads: Vec<ReadAlignment>,
}

impl IsoformCandidate {
    pub fn read_names(&self) -> Vec<String> {
        self.reads.iter().map(|r| r.name.clone()).collect()
    }
}

/// Split one chain group into candidates; combinations under the minimum
/// read count are discarded along with their reads.
pub fn resolve_group(
    signature: &JunctionSignature,
    reads: Vec<ReadAlignment>,
    config: &DefineConfig,
) -> Vec<IsoformCandidate> {
    let mut by_strand: BTreeMap<Strand, Vec<ReadAlignment>> = BTreeMap::new();
    for read in reads {
        by_strand.entry(read.strand).or_default().push(read);
    }

    let mut out = Vec::new();
    for (strand, reads) in by_strand {
        let ends: Vec<(u32, u32)> = reads.iter().filter_map(|r| r.endpoints()).collect();
        let five: Vec<u32> = ends.iter().map(|e| e.0).collect();
        let three: Vec<u32> = ends.iter().map(|e| e.1).collect();
        let five_clusters = cluster_endpoints(&five, config.upstream_buffer);
        let three_clusters = cluster_endpoints(&three, config.downstream_buffer);

        let mut combos: BTreeMap<(EndpointCluster, EndpointCluster), Vec<ReadAlignment>> =
            BTreeMap::new();
        for read in reads {
            let Some((f, t)) = read.endpoints() else {
                continue;
            };
            let (Some(fc), Some(tc)) =
                (find_cluster(&five_clusters, f), find_cluster(&three_clusters, t))
            else {
                continue;
            };
            combos.entry((fc, tc)).or_default().push(read);
        }

        for ((start, end), reads) in combos {
            if reads.len() < config.minimum_read_count {
                continue;
            }
            out.push(IsoformCandidate {
                key: CandidateKey { signature: signature.clone(), strand, start, end },
                reads,
            });
        }
    }
    out
}

/// Candidates of a whole locus, spliced chains first, in key order.
pub fn resolve_endpoints(groups: ChainGroups, config: &DefineConfig) -> Vec<IsoformCandidate> {
    let mut out = Vec::new();
    for (signature, reads) in groups.spliced {
        out.extend(resolve_group(&signature, reads, config));
    }
    out.extend(resolve_group(&JunctionSignature::mono(), groups.mono, config));
    out.sort_by(|a, b| a.key.cmp(&b.key));
    out
}
