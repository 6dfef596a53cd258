mod common;

use common::read;
use isodef_rs::DefineConfig;
use isodef_rs::alignment::ReadAlignment;
use isodef_rs::endpoints::{EndpointCluster, cluster_endpoints, resolve_endpoints, resolve_group};
use isodef_rs::junctions::{ChainGroups, Junction, JunctionSignature};
use isodef_rs::types::Strand;

fn chain() -> JunctionSignature {
    JunctionSignature { mono_exon: false, junctions: vec![Junction { left: 1, right: 1 }] }
}

fn config(min_reads: usize) -> DefineConfig {
    DefineConfig {
        minimum_read_count: min_reads,
        upstream_buffer: 10,
        downstream_buffer: 50,
        ..DefineConfig::default()
    }
}

fn spliced(name: &str, start: u32, end: u32, strand: Strand) -> ReadAlignment {
    read(name, &[(start, 2000), (2500, end)], strand)
}

#[test]
fn single_linkage_chains_close_points() {
    let clusters = cluster_endpoints(&[100, 108, 116, 140, 141, 300], 10);
    assert_eq!(
        clusters,
        vec![
            EndpointCluster { start: 100, end: 116 },
            EndpointCluster { start: 140, end: 141 },
            EndpointCluster { start: 300, end: 300 },
        ]
    );
    assert!(cluster_endpoints(&[], 10).is_empty());
}

#[test]
fn clustering_ignores_input_order_and_is_idempotent() {
    let points = [300, 116, 100, 141, 108, 140];
    let clusters = cluster_endpoints(&points, 10);
    let mut sorted = points;
    sorted.sort();
    assert_eq!(clusters, cluster_endpoints(&sorted, 10));

    let bounds: Vec<u32> = clusters.iter().flat_map(|c| [c.start, c.end]).collect();
    assert_eq!(cluster_endpoints(&bounds, 10), clusters);
}

#[test]
fn distinct_end_clusters_split_a_chain() {
    let mut reads: Vec<ReadAlignment> = (0..4).map(|i| spliced(&format!("a{i}"), 1000 + i, 3000, Strand::Forward)).collect();
    reads.extend((0..3).map(|i| spliced(&format!("b{i}"), 1000, 3500 + i, Strand::Forward)));

    let candidates = resolve_group(&chain(), reads, &config(3));
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].key.start, EndpointCluster { start: 1000, end: 1003 });
    assert_eq!(candidates[0].key.end, EndpointCluster { start: 3000, end: 3000 });
    assert_eq!(candidates[0].reads.len(), 4);
    assert_eq!(candidates[1].key.end, EndpointCluster { start: 3500, end: 3502 });
    assert_eq!(candidates[1].read_names(), ["b0", "b1", "b2"]);
}

#[test]
fn sparse_combinations_are_dropped() {
    let mut reads: Vec<ReadAlignment> = (0..3).map(|i| spliced(&format!("a{i}"), 1000, 3000, Strand::Forward)).collect();
    reads.push(spliced("lonely", 1400, 3000, Strand::Forward));

    let candidates = resolve_group(&chain(), reads, &config(3));
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].read_names(), ["a0", "a1", "a2"]);
}

#[test]
fn raising_minimum_never_adds_candidates() {
    let mut reads = Vec::new();
    for (group, n) in [(0u32, 2usize), (1, 3), (2, 5), (3, 8)] {
        for i in 0..n {
            reads.push(spliced(&format!("g{group}r{i}"), 1000 + group * 100, 3000, Strand::Forward));
        }
    }

    let mut previous: Option<Vec<_>> = None;
    for min in 1..=9 {
        let keys: Vec<_> = resolve_group(&chain(), reads.clone(), &config(min))
            .into_iter()
            .map(|c| c.key)
            .collect();
        if let Some(prev) = &previous {
            assert!(keys.iter().all(|k| prev.contains(k)), "minimum {min} produced a new candidate");
        }
        previous = Some(keys);
    }
    assert_eq!(previous.map(|k| k.len()), Some(0));
}

#[test]
fn reverse_reads_take_five_prime_end_from_the_right() {
    let reads: Vec<ReadAlignment> = (0..3).map(|i| spliced(&format!("r{i}"), 1000, 3000 + i * 5, Strand::Reverse)).collect();
    let candidates = resolve_group(&chain(), reads, &config(3));
    assert_eq!(candidates.len(), 1);
    let key = &candidates[0].key;
    assert_eq!(key.strand, Strand::Reverse);
    assert_eq!(key.start, EndpointCluster { start: 3000, end: 3010 });
    assert_eq!(key.end, EndpointCluster { start: 1000, end: 1000 });
}

#[test]
fn strands_never_share_a_candidate() {
    let mut reads: Vec<ReadAlignment> = (0..3).map(|i| spliced(&format!("f{i}"), 1000, 3000, Strand::Forward)).collect();
    reads.extend((0..3).map(|i| spliced(&format!("r{i}"), 1000, 3000, Strand::Reverse)));
    let candidates = resolve_group(&chain(), reads, &config(3));
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|c| c.reads.iter().all(|r| r.strand == c.key.strand)));
}

#[test]
fn locus_candidates_include_mono_group() {
    let mut groups = ChainGroups::default();
    groups
        .spliced
        .insert(chain(), (0..3).map(|i| spliced(&format!("s{i}"), 1000, 3000, Strand::Forward)).collect());
    groups.mono = (0..3).map(|i| read(&format!("m{i}"), &[(5000, 6000 + i)], Strand::Forward)).collect();

    let candidates = resolve_endpoints(groups, &config(3));
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().any(|c| c.key.signature.mono_exon && c.reads.len() == 3));
    let mut sorted = candidates.clone();
    sorted.sort_by(|a, b| a.key.cmp(&b.key));
    let keys: Vec<_> = candidates.iter().map(|c| &c.key).collect();
    let sorted_keys: Vec<_> = sorted.iter().map(|c| &c.key).collect();
    assert_eq!(keys, sorted_keys);
}
