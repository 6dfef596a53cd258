// Shared fixtures for the integration tests.
#![allow(dead_code)]

use isodef_rs::alignment::{ReadAlignment, Segment};
use isodef_rs::consensus::{ConsensusError, ConsensusTool, StagedRead};
use isodef_rs::types::Strand;

pub fn read(name: &str, blocks: &[(u32, u32)], strand: Strand) -> ReadAlignment {
    ReadAlignment {
        name: name.to_string(),
        chrom: "chr1".to_string(),
        blocks: blocks.iter().map(|&(start, end)| Segment { start, end }).collect(),
        strand,
        sequence: format!("ACGT{name}").into_bytes().iter().map(|b| b"ACGT"[(*b % 4) as usize]).collect(),
    }
}

/// `n` forward reads sharing one intron between `left` and `right`.
pub fn spliced_reads(prefix: &str, n: usize, left: u32, right: u32) -> Vec<ReadAlignment> {
    (0..n)
        .map(|i| read(&format!("{prefix}{i}"), &[(left - 500, left), (right, right + 500)], Strand::Forward))
        .collect()
}

/// PSL row with the read sequence as column 22.
pub fn psl_line(r: &ReadAlignment) -> String {
    let mut blocks = r.blocks.clone();
    blocks.sort();
    let sizes: String = blocks.iter().map(|b| format!("{},", b.end - b.start)).collect();
    let starts: String = blocks.iter().map(|b| format!("{},", b.start)).collect();
    let mut q = 0;
    let qstarts: String = blocks
        .iter()
        .map(|b| {
            let s = format!("{q},");
            q += b.end - b.start;
            s
        })
        .collect();
    let t_start = blocks.first().map(|b| b.start).unwrap_or(0);
    let t_end = blocks.last().map(|b| b.end).unwrap_or(0);
    format!(
        "{q}\t0\t0\t0\t0\t0\t{}\t0\t{}\t{}\t{q}\t0\t{q}\t{}\t248956422\t{t_start}\t{t_end}\t{}\t{sizes}\t{qstarts}\t{starts}\t{}",
        blocks.len().saturating_sub(1),
        r.strand,
        r.name,
        r.chrom,
        blocks.len(),
        String::from_utf8_lossy(&r.sequence),
    )
}

/// Returns the first staged sequence, standing in for abPOA.
pub struct FirstReadTool;

impl ConsensusTool for FirstReadTool {
    fn consensus(&self, reads: &[StagedRead<'_>]) -> Result<Vec<u8>, ConsensusError> {
        reads.first().map(|(_, s)| s.to_vec()).ok_or(ConsensusError::EmptyInput)
    }
}

pub struct FailingTool;

impl ConsensusTool for FailingTool {
    fn consensus(&self, _reads: &[StagedRead<'_>]) -> Result<Vec<u8>, ConsensusError> {
        Err(ConsensusError::ToolFailed {
            executable: "abpoa".to_string(),
            status: Some(1),
            stderr: "degenerate input".to_string(),
        })
    }
}
