use crate::fasta::revcomp;
use crate::locus::{Locus, LocusFormat};
use crate::types::Strand;
use anyhow::{Context, Result, anyhow};
use noodles::bam;
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;
use noodles::sam::alignment::record::data::field::{Tag, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Aligned block on the reference, 0-based half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment {
    pub start: u32,
    pub end: u32,
}

/// One read of a locus file.
#[derive(Debug, Clone)]
pub struct ReadAlignment {
    pub name: String,
    pub chrom: String,
    pub blocks: Vec<Segment>,
    pub strand: Strand,
    /// Read sequence in transcript orientation; empty when the file carries none.
    pub sequence: Vec<u8>,
}

impl ReadAlignment {
    /// Blocks sorted by position, with gaps shorter than `min_intron` closed.
    ///
    /// Abutting blocks always merge, so an intron is never empty.
    pub fn canonical_blocks(&self, min_intron: u32) -> Vec<Segment> {
        let min_gap = min_intron.max(1);
        let mut sorted = self.blocks.clone();
        sorted.sort_unstable();
        let mut merged: Vec<Segment> = Vec::with_capacity(sorted.len());
        for seg in sorted {
            match merged.last_mut() {
                Some(prev) if seg.start < prev.end.saturating_add(min_gap) => {
                    prev.end = prev.end.max(seg.end);
                }
                _ => merged.push(seg),
            }
        }
        merged
    }

    /// Introns as (left boundary, right boundary): first intron base and first
    /// base of the following block.
    pub fn introns(&self, min_intron: u32) -> Vec<(u32, u32)> {
        self.canonical_blocks(min_intron)
            .windows(2)
            .map(|pair| (pair[0].end, pair[1].start))
            .collect()
    }

    pub fn span(&self) -> Option<(u32, u32)> {
        let start = self.blocks.iter().map(|b| b.start).min()?;
        let end = self.blocks.iter().map(|b| b.end).max()?;
        Some((start, end))
    }

    /// (5' end, 3' end) in genomic coordinates.
    pub fn endpoints(&self) -> Option<(u32, u32)> {
        let (start, end) = self.span()?;
        Some(match self.strand {
            Strand::Forward => (start, end),
            Strand::Reverse => (end, start),
        })
    }
}

pub fn load_reads(locus: &Locus) -> Result<Vec<ReadAlignment>> {
    match locus.format {
        LocusFormat::Psl => read_psl(&locus.path),
        LocusFormat::Bam => read_bam(&locus.path),
    }
    .with_context(|| format!("loading reads of locus {}", locus.id))
}

// PSL columns used; column 22 (index 21) is the read sequence.
const PSL_STRAND: usize = 8;
const PSL_QNAME: usize = 9;
const PSL_TNAME: usize = 13;
const PSL_BLOCK_SIZES: usize = 18;
const PSL_T_STARTS: usize = 20;
const PSL_SEQUENCE: usize = 21;

pub fn read_psl(path: &Path) -> Result<Vec<ReadAlignment>> {
    let reader = BufReader::new(File::open(path)?);
    let mut reads = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let read = parse_psl_line(&line)
            .with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
        reads.push(read);
    }
    Ok(reads)
}

pub fn parse_psl_line(line: &str) -> Result<ReadAlignment> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() <= PSL_T_STARTS {
        return Err(anyhow!("PSL row has {} columns, expected at least 21", fields.len()));
    }
    let strand = fields[PSL_STRAND]
        .chars()
        .next()
        .and_then(Strand::from_char)
        .ok_or_else(|| anyhow!("bad PSL strand {:?}", fields[PSL_STRAND]))?;
    let sizes = parse_psl_list(fields[PSL_BLOCK_SIZES])?;
    let starts = parse_psl_list(fields[PSL_T_STARTS])?;
    if sizes.len() != starts.len() {
        return Err(anyhow!("PSL blockSizes and tStarts differ in length"));
    }
    let blocks = starts
        .iter()
        .zip(&sizes)
        .filter(|&(_, &size)| size > 0)
        .map(|(&start, &size)| Segment { start, end: start.saturating_add(size) })
        .collect();
    let sequence = fields
        .get(PSL_SEQUENCE)
        .map(|s| s.trim().as_bytes().to_ascii_uppercase())
        .unwrap_or_default();

    Ok(ReadAlignment {
        name: fields[PSL_QNAME].to_string(),
        chrom: fields[PSL_TNAME].to_string(),
        blocks,
        strand,
        sequence,
    })
}

fn parse_psl_list(field: &str) -> Result<Vec<u32>> {
    field
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().map_err(|e| anyhow!("bad PSL number {s:?}: {e}")))
        .collect()
}

pub fn read_bam(path: &Path) -> Result<Vec<ReadAlignment>> {
    let mut reader = bam::io::reader::Builder.build_from_path(path)?;
    let header = reader.read_header()?;
    let mut reads = Vec::new();

    for result in reader.records() {
        let record = result?;
        if record.flags().is_unmapped() || record.flags().is_secondary() {
            continue;
        }
        let Some(ref_id) = record.reference_sequence_id().transpose()? else {
            continue;
        };
        let chrom = header
            .reference_sequences()
            .get_index(ref_id)
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| anyhow!("reference id {ref_id} missing from BAM header"))?;
        let blocks = extract_blocks(&record)?;
        if blocks.is_empty() {
            continue;
        }
        let is_reverse = record.flags().is_reverse_complemented();
        let mut sequence: Vec<u8> = record.sequence().iter().collect();
        if is_reverse {
            sequence = revcomp(&sequence);
        }

        reads.push(ReadAlignment {
            name: record.name().map(|n| n.to_string()).unwrap_or_default(),
            chrom,
            blocks,
            strand: splice_strand(&record, is_reverse),
            sequence,
        });
    }
    Ok(reads)
}

/// Extract aligned blocks from a spliced alignment.
///
/// CIGAR `N` operations split blocks; `D` stays inside the current block.
pub fn extract_blocks(record: &bam::Record) -> Result<Vec<Segment>> {
    let Some(start) = record.alignment_start().transpose()? else {
        return Ok(Vec::new());
    };
    // Position is 1-based.
    let mut ref_pos = (start.get() - 1) as u32;
    let mut block_start = ref_pos;
    let mut blocks = Vec::new();

    for op in record.cigar().iter() {
        let op = op?;
        let len = op.len() as u32;
        match op.kind() {
            CigarKind::Match
            | CigarKind::SequenceMatch
            | CigarKind::SequenceMismatch
            | CigarKind::Deletion => {
                ref_pos = ref_pos.saturating_add(len);
            }
            CigarKind::Skip => {
                if ref_pos > block_start {
                    blocks.push(Segment { start: block_start, end: ref_pos });
                }
                ref_pos = ref_pos.saturating_add(len);
                block_start = ref_pos;
            }
            // Non-reference-consuming: Insertion, SoftClip, HardClip, Pad
            _ => {}
        }
    }

    if ref_pos > block_start {
        blocks.push(Segment { start: block_start, end: ref_pos });
    }
    Ok(blocks)
}

/// Transcript strand from the `ts` or `XS` tag, falling back to alignment orientation.
fn splice_strand(record: &bam::Record, is_reverse: bool) -> Strand {
    let xs_tag = Tag::new(b'X', b'S');
    let ts_tag = Tag::new(b't', b's');

    if let Some(strand) = get_char_tag(record, xs_tag).and_then(|c| Strand::from_char(c as char)) {
        return strand;
    }
    // ts is relative to the read, so it flips on reverse alignments.
    if let Some(strand) = get_char_tag(record, ts_tag).and_then(|c| Strand::from_char(c as char)) {
        return match (strand, is_reverse) {
            (Strand::Forward, true) => Strand::Reverse,
            (Strand::Reverse, true) => Strand::Forward,
            (s, false) => s,
        };
    }
    if is_reverse { Strand::Reverse } else { Strand::Forward }
}

fn get_char_tag(record: &bam::Record, tag: Tag) -> Option<u8> {
    let data = record.data();
    let value = data.get(&tag)?;
    let value = value.ok()?;
    match value {
        Value::Character(c) => Some(c),
        Value::String(s) => s.first().copied(),
        _ => None,
    }
}
