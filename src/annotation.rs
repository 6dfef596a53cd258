use crate::types::{HashMap, HashMapExt, Strand};
use anyhow::{Context, Result, anyhow};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Half-width of the window written around each whitelisted polyA site.
pub const POLYA_WINDOW: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Gtf,
    GtfGz,
    Gff3,
}

#[derive(Debug, Clone)]
pub struct Exon {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone)]
pub struct Transcript {
    pub id: String,
    pub seqname: String,
    pub strand: Option<Strand>,
    pub exons: Vec<Exon>,
}

impl Transcript {
    /// Transcript end where polyadenylation happens, if the strand is known.
    pub fn three_prime_end(&self) -> Option<u32> {
        match self.strand? {
            Strand::Forward => self.exons.iter().map(|e| e.end).max(),
            Strand::Reverse => self.exons.iter().map(|e| e.start).min(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyASite {
    pub chrom: String,
    pub strand: Strand,
    pub position: u32,
    pub transcript_id: String,
}

/// Sorted, de-duplicated intron boundaries of one chromosome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromBounds {
    pub left: Vec<u32>,
    pub right: Vec<u32>,
}

impl ChromBounds {
    /// Boundaries inside `[start, end]`.
    pub fn restrict(&self, start: u32, end: u32) -> ChromBounds {
        ChromBounds {
            left: slice_range(&self.left, start, end).to_vec(),
            right: slice_range(&self.right, start, end).to_vec(),
        }
    }
}

fn slice_range(sorted: &[u32], start: u32, end: u32) -> &[u32] {
    let lo = sorted.partition_point(|&p| p < start);
    let hi = sorted.partition_point(|&p| p <= end);
    &sorted[lo..hi.max(lo)]
}

/// Annotated splice boundaries per chromosome and the known polyA sites.
#[derive(Debug, Clone, Default)]
pub struct GeneModel {
    pub bounds: HashMap<String, ChromBounds>,
    pub polya_whitelist: Vec<PolyASite>,
}

impl GeneModel {
    pub fn load(path: &Path) -> Result<Self> {
        let transcripts = load_transcripts(path)?;
        Ok(Self::from_transcripts(&transcripts))
    }

    pub fn from_transcripts(transcripts: &[Transcript]) -> Self {
        let mut bounds: HashMap<String, ChromBounds> = HashMap::new();
        let mut polya_whitelist = Vec::new();

        for tx in transcripts {
            let mut exons = tx.exons.clone();
            exons.sort_by_key(|e| (e.start, e.end));
            let entry = bounds.entry(tx.seqname.clone()).or_default();
            for pair in exons.windows(2) {
                // Overlapping exon records carry no intron.
                if pair[1].start <= pair[0].end {
                    continue;
                }
                entry.left.push(pair[0].end);
                entry.right.push(pair[1].start);
            }
            if let (Some(strand), Some(position)) = (tx.strand, tx.three_prime_end()) {
                polya_whitelist.push(PolyASite {
                    chrom: tx.seqname.clone(),
                    strand,
                    position,
                    transcript_id: tx.id.clone(),
                });
            }
        }

        for chrom in bounds.values_mut() {
            chrom.left.sort_unstable();
            chrom.left.dedup();
            chrom.right.sort_unstable();
            chrom.right.dedup();
        }
        polya_whitelist.sort_by(|a, b| {
            (&a.chrom, a.position, &a.transcript_id).cmp(&(&b.chrom, b.position, &b.transcript_id))
        });

        Self { bounds, polya_whitelist }
    }

    /// Annotated boundaries of one locus; empty when the chromosome is unannotated.
    pub fn locus_bounds(&self, chrom: &str, start: u32, end: u32) -> ChromBounds {
        self.bounds
            .get(chrom)
            .map(|b| b.restrict(start, end))
            .unwrap_or_default()
    }

    pub fn site_count(&self) -> usize {
        self.bounds.values().map(|b| b.left.len() + b.right.len()).sum()
    }
}

pub fn detect_format(path: &Path) -> Result<InputFormat> {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if name.ends_with(".gtf.gz") {
        Ok(InputFormat::GtfGz)
    } else if name.ends_with(".gtf") {
        Ok(InputFormat::Gtf)
    } else if name.ends_with(".gff") || name.ends_with(".gff3") {
        Ok(InputFormat::Gff3)
    } else {
        Err(anyhow!("unable to detect annotation format from file name: {}", name))
    }
}

/// Load transcript and exon features from GTF/GFF.
///
/// GTF/GFF are 1-based inclusive; exons are stored 0-based half-open, so
/// `start` drops by one and `end` is kept.
pub fn load_transcripts(path: &Path) -> Result<Vec<Transcript>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    match detect_format(path)? {
        InputFormat::Gtf => load_gtf(BufReader::new(file)),
        InputFormat::GtfGz => load_gtf(BufReader::new(MultiGzDecoder::new(file))),
        InputFormat::Gff3 => load_gff3(BufReader::new(file)),
    }
}

fn load_gtf<R: BufRead>(inner: R) -> Result<Vec<Transcript>> {
    let mut reader = noodles::gtf::io::Reader::new(inner);
    let mut transcripts: HashMap<String, Transcript> = HashMap::new();

    for result in reader.record_bufs() {
        let record = result?;

        let feature_type: &[u8] = record.ty().as_ref();
        if feature_type != b"transcript" && feature_type != b"exon" {
            continue;
        }

        let (start, end) = zero_based(record.start().get(), record.end().get())?;
        let attrs = record.attributes();
        let transcript_id = get_record_buf_attribute(attrs, b"transcript_id")
            .ok_or_else(|| anyhow!("missing transcript_id in GTF attributes"))?;

        let entry = transcripts.entry(transcript_id.clone()).or_insert_with(|| Transcript {
            id: transcript_id,
            seqname: record.reference_sequence_name().to_string(),
            strand: to_strand(record.strand()),
            exons: Vec::new(),
        });

        if feature_type == b"exon" {
            entry.exons.push(Exon { start, end });
        }
    }

    Ok(sorted_transcripts(transcripts))
}

fn load_gff3<R: BufRead>(inner: R) -> Result<Vec<Transcript>> {
    let mut reader = noodles::gff::io::Reader::new(inner);
    let mut transcripts: HashMap<String, Transcript> = HashMap::new();

    for result in reader.record_bufs() {
        let record = result?;

        let feature_type: &[u8] = record.ty().as_ref();
        if feature_type != b"transcript" && feature_type != b"mRNA" && feature_type != b"exon" {
            continue;
        }

        let (start, end) = zero_based(record.start().get(), record.end().get())?;
        let attrs = record.attributes();
        let transcript_id = if feature_type == b"exon" {
            get_record_buf_attribute(attrs, b"Parent")
        } else {
            get_record_buf_attribute(attrs, b"ID")
        }
        .ok_or_else(|| anyhow!("missing transcript id in GFF3 attributes"))?;

        let entry = transcripts.entry(transcript_id.clone()).or_insert_with(|| Transcript {
            id: transcript_id,
            seqname: record.reference_sequence_name().to_string(),
            strand: to_strand(record.strand()),
            exons: Vec::new(),
        });

        if feature_type == b"exon" {
            entry.exons.push(Exon { start, end });
        }
    }

    Ok(sorted_transcripts(transcripts))
}

fn zero_based(start_1: usize, end_1: usize) -> Result<(u32, u32)> {
    let start = u32::try_from(start_1.saturating_sub(1))
        .map_err(|_| anyhow!("feature start out of range"))?;
    let end = u32::try_from(end_1).map_err(|_| anyhow!("feature end out of range"))?;
    Ok((start, end))
}

fn sorted_transcripts(transcripts: HashMap<String, Transcript>) -> Vec<Transcript> {
    let mut out: Vec<Transcript> = transcripts.into_values().collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

fn get_record_buf_attribute(
    attrs: &noodles::gff::feature::record_buf::Attributes,
    key: &[u8],
) -> Option<String> {
    let value = attrs.get(key)?;
    value.iter().next().map(|v| v.to_string())
}

fn to_strand(strand: noodles::gff::feature::record::Strand) -> Option<Strand> {
    use noodles::gff::feature::record::Strand as GffStrand;
    match strand {
        GffStrand::Forward => Some(Strand::Forward),
        GffStrand::Reverse => Some(Strand::Reverse),
        GffStrand::None | GffStrand::Unknown => None,
    }
}
