use crate::annotation::{POLYA_WINDOW, PolyASite};
use crate::processor::LocusOutput;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CONSENSUS_FASTA: &str = "Isoform_Consensi.fasta";
pub const READS_TO_ISOFORMS: &str = "reads2isoforms.txt";
pub const POLYA_WHITELIST_BED: &str = "polyAWhiteList.bed";

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub consensus_fasta: PathBuf,
    pub reads_to_isoforms: PathBuf,
    pub polya_whitelist: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            consensus_fasta: dir.join(CONSENSUS_FASTA),
            reads_to_isoforms: dir.join(READS_TO_ISOFORMS),
            polya_whitelist: dir.join(POLYA_WHITELIST_BED),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputSummary {
    pub isoforms: usize,
    pub reads: usize,
}

/// `Isoform<counter>_<supporting reads>`.
pub fn isoform_name(counter: usize, reads: usize) -> String {
    format!("Isoform{counter}_{reads}")
}

/// Write consensus records and the read mapping; `outputs` must already be
/// in locus order.
pub fn write_isoforms_to<F: Write, M: Write>(
    outputs: &[LocusOutput],
    fasta: &mut F,
    mapping: &mut M,
) -> Result<OutputSummary> {
    let mut summary = OutputSummary::default();
    for locus in outputs {
        for record in &locus.records {
            summary.isoforms += 1;
            let name = isoform_name(summary.isoforms, record.read_names.len());
            writeln!(fasta, ">{name}\n{}", record.sequence)?;
            for read in &record.read_names {
                writeln!(mapping, "{read}\t{name}")?;
                summary.reads += 1;
            }
        }
    }
    Ok(summary)
}

pub fn write_isoforms(outputs: &[LocusOutput], paths: &OutputPaths) -> Result<OutputSummary> {
    let mut fasta = create(&paths.consensus_fasta)?;
    let mut mapping = create(&paths.reads_to_isoforms)?;
    let summary = write_isoforms_to(outputs, &mut fasta, &mut mapping)?;
    fasta.flush()?;
    mapping.flush()?;
    Ok(summary)
}

/// BED6 rows of `POLYA_WINDOW` bases around each whitelisted polyA site.
pub fn write_polya_whitelist_to<W: Write>(sites: &[PolyASite], out: &mut W) -> Result<usize> {
    for site in sites {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t0\t{}",
            site.chrom,
            site.position.saturating_sub(POLYA_WINDOW),
            site.position.saturating_add(POLYA_WINDOW),
            site.transcript_id,
            site.strand,
        )?;
    }
    Ok(sites.len())
}

pub fn write_polya_whitelist(sites: &[PolyASite], path: &Path) -> Result<usize> {
    let mut out = create(path)?;
    let n = write_polya_whitelist_to(sites, &mut out)?;
    out.flush()?;
    Ok(n)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}
