use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Genomic interval naming one locus file, written `chrom~start~end`.
///
/// Ordering is by chromosome name, then numeric start, then end, which is the
/// order loci are retried and reported in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocusId {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
}

impl LocusId {
    pub fn new(chrom: impl Into<String>, start: u32, end: u32) -> Self {
        Self { chrom: chrom.into(), start, end }
    }
}

impl FromStr for LocusId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // Chromosome names may themselves contain '~'; coordinates never do.
        let mut parts = s.rsplitn(3, '~');
        let (Some(end), Some(start), Some(chrom)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(anyhow!("locus id {s:?} is not chrom~start~end"));
        };
        if chrom.is_empty() {
            return Err(anyhow!("locus id {s:?} has an empty chromosome"));
        }
        let start: u32 = start
            .parse()
            .with_context(|| format!("locus id {s:?}: bad start"))?;
        let end: u32 = end.parse().with_context(|| format!("locus id {s:?}: bad end"))?;
        if end < start {
            return Err(anyhow!("locus id {s:?}: end before start"));
        }
        Ok(Self::new(chrom, start, end))
    }
}

impl fmt::Display for LocusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}~{}", self.chrom, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocusFormat {
    Psl,
    Bam,
}

impl LocusFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("psl") => Some(LocusFormat::Psl),
            Some("bam") => Some(LocusFormat::Bam),
            _ => None,
        }
    }
}

/// One locus file produced by the upstream partitioner.
#[derive(Debug, Clone)]
pub struct Locus {
    pub id: LocusId,
    pub path: PathBuf,
    pub format: LocusFormat,
}

impl Locus {
    pub fn from_path(path: &Path) -> Result<Self> {
        let format = LocusFormat::from_path(path)
            .ok_or_else(|| anyhow!("{} is not a .psl or .bam locus file", path.display()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("{} has no file stem", path.display()))?;
        Ok(Self { id: stem.parse()?, path: path.to_path_buf(), format })
    }
}

/// List the locus files in `dir`, sorted by locus order.
pub fn discover(dir: &Path) -> Result<Vec<Locus>> {
    let mut loci = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading locus directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || LocusFormat::from_path(&path).is_none() {
            continue;
        }
        match Locus::from_path(&path) {
            Ok(locus) => loci.push(locus),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping locus file"),
        }
    }
    loci.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(loci)
}
