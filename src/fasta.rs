use crate::types::{HashMap, HashMapExt, Side};
use anyhow::Result;
use needletail::parse_fastx_file;
use std::path::Path;

/// Genome sequences, used only to check splice motifs at novel peaks.
#[derive(Debug, Default)]
pub struct FastaDb {
    seqs: HashMap<String, Vec<u8>>,
}

impl FastaDb {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = parse_fastx_file(path)
            .map_err(|e| anyhow::anyhow!("failed to open FASTA {}: {}", path.display(), e))?;
        let mut seqs: HashMap<String, Vec<u8>> = HashMap::new();

        while let Some(result) = reader.next() {
            let record = result
                .map_err(|e| anyhow::anyhow!("failed to parse FASTA record: {}", e))?;
            // Header up to the first whitespace is the sequence name.
            let id = std::str::from_utf8(record.id()).unwrap_or("");
            let name = id.split_whitespace().next().unwrap_or("").to_string();
            let seq = record.seq().to_ascii_uppercase();
            seqs.insert(name, seq);
        }

        Ok(Self { seqs })
    }

    pub fn from_sequences<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let mut seqs = HashMap::new();
        for (name, seq) in entries {
            seqs.insert(name.into(), seq.to_ascii_uppercase());
        }
        Self { seqs }
    }

    /// 0-based, half-open slice of one sequence.
    pub fn get_slice(&self, seqname: &str, start: u32, end: u32) -> Option<&[u8]> {
        let seq = self.seqs.get(seqname)?;
        let (s, e) = (start as usize, end as usize);
        if s <= e && e <= seq.len() { Some(&seq[s..e]) } else { None }
    }

    /// Whether the two intronic bases next to a boundary match one half of
    /// any motif, on either strand.
    ///
    /// Left boundaries sit on the first intron base, right boundaries one past
    /// the last intron base.
    pub fn supports_motif(&self, chrom: &str, pos: u32, side: Side, motifs: &[String]) -> bool {
        let bases = match side {
            Side::Left => self.get_slice(chrom, pos, pos.saturating_add(2)),
            Side::Right => pos
                .checked_sub(2)
                .and_then(|s| self.get_slice(chrom, s, pos)),
        };
        let Some(bases) = bases else {
            return false;
        };
        motifs.iter().any(|motif| {
            let fwd = motif.as_bytes();
            if fwd.len() != 4 {
                return false;
            }
            let rev = revcomp(fwd);
            match side {
                Side::Left => bases == &fwd[..2] || bases == &rev[..2],
                Side::Right => bases == &fwd[2..] || bases == &rev[2..],
            }
        })
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|b| match b.to_ascii_uppercase() {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            other => other,
        })
        .collect()
}
