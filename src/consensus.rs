use crate::endpoints::{CandidateKey, IsoformCandidate};
use needletail::parse_fastx_reader;
use std::io::{Cursor, ErrorKind, Write};
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

pub const DEFAULT_ABPOA_BIN: &str = "abpoa";
pub const ABPOA_ENV_BIN: &str = "ISODEF_ABPOA_BIN";

/// Failure to build one candidate's consensus; drops that candidate only.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("no read sequences to build a consensus from")]
    EmptyInput,
    #[error("consensus tool '{executable}' not found")]
    ToolNotFound { executable: String },
    #[error("consensus tool '{executable}' exited with status {status:?}: {stderr}")]
    ToolFailed {
        executable: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("consensus tool returned no sequence")]
    EmptyOutput,
    #[error("staging consensus input: {0}")]
    Io(#[from] std::io::Error),
}

/// A sequence staged for consensus: (read name, bases).
pub type StagedRead<'a> = (&'a str, &'a [u8]);

/// External multiple-sequence consensus engine.
pub trait ConsensusTool: Send + Sync {
    fn consensus(&self, reads: &[StagedRead<'_>]) -> Result<Vec<u8>, ConsensusError>;
}

/// Runs `abpoa <reads.fasta> -r 0` and reads the consensus from stdout.
#[derive(Debug, Clone)]
pub struct Abpoa {
    executable: String,
    scratch_dir: Option<PathBuf>,
}

impl Abpoa {
    pub fn new(executable: impl Into<String>) -> Self {
        Self { executable: executable.into(), scratch_dir: None }
    }

    /// `ISODEF_ABPOA_BIN` when set, otherwise `fallback`, otherwise `abpoa` from `PATH`.
    pub fn resolve(fallback: Option<&str>) -> Self {
        let executable = std::env::var(ABPOA_ENV_BIN)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| fallback.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ABPOA_BIN.to_string());
        Self::new(executable)
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }
}

impl ConsensusTool for Abpoa {
    fn consensus(&self, reads: &[StagedRead<'_>]) -> Result<Vec<u8>, ConsensusError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("isodef_consensus_").suffix(".fasta");
        let mut staged = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        for (name, seq) in reads {
            writeln!(staged, ">{name}")?;
            staged.write_all(seq)?;
            writeln!(staged)?;
        }
        staged.flush()?;

        let output = Command::new(&self.executable)
            .arg(staged.path())
            .args(["-r", "0"])
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ConsensusError::ToolNotFound { executable: self.executable.clone() }
                } else {
                    ConsensusError::Io(e)
                }
            })?;
        if !output.status.success() {
            return Err(ConsensusError::ToolFailed {
                executable: self.executable.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        first_fasta_sequence(&output.stdout).ok_or(ConsensusError::EmptyOutput)
    }
}

/// Sequence of the first record of a FASTA blob.
pub fn first_fasta_sequence(fasta: &[u8]) -> Option<Vec<u8>> {
    let mut reader = parse_fastx_reader(Cursor::new(fasta.to_vec())).ok()?;
    let record = reader.next()?.ok()?;
    let seq = record.seq();
    if seq.is_empty() { None } else { Some(seq.into_owned()) }
}

/// Final output unit of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusRecord {
    pub key: CandidateKey,
    pub sequence: String,
    pub read_names: Vec<String>,
}

/// Stages a candidate's reads for the consensus tool.
pub struct ConsensusBuilder<'a> {
    tool: &'a dyn ConsensusTool,
    max_reads: usize,
}

impl<'a> ConsensusBuilder<'a> {
    pub fn new(tool: &'a dyn ConsensusTool, max_reads: usize) -> Self {
        Self { tool, max_reads: max_reads.max(1) }
    }

    pub fn build(&self, candidate: &IsoformCandidate) -> Result<ConsensusRecord, ConsensusError> {
        let staged: Vec<StagedRead<'_>> = candidate
            .reads
            .iter()
            .filter(|r| !r.sequence.is_empty())
            .take(self.max_reads)
            .map(|r| (r.name.as_str(), r.sequence.as_slice()))
            .collect();

        let sequence = match staged.as_slice() {
            [] => return Err(ConsensusError::EmptyInput),
            [(_, seq)] => seq.to_vec(),
            _ => self.tool.consensus(&staged)?,
        };

        Ok(ConsensusRecord {
            key: candidate.key.clone(),
            sequence: String::from_utf8_lossy(&sequence).into_owned(),
            read_names: candidate.read_names(),
        })
    }
}
