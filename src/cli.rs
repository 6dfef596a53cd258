use crate::config::{self, DefineConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "isodef-rs",
    about = "Define isoforms and their consensus sequences from per-locus long-read alignments",
    version
)]
pub struct Args {
    /// Output directory
    #[arg(short = 'p', long = "path", value_name = "DIR")]
    pub path: PathBuf,

    /// Directory of `chrom~start~end` locus files [default: <path>/tmp_SS]
    #[arg(short = 'i', long = "infile", value_name = "DIR")]
    pub infile: Option<PathBuf>,

    /// Gene-model annotation (GTF/GTF.GZ/GFF3); `None` for read-derived splice sites only
    #[arg(short = 'g', long = "genome_file", value_name = "GTF")]
    pub genome_file: Option<PathBuf>,

    /// Genome sequence FASTA for splice motif checks (optional)
    #[arg(short = 'S', long = "genome-fasta", value_name = "FASTA")]
    pub genome_fasta: Option<PathBuf>,

    /// Minimum share of local coverage for a novel splice site
    #[arg(short = 'c', long = "cutoff", default_value_t = config::DEFAULT_CUTOFF)]
    pub cutoff: f64,

    /// Splice-site cluster width in bases
    #[arg(short = 'w', long = "splice_site_width", default_value_t = config::DEFAULT_SPLICE_SITE_WIDTH)]
    pub splice_site_width: u32,

    /// Minimum reads supporting a splice site or isoform
    #[arg(short = 'm', long = "minimum_read_count", default_value_t = config::DEFAULT_MINIMUM_READ_COUNT)]
    pub minimum_read_count: usize,

    /// Comma list; a `0` entry disables the polyA whitelist
    #[arg(short = 'W', long = "white_list_polyA", default_value = "1")]
    pub white_list_polya: String,

    /// Number of worker threads
    #[arg(short = 'n', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Canonical splice motifs, donor+acceptor
    #[arg(short = 'j', long = "junctions", default_value = config::DEFAULT_JUNCTIONS)]
    pub junctions: String,

    /// 5' end merge distance
    #[arg(short = 'u', long = "upstream_buffer", default_value_t = config::DEFAULT_UPSTREAM_BUFFER)]
    pub upstream_buffer: u32,

    /// 3' end merge distance
    #[arg(short = 'd', long = "downstream_buffer", default_value_t = config::DEFAULT_DOWNSTREAM_BUFFER)]
    pub downstream_buffer: u32,

    /// abPOA executable
    #[arg(short = 'a', long = "abpoa", value_name = "BIN")]
    pub abpoa: Option<String>,

    /// Seconds between liveness polls of the worker pool
    #[arg(long = "delaytime", default_value_t = config::DEFAULT_DELAY_SECS)]
    pub delaytime: u64,

    /// Shorter alignment gaps are deletions, not introns
    #[arg(long = "min-intron", default_value_t = config::DEFAULT_MIN_INTRON)]
    pub min_intron: u32,

    /// Most reads staged per consensus call
    #[arg(long = "max-consensus-reads", default_value_t = config::DEFAULT_MAX_CONSENSUS_READS)]
    pub max_consensus_reads: usize,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    pub fn to_config(&self) -> DefineConfig {
        DefineConfig {
            splice_site_width: self.splice_site_width,
            cutoff: self.cutoff,
            minimum_read_count: self.minimum_read_count,
            upstream_buffer: self.upstream_buffer,
            downstream_buffer: self.downstream_buffer,
            junction_motifs: config::parse_junctions(&self.junctions),
            min_intron: self.min_intron,
            max_consensus_reads: self.max_consensus_reads,
            threads: self.threads.max(1),
            poll_interval: Duration::from_secs(self.delaytime),
        }
    }

    pub fn loci_dir(&self) -> PathBuf {
        self.infile.clone().unwrap_or_else(|| self.path.join("tmp_SS"))
    }

    /// Annotation path, treating the literal `None` as absent.
    pub fn annotation(&self) -> Option<&PathBuf> {
        self.genome_file
            .as_ref()
            .filter(|p| p.as_os_str() != "None")
    }

    pub fn polya_whitelist_enabled(&self) -> bool {
        !self.white_list_polya.split(',').any(|v| v.trim() == "0")
    }
}
