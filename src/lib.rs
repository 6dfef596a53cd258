//! isodef-rs: define transcript isoforms from long-read spliced alignments.
//!
//! Each locus runs the same pipeline: splice-site clustering, junction-chain
//! assignment, endpoint clustering and consensus. [`scheduler::LocusScheduler`]
//! fans loci out over worker threads and retries stalled ones sequentially.
//!
//! # Library usage
//!
//! ```no_run
//! use isodef_rs::{DefineConfig, LocusProcessor, LocusScheduler};
//! use isodef_rs::annotation::GeneModel;
//! use isodef_rs::consensus::Abpoa;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Arc::new(DefineConfig::default());
//! let model = Arc::new(GeneModel::load("genes.gtf".as_ref())?);
//! let processor = LocusProcessor::new(config.clone(), model, None, Arc::new(Abpoa::resolve(None)));
//! let loci = isodef_rs::locus::discover("tmp_SS".as_ref())?;
//! let (outputs, report) = LocusScheduler::new(4, config.poll_interval).run(Arc::new(processor), loci);
//! # let _ = (outputs, report);
//! # Ok(())
//! # }
//! ```

pub mod alignment;
pub mod annotation;
pub mod cli;
pub mod config;
pub mod consensus;
pub mod endpoints;
pub mod fasta;
pub mod junctions;
pub mod locus;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod scheduler;
pub mod splice_sites;
pub mod types;

// Flat re-exports for the most commonly used public types.
pub use config::DefineConfig;
pub use processor::{LocusOutput, LocusProcessor};
pub use scheduler::{LocusProcess, LocusScheduler, ScheduleReport};
