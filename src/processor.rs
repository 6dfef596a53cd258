use crate::alignment::{self, ReadAlignment};
use crate::annotation::GeneModel;
use crate::config::DefineConfig;
use crate::consensus::{ConsensusBuilder, ConsensusRecord, ConsensusTool};
use crate::endpoints::resolve_endpoints;
use crate::fasta::FastaDb;
use crate::junctions::assign_chains;
use crate::locus::{Locus, LocusId};
use crate::scheduler::LocusProcess;
use crate::splice_sites::{SpliceEvidence, SpliceSiteIndex};
use crate::types::{Origin, Side};
use anyhow::Result;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocusStats {
    pub reads: usize,
    pub annotated_sites: usize,
    pub novel_sites: usize,
    pub spliced_reads: usize,
    pub mono_reads: usize,
    pub unresolved_reads: usize,
    pub candidates: usize,
    pub dropped_candidates: usize,
}

/// Isoform table of one locus.
#[derive(Debug, Clone)]
pub struct LocusOutput {
    pub id: LocusId,
    pub records: Vec<ConsensusRecord>,
    pub stats: LocusStats,
}

/// Runs splice-site clustering, chain assignment, endpoint resolution and
/// consensus for one locus at a time.
#[derive(Clone)]
pub struct LocusProcessor {
    config: Arc<DefineConfig>,
    gene_model: Arc<GeneModel>,
    genome: Option<Arc<FastaDb>>,
    tool: Arc<dyn ConsensusTool>,
}

impl LocusProcessor {
    pub fn new(
        config: Arc<DefineConfig>,
        gene_model: Arc<GeneModel>,
        genome: Option<Arc<FastaDb>>,
        tool: Arc<dyn ConsensusTool>,
    ) -> Self {
        Self { config, gene_model, genome, tool }
    }

    pub fn config(&self) -> &DefineConfig {
        &self.config
    }

    /// Process reads already in memory; `process` loads them from the locus file.
    pub fn process_reads(&self, id: &LocusId, reads: Vec<ReadAlignment>) -> LocusOutput {
        let config = self.config.as_ref();
        let mut stats = LocusStats { reads: reads.len(), ..LocusStats::default() };

        let bounds = self.gene_model.locus_bounds(&id.chrom, id.start, id.end);
        let evidence = SpliceEvidence::collect(&reads, &id.chrom, config.min_intron);
        let index = SpliceSiteIndex::build(
            &id.chrom,
            &bounds,
            &evidence,
            config,
            self.genome.as_deref(),
        );
        stats.annotated_sites =
            index.count(Side::Left, Origin::Annotated) + index.count(Side::Right, Origin::Annotated);
        stats.novel_sites =
            index.count(Side::Left, Origin::Novel) + index.count(Side::Right, Origin::Novel);
        drop(evidence);

        let groups = assign_chains(reads, &index, config.min_intron);
        stats.spliced_reads = groups.spliced_reads();
        stats.mono_reads = groups.mono.len();
        stats.unresolved_reads = groups.unresolved;
        tracing::debug!(
            locus = %id,
            chains = groups.spliced.len(),
            spliced = stats.spliced_reads,
            mono = stats.mono_reads,
            "sorted reads into splice junction chains"
        );

        let candidates = resolve_endpoints(groups, config);
        stats.candidates = candidates.len();

        let builder = ConsensusBuilder::new(self.tool.as_ref(), config.max_consensus_reads);
        let mut records = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            match panic::catch_unwind(AssertUnwindSafe(|| builder.build(candidate))) {
                Ok(Ok(record)) => records.push(record),
                Ok(Err(e)) => {
                    stats.dropped_candidates += 1;
                    tracing::warn!(
                        locus = %id,
                        chain = %candidate.key.signature,
                        reads = candidate.reads.len(),
                        error = %e,
                        "dropping isoform candidate"
                    );
                }
                Err(_) => {
                    stats.dropped_candidates += 1;
                    tracing::warn!(
                        locus = %id,
                        chain = %candidate.key.signature,
                        "consensus panicked, dropping isoform candidate"
                    );
                }
            }
        }

        LocusOutput { id: id.clone(), records, stats }
    }
}

impl LocusProcess for LocusProcessor {
    fn process(&self, locus: &Locus) -> Result<LocusOutput> {
        let reads = alignment::load_reads(locus)?;
        Ok(self.process_reads(&locus.id, reads))
    }
}
