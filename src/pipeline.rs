use crate::annotation::{self, GeneModel, PolyASite};
use crate::cli::Args;
use crate::config::DefineConfig;
use crate::consensus::Abpoa;
use crate::fasta::FastaDb;
use crate::locus::{self, Locus};
use crate::output::{self, OutputPaths};
use crate::processor::LocusProcessor;
use crate::scheduler::{LocusProcess, LocusScheduler, ScheduleReport};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Stats {
    pub loci: usize,
    pub isoforms: usize,
    pub assigned_reads: usize,
    pub polya_sites: usize,
    pub schedule: ScheduleReport,
}

pub fn run(args: &Args) -> Result<Stats> {
    let config = Arc::new(args.to_config());
    std::fs::create_dir_all(&args.path)
        .with_context(|| format!("creating output directory {}", args.path.display()))?;

    let gene_model = Arc::new(load_gene_model(args.annotation().map(|p| p.as_path())));
    let genome = match &args.genome_fasta {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading genome sequence for splice motifs");
            Some(Arc::new(FastaDb::load(path)?))
        }
        None => None,
    };

    let loci_dir = args.loci_dir();
    tracing::info!(dir = %loci_dir.display(), "collecting loci");
    let loci = locus::discover(&loci_dir)?;

    let tool = Arc::new(Abpoa::resolve(args.abpoa.as_deref()).with_scratch_dir(&loci_dir));
    tracing::info!(abpoa = tool.executable(), "using abPOA for consensus sequences");
    let processor = Arc::new(LocusProcessor::new(Arc::clone(&config), Arc::clone(&gene_model), genome, tool));

    let whitelist: &[PolyASite] = if args.polya_whitelist_enabled() {
        &gene_model.polya_whitelist
    } else {
        &[]
    };
    run_loci(processor, loci, &config, &args.path, whitelist)
}

/// Schedule every locus, then write all outputs once processing has ended.
pub fn run_loci<P: LocusProcess>(
    processor: Arc<P>,
    loci: Vec<Locus>,
    config: &DefineConfig,
    out_dir: &Path,
    polya_whitelist: &[PolyASite],
) -> Result<Stats> {
    let n_loci = loci.len();
    let scheduler = LocusScheduler::new(config.threads, config.poll_interval);
    let (outputs, schedule) = scheduler.run(processor, loci);
    if !schedule.failed.is_empty() {
        tracing::warn!(failed = schedule.failed.len(), "loci omitted from output");
    }

    let paths = OutputPaths::in_dir(out_dir);
    let polya_sites = output::write_polya_whitelist(polya_whitelist, &paths.polya_whitelist)?;
    tracing::info!(sites = polya_sites, "poly(A) sites whitelisted");

    tracing::info!("writing isoform sequences to file");
    let summary = output::write_isoforms(&outputs, &paths)?;

    Ok(Stats {
        loci: n_loci,
        isoforms: summary.isoforms,
        assigned_reads: summary.reads,
        polya_sites,
        schedule,
    })
}

/// Annotation problems never stop the run; splice sites then come from reads only.
pub fn load_gene_model(path: Option<&Path>) -> GeneModel {
    let Some(path) = path else {
        tracing::info!("no genome annotation provided, splice sites will be entirely read derived");
        return GeneModel::default();
    };
    if let Err(e) = annotation::detect_format(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "annotation file ignored, splice sites will be entirely read derived and no polyA sites whitelisted"
        );
        return GeneModel::default();
    }
    tracing::info!(path = %path.display(), "parsing annotated splice sites");
    match GeneModel::load(path) {
        Ok(model) => {
            tracing::info!(
                chromosomes = model.bounds.len(),
                sites = model.site_count(),
                polya_sites = model.polya_whitelist.len(),
                "loaded gene model"
            );
            model
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse annotation, splice sites will be entirely read derived"
            );
            GeneModel::default()
        }
    }
}
