use crate::cli::CallArgs;
use crate::juliet::error_model::ErrorEstimates;
use crate::juliet::msa::{ColumnMatrix, RowMatrix};
use crate::juliet::phasing::HaplotypePhaser;
use crate::juliet::reads::QvThresholds;
use crate::juliet::target::TargetConfig;
use crate::juliet::variant::VariantCaller;
use crate::juliet::writers::{write_msa, write_report, JsonReport};
use crate::utils::{
    extract_reads, get_bam_header, get_chemistry, is_bam_mapped, GenomicRange, Result,
};
use rayon::{
    iter::{IntoParallelRefIterator, ParallelIterator},
    ThreadPoolBuilder,
};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct PhaseOptions {
    pub merge_outliers: bool,
}

/// Runs the amino workflow over all input batches, with optional phasing.
pub fn call(args: &CallArgs, phasing: Option<PhaseOptions>) -> Result<()> {
    let config = TargetConfig::from_arg(args.config.as_deref().unwrap_or(""))?;
    let region = args
        .region
        .as_deref()
        .map(GenomicRange::from_1based_str)
        .transpose()?;
    let thresholds = QvThresholds {
        qual: args.qual_qv,
        del: args.del_qv,
        sub: Some(args.sub_qv),
        ins: args.ins_qv,
    };

    log::debug!(
        "Initializing thread pool with {} threads...",
        args.num_threads
    );
    let pool = ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .thread_name(|i| format!("juliet-{}", i))
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))?;

    pool.install(|| {
        args.inputs
            .par_iter()
            .map(|input| {
                process_batch(input, args, &config, region.as_ref(), &thresholds, phasing)
            })
            .collect::<Result<Vec<()>>>()
    })?;
    Ok(())
}

fn process_batch(
    input: &Path,
    args: &CallArgs,
    config: &TargetConfig,
    region: Option<&GenomicRange>,
    thresholds: &QvThresholds,
    phasing: Option<PhaseOptions>,
) -> Result<()> {
    let output_prefix = output_prefix(args.output_prefix.as_deref(), input, args.inputs.len());

    let bam_header = get_bam_header(input)?;
    if !is_bam_mapped(&bam_header) {
        return Err(format!("{}: input BAM is not mapped", input.display()));
    }

    let error = match (args.substitution_rate, args.deletion_rate) {
        (Some(substitution), Some(deletion)) => {
            ErrorEstimates::from_rates(substitution, deletion)?
        }
        (None, None) => ErrorEstimates::from_chemistry(&get_chemistry(&bam_header)?)?,
        _ => return Err("--sub and --del must be given together".to_string()),
    };

    let reads = extract_reads(input, region)?;
    if reads.is_empty() {
        return Err(format!("{}: no reads in the target region", input.display()));
    }
    let rows = RowMatrix::new(&reads, thresholds);
    let columns = ColumnMatrix::new(&rows)?;

    let results = VariantCaller::new(&rows, &columns, &error, config, args.debug).call();
    if let Some(accuracy) = results.accuracy {
        log::info!(
            "{}: TPR {:.4}, FPR {:.4}, accuracy {:.4}, {} false positives over {} tests",
            input.display(),
            accuracy.true_positive_rate,
            accuracy.false_positive_rate,
            accuracy.accuracy,
            accuracy.false_positives,
            results.num_tests
        );
    }

    let mut genes = results.genes;
    let haplotypes = phasing.map(|options| {
        HaplotypePhaser::new(&rows, &error, options.merge_outliers).phase(&mut genes)
    });

    let report = JsonReport::new(&genes, haplotypes.as_deref(), args.drm_only);
    write_report(&report, &output_prefix)?;
    if args.save_msa {
        write_msa(&columns, &output_prefix)?;
    }
    log::info!("{}: wrote {}.json", input.display(), output_prefix);
    Ok(())
}

/// One report per input: an explicit prefix is used as-is for a single
/// input and suffixed with the input stem otherwise.
fn output_prefix(prefix: Option<&str>, input: &Path, num_inputs: usize) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    match prefix {
        Some(prefix) if num_inputs == 1 => prefix.to_string(),
        Some(prefix) => format!("{}.{}", prefix, stem),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_prefix_follows_input_stems() {
        let input = Path::new("/data/sample1.align.bam");
        assert_eq!(output_prefix(None, input, 1), "sample1.align");
        assert_eq!(output_prefix(Some("out/run"), input, 1), "out/run");
        assert_eq!(output_prefix(Some("out/run"), input, 3), "out/run.sample1.align");
    }
}
