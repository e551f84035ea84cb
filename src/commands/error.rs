use crate::cli::ErrorArgs;
use crate::juliet::msa::{ColumnMatrix, RowMatrix};
use crate::juliet::reads::QvThresholds;
use crate::utils::{extract_reads, GenomicRange, Result};

/// Columns below this coverage carry too little signal for rate estimation.
const MIN_COVERAGE: u64 = 100;

/// Estimates average substitution and deletion rates per input batch from
/// high-coverage columns, with the default quality filtering applied.
pub fn error_rates(args: &ErrorArgs) -> Result<()> {
    let region = args
        .region
        .as_deref()
        .map(GenomicRange::from_1based_str)
        .transpose()?;
    let thresholds = QvThresholds::default();

    for input in &args.inputs {
        let reads = extract_reads(input, region.as_ref())?;
        if reads.is_empty() {
            return Err(format!("{}: no reads in the target region", input.display()));
        }
        let rows = RowMatrix::new(&reads, &thresholds);
        let columns = ColumnMatrix::new(&rows)?;

        let Some((substitution, deletion)) = estimate_rates(&columns) else {
            log::warn!(
                "{}: no columns with coverage above {}",
                input.display(),
                MIN_COVERAGE
            );
            continue;
        };
        println!("{}", input.display());
        println!("sub: {}", substitution);
        println!("del: {}", deletion);
    }
    Ok(())
}

/// Mean per-column deletion frequency and non-consensus substitution
/// frequency over columns with coverage above the cutoff.
fn estimate_rates(columns: &ColumnMatrix) -> Option<(f64, f64)> {
    let mut substitution = 0.0;
    let mut deletion = 0.0;
    let mut num_columns = 0;
    for column in &columns.columns {
        if column.coverage() > MIN_COVERAGE {
            deletion += column.frequency(4);
            substitution += 1.0 - column.frequency(4) - column.frequency(column.max_index());
            num_columns += 1;
        }
    }
    (num_columns > 0)
        .then(|| (substitution / num_columns as f64, deletion / num_columns as f64))
}
