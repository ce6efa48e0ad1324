//! Scatter matrix accumulation over a labeled table

mod accumulator;
mod observations;

pub use accumulator::{
    ClassMeans, ClassMeansAccumulator, ClassStatistics, ScatterAccumulator, ScatterMatrices,
};
pub use observations::LabeledObservations;

use crate::errors::{LdaError, LdaResult};
use crate::monitor::{ExecutionMonitor, RowProgress};
use crate::table::Table;
use crate::types::MissingValuePolicy;

/// Output of [`compute_scatter`]
#[derive(Debug, Clone)]
pub struct ScatterResult {
    pub matrices: ScatterMatrices,
    pub means: ClassMeans,
    /// Rows excluded by the skip policy
    pub n_skipped: usize,
}

/// Compute class means, within-class and between-class scatter of a table
///
/// Runs two passes over the rows: the first collects class and global sums,
/// the second accumulates outer products around the finalized class means.
/// Rows excluded under [`MissingValuePolicy::Skip`] are excluded from both.
///
/// # Arguments
/// * `table` - Input observations
/// * `class_column` - Nominal column holding the class label
/// * `feature_columns` - Numeric feature columns, in model coordinate order
/// * `policy` - Missing-value handling
/// * `monitor` - Cancellation and progress hook, checked per row
///
/// # Returns
/// * `ScatterResult` with Sw, Sb and the class means
pub fn compute_scatter(
    table: &Table,
    class_column: &str,
    feature_columns: &[String],
    policy: MissingValuePolicy,
    monitor: &dyn ExecutionMonitor,
) -> LdaResult<ScatterResult> {
    let observations = LabeledObservations::bind(table, class_column, feature_columns, policy)?;
    let n_rows = observations.n_rows();
    if n_rows == 0 {
        return Err(LdaError::NoClasses {
            column: class_column.to_string(),
        });
    }

    let mut buf = vec![0.0; observations.n_features()];

    // Pass 1: sums per class
    monitor.check_canceled()?;
    let mut pass1 = ClassMeansAccumulator::new(observations.n_features());
    let mut progress = RowProgress::within(monitor, n_rows, 0.0, 0.5);
    let mut n_skipped = 0;
    for row in 0..n_rows {
        progress.tick()?;
        match observations.read(row, &mut buf)? {
            Some(label) => pass1.observe(label, &buf)?,
            None => n_skipped += 1,
        }
    }
    if n_skipped > 0 {
        log::warn!(
            "Skipped {} of {} rows with missing values in '{}' or its features",
            n_skipped,
            n_rows,
            class_column
        );
    }
    let means = pass1.finalize(class_column)?;
    log::debug!(
        "Class means computed: {} classes over {} observations",
        means.n_classes(),
        means.total()
    );

    // Pass 2: outer products around the class means
    monitor.check_canceled()?;
    let mut pass2 = ScatterAccumulator::new(&means);
    let mut progress = RowProgress::within(monitor, n_rows, 0.5, 0.5);
    for row in 0..n_rows {
        progress.tick()?;
        if let Some(label) = observations.read(row, &mut buf)? {
            pass2.observe(label, &buf)?;
        }
    }
    let matrices = pass2.finish();

    Ok(ScatterResult {
        matrices,
        means,
        n_skipped,
    })
}
