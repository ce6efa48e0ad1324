//! Training entry point for linear discriminant analysis

use crate::discriminant::{solve, DimensionBounds, TransformationModel};
use crate::errors::{LdaError, LdaResult};
use crate::monitor::ExecutionMonitor;
use crate::scatter::{compute_scatter, LabeledObservations};
use crate::table::Table;
use crate::types::{ClassSummary, LdaFitResult, LdaOptions};

/// Fit a linear discriminant model
///
/// Accumulates class means and scatter matrices in two passes, checks the
/// requested dimension against the observed class and feature counts, solves
/// the eigen-problem and keeps the leading directions.
///
/// # Arguments
/// * `table` - Training observations
/// * `options` - Class column, feature columns, missing-value policy, dimension
/// * `monitor` - Cancellation and progress hook
///
/// # Returns
/// * `LdaFitResult` with the model (including the full spectrum) and class statistics
pub fn fit_lda(
    table: &Table,
    options: &LdaOptions,
    monitor: &dyn ExecutionMonitor,
) -> LdaResult<LdaFitResult> {
    if options.class_column.is_empty() {
        return Err(LdaError::EmptyInput {
            field: "class_column",
        });
    }
    if options.dimension == Some(0) {
        return Err(LdaError::InvalidValue {
            field: "dimension",
            message: "the output dimension must be at least 1".to_string(),
        });
    }

    let scatter = compute_scatter(
        table,
        &options.class_column,
        &options.feature_columns,
        options.missing_policy,
        monitor,
    )?;

    let bounds = DimensionBounds::new(
        scatter.means.n_classes(),
        options.feature_columns.len(),
    )?;
    let dimension = options.dimension.unwrap_or(bounds.max_dimension());
    bounds.validate(dimension)?;

    monitor.check_canceled()?;
    let solution = solve(
        scatter.matrices.within.as_ref(),
        scatter.matrices.between.as_ref(),
    )?;
    let model = TransformationModel::build(
        solution.eigenpairs,
        dimension,
        options.feature_columns.clone(),
        bounds,
    )?;
    monitor.set_progress(1.0);

    log::debug!(
        "Fitted LDA on {} observations: {} classes, {} features, dimension {} of {}",
        scatter.means.total(),
        bounds.class_count(),
        bounds.feature_count(),
        dimension,
        bounds.max_dimension()
    );

    let means = &scatter.means;
    let classes = means
        .labels()
        .iter()
        .zip(means.counts())
        .zip(means.means())
        .map(|((label, &count), mean)| ClassSummary {
            label: label.clone(),
            count,
            mean: mean.clone(),
        })
        .collect();

    Ok(LdaFitResult {
        model,
        classes,
        global_mean: means.global_mean().to_vec(),
        n_observations: means.total(),
        n_skipped: scatter.n_skipped,
    })
}

/// Check options against a table before reading any rows
///
/// Resolves all columns and, when the class column declares its domain,
/// derives dimension bounds from the declared class count. Training itself
/// always counts the classes actually observed.
///
/// # Returns
/// * `Some(bounds)` when the class domain is declared, `None` otherwise
pub fn check_configuration(
    table: &Table,
    options: &LdaOptions,
) -> LdaResult<Option<DimensionBounds>> {
    if options.dimension == Some(0) {
        return Err(LdaError::InvalidValue {
            field: "dimension",
            message: "the output dimension must be at least 1".to_string(),
        });
    }
    LabeledObservations::bind(
        table,
        &options.class_column,
        &options.feature_columns,
        options.missing_policy,
    )?;

    let Some(domain) = table.domain(&options.class_column) else {
        return Ok(None);
    };
    let bounds = DimensionBounds::new(domain.len(), options.feature_columns.len())?;
    if let Some(dimension) = options.dimension {
        bounds.validate(dimension)?;
    }
    Ok(Some(bounds))
}
