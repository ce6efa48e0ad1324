//! Applying a trained model to new observations

use crate::discriminant::TransformationModel;
use crate::errors::{LdaError, LdaResult};
use crate::monitor::{ExecutionMonitor, RowProgress};
use crate::table::{is_present, Column, ColumnData, Table};
use crate::types::ApplyOptions;

/// Prefix of the appended projection columns
pub const PROJECTION_COLUMN_PREFIX: &str = "Dimension ";

/// Name of the `index`-th projection column
pub fn projection_column_name(index: usize) -> String {
    format!("{}{}", PROJECTION_COLUMN_PREFIX, index)
}

/// A model bound to the feature columns of one table
///
/// Rows are projected independently; the projector holds no mutable state
/// and can be shared across threads.
#[derive(Debug)]
pub struct RowProjector<'a> {
    model: &'a TransformationModel,
    columns: Vec<&'a [f64]>,
    n_rows: usize,
    dimension: usize,
    fail_on_missing: bool,
}

impl<'a> RowProjector<'a> {
    /// Resolve the model's feature columns in `table` and check the output dimension
    ///
    /// Fails with `MissingColumn` naming every model column absent from the
    /// table, and with `DimensionTooHigh` when the requested dimension exceeds
    /// what the training data supports.
    pub fn bind(
        model: &'a TransformationModel,
        table: &'a Table,
        options: &ApplyOptions,
    ) -> LdaResult<Self> {
        let missing: Vec<String> = model
            .feature_names()
            .iter()
            .filter(|name| table.column(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(LdaError::MissingColumn { columns: missing });
        }

        let columns = model
            .feature_names()
            .iter()
            .map(|name| {
                table.numeric(name).ok_or_else(|| {
                    LdaError::InvalidInput(format!("column '{}' is not numeric", name))
                })
            })
            .collect::<LdaResult<Vec<_>>>()?;

        let dimension = options.dimension.unwrap_or(model.dimension());
        model.bounds().validate(dimension)?;
        if dimension > model.spectrum().len() {
            return Err(LdaError::InvalidValue {
                field: "dimension",
                message: format!(
                    "the model holds only {} eigenvectors",
                    model.spectrum().len()
                ),
            });
        }

        Ok(Self {
            model,
            columns,
            n_rows: table.n_rows(),
            dimension,
            fail_on_missing: options.fail_on_missing,
        })
    }

    /// Length of each projection
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Project one row of the bound table into `out`
    ///
    /// Returns `Ok(false)` and leaves `out` untouched when the row has a
    /// missing value and missing values are tolerated.
    ///
    /// # Arguments
    /// * `row` - Row index in the bound table
    /// * `x` - Scratch buffer of `n_features` values
    /// * `out` - Output buffer of at least `dimension` values
    pub fn project_row(&self, row: usize, x: &mut [f64], out: &mut [f64]) -> LdaResult<bool> {
        if row >= self.n_rows {
            return Err(LdaError::InvalidInput(format!(
                "row index {} out of range for {} rows",
                row, self.n_rows
            )));
        }
        if x.len() != self.columns.len() {
            return Err(LdaError::DimensionMismatch {
                expected: self.columns.len(),
                actual: x.len(),
            });
        }
        if out.len() < self.dimension {
            return Err(LdaError::DimensionMismatch {
                expected: self.dimension,
                actual: out.len(),
            });
        }
        for (j, column) in self.columns.iter().enumerate() {
            let value = column[row];
            if !is_present(value) {
                if self.fail_on_missing {
                    return Err(LdaError::MissingValue {
                        column: self.model.feature_names()[j].clone(),
                        row,
                    });
                }
                return Ok(false);
            }
            x[j] = value;
        }
        self.model.project_into(x, &mut out[..self.dimension])?;
        Ok(true)
    }

    /// Project a standalone observation given in model column order
    ///
    /// A missing value is reported as `InvalidValue` naming the feature, since
    /// the observation has no row in the bound table.
    pub fn project_values(&self, x: &[f64]) -> LdaResult<Option<Vec<f64>>> {
        if x.len() != self.columns.len() {
            return Err(LdaError::DimensionMismatch {
                expected: self.columns.len(),
                actual: x.len(),
            });
        }
        if let Some(j) = x.iter().position(|v| !is_present(*v)) {
            if self.fail_on_missing {
                return Err(LdaError::InvalidValue {
                    field: "observation",
                    message: format!(
                        "missing value for feature '{}'",
                        self.model.feature_names()[j]
                    ),
                });
            }
            return Ok(None);
        }
        let mut out = vec![0.0; self.dimension];
        self.model.project_into(x, &mut out)?;
        Ok(Some(out))
    }
}

/// Apply a model to every row of a table
///
/// The result holds the input columns (without the model's feature columns
/// when `remove_used_columns` is set) followed by one numeric column per
/// discriminant direction. Rows that cannot be projected get NaN cells.
///
/// # Arguments
/// * `model` - Trained transformation
/// * `table` - New observations; must contain all model feature columns
/// * `options` - Output dimension and missing-value handling
/// * `monitor` - Cancellation and progress hook, checked per row
pub fn apply_model(
    model: &TransformationModel,
    table: &Table,
    options: &ApplyOptions,
    monitor: &dyn ExecutionMonitor,
) -> LdaResult<Table> {
    let projector = RowProjector::bind(model, table, options)?;
    let n_rows = table.n_rows();
    let k = projector.dimension();

    let kept: Vec<&Column> = table
        .columns()
        .iter()
        .filter(|c| !(options.remove_used_columns && model.feature_names().contains(&c.name)))
        .collect();
    if let Some(clash) = (0..k)
        .map(projection_column_name)
        .find(|name| kept.iter().any(|c| &c.name == name))
    {
        return Err(LdaError::InvalidInput(format!(
            "output column '{}' already exists in the input",
            clash
        )));
    }

    let mut projected: Vec<Vec<f64>> = vec![Vec::with_capacity(n_rows); k];
    let mut x = vec![0.0; model.n_features()];
    let mut out = vec![0.0; k];
    let mut n_unprojected = 0;

    monitor.check_canceled()?;
    let mut progress = RowProgress::new(monitor, n_rows);
    for row in 0..n_rows {
        progress.tick()?;
        if projector.project_row(row, &mut x, &mut out)? {
            for (column, &value) in projected.iter_mut().zip(&out) {
                column.push(value);
            }
        } else {
            n_unprojected += 1;
            for column in projected.iter_mut() {
                column.push(f64::NAN);
            }
        }
    }
    if n_unprojected > 0 {
        log::warn!(
            "{} of {} rows had missing values and were not projected",
            n_unprojected,
            n_rows
        );
    }

    let mut output = Table::new();
    for column in kept {
        output.push_column(column.name.clone(), column.data.clone())?;
    }
    for (i, values) in projected.into_iter().enumerate() {
        output.push_column(projection_column_name(i), ColumnData::Numeric(values))?;
    }
    Ok(output)
}
