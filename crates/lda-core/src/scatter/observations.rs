//! Binding of class and feature columns to a table

use crate::errors::{LdaError, LdaResult};
use crate::table::{is_present, ColumnData, Table};
use crate::types::MissingValuePolicy;

/// Class and feature columns of a table, resolved once before the passes
pub struct LabeledObservations<'a> {
    class_column: &'a str,
    feature_names: &'a [String],
    labels: &'a [Option<String>],
    features: Vec<&'a [f64]>,
    policy: MissingValuePolicy,
    n_rows: usize,
}

impl<'a> LabeledObservations<'a> {
    /// Resolve the class column and feature columns by name
    ///
    /// Fails with `MissingColumn` naming every absent column, and with
    /// `InvalidInput` when a column has the wrong kind or a feature column is
    /// also the class column.
    pub fn bind(
        table: &'a Table,
        class_column: &'a str,
        feature_names: &'a [String],
        policy: MissingValuePolicy,
    ) -> LdaResult<Self> {
        let missing: Vec<String> = std::iter::once(class_column)
            .chain(feature_names.iter().map(String::as_str))
            .filter(|name| table.column(name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(LdaError::MissingColumn { columns: missing });
        }

        if feature_names.iter().any(|f| f == class_column) {
            return Err(LdaError::InvalidInput(format!(
                "class column '{}' cannot also be a feature column",
                class_column
            )));
        }
        for (i, name) in feature_names.iter().enumerate() {
            if feature_names[..i].contains(name) {
                return Err(LdaError::InvalidInput(format!(
                    "feature column '{}' selected more than once",
                    name
                )));
            }
        }

        let labels = table.nominal(class_column).ok_or_else(|| {
            LdaError::InvalidInput(format!("class column '{}' is not nominal", class_column))
        })?;

        let features = feature_names
            .iter()
            .map(|name| match table.column(name).map(|c| &c.data) {
                Some(ColumnData::Numeric(values)) => Ok(values.as_slice()),
                _ => Err(LdaError::InvalidInput(format!(
                    "feature column '{}' is not numeric",
                    name
                ))),
            })
            .collect::<LdaResult<Vec<_>>>()?;

        Ok(Self {
            class_column,
            feature_names,
            labels,
            features,
            policy,
            n_rows: table.n_rows(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Read one observation into `buf`
    ///
    /// Returns the class label, or `None` when the row is excluded under the
    /// skip policy. Under the fail policy a missing value is an error.
    pub fn read(&self, row: usize, buf: &mut [f64]) -> LdaResult<Option<&'a str>> {
        let labels: &'a [Option<String>] = self.labels;
        let label = match &labels[row] {
            Some(label) => label.as_str(),
            None => return self.missing(self.class_column, row),
        };
        for (j, column) in self.features.iter().enumerate() {
            let value = column[row];
            if !is_present(value) {
                return self.missing(&self.feature_names[j], row);
            }
            buf[j] = value;
        }
        Ok(Some(label))
    }

    fn missing(&self, column: &str, row: usize) -> LdaResult<Option<&'a str>> {
        match self.policy {
            MissingValuePolicy::Fail => Err(LdaError::MissingValue {
                column: column.to_string(),
                row,
            }),
            MissingValuePolicy::Skip => Ok(None),
        }
    }
}
