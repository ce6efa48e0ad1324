//! Column-major in-memory table consumed by training and apply
//!
//! Numeric columns store missing cells as NaN, mirroring how NULLs arrive
//! from the host. Nominal columns store missing cells as `None`.

use crate::errors::{LdaError, LdaResult};

/// Values of a single column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Numeric values; NaN or infinite marks a missing cell
    Numeric(Vec<f64>),
    /// Class labels or other categorical values
    Nominal {
        values: Vec<Option<String>>,
        /// Declared possible values, if the host knows them up front
        domain: Option<Vec<String>>,
    },
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Nominal { values, .. } => values.len(),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Ordered collection of equally long named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Create an empty table with no columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, checking name uniqueness and length
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> LdaResult<()> {
        let name = name.into();
        if self.column_index(&name).is_some() {
            return Err(LdaError::InvalidInput(format!(
                "duplicate column name '{}'",
                name
            )));
        }
        if self.columns.is_empty() {
            self.n_rows = data.len();
        } else if data.len() != self.n_rows {
            return Err(LdaError::DimensionMismatch {
                expected: self.n_rows,
                actual: data.len(),
            });
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    /// Builder-style variant of [`Table::push_column`] for numeric data
    pub fn with_numeric(mut self, name: &str, values: Vec<f64>) -> LdaResult<Self> {
        self.push_column(name, ColumnData::Numeric(values))?;
        Ok(self)
    }

    /// Builder-style variant of [`Table::push_column`] for label data
    pub fn with_nominal<S: Into<String>>(
        mut self,
        name: &str,
        values: Vec<Option<S>>,
    ) -> LdaResult<Self> {
        let values = values.into_iter().map(|v| v.map(Into::into)).collect();
        self.push_column(name, ColumnData::Nominal { values, domain: None })?;
        Ok(self)
    }

    /// Attach a declared domain to an existing nominal column
    pub fn with_domain(mut self, name: &str, domain: Vec<String>) -> LdaResult<Self> {
        let idx = self.column_index(name).ok_or_else(|| LdaError::MissingColumn {
            columns: vec![name.to_string()],
        })?;
        match &mut self.columns[idx].data {
            ColumnData::Nominal { domain: d, .. } => {
                *d = Some(domain);
                Ok(self)
            }
            ColumnData::Numeric(_) => Err(LdaError::InvalidInput(format!(
                "column '{}' is numeric and cannot carry a nominal domain",
                name
            ))),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Numeric values of a column, or `None` if absent or not numeric
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Numeric(v)) => Some(v),
            _ => None,
        }
    }

    /// Label values of a column, or `None` if absent or not nominal
    pub fn nominal(&self, name: &str) -> Option<&[Option<String>]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Nominal { values, .. }) => Some(values),
            _ => None,
        }
    }

    /// Declared domain of a nominal column
    pub fn domain(&self, name: &str) -> Option<&[String]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Nominal {
                domain: Some(d), ..
            }) => Some(d),
            _ => None,
        }
    }

    /// Reorder rows by the given permutation (row `i` of the result is row `order[i]`)
    pub fn select_rows(&self, order: &[usize]) -> LdaResult<Table> {
        if let Some(&bad) = order.iter().find(|&&i| i >= self.n_rows) {
            return Err(LdaError::InvalidInput(format!(
                "row index {} out of range for {} rows",
                bad, self.n_rows
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let data = match &c.data {
                    ColumnData::Numeric(v) => {
                        ColumnData::Numeric(order.iter().map(|&i| v[i]).collect())
                    }
                    ColumnData::Nominal { values, domain } => ColumnData::Nominal {
                        values: order.iter().map(|&i| values[i].clone()).collect(),
                        domain: domain.clone(),
                    },
                };
                Column {
                    name: c.name.clone(),
                    data,
                }
            })
            .collect();
        Ok(Table {
            columns,
            n_rows: order.len(),
        })
    }
}

/// Whether a numeric cell holds a usable value
#[inline]
pub(crate) fn is_present(value: f64) -> bool {
    value.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_table() {
        let table = Table::new()
            .with_numeric("x", vec![1.0, 2.0, f64::NAN])
            .unwrap()
            .with_nominal("class", vec![Some("a"), None, Some("b")])
            .unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column_names(), vec!["x", "class"]);
        assert_eq!(table.numeric("x").unwrap().len(), 3);
        assert!(table.numeric("class").is_none());
        assert_eq!(table.nominal("class").unwrap()[1], None);
    }

    #[test]
    fn test_length_mismatch() {
        let result = Table::new()
            .with_numeric("x", vec![1.0, 2.0])
            .unwrap()
            .with_numeric("y", vec![1.0]);
        assert!(matches!(result, Err(LdaError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_duplicate_name() {
        let result = Table::new()
            .with_numeric("x", vec![1.0])
            .unwrap()
            .with_numeric("x", vec![2.0]);
        assert!(matches!(result, Err(LdaError::InvalidInput(_))));
    }

    #[test]
    fn test_domain_on_numeric_column_rejected() {
        let result = Table::new()
            .with_numeric("x", vec![1.0])
            .unwrap()
            .with_domain("x", vec!["a".into()]);
        assert!(matches!(result, Err(LdaError::InvalidInput(_))));
    }

    #[test]
    fn test_select_rows() {
        let table = Table::new()
            .with_numeric("x", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_nominal("class", vec![Some("a"), Some("b"), Some("c")])
            .unwrap();
        let permuted = table.select_rows(&[2, 0, 1]).unwrap();
        assert_eq!(permuted.numeric("x").unwrap(), &[3.0, 1.0, 2.0]);
        assert_eq!(
            permuted.nominal("class").unwrap()[0].as_deref(),
            Some("c")
        );
        assert!(table.select_rows(&[3]).is_err());
    }
}
