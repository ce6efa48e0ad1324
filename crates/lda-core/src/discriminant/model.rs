//! Trained discriminant projection

use faer::Mat;

use super::dimension::DimensionBounds;
use super::solver::EigenPair;
use crate::errors::{LdaError, LdaResult};

/// Immutable linear projection onto the leading discriminant directions
///
/// Holds the complete ranked spectrum; the first `dimension` eigenvectors form
/// the rows of the projection matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationModel {
    feature_names: Vec<String>,
    spectrum: Vec<EigenPair>,
    dimension: usize,
    bounds: DimensionBounds,
}

/// Plain-data form of a model: ordered feature names and a row-major matrix
/// with one eigenvector per row, descending by eigenvalue
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    pub feature_names: Vec<String>,
    pub eigenvalues: Vec<f64>,
    /// `eigenvalues.len() x feature_names.len()`, row-major
    pub matrix: Vec<f64>,
    /// Number of rows used for projection
    pub dimension: usize,
    /// Distinct classes seen at training time
    pub class_count: usize,
}

impl TransformationModel {
    /// Build a model from a descending spectrum
    ///
    /// # Arguments
    /// * `spectrum` - Eigenpairs ordered by descending eigenvalue
    /// * `dimension` - Number of leading eigenvectors used for projection
    /// * `feature_names` - Input columns in coordinate order
    /// * `bounds` - Dimension bounds derived at training time
    pub fn build(
        spectrum: Vec<EigenPair>,
        dimension: usize,
        feature_names: Vec<String>,
        bounds: DimensionBounds,
    ) -> LdaResult<Self> {
        let d = feature_names.len();
        if d == 0 {
            return Err(LdaError::EmptyInput {
                field: "feature_names",
            });
        }
        if bounds.feature_count() != d {
            return Err(LdaError::DimensionMismatch {
                expected: d,
                actual: bounds.feature_count(),
            });
        }
        if let Some(bad) = spectrum.iter().find(|p| p.vector.len() != d) {
            return Err(LdaError::DimensionMismatch {
                expected: d,
                actual: bad.vector.len(),
            });
        }
        if spectrum.windows(2).any(|w| w[0].value < w[1].value) {
            return Err(LdaError::InvalidInput(
                "eigenpairs must be ordered by descending eigenvalue".to_string(),
            ));
        }
        bounds.validate(dimension)?;
        if dimension > spectrum.len() {
            return Err(LdaError::InvalidValue {
                field: "dimension",
                message: format!(
                    "{} directions requested but only {} eigenvectors are available",
                    dimension,
                    spectrum.len()
                ),
            });
        }

        Ok(Self {
            feature_names,
            spectrum,
            dimension,
            bounds,
        })
    }

    /// A copy of this model projecting onto `dimension` directions
    pub fn with_dimension(&self, dimension: usize) -> LdaResult<Self> {
        Self::build(
            self.spectrum.clone(),
            dimension,
            self.feature_names.clone(),
            self.bounds,
        )
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of output coordinates produced by [`TransformationModel::project`]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Largest output dimension supported by the training data
    pub fn max_dimension(&self) -> usize {
        self.bounds.max_dimension()
    }

    pub fn bounds(&self) -> &DimensionBounds {
        &self.bounds
    }

    /// Eigenpairs used for projection
    pub fn eigenpairs(&self) -> &[EigenPair] {
        &self.spectrum[..self.dimension]
    }

    /// The full ranked spectrum, for reporting
    pub fn spectrum(&self) -> &[EigenPair] {
        &self.spectrum
    }

    pub fn eigenvalues(&self) -> Vec<f64> {
        self.spectrum.iter().map(|p| p.value).collect()
    }

    /// The `dimension x n_features` projection matrix
    pub fn projection_matrix(&self) -> Mat<f64> {
        let pairs = self.eigenpairs();
        Mat::from_fn(self.dimension, self.n_features(), |i, j| pairs[i].vector[j])
    }

    /// Project a feature vector given in model column order
    pub fn project(&self, x: &[f64]) -> LdaResult<Vec<f64>> {
        let mut out = vec![0.0; self.dimension];
        self.project_into(x, &mut out)?;
        Ok(out)
    }

    /// Project into `out`, using as many leading directions as `out` holds
    pub fn project_into(&self, x: &[f64], out: &mut [f64]) -> LdaResult<()> {
        if x.len() != self.n_features() {
            return Err(LdaError::DimensionMismatch {
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        if out.len() > self.spectrum.len() {
            return Err(LdaError::DimensionMismatch {
                expected: self.spectrum.len(),
                actual: out.len(),
            });
        }
        for (o, pair) in out.iter_mut().zip(&self.spectrum) {
            *o = pair.vector.iter().zip(x).map(|(w, v)| w * v).sum();
        }
        Ok(())
    }

    /// Export the model as plain data
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            feature_names: self.feature_names.clone(),
            eigenvalues: self.eigenvalues(),
            matrix: self
                .spectrum
                .iter()
                .flat_map(|p| p.vector.iter().copied())
                .collect(),
            dimension: self.dimension,
            class_count: self.bounds.class_count(),
        }
    }

    /// Rebuild a model from plain data, validating its shape
    pub fn from_snapshot(snapshot: ModelSnapshot) -> LdaResult<Self> {
        let d = snapshot.feature_names.len();
        let rows = snapshot.eigenvalues.len();
        if snapshot.matrix.len() != rows * d {
            return Err(LdaError::DimensionMismatch {
                expected: rows * d,
                actual: snapshot.matrix.len(),
            });
        }
        let bounds = DimensionBounds::new(snapshot.class_count, d)?;
        let spectrum = snapshot
            .eigenvalues
            .iter()
            .enumerate()
            .map(|(i, &value)| EigenPair {
                value,
                vector: snapshot.matrix[i * d..(i + 1) * d].to_vec(),
                source_index: i,
            })
            .collect();
        Self::build(spectrum, snapshot.dimension, snapshot.feature_names, bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    fn spectrum() -> Vec<EigenPair> {
        vec![
            EigenPair {
                value: 9.0,
                vector: vec![1.0, 0.0, 0.0],
                source_index: 2,
            },
            EigenPair {
                value: 4.0,
                vector: vec![0.0, 1.0, 1.0],
                source_index: 0,
            },
            EigenPair {
                value: 0.0,
                vector: vec![0.0, 0.0, 1.0],
                source_index: 1,
            },
        ]
    }

    fn model(dimension: usize) -> TransformationModel {
        let bounds = DimensionBounds::new(4, 3).unwrap();
        TransformationModel::build(spectrum(), dimension, names(), bounds).unwrap()
    }

    #[test]
    fn test_project() {
        let m = model(2);
        let y = m.project(&[2.0, 3.0, 4.0]).unwrap();
        assert_eq!(y, vec![2.0, 7.0]);
        assert_eq!(m.eigenpairs().len(), 2);
        assert_eq!(m.spectrum().len(), 3);
    }

    #[test]
    fn test_projection_matrix() {
        let w = model(2).projection_matrix();
        assert_eq!(w.nrows(), 2);
        assert_eq!(w.ncols(), 3);
        assert_eq!(w[(1, 2)], 1.0);
    }

    #[test]
    fn test_project_length_matches_dimension() {
        for k in 1..=3 {
            let m = model(k);
            assert_eq!(m.project(&[1.0, 1.0, 1.0]).unwrap().len(), k);
        }
    }

    #[test]
    fn test_project_wrong_length() {
        let result = model(1).project(&[1.0, 2.0]);
        assert!(matches!(result, Err(LdaError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_build_rejects_unsorted_spectrum() {
        let mut pairs = spectrum();
        pairs.swap(0, 1);
        let bounds = DimensionBounds::new(4, 3).unwrap();
        let result = TransformationModel::build(pairs, 1, names(), bounds);
        assert!(matches!(result, Err(LdaError::InvalidInput(_))));
    }

    #[test]
    fn test_build_rejects_dimension_above_max() {
        let bounds = DimensionBounds::new(2, 3).unwrap();
        let result = TransformationModel::build(spectrum(), 2, names(), bounds);
        assert!(matches!(result, Err(LdaError::DimensionTooHigh { .. })));
    }

    #[test]
    fn test_with_dimension() {
        let m = model(1);
        assert_eq!(m.with_dimension(3).unwrap().dimension(), 3);
        assert!(matches!(
            m.with_dimension(4),
            Err(LdaError::DimensionTooHigh { .. })
        ));
    }

    #[test]
    fn test_snapshot_restores_projection() {
        let m = model(2);
        let snapshot = m.snapshot();
        assert_eq!(snapshot.matrix.len(), 9);
        assert_eq!(&snapshot.matrix[3..6], &[0.0, 1.0, 1.0]);

        let restored = TransformationModel::from_snapshot(snapshot).unwrap();
        let x = [0.5, -1.0, 2.0];
        assert_eq!(restored.project(&x).unwrap(), m.project(&x).unwrap());
        assert_eq!(restored.max_dimension(), 3);
    }

    #[test]
    fn test_snapshot_shape_mismatch() {
        let mut snapshot = model(2).snapshot();
        snapshot.matrix.pop();
        assert!(matches!(
            TransformationModel::from_snapshot(snapshot),
            Err(LdaError::DimensionMismatch { .. })
        ));
    }
}
