use crate::discriminant::TransformationModel;

/// Policy for observations with a missing feature value or class label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingValuePolicy {
    /// Error if any selected value is missing (default)
    #[default]
    Fail,
    /// Exclude the observation from both accumulation passes
    Skip,
}

/// Options for training a discriminant model
#[derive(Debug, Clone, Default)]
pub struct LdaOptions {
    /// Name of the nominal column holding the class label
    pub class_column: String,
    /// Numeric feature columns, in the order they map to model coordinates
    pub feature_columns: Vec<String>,
    /// How missing values are treated during accumulation
    pub missing_policy: MissingValuePolicy,
    /// Number of discriminant directions kept in the model.
    /// `None` keeps the maximum feasible dimension.
    pub dimension: Option<usize>,
}

impl LdaOptions {
    /// Options for the given class column and features, other fields defaulted
    pub fn new<S: Into<String>>(class_column: &str, feature_columns: Vec<S>) -> Self {
        Self {
            class_column: class_column.to_string(),
            feature_columns: feature_columns.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Options for applying a trained model to new data
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Output dimension; `None` uses the model's own dimension
    pub dimension: Option<usize>,
    /// Drop the feature columns consumed by the model from the output
    pub remove_used_columns: bool,
    /// Error on a missing input value instead of emitting a missing projection
    pub fail_on_missing: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dimension: None,
            remove_used_columns: false,
            fail_on_missing: true,
        }
    }
}

/// Per-class summary collected during training
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    /// Class label
    pub label: String,
    /// Number of observations of this class used for training
    pub count: usize,
    /// Mean feature vector of the class
    pub mean: Vec<f64>,
}

/// Result of fitting a discriminant model
#[derive(Debug, Clone)]
pub struct LdaFitResult {
    /// The trained projection, including the full ranked spectrum
    pub model: TransformationModel,
    /// Class summaries in first-seen order
    pub classes: Vec<ClassSummary>,
    /// Mean over all used observations
    pub global_mean: Vec<f64>,
    /// Number of observations used
    pub n_observations: usize,
    /// Number of observations excluded by the missing-value policy
    pub n_skipped: usize,
}
