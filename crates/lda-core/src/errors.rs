use thiserror::Error;

/// Errors that can occur while training or applying a discriminant model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LdaError {
    // Input validation errors
    #[error("No class values found in column '{column}'; at least one labeled observation is required")]
    NoClasses { column: String },

    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Column(s) not found in input: {}", .columns.join(", "))]
    MissingColumn { columns: Vec<String> },

    #[error("{message}")]
    ZeroDimension {
        class_count: usize,
        feature_count: usize,
        message: String,
    },

    #[error("{message}")]
    DimensionTooHigh {
        requested: usize,
        max_dimension: usize,
        message: String,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Empty input: {field} cannot be empty")]
    EmptyInput { field: &'static str },

    #[error("Dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // Numerical errors
    #[error("Within-class scatter matrix is singular or ill-conditioned (condition number {condition:.3e})")]
    SingularMatrix { condition: f64 },

    #[error("Eigen decomposition failed: {0}")]
    EigenSolve(String),

    // Execution control
    #[error("Execution canceled")]
    Canceled,
}

/// Result type for discriminant analysis operations
pub type LdaResult<T> = Result<T, LdaError>;
