//! Bounds on the number of discriminant directions
//!
//! At most `classes - 1` directions carry between-class information, and no
//! more than there are input features.

use crate::errors::{LdaError, LdaResult};

/// Maximum feasible output dimension, `min(class_count - 1, feature_count)`
pub fn max_dimension(class_count: usize, feature_count: usize) -> usize {
    class_count.saturating_sub(1).min(feature_count)
}

/// Class and feature counts together with the derived maximum dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionBounds {
    class_count: usize,
    feature_count: usize,
    max_dimension: usize,
}

impl DimensionBounds {
    /// Derive the bounds, failing with `ZeroDimension` when no direction is feasible
    pub fn new(class_count: usize, feature_count: usize) -> LdaResult<Self> {
        let max_dimension = max_dimension(class_count, feature_count);
        if max_dimension < 1 {
            return Err(LdaError::ZeroDimension {
                class_count,
                feature_count,
                message: zero_dimension_message(class_count, feature_count),
            });
        }
        Ok(Self {
            class_count,
            feature_count,
            max_dimension,
        })
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn max_dimension(&self) -> usize {
        self.max_dimension
    }

    /// Check a requested output dimension against the maximum
    pub fn validate(&self, requested: usize) -> LdaResult<()> {
        if requested == 0 {
            return Err(LdaError::InvalidValue {
                field: "dimension",
                message: "the output dimension must be at least 1".to_string(),
            });
        }
        if requested > self.max_dimension {
            return Err(LdaError::DimensionTooHigh {
                requested,
                max_dimension: self.max_dimension,
                message: too_high_message(requested, self),
            });
        }
        Ok(())
    }
}

fn class_shortage(class_count: usize) -> &'static str {
    if class_count == 0 {
        "the class column contains no class values"
    } else {
        "the class column contains only a single class"
    }
}

fn zero_dimension_message(class_count: usize, feature_count: usize) -> String {
    match (class_count <= 1, feature_count == 0) {
        (true, true) => format!(
            "No feature columns are selected and {}; at least one numeric column and two distinct classes are required.",
            class_shortage(class_count)
        ),
        (true, false) => {
            let mut reason = class_shortage(class_count).to_string();
            reason[..1].make_ascii_uppercase();
            format!("{}; at least two distinct classes are required.", reason)
        }
        (false, _) => {
            "No feature columns are selected; at least one numeric column is required.".to_string()
        }
    }
}

fn too_high_message(requested: usize, bounds: &DimensionBounds) -> String {
    let by_classes = bounds.max_dimension == bounds.class_count - 1;
    let by_features = bounds.max_dimension == bounds.feature_count;
    let prefix = format!(
        "The requested dimension {} exceeds the maximum of {}",
        requested, bounds.max_dimension
    );
    match (by_classes, by_features) {
        (true, true) => format!(
            "{}, which is limited both by the number of classes ({}) minus one and by the number of selected columns ({}).",
            prefix, bounds.class_count, bounds.feature_count
        ),
        (true, false) => format!(
            "{}, which is limited by the number of classes ({}) minus one.",
            prefix, bounds.class_count
        ),
        _ => format!(
            "{}, which is limited by the number of selected columns ({}).",
            prefix, bounds.feature_count
        ),
    }
}
