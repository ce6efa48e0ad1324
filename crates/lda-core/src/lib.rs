//! lda-core: Linear discriminant analysis engine for the statistics plugins
//!
//! Trains a supervised linear projection from class-labeled numeric
//! observations (two-pass scatter accumulation followed by an eigen
//! decomposition of `Sw⁻¹·Sb`) and applies it to new data. Designed to be
//! called by a host pipeline, directly or through the FFI crate.

pub mod discriminant;
pub mod errors;
pub mod fit;
pub mod monitor;
pub mod projector;
pub mod scatter;
pub mod table;
pub mod types;

pub use discriminant::{
    max_dimension, DimensionBounds, EigenPair, ModelSnapshot, TransformationModel,
};
pub use errors::{LdaError, LdaResult};
pub use fit::{check_configuration, fit_lda};
pub use monitor::{CancellationToken, ExecutionMonitor, NoopMonitor};
pub use projector::{apply_model, projection_column_name, RowProjector};
pub use scatter::{compute_scatter, ScatterMatrices, ScatterResult};
pub use table::{Column, ColumnData, Table};
pub use types::*;
