//! Discriminant directions: eigen-problem, dimension bounds and the trained model

mod dimension;
mod model;
mod solver;

pub use dimension::{max_dimension, DimensionBounds};
pub use model::{ModelSnapshot, TransformationModel};
pub use solver::{rank_descending, solve, DiscriminantSolution, EigenPair};
