//! Operation algorithms: normalization, composition, inversion and
//! transformation.

pub mod collector;
pub mod composer;
pub mod decomposer;
pub mod insertion;
pub mod insertion_noninsertion;
pub mod inverter;
pub mod noninsertion;
pub mod normalizer;
pub mod position;
pub mod transformer;

pub use collector::{compose_all, DocOpCollector};
pub use composer::compose;
pub use inverter::invert;
pub use normalizer::normalize;
pub use transformer::transform;
