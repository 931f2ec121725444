pub mod engine;
pub mod model;

pub use engine::GcEngine;
pub use model::{PruneCandidate, PrunePlan};
